use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration, OffsetDateTime};
use tracing::{debug, warn};
use uuid::Uuid;

use super::claims::{Claims, TokenKind};
use crate::{config::JwtConfig, error::AppError, state::AppState};

/// Signing and verification keys plus issuer settings.
#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl From<&JwtConfig> for JwtKeys {
    fn from(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            access_ttl: Duration::minutes(cfg.ttl_minutes.max(1)),
            refresh_ttl: Duration::minutes(cfg.refresh_ttl_minutes.max(1)),
        }
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        JwtKeys::from(&state.config.jwt)
    }
}

/// A freshly issued access/refresh pair.
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

impl JwtKeys {
    fn ttl(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        }
    }

    fn sign_with_kind(&self, user_id: Uuid, kind: TokenKind) -> Result<String, AppError> {
        let now = OffsetDateTime::now_utc();
        let exp = now + self.ttl(kind);
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            kind,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(anyhow::Error::new(e).context("jwt encode")))?;
        debug!(user_id = %user_id, kind = ?kind, "jwt signed");
        Ok(token)
    }

    pub fn sign_access(&self, user_id: Uuid) -> Result<String, AppError> {
        self.sign_with_kind(user_id, TokenKind::Access)
    }

    pub fn sign_refresh(&self, user_id: Uuid) -> Result<String, AppError> {
        self.sign_with_kind(user_id, TokenKind::Refresh)
    }

    pub fn issue_pair(&self, user_id: Uuid) -> Result<TokenPair, AppError> {
        Ok(TokenPair {
            access: self.sign_access(user_id)?,
            refresh: self.sign_refresh(user_id)?,
        })
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = %data.claims.sub, kind = ?data.claims.kind, "jwt verified");
        Ok(data.claims)
    }

    /// Verifies the token and requires it to be of `kind`.
    pub fn verify_as(&self, token: &str, kind: TokenKind) -> Result<Claims, AppError> {
        let claims = self.verify(token)?;
        if claims.kind != kind {
            warn!(user_id = %claims.sub, got = ?claims.kind, want = ?kind, "token kind mismatch");
            return Err(AppError::unauthorized(match kind {
                TokenKind::Access => "Access token required",
                TokenKind::Refresh => "not a refresh token",
            }));
        }
        Ok(claims)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<Claims, AppError> {
        self.verify_as(token, TokenKind::Refresh)
    }
}

/// Authenticated requester, taken from `Authorization: Bearer <access token>`.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing Authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .or_else(|| auth_header.strip_prefix("bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::unauthorized("Invalid Authorization header"))?;

        match keys.verify_as(token, TokenKind::Access) {
            Ok(claims) => Ok(AuthUser(claims.sub)),
            Err(AppError::Jwt(e)) => {
                warn!(error = %e, "invalid or expired token");
                Err(AppError::unauthorized("Invalid or expired token"))
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys(secret: &str, issuer: &str, audience: &str) -> JwtKeys {
        JwtKeys::from(&JwtConfig {
            secret: secret.into(),
            issuer: issuer.into(),
            audience: audience.into(),
            ttl_minutes: 5,
            refresh_ttl_minutes: 60,
        })
    }

    #[test]
    fn sign_and_verify_access_token() {
        let keys = make_keys("dev-secret", "test-issuer", "test-aud");
        let user_id = Uuid::new_v4();
        let token = keys.sign_access(user_id).expect("sign access");
        let claims = keys.verify(&token).expect("verify token");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
        assert_eq!(claims.kind, TokenKind::Access);
        assert_eq!(claims.exp - claims.iat, 5 * 60);
    }

    #[test]
    fn issue_pair_yields_both_kinds() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let user_id = Uuid::new_v4();
        let pair = keys.issue_pair(user_id).expect("issue pair");
        assert_eq!(keys.verify(&pair.access).unwrap().kind, TokenKind::Access);
        let claims = keys.verify_refresh(&pair.refresh).expect("verify refresh");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.kind, TokenKind::Refresh);
    }

    #[test]
    fn verify_refresh_rejects_access_token() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let token = keys.sign_access(Uuid::new_v4()).expect("sign access");
        let err = keys.verify_refresh(&token).unwrap_err();
        assert!(err.to_string().contains("not a refresh token"));
    }

    #[test]
    fn verify_rejects_wrong_issuer_or_audience() {
        let good_keys = make_keys("same-secret", "good-iss", "good-aud");
        let bad_keys = make_keys("same-secret", "bad-iss", "bad-aud");
        let token = good_keys.sign_access(Uuid::new_v4()).expect("sign access");
        assert!(bad_keys.verify(&token).is_err());
    }

    #[test]
    fn refresh_token_uses_refresh_ttl_and_is_not_an_access_token() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let token = keys.sign_refresh(Uuid::new_v4()).unwrap();
        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.exp - claims.iat, 60 * 60);

        let err = keys.verify_as(&token, TokenKind::Access).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(ref m) if m == "Access token required"));
    }

    #[test]
    fn verify_rejects_other_secret() {
        let a = make_keys("secret-a", "iss", "aud");
        let b = make_keys("secret-b", "iss", "aud");
        let token = a.sign_access(Uuid::new_v4()).unwrap();
        assert!(matches!(b.verify(&token), Err(AppError::Jwt(_))));
    }
}
