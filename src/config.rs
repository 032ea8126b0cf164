use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// FoodData Central access. Search is disabled when `api_key` is absent.
#[derive(Debug, Clone, Deserialize)]
pub struct FdcConfig {
    pub base_url: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub jwt: JwtConfig,
    pub fdc: FdcConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET is not set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "mealtrack".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "mealtrack-users".into()),
            ttl_minutes: env_parse("JWT_TTL_MINUTES").unwrap_or(60),
            refresh_ttl_minutes: env_parse("JWT_REFRESH_TTL_MINUTES").unwrap_or(60 * 24 * 14),
        };
        let fdc = FdcConfig {
            base_url: std::env::var("FDC_BASE_URL")
                .unwrap_or_else(|_| "https://api.nal.usda.gov/fdc/v1".into()),
            api_key: std::env::var("FDC_API_KEY").ok().filter(|k| !k.trim().is_empty()),
        };
        Ok(Self {
            database_url,
            db_max_connections: env_parse("DB_MAX_CONNECTIONS").unwrap_or(10),
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env_parse("APP_PORT").unwrap_or(8080),
            jwt,
            fdc,
        })
    }

    pub fn bind_addr(&self) -> anyhow::Result<std::net::SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid APP_HOST/APP_PORT: {}:{}", self.host, self.port))
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(host: &str, port: u16) -> AppConfig {
        AppConfig {
            database_url: "postgres://localhost/mealtrack".into(),
            db_max_connections: 1,
            host: host.into(),
            port,
            jwt: JwtConfig {
                secret: "s".into(),
                issuer: "i".into(),
                audience: "a".into(),
                ttl_minutes: 1,
                refresh_ttl_minutes: 1,
            },
            fdc: FdcConfig {
                base_url: "http://localhost".into(),
                api_key: None,
            },
        }
    }

    #[test]
    fn bind_addr_parses_host_and_port() {
        let addr = config("127.0.0.1", 9000).bind_addr().unwrap();
        assert_eq!(addr.port(), 9000);
        assert!(addr.ip().is_loopback());
    }

    #[test]
    fn bind_addr_rejects_hostnames() {
        assert!(config("not a host", 80).bind_addr().is_err());
    }
}
