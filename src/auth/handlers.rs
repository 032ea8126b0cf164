use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthResponse, ChangePasswordRequest, LoginRequest, RefreshRequest, RegisterRequest,
            UpdateProfileRequest, UserProfile,
        },
        jwt::{AuthUser, JwtKeys},
        password::{hash_password, verify_password},
        repo_types::User,
        services::{authenticate, normalize_email, profile_changes, validate_new_password, validate_register},
    },
    error::{AppError, AppResult, FieldErrors},
    extract::JsonBody,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/me", get(get_me))
        .route("/auth/profile", put(update_profile))
        .route("/auth/password", put(change_password))
}

fn auth_response(keys: &JwtKeys, user: User) -> AppResult<AuthResponse> {
    let pair = keys.issue_pair(user.id)?;
    Ok(AuthResponse {
        token: pair.access,
        refresh_token: pair.refresh,
        user: user.into(),
    })
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    JsonBody(mut payload): JsonBody<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    validate_register(&mut payload)?;

    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(AppError::Duplicate("Email already registered".into()));
    }

    let hash = hash_password(&payload.password)?;
    // A concurrent registration still trips the unique constraint -> Duplicate.
    let user = User::create(&state.db, &payload.name, &payload.email, &hash).await?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    let keys = JwtKeys::from_ref(&state);
    Ok((StatusCode::CREATED, Json(auth_response(&keys, user)?)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let email = normalize_email(&payload.email);
    let found = User::find_by_email(&state.db, &email).await?;
    let user = authenticate(found, &email, &payload.password)?;

    info!(user_id = %user.id, "user logged in");
    let keys = JwtKeys::from_ref(&state);
    Ok(Json(auth_response(&keys, user)?))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RefreshRequest>,
) -> AppResult<Json<AuthResponse>> {
    let token = payload.refresh_token.trim();
    if token.is_empty() {
        return Err(AppError::bad_request("refresh_token is required"));
    }
    let keys = JwtKeys::from_ref(&state);
    let claims = keys.verify_refresh(token)?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| AppError::unauthorized("User not found"))?;
    Ok(Json(auth_response(&keys, user)?))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<UserProfile>> {
    let user = User::find_by_id(&state.db, user_id).await?.ok_or_else(|| {
        warn!(%user_id, "token for missing user");
        AppError::unauthorized("User not found")
    })?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    JsonBody(payload): JsonBody<UpdateProfileRequest>,
) -> AppResult<Json<UserProfile>> {
    let changes = profile_changes(payload)?;
    let user = User::update_profile(&state.db, user_id, &changes)
        .await?
        .ok_or_else(|| AppError::unauthorized("User not found"))?;

    info!(%user_id, "profile updated");
    Ok(Json(user.into()))
}

#[instrument(skip(state, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    JsonBody(payload): JsonBody<ChangePasswordRequest>,
) -> AppResult<StatusCode> {
    let mut errs = FieldErrors::new();
    validate_new_password(&payload.new_password, &mut errs);
    errs.finish()?;

    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::unauthorized("User not found"))?;

    if !verify_password(&payload.current_password, &user.password_hash)? {
        warn!(%user_id, "password change with wrong current password");
        return Err(AppError::field("current_password", "Current password is incorrect"));
    }

    let hash = hash_password(&payload.new_password)?;
    if !User::update_password(&state.db, user_id, &hash).await? {
        return Err(AppError::unauthorized("User not found"));
    }

    info!(%user_id, "password changed");
    Ok(StatusCode::NO_CONTENT)
}
