use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::{
    auth::{password, AuthenticatedAdmin},
    error::{AppError, AppResult},
    state::AppState,
    store::StoreError,
    utils::json::JsonBody,
};

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

pub async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let admin = match state.accounts.find_admin(payload.username.trim()).await {
        Ok(admin) => admin,
        Err(StoreError::NotFound) => {
            tracing::warn!(username = %payload.username, "admin login for unknown user");
            return Err(AppError::unauthorized());
        }
        Err(err) => return Err(AppError::from(err)),
    };

    let valid = password::verify_password(&payload.password, &admin.password_hash)
        .map_err(|_| AppError::unauthorized())?;

    if !valid || !admin.is_active {
        tracing::warn!(username = %admin.username, active = admin.is_active, "admin login rejected");
        return Err(AppError::unauthorized());
    }

    let access_token = state
        .jwt
        .generate_token(admin.id, &admin.username)
        .map_err(AppError::from)?;

    tracing::info!(admin_id = %admin.id, username = %admin.username, "admin logged in");

    Ok(Json(LoginResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: state.jwt.expires_in_seconds(),
    }))
}

pub async fn me(admin: AuthenticatedAdmin) -> Json<AuthenticatedAdmin> {
    Json(admin)
}
