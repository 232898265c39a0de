pub mod jwt;
pub mod password;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use serde::Serialize;
use uuid::Uuid;

use crate::{error::AppError, state::AppState, store::StoreError};

/// An operator holding a valid bearer token whose account is still active.
#[derive(Debug, Clone, Serialize)]
pub struct AuthenticatedAdmin {
    pub id: Uuid,
    pub username: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::unauthorized())?;

        let claims = state
            .jwt
            .verify_token(bearer.token())
            .map_err(|_| AppError::unauthorized())?;

        let admin = match state.accounts.find_admin_by_id(claims.sub).await {
            Ok(admin) => admin,
            Err(StoreError::NotFound) => return Err(AppError::unauthorized()),
            Err(err) => return Err(AppError::from(err)),
        };

        if !admin.is_active {
            tracing::warn!(admin_id = %admin.id, "token presented for inactive admin");
            return Err(AppError::unauthorized());
        }

        Ok(AuthenticatedAdmin {
            id: admin.id,
            username: admin.username,
        })
    }
}
