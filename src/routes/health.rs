use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::json;

use crate::state::AppState;

/// Liveness plus a single store round trip.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    match state.store.count(None).await {
        Ok(_) => (StatusCode::OK, Json(json!({ "status": "ok" }))),
        Err(err) => {
            tracing::error!(error = %err, "health check could not reach the store");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable" })),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use diesel::r2d2::{ConnectionManager, Pool};
    use diesel::PgConnection;

    use super::*;
    use crate::auth::jwt::JwtService;
    use crate::config::{AppConfig, DEFAULT_ADMIN_PAGE_SIZE, DEFAULT_ADMIN_PATH};
    use crate::store::{MemoryWaitlistStore, PgWaitlistStore};

    fn config() -> AppConfig {
        AppConfig {
            database_url: "postgres://nobody@127.0.0.1:1/waitlist".to_string(),
            database_max_pool_size: 1,
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            jwt_secret: "secret".to_string(),
            jwt_issuer: "waitlist".to_string(),
            jwt_audience: "waitlist-admin".to_string(),
            jwt_expiry_minutes: 5,
            cors_allowed_origin: None,
            admin_path: DEFAULT_ADMIN_PATH.to_string(),
            admin_page_size: DEFAULT_ADMIN_PAGE_SIZE,
        }
    }

    #[tokio::test]
    async fn reachable_store_is_ok() {
        let config = config();
        let jwt = JwtService::from_config(&config).unwrap();
        let store = Arc::new(MemoryWaitlistStore::new());
        let state = AppState::new(config, store.clone(), store, jwt);

        let (status, Json(body)) = health_check(State(state)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn unreachable_store_is_unavailable() {
        let config = config();
        let jwt = JwtService::from_config(&config).unwrap();
        let pool = Pool::builder()
            .max_size(1)
            .connection_timeout(Duration::from_millis(200))
            .build_unchecked(ConnectionManager::<PgConnection>::new(&config.database_url));
        let state = AppState::postgres(config, PgWaitlistStore::new(pool), jwt);

        let (status, Json(body)) = health_check(State(state)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body, json!({ "status": "unavailable" }));
    }
}
