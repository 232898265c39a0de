use axum::http::HeaderValue;
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::{auth::AuthenticatedAdmin, state::AppState};

pub mod admin;
pub mod auth;
pub mod health;
pub mod waitlist;

const MAX_BODY_BYTES: usize = 64 * 1024;

pub fn create_router(state: AppState) -> Router<()> {
    let cors = if let Some(origins) = state.config.cors_allowed_origin.as_ref() {
        let headers = allowed_origins(origins);

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(headers))
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::mirror_request())
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    };

    let waitlist_routes = Router::new()
        .route("/join/", post(waitlist::join_waitlist))
        .route("/status/:email/", get(waitlist::get_waitlist_status))
        .route("/stats/", get(waitlist::public_stats));

    let admin_auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/me", get(auth::me));

    let protected_state = state.clone();
    let admin_routes = Router::new()
        .route("/entries", get(admin::list_entries))
        .route(
            "/entries/:id",
            get(admin::get_entry).patch(admin::update_entry),
        )
        .route("/actions", get(admin::list_actions))
        .route("/actions/:action", post(admin::run_action))
        .route_layer(middleware::from_extractor_with_state::<AuthenticatedAdmin, _>(
            protected_state,
        ));

    let admin_path = state.config.admin_path.clone();

    Router::new()
        .nest("/api/waitlist", waitlist_routes)
        .nest(
            &admin_path,
            Router::new()
                .nest("/auth", admin_auth_routes)
                .merge(admin_routes),
        )
        .route("/api/health", get(health::health_check))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}

/// Parses the configured allow list. `*` cannot be combined with credentials.
fn allowed_origins(raw: &str) -> Vec<HeaderValue> {
    raw.split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .filter_map(|value| {
            if value == "*" {
                tracing::warn!("ignoring wildcard CORS origin; list explicit origins instead");
                return None;
            }
            match value.parse::<HeaderValue>() {
                Ok(header) => Some(header),
                Err(_) => {
                    tracing::warn!(origin = %value, "ignoring invalid CORS allowed origin");
                    None
                }
            }
        })
        .collect()
}

pub(crate) fn to_iso(dt: NaiveDateTime) -> String {
    DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc).to_rfc3339()
}
