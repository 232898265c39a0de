use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
};
use chrono::{Duration, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use super::to_iso;
use crate::entry::{normalize_email, Role, Status, WaitlistEntry};
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::store::{NewEntry, StoreError};
use crate::utils::json::{classify_field, JsonBody, Patch};
use crate::validation::validate_email;

pub const DUPLICATE_EMAIL_MESSAGE: &str = "Email already exists in waitlist";
pub const EMAIL_NOT_FOUND_MESSAGE: &str = "Email not found in waitlist";

const WEEK_DAYS: i64 = 7;
const MONTH_DAYS: i64 = 30;

/// Public view of an entry, shared by join and status lookups.
#[derive(Serialize)]
pub struct EntryResponse {
    pub id: i64,
    pub email: String,
    pub role: Option<Role>,
    pub position: i32,
    pub created_at: String,
    pub status: Status,
}

impl From<&WaitlistEntry> for EntryResponse {
    fn from(entry: &WaitlistEntry) -> Self {
        Self {
            id: entry.id,
            email: entry.email.clone(),
            role: entry.role,
            position: entry.position,
            created_at: to_iso(entry.created_at),
            status: entry.status,
        }
    }
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub total_signups: i64,
    pub this_week: i64,
    pub this_month: i64,
}

fn parse_role(raw: Option<&str>) -> AppResult<Option<Role>> {
    let Some(value) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };

    value
        .to_lowercase()
        .parse::<Role>()
        .map(Some)
        .map_err(|_| {
            let allowed: Vec<&str> = Role::ALL.iter().map(|role| role.as_str()).collect();
            AppError::validation(
                "body",
                "role",
                format!("role must be one of: {}", allowed.join(", ")),
            )
        })
}

/// Pulls `email` and `role` out of a join body, reporting the offending field.
fn read_join_fields(body: &Value) -> AppResult<(String, Option<String>)> {
    if !body.is_object() {
        return Err(AppError::invalid_body("expected a JSON object"));
    }

    let email = match classify_field::<String>(body, "email") {
        Ok(Patch::Value(email)) => email,
        Ok(Patch::Omitted | Patch::Null) => {
            return Err(AppError::validation("body", "email", "This field is required."))
        }
        Err(_) => return Err(AppError::validation("body", "email", "email must be a string")),
    };

    let role = match classify_field::<String>(body, "role") {
        Ok(Patch::Value(role)) => Some(role),
        Ok(Patch::Omitted | Patch::Null) => None,
        Err(_) => return Err(AppError::validation("body", "role", "role must be a string")),
    };

    Ok((email, role))
}

pub async fn join_waitlist(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<Value>,
) -> AppResult<(StatusCode, Json<EntryResponse>)> {
    let (raw_email, raw_role) = read_join_fields(&body)?;
    let email = normalize_email(&raw_email);
    validate_email(&email).map_err(|err| AppError::validation("body", "email", err.to_string()))?;
    let role = parse_role(raw_role.as_deref())?;

    let new_entry = NewEntry {
        email,
        role,
        created_at: Utc::now().naive_utc(),
    };

    let entry = match state.store.create(new_entry).await {
        Ok(entry) => entry,
        Err(StoreError::DuplicateEmail) => {
            debug!("rejected duplicate waitlist signup");
            return Err(AppError::plain_text(
                StatusCode::BAD_REQUEST,
                DUPLICATE_EMAIL_MESSAGE,
            ));
        }
        Err(err) => return Err(AppError::from(err)),
    };

    info!(
        entry_id = entry.id,
        position = entry.position,
        role = entry.role.map(Role::as_str).unwrap_or("-"),
        "waitlist entry created"
    );

    Ok((StatusCode::CREATED, Json(EntryResponse::from(&entry))))
}

pub async fn get_waitlist_status(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> AppResult<Json<EntryResponse>> {
    let email = normalize_email(&email);

    match state.store.find_by_email(&email).await {
        Ok(entry) => Ok(Json(EntryResponse::from(&entry))),
        Err(StoreError::NotFound) => Err(AppError::new(
            StatusCode::NOT_FOUND,
            EMAIL_NOT_FOUND_MESSAGE,
        )),
        Err(err) => Err(AppError::from(err)),
    }
}

pub async fn public_stats(State(state): State<AppState>) -> AppResult<Json<StatsResponse>> {
    let now = Utc::now().naive_utc();
    let week_ago = now - Duration::days(WEEK_DAYS);
    let month_ago = now - Duration::days(MONTH_DAYS);

    let total_signups = state.store.count(None).await?;
    let this_week = state.store.count(Some(week_ago)).await?;
    let this_month = state.store.count(Some(month_ago)).await?;

    Ok(Json(StatsResponse {
        total_signups,
        this_week,
        this_month,
    }))
}
