use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use super::to_iso;
use crate::admin::{num_pages, page_request, ActionEffect, AdminAction, CreatedPreset, CreatedRange};
use crate::auth::AuthenticatedAdmin;
use crate::entry::{days_waiting_display, Priority, Role, Status, WaitlistEntry};
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::store::{EntryChanges, EntryFilter, PageRequest};
use crate::utils::json::{classify_field, JsonBody, Patch};

#[derive(Deserialize, Default)]
pub struct EntryListQuery {
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub role: Option<Role>,
    pub search: Option<String>,
    pub created: Option<CreatedPreset>,
    pub created_after: Option<NaiveDate>,
    pub created_before: Option<NaiveDate>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Serialize)]
pub struct AdminEntryResponse {
    pub id: i64,
    pub position: i32,
    pub email: String,
    pub role: Option<Role>,
    pub role_display: &'static str,
    pub status: Status,
    pub status_display: &'static str,
    pub priority: Priority,
    pub priority_display: &'static str,
    pub admin_notes: String,
    pub created_at: String,
    pub updated_at: String,
    pub days_waiting: i64,
    pub days_waiting_display: String,
}

impl AdminEntryResponse {
    fn build(entry: WaitlistEntry, now: NaiveDateTime) -> Self {
        let days_waiting = entry.days_waiting(now);
        Self {
            id: entry.id,
            position: entry.position,
            role: entry.role,
            role_display: entry.role.map(Role::label).unwrap_or("-"),
            status: entry.status,
            status_display: entry.status.label(),
            priority: entry.priority,
            priority_display: entry.priority.label(),
            created_at: to_iso(entry.created_at),
            updated_at: to_iso(entry.updated_at),
            days_waiting,
            days_waiting_display: days_waiting_display(days_waiting),
            email: entry.email,
            admin_notes: entry.admin_notes,
        }
    }
}

#[derive(Serialize)]
pub struct EntryListResponse {
    pub count: i64,
    pub page: u32,
    pub per_page: u32,
    pub num_pages: i64,
    pub results: Vec<AdminEntryResponse>,
}

#[derive(Deserialize)]
pub struct BulkActionRequest {
    pub ids: Vec<i64>,
}

#[derive(Serialize)]
pub struct BulkActionResponse {
    pub action: AdminAction,
    pub requested: usize,
    pub updated: usize,
    pub message: String,
}

#[derive(Serialize)]
pub struct ActionDescription {
    pub action: AdminAction,
    pub description: String,
}

pub async fn list_entries(
    State(state): State<AppState>,
    Query(query): Query<EntryListQuery>,
) -> AppResult<Json<EntryListResponse>> {
    let now = Utc::now().naive_utc();
    let range = CreatedRange::resolve(
        query.created,
        query.created_after,
        query.created_before,
        now,
    );

    let filter = EntryFilter {
        status: query.status,
        priority: query.priority,
        role: query.role,
        created_from: range.from,
        created_until: range.until,
        search: query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase),
    };

    let (page, per_page) = page_request(query.page, query.per_page, state.config.admin_page_size);
    let result = state
        .store
        .list(&filter, PageRequest { page, per_page })
        .await?;

    Ok(Json(EntryListResponse {
        count: result.total,
        page,
        per_page,
        num_pages: num_pages(result.total, per_page),
        results: result
            .items
            .into_iter()
            .map(|entry| AdminEntryResponse::build(entry, now))
            .collect(),
    }))
}

pub async fn get_entry(
    State(state): State<AppState>,
    Path(entry_id): Path<i64>,
) -> AppResult<Json<AdminEntryResponse>> {
    let entry = state.store.find(entry_id).await?;
    Ok(Json(AdminEntryResponse::build(entry, Utc::now().naive_utc())))
}

pub async fn update_entry(
    State(state): State<AppState>,
    Path(entry_id): Path<i64>,
    admin: AuthenticatedAdmin,
    JsonBody(body): JsonBody<Value>,
) -> AppResult<Json<AdminEntryResponse>> {
    if !body.is_object() {
        return Err(AppError::bad_request("request body must be a JSON object"));
    }

    let mut changes = EntryChanges::default();

    match classify_field::<Status>(&body, "status").map_err(AppError::bad_request)? {
        Patch::Omitted => {}
        Patch::Null => return Err(AppError::bad_request("status cannot be null")),
        Patch::Value(status) => changes.status = Some(status),
    }

    match classify_field::<Priority>(&body, "priority").map_err(AppError::bad_request)? {
        Patch::Omitted => {}
        Patch::Null => return Err(AppError::bad_request("priority cannot be null")),
        Patch::Value(priority) => changes.priority = Some(priority),
    }

    match classify_field::<String>(&body, "admin_notes").map_err(AppError::bad_request)? {
        Patch::Omitted => {}
        Patch::Null => changes.admin_notes = Some(String::new()),
        Patch::Value(notes) => changes.admin_notes = Some(notes),
    }

    let now = Utc::now().naive_utc();

    if changes.is_empty() {
        let existing = state.store.find(entry_id).await?;
        return Ok(Json(AdminEntryResponse::build(existing, now)));
    }

    let updated = state.store.update_entry(entry_id, changes, now).await?;
    info!(
        entry_id,
        admin = %admin.username,
        status = updated.status.as_str(),
        priority = updated.priority.as_str(),
        "waitlist entry updated"
    );

    Ok(Json(AdminEntryResponse::build(updated, now)))
}

pub async fn list_actions() -> Json<Vec<ActionDescription>> {
    Json(
        AdminAction::ALL
            .into_iter()
            .map(|action| ActionDescription {
                action,
                description: action.description(),
            })
            .collect(),
    )
}

pub async fn run_action(
    State(state): State<AppState>,
    Path(action): Path<String>,
    admin: AuthenticatedAdmin,
    JsonBody(payload): JsonBody<BulkActionRequest>,
) -> AppResult<(StatusCode, Json<BulkActionResponse>)> {
    let action = action
        .parse::<AdminAction>()
        .map_err(|err| AppError::new(StatusCode::NOT_FOUND, err.to_string()))?;

    let BulkActionRequest { mut ids } = payload;
    if ids.is_empty() {
        return Err(AppError::bad_request("ids must not be empty"));
    }
    ids.sort_unstable();
    ids.dedup();

    let now = Utc::now().naive_utc();
    let updated = match action.effect() {
        ActionEffect::Status(status) => state.store.update_status(&ids, status, now).await?,
        ActionEffect::Priority(priority) => {
            state.store.update_priority(&ids, priority, now).await?
        }
    };

    info!(
        action = action.as_str(),
        admin = %admin.username,
        requested = ids.len(),
        updated,
        "admin bulk action applied"
    );

    Ok((
        StatusCode::OK,
        Json(BulkActionResponse {
            action,
            requested: ids.len(),
            updated,
            message: action.message(updated),
        }),
    ))
}
