use async_trait::async_trait;
use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::entry::{Priority, Role, Status, UnknownVariant, WaitlistEntry};
use crate::models::AdminUser;

pub mod memory;
pub mod postgres;

pub use memory::MemoryWaitlistStore;
pub use postgres::PgWaitlistStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("email already exists in waitlist")]
    DuplicateEmail,
    #[error("username already exists")]
    DuplicateUsername,
    #[error("record not found")]
    NotFound,
    #[error("invalid stored value: {0}")]
    InvalidValue(#[from] UnknownVariant),
    #[error("database error: {0}")]
    Database(diesel::result::Error),
    #[error("database pool error: {0}")]
    Pool(String),
    #[error("store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone)]
pub struct NewEntry {
    /// Already normalized and validated.
    pub email: String,
    pub role: Option<Role>,
    pub created_at: NaiveDateTime,
}

/// Field-level edits an operator may make to a single entry.
#[derive(Debug, Clone, Default)]
pub struct EntryChanges {
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub admin_notes: Option<String>,
}

impl EntryChanges {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.priority.is_none() && self.admin_notes.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub role: Option<Role>,
    /// Inclusive lower bound on `created_at`.
    pub created_from: Option<NaiveDateTime>,
    /// Exclusive upper bound on `created_at`.
    pub created_until: Option<NaiveDateTime>,
    /// Case-insensitive email substring.
    pub search: Option<String>,
}

impl EntryFilter {
    pub fn matches(&self, entry: &WaitlistEntry) -> bool {
        self.status.map_or(true, |status| entry.status == status)
            && self
                .priority
                .map_or(true, |priority| entry.priority == priority)
            && self.role.map_or(true, |role| entry.role == Some(role))
            && self
                .created_from
                .map_or(true, |from| entry.created_at >= from)
            && self
                .created_until
                .map_or(true, |until| entry.created_at < until)
            && self.search.as_deref().map_or(true, |needle| {
                entry.email.contains(&needle.to_lowercase())
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based.
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.per_page)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub total: i64,
    pub items: Vec<T>,
}

/// Persistence for waitlist entries.
///
/// Implementations must assign positions atomically with the insert: two
/// concurrent `create` calls never observe the same maximum position, and
/// two concurrent calls with the same email yield exactly one entry.
#[async_trait]
pub trait WaitlistStore: Send + Sync {
    async fn create(&self, entry: NewEntry) -> StoreResult<WaitlistEntry>;

    async fn find(&self, id: i64) -> StoreResult<WaitlistEntry>;

    async fn find_by_email(&self, email: &str) -> StoreResult<WaitlistEntry>;

    async fn count(&self, created_since: Option<NaiveDateTime>) -> StoreResult<i64>;

    async fn update_status(
        &self,
        ids: &[i64],
        status: Status,
        at: NaiveDateTime,
    ) -> StoreResult<usize>;

    async fn update_priority(
        &self,
        ids: &[i64],
        priority: Priority,
        at: NaiveDateTime,
    ) -> StoreResult<usize>;

    async fn update_entry(
        &self,
        id: i64,
        changes: EntryChanges,
        at: NaiveDateTime,
    ) -> StoreResult<WaitlistEntry>;

    async fn list(&self, filter: &EntryFilter, page: PageRequest)
        -> StoreResult<Page<WaitlistEntry>>;
}

/// Operators allowed into the admin surface.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_admin(&self, username: &str) -> StoreResult<AdminUser>;

    async fn find_admin_by_id(&self, id: Uuid) -> StoreResult<AdminUser>;

    async fn create_admin(&self, username: &str, password_hash: &str) -> StoreResult<AdminUser>;
}
