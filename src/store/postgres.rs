use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use diesel::dsl::{exists, max};
use diesel::pg::Pg;
use diesel::result::DatabaseErrorKind;
use diesel::{prelude::*, select, PgConnection};
use uuid::Uuid;

use super::{
    AccountStore, EntryChanges, EntryFilter, NewEntry, Page, PageRequest, StoreError, StoreResult,
    WaitlistStore,
};
use crate::db::PgPool;
use crate::entry::{Priority, Role, Status, UnknownVariant, WaitlistEntry};
use crate::models::{
    AdminUser, NewAdminUser, NewWaitlistEntryRow, WaitlistEntryChangeset, WaitlistEntryRow,
};
use crate::schema::{admin_users, waitlist_entries};

const EMAIL_CONSTRAINT: &str = "waitlist_entries_email_key";

/// Serializes position assignment against other inserts while leaving plain
/// reads unblocked.
const LOCK_FOR_INSERT: &str = "LOCK TABLE waitlist_entries IN SHARE ROW EXCLUSIVE MODE";

#[derive(Clone)]
pub struct PgWaitlistStore {
    pool: PgPool,
}

impl PgWaitlistStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn with_conn<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut PgConnection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|err| StoreError::Pool(err.to_string()))?;
            f(&mut conn)
        })
        .await?
    }
}

impl From<diesel::result::Error> for StoreError {
    fn from(value: diesel::result::Error) -> Self {
        match value {
            diesel::result::Error::NotFound => StoreError::NotFound,
            other => StoreError::Database(other),
        }
    }
}

impl TryFrom<WaitlistEntryRow> for WaitlistEntry {
    type Error = UnknownVariant;

    fn try_from(row: WaitlistEntryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            role: row.role.as_deref().map(str::parse::<Role>).transpose()?,
            status: row.status.parse::<Status>()?,
            priority: row.priority.parse::<Priority>()?,
            email: row.email,
            admin_notes: row.admin_notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
            position: row.position,
        })
    }
}

fn into_entries(rows: Vec<WaitlistEntryRow>) -> StoreResult<Vec<WaitlistEntry>> {
    rows.into_iter()
        .map(|row| WaitlistEntry::try_from(row).map_err(StoreError::from))
        .collect()
}

fn filtered(filter: &EntryFilter) -> waitlist_entries::BoxedQuery<'static, Pg> {
    let mut query = waitlist_entries::table.into_boxed();

    if let Some(status) = filter.status {
        query = query.filter(waitlist_entries::status.eq(status.as_str()));
    }
    if let Some(priority) = filter.priority {
        query = query.filter(waitlist_entries::priority.eq(priority.as_str()));
    }
    if let Some(role) = filter.role {
        query = query.filter(waitlist_entries::role.eq(role.as_str()));
    }
    if let Some(from) = filter.created_from {
        query = query.filter(waitlist_entries::created_at.ge(from));
    }
    if let Some(until) = filter.created_until {
        query = query.filter(waitlist_entries::created_at.lt(until));
    }
    if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
        query = query.filter(waitlist_entries::email.ilike(contains_pattern(search)));
    }

    query
}

/// `%term%` with LIKE wildcards in the term escaped.
fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

#[async_trait]
impl WaitlistStore for PgWaitlistStore {
    async fn create(&self, entry: NewEntry) -> StoreResult<WaitlistEntry> {
        self.with_conn(move |conn| {
            let row = conn.transaction::<WaitlistEntryRow, StoreError, _>(|conn| {
                diesel::sql_query(LOCK_FOR_INSERT).execute(conn)?;

                let email = entry.email.to_lowercase();
                let taken: bool = select(exists(
                    waitlist_entries::table.filter(waitlist_entries::email.eq(&email)),
                ))
                .get_result(conn)?;
                if taken {
                    return Err(StoreError::DuplicateEmail);
                }

                let last_position: Option<i32> = waitlist_entries::table
                    .select(max(waitlist_entries::position))
                    .get_result(conn)?;

                let new_row = NewWaitlistEntryRow {
                    email: &email,
                    role: entry.role.map(Role::as_str),
                    status: Status::default().as_str(),
                    priority: Priority::default().as_str(),
                    created_at: entry.created_at,
                    updated_at: entry.created_at,
                    position: last_position.unwrap_or(0) + 1,
                };

                diesel::insert_into(waitlist_entries::table)
                    .values(&new_row)
                    .returning(WaitlistEntryRow::as_returning())
                    .get_result(conn)
                    .map_err(|err| match err {
                        diesel::result::Error::DatabaseError(
                            DatabaseErrorKind::UniqueViolation,
                            ref info,
                        ) if info.constraint_name() == Some(EMAIL_CONSTRAINT) => {
                            StoreError::DuplicateEmail
                        }
                        other => StoreError::from(other),
                    })
            })?;

            Ok(WaitlistEntry::try_from(row)?)
        })
        .await
    }

    async fn find(&self, id: i64) -> StoreResult<WaitlistEntry> {
        self.with_conn(move |conn| {
            let row: WaitlistEntryRow = waitlist_entries::table
                .find(id)
                .select(WaitlistEntryRow::as_select())
                .first(conn)?;
            Ok(WaitlistEntry::try_from(row)?)
        })
        .await
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<WaitlistEntry> {
        let email = email.to_lowercase();
        self.with_conn(move |conn| {
            let row: WaitlistEntryRow = waitlist_entries::table
                .filter(waitlist_entries::email.eq(&email))
                .select(WaitlistEntryRow::as_select())
                .first(conn)?;
            Ok(WaitlistEntry::try_from(row)?)
        })
        .await
    }

    async fn count(&self, created_since: Option<NaiveDateTime>) -> StoreResult<i64> {
        self.with_conn(move |conn| {
            let mut query = waitlist_entries::table.into_boxed();
            if let Some(since) = created_since {
                query = query.filter(waitlist_entries::created_at.ge(since));
            }
            Ok(query.count().get_result(conn)?)
        })
        .await
    }

    async fn update_status(
        &self,
        ids: &[i64],
        status: Status,
        at: NaiveDateTime,
    ) -> StoreResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let ids = ids.to_vec();
        self.with_conn(move |conn| {
            let updated =
                diesel::update(waitlist_entries::table.filter(waitlist_entries::id.eq_any(&ids)))
                    .set((
                        waitlist_entries::status.eq(status.as_str()),
                        waitlist_entries::updated_at.eq(at),
                    ))
                    .execute(conn)?;
            Ok(updated)
        })
        .await
    }

    async fn update_priority(
        &self,
        ids: &[i64],
        priority: Priority,
        at: NaiveDateTime,
    ) -> StoreResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let ids = ids.to_vec();
        self.with_conn(move |conn| {
            let updated =
                diesel::update(waitlist_entries::table.filter(waitlist_entries::id.eq_any(&ids)))
                    .set((
                        waitlist_entries::priority.eq(priority.as_str()),
                        waitlist_entries::updated_at.eq(at),
                    ))
                    .execute(conn)?;
            Ok(updated)
        })
        .await
    }

    async fn update_entry(
        &self,
        id: i64,
        changes: EntryChanges,
        at: NaiveDateTime,
    ) -> StoreResult<WaitlistEntry> {
        self.with_conn(move |conn| {
            let changeset = WaitlistEntryChangeset {
                status: changes.status.map(Status::as_str),
                priority: changes.priority.map(Priority::as_str),
                admin_notes: changes.admin_notes.as_deref(),
                updated_at: Some(at),
            };

            let row: WaitlistEntryRow = diesel::update(waitlist_entries::table.find(id))
                .set(&changeset)
                .returning(WaitlistEntryRow::as_returning())
                .get_result(conn)?;
            Ok(WaitlistEntry::try_from(row)?)
        })
        .await
    }

    async fn list(
        &self,
        filter: &EntryFilter,
        page: PageRequest,
    ) -> StoreResult<Page<WaitlistEntry>> {
        let filter = filter.clone();
        self.with_conn(move |conn| {
            let total: i64 = filtered(&filter).count().get_result(conn)?;

            let rows: Vec<WaitlistEntryRow> = filtered(&filter)
                .order((
                    waitlist_entries::position.asc(),
                    waitlist_entries::created_at.asc(),
                ))
                .limit(page.limit())
                .offset(page.offset())
                .select(WaitlistEntryRow::as_select())
                .load(conn)?;

            Ok(Page {
                total,
                items: into_entries(rows)?,
            })
        })
        .await
    }
}

#[async_trait]
impl AccountStore for PgWaitlistStore {
    async fn find_admin(&self, username: &str) -> StoreResult<AdminUser> {
        let username = username.to_string();
        self.with_conn(move |conn| {
            Ok(admin_users::table
                .filter(admin_users::username.eq(&username))
                .select(AdminUser::as_select())
                .first(conn)?)
        })
        .await
    }

    async fn find_admin_by_id(&self, id: Uuid) -> StoreResult<AdminUser> {
        self.with_conn(move |conn| {
            Ok(admin_users::table
                .find(id)
                .select(AdminUser::as_select())
                .first(conn)?)
        })
        .await
    }

    async fn create_admin(&self, username: &str, password_hash: &str) -> StoreResult<AdminUser> {
        let now = Utc::now().naive_utc();
        let new_admin = NewAdminUser {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        self.with_conn(move |conn| {
            diesel::insert_into(admin_users::table)
                .values(&new_admin)
                .returning(AdminUser::as_returning())
                .get_result(conn)
                .map_err(|err| match err {
                    diesel::result::Error::DatabaseError(
                        DatabaseErrorKind::UniqueViolation,
                        _,
                    ) => StoreError::DuplicateUsername,
                    other => StoreError::from(other),
                })
        })
        .await
    }
}
