use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    AccountStore, EntryChanges, EntryFilter, NewEntry, Page, PageRequest, StoreError, StoreResult,
    WaitlistStore,
};
use crate::entry::{Priority, Status, WaitlistEntry};
use crate::models::AdminUser;

/// In-process store. The whole create path runs under one lock, which gives
/// the same serialized position assignment the Postgres store gets from its
/// table lock.
#[derive(Default)]
pub struct MemoryWaitlistStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    entries: Vec<WaitlistEntry>,
    last_id: i64,
    admins: Vec<AdminUser>,
}

impl MemoryWaitlistStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Inner {
    fn entry_mut(&mut self, id: i64) -> Option<&mut WaitlistEntry> {
        self.entries.iter_mut().find(|entry| entry.id == id)
    }

    fn update_matching<F>(&mut self, ids: &[i64], at: NaiveDateTime, mut apply: F) -> usize
    where
        F: FnMut(&mut WaitlistEntry),
    {
        let wanted: HashSet<i64> = ids.iter().copied().collect();
        let mut updated = 0;
        for entry in self
            .entries
            .iter_mut()
            .filter(|entry| wanted.contains(&entry.id))
        {
            apply(entry);
            entry.updated_at = at;
            updated += 1;
        }
        updated
    }
}

#[async_trait]
impl WaitlistStore for MemoryWaitlistStore {
    async fn create(&self, entry: NewEntry) -> StoreResult<WaitlistEntry> {
        let mut inner = self.inner.lock().await;
        let email = entry.email.to_lowercase();

        if inner.entries.iter().any(|existing| existing.email == email) {
            return Err(StoreError::DuplicateEmail);
        }

        let position = inner
            .entries
            .iter()
            .map(|existing| existing.position)
            .max()
            .unwrap_or(0)
            + 1;
        inner.last_id += 1;

        let created = WaitlistEntry {
            id: inner.last_id,
            email,
            role: entry.role,
            status: Status::default(),
            priority: Priority::default(),
            admin_notes: String::new(),
            created_at: entry.created_at,
            updated_at: entry.created_at,
            position,
        };
        inner.entries.push(created.clone());
        Ok(created)
    }

    async fn find(&self, id: i64) -> StoreResult<WaitlistEntry> {
        let inner = self.inner.lock().await;
        inner
            .entries
            .iter()
            .find(|entry| entry.id == id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<WaitlistEntry> {
        let email = email.to_lowercase();
        let inner = self.inner.lock().await;
        inner
            .entries
            .iter()
            .find(|entry| entry.email == email)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn count(&self, created_since: Option<NaiveDateTime>) -> StoreResult<i64> {
        let inner = self.inner.lock().await;
        let count = inner
            .entries
            .iter()
            .filter(|entry| created_since.map_or(true, |since| entry.created_at >= since))
            .count();
        Ok(count as i64)
    }

    async fn update_status(
        &self,
        ids: &[i64],
        status: Status,
        at: NaiveDateTime,
    ) -> StoreResult<usize> {
        let mut inner = self.inner.lock().await;
        Ok(inner.update_matching(ids, at, |entry| entry.status = status))
    }

    async fn update_priority(
        &self,
        ids: &[i64],
        priority: Priority,
        at: NaiveDateTime,
    ) -> StoreResult<usize> {
        let mut inner = self.inner.lock().await;
        Ok(inner.update_matching(ids, at, |entry| entry.priority = priority))
    }

    async fn update_entry(
        &self,
        id: i64,
        changes: EntryChanges,
        at: NaiveDateTime,
    ) -> StoreResult<WaitlistEntry> {
        let mut inner = self.inner.lock().await;
        let entry = inner.entry_mut(id).ok_or(StoreError::NotFound)?;
        if let Some(status) = changes.status {
            entry.status = status;
        }
        if let Some(priority) = changes.priority {
            entry.priority = priority;
        }
        if let Some(notes) = changes.admin_notes {
            entry.admin_notes = notes;
        }
        entry.updated_at = at;
        Ok(entry.clone())
    }

    async fn list(
        &self,
        filter: &EntryFilter,
        page: PageRequest,
    ) -> StoreResult<Page<WaitlistEntry>> {
        let inner = self.inner.lock().await;
        let mut matching: Vec<&WaitlistEntry> = inner
            .entries
            .iter()
            .filter(|entry| filter.matches(entry))
            .collect();
        matching.sort_by_key(|entry| (entry.position, entry.created_at));

        let total = matching.len() as i64;
        let items = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .cloned()
            .collect();

        Ok(Page { total, items })
    }
}

#[async_trait]
impl AccountStore for MemoryWaitlistStore {
    async fn find_admin(&self, username: &str) -> StoreResult<AdminUser> {
        let inner = self.inner.lock().await;
        inner
            .admins
            .iter()
            .find(|admin| admin.username == username)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn find_admin_by_id(&self, id: Uuid) -> StoreResult<AdminUser> {
        let inner = self.inner.lock().await;
        inner
            .admins
            .iter()
            .find(|admin| admin.id == id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn create_admin(&self, username: &str, password_hash: &str) -> StoreResult<AdminUser> {
        let mut inner = self.inner.lock().await;
        if inner.admins.iter().any(|admin| admin.username == username) {
            return Err(StoreError::DuplicateUsername);
        }

        let now = Utc::now().naive_utc();
        let admin = AdminUser {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        inner.admins.push(admin.clone());
        Ok(admin)
    }
}
