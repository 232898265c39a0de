use chrono::NaiveDateTime;
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::*;

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = waitlist_entries)]
pub struct WaitlistEntryRow {
    pub id: i64,
    pub email: String,
    pub role: Option<String>,
    pub status: String,
    pub priority: String,
    pub admin_notes: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub position: i32,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = waitlist_entries)]
pub struct NewWaitlistEntryRow<'a> {
    pub email: &'a str,
    pub role: Option<&'a str>,
    pub status: &'a str,
    pub priority: &'a str,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub position: i32,
}

#[derive(AsChangeset, Default)]
#[diesel(table_name = waitlist_entries)]
pub struct WaitlistEntryChangeset<'a> {
    pub status: Option<&'a str>,
    pub priority: Option<&'a str>,
    pub admin_notes: Option<&'a str>,
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = admin_users)]
pub struct AdminUser {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = admin_users)]
pub struct NewAdminUser {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
