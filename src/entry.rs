use std::{fmt, str::FromStr};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Pending,
    Approved,
    Rejected,
    Contacted,
}

impl Status {
    pub const ALL: [Status; 4] = [
        Status::Pending,
        Status::Approved,
        Status::Rejected,
        Status::Contacted,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Approved => "approved",
            Status::Rejected => "rejected",
            Status::Contacted => "contacted",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Status::Pending => "Pending",
            Status::Approved => "Approved",
            Status::Rejected => "Rejected",
            Status::Contacted => "Contacted",
        }
    }
}

impl FromStr for Status {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Status::ALL
            .into_iter()
            .find(|status| status.as_str() == value)
            .ok_or_else(|| UnknownVariant::new("status", value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::Urgent,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
            Priority::Urgent => "Urgent",
        }
    }
}

impl FromStr for Priority {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Priority::ALL
            .into_iter()
            .find(|priority| priority.as_str() == value)
            .ok_or_else(|| UnknownVariant::new("priority", value))
    }
}

/// Self-reported use case collected at signup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Freelancer,
    Manager,
    Student,
    BusinessOwner,
}

impl Role {
    pub const ALL: [Role; 4] = [
        Role::Freelancer,
        Role::Manager,
        Role::Student,
        Role::BusinessOwner,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Freelancer => "freelancer",
            Role::Manager => "manager",
            Role::Student => "student",
            Role::BusinessOwner => "business_owner",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Role::Freelancer => "Freelancer",
            Role::Manager => "Manager",
            Role::Student => "Student",
            Role::BusinessOwner => "Business Owner",
        }
    }
}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == value)
            .ok_or_else(|| UnknownVariant::new("role", value))
    }
}

/// A single signup on the waitlist.
///
/// `position` is handed out once at creation and never recalculated, so
/// positions are strictly increasing in creation order but may have gaps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitlistEntry {
    pub id: i64,
    pub email: String,
    pub role: Option<Role>,
    pub status: Status,
    pub priority: Priority,
    pub admin_notes: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub position: i32,
}

impl WaitlistEntry {
    pub fn days_waiting(&self, now: NaiveDateTime) -> i64 {
        days_between(self.created_at, now)
    }
}

impl fmt::Display for WaitlistEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.email, self.status.label())
    }
}

/// Whole days elapsed from `since` to `now`, rounded toward negative infinity.
pub fn days_between(since: NaiveDateTime, now: NaiveDateTime) -> i64 {
    let elapsed = now - since;
    let days = elapsed.num_days();
    if elapsed < chrono::Duration::days(days) {
        days - 1
    } else {
        days
    }
}

pub fn days_waiting_display(days: i64) -> String {
    match days {
        0 => "Today".to_string(),
        1 => "1 day".to_string(),
        n => format!("{n} days"),
    }
}

/// Trims and lower-cases an address the way it is stored.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn parses_stored_values() {
        assert_eq!("contacted".parse::<Status>().unwrap(), Status::Contacted);
        assert_eq!("urgent".parse::<Priority>().unwrap(), Priority::Urgent);
        assert_eq!(
            "business_owner".parse::<Role>().unwrap(),
            Role::BusinessOwner
        );
        let err = "Pending".parse::<Status>().unwrap_err();
        assert_eq!(err.to_string(), "unknown status 'Pending'");
    }

    #[test]
    fn defaults_match_new_signups() {
        assert_eq!(Status::default(), Status::Pending);
        assert_eq!(Priority::default(), Priority::Medium);
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&Role::BusinessOwner).unwrap();
        assert_eq!(json, "\"business_owner\"");
        let parsed: Priority = serde_json::from_str("\"high\"").unwrap();
        assert_eq!(parsed, Priority::High);
    }

    #[test]
    fn days_waiting_floors_partial_days() {
        assert_eq!(days_between(at(1, 12), at(1, 23)), 0);
        assert_eq!(days_between(at(1, 12), at(2, 11)), 0);
        assert_eq!(days_between(at(1, 12), at(2, 12)), 1);
        assert_eq!(days_between(at(1, 12), at(11, 13)), 10);
        assert_eq!(days_between(at(2, 12), at(2, 12) - Duration::hours(1)), -1);
    }

    #[test]
    fn days_waiting_display_wording() {
        assert_eq!(days_waiting_display(0), "Today");
        assert_eq!(days_waiting_display(1), "1 day");
        assert_eq!(days_waiting_display(12), "12 days");
    }

    #[test]
    fn display_includes_status_label() {
        let entry = WaitlistEntry {
            id: 1,
            email: "ada@example.com".into(),
            role: None,
            status: Status::Approved,
            priority: Priority::Medium,
            admin_notes: String::new(),
            created_at: at(1, 0),
            updated_at: at(1, 0),
            position: 1,
        };
        assert_eq!(entry.to_string(), "ada@example.com - Approved");
    }

    #[test]
    fn normalizes_email_case_and_whitespace() {
        assert_eq!(normalize_email("  User@Example.COM "), "user@example.com");
    }
}
