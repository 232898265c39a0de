use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::entry::{Priority, Status, UnknownVariant};

pub const MAX_PAGE_SIZE: u32 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionEffect {
    Status(Status),
    Priority(Priority),
}

/// Bulk actions an operator can apply to a selection of entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminAction {
    MarkAsApproved,
    MarkAsContacted,
    MarkAsRejected,
    SetHighPriority,
    SetLowPriority,
}

impl AdminAction {
    pub const ALL: [AdminAction; 5] = [
        AdminAction::MarkAsApproved,
        AdminAction::MarkAsContacted,
        AdminAction::MarkAsRejected,
        AdminAction::SetHighPriority,
        AdminAction::SetLowPriority,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AdminAction::MarkAsApproved => "mark_as_approved",
            AdminAction::MarkAsContacted => "mark_as_contacted",
            AdminAction::MarkAsRejected => "mark_as_rejected",
            AdminAction::SetHighPriority => "set_high_priority",
            AdminAction::SetLowPriority => "set_low_priority",
        }
    }

    pub fn effect(self) -> ActionEffect {
        match self {
            AdminAction::MarkAsApproved => ActionEffect::Status(Status::Approved),
            AdminAction::MarkAsContacted => ActionEffect::Status(Status::Contacted),
            AdminAction::MarkAsRejected => ActionEffect::Status(Status::Rejected),
            AdminAction::SetHighPriority => ActionEffect::Priority(Priority::High),
            AdminAction::SetLowPriority => ActionEffect::Priority(Priority::Low),
        }
    }

    pub fn description(self) -> String {
        match self.effect() {
            ActionEffect::Status(status) => {
                format!("Mark selected entries as {}", status.as_str())
            }
            ActionEffect::Priority(priority) => {
                format!("Set selected entries to {} priority", priority.as_str())
            }
        }
    }

    pub fn message(self, updated: usize) -> String {
        match self.effect() {
            ActionEffect::Status(status) => {
                format!("{updated} entries marked as {}.", status.as_str())
            }
            ActionEffect::Priority(priority) => {
                format!("{updated} entries set to {} priority.", priority.as_str())
            }
        }
    }
}

impl FromStr for AdminAction {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        AdminAction::ALL
            .into_iter()
            .find(|action| action.as_str() == value)
            .ok_or_else(|| UnknownVariant {
                kind: "action",
                value: value.to_string(),
            })
    }
}

/// Quick `created_at` windows offered next to the explicit date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum CreatedPreset {
    #[serde(rename = "today")]
    Today,
    #[serde(rename = "past_7_days")]
    Past7Days,
    #[serde(rename = "this_month")]
    ThisMonth,
    #[serde(rename = "this_year")]
    ThisYear,
}

/// Half-open `[from, until)` bounds on `created_at`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CreatedRange {
    pub from: Option<NaiveDateTime>,
    pub until: Option<NaiveDateTime>,
}

impl CreatedRange {
    /// Combines a preset with inclusive calendar dates; the tighter bound wins.
    pub fn resolve(
        preset: Option<CreatedPreset>,
        after: Option<NaiveDate>,
        before: Option<NaiveDate>,
        now: NaiveDateTime,
    ) -> Self {
        let today = now.date();
        let mut range = match preset {
            None => CreatedRange::default(),
            Some(CreatedPreset::Today) => CreatedRange::days(today, next_day(today)),
            Some(CreatedPreset::Past7Days) => {
                CreatedRange::days(today - Duration::days(7), next_day(today))
            }
            Some(CreatedPreset::ThisMonth) => {
                let first = today.with_day(1).unwrap_or(today);
                CreatedRange::days(first, next_month(first))
            }
            Some(CreatedPreset::ThisYear) => {
                let first = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today);
                let next = NaiveDate::from_ymd_opt(today.year() + 1, 1, 1).unwrap_or(today);
                CreatedRange::days(first, next)
            }
        };

        if let Some(after) = after {
            let bound = start_of(after);
            range.from = Some(range.from.map_or(bound, |from| from.max(bound)));
        }
        if let Some(before) = before {
            let bound = start_of(next_day(before));
            range.until = Some(range.until.map_or(bound, |until| until.min(bound)));
        }

        range
    }

    fn days(from: NaiveDate, until: NaiveDate) -> Self {
        Self {
            from: Some(start_of(from)),
            until: Some(start_of(until)),
        }
    }
}

fn start_of(date: NaiveDate) -> NaiveDateTime {
    date.and_time(chrono::NaiveTime::default())
}

fn next_day(date: NaiveDate) -> NaiveDate {
    date.succ_opt().unwrap_or(date)
}

fn next_month(first: NaiveDate) -> NaiveDate {
    let (year, month) = if first.month() == 12 {
        (first.year() + 1, 1)
    } else {
        (first.year(), first.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(first)
}

/// Clamps caller paging input. Pages are 1-based.
pub fn page_request(page: Option<u32>, per_page: Option<u32>, default_per_page: u32) -> (u32, u32) {
    let per_page = per_page
        .unwrap_or(default_per_page)
        .clamp(1, MAX_PAGE_SIZE);
    let page = page.unwrap_or(1).max(1);
    (page, per_page)
}

/// Always at least one page, even when nothing matches.
pub fn num_pages(total: i64, per_page: u32) -> i64 {
    let per_page = i64::from(per_page.max(1));
    ((total + per_page - 1) / per_page).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 12, 18)
            .unwrap()
            .and_hms_opt(15, 45, 0)
            .unwrap()
    }

    fn midnight(y: i32, m: u32, d: u32) -> Option<NaiveDateTime> {
        Some(NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(0, 0, 0).unwrap())
    }

    #[test]
    fn action_messages_report_counts() {
        assert_eq!(
            AdminAction::MarkAsApproved.message(3),
            "3 entries marked as approved."
        );
        assert_eq!(
            AdminAction::MarkAsContacted.message(1),
            "1 entries marked as contacted."
        );
        assert_eq!(
            AdminAction::SetHighPriority.message(0),
            "0 entries set to high priority."
        );
        assert_eq!(
            AdminAction::SetLowPriority.description(),
            "Set selected entries to low priority"
        );
        assert_eq!(
            AdminAction::MarkAsRejected.description(),
            "Mark selected entries as rejected"
        );
    }

    #[test]
    fn actions_parse_from_path_segments() {
        for action in AdminAction::ALL {
            assert_eq!(action.as_str().parse::<AdminAction>().unwrap(), action);
        }
        assert!("delete_everything".parse::<AdminAction>().is_err());
        assert_eq!(
            AdminAction::SetLowPriority.effect(),
            ActionEffect::Priority(Priority::Low)
        );
    }

    #[test]
    fn presets_resolve_to_calendar_windows() {
        let today = CreatedRange::resolve(Some(CreatedPreset::Today), None, None, now());
        assert_eq!(today.from, midnight(2024, 12, 18));
        assert_eq!(today.until, midnight(2024, 12, 19));

        let week = CreatedRange::resolve(Some(CreatedPreset::Past7Days), None, None, now());
        assert_eq!(week.from, midnight(2024, 12, 11));

        let month = CreatedRange::resolve(Some(CreatedPreset::ThisMonth), None, None, now());
        assert_eq!(month.from, midnight(2024, 12, 1));
        assert_eq!(month.until, midnight(2025, 1, 1));

        let year = CreatedRange::resolve(Some(CreatedPreset::ThisYear), None, None, now());
        assert_eq!(year.from, midnight(2024, 1, 1));
        assert_eq!(year.until, midnight(2025, 1, 1));
    }

    #[test]
    fn explicit_dates_are_inclusive_and_tighten_presets() {
        let after = NaiveDate::from_ymd_opt(2024, 12, 5);
        let before = NaiveDate::from_ymd_opt(2024, 12, 10);
        let range = CreatedRange::resolve(None, after, before, now());
        assert_eq!(range.from, midnight(2024, 12, 5));
        assert_eq!(range.until, midnight(2024, 12, 11));

        let tightened =
            CreatedRange::resolve(Some(CreatedPreset::ThisMonth), after, None, now());
        assert_eq!(tightened.from, midnight(2024, 12, 5));
        assert_eq!(tightened.until, midnight(2025, 1, 1));

        assert_eq!(
            CreatedRange::resolve(None, None, None, now()),
            CreatedRange::default()
        );
    }

    #[test]
    fn paging_is_clamped() {
        assert_eq!(page_request(None, None, 50), (1, 50));
        assert_eq!(page_request(Some(0), Some(0), 50), (1, 1));
        assert_eq!(page_request(Some(4), Some(10_000), 50), (4, MAX_PAGE_SIZE));
    }

    #[test]
    fn page_count_rounds_up() {
        assert_eq!(num_pages(0, 50), 1);
        assert_eq!(num_pages(50, 50), 1);
        assert_eq!(num_pages(51, 50), 2);
        assert_eq!(num_pages(7, 3), 3);
    }
}
