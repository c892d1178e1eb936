//! Consecutive-day submission streaks.

use std::collections::HashSet;

use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A submission as stored by the feed. Only `created_at` is read here;
/// everything else is carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRecord {
    pub id: String,
    #[serde(alias = "created_at")]
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SubmissionRecord {
    pub fn new(id: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            created_at,
            extra: Map::new(),
        }
    }

    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }
}

/// Streak ending today in the local timezone.
pub fn compute_streak(records: &[SubmissionRecord]) -> u32 {
    compute_streak_at(records, Local::now().date_naive(), &Local)
}

/// Count consecutive days with at least one submission, walking back from
/// `today`. Timestamps are bucketed by calendar day in `tz`.
pub fn compute_streak_at<Tz: TimeZone>(records: &[SubmissionRecord], today: NaiveDate, tz: &Tz) -> u32 {
    let days: HashSet<NaiveDate> = records
        .iter()
        .map(|r| r.created_at.with_timezone(tz).date_naive())
        .collect();

    let mut streak = 0;
    let mut day = Some(today);
    while let Some(d) = day.filter(|d| days.contains(d)) {
        streak += 1;
        day = d.pred_opt();
    }
    streak
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, FixedOffset};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    /// Noon UTC, `days_ago` days before `today()`.
    fn at(days_ago: i64) -> SubmissionRecord {
        let day = today() - Duration::days(days_ago);
        let ts = day.and_hms_opt(12, 0, 0).unwrap().and_utc();
        SubmissionRecord::new(format!("sub-{days_ago}"), ts)
    }

    #[test]
    fn gap_breaks_the_chain() {
        let records = [at(0), at(1), at(2), at(4)];
        assert_eq!(compute_streak_at(&records, today(), &Utc), 3);
    }

    #[test]
    fn empty_history_is_zero() {
        assert_eq!(compute_streak_at(&[], today(), &Utc), 0);
    }

    #[test]
    fn missing_today_is_zero() {
        let records = [at(1), at(2), at(3)];
        assert_eq!(compute_streak_at(&records, today(), &Utc), 0);
    }

    #[test]
    fn same_day_counts_once() {
        let mut second = at(0);
        second.id = "sub-0b".into();
        second.created_at += Duration::hours(3);
        let records = [at(0), second, at(1)];
        assert_eq!(compute_streak_at(&records, today(), &Utc), 2);
    }

    #[test]
    fn order_does_not_matter() {
        let records = [at(2), at(0), at(1)];
        assert_eq!(compute_streak_at(&records, today(), &Utc), 3);
    }

    #[test]
    fn days_are_bucketed_in_the_given_timezone() {
        // 02:00 UTC on the 19th is still the evening of the 18th at UTC-5.
        let early = NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(2, 0, 0)
            .unwrap()
            .and_utc();
        let records = [SubmissionRecord::new("late-night", early)];
        let eastern = FixedOffset::west_opt(5 * 3600).unwrap();

        assert_eq!(compute_streak_at(&records, today(), &Utc), 1);
        assert_eq!(compute_streak_at(&records, today(), &eastern), 0);
        assert_eq!(compute_streak_at(&records, today() - Duration::days(1), &eastern), 1);
    }

    #[test]
    fn record_round_trips_opaque_fields() {
        let json = r#"{"id":"abc","createdAt":"2026-10-19T08:30:00Z","photoUrl":"https://x/y.jpg","altText":"A cat"}"#;
        let record: SubmissionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, "abc");
        assert_eq!(record.extra["photoUrl"], "https://x/y.jpg");

        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back["altText"], "A cat");
        assert_eq!(back["createdAt"], "2026-10-19T08:30:00Z");
    }
}
