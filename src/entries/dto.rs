use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::entries::repo::TimeEntry;
use crate::util::{double_option, seconds_to_hours};

#[derive(Debug, Deserialize)]
pub struct CreateEntryRequest {
    pub project_id: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub notes: Option<String>,
    pub is_billable: Option<bool>,
}

/// Partial update. `end_time` and `notes` are nullable: an explicit `null`
/// clears the field (reopening the entry in the `end_time` case), while an
/// absent field leaves it untouched.
#[derive(Debug, Default, Deserialize)]
pub struct EntryPatch {
    pub project_id: Option<String>,
    pub start_time: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub end_time: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
    pub is_billable: Option<bool>,
}

/// Query-string filters; empty values mean "absent". Raw strings are parsed
/// by the handler so bad values map to 400.
#[derive(Debug, Deserialize)]
pub struct EntryFilters {
    pub project_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub is_billable: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EntryResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub project_id: Uuid,
    pub project_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub end_time: Option<OffsetDateTime>,
    pub duration: Option<i64>,
    pub duration_hours: Option<f64>,
    pub notes: Option<String>,
    pub is_billable: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<TimeEntry> for EntryResponse {
    fn from(e: TimeEntry) -> Self {
        let duration_hours = match e.duration {
            Some(d) if d != 0 => Some(seconds_to_hours(d)),
            _ => None,
        };
        Self {
            id: e.id,
            user_id: e.user_id,
            project_id: e.project_id,
            project_name: e.project_name,
            start_time: e.start_time,
            end_time: e.end_time,
            duration: e.duration,
            duration_hours,
            notes: e.notes,
            is_billable: e.is_billable,
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub total_entries: i64,
    pub total_hours: f64,
    pub billable_hours: f64,
    pub non_billable_hours: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn entry(duration: Option<i64>) -> TimeEntry {
        TimeEntry {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            project_name: "Acme".into(),
            start_time: datetime!(2024-01-01 09:00:00 UTC),
            end_time: duration.map(|d| datetime!(2024-01-01 09:00:00 UTC) + time::Duration::seconds(d)),
            duration,
            notes: None,
            is_billable: true,
            created_at: datetime!(2024-01-01 09:00:00 UTC),
            updated_at: datetime!(2024-01-01 09:00:00 UTC),
        }
    }

    #[test]
    fn closed_entry_reports_duration_hours() {
        let resp = EntryResponse::from(entry(Some(9000)));
        assert_eq!(resp.duration, Some(9000));
        assert_eq!(resp.duration_hours, Some(2.5));
    }

    #[test]
    fn open_entry_has_null_duration_fields() {
        let json = serde_json::to_value(EntryResponse::from(entry(None))).unwrap();
        assert_eq!(json["duration"], serde_json::Value::Null);
        assert_eq!(json["duration_hours"], serde_json::Value::Null);
        assert_eq!(json["end_time"], serde_json::Value::Null);
        assert_eq!(json["start_time"], "2024-01-01T09:00:00Z");
        assert_eq!(json["project_name"], "Acme");
    }

    #[test]
    fn zero_duration_has_no_duration_hours() {
        let resp = EntryResponse::from(entry(Some(0)));
        assert_eq!(resp.duration, Some(0));
        assert_eq!(resp.duration_hours, None);
    }

    #[test]
    fn patch_end_time_absent_null_and_value() {
        let p: EntryPatch = serde_json::from_str(r#"{"notes": "x"}"#).unwrap();
        assert!(p.end_time.is_none());

        let p: EntryPatch = serde_json::from_str(r#"{"end_time": null}"#).unwrap();
        assert_eq!(p.end_time, Some(None));

        let p: EntryPatch =
            serde_json::from_str(r#"{"end_time": "2024-01-01T11:30:00Z"}"#).unwrap();
        assert_eq!(p.end_time, Some(Some("2024-01-01T11:30:00Z".into())));
    }

    #[test]
    fn create_request_defaults() {
        let req: CreateEntryRequest = serde_json::from_str(r#"{}"#).unwrap();
        assert!(req.project_id.is_none());
        assert!(req.start_time.is_none());
        assert!(req.is_billable.is_none());
    }
}
