use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::projects::repo::{Project, ProjectStats};
use crate::util::{double_option, seconds_to_hours};

pub const VALID_STATUSES: &[&str] = &["active", "archived", "completed"];

pub const DEFAULT_STATUS: &str = "active";
pub const DEFAULT_COLOR: &str = "#3B82F6";

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub color: Option<String>,
}

/// Partial update. `description` is nullable, so it distinguishes an absent
/// field (no change) from an explicit `null` (clear the field).
#[derive(Debug, Default, Deserialize)]
pub struct ProjectPatch {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub status: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProjectQuery {
    pub status: Option<String>,
    pub include_stats: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProjectResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: String,
    pub color: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_hours: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_count: Option<i64>,
}

impl ProjectResponse {
    pub fn new(project: Project, stats: Option<ProjectStats>) -> Self {
        Self {
            id: project.id,
            name: project.name,
            description: project.description,
            status: project.status,
            color: project.color,
            created_at: project.created_at,
            updated_at: project.updated_at,
            total_hours: stats.map(|s| seconds_to_hours(s.total_seconds)),
            entry_count: stats.map(|s| s.entry_count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn project() -> Project {
        Project {
            id: Uuid::new_v4(),
            name: "Acme".into(),
            description: None,
            status: "active".into(),
            color: "#3B82F6".into(),
            created_at: datetime!(2024-01-01 00:00:00 UTC),
            updated_at: datetime!(2024-01-01 00:00:00 UTC),
        }
    }

    #[test]
    fn stats_fields_are_omitted_without_stats() {
        let json = serde_json::to_value(ProjectResponse::new(project(), None)).unwrap();
        assert_eq!(json["status"], "active");
        assert_eq!(json["color"], "#3B82F6");
        assert!(json.get("total_hours").is_none());
        assert!(json.get("entry_count").is_none());
    }

    #[test]
    fn stats_fields_are_present_with_stats() {
        let stats = ProjectStats {
            total_seconds: 9000,
            entry_count: 1,
        };
        let json = serde_json::to_value(ProjectResponse::new(project(), Some(stats))).unwrap();
        assert_eq!(json["total_hours"], 2.5);
        assert_eq!(json["entry_count"], 1);
    }

    #[test]
    fn patch_description_absent_vs_null() {
        let p: ProjectPatch = serde_json::from_str(r#"{"name": "x"}"#).unwrap();
        assert!(p.description.is_none());

        let p: ProjectPatch = serde_json::from_str(r#"{"description": null}"#).unwrap();
        assert_eq!(p.description, Some(None));

        let p: ProjectPatch = serde_json::from_str(r#"{"description": "notes"}"#).unwrap();
        assert_eq!(p.description, Some(Some("notes".into())));
    }
}
