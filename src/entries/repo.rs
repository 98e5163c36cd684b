use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::util::duration_seconds;

/// A time entry joined with its project's name.
#[derive(Debug, Clone, FromRow)]
pub struct TimeEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub project_id: Uuid,
    pub project_name: String,
    pub start_time: OffsetDateTime,
    pub end_time: Option<OffsetDateTime>,
    pub duration: Option<i64>,
    pub notes: Option<String>,
    pub is_billable: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Parsed, typed changes for an entry update. Inner `Option`s on `end_time`
/// and `notes` carry "set to null".
#[derive(Debug, Default)]
pub struct EntryChanges {
    pub project_id: Option<Uuid>,
    pub start_time: Option<OffsetDateTime>,
    pub end_time: Option<Option<OffsetDateTime>>,
    pub notes: Option<Option<String>>,
    pub is_billable: Option<bool>,
}

#[derive(Debug)]
pub enum EntryUpdate {
    Updated(TimeEntry),
    EntryNotFound,
    ProjectNotFound,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EntryFilter {
    pub project_id: Option<Uuid>,
    pub start_date: Option<OffsetDateTime>,
    pub end_date: Option<OffsetDateTime>,
    pub is_billable: Option<bool>,
}

#[derive(Debug, Clone, Copy, FromRow)]
pub struct EntrySummary {
    pub total_entries: i64,
    pub total_seconds: i64,
    pub billable_seconds: i64,
}

impl TimeEntry {
    pub async fn list(
        db: &PgPool,
        user_id: Uuid,
        filter: EntryFilter,
    ) -> anyhow::Result<Vec<TimeEntry>> {
        let rows = sqlx::query_as::<_, TimeEntry>(
            r#"
            SELECT e.id, e.user_id, e.project_id, p.name AS project_name,
                   e.start_time, e.end_time, e.duration, e.notes, e.is_billable,
                   e.created_at, e.updated_at
            FROM time_entries e
            JOIN projects p ON p.id = e.project_id
            WHERE e.user_id = $1
              AND ($2::uuid IS NULL OR e.project_id = $2)
              AND ($3::timestamptz IS NULL OR e.start_time >= $3)
              AND ($4::timestamptz IS NULL OR e.start_time <= $4)
              AND ($5::boolean IS NULL OR e.is_billable = $5)
            ORDER BY e.start_time DESC
            "#,
        )
        .bind(user_id)
        .bind(filter.project_id)
        .bind(filter.start_date)
        .bind(filter.end_date)
        .bind(filter.is_billable)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// Ownership-scoped lookup: another user's entry is indistinguishable
    /// from a missing one.
    pub async fn get(db: &PgPool, user_id: Uuid, id: Uuid) -> anyhow::Result<Option<TimeEntry>> {
        let entry = sqlx::query_as::<_, TimeEntry>(
            r#"
            SELECT e.id, e.user_id, e.project_id, p.name AS project_name,
                   e.start_time, e.end_time, e.duration, e.notes, e.is_billable,
                   e.created_at, e.updated_at
            FROM time_entries e
            JOIN projects p ON p.id = e.project_id
            WHERE e.id = $1 AND e.user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(db)
        .await?;
        Ok(entry)
    }

    /// Insert a new entry after confirming the target project exists, both
    /// inside one transaction. Returns `None` when the project is missing.
    pub async fn create(
        db: &PgPool,
        user_id: Uuid,
        project_id: Uuid,
        start_time: OffsetDateTime,
        end_time: Option<OffsetDateTime>,
        notes: Option<&str>,
        is_billable: bool,
    ) -> anyhow::Result<Option<TimeEntry>> {
        let mut tx = db.begin().await?;

        let project: Option<(String,)> =
            sqlx::query_as("SELECT name FROM projects WHERE id = $1")
                .bind(project_id)
                .fetch_optional(&mut *tx)
                .await?;
        if project.is_none() {
            return Ok(None);
        }

        let duration = end_time.map(|end| duration_seconds(start_time, end));

        let entry = sqlx::query_as::<_, TimeEntry>(
            r#"
            WITH e AS (
                INSERT INTO time_entries
                    (id, user_id, project_id, start_time, end_time, duration, notes, is_billable)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING id, user_id, project_id, start_time, end_time, duration, notes,
                          is_billable, created_at, updated_at
            )
            SELECT e.id, e.user_id, e.project_id, p.name AS project_name,
                   e.start_time, e.end_time, e.duration, e.notes, e.is_billable,
                   e.created_at, e.updated_at
            FROM e
            JOIN projects p ON p.id = e.project_id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(project_id)
        .bind(start_time)
        .bind(end_time)
        .bind(duration)
        .bind(notes)
        .bind(is_billable)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(entry))
    }

    /// Load the caller's entry, apply the present changes, recompute the
    /// duration from the post-update times, and persist, all in one
    /// transaction. A changed project_id is re-validated against the
    /// projects table.
    pub async fn update(
        db: &PgPool,
        user_id: Uuid,
        id: Uuid,
        changes: EntryChanges,
    ) -> anyhow::Result<EntryUpdate> {
        let mut tx = db.begin().await?;

        let found = sqlx::query_as::<_, TimeEntry>(
            r#"
            SELECT e.id, e.user_id, e.project_id, p.name AS project_name,
                   e.start_time, e.end_time, e.duration, e.notes, e.is_billable,
                   e.created_at, e.updated_at
            FROM time_entries e
            JOIN projects p ON p.id = e.project_id
            WHERE e.id = $1 AND e.user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(mut entry) = found else {
            return Ok(EntryUpdate::EntryNotFound);
        };

        if let Some(project_id) = changes.project_id {
            let project: Option<(String,)> =
                sqlx::query_as("SELECT name FROM projects WHERE id = $1")
                    .bind(project_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            let Some((project_name,)) = project else {
                return Ok(EntryUpdate::ProjectNotFound);
            };
            entry.project_id = project_id;
            entry.project_name = project_name;
        }
        if let Some(start_time) = changes.start_time {
            entry.start_time = start_time;
        }
        if let Some(end_time) = changes.end_time {
            entry.end_time = end_time;
        }
        if let Some(notes) = changes.notes {
            entry.notes = notes;
        }
        if let Some(is_billable) = changes.is_billable {
            entry.is_billable = is_billable;
        }
        // Derived invariant: duration tracks the (possibly new) interval and
        // is null while the entry is open.
        entry.duration = entry
            .end_time
            .map(|end| duration_seconds(entry.start_time, end));

        let updated = sqlx::query_as::<_, TimeEntry>(
            r#"
            WITH e AS (
                UPDATE time_entries
                SET project_id = $3, start_time = $4, end_time = $5, duration = $6,
                    notes = $7, is_billable = $8, updated_at = now()
                WHERE id = $1 AND user_id = $2
                RETURNING id, user_id, project_id, start_time, end_time, duration, notes,
                          is_billable, created_at, updated_at
            )
            SELECT e.id, e.user_id, e.project_id, p.name AS project_name,
                   e.start_time, e.end_time, e.duration, e.notes, e.is_billable,
                   e.created_at, e.updated_at
            FROM e
            JOIN projects p ON p.id = e.project_id
            "#,
        )
        .bind(entry.id)
        .bind(user_id)
        .bind(entry.project_id)
        .bind(entry.start_time)
        .bind(entry.end_time)
        .bind(entry.duration)
        .bind(&entry.notes)
        .bind(entry.is_billable)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(EntryUpdate::Updated(updated))
    }

    pub async fn delete(db: &PgPool, user_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM time_entries WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn summary(
        db: &PgPool,
        user_id: Uuid,
        filter: EntryFilter,
    ) -> anyhow::Result<EntrySummary> {
        let summary = sqlx::query_as::<_, EntrySummary>(
            r#"
            SELECT COUNT(*) AS total_entries,
                   COALESCE(SUM(duration), 0)::BIGINT AS total_seconds,
                   COALESCE(SUM(duration) FILTER (WHERE is_billable), 0)::BIGINT AS billable_seconds
            FROM time_entries
            WHERE user_id = $1
              AND ($2::uuid IS NULL OR project_id = $2)
              AND ($3::timestamptz IS NULL OR start_time >= $3)
              AND ($4::timestamptz IS NULL OR start_time <= $4)
            "#,
        )
        .bind(user_id)
        .bind(filter.project_id)
        .bind(filter.start_date)
        .bind(filter.end_date)
        .fetch_one(db)
        .await?;
        Ok(summary)
    }
}
