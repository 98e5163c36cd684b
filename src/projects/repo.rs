use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::projects::dto::ProjectPatch;

#[derive(Debug, Clone, FromRow)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: String,
    pub color: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Aggregates over a project's time entries. Open entries (null duration)
/// contribute nothing to the sum but do count.
#[derive(Debug, Clone, Copy, FromRow)]
pub struct ProjectStats {
    pub total_seconds: i64,
    pub entry_count: i64,
}

impl Project {
    pub async fn list(db: &PgPool, status: Option<&str>) -> anyhow::Result<Vec<Project>> {
        let rows = sqlx::query_as::<_, Project>(
            r#"
            SELECT id, name, description, status, color, created_at, updated_at
            FROM projects
            WHERE ($1::text IS NULL OR status = $1)
            ORDER BY created_at DESC
            "#,
        )
        .bind(status)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn get(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Project>> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            SELECT id, name, description, status, color, created_at, updated_at
            FROM projects
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(project)
    }

    pub async fn create(
        db: &PgPool,
        name: &str,
        description: Option<&str>,
        status: &str,
        color: &str,
    ) -> anyhow::Result<Project> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (id, name, description, status, color)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, description, status, color, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(description)
        .bind(status)
        .bind(color)
        .fetch_one(db)
        .await?;
        Ok(project)
    }

    /// Load, apply the patch fields that are present, and persist, all in
    /// one transaction. Returns `None` when the project does not exist.
    pub async fn update(
        db: &PgPool,
        id: Uuid,
        patch: ProjectPatch,
    ) -> anyhow::Result<Option<Project>> {
        let mut tx = db.begin().await?;

        let found = sqlx::query_as::<_, Project>(
            r#"
            SELECT id, name, description, status, color, created_at, updated_at
            FROM projects
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(mut project) = found else {
            return Ok(None);
        };

        if let Some(name) = patch.name {
            project.name = name;
        }
        if let Some(description) = patch.description {
            project.description = description;
        }
        if let Some(status) = patch.status {
            project.status = status;
        }
        if let Some(color) = patch.color {
            project.color = color;
        }

        let updated = sqlx::query_as::<_, Project>(
            r#"
            UPDATE projects
            SET name = $2, description = $3, status = $4, color = $5, updated_at = now()
            WHERE id = $1
            RETURNING id, name, description, status, color, created_at, updated_at
            "#,
        )
        .bind(project.id)
        .bind(&project.name)
        .bind(&project.description)
        .bind(&project.status)
        .bind(&project.color)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(updated))
    }

    /// Hard delete; associated time entries go with it via FK cascade.
    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn stats(db: &PgPool, id: Uuid) -> anyhow::Result<ProjectStats> {
        let stats = sqlx::query_as::<_, ProjectStats>(
            r#"
            SELECT COALESCE(SUM(duration), 0)::BIGINT AS total_seconds,
                   COUNT(*) AS entry_count
            FROM time_entries
            WHERE project_id = $1
            "#,
        )
        .bind(id)
        .fetch_one(db)
        .await?;
        Ok(stats)
    }
}
