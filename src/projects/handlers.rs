use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::jwt::AuthUser,
    error::ApiError,
    projects::{
        dto::{
            CreateProjectRequest, ProjectPatch, ProjectQuery, ProjectResponse, DEFAULT_COLOR,
            DEFAULT_STATUS, VALID_STATUSES,
        },
        repo::{Project, ProjectStats},
    },
    state::AppState,
};

pub fn project_routes() -> Router<AppState> {
    Router::new()
        .route("/api/projects", get(list_projects).post(create_project))
        .route(
            "/api/projects/:id",
            get(get_project).put(update_project).delete(delete_project),
        )
}

fn validate_status(status: &str) -> Result<(), ApiError> {
    if VALID_STATUSES.contains(&status) {
        Ok(())
    } else {
        warn!(status = %status, "invalid project status");
        Err(ApiError::validation("Invalid project status"))
    }
}

fn wants_stats(raw: &Option<String>) -> bool {
    raw.as_deref()
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

async fn with_stats(
    state: &AppState,
    project: Project,
    include_stats: bool,
) -> Result<ProjectResponse, ApiError> {
    let stats: Option<ProjectStats> = if include_stats {
        Some(Project::stats(&state.db, project.id).await?)
    } else {
        None
    };
    Ok(ProjectResponse::new(project, stats))
}

#[instrument(skip(state))]
pub async fn list_projects(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Query(query): Query<ProjectQuery>,
) -> Result<Json<Vec<ProjectResponse>>, ApiError> {
    let status = query.status.as_deref().filter(|s| !s.is_empty());
    if let Some(status) = status {
        validate_status(status)?;
    }
    let include_stats = wants_stats(&query.include_stats);

    let projects = Project::list(&state.db, status).await?;
    let mut out = Vec::with_capacity(projects.len());
    for project in projects {
        out.push(with_stats(&state, project, include_stats).await?);
    }
    Ok(Json(out))
}

#[instrument(skip(state))]
pub async fn get_project(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Path(id): Path<Uuid>,
    Query(query): Query<ProjectQuery>,
) -> Result<Json<ProjectResponse>, ApiError> {
    let project = Project::get(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Project not found"))?;
    let response = with_stats(&state, project, wants_stats(&query.include_stats)).await?;
    Ok(Json(response))
}

#[instrument(skip(state, payload))]
pub async fn create_project(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Json(payload): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let name = payload
        .name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::validation("Project name is required"))?;
    let status = payload.status.as_deref().unwrap_or(DEFAULT_STATUS);
    validate_status(status)?;
    let color = payload.color.as_deref().unwrap_or(DEFAULT_COLOR);

    let project =
        Project::create(&state.db, name, payload.description.as_deref(), status, color).await?;

    info!(project_id = %project.id, name = %project.name, "project created");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Project created successfully",
            "project": ProjectResponse::new(project, None),
        })),
    ))
}

#[instrument(skip(state, patch))]
pub async fn update_project(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(patch): Json<ProjectPatch>,
) -> Result<Json<Value>, ApiError> {
    if let Some(name) = patch.name.as_deref() {
        if name.trim().is_empty() {
            return Err(ApiError::validation("Project name is required"));
        }
    }
    if let Some(status) = patch.status.as_deref() {
        validate_status(status)?;
    }

    let project = Project::update(&state.db, id, patch)
        .await?
        .ok_or_else(|| ApiError::not_found("Project not found"))?;

    info!(project_id = %project.id, "project updated");
    Ok(Json(json!({
        "message": "Project updated successfully",
        "project": ProjectResponse::new(project, None),
    })))
}

#[instrument(skip(state))]
pub async fn delete_project(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    if !Project::delete(&state.db, id).await? {
        return Err(ApiError::not_found("Project not found"));
    }
    info!(project_id = %id, "project deleted");
    Ok(Json(json!({ "message": "Project deleted successfully" })))
}
