use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use time::OffsetDateTime;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::jwt::AuthUser,
    entries::{
        dto::{CreateEntryRequest, EntryFilters, EntryPatch, EntryResponse, SummaryResponse},
        repo::{EntryChanges, EntryFilter, EntryUpdate, TimeEntry},
    },
    error::ApiError,
    state::AppState,
    util::{parse_timestamp, seconds_to_hours},
};

pub fn entry_routes() -> Router<AppState> {
    Router::new()
        .route("/api/entries", get(list_entries).post(create_entry))
        .route("/api/entries/summary", get(get_summary))
        .route(
            "/api/entries/:id",
            get(get_entry).put(update_entry).delete(delete_entry),
        )
}

fn parse_uuid(raw: &str, message: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::validation(message))
}

fn parse_time(raw: &str, message: &str) -> Result<OffsetDateTime, ApiError> {
    parse_timestamp(raw).ok_or_else(|| {
        warn!(value = %raw, "unparseable timestamp");
        ApiError::validation(message)
    })
}

fn non_empty(raw: &Option<String>) -> Option<&str> {
    raw.as_deref().filter(|s| !s.is_empty())
}

impl EntryFilters {
    fn resolve(&self) -> Result<EntryFilter, ApiError> {
        let project_id = non_empty(&self.project_id)
            .map(|raw| parse_uuid(raw, "Invalid project_id"))
            .transpose()?;
        let start_date = non_empty(&self.start_date)
            .map(|raw| parse_time(raw, "Invalid start_date format"))
            .transpose()?;
        let end_date = non_empty(&self.end_date)
            .map(|raw| parse_time(raw, "Invalid end_date format"))
            .transpose()?;
        let is_billable = non_empty(&self.is_billable).map(|v| v.eq_ignore_ascii_case("true"));
        Ok(EntryFilter {
            project_id,
            start_date,
            end_date,
            is_billable,
        })
    }
}

#[instrument(skip(state))]
pub async fn list_entries(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(filters): Query<EntryFilters>,
) -> Result<Json<Vec<EntryResponse>>, ApiError> {
    let filter = filters.resolve()?;
    let entries = TimeEntry::list(&state.db, user_id, filter).await?;
    Ok(Json(entries.into_iter().map(EntryResponse::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_entry(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<EntryResponse>, ApiError> {
    let entry = TimeEntry::get(&state.db, user_id, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Time entry not found"))?;
    Ok(Json(entry.into()))
}

#[instrument(skip(state, payload))]
pub async fn create_entry(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateEntryRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let (Some(project_raw), Some(start_raw)) =
        (non_empty(&payload.project_id), non_empty(&payload.start_time))
    else {
        return Err(ApiError::validation("project_id and start_time are required"));
    };

    let project_id = parse_uuid(project_raw, "Invalid project_id")?;
    let start_time = parse_time(start_raw, "Invalid datetime format")?;
    let end_time = non_empty(&payload.end_time)
        .map(|raw| parse_time(raw, "Invalid datetime format"))
        .transpose()?;

    let entry = TimeEntry::create(
        &state.db,
        user_id,
        project_id,
        start_time,
        end_time,
        payload.notes.as_deref(),
        payload.is_billable.unwrap_or(true),
    )
    .await?
    .ok_or_else(|| ApiError::not_found("Project not found"))?;

    info!(entry_id = %entry.id, user_id = %user_id, "time entry created");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Time entry created successfully",
            "entry": EntryResponse::from(entry),
        })),
    ))
}

#[instrument(skip(state, patch))]
pub async fn update_entry(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(patch): Json<EntryPatch>,
) -> Result<Json<Value>, ApiError> {
    let project_id = patch
        .project_id
        .as_deref()
        .map(|raw| parse_uuid(raw, "Invalid project_id"))
        .transpose()?;
    let start_time = patch
        .start_time
        .as_deref()
        .map(|raw| parse_time(raw, "Invalid start_time format"))
        .transpose()?;
    let end_time = match &patch.end_time {
        None => None,
        Some(None) => Some(None),
        Some(Some(raw)) => Some(Some(parse_time(raw, "Invalid end_time format")?)),
    };

    let changes = EntryChanges {
        project_id,
        start_time,
        end_time,
        notes: patch.notes,
        is_billable: patch.is_billable,
    };

    match TimeEntry::update(&state.db, user_id, id, changes).await? {
        EntryUpdate::Updated(entry) => {
            info!(entry_id = %entry.id, user_id = %user_id, "time entry updated");
            Ok(Json(json!({
                "message": "Time entry updated successfully",
                "entry": EntryResponse::from(entry),
            })))
        }
        EntryUpdate::EntryNotFound => Err(ApiError::not_found("Time entry not found")),
        EntryUpdate::ProjectNotFound => Err(ApiError::not_found("Project not found")),
    }
}

#[instrument(skip(state))]
pub async fn delete_entry(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    if !TimeEntry::delete(&state.db, user_id, id).await? {
        return Err(ApiError::not_found("Time entry not found"));
    }
    info!(entry_id = %id, user_id = %user_id, "time entry deleted");
    Ok(Json(json!({ "message": "Time entry deleted successfully" })))
}

#[instrument(skip(state))]
pub async fn get_summary(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(filters): Query<EntryFilters>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let filter = filters.resolve()?;
    let summary = TimeEntry::summary(&state.db, user_id, filter).await?;
    Ok(Json(SummaryResponse {
        total_entries: summary.total_entries,
        total_hours: seconds_to_hours(summary.total_seconds),
        billable_hours: seconds_to_hours(summary.billable_seconds),
        non_billable_hours: seconds_to_hours(summary.total_seconds - summary.billable_seconds),
    }))
}
