use crate::ai::AiAssist;
use crate::analyzer::challenge::ChallengeRecommendation;
use crate::analyzer::report::{InsightReport, total_tasks};
use crate::analyzer::{self, TimeRange};
use crate::config::Config;
use crate::db::{Database, ImportSummary, NewTask, StorageError};
use crate::model::emotion::EmotionInfo;
use crate::model::{EmotionCode, Entry, ExportDocument, ModelError, Project, Task, flatten_tasks};
use anyhow::{Context, Result, anyhow};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use chrono::{Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;

#[derive(Clone)]
pub struct ApiState {
    pub config: Arc<Config>,
    pub assist: Option<Arc<AiAssist>>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/v1/status", get(status))
        .route("/api/v1/emotions", get(emotions))
        .route("/api/v1/entries", get(entries))
        .route("/api/v1/entries/:date", get(entry_by_date))
        .route("/api/v1/entries/:date/feeling", put(feeling_put))
        .route("/api/v1/tasks", post(task_create))
        .route("/api/v1/tasks/:id", delete(task_delete))
        .route("/api/v1/projects", get(projects_get).post(projects_post))
        .route("/api/v1/insights", get(insights))
        .route("/api/v1/challenges", get(challenges))
        .route("/api/v1/export", get(export))
        .route("/api/v1/import", post(import))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct EntriesQuery {
    from: Option<String>,
    to: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RangeQuery {
    range: Option<String>,
    date: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EntriesPayload {
    from: String,
    to: String,
    count: usize,
    entries: Vec<Entry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusPayload {
    api_port: u16,
    entry_count: usize,
    task_count: usize,
    project_count: usize,
    latest_entry_date: Option<String>,
    onboarding_complete: bool,
    ai_configured: bool,
    ai_cache_entries: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskCreatePayload {
    date: Option<String>,
    project_id: String,
    description: String,
    #[serde(default)]
    task_type: String,
    emotions: Vec<EmotionCode>,
    #[serde(default)]
    notes: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FeelingPayload {
    value: i64,
}

#[derive(Debug, Deserialize)]
struct ProjectCreatePayload {
    name: String,
    #[serde(default)]
    color: Option<String>,
}

async fn status(State(state): State<ApiState>) -> ApiResult<Json<StatusPayload>> {
    let database = Database::open(&state.config.db_path)?;
    let entries = database.load_entries()?;

    let payload = StatusPayload {
        api_port: state.config.api_port,
        entry_count: entries.len(),
        task_count: total_tasks(&entries),
        project_count: database.load_projects()?.len(),
        latest_entry_date: entries
            .last()
            .map(|entry| entry.date.format("%Y-%m-%d").to_string()),
        onboarding_complete: database.onboarding_complete()?,
        ai_configured: state.assist.is_some(),
        ai_cache_entries: state
            .assist
            .as_ref()
            .map(|assist| assist.cache().len())
            .unwrap_or_default(),
    };

    Ok(Json(payload))
}

async fn emotions() -> Json<Vec<EmotionInfo>> {
    Json(EmotionCode::all().map(EmotionCode::info).collect())
}

async fn entries(
    State(state): State<ApiState>,
    Query(query): Query<EntriesQuery>,
) -> ApiResult<Json<EntriesPayload>> {
    let to_date = query
        .to
        .as_deref()
        .map(parse_date)
        .transpose()?
        .unwrap_or_else(|| Local::now().date_naive());

    let from_date = query
        .from
        .as_deref()
        .map(parse_date)
        .transpose()?
        .unwrap_or(to_date - Duration::days(6));

    if from_date > to_date {
        return Err(ApiError::BadRequest(format!(
            "from ({from_date}) must not be after to ({to_date})"
        )));
    }

    let database = Database::open(&state.config.db_path)?;
    let records = database.entries_between(from_date, to_date)?;

    Ok(Json(EntriesPayload {
        from: from_date.format("%Y-%m-%d").to_string(),
        to: to_date.format("%Y-%m-%d").to_string(),
        count: records.len(),
        entries: records,
    }))
}

async fn entry_by_date(
    State(state): State<ApiState>,
    Path(date): Path<String>,
) -> ApiResult<Json<Entry>> {
    let target_date = parse_date(&date)?;
    let database = Database::open(&state.config.db_path)?;

    database
        .entry_for_date(target_date)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No entry found for date: {target_date}")))
}

async fn feeling_put(
    State(state): State<ApiState>,
    Path(date): Path<String>,
    Json(payload): Json<FeelingPayload>,
) -> ApiResult<Json<Entry>> {
    let target_date = parse_date(&date)?;
    let database = Database::open(&state.config.db_path)?;

    Ok(Json(database.set_overall_feeling(target_date, payload.value)?))
}

async fn task_create(
    State(state): State<ApiState>,
    Json(payload): Json<TaskCreatePayload>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    let date = payload
        .date
        .as_deref()
        .map(parse_date)
        .transpose()?
        .unwrap_or_else(|| Local::now().date_naive());

    if payload.description.trim().is_empty() {
        return Err(ApiError::BadRequest("description must not be empty".to_string()));
    }

    let database = Database::open(&state.config.db_path)?;
    let task = database.add_task(
        date,
        NewTask {
            project_id: payload.project_id,
            description: payload.description,
            task_type: payload.task_type,
            emotions: payload.emotions,
            notes: payload.notes,
        },
    )?;

    Ok((StatusCode::CREATED, Json(task)))
}

async fn task_delete(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let database = Database::open(&state.config.db_path)?;
    database.delete_task(&id)?;

    Ok(Json(json!({ "deleted": true, "id": id })))
}

async fn projects_get(State(state): State<ApiState>) -> ApiResult<Json<Vec<Project>>> {
    let database = Database::open(&state.config.db_path)?;
    Ok(Json(database.load_projects()?))
}

async fn projects_post(
    State(state): State<ApiState>,
    Json(payload): Json<ProjectCreatePayload>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::BadRequest("name must not be empty".to_string()));
    }

    let database = Database::open(&state.config.db_path)?;
    let project = database.add_project(&payload.name, payload.color.as_deref())?;

    Ok((StatusCode::CREATED, Json(project)))
}

async fn insights(
    State(state): State<ApiState>,
    Query(query): Query<RangeQuery>,
) -> ApiResult<Json<InsightReport>> {
    let (time_range, today) = parse_range_query(&query)?;

    // AI calls block, so the whole build runs off the async workers
    let report = tokio::task::spawn_blocking(move || -> Result<InsightReport> {
        let database = Database::open(&state.config.db_path)?;
        analyzer::build_report(&database, time_range, today, state.assist.as_deref())
    })
    .await
    .map_err(|error| anyhow!("insight worker failed: {error}"))??;

    Ok(Json(report))
}

async fn challenges(
    State(state): State<ApiState>,
    Query(query): Query<RangeQuery>,
) -> ApiResult<Json<ChallengeRecommendation>> {
    let (time_range, today) = parse_range_query(&query)?;
    let (from, to) = time_range.window(today);

    let recommendation =
        tokio::task::spawn_blocking(move || -> Result<ChallengeRecommendation> {
            let database = Database::open(&state.config.db_path)?;
            let entries = database.entries_between(from, to)?;
            let tasks = flatten_tasks(&entries);
            Ok(analyzer::challenges(&tasks, state.assist.as_deref()))
        })
        .await
        .map_err(|error| anyhow!("challenge worker failed: {error}"))??;

    Ok(Json(recommendation))
}

async fn export(State(state): State<ApiState>) -> ApiResult<Json<ExportDocument>> {
    let database = Database::open(&state.config.db_path)?;
    Ok(Json(database.export_data()?))
}

async fn import(
    State(state): State<ApiState>,
    Json(document): Json<ExportDocument>,
) -> ApiResult<Json<ImportSummary>> {
    let database = Database::open(&state.config.db_path)?;
    let summary = database.import_data(document)?;

    // cached AI answers describe the replaced data
    if let Some(assist) = &state.assist {
        assist.cache().clear();
    }

    Ok(Json(summary))
}

fn parse_range_query(query: &RangeQuery) -> ApiResult<(TimeRange, NaiveDate)> {
    let time_range = query
        .range
        .as_deref()
        .map(str::parse::<TimeRange>)
        .transpose()
        .map_err(|error| ApiError::BadRequest(error.to_string()))?
        .unwrap_or_default();

    let today = query
        .date
        .as_deref()
        .map(parse_date)
        .transpose()?
        .unwrap_or_else(|| Local::now().date_naive());

    Ok((time_range, today))
}

fn parse_date(input: &str) -> ApiResult<NaiveDate> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .with_context(|| format!("Invalid date format: {input}. Example: 2026-02-18"))
        .map_err(|error| ApiError::BadRequest(error.to_string()))
}

type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for ApiError {
    fn from(value: anyhow::Error) -> Self {
        if let Some(storage) = value.downcast_ref::<StorageError>() {
            match storage {
                StorageError::TaskNotFound(_) | StorageError::ProjectNotFound(_) => {
                    return Self::NotFound(storage.to_string());
                }
                StorageError::CorruptStore(_) => {}
                _ => return Self::BadRequest(storage.to_string()),
            }
        }

        if let Some(model) = value.downcast_ref::<ModelError>() {
            return Self::BadRequest(model.to_string());
        }

        Self::Internal(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
            }
            ApiError::Internal(error) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": error.to_string() })),
            )
                .into_response(),
        }
    }
}
