use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use http::StatusCode;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::{
    hibernation::{HibernationAction, HibernationResult},
    job::{JobFilter, JobKind, TrainingJob},
    metrics,
    status::{derive_status, JobState},
    Error,
};

use super::{
    summary::{available_actions, JobAction, JobDetail, JobSummary},
    AppState,
};

pub(crate) struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Conflict(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

pub(crate) async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}

pub(crate) async fn metrics() -> ApiResult<String> {
    Ok(metrics::gather_metrics()?)
}

pub(crate) async fn list_jobs(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<JobFilter>,
) -> ApiResult<Json<Vec<JobSummary>>> {
    let jobs = state.poller.list_jobs().await?;
    let states = state.poller.sync(&jobs).await;
    let now = Utc::now();

    if !filter.is_empty() {
        debug!("Filtering {} jobs by {:?}", jobs.len(), filter);
    }

    let summaries = jobs
        .iter()
        .filter_map(|job| {
            let job_state = states.get(&job.key()).copied().unwrap_or(JobState::Unknown);
            filter
                .matches(job, job_state, &state.labels)
                .then(|| JobSummary::new(job, job_state, &state.labels, now))
        })
        .collect();

    Ok(Json(summaries))
}

pub(crate) async fn get_job(
    State(state): State<Arc<AppState>>,
    Path((kind, name)): Path<(String, String)>,
) -> ApiResult<Json<JobDetail>> {
    let job = fetch_job(&state, &kind, &name).await?;

    let workload = state.resolver.find_workload(&job).await;
    let job_state = derive_status(&job, workload.as_ref());
    let cluster_queue = state.resolver.resolve_cluster_queue(&job).await;

    Ok(Json(JobDetail {
        summary: JobSummary::new(&job, job_state, &state.labels, Utc::now()),
        workload: workload.and_then(|w| w.metadata.name),
        cluster_queue,
    }))
}

pub(crate) async fn pause_job(
    State(state): State<Arc<AppState>>,
    Path((kind, name)): Path<(String, String)>,
) -> ApiResult<Response> {
    hibernate(&state, &kind, &name, Some(HibernationAction::Pause)).await
}

pub(crate) async fn resume_job(
    State(state): State<Arc<AppState>>,
    Path((kind, name)): Path<(String, String)>,
) -> ApiResult<Response> {
    hibernate(&state, &kind, &name, Some(HibernationAction::Resume)).await
}

pub(crate) async fn toggle_hibernation(
    State(state): State<Arc<AppState>>,
    Path((kind, name)): Path<(String, String)>,
) -> ApiResult<Response> {
    hibernate(&state, &kind, &name, None).await
}

pub(crate) async fn delete_job(
    State(state): State<Arc<AppState>>,
    Path((kind, name)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    let kind: JobKind = kind.parse()?;
    let namespace = state.poller.namespace();
    state.client.delete_job(kind, namespace, &name).await?;
    info!("Deleted {} {}/{}", kind, namespace, name);
    Ok(StatusCode::NO_CONTENT)
}

async fn fetch_job(state: &AppState, kind: &str, name: &str) -> ApiResult<TrainingJob> {
    let kind: JobKind = kind.parse()?;
    Ok(state
        .client
        .get_job(kind, state.poller.namespace(), name)
        .await?)
}

/// `None` toggles based on the job's current suspend flag
async fn hibernate(
    state: &AppState,
    kind: &str,
    name: &str,
    requested: Option<HibernationAction>,
) -> ApiResult<Response> {
    let job = fetch_job(state, kind, name).await?;
    let action = requested.unwrap_or_else(|| HibernationAction::toggle_from(job.is_suspended()));

    let current = state.poller.deriver().derive(&job).await;
    if !available_actions(current, job.is_suspended()).contains(&JobAction::from(action)) {
        return Err(Error::Conflict(format!(
            "cannot {} {} {} in state {}",
            action,
            job.kind(),
            job.name(),
            current
        ))
        .into());
    }

    let result = state
        .reconciler
        .run(&job, action, &state.shutdown.child_token())
        .await;
    Ok(hibernation_response(result))
}

fn hibernation_response(result: HibernationResult) -> Response {
    let status = if result.success {
        StatusCode::OK
    } else if result.conflict {
        StatusCode::CONFLICT
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(result)).into_response()
}
