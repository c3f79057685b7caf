//! Routes for launching collection jobs and polling their status.

use super::state::ServerState;
use crate::collector::{CollectorHandle, JobRequest, LaunchError};
use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Serialize)]
struct JobAcceptedResponse {
    job_id: String,
}

#[derive(Deserialize, Debug)]
struct MetadataImportParams {
    start: Option<u32>,
    end: Option<u32>,
}

#[derive(Deserialize, Debug)]
struct DetailBackfillParams {
    limit: Option<usize>,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

fn launch_error_response(err: LaunchError) -> Response {
    match err {
        LaunchError::InvalidRequest(_) => error_response(StatusCode::BAD_REQUEST, err.to_string()),
        LaunchError::NotFound => error_response(StatusCode::NOT_FOUND, err.to_string()),
        LaunchError::NotResumable(_) => error_response(StatusCode::CONFLICT, err.to_string()),
        LaunchError::ExecutorUnavailable => {
            error_response(StatusCode::SERVICE_UNAVAILABLE, err.to_string())
        }
        LaunchError::Store(e) => {
            error!("Job status store failure: {:#}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Job status store failure")
        }
    }
}

fn accepted(job_id: String) -> Response {
    (StatusCode::ACCEPTED, Json(JobAcceptedResponse { job_id })).into_response()
}

async fn launch(collector: &CollectorHandle, request: JobRequest) -> Response {
    match collector.launcher.launch(request).await {
        Ok(job_id) => accepted(job_id),
        Err(e) => launch_error_response(e),
    }
}

/// POST /collect/metadata?start=&end=
async fn collect_metadata(
    State(collector): State<CollectorHandle>,
    params: Result<Query<MetadataImportParams>, QueryRejection>,
) -> Response {
    let Query(params) = match params {
        Ok(params) => params,
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, rejection.body_text()),
    };
    let (Some(start), Some(end)) = (params.start, params.end) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Both start and end query parameters are required",
        );
    };
    launch(&collector, JobRequest::MetadataImport { start, end }).await
}

/// POST /collect/details[?limit=]
async fn collect_details(
    State(collector): State<CollectorHandle>,
    params: Result<Query<DetailBackfillParams>, QueryRejection>,
) -> Response {
    let Query(params) = match params {
        Ok(params) => params,
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, rejection.body_text()),
    };
    launch(
        &collector,
        JobRequest::DetailBackfill {
            limit: params.limit,
        },
    )
    .await
}

/// POST /collect/reclassify
async fn collect_reclassify(State(collector): State<CollectorHandle>) -> Response {
    launch(&collector, JobRequest::Reclassification).await
}

/// GET /status/{job_id}
async fn get_status(
    State(collector): State<CollectorHandle>,
    Path(job_id): Path<String>,
) -> Response {
    match collector.reporter.get_status(&job_id) {
        Ok(Some(view)) => Json(view).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "job not found"),
        Err(e) => {
            warn!("Failed to read status of job {}: {:#}", job_id, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to read job status")
        }
    }
}

/// POST /jobs/{job_id}/cancel
async fn cancel_job(
    State(collector): State<CollectorHandle>,
    Path(job_id): Path<String>,
) -> Response {
    match collector.launcher.cancel(&job_id).await {
        Ok(true) => accepted(job_id),
        Ok(false) => error_response(StatusCode::CONFLICT, "job has already finished"),
        Err(e) => launch_error_response(e),
    }
}

/// POST /jobs/{job_id}/resume
async fn resume_job(
    State(collector): State<CollectorHandle>,
    Path(job_id): Path<String>,
) -> Response {
    match collector.launcher.resume(&job_id).await {
        Ok(new_job_id) => accepted(new_job_id),
        Err(e) => launch_error_response(e),
    }
}

pub fn make_collector_routes(state: ServerState) -> Router {
    Router::new()
        .route("/collect/metadata", post(collect_metadata))
        .route("/collect/details", post(collect_details))
        .route("/collect/reclassify", post(collect_reclassify))
        .route("/status/{job_id}", get(get_status))
        .route("/jobs/{job_id}/cancel", post(cancel_job))
        .route("/jobs/{job_id}/resume", post(resume_job))
        .with_state(state)
}
