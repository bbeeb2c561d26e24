use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    middleware::RequestId,
    models::BookMetadata,
};

use super::state::{AnalysisJob, AppState, JobStatus};

#[derive(Debug, Deserialize)]
pub struct AnalysisRequest {
    pub books: Vec<BookMetadata>,
}

#[derive(Debug, Serialize)]
pub struct AnalysisAccepted {
    pub job_id: Uuid,
}

/// Queues a batch of books for analysis and returns its job id
pub async fn submit(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<AnalysisRequest>,
) -> AppResult<(StatusCode, Json<AnalysisAccepted>)> {
    if request.books.is_empty() {
        return Err(AppError::Validation(
            "books must contain at least one entry".to_string(),
        ));
    }

    let job_id = Uuid::new_v4();
    state.jobs.insert(AnalysisJob::pending(job_id)).await;

    tracing::info!(
        request_id = %request_id,
        job_id = %job_id,
        books = request.books.len(),
        "Analysis job queued"
    );

    tokio::spawn(run_analysis(state, job_id, request.books));

    Ok((StatusCode::ACCEPTED, Json(AnalysisAccepted { job_id })))
}

/// Reports the status of an analysis job
pub async fn status(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> AppResult<Json<AnalysisJob>> {
    state
        .jobs
        .get(job_id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("analysis job {}", job_id)))
}

async fn run_analysis(state: AppState, job_id: Uuid, books: Vec<BookMetadata>) {
    let orchestrator = state.orchestrator.clone();
    // Inner task so a panic is reported on the job instead of lost
    let handle = tokio::spawn(async move { orchestrator.analyse_books(books).await });

    let status = match handle.await {
        Ok(outcome) => JobStatus::Finished {
            report: outcome.report,
            books: outcome.books.into_vec(),
        },
        Err(e) => {
            tracing::error!(job_id = %job_id, error = %e, "Analysis job failed");
            JobStatus::Failed {
                error: e.to_string(),
            }
        }
    };

    state.jobs.finish(job_id, status).await;
}
