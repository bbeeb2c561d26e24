use axum::{extract::State, Extension, Json};
use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    middleware::RequestId,
    models::{BookRecord, CandidateScore},
};

use super::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RecommendationRequest {
    /// Books the reader has read, ideally already analysed
    pub books: Vec<BookRecord>,
    #[serde(default)]
    pub top_n: Option<usize>,
}

/// Handler for recommendations endpoint
///
/// An unreachable catalog yields an empty list rather than an error.
pub async fn recommend(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<RecommendationRequest>,
) -> AppResult<Json<Vec<CandidateScore>>> {
    let top_n = request.top_n.unwrap_or(state.default_top_n);
    if top_n == 0 {
        return Err(AppError::Validation("top_n must be at least 1".to_string()));
    }

    match state.engine.recommend(&request.books, top_n).await {
        Ok(recommendations) => Ok(Json(recommendations)),
        Err(AppError::StoreUnavailable(reason)) => {
            tracing::warn!(
                request_id = %request_id,
                reason = %reason,
                "Catalog unavailable, returning no recommendations"
            );
            Ok(Json(vec![]))
        }
        Err(e) => Err(e),
    }
}
