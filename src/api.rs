use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::error::{GiftAdvisorError, Result};
use crate::models::{RecommendRequest, RecommendResponse};
use crate::service::GiftAdvisor;

/// Build the HTTP router. Unknown paths fall through to the static front-end directory.
pub fn router(advisor: GiftAdvisor, static_dir: &str) -> Router {
    Router::new()
        .route("/api/recommend", post(recommend))
        .route("/health", get(|| async { "ok" }))
        .fallback_service(ServeDir::new(static_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(advisor)
}

async fn recommend(
    State(advisor): State<GiftAdvisor>,
    Json(req): Json<RecommendRequest>,
) -> Result<Json<RecommendResponse>> {
    let query = req
        .query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or(GiftAdvisorError::MissingQuery)?;

    let result = advisor.recommend(query, req.offset.unwrap_or(0)).await?;
    Ok(Json(RecommendResponse {
        recommendations: result.text,
    }))
}
