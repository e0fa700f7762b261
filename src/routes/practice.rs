use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::response::AppError;
use crate::services::practice::{generate_practice, PracticeItem};
use crate::state::AppState;

/// Review refs processed per request; the rest are ignored.
const MAX_REVIEW_REFS: usize = 2;

pub fn router() -> axum::Router<AppState> {
    axum::Router::new().route("/generateReview", post(generate_review))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReviewRef {
    lesson_id: String,
    question_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateReviewRequest {
    user_id: String,
    language: String,
    #[serde(default)]
    items: Vec<ReviewRef>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateReviewResponse {
    practice: Vec<PracticeItem>,
}

async fn generate_review(
    State(state): State<AppState>,
    Json(payload): Json<GenerateReviewRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.user_id.trim().is_empty() {
        return Err(AppError::validation("userId is required"));
    }
    if payload.items.is_empty() {
        return Err(AppError::bad_request("items is required and must not be empty"));
    }

    let catalog = state.catalog();
    if !catalog.supports_language(&payload.language) {
        return Err(AppError::validation(format!(
            "Unsupported language: {}",
            payload.language
        )));
    }

    let runtime = state.runtime();
    // Feature flag off: no AI calls at all; items still come from the
    // deterministic fallback path.
    let use_ai = runtime.is_practice_gen_enabled() && !runtime.is_llm_mock();

    let mut practice = Vec::new();
    for review_ref in payload.items.iter().take(MAX_REVIEW_REFS) {
        let Some(lesson) = catalog.get(&payload.language, &review_ref.lesson_id) else {
            tracing::warn!(lesson_id = %review_ref.lesson_id, "skipping unknown lesson in review refs");
            continue;
        };
        let Some(question) = lesson.question_by_id(&review_ref.question_id) else {
            tracing::warn!(
                lesson_id = %review_ref.lesson_id,
                question_id = %review_ref.question_id,
                "skipping unknown question in review refs"
            );
            continue;
        };

        let (item, _flow) = generate_practice(&state.llm(), lesson, question, use_ai).await;
        practice.push(item);
    }

    tracing::debug!(user_id = %payload.user_id, count = practice.len(), "review practice generated");
    Ok(Json(GenerateReviewResponse { practice }))
}
