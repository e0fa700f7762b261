use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::response::AppError;
use crate::services::evaluation::{self, Evaluation};
use crate::services::profile::{parse_review_key, LearnerProfile, ReviewItem, ReviewOutcome};
use crate::state::AppState;

const SUGGEST_DEFAULT_LIMIT: usize = 2;
const SUGGEST_MAX_LIMIT: usize = 5;

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/suggest", get(suggest_review))
        .route("/submit", post(submit_review))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SuggestQuery {
    user_id: String,
    language: String,
    limit: Option<usize>,
}

/// Wire form of one due review entry, shared with the profile snapshot.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ReviewQueueEntry {
    pub item_id: String,
    pub lesson_id: String,
    pub question_id: String,
    pub concept_tag: String,
    pub last_seen_at: i64,
    pub last_outcome: ReviewOutcome,
    pub mistake_count: u32,
    pub confidence: f64,
}

pub(super) fn queue_entries(profile: &LearnerProfile, limit: usize) -> Vec<ReviewQueueEntry> {
    profile
        .due_review_items(limit)
        .into_iter()
        .map(|(key, item)| to_entry(key, item))
        .collect()
}

fn to_entry(key: String, item: ReviewItem) -> ReviewQueueEntry {
    let (lesson_id, question_id) = parse_review_key(&key)
        .map(|(l, q)| (l.to_string(), q.to_string()))
        .unwrap_or_default();
    ReviewQueueEntry {
        item_id: key,
        lesson_id,
        question_id,
        concept_tag: item.concept_tag,
        last_seen_at: item.last_seen_at,
        last_outcome: item.last_outcome,
        mistake_count: item.mistake_count,
        confidence: item.confidence,
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SuggestResponse {
    items: Vec<ReviewQueueEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitReviewRequest {
    user_id: String,
    language: String,
    item_id: String,
    answer: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitReviewResponse {
    evaluation: Evaluation,
    confidence: f64,
    removed: bool,
}

async fn suggest_review(
    State(state): State<AppState>,
    Query(query): Query<SuggestQuery>,
) -> Result<impl IntoResponse, AppError> {
    if query.user_id.trim().is_empty() {
        return Err(AppError::validation("userId is required"));
    }

    let limit = query
        .limit
        .unwrap_or(SUGGEST_DEFAULT_LIMIT)
        .clamp(1, SUGGEST_MAX_LIMIT);

    let items = state
        .store()
        .find_profile(&query.user_id, &query.language)
        .map(|profile| queue_entries(&profile, limit))
        .unwrap_or_default();

    Ok(Json(SuggestResponse { items }))
}

async fn submit_review(
    State(state): State<AppState>,
    Json(payload): Json<SubmitReviewRequest>,
) -> Result<impl IntoResponse, AppError> {
    let store = state.store();
    let catalog = state.catalog();
    let now = Utc::now().timestamp_millis();

    let profile = store
        .find_profile(&payload.user_id, &payload.language)
        .ok_or_else(|| AppError::not_found("Review item not found"))?;
    if !profile.review_items.contains_key(&payload.item_id) {
        return Err(AppError::not_found("Review item not found"));
    }

    let (lesson_id, question_id) = parse_review_key(&payload.item_id)
        .ok_or_else(|| AppError::bad_request("Malformed itemId"))?;

    let question = catalog
        .get(&payload.language, lesson_id)
        .and_then(|lesson| lesson.question_by_id(question_id));
    let Some(question) = question else {
        // The source lesson content is gone; the queue heals itself.
        store.with_profile_mut(&payload.user_id, &payload.language, now, |profile| {
            profile.review_items.remove(&payload.item_id);
        });
        return Err(AppError::not_found("Review item no longer exists"));
    };

    let evaluation = evaluation::evaluate(
        &payload.answer,
        &question.answer,
        &question.accepted_answers,
        &question.blanks,
    );

    let step = store.with_profile_mut(&payload.user_id, &payload.language, now, |profile| {
        profile.record_review_practice_outcome(&payload.item_id, evaluation.result, now)
    });
    let Some(step) = step else {
        return Err(AppError::not_found("Review item not found"));
    };

    Ok(Json(SubmitReviewResponse {
        evaluation,
        confidence: step.confidence,
        removed: step.removed,
    }))
}
