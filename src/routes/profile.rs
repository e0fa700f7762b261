use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::review::{queue_entries, ReviewQueueEntry};
use crate::response::AppError;
use crate::services::profile::LearnerProfile;
use crate::state::AppState;

/// Due items surfaced with the profile snapshot.
const PROFILE_DUE_LIMIT: usize = 5;

pub fn router() -> axum::Router<AppState> {
    axum::Router::new().route("/:userId", get(get_profile))
}

#[derive(Debug, Deserialize)]
struct ProfileQuery {
    language: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileResponse {
    profile: LearnerProfile,
    due_review: Vec<ReviewQueueEntry>,
}

async fn get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<ProfileQuery>,
) -> Result<impl IntoResponse, AppError> {
    let language = query
        .language
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .ok_or_else(|| AppError::validation("language is required"))?;

    let profile = state
        .store()
        .find_profile(&user_id, language)
        .unwrap_or_else(|| LearnerProfile::new(&user_id, language, Utc::now().timestamp_millis()));

    let due_review = queue_entries(&profile, PROFILE_DUE_LIMIT);

    Ok(Json(ProfileResponse {
        profile,
        due_review,
    }))
}
