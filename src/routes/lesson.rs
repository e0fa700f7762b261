use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::content::{Lesson, LessonCatalog};
use crate::response::{json_error, AppError};
use crate::services::evaluation::{self, Evaluation};
use crate::services::intent::{support_policy, SupportLevel, TutorIntent};
use crate::services::practice::{generate_practice, PracticeItem};
use crate::services::profile::ReviewOutcome;
use crate::services::prompts::{self, ScriptedContext};
use crate::services::session::{apply_submit, hint_text, LessonSession};
use crate::services::tutor::compose_tutor_message;
use crate::state::AppState;
use crate::store::StoreError;

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/start", post(start_lesson))
        .route("/submit", post(submit_answer))
        .route("/practice", post(submit_practice))
        .route("/restart", post(restart_lesson))
        .route("/:userId", get(get_session))
}

// ========== Wire types ==========

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TeachingPrefs {
    #[serde(default)]
    support_level: Option<SupportLevel>,
    #[serde(default)]
    instruction_language: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartLessonRequest {
    user_id: String,
    language: String,
    lesson_id: String,
    #[serde(default)]
    teaching_prefs: Option<TeachingPrefs>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StartLessonResponse {
    session: LessonSession,
    tutor_prompt: String,
    tutor_message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitAnswerRequest {
    user_id: String,
    answer: String,
    language: String,
    lesson_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitAnswerResponse {
    session: LessonSession,
    evaluation: Evaluation,
    tutor_message: String,
    forced_advance: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    practice: Option<PracticeItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PracticeAnswerRequest {
    user_id: String,
    language: String,
    lesson_id: String,
    practice_id: String,
    answer: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PracticeAnswerResponse {
    session: LessonSession,
    evaluation: Evaluation,
    tutor_message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RestartLessonRequest {
    user_id: String,
    language: String,
    lesson_id: String,
}

#[derive(Debug, Deserialize)]
struct SessionQuery {
    language: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    session: LessonSession,
}

// ========== Handlers ==========

async fn start_lesson(
    State(state): State<AppState>,
    Json(payload): Json<StartLessonRequest>,
) -> Result<impl IntoResponse, AppError> {
    let catalog = state.catalog();
    let lesson = resolve_lesson(
        &catalog,
        &payload.user_id,
        &payload.language,
        &payload.lesson_id,
    )?;
    start_session(&state, &payload.user_id, lesson, payload.teaching_prefs).await
}

async fn restart_lesson(
    State(state): State<AppState>,
    Json(payload): Json<RestartLessonRequest>,
) -> Result<impl IntoResponse, AppError> {
    let catalog = state.catalog();
    let lesson = resolve_lesson(
        &catalog,
        &payload.user_id,
        &payload.language,
        &payload.lesson_id,
    )?;
    let now = Utc::now().timestamp_millis();

    let store = state.store();
    let deleted = store.delete_session(&payload.user_id, &payload.language, &payload.lesson_id);
    store.with_profile_mut(&payload.user_id, &payload.language, now, |profile| {
        profile.clear_lesson(&payload.lesson_id);
    });
    tracing::info!(
        user_id = %payload.user_id,
        lesson_id = %payload.lesson_id,
        deleted,
        "lesson restarted"
    );

    start_session(&state, &payload.user_id, lesson, None).await
}

async fn submit_answer(
    State(state): State<AppState>,
    Json(payload): Json<SubmitAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let store = state.store();
    let catalog = state.catalog();
    let runtime = state.runtime();

    let Some(mut session) =
        store.find_session(&payload.user_id, &payload.language, &payload.lesson_id)
    else {
        return Err(AppError::not_found("No active session found"));
    };
    if session.is_complete() {
        return Err(json_error(
            StatusCode::BAD_REQUEST,
            "LESSON_COMPLETE",
            "Lesson already complete",
        ));
    }

    let lesson = catalog
        .get(&payload.language, &payload.lesson_id)
        .ok_or_else(|| AppError::internal("lesson content missing for active session"))?;

    let now = Utc::now().timestamp_millis();
    let transition = apply_submit(&mut session, lesson, &payload.answer, now);
    let answered = lesson
        .question_by_id(&transition.question_id)
        .ok_or_else(|| AppError::internal("answered question missing from lesson"))?;

    let use_ai = !runtime.is_llm_mock();

    let mut practice = None;
    if transition.should_schedule_practice && runtime.is_practice_gen_enabled() {
        let (item, flow) = generate_practice(&state.llm(), lesson, answered, use_ai).await;
        tracing::debug!(practice_id = %item.practice_id, ?flow, "practice scheduled");
        session.attach_practice(item.clone());
        practice = Some(item);
    }

    let hint = hint_text(answered, transition.hint);
    let next_prompt = if transition.completed {
        None
    } else {
        lesson
            .question(session.current_question_index)
            .map(|q| q.prompt.as_str())
    };
    let ctx = ScriptedContext {
        lesson_title: &lesson.title,
        next_prompt,
        revealed_answer: transition
            .forced_advance
            .then(|| answered.answer.as_str()),
        explanation: if transition.forced_advance {
            answered.explanation.as_deref()
        } else {
            None
        },
        hint: hint.as_deref(),
    };
    let scripted = prompts::scripted_tutor_message(transition.intent, &ctx);

    let phrasing_question = lesson
        .question(session.current_question_index)
        .unwrap_or(answered);
    let mut tutor_message = compose_tutor_message(
        &state.llm(),
        use_ai,
        transition.intent,
        lesson,
        phrasing_question,
        Some(&payload.answer),
        hint.as_deref(),
        scripted,
    )
    .await;

    if runtime.is_instruction_language_enabled()
        && session.instruction_language.is_some()
        && support_policy(
            session.support_level,
            transition.intent,
            transition.attempts_after,
        )
    {
        if let Some(suffix) = prompts::support_suffix(answered) {
            tutor_message.push_str(&suffix);
        }
    }

    session.push_tutor_message(&tutor_message);

    if !transition.evaluation.is_correct() {
        let outcome = if transition.forced_advance {
            ReviewOutcome::Forced
        } else {
            ReviewOutcome::Wrong
        };
        store.with_profile_mut(&payload.user_id, &payload.language, now, |profile| {
            profile.record_attempt_outcome(&payload.lesson_id, answered, outcome, now);
        });
    }

    let session = store.update_session(session).map_err(map_store_error)?;

    Ok(Json(SubmitAnswerResponse {
        session,
        evaluation: transition.evaluation,
        tutor_message,
        forced_advance: transition.forced_advance,
        practice,
    }))
}

async fn submit_practice(
    State(state): State<AppState>,
    Json(payload): Json<PracticeAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let store = state.store();
    let catalog = state.catalog();

    let Some(mut session) =
        store.find_session(&payload.user_id, &payload.language, &payload.lesson_id)
    else {
        return Err(AppError::not_found("No active session found"));
    };

    let Some(item) = session.take_practice(&payload.practice_id) else {
        return Err(AppError::not_found("Practice item not found"));
    };

    let now = Utc::now().timestamp_millis();
    let evaluation = evaluation::evaluate(&payload.answer, &item.expected_answer_raw, &[], &[]);

    session.push_student_message(&payload.answer);
    let tutor_message = if evaluation.is_correct() {
        "That's it, nice work on the extra practice!".to_string()
    } else {
        format!(
            "Good try. The expected answer was \"{}\".",
            item.expected_answer_raw
        )
    };
    session.push_tutor_message(&tutor_message);
    session.updated_at = now;

    if !evaluation.is_correct() {
        if let Some(question) = item
            .source_question_id
            .as_deref()
            .and_then(|qid| {
                catalog
                    .get(&payload.language, &payload.lesson_id)
                    .and_then(|lesson| lesson.question_by_id(qid))
            })
        {
            store.with_profile_mut(&payload.user_id, &payload.language, now, |profile| {
                profile.record_attempt_outcome(
                    &payload.lesson_id,
                    question,
                    ReviewOutcome::Wrong,
                    now,
                );
            });
        }
    }

    let session = store.update_session(session).map_err(map_store_error)?;

    Ok(Json(PracticeAnswerResponse {
        session,
        evaluation,
        tutor_message,
    }))
}

async fn get_session(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<SessionQuery>,
) -> Result<impl IntoResponse, AppError> {
    let store = state.store();
    let found = match query.language.as_deref().filter(|l| !l.trim().is_empty()) {
        Some(language) => store.find_active(&user_id, language),
        None => store.find_latest(&user_id),
    };

    let session = found.ok_or_else(|| AppError::not_found("No active sessions found"))?;
    Ok(Json(SessionResponse { session }))
}

// ========== Helpers ==========

fn resolve_lesson<'a>(
    catalog: &'a LessonCatalog,
    user_id: &str,
    language: &str,
    lesson_id: &str,
) -> Result<&'a Lesson, AppError> {
    if user_id.trim().is_empty() {
        return Err(AppError::validation("userId is required"));
    }
    if language.trim().is_empty() {
        return Err(AppError::validation("language is required"));
    }
    if lesson_id.trim().is_empty() {
        return Err(AppError::validation("lessonId is required"));
    }
    if !catalog.supports_language(language) {
        return Err(AppError::validation(format!(
            "Unsupported language: {language}"
        )));
    }
    catalog
        .get(language, lesson_id)
        .ok_or_else(|| AppError::validation(format!("Unknown lesson: {lesson_id}")))
}

async fn start_session(
    state: &AppState,
    user_id: &str,
    lesson: &Lesson,
    prefs: Option<TeachingPrefs>,
) -> Result<(StatusCode, Json<StartLessonResponse>), AppError> {
    let store = state.store();
    let runtime = state.runtime();

    if let Some(existing) = store.find_session(user_id, &lesson.language, &lesson.id) {
        if !existing.is_complete() {
            return Err(AppError::conflict(
                "An active session already exists for this lesson",
            ));
        }
    }

    let now = Utc::now().timestamp_millis();
    let prefs = prefs.unwrap_or_default();
    let support_level = prefs.support_level.unwrap_or_default();
    let instruction_language = if runtime.is_instruction_language_enabled() {
        prefs.instruction_language.filter(|l| !l.trim().is_empty())
    } else {
        None
    };

    let first = lesson
        .question(0)
        .ok_or_else(|| AppError::internal("lesson has no questions"))?;

    let mut session = LessonSession::start(
        user_id,
        &lesson.language,
        &lesson.id,
        support_level,
        instruction_language,
        now,
    );

    let scripted = prompts::scripted_greeting(lesson, &first.prompt);
    let tutor_message = compose_tutor_message(
        &state.llm(),
        !runtime.is_llm_mock(),
        TutorIntent::AskQuestion,
        lesson,
        first,
        None,
        None,
        scripted,
    )
    .await;
    session.push_tutor_message(&tutor_message);

    store.insert_session(session.clone()).map_err(|err| match err {
        StoreError::SessionExists => {
            AppError::conflict("An active session already exists for this lesson")
        }
        other => AppError::internal(other.to_string()),
    })?;

    Ok((
        StatusCode::CREATED,
        Json(StartLessonResponse {
            session,
            tutor_prompt: first.prompt.clone(),
            tutor_message,
        }),
    ))
}

fn map_store_error(err: StoreError) -> AppError {
    match err {
        StoreError::VersionConflict { .. } => {
            AppError::conflict("Session was modified concurrently")
        }
        StoreError::NotFound => AppError::not_found("No active session found"),
        StoreError::SessionExists => {
            AppError::conflict("An active session already exists for this lesson")
        }
    }
}
