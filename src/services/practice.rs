use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::content::{Lesson, Question};
use crate::services::guards::{self, DriftViolation};
use crate::services::llm_provider::{GenerationOptions, LLMError, LLMProvider};
use crate::services::prompts;

const MAX_EXAMPLES: usize = 6;
const PRACTICE_GEN_OPTIONS: GenerationOptions = GenerationOptions {
    temperature: 0.7,
    max_tokens: 400,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PracticeKind {
    Variation,
    DialogueTurn,
    Cloze,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeMeta {
    #[serde(rename = "type")]
    pub kind: PracticeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concept_tag: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeItem {
    pub practice_id: String,
    pub lesson_id: String,
    pub language: String,
    pub prompt: String,
    pub expected_answer_raw: String,
    #[serde(default)]
    pub examples: Vec<String>,
    pub meta: PracticeMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_question_id: Option<String>,
}

/// Wire shape the generator model is asked for; ids are stamped server-side.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PracticePayload {
    prompt: String,
    expected_answer_raw: String,
    #[serde(default)]
    examples: Vec<String>,
    meta: PracticeMeta,
}

#[derive(Debug, Error)]
pub enum PracticeError {
    #[error("generation failed: {0}")]
    Llm(#[from] LLMError),
    #[error("invalid JSON from generator: {0}")]
    Json(#[from] serde_json::Error),
    #[error("schema violation: {0}")]
    Schema(&'static str),
    #[error("drift violation: {}", .0.as_str())]
    Drift(DriftViolation),
}

/// Generation flow: one AI attempt, at most one retry, then a permanent
/// deterministic fallback for the rest of the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationFlow {
    Pending,
    Validated,
    Retrying,
    FellBack,
}

pub async fn generate_practice(
    llm: &LLMProvider,
    lesson: &Lesson,
    question: &Question,
    use_ai: bool,
) -> (PracticeItem, GenerationFlow) {
    if !use_ai || !llm.is_available() {
        return (fallback_practice(lesson, question), GenerationFlow::FellBack);
    }

    let system = prompts::practice_system_prompt(&lesson.language);
    let user = prompts::practice_user_prompt(lesson, question);

    let mut flow = GenerationFlow::Pending;
    loop {
        match attempt_generation(llm, &system, &user, lesson, question).await {
            Ok(item) => return (item, GenerationFlow::Validated),
            Err(err) => match flow {
                GenerationFlow::Pending => {
                    tracing::warn!(error = %err, "practice generation rejected, retrying once");
                    flow = GenerationFlow::Retrying;
                }
                _ => {
                    tracing::warn!(error = %err, "practice generation rejected again, falling back");
                    return (fallback_practice(lesson, question), GenerationFlow::FellBack);
                }
            },
        }
    }
}

async fn attempt_generation(
    llm: &LLMProvider,
    system: &str,
    user: &str,
    lesson: &Lesson,
    question: &Question,
) -> Result<PracticeItem, PracticeError> {
    let raw = llm
        .complete_with_system(system, user, PRACTICE_GEN_OPTIONS)
        .await?;
    parse_practice_payload(&raw, lesson, question)
}

/// Parses and validates one generator response: JSON shape, schema bounds,
/// then the drift guard. Pure apart from the stamped practice id.
pub fn parse_practice_payload(
    raw: &str,
    lesson: &Lesson,
    question: &Question,
) -> Result<PracticeItem, PracticeError> {
    let json = extract_json_object(raw).ok_or(PracticeError::Schema("no JSON object found"))?;
    let payload: PracticePayload = serde_json::from_str(json)?;
    validate_payload(&payload)?;

    let material = question.material();
    if guards::contaminated(&payload.prompt) || guards::contaminated(&payload.expected_answer_raw) {
        return Err(PracticeError::Drift(DriftViolation::MetaLanguage));
    }
    let surface = format!("{} {}", payload.prompt, payload.examples.join(" "));
    if guards::foreign_language_drift(&surface, &lesson.language, &material) {
        return Err(PracticeError::Drift(DriftViolation::ForeignLanguage));
    }
    if !guards::derives_from_material(&payload.expected_answer_raw, &material) {
        return Err(PracticeError::Drift(DriftViolation::Fabrication));
    }

    Ok(PracticeItem {
        practice_id: format!("practice-{}", Uuid::new_v4()),
        lesson_id: lesson.id.clone(),
        language: lesson.language.clone(),
        prompt: payload.prompt,
        expected_answer_raw: payload.expected_answer_raw,
        examples: payload.examples,
        meta: PracticeMeta {
            kind: payload.meta.kind,
            concept_tag: payload
                .meta
                .concept_tag
                .or_else(|| question.concept_tag.clone()),
        },
        source_question_id: Some(question.id.clone()),
    })
}

fn validate_payload(payload: &PracticePayload) -> Result<(), PracticeError> {
    if payload.prompt.trim().is_empty() {
        return Err(PracticeError::Schema("empty prompt"));
    }
    if payload.expected_answer_raw.trim().is_empty() {
        return Err(PracticeError::Schema("empty expected answer"));
    }
    if payload.examples.len() > MAX_EXAMPLES {
        return Err(PracticeError::Schema("too many examples"));
    }
    if payload.examples.iter().any(|e| e.trim().is_empty()) {
        return Err(PracticeError::Schema("empty example"));
    }
    Ok(())
}

/// Deterministic supplementary item derived directly from lesson content.
pub fn fallback_practice(lesson: &Lesson, question: &Question) -> PracticeItem {
    let kind = if question.blanks.is_empty() {
        PracticeKind::Variation
    } else {
        PracticeKind::Cloze
    };
    PracticeItem {
        practice_id: format!("fallback-{}", Uuid::new_v4()),
        lesson_id: lesson.id.clone(),
        language: lesson.language.clone(),
        prompt: format!("Let's practice this once more: {}", question.prompt),
        expected_answer_raw: question.answer.clone(),
        examples: question
            .accepted_answers
            .iter()
            .take(MAX_EXAMPLES)
            .cloned()
            .collect(),
        meta: PracticeMeta {
            kind,
            concept_tag: question.concept_tag.clone(),
        },
        source_question_id: Some(question.id.clone()),
    }
}

/// Models expressing JSON inside markdown fences is common; take the
/// outermost object.
fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&raw[start..=end])
}
