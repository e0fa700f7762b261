use crate::content::{Lesson, Question};
use crate::services::guards;
use crate::services::intent::{generation_params, TutorIntent};
use crate::services::llm_provider::LLMProvider;
use crate::services::prompts;

/// Phrases one tutor turn. The AI is only consulted for wording; the
/// scripted text always exists, so a transition never blocks on AI
/// availability, and guard violations silently fall back to it.
pub async fn compose_tutor_message(
    llm: &LLMProvider,
    use_ai: bool,
    intent: TutorIntent,
    lesson: &Lesson,
    question: &Question,
    learner_answer: Option<&str>,
    hint: Option<&str>,
    scripted: String,
) -> String {
    if !use_ai || !llm.is_available() {
        return scripted;
    }

    let system = prompts::tutor_system_prompt(&lesson.language);
    let user = prompts::tutor_user_prompt(intent, lesson, question, learner_answer, hint);

    match llm
        .complete_with_system(&system, &user, generation_params(intent))
        .await
    {
        Ok(text) => {
            let text = text.trim().to_string();
            if text.is_empty() {
                return scripted;
            }
            if guards::continuity_violation(&text) {
                tracing::warn!(?intent, "tutor text rejected by continuity guard");
                return scripted;
            }
            if let Some(violation) =
                guards::tutor_text_drift(&text, &lesson.language, &question.material())
            {
                tracing::warn!(?intent, violation = violation.as_str(), "tutor text rejected by drift guard");
                return scripted;
            }
            text
        }
        Err(err) => {
            tracing::warn!(?intent, error = %err, "tutor text generation failed, using scripted message");
            scripted
        }
    }
}
