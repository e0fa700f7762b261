use serde::{Deserialize, Serialize};

use crate::services::llm_provider::GenerationOptions;
use crate::services::session::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TutorIntent {
    AskQuestion,
    EncourageRetry,
    AdvanceLesson,
    ForcedAdvance,
    EndLesson,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SupportLevel {
    High,
    #[default]
    Medium,
    Low,
}

/// Number of failed attempts before support text accompanies a retry prompt.
const MEDIUM_SUPPORT_RETRY_THRESHOLD: u32 = 2;
const LOW_SUPPORT_RETRY_THRESHOLD: u32 = 3;

/// Maps the transition the session just signalled to a tutoring intent.
pub fn tutor_intent(signal: SessionState, is_correct: bool, mark_needs_review: bool) -> TutorIntent {
    match signal {
        SessionState::Complete => TutorIntent::EndLesson,
        SessionState::Advance => {
            if mark_needs_review {
                TutorIntent::ForcedAdvance
            } else {
                TutorIntent::AdvanceLesson
            }
        }
        SessionState::UserInput => {
            if is_correct {
                TutorIntent::AskQuestion
            } else {
                TutorIntent::EncourageRetry
            }
        }
    }
}

/// Whether a secondary explanation in the learner's instruction language
/// accompanies the main tutor message.
pub fn support_policy(level: SupportLevel, intent: TutorIntent, attempts: u32) -> bool {
    match level {
        SupportLevel::High => !matches!(intent, TutorIntent::EndLesson),
        SupportLevel::Medium => {
            matches!(intent, TutorIntent::ForcedAdvance)
                || (matches!(intent, TutorIntent::EncourageRetry)
                    && attempts >= MEDIUM_SUPPORT_RETRY_THRESHOLD)
        }
        SupportLevel::Low => {
            matches!(intent, TutorIntent::ForcedAdvance)
                || (matches!(intent, TutorIntent::EncourageRetry)
                    && attempts >= LOW_SUPPORT_RETRY_THRESHOLD)
        }
    }
}

/// Generation bounds per intent. Question/advance intents stay short and
/// near-deterministic; forced advance needs the longest output (explanation
/// plus answer reveal) at the lowest temperature.
pub fn generation_params(intent: TutorIntent) -> GenerationOptions {
    match intent {
        TutorIntent::AskQuestion | TutorIntent::AdvanceLesson => GenerationOptions {
            temperature: 0.3,
            max_tokens: 160,
        },
        TutorIntent::EncourageRetry => GenerationOptions {
            temperature: 0.5,
            max_tokens: 220,
        },
        TutorIntent::ForcedAdvance => GenerationOptions {
            temperature: 0.0,
            max_tokens: 360,
        },
        TutorIntent::EndLesson => GenerationOptions {
            temperature: 0.4,
            max_tokens: 240,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_signal_ends_lesson() {
        assert_eq!(
            tutor_intent(SessionState::Complete, true, false),
            TutorIntent::EndLesson
        );
        assert_eq!(
            tutor_intent(SessionState::Complete, false, true),
            TutorIntent::EndLesson
        );
    }

    #[test]
    fn advance_signal_depends_on_review_flag() {
        assert_eq!(
            tutor_intent(SessionState::Advance, true, false),
            TutorIntent::AdvanceLesson
        );
        assert_eq!(
            tutor_intent(SessionState::Advance, false, true),
            TutorIntent::ForcedAdvance
        );
    }

    #[test]
    fn user_input_signal_depends_on_correctness() {
        assert_eq!(
            tutor_intent(SessionState::UserInput, true, false),
            TutorIntent::AskQuestion
        );
        assert_eq!(
            tutor_intent(SessionState::UserInput, false, false),
            TutorIntent::EncourageRetry
        );
    }

    #[test]
    fn high_support_covers_question_intents() {
        for intent in [
            TutorIntent::AskQuestion,
            TutorIntent::AdvanceLesson,
            TutorIntent::EncourageRetry,
            TutorIntent::ForcedAdvance,
        ] {
            assert!(support_policy(SupportLevel::High, intent, 0));
        }
        assert!(!support_policy(SupportLevel::High, TutorIntent::EndLesson, 0));
    }

    #[test]
    fn medium_support_needs_two_attempts_on_retry() {
        assert!(!support_policy(
            SupportLevel::Medium,
            TutorIntent::EncourageRetry,
            1
        ));
        assert!(support_policy(
            SupportLevel::Medium,
            TutorIntent::EncourageRetry,
            2
        ));
        assert!(support_policy(
            SupportLevel::Medium,
            TutorIntent::ForcedAdvance,
            0
        ));
    }

    #[test]
    fn low_support_needs_three_attempts_on_retry() {
        assert!(!support_policy(
            SupportLevel::Low,
            TutorIntent::EncourageRetry,
            2
        ));
        assert!(support_policy(
            SupportLevel::Low,
            TutorIntent::EncourageRetry,
            3
        ));
        assert!(!support_policy(SupportLevel::Low, TutorIntent::AskQuestion, 5));
    }

    #[test]
    fn forced_advance_is_coldest_and_longest() {
        let forced = generation_params(TutorIntent::ForcedAdvance);
        for intent in [
            TutorIntent::AskQuestion,
            TutorIntent::EncourageRetry,
            TutorIntent::AdvanceLesson,
            TutorIntent::EndLesson,
        ] {
            let params = generation_params(intent);
            assert!(forced.temperature <= params.temperature);
            assert!(forced.max_tokens >= params.max_tokens);
        }
    }
}
