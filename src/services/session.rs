use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::content::{Lesson, Question};
use crate::services::evaluation::{self, EvalResult, Evaluation};
use crate::services::intent::{tutor_intent, SupportLevel, TutorIntent};
use crate::services::practice::PracticeItem;

pub const MAX_ATTEMPTS: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    UserInput,
    Advance,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    Tutor,
    Student,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMessage {
    pub role: MessageRole,
    pub content: String,
}

/// Hint escalation: nothing on the first miss, the weakest hint on the
/// second, the strongest on the third, full reveal on the fourth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HintLevel {
    None,
    Light,
    Strong,
    Reveal,
}

pub fn hint_level(attempts: u32) -> HintLevel {
    match attempts {
        0 | 1 => HintLevel::None,
        2 => HintLevel::Light,
        3 => HintLevel::Strong,
        _ => HintLevel::Reveal,
    }
}

pub fn hint_text(question: &Question, level: HintLevel) -> Option<String> {
    match level {
        HintLevel::None => None,
        HintLevel::Light => question.hints.first().cloned(),
        HintLevel::Strong => question.hints.last().cloned(),
        HintLevel::Reveal => {
            let mut text = format!("The answer is \"{}\".", question.answer);
            if let Some(explanation) = &question.explanation {
                text.push(' ');
                text.push_str(explanation);
            }
            Some(text)
        }
    }
}

/// One active attempt by a user at a lesson in a language. The aggregate is
/// persisted as a single document; every field is part of the wire shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonSession {
    pub user_id: String,
    pub language: String,
    pub lesson_id: String,
    pub state: SessionState,
    pub current_question_index: usize,
    pub attempts: u32,
    pub max_attempts: u32,
    pub messages: Vec<SessionMessage>,
    pub attempt_count_by_question_id: BTreeMap<String, u32>,
    pub last_answer_by_question_id: BTreeMap<String, String>,
    pub practice_by_id: BTreeMap<String, PracticeItem>,
    pub practice_attempts: u32,
    pub practice_cooldown_by_question_id: BTreeMap<String, bool>,
    pub needs_review_by_question_id: BTreeMap<String, bool>,
    pub support_level: SupportLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instruction_language: Option<String>,
    pub version: u64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl LessonSession {
    pub fn start(
        user_id: &str,
        language: &str,
        lesson_id: &str,
        support_level: SupportLevel,
        instruction_language: Option<String>,
        now_ms: i64,
    ) -> Self {
        Self {
            user_id: user_id.to_string(),
            language: language.to_string(),
            lesson_id: lesson_id.to_string(),
            state: SessionState::UserInput,
            current_question_index: 0,
            attempts: 0,
            max_attempts: MAX_ATTEMPTS,
            messages: Vec::new(),
            attempt_count_by_question_id: BTreeMap::new(),
            last_answer_by_question_id: BTreeMap::new(),
            practice_by_id: BTreeMap::new(),
            practice_attempts: 0,
            practice_cooldown_by_question_id: BTreeMap::new(),
            needs_review_by_question_id: BTreeMap::new(),
            support_level,
            instruction_language,
            version: 0,
            created_at: now_ms,
            updated_at: now_ms,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.state == SessionState::Complete
    }

    pub fn push_tutor_message(&mut self, content: impl Into<String>) {
        self.messages.push(SessionMessage {
            role: MessageRole::Tutor,
            content: content.into(),
        });
    }

    pub fn push_student_message(&mut self, content: impl Into<String>) {
        self.messages.push(SessionMessage {
            role: MessageRole::Student,
            content: content.into(),
        });
    }

    pub fn practice_pending_for(&self, question_id: &str) -> bool {
        self.practice_by_id
            .values()
            .any(|item| item.source_question_id.as_deref() == Some(question_id))
    }

    pub fn practice_in_cooldown(&self, question_id: &str) -> bool {
        self.practice_cooldown_by_question_id
            .get(question_id)
            .copied()
            .unwrap_or(false)
    }

    /// Stores a generated practice item and puts its source question into
    /// cooldown so repeated near-misses never regenerate practice.
    pub fn attach_practice(&mut self, item: PracticeItem) {
        if let Some(question_id) = item.source_question_id.clone() {
            self.practice_cooldown_by_question_id
                .insert(question_id, true);
        }
        self.practice_attempts += 1;
        self.practice_by_id
            .insert(item.practice_id.clone(), item);
    }

    /// Removes a practice item; items are consumed exactly once.
    pub fn take_practice(&mut self, practice_id: &str) -> Option<PracticeItem> {
        self.practice_by_id.remove(practice_id)
    }
}

/// Everything a submit transition decides, computed before anything is
/// persisted or phrased.
#[derive(Debug, Clone)]
pub struct SubmitTransition {
    pub question_id: String,
    pub evaluation: Evaluation,
    pub intent: TutorIntent,
    pub hint: HintLevel,
    pub forced_advance: bool,
    pub needs_review: bool,
    pub advanced: bool,
    pub completed: bool,
    /// Attempt count for the answered question after this submit.
    pub attempts_after: u32,
    pub should_schedule_practice: bool,
}

/// Applies one answer submission to the session. Appends the student
/// message; the tutor message is phrased and appended by the caller from the
/// returned transition. Pure in-memory computation.
pub fn apply_submit(
    session: &mut LessonSession,
    lesson: &Lesson,
    raw_answer: &str,
    now_ms: i64,
) -> SubmitTransition {
    debug_assert_eq!(session.state, SessionState::UserInput);

    let total = lesson.total_questions();
    let question = &lesson.questions[session.current_question_index];
    let question_id = question.id.clone();

    session.push_student_message(raw_answer);
    session
        .last_answer_by_question_id
        .insert(question_id.clone(), raw_answer.to_string());

    let evaluation = evaluation::evaluate(
        raw_answer,
        &question.answer,
        &question.accepted_answers,
        &question.blanks,
    );
    let is_correct = evaluation.is_correct();

    let mut hint = HintLevel::None;
    let mut forced_advance = false;
    let mut needs_review = false;
    let mut should_schedule_practice = false;
    let mut attempts_after = session.attempts;
    let signal;

    if is_correct {
        signal = advance_or_complete(session, total);
    } else {
        session.attempts += 1;
        attempts_after = session.attempts;
        *session
            .attempt_count_by_question_id
            .entry(question_id.clone())
            .or_insert(0) += 1;

        if session.attempts >= session.max_attempts {
            forced_advance = true;
            needs_review = true;
            session
                .needs_review_by_question_id
                .insert(question_id.clone(), true);
            hint = HintLevel::Reveal;
            signal = advance_or_complete(session, total);
        } else {
            hint = hint_level(session.attempts);
            signal = SessionState::UserInput;
            if evaluation.result == EvalResult::Almost {
                should_schedule_practice = !session.practice_pending_for(&question_id)
                    && !session.practice_in_cooldown(&question_id);
            }
        }
    }

    session.updated_at = now_ms;

    let intent = tutor_intent(signal, is_correct, needs_review);
    SubmitTransition {
        question_id,
        evaluation,
        intent,
        hint,
        forced_advance,
        needs_review,
        advanced: signal == SessionState::Advance,
        completed: signal == SessionState::Complete,
        attempts_after,
        should_schedule_practice,
    }
}

/// Moves past the current question: either the lesson completes or the index
/// advances with the attempt counter reset. Returns the transition signal.
fn advance_or_complete(session: &mut LessonSession, total: usize) -> SessionState {
    if session.current_question_index + 1 >= total {
        session.state = SessionState::Complete;
        SessionState::Complete
    } else {
        session.current_question_index += 1;
        session.attempts = 0;
        session.state = SessionState::UserInput;
        SessionState::Advance
    }
}
