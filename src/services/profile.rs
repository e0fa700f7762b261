use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::content::Question;
use crate::services::evaluation::EvalResult;

/// Bounded review queue per learner and language.
pub const REVIEW_ITEM_CAP: usize = 120;

pub const CONFIDENCE_INITIAL: f64 = 0.3;
pub const CONFIDENCE_MISTAKE_STEP: f64 = 0.1;
pub const CONFIDENCE_FLOOR: f64 = 0.05;
pub const CONFIDENCE_REVIEW_STEP: f64 = 0.15;
pub const CONFIDENCE_MASTERY: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewOutcome {
    Wrong,
    Forced,
    Correct,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewItem {
    pub concept_tag: String,
    pub last_seen_at: i64,
    pub last_outcome: ReviewOutcome,
    pub mistake_count: u32,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnerProfile {
    pub user_id: String,
    pub language: String,
    pub review_items: BTreeMap<String, ReviewItem>,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Copy)]
pub struct ReviewStep {
    pub confidence: f64,
    pub removed: bool,
}

pub fn review_key(lesson_id: &str, question_id: &str) -> String {
    format!("{lesson_id}__q{question_id}")
}

/// Splits a review key back into `(lessonId, questionId)`.
pub fn parse_review_key(key: &str) -> Option<(&str, &str)> {
    key.rsplit_once("__q")
}

impl LearnerProfile {
    pub fn new(user_id: &str, language: &str, now_ms: i64) -> Self {
        Self {
            user_id: user_id.to_string(),
            language: language.to_string(),
            review_items: BTreeMap::new(),
            updated_at: now_ms,
        }
    }

    /// Upserts a review candidate after a wrong or forced-advance outcome.
    /// Forced advance always writes, regardless of prior history.
    pub fn record_attempt_outcome(
        &mut self,
        lesson_id: &str,
        question: &Question,
        outcome: ReviewOutcome,
        now_ms: i64,
    ) {
        if outcome == ReviewOutcome::Correct {
            return;
        }

        let key = review_key(lesson_id, &question.id);
        let concept = question.concept_tag.clone().unwrap_or_default();

        let entry = self.review_items.entry(key).or_insert(ReviewItem {
            concept_tag: concept,
            last_seen_at: now_ms,
            last_outcome: outcome,
            mistake_count: 0,
            confidence: CONFIDENCE_INITIAL,
        });
        entry.last_seen_at = now_ms;
        entry.last_outcome = outcome;
        entry.mistake_count += 1;
        if entry.mistake_count > 1 {
            entry.confidence =
                (entry.confidence - CONFIDENCE_MISTAKE_STEP).max(CONFIDENCE_FLOOR);
        }

        self.updated_at = now_ms;
        self.enforce_cap();
    }

    /// Applies a scheduled-review answer to the item's confidence. A correct
    /// outcome never decreases confidence; crossing the mastery threshold
    /// removes the item entirely. Returns `None` when the item is gone.
    pub fn record_review_practice_outcome(
        &mut self,
        key: &str,
        result: EvalResult,
        now_ms: i64,
    ) -> Option<ReviewStep> {
        if !self.review_items.contains_key(key) {
            return None;
        }
        self.updated_at = now_ms;
        let item = self.review_items.get_mut(key)?;

        if result == EvalResult::Correct {
            item.last_seen_at = now_ms;
            item.last_outcome = ReviewOutcome::Correct;
            item.confidence = (item.confidence + CONFIDENCE_REVIEW_STEP).min(1.0);
            if item.confidence >= CONFIDENCE_MASTERY {
                let confidence = item.confidence;
                self.review_items.remove(key);
                return Some(ReviewStep {
                    confidence,
                    removed: true,
                });
            }
            let confidence = item.confidence;
            return Some(ReviewStep {
                confidence,
                removed: false,
            });
        }

        item.last_seen_at = now_ms;
        item.last_outcome = ReviewOutcome::Wrong;
        item.mistake_count += 1;
        item.confidence = (item.confidence - CONFIDENCE_MISTAKE_STEP).max(CONFIDENCE_FLOOR);
        Some(ReviewStep {
            confidence: item.confidence,
            removed: false,
        })
    }

    /// Due items by urgency: oldest `lastSeenAt` first, mistake count as the
    /// tie-breaker.
    pub fn due_review_items(&self, limit: usize) -> Vec<(String, ReviewItem)> {
        let mut items: Vec<(String, ReviewItem)> = self
            .review_items
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        items.sort_by(|a, b| {
            a.1.last_seen_at
                .cmp(&b.1.last_seen_at)
                .then(b.1.mistake_count.cmp(&a.1.mistake_count))
        });
        items.truncate(limit);
        items
    }

    /// Drops every review item belonging to a lesson (explicit restart).
    pub fn clear_lesson(&mut self, lesson_id: &str) {
        let prefix = format!("{lesson_id}__q");
        self.review_items.retain(|key, _| !key.starts_with(&prefix));
    }

    fn enforce_cap(&mut self) {
        while self.review_items.len() > REVIEW_ITEM_CAP {
            let oldest = self
                .review_items
                .iter()
                .min_by_key(|(_, item)| item.last_seen_at)
                .map(|(key, _)| key.clone());
            match oldest {
                Some(key) => {
                    self.review_items.remove(&key);
                }
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::LessonCatalog;

    fn profile_and_question() -> (LearnerProfile, Question) {
        let catalog = LessonCatalog::seed();
        let question = catalog.get("en", "basic-1").unwrap().questions[0].clone();
        (LearnerProfile::new("u1", "en", 0), question)
    }

    #[test]
    fn correct_outcome_records_nothing() {
        let (mut profile, question) = profile_and_question();
        profile.record_attempt_outcome("basic-1", &question, ReviewOutcome::Correct, 10);
        assert!(profile.review_items.is_empty());
    }

    #[test]
    fn wrong_outcome_upserts_candidate() {
        let (mut profile, question) = profile_and_question();
        profile.record_attempt_outcome("basic-1", &question, ReviewOutcome::Wrong, 10);

        let item = profile.review_items.get("basic-1__qq1").unwrap();
        assert_eq!(item.mistake_count, 1);
        assert_eq!(item.last_outcome, ReviewOutcome::Wrong);
        assert_eq!(item.last_seen_at, 10);
        assert!((item.confidence - CONFIDENCE_INITIAL).abs() < f64::EPSILON);
    }

    #[test]
    fn repeat_mistakes_decrease_confidence_to_floor() {
        let (mut profile, question) = profile_and_question();
        for i in 0..6 {
            profile.record_attempt_outcome("basic-1", &question, ReviewOutcome::Forced, i);
        }
        let item = profile.review_items.get("basic-1__qq1").unwrap();
        assert_eq!(item.mistake_count, 6);
        assert!(item.confidence >= CONFIDENCE_FLOOR);
        assert!(item.confidence < CONFIDENCE_INITIAL);
    }

    #[test]
    fn cap_evicts_oldest_entries() {
        let catalog = LessonCatalog::seed();
        let question = catalog.get("en", "basic-1").unwrap().questions[0].clone();
        let mut profile = LearnerProfile::new("u1", "en", 0);

        for i in 0..(REVIEW_ITEM_CAP + 20) {
            let mut q = question.clone();
            q.id = format!("gen{i}");
            profile.record_attempt_outcome("basic-1", &q, ReviewOutcome::Wrong, i as i64);
        }

        assert_eq!(profile.review_items.len(), REVIEW_ITEM_CAP);
        // The oldest entries were evicted; the most recent ones survive.
        assert!(profile.review_items.get("basic-1__qgen0").is_none());
        assert!(profile
            .review_items
            .get(&format!("basic-1__qgen{}", REVIEW_ITEM_CAP + 19))
            .is_some());
    }

    #[test]
    fn correct_review_never_decreases_confidence_and_unsets_at_mastery() {
        let (mut profile, question) = profile_and_question();
        profile.record_attempt_outcome("basic-1", &question, ReviewOutcome::Forced, 0);
        let key = review_key("basic-1", "q1");

        let mut previous = profile.review_items.get(&key).unwrap().confidence;
        let mut steps = 0;
        loop {
            let step = profile
                .record_review_practice_outcome(&key, EvalResult::Correct, 1)
                .unwrap();
            assert!(step.confidence >= previous);
            previous = step.confidence;
            steps += 1;
            if step.removed {
                break;
            }
            assert!(steps < 10, "mastery threshold never reached");
        }

        assert!(previous >= CONFIDENCE_MASTERY);
        assert!(profile.review_items.get(&key).is_none());
    }

    #[test]
    fn missing_review_item_yields_none() {
        let (mut profile, _) = profile_and_question();
        assert!(profile
            .record_review_practice_outcome("basic-1__qq9", EvalResult::Correct, 1)
            .is_none());
    }

    #[test]
    fn due_items_sorted_by_urgency() {
        let catalog = LessonCatalog::seed();
        let question = catalog.get("en", "basic-1").unwrap().questions[0].clone();
        let mut profile = LearnerProfile::new("u1", "en", 0);

        for (id, seen) in [("a", 30), ("b", 10), ("c", 20)] {
            let mut q = question.clone();
            q.id = id.to_string();
            profile.record_attempt_outcome("basic-1", &q, ReviewOutcome::Wrong, seen);
        }

        let due = profile.due_review_items(2);
        assert_eq!(due.len(), 2);
        assert_eq!(due[0].0, review_key("basic-1", "b"));
        assert_eq!(due[1].0, review_key("basic-1", "c"));
    }

    #[test]
    fn clear_lesson_drops_only_that_lesson() {
        let catalog = LessonCatalog::seed();
        let question = catalog.get("en", "basic-1").unwrap().questions[0].clone();
        let mut profile = LearnerProfile::new("u1", "en", 0);
        profile.record_attempt_outcome("basic-1", &question, ReviewOutcome::Wrong, 1);
        profile.record_attempt_outcome("basic-2", &question, ReviewOutcome::Wrong, 2);

        profile.clear_lesson("basic-1");
        assert!(profile.review_items.get("basic-1__qq1").is_none());
        assert!(profile.review_items.get("basic-2__qq1").is_some());
    }

    #[test]
    fn review_key_round_trips() {
        let key = review_key("basic-1", "q1");
        assert_eq!(key, "basic-1__qq1");
        assert_eq!(parse_review_key(&key), Some(("basic-1", "q1")));
    }
}
