//! Property-based tests for the answer evaluator and the accepted-answers
//! construction invariant:
//! - Normalized-equal strings (case/whitespace/terminal punctuation) always
//!   evaluate as correct.
//! - The canonical answer is always a member of the accepted set after
//!   construction.
//! - Evaluation is deterministic.

use proptest::prelude::*;

use lingo_backend_rust::content::{LessonCatalog, Question};
use lingo_backend_rust::services::evaluation::{evaluate, EvalResult};

fn arb_answer() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Hello".to_string()),
        Just("Goodbye".to_string()),
        Just("thank you".to_string()),
        Just("Buenos días".to_string()),
        "[a-z]{2,10}( [a-z]{2,10})?",
    ]
}

/// Decorates an answer without changing its normalized form.
fn decorate(answer: &str, flips: &[bool], pad: (u8, u8), punct: Option<char>) -> String {
    let mut out: String = answer
        .chars()
        .zip(flips.iter().cycle())
        .map(|(c, flip)| {
            if *flip {
                c.to_uppercase().next().unwrap_or(c)
            } else {
                c
            }
        })
        .collect();
    if let Some(p) = punct {
        out.push(p);
    }
    format!(
        "{}{}{}",
        " ".repeat(pad.0 as usize % 4),
        out,
        " ".repeat(pad.1 as usize % 4)
    )
}

proptest! {
    #[test]
    fn normalized_equal_answers_are_correct(
        answer in arb_answer(),
        flips in proptest::collection::vec(any::<bool>(), 1..12),
        pad in (any::<u8>(), any::<u8>()),
        punct in proptest::option::of(prop_oneof![
            Just('.'), Just('!'), Just('?'), Just(','), Just(';')
        ]),
    ) {
        let decorated = decorate(&answer, &flips, pad, punct);
        let eval = evaluate(&decorated, &answer, &[answer.clone()], &[]);
        prop_assert_eq!(eval.result, EvalResult::Correct);
    }

    #[test]
    fn evaluation_is_deterministic(
        raw in "[ -~]{0,24}",
        answer in arb_answer(),
    ) {
        let accepted = vec![answer.clone()];
        let first = evaluate(&raw, &answer, &accepted, &[]);
        let second = evaluate(&raw, &answer, &accepted, &[]);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn canonical_always_member_of_accepted_set(
        answer in "[A-Za-z]{1,12}",
        extras in proptest::collection::vec("[A-Za-z]{1,12}", 0..5),
    ) {
        let mut question = Question {
            id: "q".to_string(),
            prompt: "p".to_string(),
            answer: answer.clone(),
            accepted_answers: extras,
            blanks: vec![],
            hints: vec![],
            explanation: None,
            concept_tag: None,
        };
        question.finalize();
        prop_assert!(question
            .accepted_answers
            .iter()
            .any(|a| a.to_lowercase() == answer.to_lowercase()));

        // And therefore the canonical answer always evaluates as correct.
        let eval = evaluate(
            &answer,
            &question.answer,
            &question.accepted_answers,
            &question.blanks,
        );
        prop_assert_eq!(eval.result, EvalResult::Correct);
    }
}

#[test]
fn seed_catalog_upholds_construction_invariant() {
    let catalog = LessonCatalog::seed();
    for (language, lesson_id) in [("en", "basic-1"), ("es", "basic-1")] {
        let lesson = catalog.get(language, lesson_id).unwrap();
        for question in &lesson.questions {
            let eval = evaluate(
                &question.answer,
                &question.answer,
                &question.accepted_answers,
                &question.blanks,
            );
            assert_eq!(eval.result, EvalResult::Correct);
        }
    }
}
