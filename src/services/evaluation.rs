use serde::{Deserialize, Serialize};

/// Edit distance allowed before a miss stops counting as a typo.
const TYPO_EDIT_DISTANCE: usize = 1;
/// Answers longer than this (normalized chars) tolerate one extra edit.
const TYPO_RELAXED_LEN: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvalResult {
    Correct,
    Almost,
    Wrong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    Exact,
    Typo,
    WordOrder,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub result: EvalResult,
    pub reason_code: ReasonCode,
}

impl Evaluation {
    pub fn is_correct(&self) -> bool {
        self.result == EvalResult::Correct
    }
}

/// Trim, lowercase, collapse internal whitespace, strip terminal punctuation.
pub fn normalize(text: &str) -> String {
    let lowered = text.trim().to_lowercase();
    let stripped =
        lowered.trim_end_matches(|c: char| matches!(c, '.' | '!' | '?' | ',' | ';' | ':' | '…'));
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Compares a learner's free-text answer against the accepted answers of a
/// question. Deterministic and pure: same input always yields same output.
pub fn evaluate(
    raw: &str,
    canonical: &str,
    accepted_answers: &[String],
    blanks: &[String],
) -> Evaluation {
    let input = normalize(raw);
    if input.is_empty() {
        return Evaluation {
            result: EvalResult::Wrong,
            reason_code: ReasonCode::Other,
        };
    }

    let mut candidates: Vec<String> = Vec::with_capacity(1 + accepted_answers.len() + blanks.len());
    for candidate in std::iter::once(canonical)
        .chain(accepted_answers.iter().map(String::as_str))
        .chain(blanks.iter().map(String::as_str))
    {
        let normalized = normalize(candidate);
        if !normalized.is_empty() && !candidates.contains(&normalized) {
            candidates.push(normalized);
        }
    }

    if candidates.iter().any(|c| *c == input) {
        return Evaluation {
            result: EvalResult::Correct,
            reason_code: ReasonCode::Exact,
        };
    }

    for candidate in &candidates {
        if within_typo_distance(&input, candidate) {
            return Evaluation {
                result: EvalResult::Almost,
                reason_code: ReasonCode::Typo,
            };
        }
    }

    for candidate in &candidates {
        if same_tokens_reordered(&input, candidate) {
            return Evaluation {
                result: EvalResult::Almost,
                reason_code: ReasonCode::WordOrder,
            };
        }
    }

    Evaluation {
        result: EvalResult::Wrong,
        reason_code: ReasonCode::Other,
    }
}

fn within_typo_distance(input: &str, candidate: &str) -> bool {
    let limit = if candidate.chars().count() > TYPO_RELAXED_LEN {
        TYPO_EDIT_DISTANCE + 1
    } else {
        TYPO_EDIT_DISTANCE
    };
    edit_distance(input, candidate) <= limit
}

fn same_tokens_reordered(input: &str, candidate: &str) -> bool {
    let mut input_tokens: Vec<&str> = input.split(' ').collect();
    let mut candidate_tokens: Vec<&str> = candidate.split(' ').collect();
    if input_tokens.len() < 2 || input_tokens.len() != candidate_tokens.len() {
        return false;
    }
    input_tokens.sort_unstable();
    candidate_tokens.sort_unstable();
    input_tokens == candidate_tokens
}

fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            current[j + 1] = substitution.min(prev[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut prev, &mut current);
    }

    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accepted(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn exact_match_is_correct() {
        let eval = evaluate("Hello", "Hello", &accepted(&["Hello", "Hi"]), &[]);
        assert_eq!(eval.result, EvalResult::Correct);
        assert_eq!(eval.reason_code, ReasonCode::Exact);
    }

    #[test]
    fn normalization_ignores_case_whitespace_and_punctuation() {
        for raw in ["  hello  ", "HELLO!", "Hello.", "hello ?"] {
            let eval = evaluate(raw, "Hello", &accepted(&["Hello"]), &[]);
            assert_eq!(eval.result, EvalResult::Correct, "raw: {raw:?}");
        }
    }

    #[test]
    fn alternate_accepted_answer_is_correct() {
        let eval = evaluate("hi", "Hello", &accepted(&["Hello", "Hi"]), &[]);
        assert_eq!(eval.result, EvalResult::Correct);
    }

    #[test]
    fn blank_fill_value_is_correct() {
        let eval = evaluate("you", "you", &accepted(&["you"]), &["you".to_string()]);
        assert_eq!(eval.result, EvalResult::Correct);
    }

    #[test]
    fn single_typo_is_almost() {
        let eval = evaluate("Helo", "Hello", &accepted(&["Hello"]), &[]);
        assert_eq!(eval.result, EvalResult::Almost);
        assert_eq!(eval.reason_code, ReasonCode::Typo);
    }

    #[test]
    fn longer_answer_allows_two_edits() {
        let eval = evaluate("Godbye", "Goodbye", &accepted(&["Goodbye"]), &[]);
        assert_eq!(eval.result, EvalResult::Almost);
        assert_eq!(eval.reason_code, ReasonCode::Typo);

        let eval = evaluate("Gobye", "Goodbye", &accepted(&["Goodbye"]), &[]);
        assert_eq!(eval.result, EvalResult::Almost);
    }

    #[test]
    fn reordered_tokens_are_almost() {
        let eval = evaluate("you thank", "thank you", &accepted(&["thank you"]), &[]);
        assert_eq!(eval.result, EvalResult::Almost);
        assert_eq!(eval.reason_code, ReasonCode::WordOrder);
    }

    #[test]
    fn unrelated_answer_is_wrong() {
        let eval = evaluate("nope", "Hello", &accepted(&["Hello", "Hi"]), &[]);
        assert_eq!(eval.result, EvalResult::Wrong);
        assert_eq!(eval.reason_code, ReasonCode::Other);
    }

    #[test]
    fn empty_answer_is_wrong() {
        let eval = evaluate("   ", "Hi", &accepted(&["Hi"]), &[]);
        assert_eq!(eval.result, EvalResult::Wrong);
    }

    #[test]
    fn deterministic_for_same_input() {
        let a = evaluate("Helo", "Hello", &accepted(&["Hello"]), &[]);
        let b = evaluate("Helo", "Hello", &accepted(&["Hello"]), &[]);
        assert_eq!(a, b);
    }
}
