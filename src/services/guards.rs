use once_cell::sync::Lazy;
use regex::Regex;

use crate::services::evaluation::normalize;

// ========== Continuity / privacy guard ==========

/// Ordered pattern table. Any match means the generated text implies the
/// system keeps memory of the learner across sessions, which must never
/// reach the user verbatim. Imperative teaching language ("Remember to use
/// capital letters") must not match: every pattern is anchored on a
/// first-person or second-person-history construction.
static CONTINUITY_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\bbased on your (history|past|progress so far|previous (sessions?|lessons?|attempts?))\b",
        r"(?i)\bi'?ve been (tracking|watching|monitoring|following)\b",
        r"(?i)\bi (have|had) been (tracking|watching|monitoring)\b",
        r"(?i)\blast time you\b",
        r"(?i)\b(this is|that was) your \d+(st|nd|rd|th)? (attempt|try)\b",
        r"(?i)\byour \d+(st|nd|rd|th) (attempt|try)\b",
        r"(?i)\bi remember (when|that|you|your)\b",
        r"(?i)\bas (we|you) (discussed|practiced|saw) (before|earlier|previously|last (time|session|week))\b",
        r"(?i)\byou (always|usually|often|keep) (get|getting|make|making|struggle|struggling)\b",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("continuity pattern"))
    .collect()
});

/// True when generated tutor text implies persistent surveillance of the
/// learner. Hard gate: callers replace violating text with a scripted
/// message, never surface it.
pub fn continuity_violation(text: &str) -> bool {
    CONTINUITY_PATTERNS.iter().any(|p| p.is_match(text))
}

// ========== Drift guard ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftViolation {
    ForeignLanguage,
    Fabrication,
    MetaLanguage,
}

impl DriftViolation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ForeignLanguage => "foreign_language",
            Self::Fabrication => "fabrication",
            Self::MetaLanguage => "meta_language",
        }
    }
}

/// Marker vocabulary per known target language. Tokens are compared exactly
/// after normalization; two or more distinct foreign markers that the lesson
/// material itself does not contain count as drift.
const LANGUAGE_MARKERS: &[(&str, &[&str])] = &[
    (
        "en",
        &["hello", "goodbye", "thank", "thanks", "please", "morning"],
    ),
    (
        "es",
        &["hola", "gracias", "adiós", "buenos", "días", "favor", "señor", "usted"],
    ),
    (
        "fr",
        &["bonjour", "merci", "revoir", "madame", "monsieur", "plaît", "oui"],
    ),
    (
        "de",
        &["hallo", "danke", "bitte", "wiedersehen", "guten", "morgen", "herr"],
    ),
];

const FOREIGN_MARKER_THRESHOLD: usize = 2;

/// Grading meta-language that must never leak into learner-facing text or
/// practice answers.
const META_PHRASES: &[&str] = &[
    "acceptable answers include",
    "accepted answers",
    "the correct answer is",
    "grading criteria",
    "as an ai",
    "as a language model",
];

pub fn contaminated(text: &str) -> bool {
    let folded = text.to_lowercase();
    META_PHRASES.iter().any(|phrase| folded.contains(phrase))
}

/// Counts distinct marker words from languages other than `target_language`
/// that appear in `text` but not in the lesson `material`.
pub fn foreign_language_drift(text: &str, target_language: &str, material: &str) -> bool {
    let text_tokens = token_set(text);
    let material_tokens = token_set(material);
    let target_markers: &[&str] = LANGUAGE_MARKERS
        .iter()
        .find(|(lang, _)| *lang == target_language)
        .map(|(_, markers)| *markers)
        .unwrap_or(&[]);

    let mut foreign = 0usize;
    for (lang, markers) in LANGUAGE_MARKERS {
        if *lang == target_language {
            continue;
        }
        for marker in *markers {
            if target_markers.contains(marker) {
                continue;
            }
            if text_tokens.contains(*marker)
                && !material_tokens.contains(*marker)
            {
                foreign += 1;
                if foreign >= FOREIGN_MARKER_THRESHOLD {
                    return true;
                }
            }
        }
    }
    false
}

/// Every content-bearing token of a generated expected answer must already
/// occur in the source material; anything else is a fabricated fact.
pub fn derives_from_material(answer: &str, material: &str) -> bool {
    let material_tokens = token_set(material);
    normalize(answer)
        .split(' ')
        .filter(|token| token.chars().count() > 2)
        .all(|token| material_tokens.contains(token))
}

/// Drift check for learner-facing tutor text.
pub fn tutor_text_drift(text: &str, target_language: &str, material: &str) -> Option<DriftViolation> {
    if contaminated(text) {
        return Some(DriftViolation::MetaLanguage);
    }
    if foreign_language_drift(text, target_language, material) {
        return Some(DriftViolation::ForeignLanguage);
    }
    None
}

fn token_set(text: &str) -> std::collections::BTreeSet<String> {
    normalize(text)
        .split(' ')
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'').to_string())
        .filter(|t| !t.is_empty())
        .collect()
}
