use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

// ========== Types ==========

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub prompt: String,
    pub answer: String,
    #[serde(default)]
    pub accepted_answers: Vec<String>,
    #[serde(default)]
    pub blanks: Vec<String>,
    #[serde(default)]
    pub hints: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concept_tag: Option<String>,
}

impl Question {
    /// Rebuilds `accepted_answers` so the canonical answer is always a member
    /// and duplicates (case-insensitive) are collapsed, canonical first.
    pub fn finalize(&mut self) {
        let mut seen: BTreeSet<String> = BTreeSet::new();
        let mut accepted = Vec::with_capacity(self.accepted_answers.len() + 1);

        for candidate in std::iter::once(self.answer.clone()).chain(self.accepted_answers.drain(..))
        {
            let folded = candidate.trim().to_lowercase();
            if folded.is_empty() || !seen.insert(folded) {
                continue;
            }
            accepted.push(candidate.trim().to_string());
        }

        self.accepted_answers = accepted;
    }

    /// Material the question exposes to the AI: everything a generated text
    /// is allowed to draw vocabulary and facts from.
    pub fn material(&self) -> String {
        let mut parts: Vec<&str> = vec![&self.prompt, &self.answer];
        parts.extend(self.accepted_answers.iter().map(String::as_str));
        parts.extend(self.blanks.iter().map(String::as_str));
        parts.extend(self.hints.iter().map(String::as_str));
        if let Some(explanation) = &self.explanation {
            parts.push(explanation);
        }
        parts.join(" ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: String,
    pub language: String,
    pub title: String,
    pub questions: Vec<Question>,
}

impl Lesson {
    pub fn question(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    pub fn question_by_id(&self, question_id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == question_id)
    }

    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }
}

// ========== Catalog ==========

#[derive(Debug, Default)]
pub struct LessonCatalog {
    lessons: BTreeMap<(String, String), Lesson>,
    languages: BTreeSet<String>,
}

impl LessonCatalog {
    /// Seed catalog plus any JSON lessons found under `LESSON_CONTENT_DIR`
    /// (one lesson document per file, same wire shape as `Lesson`).
    pub fn from_env() -> Self {
        let mut catalog = Self::seed();

        if let Ok(dir) = std::env::var("LESSON_CONTENT_DIR") {
            let dir = dir.trim().to_string();
            if !dir.is_empty() {
                catalog.load_dir(Path::new(&dir));
            }
        }

        catalog
    }

    pub fn seed() -> Self {
        let mut catalog = Self::default();
        for lesson in seed_lessons() {
            catalog.insert(lesson);
        }
        catalog
    }

    pub fn insert(&mut self, mut lesson: Lesson) {
        for question in &mut lesson.questions {
            question.finalize();
        }
        self.languages.insert(lesson.language.clone());
        self.lessons
            .insert((lesson.language.clone(), lesson.id.clone()), lesson);
    }

    fn load_dir(&mut self, dir: &Path) {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(error = %err, dir = %dir.display(), "lesson content dir unreadable");
                return;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match std::fs::read_to_string(&path)
                .map_err(|e| e.to_string())
                .and_then(|raw| serde_json::from_str::<Lesson>(&raw).map_err(|e| e.to_string()))
            {
                Ok(lesson) => {
                    if lesson.questions.is_empty() {
                        tracing::warn!(path = %path.display(), "skipping lesson with no questions");
                        continue;
                    }
                    self.insert(lesson);
                }
                Err(err) => {
                    tracing::warn!(error = %err, path = %path.display(), "skipping unparsable lesson file");
                }
            }
        }
    }

    pub fn get(&self, language: &str, lesson_id: &str) -> Option<&Lesson> {
        self.lessons
            .get(&(language.to_string(), lesson_id.to_string()))
    }

    pub fn supports_language(&self, language: &str) -> bool {
        self.languages.contains(language)
    }

    pub fn len(&self) -> usize {
        self.lessons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lessons.is_empty()
    }
}

// ========== Seed content ==========

fn question(
    id: &str,
    prompt: &str,
    answer: &str,
    accepted: &[&str],
    blanks: &[&str],
    hints: &[&str],
    explanation: &str,
    concept: &str,
) -> Question {
    Question {
        id: id.to_string(),
        prompt: prompt.to_string(),
        answer: answer.to_string(),
        accepted_answers: accepted.iter().map(|s| s.to_string()).collect(),
        blanks: blanks.iter().map(|s| s.to_string()).collect(),
        hints: hints.iter().map(|s| s.to_string()).collect(),
        explanation: Some(explanation.to_string()),
        concept_tag: Some(concept.to_string()),
    }
}

fn seed_lessons() -> Vec<Lesson> {
    vec![
        Lesson {
            id: "basic-1".to_string(),
            language: "en".to_string(),
            title: "English basics: greetings".to_string(),
            questions: vec![
                question(
                    "q1",
                    "How do you greet someone when you meet them?",
                    "Hello",
                    &["Hi"],
                    &[],
                    &[
                        "It starts with the letter H.",
                        "Five letters: H, then four more.",
                    ],
                    "\"Hello\" is the standard neutral greeting in English.",
                    "greetings",
                ),
                question(
                    "q2",
                    "What do you say when you leave?",
                    "Goodbye",
                    &["Bye"],
                    &[],
                    &[
                        "It contains the word \"good\".",
                        "Good..., then the word for \"farewell\".",
                    ],
                    "\"Goodbye\" is the standard way to end a conversation politely.",
                    "greetings",
                ),
                question(
                    "q3",
                    "Complete the sentence: \"Thank ___ very much.\"",
                    "you",
                    &[],
                    &["you"],
                    &["It is a pronoun.", "The second person pronoun."],
                    "\"Thank you\" uses the second person pronoun \"you\".",
                    "politeness",
                ),
            ],
        },
        Lesson {
            id: "basic-1".to_string(),
            language: "es".to_string(),
            title: "Fundamentos de español: saludos".to_string(),
            questions: vec![
                question(
                    "q1",
                    "How do you greet someone in Spanish?",
                    "Hola",
                    &[],
                    &[],
                    &["It starts with the letter H.", "Four letters: H, o, l, a."],
                    "\"Hola\" is the universal Spanish greeting.",
                    "saludos",
                ),
                question(
                    "q2",
                    "How do you say \"thank you\" in Spanish?",
                    "Gracias",
                    &["Muchas gracias"],
                    &[],
                    &["It starts with G.", "Gra..."],
                    "\"Gracias\" expresses thanks in Spanish.",
                    "cortesía",
                ),
            ],
        },
    ]
}
