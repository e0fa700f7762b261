use crate::content::{Lesson, Question};
use crate::services::intent::TutorIntent;

/// Everything the scripted fallback needs to phrase a tutor turn without AI.
#[derive(Debug, Default)]
pub struct ScriptedContext<'a> {
    pub lesson_title: &'a str,
    /// Prompt of the question now awaiting input, when one exists.
    pub next_prompt: Option<&'a str>,
    /// Canonical answer revealed on forced advance.
    pub revealed_answer: Option<&'a str>,
    pub explanation: Option<&'a str>,
    pub hint: Option<&'a str>,
}

pub fn tutor_system_prompt(language: &str) -> String {
    format!(
        "You are a patient language tutor teaching {language}. \
         Reply with one short message in {language} suitable for a beginner. \
         Stay strictly within the current question and lesson material. \
         Do not reference earlier sessions, the learner's history, or attempt counts. \
         Do not include grading meta-language."
    )
}

pub fn tutor_user_prompt(
    intent: TutorIntent,
    lesson: &Lesson,
    question: &Question,
    learner_answer: Option<&str>,
    hint: Option<&str>,
) -> String {
    let mut prompt = format!(
        "Lesson: {}\nQuestion: {}\nExpected answer: {}\n",
        lesson.title, question.prompt, question.answer
    );
    if let Some(answer) = learner_answer {
        prompt.push_str(&format!("Learner answered: {answer}\n"));
    }
    if let Some(hint) = hint {
        prompt.push_str(&format!("Hint to convey: {hint}\n"));
    }
    let instruction = match intent {
        TutorIntent::AskQuestion => "Ask the learner this question.",
        TutorIntent::EncourageRetry => {
            "The answer was not right. Encourage the learner to try the same question again."
        }
        TutorIntent::AdvanceLesson => {
            "The learner answered correctly. Congratulate briefly and ask the question above."
        }
        TutorIntent::ForcedAdvance => {
            "Reveal the expected answer with its explanation, then move on kindly."
        }
        TutorIntent::EndLesson => "The lesson is finished. Close warmly in one or two sentences.",
    };
    prompt.push_str(instruction);
    prompt
}

/// Deterministic tutor text, used when AI output is unavailable or rejected
/// by a guard. Exists for every intent so a transition never blocks on AI.
pub fn scripted_tutor_message(intent: TutorIntent, ctx: &ScriptedContext) -> String {
    match intent {
        TutorIntent::AskQuestion => match ctx.next_prompt {
            Some(prompt) => prompt.to_string(),
            None => "Let's continue.".to_string(),
        },
        TutorIntent::EncourageRetry => {
            let mut message = String::from("Not quite. Give it another try!");
            if let Some(hint) = ctx.hint {
                message.push_str(&format!(" Hint: {hint}"));
            }
            if let Some(prompt) = ctx.next_prompt {
                message.push_str(&format!(" {prompt}"));
            }
            message
        }
        TutorIntent::AdvanceLesson => match ctx.next_prompt {
            Some(prompt) => format!("Correct, well done! Next one: {prompt}"),
            None => "Correct, well done!".to_string(),
        },
        TutorIntent::ForcedAdvance => {
            let mut message = match ctx.revealed_answer {
                Some(answer) => format!("The answer was \"{answer}\"."),
                None => String::from("Let's look at the answer together."),
            };
            if let Some(explanation) = ctx.explanation {
                message.push_str(&format!(" {explanation}"));
            }
            message.push_str(" We'll practice this one again later.");
            if let Some(prompt) = ctx.next_prompt {
                message.push_str(&format!(" Next one: {prompt}"));
            }
            message
        }
        TutorIntent::EndLesson => format!(
            "That was the last question. You finished \"{}\", great work!",
            ctx.lesson_title
        ),
    }
}

pub fn scripted_greeting(lesson: &Lesson, first_prompt: &str) -> String {
    format!(
        "Welcome to \"{}\"! Let's get started. {first_prompt}",
        lesson.title
    )
}

/// Secondary support line in the learner's instruction language. Derived
/// deterministically from lesson content.
pub fn support_suffix(question: &Question) -> Option<String> {
    question
        .explanation
        .as_deref()
        .map(|explanation| format!("\n(Support: {explanation})"))
}

// ========== Practice generation prompts ==========

pub fn practice_system_prompt(language: &str) -> String {
    format!(
        "You create one supplementary practice item for a {language} lesson. \
         Respond with a single JSON object only, no prose, with fields: \
         \"prompt\" (string), \"expectedAnswerRaw\" (string), \
         \"examples\" (array of up to 6 non-empty strings, optional), \
         \"meta\" (object with \"type\" one of \"variation\", \"dialogue_turn\", \"cloze\", \
         and optional \"conceptTag\"). \
         Reuse only vocabulary from the given material; invent nothing."
    )
}

pub fn practice_user_prompt(lesson: &Lesson, question: &Question) -> String {
    format!(
        "Lesson: {}\nTarget language: {}\nSource question: {}\nCanonical answer: {}\nMaterial: {}\n\
         Produce one practice item that drills the same concept in a fresh way.",
        lesson.title,
        lesson.language,
        question.prompt,
        question.answer,
        question.material()
    )
}
