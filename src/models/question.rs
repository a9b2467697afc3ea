use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const TRUE_LABEL: &str = "True";
pub const FALSE_LABEL: &str = "False";
pub const MULTIPLE_CHOICE_OPTIONS: usize = 4;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Question {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_index: usize,
    pub explanation: Option<String>,
    pub difficulty: Difficulty,
}

impl Question {
    pub fn correct_option(&self) -> &str {
        self.options
            .get(self.correct_index)
            .map(String::as_str)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice,
    TrueFalse,
}

impl QuestionKind {
    pub fn option_count(self) -> usize {
        match self {
            QuestionKind::MultipleChoice => MULTIPLE_CHOICE_OPTIONS,
            QuestionKind::TrueFalse => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            QuestionKind::MultipleChoice => "Multiple Choice",
            QuestionKind::TrueFalse => "True/False",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    /// Guidance handed to the remote model for this level.
    pub fn guidelines(self) -> (&'static str, &'static str) {
        match self {
            Difficulty::Easy => (
                "Basic recall and recognition questions with simple vocabulary",
                "Factual information, definitions, and straightforward concepts",
            ),
            Difficulty::Medium => (
                "Questions requiring understanding, application, and basic analysis",
                "Connecting concepts, explaining relationships, and applying knowledge",
            ),
            Difficulty::Hard => (
                "Complex analysis, synthesis, evaluation, and critical thinking",
                "Advanced reasoning, comparing ideas, and drawing conclusions",
            ),
        }
    }
}

pub fn true_false_options() -> Vec<String> {
    vec![TRUE_LABEL.to_string(), FALSE_LABEL.to_string()]
}

/// Invariants every question record must satisfy, whoever produced it.
pub fn check_invariants(
    kind: QuestionKind,
    prompt: &str,
    options: &[String],
    correct_index: usize,
) -> std::result::Result<(), String> {
    if prompt.trim().is_empty() {
        return Err("Question prompt cannot be empty".to_string());
    }

    let expected = kind.option_count();
    if options.len() != expected {
        return Err(format!(
            "{} questions need exactly {} options, got {}",
            kind.label(),
            expected,
            options.len()
        ));
    }

    if correct_index >= options.len() {
        return Err(format!(
            "Correct answer index {} is out of range for {} options",
            correct_index,
            options.len()
        ));
    }

    match kind {
        QuestionKind::TrueFalse => {
            if options[0] != TRUE_LABEL || options[1] != FALSE_LABEL {
                return Err("True/False options must be exactly \"True\" and \"False\"".to_string());
            }
        }
        QuestionKind::MultipleChoice => {
            if options.iter().any(|o| o.trim().is_empty()) {
                return Err("Options cannot be empty".to_string());
            }
            let folded: Vec<String> = options.iter().map(|o| o.trim().to_lowercase()).collect();
            for (i, a) in folded.iter().enumerate() {
                if folded[i + 1..].contains(a) {
                    return Err(format!("Option \"{}\" appears more than once", options[i].trim()));
                }
            }
        }
    }

    Ok(())
}
