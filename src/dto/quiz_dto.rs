use crate::models::document::{ContentStats, ExtractedText, SourceRef};
use crate::models::question::{
    check_invariants, true_false_options, Difficulty, Question, QuestionKind,
};
use crate::models::quiz_session::{GenerationParams, GenerationSource, QuizSession};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// A question before it has been given an identity by a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_create_question"))]
pub struct CreateQuestion {
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    #[validate(length(min = 1, message = "Question prompt cannot be empty"))]
    pub prompt: String,
    /// May be omitted for true/false questions.
    #[serde(default)]
    pub options: Vec<String>,
    pub correct_index: usize,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub difficulty: Difficulty,
}

impl CreateQuestion {
    pub fn multiple_choice(
        prompt: impl Into<String>,
        options: Vec<String>,
        correct_index: usize,
        explanation: Option<String>,
        difficulty: Difficulty,
    ) -> Self {
        Self {
            kind: QuestionKind::MultipleChoice,
            prompt: prompt.into(),
            options,
            correct_index,
            explanation,
            difficulty,
        }
    }

    pub fn true_false(
        statement: impl Into<String>,
        answer: bool,
        explanation: Option<String>,
        difficulty: Difficulty,
    ) -> Self {
        Self {
            kind: QuestionKind::TrueFalse,
            prompt: statement.into(),
            options: true_false_options(),
            correct_index: if answer { 0 } else { 1 },
            explanation,
            difficulty,
        }
    }

    /// Fills in the fixed True/False labels when a client leaves them out.
    pub fn normalized(mut self) -> Self {
        if self.kind == QuestionKind::TrueFalse && self.options.is_empty() {
            self.options = true_false_options();
        }
        self.prompt = self.prompt.trim().to_string();
        self.explanation = self
            .explanation
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());
        self
    }

    pub fn into_question(self, id: Uuid) -> Question {
        Question {
            id,
            kind: self.kind,
            prompt: self.prompt,
            options: self.options,
            correct_index: self.correct_index,
            explanation: self.explanation,
            difficulty: self.difficulty,
        }
    }
}

fn validate_create_question(q: &CreateQuestion) -> Result<(), ValidationError> {
    check_invariants(q.kind, &q.prompt, &q.options, q.correct_index).map_err(|reason| {
        let mut err = ValidationError::new("question_invariants");
        err.message = Some(reason.into());
        err
    })
}

/// Partial edit: only supplied fields are replaced. An empty `explanation`
/// clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateQuestionPayload {
    #[serde(default, rename = "type")]
    pub kind: Option<QuestionKind>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub options: Option<Vec<String>>,
    #[serde(default)]
    pub correct_index: Option<usize>,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PasteTextPayload {
    #[validate(length(min = 1, message = "Text cannot be empty"))]
    pub text: String,
    pub label: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "validate_generate_payload"))]
pub struct GenerateQuizPayload {
    #[serde(default)]
    pub mc_count: usize,
    #[serde(default)]
    pub tf_count: usize,
    #[serde(default)]
    pub difficulty: Difficulty,
}

fn validate_generate_payload(p: &GenerateQuizPayload) -> Result<(), ValidationError> {
    if p.mc_count == 0 && p.tf_count == 0 {
        let mut err = ValidationError::new("no_questions_requested");
        err.message = Some("Request at least one multiple-choice or true/false question".into());
        return Err(err);
    }
    Ok(())
}

impl From<&GenerateQuizPayload> for GenerationParams {
    fn from(p: &GenerateQuizPayload) -> Self {
        GenerationParams {
            mc_count: p.mc_count,
            tf_count: p.tf_count,
            difficulty: p.difficulty,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ReorderPayload {
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ScorePayload {
    pub answers: Vec<SubmittedAnswer>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmittedAnswer {
    pub question_id: Uuid,
    pub selected: usize,
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub format: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ExtractionResponse {
    pub source: SourceRef,
    pub char_count: usize,
    pub stats: ContentStats,
    pub preview: String,
}

impl ExtractionResponse {
    pub fn new(extracted: &ExtractedText, stats: ContentStats) -> Self {
        const PREVIEW_CHARS: usize = 500;
        let mut preview: String = extracted.text.chars().take(PREVIEW_CHARS).collect();
        if extracted.char_count > PREVIEW_CHARS {
            preview.push_str("...");
        }
        Self {
            source: extracted.source.clone(),
            char_count: extracted.char_count,
            stats,
            preview,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GenerateQuizResponse {
    pub source: GenerationSource,
    pub requested: GenerationParams,
    pub questions: Vec<Question>,
    pub logs: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub id: Uuid,
    pub source: Option<SourceRef>,
    pub char_count: Option<usize>,
    pub params: Option<GenerationParams>,
    pub generated_by: Option<GenerationSource>,
    pub questions: Vec<Question>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<&QuizSession> for SessionResponse {
    fn from(s: &QuizSession) -> Self {
        Self {
            id: s.id,
            source: s.extracted.as_ref().map(|e| e.source.clone()),
            char_count: s.extracted.as_ref().map(|e| e.char_count),
            params: s.params.clone(),
            generated_by: s.generated_by,
            questions: s.questions.clone(),
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}
