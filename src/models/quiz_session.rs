use crate::dto::quiz_dto::{CreateQuestion, UpdateQuestionPayload};
use crate::error::{Error, Result};
use crate::models::document::ExtractedText;
use crate::models::question::{check_invariants, true_false_options, Question, QuestionKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub mc_count: usize,
    pub tf_count: usize,
    pub difficulty: crate::models::question::Difficulty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationSource {
    Remote,
    Local,
}

/// One user's quiz in progress. Question order is display and export order.
#[derive(Debug, Clone)]
pub struct QuizSession {
    pub id: Uuid,
    pub questions: Vec<Question>,
    pub extracted: Option<ExtractedText>,
    pub params: Option<GenerationParams>,
    pub generated_by: Option<GenerationSource>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for QuizSession {
    fn default() -> Self {
        Self::new()
    }
}

impl QuizSession {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            questions: Vec::new(),
            extracted: None,
            params: None,
            generated_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn list(&self) -> &[Question] {
        &self.questions
    }

    pub fn get(&self, id: Uuid) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    /// Validates the draft, gives it a fresh id and appends it.
    pub fn add(&mut self, draft: CreateQuestion) -> Result<Question> {
        let draft = draft.normalized();
        draft.validate()?;
        let question = draft.into_question(Uuid::new_v4());
        self.questions.push(question.clone());
        self.touch();
        Ok(question)
    }

    /// Applies the supplied fields to a copy, re-checks invariants and only
    /// then commits. A rejected edit leaves the stored record untouched.
    pub fn update(&mut self, id: Uuid, fields: UpdateQuestionPayload) -> Result<Question> {
        let slot = self
            .questions
            .iter_mut()
            .find(|q| q.id == id)
            .ok_or(Error::QuestionNotFound(id))?;

        let mut candidate = slot.clone();
        if let Some(kind) = fields.kind {
            if kind != candidate.kind && fields.options.is_none() {
                candidate.options = match kind {
                    QuestionKind::TrueFalse => true_false_options(),
                    QuestionKind::MultipleChoice => candidate.options.clone(),
                };
            }
            candidate.kind = kind;
        }
        if let Some(prompt) = fields.prompt {
            candidate.prompt = prompt.trim().to_string();
        }
        if let Some(options) = fields.options {
            candidate.options = options.into_iter().map(|o| o.trim().to_string()).collect();
        }
        if let Some(idx) = fields.correct_index {
            candidate.correct_index = idx;
        }
        if let Some(explanation) = fields.explanation {
            let explanation = explanation.trim().to_string();
            candidate.explanation = if explanation.is_empty() {
                None
            } else {
                Some(explanation)
            };
        }
        if let Some(difficulty) = fields.difficulty {
            candidate.difficulty = difficulty;
        }

        check_invariants(
            candidate.kind,
            &candidate.prompt,
            &candidate.options,
            candidate.correct_index,
        )
        .map_err(|reason| Error::InvalidQuestion { id, reason })?;

        *slot = candidate.clone();
        self.touch();
        Ok(candidate)
    }

    /// Returns whether anything was removed. Removing an absent id is a no-op.
    pub fn remove(&mut self, id: Uuid) -> bool {
        let before = self.questions.len();
        self.questions.retain(|q| q.id != id);
        let removed = self.questions.len() != before;
        if removed {
            self.touch();
        }
        removed
    }

    /// `ids` must name every question exactly once.
    pub fn reorder(&mut self, ids: &[Uuid]) -> Result<()> {
        let unique: HashSet<Uuid> = ids.iter().copied().collect();
        if unique.len() != ids.len() || ids.len() != self.questions.len() {
            return Err(Error::BadRequest(format!(
                "Reorder must list each of the {} questions exactly once",
                self.questions.len()
            )));
        }

        let mut reordered = Vec::with_capacity(ids.len());
        for id in ids {
            let question = self
                .get(*id)
                .cloned()
                .ok_or(Error::QuestionNotFound(*id))?;
            reordered.push(question);
        }

        self.questions = reordered;
        self.touch();
        Ok(())
    }

    /// A new upload or paste replaces the text the next generation works from.
    pub fn set_extracted(&mut self, extracted: ExtractedText) {
        self.extracted = Some(extracted);
        self.touch();
    }

    /// Generation replaces the whole question list.
    pub fn replace_questions(
        &mut self,
        drafts: Vec<CreateQuestion>,
        params: GenerationParams,
        source: GenerationSource,
    ) -> Result<&[Question]> {
        let mut questions = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let draft = draft.normalized();
            draft.validate()?;
            questions.push(draft.into_question(Uuid::new_v4()));
        }

        self.questions = questions;
        self.params = Some(params);
        self.generated_by = Some(source);
        self.touch();
        Ok(&self.questions)
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
