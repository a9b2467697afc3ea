use crate::dto::quiz_dto::SubmittedAnswer;
use crate::models::question::{Question, QuestionKind};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GradedQuestion {
    pub question_id: Uuid,
    pub prompt: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub selected: Option<usize>,
    pub selected_option: Option<String>,
    pub correct_index: usize,
    pub correct_option: String,
    pub is_correct: bool,
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ScoreReport {
    pub correct: usize,
    pub total: usize,
    pub percentage: f64,
    pub grade: &'static str,
    pub results: Vec<GradedQuestion>,
}

pub struct GradingService;

impl GradingService {
    /// Grades in question order. Unanswered questions count as wrong;
    /// answers for unknown ids are ignored. Later answers for the same
    /// question win.
    pub fn score(questions: &[Question], answers: &[SubmittedAnswer]) -> ScoreReport {
        let submitted: HashMap<Uuid, usize> = answers
            .iter()
            .map(|a| (a.question_id, a.selected))
            .collect();

        let results: Vec<GradedQuestion> = questions
            .iter()
            .map(|q| {
                let selected = submitted.get(&q.id).copied();
                GradedQuestion {
                    question_id: q.id,
                    prompt: q.prompt.clone(),
                    kind: q.kind,
                    selected,
                    selected_option: selected.and_then(|i| q.options.get(i).cloned()),
                    correct_index: q.correct_index,
                    correct_option: q.correct_option().to_string(),
                    is_correct: selected == Some(q.correct_index),
                    explanation: q.explanation.clone(),
                }
            })
            .collect();

        let total = results.len();
        let correct = results.iter().filter(|r| r.is_correct).count();
        let percentage = if total == 0 {
            0.0
        } else {
            correct as f64 * 100.0 / total as f64
        };

        ScoreReport {
            correct,
            total,
            percentage,
            grade: grade_for(percentage),
            results,
        }
    }
}

pub fn grade_for(percentage: f64) -> &'static str {
    if percentage >= 80.0 {
        "Excellent"
    } else if percentage >= 60.0 {
        "Good"
    } else if percentage >= 40.0 {
        "Fair"
    } else {
        "Needs Improvement"
    }
}
