use crate::config::Config;
use crate::dto::quiz_dto::CreateQuestion;
use crate::error::RemoteGenerationError;
use crate::models::question::{QuestionKind, MULTIPLE_CHOICE_OPTIONS};
use crate::models::quiz_session::GenerationParams;
use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::Client;
use serde_json::Value as JsonValue;
use std::time::Duration;
use validator::Validate;

const MAX_PROMPT_CONTENT_CHARS: usize = 1500;
const OPTION_LETTERS: [char; MULTIPLE_CHOICE_OPTIONS] = ['A', 'B', 'C', 'D'];

type RemoteResult<T> = std::result::Result<T, RemoteGenerationError>;

/// Client for the hosted Gemini model. Holds an explicit credential state;
/// without a key every call fails fast with `NotConfigured`.
#[derive(Clone)]
pub struct RemoteGenerator {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
    timeout: Duration,
}

impl RemoteGenerator {
    pub fn new(
        api_key: Option<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
        client: Client,
    ) -> Self {
        Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: model.into(),
            base_url: base_url.into(),
            timeout,
        }
    }

    pub fn from_config(config: &Config, client: Client) -> Self {
        Self::new(
            config.gemini_api_key.clone(),
            config.gemini_model.clone(),
            config.gemini_base_url.clone(),
            Duration::from_secs(config.remote_timeout_secs),
            client,
        )
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn generate_remote(
        &self,
        text: &str,
        params: &GenerationParams,
    ) -> RemoteResult<Vec<CreateQuestion>> {
        let prompt = build_prompt(text, params);
        let raw = self.generate_content(&prompt, 4000).await?;
        parse_questions(&raw, params, &mut rand::thread_rng())
    }

    /// Minimal round trip used by the status check.
    pub async fn ping(&self) -> RemoteResult<()> {
        let raw = self
            .generate_content("Say 'Hello' in JSON format: {\"message\": \"Hello\"}", 50)
            .await?;
        if raw.trim().is_empty() {
            return Err(RemoteGenerationError::Empty);
        }
        Ok(())
    }

    async fn generate_content(&self, prompt: &str, max_output_tokens: u32) -> RemoteResult<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(RemoteGenerationError::NotConfigured)?;

        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        );
        let payload = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": 0.7,
                "maxOutputTokens": max_output_tokens
            }
        });

        let res = self
            .client
            .post(url)
            .header("x-goog-api-key", api_key)
            .json(&payload)
            .timeout(self.timeout)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(RemoteGenerationError::Status { status, body });
        }

        let body: JsonValue = res.json().await?;
        let parts = body
            .get("candidates")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("content"))
            .and_then(|c| c.get("parts"))
            .and_then(|p| p.as_array())
            .ok_or_else(|| {
                RemoteGenerationError::MalformedResponse("response has no candidates".to_string())
            })?;

        let text: String = parts
            .iter()
            .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
            .collect();
        Ok(text)
    }
}

pub fn build_prompt(text: &str, params: &GenerationParams) -> String {
    let mut content: String = text.chars().take(MAX_PROMPT_CONTENT_CHARS).collect();
    if text.chars().count() > MAX_PROMPT_CONTENT_CHARS {
        content.push_str("...");
    }
    let (description, focus) = params.difficulty.guidelines();
    let level = params.difficulty.as_str();

    format!(
        r#"You are an expert educational quiz creator. Create a {level} level quiz based on the provided content.

CONTENT TO ANALYZE:
{content}

QUIZ REQUIREMENTS:
- Generate {mc} multiple choice questions
- Generate {tf} true/false questions
- Difficulty Level: {upper}
- {description}
- Focus on: {focus}

FORMATTING INSTRUCTIONS:
- Each multiple choice question must have exactly 4 options
- Only ONE option should be correct
- True/false questions should be clear statements that are definitively true or false
- Include helpful explanations for learning
- Base ALL questions strictly on the provided content
- Response must be a JSON array only, no extra text or markdown formatting

OUTPUT FORMAT (JSON ONLY):
[
  {{"type": "multiple_choice", "question": "Clear question?", "options": ["First", "Second", "Third", "Fourth"], "correct_answer": 0, "explanation": "Why this option is correct"}},
  {{"type": "true_false", "question": "Clear statement.", "correct_answer": true, "explanation": "Why the statement is true or false"}}
]

Generate exactly {mc} multiple choice and {tf} true/false questions. Return ONLY the JSON."#,
        level = level,
        content = content,
        mc = params.mc_count,
        tf = params.tf_count,
        upper = level.to_uppercase(),
        description = description,
        focus = focus,
    )
}

/// Parses model output into question drafts. Tolerates prose and code
/// fences around the JSON, but a single unusable record fails the whole
/// response. Multiple-choice options are shuffled; results are cut to the
/// requested counts, multiple-choice first.
pub fn parse_questions<R: Rng + ?Sized>(
    raw: &str,
    params: &GenerationParams,
    rng: &mut R,
) -> RemoteResult<Vec<CreateQuestion>> {
    let json = extract_json(raw).ok_or_else(|| {
        RemoteGenerationError::MalformedResponse("no JSON found in response".to_string())
    })?;
    let value: JsonValue = serde_json::from_str(json)
        .map_err(|e| RemoteGenerationError::MalformedResponse(e.to_string()))?;

    let records = collect_records(&value)?;

    let mut multiple_choice = Vec::new();
    let mut true_false = Vec::new();
    for (idx, (hint, record)) in records.into_iter().enumerate() {
        let question = coerce_record(record, hint, params, rng).map_err(|reason| {
            RemoteGenerationError::MalformedResponse(format!("record {}: {}", idx + 1, reason))
        })?;
        match question.kind {
            QuestionKind::MultipleChoice => multiple_choice.push(question),
            QuestionKind::TrueFalse => true_false.push(question),
        }
    }

    multiple_choice.truncate(params.mc_count);
    true_false.truncate(params.tf_count);
    multiple_choice.extend(true_false);

    if multiple_choice.is_empty() {
        return Err(RemoteGenerationError::Empty);
    }
    Ok(multiple_choice)
}

/// Prefers the body of a code fence, then falls back to scanning the
/// whole reply for brackets.
fn extract_json(raw: &str) -> Option<&str> {
    fenced_body(raw).and_then(bracketed).or_else(|| bracketed(raw))
}

/// Body of the first ``` fence, language tag dropped.
fn fenced_body(raw: &str) -> Option<&str> {
    let open = raw.find("```")?;
    let after = &raw[open + 3..];
    let body = &after[after.find('\n')? + 1..];
    let close = body.find("```")?;
    Some(&body[..close])
}

/// Slice from the first opening bracket to the last matching closer.
fn bracketed(text: &str) -> Option<&str> {
    let start = text.find(['[', '{'])?;
    let closer = if text[start..].starts_with('[') { ']' } else { '}' };
    let end = text.rfind(closer)?;
    (end > start).then(|| &text[start..=end])
}

fn collect_records(value: &JsonValue) -> RemoteResult<Vec<(Option<QuestionKind>, &JsonValue)>> {
    if let Some(arr) = value.as_array() {
        return Ok(arr.iter().map(|r| (None, r)).collect());
    }
    if let Some(arr) = value.get("questions").and_then(|q| q.as_array()) {
        return Ok(arr.iter().map(|r| (None, r)).collect());
    }

    let mc = value.get("multiple_choice").and_then(|q| q.as_array());
    let tf = value.get("true_false").and_then(|q| q.as_array());
    if mc.is_none() && tf.is_none() {
        return Err(RemoteGenerationError::MalformedResponse(
            "expected a JSON array of questions".to_string(),
        ));
    }

    let mut records = Vec::new();
    for r in mc.into_iter().flatten() {
        records.push((Some(QuestionKind::MultipleChoice), r));
    }
    for r in tf.into_iter().flatten() {
        records.push((Some(QuestionKind::TrueFalse), r));
    }
    Ok(records)
}

fn coerce_record<R: Rng + ?Sized>(
    v: &JsonValue,
    hint: Option<QuestionKind>,
    params: &GenerationParams,
    rng: &mut R,
) -> std::result::Result<CreateQuestion, String> {
    if !v.is_object() {
        return Err("not an object".to_string());
    }

    let prompt = ["question", "prompt", "statement"]
        .iter()
        .find_map(|k| v.get(*k).and_then(|s| s.as_str()))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or("missing question text")?;

    let answer = ["correct_answer", "answer", "correct_index"]
        .iter()
        .find_map(|k| v.get(*k))
        .ok_or("missing correct answer")?;

    let explanation = v
        .get("explanation")
        .and_then(|s| s.as_str())
        .map(|s| s.to_string());

    let kind = match hint {
        Some(kind) => kind,
        None => infer_kind(v, answer)?,
    };

    let draft = match kind {
        QuestionKind::MultipleChoice => {
            let raw_options: Vec<&str> = v
                .get("options")
                .and_then(|o| o.as_array())
                .ok_or("missing options")?
                .iter()
                .map(|o| o.as_str().map(str::trim))
                .collect::<Option<Vec<_>>>()
                .ok_or("options must be strings")?;
            let lettered = raw_options
                .iter()
                .enumerate()
                .all(|(i, o)| letter_prefix(o) == Some(i));
            let mut options: Vec<String> = raw_options
                .iter()
                .map(|&o| {
                    let text = if lettered { strip_letter_prefix(o) } else { o };
                    text.to_string()
                })
                .collect();
            if options.len() != MULTIPLE_CHOICE_OPTIONS {
                return Err(format!(
                    "expected {} options, got {}",
                    MULTIPLE_CHOICE_OPTIONS,
                    options.len()
                ));
            }

            let correct = resolve_option_index(answer, &options)?;
            let correct_option = options[correct].clone();
            options.shuffle(rng);
            let correct = options
                .iter()
                .position(|o| *o == correct_option)
                .unwrap_or_default();

            CreateQuestion::multiple_choice(prompt, options, correct, explanation, params.difficulty)
        }
        QuestionKind::TrueFalse => {
            let truth = resolve_truth(answer)?;
            CreateQuestion::true_false(prompt, truth, explanation, params.difficulty)
        }
    };

    let draft = draft.normalized();
    draft.validate().map_err(|e| e.to_string())?;
    Ok(draft)
}

fn infer_kind(v: &JsonValue, answer: &JsonValue) -> std::result::Result<QuestionKind, String> {
    if let Some(kind) = v.get("type").and_then(|t| t.as_str()) {
        return match kind.trim().to_lowercase().replace(['-', ' ', '/'], "_").as_str() {
            "multiple_choice" | "mc" | "mcq" => Ok(QuestionKind::MultipleChoice),
            "true_false" | "tf" | "boolean" => Ok(QuestionKind::TrueFalse),
            other => Err(format!("unknown question type '{}'", other)),
        };
    }

    let option_count = v.get("options").and_then(|o| o.as_array()).map(Vec::len);
    if option_count == Some(MULTIPLE_CHOICE_OPTIONS) {
        Ok(QuestionKind::MultipleChoice)
    } else if resolve_truth(answer).is_ok() && option_count.map_or(true, |n| n == 2) {
        Ok(QuestionKind::TrueFalse)
    } else {
        Err("cannot tell the question type".to_string())
    }
}

/// Accepts an index, a letter, "B) text" or the option text itself.
fn resolve_option_index(answer: &JsonValue, options: &[String]) -> std::result::Result<usize, String> {
    if let Some(idx) = answer.as_u64() {
        let idx = idx as usize;
        return if idx < options.len() {
            Ok(idx)
        } else {
            Err(format!("correct answer index {} out of range", idx))
        };
    }

    let text = answer.as_str().ok_or("correct answer must be an index or text")?.trim();
    let folded = text.to_lowercase();
    if let Some(idx) = options.iter().position(|o| o.trim().to_lowercase() == folded) {
        return Ok(idx);
    }
    if let Some(idx) = letter_index(text) {
        return Ok(idx);
    }
    if let Some(idx) = letter_prefix(text) {
        return Ok(idx);
    }
    let stripped = strip_letter_prefix(text).to_lowercase();
    options
        .iter()
        .position(|o| o.trim().to_lowercase() == stripped)
        .ok_or_else(|| format!("correct answer '{}' matches no option", text))
}

fn resolve_truth(answer: &JsonValue) -> std::result::Result<bool, String> {
    match answer {
        JsonValue::Bool(b) => Ok(*b),
        JsonValue::Number(n) => match n.as_u64() {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => Err("true/false answer index must be 0 or 1".to_string()),
        },
        JsonValue::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "t" => Ok(true),
            "false" | "f" => Ok(false),
            other => Err(format!("'{}' is not true or false", other)),
        },
        _ => Err("true/false answer must be a boolean".to_string()),
    }
}

fn letter_index(text: &str) -> Option<usize> {
    let mut chars = text.chars();
    let c = chars.next()?.to_ascii_uppercase();
    if chars.next().is_some() {
        return None;
    }
    OPTION_LETTERS.iter().position(|l| *l == c)
}

/// Index of a leading "A)" / "A." / "A:" marker, if any.
fn letter_prefix(text: &str) -> Option<usize> {
    let mut chars = text.chars();
    let letter = chars.next()?.to_ascii_uppercase();
    let marker = chars.next()?;
    if !matches!(marker, ')' | '.' | ':') {
        return None;
    }
    if !chars.next().map_or(true, char::is_whitespace) {
        return None;
    }
    OPTION_LETTERS.iter().position(|l| *l == letter)
}

fn strip_letter_prefix(text: &str) -> &str {
    let trimmed = text.trim();
    if letter_prefix(trimmed).is_some() {
        trimmed[2..].trim_start()
    } else {
        trimmed
    }
}
