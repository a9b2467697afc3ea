use crate::dto::quiz_dto::CreateQuestion;
use crate::error::{Error, RemoteGenerationError, Result};
use crate::models::quiz_session::{GenerationParams, GenerationSource};
use crate::services::ai_service::RemoteGenerator;
use crate::services::synth_service::LocalSynthesizer;
use serde::Serialize;

#[derive(Clone, Debug, Serialize)]
pub struct GenerationOutput {
    pub questions: Vec<CreateQuestion>,
    pub source: GenerationSource,
    pub logs: Vec<String>,
}

/// Remote generation first, local synthesis on any remote failure.
#[derive(Clone)]
pub struct QuizService {
    remote: RemoteGenerator,
    local: LocalSynthesizer,
    max_per_kind: usize,
}

impl QuizService {
    pub fn new(remote: RemoteGenerator, local: LocalSynthesizer, max_per_kind: usize) -> Self {
        Self {
            remote,
            local,
            max_per_kind,
        }
    }

    pub fn remote(&self) -> &RemoteGenerator {
        &self.remote
    }

    pub async fn generate(&self, text: &str, params: &GenerationParams) -> Result<GenerationOutput> {
        let mut logs: Vec<String> = vec![];
        let params = self.capped(params, &mut logs);
        logs.push(format!(
            "Requested {} multiple choice and {} true/false questions at {} difficulty.",
            params.mc_count,
            params.tf_count,
            params.difficulty.as_str()
        ));

        if self.remote.is_configured() {
            logs.push(format!("Sending request to {}...", self.remote.model()));
            let timeout = self.remote.timeout();
            let attempt = tokio::time::timeout(timeout, self.remote.generate_remote(text, &params))
                .await
                .unwrap_or(Err(RemoteGenerationError::Timeout(timeout.as_secs())));

            match attempt {
                Ok(questions) => {
                    logs.push(format!("Remote model returned {} questions.", questions.len()));
                    tracing::info!(count = questions.len(), "Remote generation succeeded");
                    return Ok(GenerationOutput {
                        questions,
                        source: GenerationSource::Remote,
                        logs,
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Remote generation failed, falling back to local synthesis");
                    logs.push(format!("Remote generation failed: {}. Falling back to local synthesis.", e));
                }
            }
        } else {
            logs.push("No API credential configured. Using local synthesis.".to_string());
        }

        let local = self.local.clone();
        let owned_text = text.to_string();
        let local_params = params.clone();
        let questions = tokio::task::spawn_blocking(move || {
            local.generate_local(&owned_text, &local_params, &mut rand::thread_rng())
        })
        .await
        .map_err(|e| Error::Internal(format!("Local synthesis task failed: {}", e)))?;

        if questions.is_empty() {
            return Err(Error::InsufficientContent(
                "The content doesn't have enough complete sentences or key terms to build questions. Try a longer or more detailed text.".to_string(),
            ));
        }

        logs.push(format!("Local synthesis produced {} questions.", questions.len()));
        Ok(GenerationOutput {
            questions,
            source: GenerationSource::Local,
            logs,
        })
    }

    fn capped(&self, params: &GenerationParams, logs: &mut Vec<String>) -> GenerationParams {
        let mut capped = params.clone();
        if capped.mc_count > self.max_per_kind || capped.tf_count > self.max_per_kind {
            logs.push(format!("Counts capped at {} per question type.", self.max_per_kind));
            capped.mc_count = capped.mc_count.min(self.max_per_kind);
            capped.tf_count = capped.tf_count.min(self.max_per_kind);
        }
        capped
    }
}
