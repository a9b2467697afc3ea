pub mod config;
pub mod dto;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

use crate::config::Config;
use crate::error::Result;
use crate::services::{
    ai_service::RemoteGenerator, extract_service::ExtractService, quiz_service::QuizService,
    session_service::SessionService, synth_service::LocalSynthesizer,
};
use reqwest::Client;

#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionService,
    pub extract_service: ExtractService,
    pub quiz_service: QuizService,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.remote_timeout_secs.max(1) + 5))
            .build()?;

        let remote = RemoteGenerator::from_config(config, http_client);
        Ok(Self::with_remote(config, remote))
    }

    /// Same wiring with a caller-supplied remote generator.
    pub fn with_remote(config: &Config, remote: RemoteGenerator) -> Self {
        if !remote.is_configured() {
            tracing::info!("No remote credential configured; quizzes will be generated locally");
        }

        Self {
            sessions: SessionService::new(config.session_ttl()),
            extract_service: ExtractService::new(config.min_content_length),
            quiz_service: QuizService::new(
                remote,
                LocalSynthesizer::new(),
                config.max_questions_per_kind,
            ),
        }
    }
}
