use std::time::Duration;

use docqa_core::config::GeneratorSettings;
use docqa_core::{Error, Generator, Result};
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::debug;

use crate::build_prompt;

/// Non-streaming client for an Ollama server's `/api/generate` endpoint.
pub struct OllamaGenerator {
    model: String,
    base_url: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaGenerator {
    pub fn new(settings: &GeneratorSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| Error::Generation(format!("http client: {e}")))?;
        Ok(Self {
            model: settings.model.clone(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

impl Generator for OllamaGenerator {
    fn name(&self) -> &str {
        "ollama"
    }

    fn generate(&self, query: &str, context: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "prompt": build_prompt(query, context),
            "stream": false,
        });
        debug!(%url, model = %self.model, "requesting completion");

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| Error::Generation(format!("ollama request failed: {e}")))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let txt = resp.text().unwrap_or_default();
            return Err(Error::Generation(format!("ollama error {status}: {txt}")));
        }
        let parsed: GenerateResponse = resp
            .json()
            .map_err(|e| Error::Generation(format!("unexpected ollama response: {e}")))?;
        Ok(parsed.response.trim().to_string())
    }
}
