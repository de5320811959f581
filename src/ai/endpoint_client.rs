// src/ai/endpoint_client.rs
use log::{info, warn};
use reqwest::blocking::Client;
use serde::Serialize;
use serde_json::Value;

use super::connector::{InferenceConnector, PredictRequest};
use crate::capture::ByteSequence;
use crate::config::ServiceConfig;
use crate::error::{AssistError, Result, ValidationReason};

// Implementation for the COVA prediction services; one instance per deployment
pub struct EndpointClient {
    config: ServiceConfig,
    client: Client,
}

#[derive(Serialize)]
struct PredictBody<'a> {
    image_bytes: &'a ByteSequence,
    #[serde(skip_serializing_if = "Option::is_none")]
    question: Option<&'a str>,
}

impl EndpointClient {
    pub fn new(config: ServiceConfig) -> Result<Self> {
        info!("Initializing {} endpoint client at {}", config.name, config.base_url);

        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| AssistError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    fn body_for<'a>(request: &PredictRequest<'a>) -> Result<PredictBody<'a>> {
        // Blank optional questions are dropped rather than sent
        let question = request
            .question
            .filter(|q| request.mode.accepts_question() && !q.trim().is_empty());

        if request.mode.requires_question() && question.is_none() {
            return Err(AssistError::Validation(ValidationReason::MissingQuestion));
        }

        Ok(PredictBody {
            image_bytes: request.image,
            question,
        })
    }
}

impl InferenceConnector for EndpointClient {
    fn predict(&self, request: &PredictRequest<'_>) -> Result<Value> {
        let url = self.config.url_for(request.mode).ok_or_else(|| {
            warn!("{} deployment has no endpoint for {} mode", self.config.name, request.mode);
            AssistError::Validation(ValidationReason::UnsupportedMode)
        })?;
        let body = Self::body_for(request)?;

        info!(
            "Sending {} request ({} bytes) to {}",
            request.mode,
            request.image.len(),
            url
        );

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(AssistError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(AssistError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().map_err(AssistError::from_transport)?;
        let payload: Value = serde_json::from_str(&text)?;

        info!("{} request to {} succeeded ({})", request.mode, self.config.name, status);
        Ok(payload)
    }
}
