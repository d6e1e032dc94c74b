//! HTTP client for the AI tagging gateway

use crate::error::{UploadError, UploadResult};
use crate::models::{ClassificationRequest, Enrichment};
use crate::remote::PhotoClassifier;
use async_trait::async_trait;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

pub struct HttpPhotoClassifier {
    config: ClassifierConfig,
    http_client: reqwest::Client,
}

impl HttpPhotoClassifier {
    pub fn new(config: ClassifierConfig) -> UploadResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| UploadError::Other(format!("HTTP client error: {}", e)))?;
        Ok(Self {
            config,
            http_client,
        })
    }
}

#[async_trait]
impl PhotoClassifier for HttpPhotoClassifier {
    async fn classify(&self, request: &ClassificationRequest) -> UploadResult<Enrichment> {
        let mut builder = self.http_client.post(&self.config.endpoint).json(request);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| UploadError::Enrichment(format!("Classifier request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| UploadError::Enrichment(format!("Classifier body unreadable: {}", e)))?;

        if !status.is_success() {
            return Err(UploadError::Enrichment(format!(
                "Classifier returned {} - {}",
                status, body
            )));
        }

        Enrichment::from_model_output(&body)
    }
}
