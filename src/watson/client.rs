//! Chat and prediction relays to watsonx.ai.

use reqwest::{header, Client};
use serde::Serialize;

use super::features::{extract_features, PatientData};
use super::token::{BearerToken, TokenProvider};
use super::types::{extract_prediction, ChatRequest, PredictionRequest};
use crate::config::Config;
use crate::error::{Error, Result};

const CHAT_API_VERSION: &str = "2023-05-29";
const PREDICTION_API_VERSION: &str = "2021-10-01";

/// Outbound side of the relay: one token fetch, then one watsonx.ai call.
pub struct WatsonClient {
    http_client: Client,
    tokens: TokenProvider,
    base_url: String,
    project_id: Option<String>,
    model_id: String,
    deployment_id: Option<String>,
    fields: Vec<String>,
}

impl WatsonClient {
    pub fn new(http_client: Client, config: &Config) -> Self {
        let watson = &config.watson;
        Self {
            tokens: TokenProvider::new(http_client.clone(), watson),
            http_client,
            base_url: watson.base_url().to_string(),
            project_id: watson.project_id.clone(),
            model_id: watson.model_id.clone(),
            deployment_id: watson.deployment_id.clone(),
            fields: config.prediction.fields.clone(),
        }
    }

    pub fn chat_url(&self) -> String {
        format!("{}/ml/v1/text/chat?version={}", self.base_url, CHAT_API_VERSION)
    }

    /// Scoring endpoint, or `None` when no deployment is configured.
    pub fn prediction_url(&self) -> Option<String> {
        self.deployment_id.as_ref().map(|id| {
            format!(
                "{}/ml/v4/deployments/{}/predictions?version={}",
                self.base_url, id, PREDICTION_API_VERSION
            )
        })
    }

    /// Relay a single user message and return the completion body verbatim.
    pub async fn chat(&self, user_message: &str) -> Result<serde_json::Value> {
        if user_message.is_empty() {
            return Err(Error::Validation("No message provided".to_string()));
        }

        let token = self.tokens.get_token().await?;
        let request = ChatRequest::new(user_message, self.project_id.clone(), self.model_id.clone());

        self.post_json(&self.chat_url(), &token, &request).await
    }

    /// Score symptoms and patient data, returning the predicted scalar.
    pub async fn predict(
        &self,
        symptoms: &str,
        patient: &PatientData,
    ) -> Result<serde_json::Value> {
        if symptoms.is_empty() {
            return Err(Error::Validation("No symptoms provided".to_string()));
        }

        let features = extract_features(symptoms, patient);
        tracing::debug!(features = ?features.as_f64(), "Extracted features");

        let url = self.prediction_url().ok_or_else(|| {
            Error::Upstream("no deployment id is configured for predictions".to_string())
        })?;

        let token = self.tokens.get_token().await?;
        let request = PredictionRequest::single(self.fields.clone(), features);
        let response = self.post_json(&url, &token, &request).await?;

        extract_prediction(&response).inspect_err(|e| {
            tracing::error!(error = %e, "Prediction response did not match expected shape");
        })
    }

    async fn post_json<B: Serialize>(
        &self,
        url: &str,
        token: &BearerToken,
        body: &B,
    ) -> Result<serde_json::Value> {
        tracing::debug!(url = %url, "Forwarding to watsonx.ai");

        let response = self
            .http_client
            .post(url)
            .header(header::ACCEPT, "application/json")
            .header(header::AUTHORIZATION, token.authorization())
            .json(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, url = %url, "Failed to reach watsonx.ai");
                Error::Upstream(format!("failed to reach {}: {}", url, e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, url = %url, body = %body, "watsonx.ai returned error");
            return Err(Error::Upstream(format!("{} returned {}: {}", url, status, body)));
        }

        response.json().await.map_err(|e| {
            tracing::error!(error = %e, url = %url, "Failed to parse watsonx.ai response");
            Error::Upstream(format!("failed to parse response from {}: {}", url, e))
        })
    }
}
