//! watsonx.ai request and response types.

use serde::{Deserialize, Serialize};

use super::features::FeatureVector;
use crate::error::{Error, Result};

/// System prompt sent ahead of every chat message.
pub const SYSTEM_PROMPT: &str = "You always answer the questions with markdown formatting using GitHub syntax. \
The markdown formatting you support: headings, bold, italic, links, tables, lists, code blocks, and blockquotes. \
You must omit that you answer the questions with markdown.\n\n\
Any HTML tags must be wrapped in block quotes, for example ```<html>```. \
You will be penalized for not rendering code in block quotes.\n\n\
When returning code blocks, specify language.\n\n\
You are a helpful, respectful and honest assistant. Always answer as helpfully as possible, while being safe.\n\
Your answers should not include any harmful, unethical, racist, sexist, toxic, dangerous, or illegal content. \
Please ensure that your responses are socially unbiased and positive in nature.\n\n\
If a question does not make any sense, or is not factually coherent, explain why instead of answering something not correct. \
If you don't know the answer to a question, please don't share false information.";

const MAX_TOKENS: u32 = 2000;

/// Role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// A chat message.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// Body of `POST /ml/v1/text/chat`.
///
/// Generation parameters are fixed: greedy decoding with no penalties.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    pub model_id: String,
    pub frequency_penalty: u32,
    pub max_tokens: u32,
    pub presence_penalty: u32,
    pub temperature: u32,
    pub top_p: u32,
}

impl ChatRequest {
    /// Fresh two-message conversation: system prompt, then the user message.
    pub fn new(user_message: &str, project_id: Option<String>, model_id: String) -> Self {
        Self {
            messages: vec![
                ChatMessage {
                    role: Role::System,
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: Role::User,
                    content: user_message.to_string(),
                },
            ],
            project_id,
            model_id,
            frequency_penalty: 0,
            max_tokens: MAX_TOKENS,
            presence_penalty: 0,
            temperature: 0,
            top_p: 1,
        }
    }
}

/// Body of `POST /ml/v4/deployments/{id}/predictions`.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionRequest {
    pub input_data: Vec<InputData>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InputData {
    pub fields: Vec<String>,
    pub values: Vec<FeatureVector>,
}

impl PredictionRequest {
    /// Single-row scoring payload.
    pub fn single(fields: Vec<String>, features: FeatureVector) -> Self {
        Self {
            input_data: vec![InputData {
                fields,
                values: vec![features],
            }],
        }
    }
}

/// IAM token response (subset of fields we need).
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Lifetime in seconds
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// Pull the scalar at `predictions[0].values[0][0]` out of a scoring response.
pub fn extract_prediction(response: &serde_json::Value) -> Result<serde_json::Value> {
    let missing = |path: &str| {
        Error::ResponseShape(format!("prediction response is missing '{}'", path))
    };

    let predictions = response.get("predictions").ok_or_else(|| missing("predictions"))?;
    let first = predictions.get(0).ok_or_else(|| missing("predictions[0]"))?;
    let values = first
        .get("values")
        .ok_or_else(|| missing("predictions[0].values"))?;
    let row = values
        .get(0)
        .ok_or_else(|| missing("predictions[0].values[0]"))?;
    let scalar = row
        .get(0)
        .ok_or_else(|| missing("predictions[0].values[0][0]"))?;

    Ok(scalar.clone())
}
