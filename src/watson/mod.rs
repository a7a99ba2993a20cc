//! Outbound watsonx.ai integration.
//!
//! Each relay call fetches a bearer token from IBM Cloud IAM and then makes
//! exactly one request to the watsonx.ai instance.

mod client;
pub mod features;
pub mod token;
pub mod types;

pub use client::WatsonClient;
pub use features::{extract_features, FeatureVector, PatientData};
pub use token::{BearerToken, TokenProvider};
pub use types::{ChatMessage, ChatRequest, PredictionRequest, Role};
