//! Inbound HTTP surface.
//!
//! Exposes `/chat` and `/predict`, forwarding each to watsonx.ai through
//! [`crate::watson::WatsonClient`].

mod handlers;
mod server;

pub use handlers::{ChatBody, PredictBody};
pub use server::{build_http_client, create_router, run_server, AppState};
