//! The API handler: one route, one constant answer.
//!
//! ```text
//! GET /      → 200 {"message":"Hello, World!"}
//! GET /other → 404
//! POST /     → 405
//! ```
//!
//! On Lambda the binary runs behind the Lambda Web Adapter layer, which
//! forwards invocations to this server as plain HTTP on `$PORT`.

pub mod config;

use axum::{Json, Router, routing::get};
use serde::{Deserialize, Serialize};

pub use config::{ConfigError, ServerConfig};

/// The greeting every `GET /` answers with.
pub const GREETING: &str = "Hello, World!";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub message: String,
}

/// `GET /`
pub async fn hello() -> Json<Message> {
    Json(Message {
        message: GREETING.to_owned(),
    })
}

/// Routes of the API. Unknown paths fall through to axum's 404, other
/// methods on `/` to its 405.
pub fn router() -> Router {
    Router::new().route("/", get(hello))
}
