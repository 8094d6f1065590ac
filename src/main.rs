//! MCQ Generator · backend
//!
//! - Axum HTTP API behind a single static form (./static/index.html)
//! - Upload a text file, generate multiple-choice questions with an OpenAI-compatible
//!   chat-completion endpoint, then review them question by question
//!
//! Important env variables (a `.env` file in the working directory is honored):
//!   PORT                : u16 (default 3000)
//!   OPENAI_API_KEY      : credential for the completion endpoint
//!   OPENAI_BASE_URL     : default "https://api.openai.com/v1"
//!   OPENAI_MODEL        : default "gpt-3.5-turbo"
//!   OPENAI_TIMEOUT_SECS : optional request timeout (unset = client default)
//!   AGENT_CONFIG_PATH   : path to TOML config (prompt template + completion tuning)
//!   LOG_LEVEL           : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT          : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod config;
mod error;
mod prompt;
mod parser;
mod openai;
mod state;
mod protocol;
mod logic;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  // Missing .env is fine; real env vars still apply.
  let dotenv_result = dotenv::dotenv();

  telemetry::init_tracing();
  if let Err(e) = dotenv_result {
    if !e.not_found() {
      warn!(target: "mcqgen_backend", error = %e, "Failed to load .env file");
    }
  }

  let state = Arc::new(AppState::new());
  let app = build_router(state);

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "mcqgen_backend", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    warn!(target: "mcqgen_backend", error = %e, "Failed to listen for shutdown signal");
    std::future::pending::<()>().await;
  }
  info!(target: "mcqgen_backend", "Shutdown signal received");
}
