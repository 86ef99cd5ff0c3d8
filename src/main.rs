//! DSA Companion · practice backend
//!
//! - Axum JSON API: accounts, problem CRUD, AI-assisted study endpoints
//! - SQLite persistence with embedded migrations
//! - Optional OpenAI-compatible model provider (via environment variables)
//!
//! Important env variables (see `config::Settings::from_env` for the full list):
//!   SERVER_PORT / PORT  : u16 (default 5001)
//!   DATABASE_PATH       : SQLite file (default "data/dsa_companion.db")
//!   JWT_SECRET          : session signing key
//!   OPENAI_API_KEY      : enables the AI endpoints if present
//!   PROMPTS_CONFIG_PATH : TOML prompt overrides
//!   LOG_LEVEL           : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT          : "pretty" (default) or "json"

mod auth;
mod config;
mod db;
mod domain;
mod error;
mod gateway;
mod judge;
mod openai;
mod protocol;
mod routes;
mod state;
mod telemetry;
mod util;

#[cfg(test)]
mod test_utils;

use std::{net::SocketAddr, sync::Arc};

use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::config::{Settings, DEFAULT_MODEL};
use crate::openai::{ChatModel, OpenAI, Unconfigured};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  // .env is optional; real environment variables win.
  let dotenv = dotenvy::dotenv();
  telemetry::init_tracing();
  if let Ok(path) = dotenv {
    info!(target: "dsa_companion", path = %path.display(), "Loaded .env");
  }

  let settings = Settings::from_env();
  let pool = db::connect(&settings.database_path).await?;

  let model: Arc<dyn ChatModel> = match &settings.openai {
    Some(oa) => {
      info!(target: "dsa_companion", model = %oa.model, base_url = %oa.base_url, "Model provider enabled");
      Arc::new(OpenAI::new(oa)?)
    }
    None => {
      warn!(target: "dsa_companion", "OPENAI_API_KEY not set; AI endpoints will fail until it is configured");
      Arc::new(Unconfigured)
    }
  };
  let model_name = settings.openai.as_ref().map_or_else(|| DEFAULT_MODEL.to_string(), |oa| oa.model.clone());

  let state = Arc::new(AppState::new(pool.clone(), model, model_name, settings.prompts, settings.auth));
  let app = build_router(state);

  let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
  let listener = TcpListener::bind(addr).await?;
  info!(target: "dsa_companion", %addr, "HTTP server listening");

  axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

  pool.close().await;
  info!(target: "dsa_companion", "Server stopped");
  Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
  let ctrl_c = async {
    if let Err(e) = tokio::signal::ctrl_c().await {
      error!(target: "dsa_companion", error = %e, "Failed to listen for Ctrl+C");
      std::future::pending::<()>().await;
    }
  };

  #[cfg(unix)]
  let terminate = async {
    match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
      Ok(mut sig) => {
        sig.recv().await;
      }
      Err(e) => {
        error!(target: "dsa_companion", error = %e, "Failed to install SIGTERM handler");
        std::future::pending::<()>().await;
      }
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    _ = ctrl_c => info!(target: "dsa_companion", "Received Ctrl+C, shutting down gracefully"),
    _ = terminate => info!(target: "dsa_companion", "Received SIGTERM, shutting down gracefully"),
  }
}
