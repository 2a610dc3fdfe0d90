//! # rentchat-server
//!
//! HTTP front for the rental marketplace chat.
//!
//! This binary provides:
//! - **Thread and message procedures** (`threads.list`, `messages.send`, …)
//!   polled by the mobile client
//! - **Typing presence** with a background task that forgets idle entries
//! - A choice of **in-memory** or **SQLite** storage

mod api;
mod config;
mod error;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use rentchat_store::seed;
use rentchat_store::{ChatBackend, ChatService, MemoryBackend, SqliteBackend, SqliteLocation};

use crate::api::AppState;
use crate::config::{BackendKind, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,rentchat_server=debug,rentchat_store=debug")
        }))
        .init();

    info!("Starting rentchat server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Open the store
    // -----------------------------------------------------------------------
    let backend: Arc<dyn ChatBackend> = match config.backend {
        BackendKind::Memory => Arc::new(MemoryBackend::new()),
        BackendKind::Sqlite => {
            let location = match &config.database_path {
                Some(path) => SqliteLocation::File(path.clone()),
                None => SqliteLocation::Default,
            };
            Arc::new(SqliteBackend::new(location))
        }
    };

    let chat = Arc::new(
        ChatService::new(backend).with_typing_stale_after(config.typing_stale_after),
    );
    chat.init()?;

    if config.seed_demo_data {
        seed::seed_if_empty(chat.backend(), chat.now())?;
    }

    let app_state = AppState {
        chat: chat.clone(),
        config: Arc::new(config.clone()),
    };

    // -----------------------------------------------------------------------
    // 4. Spawn background tasks
    // -----------------------------------------------------------------------

    // Periodic typing presence cleanup (every minute)
    let purge_chat = chat.clone();
    let purge_after = config.typing_purge_after;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(60));
        loop {
            interval.tick().await;
            let removed = purge_chat.purge_typing(purge_after);
            if removed > 0 {
                tracing::debug!(removed, "Purged idle typing entries");
            }
        }
    });

    // -----------------------------------------------------------------------
    // 5. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, config.http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                chat.close()?;
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    chat.close()?;
    Ok(())
}
