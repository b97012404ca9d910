//! Firefly Fix is a companion service for a self-hosted Firefly III instance.
//!
//! It receives Firefly III's webhook for new transactions, fixes descriptions
//! that banks export in an unreadable format, announces every new transaction
//! in a Telegram chat with buttons for picking its category, and triggers the
//! Firefly III Data Importer on a cron schedule.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum_server::Handle;
use tokio::signal;

mod app_state;
mod autoimport;
mod config;
mod endpoints;
mod error;
mod firefly;
mod healthcheck;
mod logging;
mod rewrite;
mod routing;
mod scheduler;
mod telegram;
mod webhook;

#[cfg(test)]
mod test_utils;

pub use app_state::AppState;
pub use autoimport::ImportRunner;
pub use config::Config;
pub use endpoints::WEBHOOK;
pub use error::Error;
pub use firefly::{FireflyClient, WebhookAttributes};
pub use healthcheck::HealthCheck;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use rewrite::{Rule, RuleEngine, RuleError, TransactionSplitUpdate};
pub use routing::build_router;
pub use scheduler::{Scheduler, parse_schedule};
pub use telegram::{TELEGRAM_API_URL, TelegramBot, TelegramClient};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for the ctrl+c signal: {error}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!("Failed to install the terminate signal handler: {error}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}
