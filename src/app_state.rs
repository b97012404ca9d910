//! Implements a struct that holds the state of the webhook server.

use std::sync::Arc;

use axum::extract::FromRef;

use crate::{firefly::FireflyClient, rewrite::RuleEngine, telegram::TelegramBot};

/// The state of the webhook server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The rules that fix transaction descriptions.
    pub rule_engine: Arc<RuleEngine>,

    /// The client for the Firefly III instance that sends the webhooks.
    pub firefly: FireflyClient,

    /// The bot that announces new transactions.
    pub telegram: TelegramBot,
}

impl AppState {
    /// Create a new [AppState].
    pub fn new(rule_engine: RuleEngine, firefly: FireflyClient, telegram: TelegramBot) -> Self {
        Self {
            rule_engine: Arc::new(rule_engine),
            firefly,
            telegram,
        }
    }
}

/// The state needed to process a new transaction.
#[derive(Debug, Clone)]
pub struct WebhookState {
    /// The rules that fix transaction descriptions.
    pub rule_engine: Arc<RuleEngine>,
    /// Where the fixed transactions are saved.
    pub firefly: FireflyClient,
    /// Where new transactions are announced.
    pub telegram: TelegramBot,
}

impl FromRef<AppState> for WebhookState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            rule_engine: state.rule_engine.clone(),
            firefly: state.firefly.clone(),
            telegram: state.telegram.clone(),
        }
    }
}
