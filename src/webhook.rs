//! The endpoint that Firefly III calls whenever a transaction is stored.

use axum::{Json, extract::State, http::StatusCode};

use crate::{
    Error,
    app_state::WebhookState,
    firefly::{Transaction, models::WebhookMessage},
};

/// A route handler for new transactions.
///
/// Fixes the descriptions of the transaction's splits, saves them if any rule
/// applied, and announces the transaction in the Telegram chat. Failures
/// after the payload was accepted are logged and still answered with 200 so
/// that Firefly III does not disable the webhook.
pub async fn receive_transaction_webhook(
    State(state): State<WebhookState>,
    Json(message): Json<WebhookMessage>,
) -> Result<StatusCode, Error> {
    if message.version.is_empty() {
        return Err(Error::InvalidWebhookPayload(
            "the version field is missing or empty".to_owned(),
        ));
    }

    let transaction_id = message.content.id;
    tracing::info!("Received webhook for transaction #{transaction_id}");

    if let Err(error) = process_transaction(&state, message.content.into()).await {
        tracing::error!("Could not process transaction #{transaction_id}: {error}");
    }

    Ok(StatusCode::OK)
}

/// A route handler that lets the server check that its public webhook URL
/// reaches it.
pub async fn get_webhook() -> StatusCode {
    StatusCode::OK
}

async fn process_transaction(state: &WebhookState, transaction: Transaction) -> Result<(), Error> {
    let updates: Vec<_> = transaction
        .splits
        .iter()
        .filter_map(|split| {
            state
                .rule_engine
                .process(split.transaction_journal_id, &split.description)
        })
        .collect();

    let transaction = if updates.is_empty() {
        tracing::info!("No rule applied to transaction #{}", transaction.id);
        transaction
    } else {
        state
            .firefly
            .update_transaction(transaction.id, updates)
            .await?
    };

    let categories = state.firefly.list_categories().await.unwrap_or_else(|error| {
        tracing::warn!("Could not list categories, sending notification without them: {error}");
        Vec::new()
    });

    state
        .telegram
        .notify_new_transaction(
            &transaction,
            &state.firefly.transaction_url(transaction.id),
            &categories,
        )
        .await
}
