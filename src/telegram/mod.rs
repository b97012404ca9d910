//! The Telegram bot that notifies about new transactions and lets the user
//! pick a category for them.

mod api;
mod callback;
mod notification;

use std::time::Duration;

pub use api::{CallbackQuery, Message, POLL_TIMEOUT, TELEGRAM_API_URL, TelegramClient, Update};
pub use callback::{CallbackAction, CallbackParseError};
pub use notification::{category_keyboard, error_message, start_message, transaction_message};

use crate::{
    Error,
    firefly::{Category, FireflyClient, Transaction, TransactionId},
};

const START_COMMAND: &str = "/start";
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Sends notifications to, and handles button presses from, a single chat.
#[derive(Debug, Clone)]
pub struct TelegramBot {
    api: TelegramClient,
    chat_id: i64,
}

impl TelegramBot {
    /// Create a bot that talks to the chat with `chat_id`.
    pub fn new(api: TelegramClient, chat_id: i64) -> Self {
        Self { api, chat_id }
    }

    /// The chat the bot sends notifications to.
    pub fn chat_id(&self) -> i64 {
        self.chat_id
    }

    /// Announce `transaction` with a keyboard for picking one of `categories`.
    ///
    /// Transactions without splits are not announced.
    ///
    /// # Errors
    /// Returns an error if the message could not be sent.
    pub async fn notify_new_transaction(
        &self,
        transaction: &Transaction,
        transaction_url: &str,
        categories: &[Category],
    ) -> Result<(), Error> {
        if transaction.splits.is_empty() {
            tracing::warn!(
                "Transaction #{} has no splits, not sending a notification",
                transaction.id
            );
            return Ok(());
        }

        let text = transaction_message(transaction, transaction_url);
        let keyboard = category_keyboard(transaction.id, categories);
        self.api
            .send_message(self.chat_id, &text, Some(&keyboard))
            .await?;

        Ok(())
    }

    /// Report a failed job to the chat.
    ///
    /// # Errors
    /// Returns an error if the message could not be sent.
    pub async fn notify_error(&self, error: &Error) -> Result<(), Error> {
        self.api
            .send_message(self.chat_id, &error_message(&error.to_string()), None)
            .await?;

        Ok(())
    }

    /// Long poll for updates and handle them until the task is cancelled.
    pub async fn listen(self, firefly: FireflyClient) {
        tracing::info!("Listening for Telegram updates for chat {}", self.chat_id);
        let mut offset = 0;

        loop {
            match self.api.get_updates(offset, POLL_TIMEOUT).await {
                Ok(updates) => {
                    for update in updates {
                        offset = offset.max(update.update_id + 1);
                        self.handle_update(update, &firefly).await;
                    }
                }
                Err(error) => {
                    tracing::warn!("Could not get Telegram updates: {error}");
                    tokio::time::sleep(RETRY_DELAY).await;
                }
            }
        }
    }

    /// Handle a single update. Errors are logged.
    pub async fn handle_update(&self, update: Update, firefly: &FireflyClient) {
        let result = if let Some(callback) = update.callback_query {
            self.handle_callback(callback, firefly).await
        } else if let Some(message) = update.message {
            self.handle_message(message).await
        } else {
            Ok(())
        };

        if let Err(error) = result {
            tracing::error!("Could not handle Telegram update {}: {error}", update.update_id);
        }
    }

    async fn handle_message(&self, message: Message) -> Result<(), Error> {
        let is_start = message
            .text
            .as_deref()
            .and_then(|text| text.split_whitespace().next())
            .is_some_and(|command| command == START_COMMAND);
        if !is_start {
            return Ok(());
        }

        let first_name = message.chat.first_name.as_deref().unwrap_or_default();
        self.api
            .send_message(message.chat.id, &start_message(first_name, self.chat_id), None)
            .await?;

        Ok(())
    }

    async fn handle_callback(
        &self,
        callback: CallbackQuery,
        firefly: &FireflyClient,
    ) -> Result<(), Error> {
        let Some(message) = callback.message else {
            tracing::warn!("Ignoring callback {} without a message", callback.id);
            return Ok(());
        };
        if message.chat.id != self.chat_id {
            tracing::warn!("Ignoring callback from unknown chat {}", message.chat.id);
            return Ok(());
        }

        let data = callback.data.unwrap_or_default();
        let answer = match data.parse::<CallbackAction>() {
            Ok(CallbackAction::Done { transaction_id }) => {
                tracing::info!("Transaction #{transaction_id} confirmed");
                self.api
                    .remove_reply_markup(message.chat.id, message.message_id)
                    .await?;
                String::new()
            }
            Ok(CallbackAction::SetCategory {
                transaction_id,
                category_id,
            }) => {
                self.set_category(transaction_id, &category_id, &message, firefly)
                    .await?
            }
            Err(CallbackParseError::Unknown(data)) => {
                tracing::warn!("Ignoring unknown callback data {data:?}");
                String::new()
            }
            Err(error) => error.to_string(),
        };

        self.api.answer_callback_query(&callback.id, &answer).await
    }

    /// Set the category and show the updated transaction. Returns the text
    /// to answer the button press with.
    async fn set_category(
        &self,
        transaction_id: TransactionId,
        category_id: &str,
        message: &Message,
        firefly: &FireflyClient,
    ) -> Result<String, Error> {
        let transaction = match firefly
            .set_transaction_category(transaction_id, category_id)
            .await
        {
            Ok(transaction) => transaction,
            Err(error) => {
                tracing::error!("Could not set category of transaction #{transaction_id}: {error}");
                return Ok(format!("Update fehlgeschlagen: {error}"));
            }
        };

        let Some(category_name) = transaction
            .splits
            .first()
            .map(|split| split.category_name.clone())
        else {
            return Ok("Update fehlgeschlagen: ungültiger Rückgabewert vom Server".to_owned());
        };

        tracing::info!("Set category of transaction #{transaction_id} to {category_name:?}");
        let text = transaction_message(&transaction, &firefly.transaction_url(transaction_id));
        self.api
            .edit_message_text(message.chat.id, message.message_id, &text)
            .await?;

        Ok(format!("Kategorie gesetzt auf {category_name}"))
    }
}
