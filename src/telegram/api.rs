//! A minimal client for the Telegram Bot API.

use std::time::Duration;

use serde::{Deserialize, Serialize, de::DeserializeOwned, de::IgnoredAny};
use serde_json::json;

use crate::Error;

/// The public Telegram Bot API server.
pub const TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// How long a `getUpdates` call waits for new updates.
pub const POLL_TIMEOUT: Duration = Duration::from_secs(10);

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// An incoming update.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    /// Increases with every update, used as the `getUpdates` offset.
    pub update_id: i64,
    /// A new message sent to the bot.
    #[serde(default)]
    pub message: Option<Message>,
    /// A button press.
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

/// A message in a chat.
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    /// Unique within its chat.
    pub message_id: i64,
    /// The chat the message was sent in.
    pub chat: Chat,
    /// The text of a text message.
    #[serde(default)]
    pub text: Option<String>,
}

/// A private chat, group or channel.
#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    /// The chat ID, negative for groups.
    pub id: i64,
    /// The first name of the other party in a private chat.
    #[serde(default)]
    pub first_name: Option<String>,
}

/// Sent when a user presses an inline keyboard button.
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    /// Passed to `answerCallbackQuery`.
    pub id: String,
    /// The message the button belongs to, if it is not too old.
    #[serde(default)]
    pub message: Option<Message>,
    /// The callback data of the pressed button.
    #[serde(default)]
    pub data: Option<String>,
}

/// Buttons shown below a message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InlineKeyboardMarkup {
    /// Rows of buttons, top to bottom.
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

/// A button that sends callback data to the bot when pressed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineKeyboardButton {
    /// The button label.
    pub text: String,
    /// Sent back in [CallbackQuery::data], at most 64 bytes.
    pub callback_data: String,
}

#[derive(Debug, Deserialize)]
struct TelegramResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

/// A client for one bot.
#[derive(Debug, Clone)]
pub struct TelegramClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl TelegramClient {
    /// Create a client for the bot with `token`, talking to the API server at `base_url`.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str, token: &str) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(POLL_TIMEOUT + REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            token: token.to_owned(),
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<T, Error> {
        let response = self
            .client
            .post(format!("{}/bot{}/{method}", self.base_url, self.token))
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(Error::UnexpectedStatus { status, body });
        }

        let response: TelegramResponse<T> = serde_json::from_str(&body)?;
        match response {
            TelegramResponse {
                ok: true,
                result: Some(result),
                ..
            } => Ok(result),
            TelegramResponse { description, .. } => Err(Error::UnexpectedStatus {
                status,
                body: description.unwrap_or(body),
            }),
        }
    }

    /// Send an HTML formatted message, optionally with inline buttons.
    ///
    /// # Errors
    /// Returns an error if the request fails.
    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_markup: Option<&InlineKeyboardMarkup>,
    ) -> Result<Message, Error> {
        let mut body = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "HTML",
        });
        if let Some(markup) = reply_markup {
            body["reply_markup"] = serde_json::to_value(markup)?;
        }

        self.call("sendMessage", body).await
    }

    /// Replace the text of a message. Inline buttons are removed.
    ///
    /// # Errors
    /// Returns an error if the request fails.
    pub async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
    ) -> Result<(), Error> {
        let _: IgnoredAny = self
            .call(
                "editMessageText",
                json!({
                    "chat_id": chat_id,
                    "message_id": message_id,
                    "text": text,
                    "parse_mode": "HTML",
                }),
            )
            .await?;

        Ok(())
    }

    /// Remove the inline buttons of a message.
    ///
    /// # Errors
    /// Returns an error if the request fails.
    pub async fn remove_reply_markup(&self, chat_id: i64, message_id: i64) -> Result<(), Error> {
        let _: IgnoredAny = self
            .call(
                "editMessageReplyMarkup",
                json!({
                    "chat_id": chat_id,
                    "message_id": message_id,
                }),
            )
            .await?;

        Ok(())
    }

    /// Acknowledge a button press, showing `text` to the user if it is not empty.
    ///
    /// # Errors
    /// Returns an error if the request fails.
    pub async fn answer_callback_query(
        &self,
        callback_query_id: &str,
        text: &str,
    ) -> Result<(), Error> {
        let _: IgnoredAny = self
            .call(
                "answerCallbackQuery",
                json!({
                    "callback_query_id": callback_query_id,
                    "text": text,
                    "show_alert": false,
                }),
            )
            .await?;

        Ok(())
    }

    /// Wait up to `timeout` for updates with an ID of at least `offset`.
    ///
    /// # Errors
    /// Returns an error if the request fails.
    pub async fn get_updates(&self, offset: i64, timeout: Duration) -> Result<Vec<Update>, Error> {
        self.call(
            "getUpdates",
            json!({
                "offset": offset,
                "timeout": timeout.as_secs(),
                "allowed_updates": ["message", "callback_query"],
            }),
        )
        .await
    }
}

#[cfg(test)]
mod telegram_client_tests {
    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };

    use axum::{Json, Router, extract::Path, extract::State, http::StatusCode, routing::post};
    use serde_json::{Value, json};

    use crate::{
        Error,
        telegram::api::{InlineKeyboardButton, InlineKeyboardMarkup, TelegramClient},
        test_utils::serve,
    };

    type Received = Arc<Mutex<Vec<(String, Value)>>>;

    async fn fake_telegram() -> (TelegramClient, Received) {
        let received = Received::default();
        let app = Router::new()
            .route(
                "/botsecret/{method}",
                post(
                    |State(received): State<Received>,
                     Path(method): Path<String>,
                     Json(body): Json<Value>| async move {
                        received.lock().unwrap().push((method.clone(), body));
                        match method.as_str() {
                            "sendMessage" => Ok(Json(json!({
                                "ok": true,
                                "result": {"message_id": 9, "chat": {"id": 1}}
                            }))),
                            "getUpdates" => Ok(Json(json!({"ok": true, "result": []}))),
                            "answerCallbackQuery" => Ok(Json(json!({"ok": true, "result": true}))),
                            "editMessageReplyMarkup" => Ok(Json(json!({"ok": true}))),
                            _ => Err((
                                StatusCode::BAD_REQUEST,
                                Json(json!({"ok": false, "description": "Bad Request"})),
                            )),
                        }
                    },
                ),
            )
            .with_state(received.clone());

        let base_url = serve(app).await;
        (TelegramClient::new(&base_url, "secret").unwrap(), received)
    }

    #[tokio::test]
    async fn send_message_uses_html_and_keyboard() {
        let (client, received) = fake_telegram().await;
        let keyboard = InlineKeyboardMarkup {
            inline_keyboard: vec![vec![InlineKeyboardButton {
                text: "Food".to_owned(),
                callback_data: "cat|1|2".to_owned(),
            }]],
        };

        let message = client.send_message(1, "<b>hi</b>", Some(&keyboard)).await.unwrap();

        assert_eq!(message.message_id, 9);
        let received = received.lock().unwrap();
        assert_eq!(received[0].0, "sendMessage");
        assert_eq!(received[0].1["parse_mode"], "HTML");
        assert_eq!(
            received[0].1["reply_markup"]["inline_keyboard"][0][0]["callback_data"],
            "cat|1|2"
        );
    }

    #[tokio::test]
    async fn send_message_without_keyboard_omits_markup() {
        let (client, received) = fake_telegram().await;

        client.send_message(1, "hi", None).await.unwrap();

        assert!(received.lock().unwrap()[0].1.get("reply_markup").is_none());
    }

    #[tokio::test]
    async fn answer_callback_query_succeeds() {
        let (client, received) = fake_telegram().await;

        client.answer_callback_query("abc", "Done").await.unwrap();

        assert_eq!(received.lock().unwrap()[0].1["callback_query_id"], "abc");
    }

    #[tokio::test]
    async fn error_response_is_an_error() {
        let (client, _) = fake_telegram().await;

        let result = client.edit_message_text(1, 2, "text").await;

        assert!(matches!(result, Err(Error::UnexpectedStatus { .. })));
    }

    #[tokio::test]
    async fn missing_result_is_an_error() {
        let (client, _) = fake_telegram().await;

        let result = client.remove_reply_markup(1, 2).await;

        assert!(matches!(result, Err(Error::UnexpectedStatus { .. })));
    }

    #[tokio::test]
    async fn transport_error_does_not_contain_token() {
        let client = TelegramClient::new("http://127.0.0.1:1", "123456:TOKEN").unwrap();

        let error = client
            .get_updates(0, Duration::from_secs(0))
            .await
            .unwrap_err();

        assert!(matches!(error, Error::Http(_)));
        assert!(!error.to_string().contains("123456:TOKEN"));
    }
}
