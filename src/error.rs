//! Defines the app level error type and its conversion to HTTP responses.

use std::path::PathBuf;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request to another service could not be sent or its response
    /// could not be read.
    ///
    /// The request URL is stripped because it can contain the Telegram bot
    /// token or the importer secret.
    #[error("HTTP request failed: {0}")]
    Http(#[source] reqwest::Error),

    /// Another service answered with a status code other than 2xx.
    ///
    /// `body` holds the response body, which usually explains what went wrong.
    #[error("unexpected response with status {status}: {body}")]
    UnexpectedStatus {
        /// The status code of the response.
        status: reqwest::StatusCode,
        /// The response body as text.
        body: String,
    },

    /// A JSON document could not be serialized or parsed.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Reading or writing a file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// One of the built-in rewrite patterns is not a valid regular expression.
    #[error("invalid rewrite pattern: {0}")]
    InvalidRulePattern(#[from] regex::Error),

    /// The webhook payload sent by Firefly III is missing required fields.
    #[error("invalid webhook payload: {0}")]
    InvalidWebhookPayload(String),

    /// Firefly III did not confirm that the webhook was created or updated.
    #[error("webhook create/update unsuccessful")]
    WebhookRegistration,

    /// The auto-import directory does not contain any configuration files.
    #[error("did not detect any configuration files, please check {} folder", .0.display())]
    NoImportConfigs(PathBuf),

    /// The importer rejected an upload.
    ///
    /// The string is the importer's response body.
    #[error("{0}")]
    ImportRejected(String),

    /// Importing one of the configuration files failed.
    #[error("could not autoimport config {file_name}: {source}")]
    ImportConfig {
        /// The file name of the configuration file, without its directory.
        file_name: String,
        /// What went wrong.
        source: Box<Error>,
    },

    /// The cron expression for the auto-import could not be parsed.
    #[error("invalid cron schedule \"{0}\": {1}")]
    InvalidCronSchedule(String, String),

    /// A configuration value is present but not usable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        Error::Http(error.without_url())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::InvalidWebhookPayload(reason) => {
                tracing::warn!("Received request with invalid body structure: {reason}");
                (StatusCode::BAD_REQUEST, format!("invalid payload: {reason}")).into_response()
            }
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {error}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected error occurred, check the server logs for more details.",
                )
                    .into_response()
            }
        }
    }
}
