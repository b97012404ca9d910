//! The data attached to inline keyboard buttons.
//!
//! Telegram limits callback data to 64 bytes, so buttons carry IDs only.

use std::{fmt, str::FromStr};

use crate::firefly::TransactionId;

const SEPARATOR: char = '|';
const SET_CATEGORY: &str = "cat";
const DONE: &str = "done";

/// What a button press should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    /// Set the category of every split of the transaction.
    SetCategory {
        /// The transaction to update.
        transaction_id: TransactionId,
        /// The picked category.
        category_id: String,
    },
    /// Keep the transaction as it is and remove the keyboard.
    Done {
        /// The transaction the message is about.
        transaction_id: TransactionId,
    },
}

/// Callback data that this bot did not produce.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallbackParseError {
    /// The transaction ID is not a number.
    #[error("Transaktions-ID {0} ungültig!")]
    InvalidTransactionId(String),
    /// Neither a category nor a done action.
    #[error("unknown callback data {0:?}")]
    Unknown(String),
}

impl fmt::Display for CallbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallbackAction::SetCategory {
                transaction_id,
                category_id,
            } => write!(f, "{SET_CATEGORY}{SEPARATOR}{transaction_id}{SEPARATOR}{category_id}"),
            CallbackAction::Done { transaction_id } => {
                write!(f, "{DONE}{SEPARATOR}{transaction_id}")
            }
        }
    }
}

impl FromStr for CallbackAction {
    type Err = CallbackParseError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = data.split(SEPARATOR).collect();

        match parts.as_slice() {
            [SET_CATEGORY, transaction_id, category_id] if !category_id.is_empty() => {
                Ok(CallbackAction::SetCategory {
                    transaction_id: parse_transaction_id(transaction_id)?,
                    category_id: (*category_id).to_owned(),
                })
            }
            [DONE, transaction_id] => Ok(CallbackAction::Done {
                transaction_id: parse_transaction_id(transaction_id)?,
            }),
            _ => Err(CallbackParseError::Unknown(data.to_owned())),
        }
    }
}

fn parse_transaction_id(text: &str) -> Result<TransactionId, CallbackParseError> {
    text.parse()
        .map_err(|_| CallbackParseError::InvalidTransactionId(text.to_owned()))
}
