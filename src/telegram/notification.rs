//! Renders the chat messages sent by the bot.
//!
//! Telegram accepts a small subset of HTML. maud escapes every interpolated
//! value, so descriptions and account names cannot break the markup.

use maud::{Markup, html};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use unicode_segmentation::UnicodeSegmentation;

use crate::{
    firefly::{Category, Transaction, TransactionId, TransactionSplit},
    telegram::{
        api::{InlineKeyboardButton, InlineKeyboardMarkup},
        callback::CallbackAction,
    },
};

/// Shown instead of values that are missing or cannot be formatted.
pub const NOT_AVAILABLE: &str = "n/a";

const DESCRIPTION_LENGTH_LIMIT: usize = 50;
const ACCOUNT_NAME_LENGTH_LIMIT: usize = 25;
const ELLIPSIS: &str = "...";

const BUTTONS_PER_ROW: usize = 3;
const DONE_BUTTON_TEXT: &str = "👍 Passt";

const GERMAN_MONTHS: [&str; 12] = [
    "Januar",
    "Februar",
    "März",
    "April",
    "Mai",
    "Juni",
    "Juli",
    "August",
    "September",
    "Oktober",
    "November",
    "Dezember",
];

/// The message announcing a new transaction.
///
/// `transaction_url` links to the transaction in the Firefly III web interface.
pub fn transaction_message(transaction: &Transaction, transaction_url: &str) -> String {
    transaction_markup(transaction, transaction_url).into_string()
}

fn transaction_markup(transaction: &Transaction, transaction_url: &str) -> Markup {
    html! {
        b { "💸 Neue Firefly-III-Transaktion 💸" } "\n"
        a href=(transaction_url) { "Transaktion #" (transaction.id) } "\n"
        tg-spoiler {
            @for split in &transaction.splits {
                (split_markup(split))
            }
        }
    }
}

fn split_markup(split: &TransactionSplit) -> Markup {
    html! {
        "\n\t✏️ " (truncate(&split.description, DESCRIPTION_LENGTH_LIMIT))
        "\n\t🏷️ " (or_not_available(&split.category_name))
        "\n\t📆 " (format_date(&split.date))
        "\n\t⚖️ " (truncate(&split.source_name, ACCOUNT_NAME_LENGTH_LIMIT))
        " ➜ " (truncate(&split.destination_name, ACCOUNT_NAME_LENGTH_LIMIT))
        "\n\t💶 " u { b { (format_amount(&split.amount, &split.currency_symbol)) } }
        "\n"
    }
}

/// The message reporting a failed import run.
pub fn error_message(error: &str) -> String {
    html! {
        b { "❗️ Firefly-III-Autoimporter Fehler ❗️" }
        "\n\n"
        i { (error) }
    }
    .into_string()
}

/// The reply to the `/start` command.
pub fn start_message(first_name: &str, chat_id: i64) -> String {
    html! {
        "Hallo " (first_name) "!\n"
        "Dieser Bot ist eingerichtet für Nutzer "
        a href={ "tg://user?id=" (chat_id) } { (chat_id) } "."
    }
    .into_string()
}

/// One button per category followed by a row with a button that dismisses
/// the keyboard.
pub fn category_keyboard(
    transaction_id: TransactionId,
    categories: &[Category],
) -> InlineKeyboardMarkup {
    let mut inline_keyboard: Vec<Vec<InlineKeyboardButton>> = categories
        .chunks(BUTTONS_PER_ROW)
        .map(|row| {
            row.iter()
                .map(|category| InlineKeyboardButton {
                    text: category.name.clone(),
                    callback_data: CallbackAction::SetCategory {
                        transaction_id,
                        category_id: category.id.clone(),
                    }
                    .to_string(),
                })
                .collect()
        })
        .collect();

    inline_keyboard.push(vec![InlineKeyboardButton {
        text: DONE_BUTTON_TEXT.to_owned(),
        callback_data: CallbackAction::Done { transaction_id }.to_string(),
    }]);

    InlineKeyboardMarkup { inline_keyboard }
}

fn or_not_available(text: &str) -> &str {
    if text.is_empty() { NOT_AVAILABLE } else { text }
}

/// Shorten `text` to at most `limit` characters, ending in an ellipsis if it
/// was cut.
fn truncate(text: &str, limit: usize) -> String {
    if text.is_empty() {
        return NOT_AVAILABLE.to_owned();
    }

    let graphemes: Vec<&str> = text.graphemes(true).collect();
    if graphemes.len() <= limit {
        return text.to_owned();
    }

    let mut truncated = graphemes[..limit.saturating_sub(ELLIPSIS.len())].concat();
    truncated.push_str(ELLIPSIS);
    truncated
}

/// Format an RFC 3339 timestamp as e.g. "3. März".
fn format_date(date: &str) -> String {
    match OffsetDateTime::parse(date, &Rfc3339) {
        Ok(date) => format!(
            "{}. {}",
            date.day(),
            GERMAN_MONTHS[usize::from(u8::from(date.month())) - 1]
        ),
        Err(error) => {
            tracing::warn!("Could not parse transaction date {date:?}: {error}");
            NOT_AVAILABLE.to_owned()
        }
    }
}

fn format_amount(amount: &str, currency_symbol: &str) -> String {
    match amount.parse::<f64>() {
        Ok(amount) => format!("{currency_symbol}{amount:.2}"),
        Err(error) => {
            tracing::warn!("Could not parse transaction amount {amount:?}: {error}");
            NOT_AVAILABLE.to_owned()
        }
    }
}
