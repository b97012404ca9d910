//! The Firefly III API objects used by this app.
//!
//! Only the fields that are actually read or written are modelled, serde
//! ignores the rest.

use serde::{Deserialize, Deserializer, Serialize};

use crate::rewrite::{JournalId, TransactionSplitUpdate};

/// The ID of a transaction group in Firefly III.
pub type TransactionId = i64;

/// The title of the webhook this app registers in Firefly III.
pub const WEBHOOK_TITLE: &str = "Fix ING transaction descriptions from Importer";

/// Firefly III wraps every single object and list in a `data` field.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    /// The wrapped object.
    pub data: T,

    /// Pagination info, only present for lists.
    #[serde(default)]
    pub meta: Option<Meta>,
}

/// Metadata of a list response.
#[derive(Debug, Clone, Deserialize)]
pub struct Meta {
    /// Where in the list this response is.
    pub pagination: Option<Pagination>,
}

/// The position of a list response within the whole list.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Pagination {
    /// The page number of this response, starting at one.
    pub current_page: u32,
    /// The number of pages in the list.
    pub total_pages: u32,
}

/// The settings of a webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookAttributes {
    /// Disabled webhooks are not delivered.
    pub active: bool,
    /// Used to find the webhook again on the next start.
    pub title: String,
    /// What is sent, e.g. `RESPONSE_TRANSACTIONS`.
    pub response: String,
    /// The body format, e.g. `DELIVERY_JSON`.
    pub delivery: String,
    /// The event that fires the webhook, e.g. `TRIGGER_STORE_TRANSACTION`.
    pub trigger: String,
    /// Where the webhook is delivered to.
    pub url: String,
    /// Used by Firefly III to sign deliveries, empty when not known.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub secret: String,
}

impl WebhookAttributes {
    /// The webhook that sends every newly stored transaction to `url`.
    pub fn store_transaction(url: &str) -> Self {
        Self {
            active: true,
            title: WEBHOOK_TITLE.to_owned(),
            response: "RESPONSE_TRANSACTIONS".to_owned(),
            delivery: "DELIVERY_JSON".to_owned(),
            trigger: "TRIGGER_STORE_TRANSACTION".to_owned(),
            url: url.to_owned(),
            secret: String::new(),
        }
    }

    /// Whether an existing webhook with these settings already behaves like
    /// `target`. The title and secret are not compared.
    pub fn matches(&self, target: &WebhookAttributes) -> bool {
        self.active
            && self.delivery == target.delivery
            && self.response == target.response
            && self.trigger == target.trigger
            && self.url == target.url
    }
}

/// A webhook as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WebhookRead {
    /// The webhook ID.
    pub id: String,
    /// The current settings.
    pub attributes: WebhookAttributes,
}

/// One split of a transaction.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TransactionSplit {
    /// The ID of the split.
    #[serde(deserialize_with = "string_or_integer")]
    pub transaction_journal_id: JournalId,
    /// The booking date in RFC 3339 format.
    #[serde(default)]
    pub date: String,
    /// The amount as a decimal string.
    #[serde(default)]
    pub amount: String,
    /// E.g. `€`.
    #[serde(default)]
    pub currency_symbol: String,
    /// The description, as fixed by the rewrite rules once they ran.
    #[serde(default)]
    pub description: String,
    /// The account the money came from.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub source_name: String,
    /// The account the money went to.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub destination_name: String,
    /// Empty if the split has no category.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub category_name: String,
}

/// A transaction group as returned by the API.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TransactionRead {
    /// The transaction group ID.
    #[serde(deserialize_with = "string_or_integer")]
    pub id: TransactionId,
    /// The group title and splits.
    pub attributes: TransactionAttributes,
}

/// The attributes of a [TransactionRead].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TransactionAttributes {
    /// Only set for transactions with more than one split.
    #[serde(default)]
    pub group_title: Option<String>,
    /// The splits of the transaction.
    pub transactions: Vec<TransactionSplit>,
}

/// A transaction group as sent in the body of a webhook.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WebhookTransaction {
    /// The transaction group ID.
    #[serde(deserialize_with = "string_or_integer")]
    pub id: TransactionId,
    /// Only set for transactions with more than one split.
    #[serde(default)]
    pub group_title: Option<String>,
    /// The splits of the transaction.
    #[serde(default)]
    pub transactions: Vec<TransactionSplit>,
}

/// The body of a webhook request.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookMessage {
    /// The Firefly III version, empty if missing.
    #[serde(default)]
    pub version: String,
    /// The stored transaction.
    pub content: WebhookTransaction,
}

/// A transaction with its splits, independent of where it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    /// The transaction group ID.
    pub id: TransactionId,
    /// Only set for transactions with more than one split.
    pub group_title: Option<String>,
    /// At least one for transactions stored by Firefly III.
    pub splits: Vec<TransactionSplit>,
}

impl From<TransactionRead> for Transaction {
    fn from(read: TransactionRead) -> Self {
        Self {
            id: read.id,
            group_title: read.attributes.group_title,
            splits: read.attributes.transactions,
        }
    }
}

impl From<WebhookTransaction> for Transaction {
    fn from(content: WebhookTransaction) -> Self {
        Self {
            id: content.id,
            group_title: content.group_title,
            splits: content.transactions,
        }
    }
}

/// A category as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CategoryRead {
    /// The category ID.
    pub id: String,
    /// Holds the name.
    pub attributes: CategoryAttributes,
}

/// The attributes of a [CategoryRead].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CategoryAttributes {
    /// The category name.
    pub name: String,
}

/// A category the user can pick for a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    /// Sent back when the category is picked.
    pub id: String,
    /// Shown on the button.
    pub name: String,
}

impl From<CategoryRead> for Category {
    fn from(read: CategoryRead) -> Self {
        Self {
            id: read.id,
            name: read.attributes.name,
        }
    }
}

/// The body of a transaction update request.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionUpdate<S> {
    /// Whether Firefly III runs its own rules on the updated transaction.
    pub apply_rules: bool,
    /// Whether the update fires webhooks.
    pub fire_webhooks: bool,
    /// The new group title, left unchanged if `None`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_title: Option<String>,
    /// One entry per split.
    pub transactions: Vec<S>,
}

impl TransactionUpdate<TransactionSplitUpdate> {
    /// An update with the fixed descriptions.
    ///
    /// The group title is set to the first split's description. Firefly III
    /// rules are applied again, but webhooks are not fired so the update does
    /// not loop back into this app.
    pub fn from_splits(splits: Vec<TransactionSplitUpdate>) -> Self {
        Self {
            apply_rules: true,
            fire_webhooks: false,
            group_title: splits.first().map(|split| split.description.clone()),
            transactions: splits,
        }
    }
}

/// Sets the category of one split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorySplitUpdate {
    /// The split to update.
    pub transaction_journal_id: JournalId,
    /// The new category.
    pub category_id: String,
}

impl TransactionUpdate<CategorySplitUpdate> {
    /// An update that sets the category of every split in `transaction`.
    pub fn set_category(transaction: &Transaction, category_id: &str) -> Self {
        Self {
            apply_rules: false,
            fire_webhooks: false,
            group_title: None,
            transactions: transaction
                .splits
                .iter()
                .map(|split| CategorySplitUpdate {
                    transaction_journal_id: split.transaction_journal_id,
                    category_id: category_id.to_owned(),
                })
                .collect(),
        }
    }
}

/// Firefly III sends IDs as strings from the API but as integers in webhooks.
fn string_or_integer<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrInteger {
        String(String),
        Integer(i64),
    }

    match StringOrInteger::deserialize(deserializer)? {
        StringOrInteger::Integer(value) => Ok(value),
        StringOrInteger::String(text) => text.parse().map_err(serde::de::Error::custom),
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod model_tests {
    use serde_json::json;

    use crate::{
        firefly::models::{
            ApiResponse, Transaction, TransactionRead, TransactionUpdate, WebhookAttributes,
            WebhookMessage,
        },
        rewrite::TransactionSplitUpdate,
    };

    #[test]
    fn parses_webhook_message_with_integer_ids() {
        let message: WebhookMessage = serde_json::from_value(json!({
            "version": "v0",
            "content": {
                "id": 12,
                "group_title": null,
                "transactions": [{
                    "transaction_journal_id": 34,
                    "date": "2024-03-01T00:00:00+01:00",
                    "amount": "12.50",
                    "currency_symbol": "€",
                    "description": "Coffee",
                    "source_name": "Checking",
                    "destination_name": "Cafe",
                    "category_name": null
                }],
                "links": []
            }
        }))
        .unwrap();

        assert_eq!(message.version, "v0");
        assert_eq!(message.content.id, 12);
        assert_eq!(message.content.transactions[0].transaction_journal_id, 34);
        assert_eq!(message.content.transactions[0].category_name, "");
    }

    #[test]
    fn parses_api_transaction_with_string_ids() {
        let response: ApiResponse<TransactionRead> = serde_json::from_value(json!({
            "data": {
                "type": "transactions",
                "id": "12",
                "attributes": {
                    "group_title": "Title",
                    "transactions": [{
                        "transaction_journal_id": "34",
                        "description": "Coffee",
                        "category_name": "Food"
                    }]
                }
            }
        }))
        .unwrap();

        let transaction = Transaction::from(response.data);

        assert_eq!(transaction.id, 12);
        assert_eq!(transaction.group_title.as_deref(), Some("Title"));
        assert_eq!(transaction.splits[0].transaction_journal_id, 34);
        assert_eq!(transaction.splits[0].category_name, "Food");
    }

    #[test]
    fn update_body_uses_first_description_as_group_title() {
        let update = TransactionUpdate::from_splits(vec![
            TransactionSplitUpdate::new(1, "first"),
            TransactionSplitUpdate::new(2, "second"),
        ]);

        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({
                "apply_rules": true,
                "fire_webhooks": false,
                "group_title": "first",
                "transactions": [
                    {"transaction_journal_id": 1, "description": "first"},
                    {"transaction_journal_id": 2, "description": "second"}
                ]
            })
        );
    }

    #[test]
    fn webhook_matches_ignores_title_and_secret() {
        let target = WebhookAttributes::store_transaction("https://example.com/wh_fix_ing");
        let mut existing = target.clone();
        existing.title = "Renamed".to_owned();
        existing.secret = "secret".to_owned();

        assert!(existing.matches(&target));
    }

    #[test]
    fn webhook_does_not_match_when_inactive_or_url_differs() {
        let target = WebhookAttributes::store_transaction("https://example.com/wh_fix_ing");

        let mut inactive = target.clone();
        inactive.active = false;
        let mut moved = target.clone();
        moved.url = "https://example.com/other".to_owned();

        assert!(!inactive.matches(&target));
        assert!(!moved.matches(&target));
    }
}
