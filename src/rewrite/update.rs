use serde::{Deserialize, Serialize};

/// The ledger's identifier for a single transaction split (a "journal").
pub type JournalId = i64;

/// A sparse update for one transaction split.
///
/// An empty string means "leave this field unchanged". Empty fields are left
/// out when the update is serialized, so sending an update to Firefly III never
/// clears a value that no rule touched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSplitUpdate {
    /// The split this update applies to.
    #[serde(rename = "transaction_journal_id")]
    pub journal_id: JournalId,

    /// The human readable description.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// The SEPA direct debit mandate reference.
    #[serde(rename = "sepa_db", default, skip_serializing_if = "String::is_empty")]
    pub mandate_reference: String,

    /// The SEPA creditor identifier.
    #[serde(
        rename = "destination_iban",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub creditor_id: String,

    /// The name of the category to assign.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub category_name: String,
}

impl TransactionSplitUpdate {
    /// Create an update for `journal_id` that only carries `description`.
    pub fn new(journal_id: JournalId, description: &str) -> Self {
        Self {
            journal_id,
            description: description.to_owned(),
            ..Default::default()
        }
    }

    /// Create an update that only changes the description.
    ///
    /// The journal ID is left at zero because rules do not know which split
    /// they are working on, the engine keeps track of that.
    pub fn with_description(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Default::default()
        }
    }

    /// Copy every non-empty text field of `other` into `self`, overwriting
    /// what was there before.
    ///
    /// The journal ID is never changed. Returns the name and new value of each
    /// field that was set, in declaration order.
    pub fn merge(&mut self, other: TransactionSplitUpdate) -> Vec<(&'static str, String)> {
        let mut updated = Vec::new();

        let fields = [
            ("description", &mut self.description, other.description),
            (
                "mandate_reference",
                &mut self.mandate_reference,
                other.mandate_reference,
            ),
            ("creditor_id", &mut self.creditor_id, other.creditor_id),
            ("category_name", &mut self.category_name, other.category_name),
        ];

        for (name, destination, value) in fields {
            if value.is_empty() {
                continue;
            }

            updated.push((name, value.clone()));
            *destination = value;
        }

        updated
    }
}
