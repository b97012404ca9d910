use crate::rewrite::{JournalId, Rule, TransactionSplitUpdate, rules::default_rules};

/// Runs transaction descriptions through an ordered list of [Rule]s.
///
/// The engine holds no mutable state, so a single instance can be shared
/// between concurrent webhook requests.
#[derive(Debug)]
pub struct RuleEngine {
    rules: Vec<Rule>,
}

impl RuleEngine {
    /// Create an engine that applies `rules` in the given order.
    pub fn new(rules: Vec<Rule>) -> Self {
        tracing::info!("Loading rewrite rules...");
        for rule in &rules {
            tracing::info!(rule = rule.name(), terminal = rule.is_terminal(), "Loaded rule");
        }

        Self { rules }
    }

    /// Create an engine with the built-in rules.
    ///
    /// # Errors
    /// Returns an error if one of the built-in patterns fails to compile.
    pub fn with_default_rules() -> Result<Self, regex::Error> {
        Ok(Self::new(default_rules()?))
    }

    /// The names of the rules, in the order they are applied.
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(Rule::name).collect()
    }

    /// Run `description` through the rules and collect the changes.
    ///
    /// Each rule sees the result of the rules before it. Fields set by a later
    /// rule overwrite those set by an earlier one, and processing stops after
    /// the first terminal rule that applies. Rule failures are logged and the
    /// rule is skipped.
    ///
    /// Returns `None` if no rule applied, which is different from an update
    /// that happens to leave the description as it was.
    pub fn process(
        &self,
        journal_id: JournalId,
        description: &str,
    ) -> Option<TransactionSplitUpdate> {
        let mut current = TransactionSplitUpdate::new(journal_id, description);
        let mut did_update = false;

        for rule in &self.rules {
            let update = match rule.apply(&current) {
                Ok(Some(update)) => update,
                Ok(None) => {
                    tracing::info!(rule = rule.name(), "Not applicable");
                    continue;
                }
                Err(error) => {
                    tracing::error!(rule = rule.name(), "Rule failed: {error}");
                    continue;
                }
            };

            for (field, value) in current.merge(update) {
                tracing::info!(rule = rule.name(), field, "SET {field}='{value}'");
            }
            did_update = true;

            if rule.is_terminal() {
                tracing::info!(rule = rule.name(), "Returning updated transaction");
                return Some(current);
            }
        }

        did_update.then_some(current)
    }
}
