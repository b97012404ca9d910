use std::{
    any::Any,
    fmt::Debug,
    panic::{self, AssertUnwindSafe},
};

use crate::rewrite::TransactionSplitUpdate;

/// Why a rule could not produce a result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    /// The rule reported a failure itself.
    #[error("{0}")]
    Failed(String),

    /// The rule panicked while processing the description.
    #[error("rule panicked: {0}")]
    Panicked(String),
}

/// What a rule returns: `Ok(None)` when it does not apply to the description,
/// `Ok(Some(update))` with the fields it wants to set otherwise.
pub type RuleResult = Result<Option<TransactionSplitUpdate>, RuleError>;

type Transform = dyn Fn(&TransactionSplitUpdate) -> RuleResult + Send + Sync;

/// A named rewrite step in the [RuleEngine](crate::rewrite::RuleEngine).
///
/// Rules are stateless: everything they need, such as compiled regular
/// expressions, is captured by the transform when the rule is built.
pub struct Rule {
    name: &'static str,
    terminal: bool,
    transform: Box<Transform>,
}

impl Rule {
    /// Create a rule.
    ///
    /// If `terminal` is set, the engine stops after this rule produced an update.
    pub fn new<F>(name: &'static str, terminal: bool, transform: F) -> Self
    where
        F: Fn(&TransactionSplitUpdate) -> RuleResult + Send + Sync + 'static,
    {
        Self {
            name,
            terminal,
            transform: Box::new(transform),
        }
    }

    /// The name used in log messages.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether a successful match stops the pipeline.
    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    /// Run the rule against the accumulated update.
    ///
    /// A panic inside the transform is returned as [RuleError::Panicked].
    pub fn apply(&self, current: &TransactionSplitUpdate) -> RuleResult {
        panic::catch_unwind(AssertUnwindSafe(|| (self.transform)(current)))
            .unwrap_or_else(|payload| Err(RuleError::Panicked(panic_message(&*payload))))
    }
}

impl Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("terminal", &self.terminal)
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_owned()
    }
}

#[cfg(test)]
mod rule_tests {
    use crate::rewrite::{Rule, RuleError, TransactionSplitUpdate};

    #[test]
    fn apply_returns_transform_result() {
        let rule = Rule::new("upper", false, |current| {
            Ok(Some(TransactionSplitUpdate::with_description(
                current.description.to_uppercase(),
            )))
        });

        let got = rule.apply(&TransactionSplitUpdate::new(1, "abc"));

        assert_eq!(got, Ok(Some(TransactionSplitUpdate::with_description("ABC"))));
    }

    #[test]
    fn apply_catches_panics() {
        let rule = Rule::new("broken", true, |_| panic!("boom"));

        let got = rule.apply(&TransactionSplitUpdate::new(1, "abc"));

        assert_eq!(got, Err(RuleError::Panicked("boom".to_owned())));
    }
}
