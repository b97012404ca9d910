//! Rewrites the malformed transaction descriptions produced by some bank exports.
//!
//! A [RuleEngine] runs a description through an ordered list of [Rule]s and
//! collects what they change into a single [TransactionSplitUpdate].

mod engine;
mod rule;
pub mod rules;
mod update;

pub use engine::RuleEngine;
pub use rule::{Rule, RuleError, RuleResult};
pub use update::{JournalId, TransactionSplitUpdate};
