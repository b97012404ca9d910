//! A client for the parts of the Firefly III REST API this app needs.

mod client;
pub mod models;

pub use client::FireflyClient;
pub use models::{Category, Transaction, TransactionId, TransactionSplit, WebhookAttributes};
