//! The URIs served by this app.

/// The route Firefly III posts new transactions to.
pub const WEBHOOK: &str = "/wh_fix_ing";
