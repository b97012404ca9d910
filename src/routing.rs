//! Application router configuration.

use axum::{Router, middleware, routing::get};

use crate::{
    AppState, endpoints,
    logging::logging_middleware,
    webhook::{get_webhook, receive_transaction_webhook},
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            endpoints::WEBHOOK,
            get(get_webhook).post(receive_transaction_webhook),
        )
        .layer(middleware::from_fn(logging_middleware))
        .with_state(state)
}
