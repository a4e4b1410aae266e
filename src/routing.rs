//! Application router configuration.

use axum::{Router, routing::post};

use crate::{
    AppState, endpoints,
    recurring::{generate_all_recurring_endpoint, generate_recurring_endpoint},
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            endpoints::GENERATE_ALL_RECURRING,
            post(generate_all_recurring_endpoint),
        )
        .route(
            endpoints::GENERATE_RECURRING,
            post(generate_recurring_endpoint),
        )
        .with_state(state)
}
