//! API Routes
//!
//! Router configuration for the HTTP API.

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;

use super::handlers::{self, ApiState};

/// Create the API router with all routes
pub fn create_router(state: ApiState) -> Router {
    let mut router = Router::new()
        // Health & Status
        .route("/health", get(handlers::health))
        .route("/bounds", get(handlers::bounds))
        // Papers
        .route("/papers", get(handlers::list_papers))
        .route("/papers/ids", get(handlers::list_paper_ids))
        .route("/paper", post(handlers::get_paper))
        .route("/papers/register", post(handlers::register_paper))
        .route("/papers/update", post(handlers::update_paper))
        // Scores
        .route("/scores/submit", post(handlers::submit_score))
        .route("/scores/has_submitted", post(handlers::has_submitted))
        // Disclosure
        .route("/disclosure/final_score", post(handlers::final_score))
        .route("/disclosure/share_total", post(handlers::share_total))
        // Ownership
        .route("/owner", get(handlers::get_owner))
        .route("/owner/transfer", post(handlers::transfer_owner))
        .route("/owner/renounce", post(handlers::renounce_owner))
        // Relayer
        .route("/relayer/encrypt", post(handlers::relayer_encrypt))
        .route("/relayer/decrypt", post(handlers::relayer_decrypt))
        // Live events
        .route("/events", get(handlers::events));

    if state.dev_mode {
        router = router.route("/dev/plain_sum", post(handlers::dev_plain_sum));
    }

    router
        // CORS
        .layer(CorsLayer::permissive())
        .with_state(state)
}
