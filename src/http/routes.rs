use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use super::handlers;
use super::state::AppState;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Recording control
        .route("/recording/start", post(handlers::start_recording))
        .route("/recording/pause", post(handlers::pause_recording))
        .route("/recording/resume", post(handlers::resume_recording))
        .route("/recording/stop", post(handlers::stop_recording))
        .route("/recording/cancel", post(handlers::cancel_recording))
        .route("/recording/clear", post(handlers::clear_recording))
        // Recording queries
        .route("/recording/status", get(handlers::recording_status))
        .route("/recording/transcript", get(handlers::recording_transcript))
        .route("/recording/audio", get(handlers::recording_audio))
        // Transcript review
        .route("/validations", post(handlers::create_validation))
        .route("/validations/:id", get(handlers::get_validation))
        .route("/validations/:id/accept", post(handlers::accept_word))
        .route("/validations/:id/skip", post(handlers::skip_word))
        .route("/validations/:id/update", post(handlers::update_word))
        .route("/validations/:id/accept-all", post(handlers::accept_all))
        .route("/validations/:id/select", post(handlers::select_word))
        .route("/validations/:id/play", post(handlers::play_selected))
        .route("/validations/:id/result", get(handlers::validation_result))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
