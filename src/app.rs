use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::game::handlers;
use crate::health;
use crate::shared::{self, AppState};

pub const API_PREFIX: &str = "/api/v1";

/// Assembles the full application router over the injected state
pub fn build_router(state: AppState) -> Router {
    let game_routes = Router::new()
        .route("/submit", post(handlers::submit_game))
        .route("/leaderboard", get(handlers::get_leaderboard))
        .route("/player/:username", get(handlers::get_player_stats))
        .route(
            "/player/:username/history",
            get(handlers::get_player_history),
        );

    Router::new()
        .route("/health", get(health::health))
        .route(&format!("{API_PREFIX}/health"), get(health::api_health))
        .nest(&format!("{API_PREFIX}/game"), game_routes)
        .fallback(shared::route_not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
