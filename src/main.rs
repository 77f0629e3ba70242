use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rps_server::game::repository::{
    GameRepository, InMemoryGameRepository, PostgresGameRepository,
};
use rps_server::{build_router, AppState};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rps_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Rock Paper Scissors game server");

    // Shared application state with dependency injection; Postgres when
    // DATABASE_URL is set, in-memory otherwise
    let game_repository: Arc<dyn GameRepository> = match std::env::var("DATABASE_URL") {
        Ok(database_url) => {
            info!("Using PostgreSQL game repository");
            let pool = sqlx::PgPool::connect(&database_url)
                .await
                .expect("Failed to connect to database");
            Arc::new(PostgresGameRepository::new(pool))
        }
        Err(_) => {
            info!("DATABASE_URL not set, using in-memory game repository");
            Arc::new(InMemoryGameRepository::new())
        }
    };

    let app_state = AppState::new(game_repository);
    let app = build_router(app_state);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
    info!("Server running on http://localhost:3000");
    axum::serve(listener, app).await.unwrap();
}
