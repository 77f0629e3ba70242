// Library crate for the Rock Paper Scissors game server
// This file exposes the public API for integration tests

pub mod app;
pub mod game;
pub mod health;
pub mod shared;

// Re-export commonly used types for easier access in tests
pub use app::build_router;
pub use game::{GameRepository, GameService, InMemoryGameRepository};
pub use shared::{AppError, AppState};
