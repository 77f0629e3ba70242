pub mod handlers;
pub mod models;
pub mod outcome;
pub mod repository;
pub mod service;
pub mod streaks;
pub mod types;

pub use models::{GameSession, NewSession, Player};
pub use outcome::{decide, Choice, Outcome};
pub use repository::{GameRepository, InMemoryGameRepository, PostgresGameRepository};
pub use service::GameService;
pub use streaks::StreakSummary;
