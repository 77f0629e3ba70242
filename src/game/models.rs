use chrono::{DateTime, Utc};
use serde::Serialize;

use super::outcome::{Choice, Outcome};

/// A player row with its aggregate counters.
///
/// `total_games` and `win_rate` are intentionally not stored; they are
/// derived from the counters on demand.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub id: i32,
    pub username: String,
    pub email: Option<String>,
    pub wins: i32,
    pub losses: i32,
    pub draws: i32,
    pub last_active: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Player {
    pub fn total_games(&self) -> i32 {
        self.wins + self.losses + self.draws
    }

    /// Win percentage rounded to one decimal place, 0.0 with no games
    pub fn win_rate(&self) -> f64 {
        let total = self.total_games();
        if total == 0 {
            return 0.0;
        }
        (self.wins as f64 * 1000.0 / total as f64).round() / 10.0
    }
}

/// One played round, immutable once recorded
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameSession {
    pub id: i32,
    pub player_id: i32,
    pub player_choice: Choice,
    pub computer_choice: Choice,
    pub result: Outcome,
    pub session_duration: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// Round data accepted for insertion into the session log
#[derive(Debug, Clone)]
pub struct NewSession {
    pub player_choice: Choice,
    pub computer_choice: Choice,
    pub result: Outcome,
    pub session_duration: Option<i32>,
}
