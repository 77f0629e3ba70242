use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use validator::Validate;

use super::models::{GameSession, Player};
use super::outcome::{Choice, Outcome};
use super::streaks::StreakSummary;
use crate::shared::{AppError, FieldError};

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_]+$").unwrap());

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 50;

/// Body of POST /game/submit
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmitGameRequest {
    #[validate(
        length(
            min = 3,
            max = 50,
            message = "Username must be between 3 and 50 characters"
        ),
        regex(
            path = *USERNAME_RE,
            message = "Username can only contain letters, numbers, and underscores"
        )
    )]
    pub username: String,
    pub result: Outcome,
    pub player_choice: Choice,
    pub computer_choice: Choice,
    #[validate(range(min = 0, max = 300, message = "Session duration must be between 0 and 300 seconds"))]
    pub session_duration: Option<i32>,
}

/// Validates a username path parameter with the same constraints as the
/// submit body field
pub fn validate_username(username: &str) -> Result<(), AppError> {
    let length = username.chars().count();
    if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&length) {
        return Err(AppError::Validation(vec![FieldError::new(
            "username",
            "Username must be between 3 and 50 characters",
        )]));
    }
    if !USERNAME_RE.is_match(username) {
        return Err(AppError::Validation(vec![FieldError::new(
            "username",
            "Username can only contain letters, numbers, and underscores",
        )]));
    }
    Ok(())
}

/// Query params are taken as raw strings so a non-numeric value falls
/// back to the default instead of failing extraction
#[derive(Debug, Clone, Deserialize)]
pub struct LeaderboardQuery {
    limit: Option<String>,
}

impl LeaderboardQuery {
    pub fn limit(&self) -> Option<i64> {
        lenient_int(self.limit.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryQuery {
    page: Option<String>,
    limit: Option<String>,
}

impl HistoryQuery {
    pub fn page(&self) -> Option<i64> {
        lenient_int(self.page.as_deref())
    }

    pub fn limit(&self) -> Option<i64> {
        lenient_int(self.limit.as_deref())
    }
}

fn lenient_int(value: Option<&str>) -> Option<i64> {
    value.and_then(|v| v.parse().ok())
}

/// Uniform response envelope used by every endpoint
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data,
        }
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data,
        }
    }
}

/// Player aggregates plus the derived fields, as exposed over REST
#[derive(Debug, Clone, Serialize)]
pub struct PlayerSummary {
    pub id: i32,
    pub username: String,
    pub wins: i32,
    pub losses: i32,
    pub draws: i32,
    pub total_games: i32,
    pub win_rate: f64,
    pub last_active: DateTime<Utc>,
}

impl From<&Player> for PlayerSummary {
    fn from(player: &Player) -> Self {
        Self {
            id: player.id,
            username: player.username.clone(),
            wins: player.wins,
            losses: player.losses,
            draws: player.draws,
            total_games: player.total_games(),
            win_rate: player.win_rate(),
            last_active: player.last_active,
        }
    }
}

/// Payload of a successful submission
#[derive(Debug, Serialize)]
pub struct SubmitGameData {
    pub user: PlayerSummary,
    pub game_session: GameSession,
    pub is_new_user: bool,
}

/// Payload of GET /game/player/:username
#[derive(Debug, Serialize)]
pub struct PlayerStatsData {
    #[serde(flatten)]
    pub player: PlayerSummary,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub recent_games: Vec<GameSession>,
    pub streaks: StreakSummary,
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub pages: i64,
}

/// Payload of GET /game/player/:username/history
#[derive(Debug, Serialize)]
pub struct HistoryData {
    pub games: Vec<GameSession>,
    pub pagination: Pagination,
}
