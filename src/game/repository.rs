use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, instrument, warn};

use super::models::{GameSession, NewSession, Player};
use super::outcome::Outcome;
use crate::shared::AppError;

/// Trait for game storage operations.
///
/// Counter increments are a capability of the store, not a
/// read-modify-write in the caller, so concurrent submissions for the
/// same player cannot lose updates.
#[async_trait]
pub trait GameRepository: Send + Sync {
    async fn find_player(&self, username: &str) -> Result<Option<Player>, AppError>;

    /// Finds the player by username or creates it with zero counters.
    /// Returns the player and whether it was created by this call.
    /// Implemented as a single conditional-insert-or-fetch, not a
    /// check-then-create sequence.
    async fn find_or_create_player(&self, username: &str) -> Result<(Player, bool), AppError>;

    /// Atomically increments the counter matching the round result and
    /// appends the session row. Either both changes are durable or
    /// neither is.
    async fn record_round(
        &self,
        player_id: i32,
        round: &NewSession,
    ) -> Result<(Player, GameSession), AppError>;

    /// Players ordered by wins desc, then losses asc, then draws asc
    async fn leaderboard(&self, limit: i64) -> Result<Vec<Player>, AppError>;

    /// Most recent sessions for a player, newest first
    async fn recent_sessions(
        &self,
        player_id: i32,
        limit: i64,
    ) -> Result<Vec<GameSession>, AppError>;

    /// All round results for a player, newest first, for streak scans
    async fn session_results(&self, player_id: i32) -> Result<Vec<Outcome>, AppError>;

    /// One page of a player's sessions (newest first) plus the total count
    async fn session_page(
        &self,
        player_id: i32,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<GameSession>, i64), AppError>;
}

#[derive(Debug, Default)]
struct InMemoryState {
    players: HashMap<String, Player>,
    sessions: Vec<GameSession>,
    next_player_id: i32,
    next_session_id: i32,
}

/// In-memory implementation of GameRepository for development and testing
///
/// Provides a realistic implementation that can be used without a real
/// database connection. Data is lost when the application restarts.
#[derive(Debug)]
pub struct InMemoryGameRepository {
    inner: Mutex<InMemoryState>,
}

impl Default for InMemoryGameRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryGameRepository {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(InMemoryState {
                next_player_id: 1,
                next_session_id: 1,
                ..InMemoryState::default()
            }),
        }
    }

    /// Returns the current number of players (useful for debugging)
    pub fn player_count(&self) -> usize {
        self.inner.lock().unwrap().players.len()
    }
}

#[async_trait]
impl GameRepository for InMemoryGameRepository {
    #[instrument(skip(self))]
    async fn find_player(&self, username: &str) -> Result<Option<Player>, AppError> {
        let state = self.inner.lock().unwrap();
        let player = state.players.get(username).cloned();
        debug!(username = %username, found = player.is_some(), "Looked up player in memory");
        Ok(player)
    }

    #[instrument(skip(self))]
    async fn find_or_create_player(&self, username: &str) -> Result<(Player, bool), AppError> {
        let mut state = self.inner.lock().unwrap();
        if let Some(player) = state.players.get(username) {
            return Ok((player.clone(), false));
        }

        let now = Utc::now();
        let player = Player {
            id: state.next_player_id,
            username: username.to_string(),
            email: None,
            wins: 0,
            losses: 0,
            draws: 0,
            last_active: now,
            created_at: now,
            updated_at: now,
        };
        state.next_player_id += 1;
        state.players.insert(username.to_string(), player.clone());

        debug!(username = %username, player_id = player.id, "Created player in memory");
        Ok((player, true))
    }

    #[instrument(skip(self, round))]
    async fn record_round(
        &self,
        player_id: i32,
        round: &NewSession,
    ) -> Result<(Player, GameSession), AppError> {
        let mut state = self.inner.lock().unwrap();
        let now = Utc::now();

        let player = state
            .players
            .values_mut()
            .find(|p| p.id == player_id)
            .ok_or_else(|| AppError::NotFound("Player not found".to_string()))?;

        match round.result {
            Outcome::Win => player.wins += 1,
            Outcome::Lose => player.losses += 1,
            Outcome::Draw => player.draws += 1,
        }
        player.last_active = now;
        player.updated_at = now;
        let updated = player.clone();

        let session = GameSession {
            id: state.next_session_id,
            player_id,
            player_choice: round.player_choice,
            computer_choice: round.computer_choice,
            result: round.result,
            session_duration: round.session_duration,
            created_at: now,
        };
        state.next_session_id += 1;
        state.sessions.push(session.clone());

        debug!(
            player_id = player_id,
            session_id = session.id,
            result = %round.result,
            "Recorded round in memory"
        );
        Ok((updated, session))
    }

    #[instrument(skip(self))]
    async fn leaderboard(&self, limit: i64) -> Result<Vec<Player>, AppError> {
        let state = self.inner.lock().unwrap();
        let mut players: Vec<Player> = state.players.values().cloned().collect();
        players.sort_by(|a, b| {
            b.wins
                .cmp(&a.wins)
                .then(a.losses.cmp(&b.losses))
                .then(a.draws.cmp(&b.draws))
        });
        players.truncate(limit as usize);
        Ok(players)
    }

    #[instrument(skip(self))]
    async fn recent_sessions(
        &self,
        player_id: i32,
        limit: i64,
    ) -> Result<Vec<GameSession>, AppError> {
        let state = self.inner.lock().unwrap();
        // Sessions are appended in order, so newest are at the back
        let sessions = state
            .sessions
            .iter()
            .rev()
            .filter(|s| s.player_id == player_id)
            .take(limit as usize)
            .cloned()
            .collect();
        Ok(sessions)
    }

    #[instrument(skip(self))]
    async fn session_results(&self, player_id: i32) -> Result<Vec<Outcome>, AppError> {
        let state = self.inner.lock().unwrap();
        let results = state
            .sessions
            .iter()
            .rev()
            .filter(|s| s.player_id == player_id)
            .map(|s| s.result)
            .collect();
        Ok(results)
    }

    #[instrument(skip(self))]
    async fn session_page(
        &self,
        player_id: i32,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<GameSession>, i64), AppError> {
        let state = self.inner.lock().unwrap();
        let newest_first: Vec<GameSession> = state
            .sessions
            .iter()
            .rev()
            .filter(|s| s.player_id == player_id)
            .cloned()
            .collect();
        let total = newest_first.len() as i64;
        let page = newest_first
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }
}

const PLAYER_COLUMNS: &str =
    "id, username, email, wins, losses, draws, last_active, created_at, updated_at";

/// PostgreSQL implementation of the game repository, over the `players`
/// and `game_sessions` tables
pub struct PostgresGameRepository {
    pool: PgPool,
}

impl PostgresGameRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn player_from_row(row: &PgRow) -> Player {
    Player {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        wins: row.get("wins"),
        losses: row.get("losses"),
        draws: row.get("draws"),
        last_active: row.get("last_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn session_from_row(row: &PgRow) -> Result<GameSession, AppError> {
    let player_choice: String = row.get("player_choice");
    let computer_choice: String = row.get("computer_choice");
    let result: String = row.get("result");
    Ok(GameSession {
        id: row.get("id"),
        player_id: row.get("player_id"),
        player_choice: parse_enum(&player_choice)?,
        computer_choice: parse_enum(&computer_choice)?,
        result: parse_enum(&result)?,
        session_duration: row.get("session_duration"),
        created_at: row.get("created_at"),
    })
}

fn parse_enum<T: std::str::FromStr>(value: &str) -> Result<T, AppError> {
    value
        .parse()
        .map_err(|_| AppError::DatabaseError(format!("Unexpected stored value: {value}")))
}

#[async_trait]
impl GameRepository for PostgresGameRepository {
    #[instrument(skip(self))]
    async fn find_player(&self, username: &str) -> Result<Option<Player>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {PLAYER_COLUMNS} FROM players WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, username = %username, "Failed to fetch player");
            AppError::DatabaseError(e.to_string())
        })?;

        Ok(row.as_ref().map(player_from_row))
    }

    #[instrument(skip(self))]
    async fn find_or_create_player(&self, username: &str) -> Result<(Player, bool), AppError> {
        // Single conditional insert; losing a first-submission race just
        // falls through to the fetch below
        let inserted = sqlx::query(&format!(
            "INSERT INTO players (username) VALUES ($1) \
             ON CONFLICT (username) DO NOTHING RETURNING {PLAYER_COLUMNS}"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, username = %username, "Failed to create player");
            AppError::DatabaseError(e.to_string())
        })?;

        if let Some(row) = inserted {
            debug!(username = %username, "Created player in database");
            return Ok((player_from_row(&row), true));
        }

        let player = self
            .find_player(username)
            .await?
            .ok_or_else(|| AppError::DatabaseError("Player vanished after upsert".to_string()))?;
        Ok((player, false))
    }

    #[instrument(skip(self, round))]
    async fn record_round(
        &self,
        player_id: i32,
        round: &NewSession,
    ) -> Result<(Player, GameSession), AppError> {
        // Counter increment and session insert commit together, so the
        // aggregate can never diverge from the session log
        let mut tx = self.pool.begin().await.map_err(|e| {
            warn!(error = %e, "Failed to begin transaction");
            AppError::DatabaseError(e.to_string())
        })?;

        let counter = match round.result {
            Outcome::Win => "wins",
            Outcome::Lose => "losses",
            Outcome::Draw => "draws",
        };
        let row = sqlx::query(&format!(
            "UPDATE players SET {counter} = {counter} + 1, last_active = NOW(), \
             updated_at = NOW() WHERE id = $1 RETURNING {PLAYER_COLUMNS}"
        ))
        .bind(player_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            warn!(error = %e, player_id = player_id, "Failed to increment player counter");
            AppError::DatabaseError(e.to_string())
        })?
        .ok_or_else(|| AppError::NotFound("Player not found".to_string()))?;
        let player = player_from_row(&row);

        let session_row = sqlx::query(
            "INSERT INTO game_sessions \
             (player_id, player_choice, computer_choice, result, session_duration) \
             VALUES ($1, $2, $3, $4, $5) RETURNING id, created_at",
        )
        .bind(player_id)
        .bind(round.player_choice.to_string())
        .bind(round.computer_choice.to_string())
        .bind(round.result.to_string())
        .bind(round.session_duration)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            warn!(error = %e, player_id = player_id, "Failed to append game session");
            AppError::DatabaseError(e.to_string())
        })?;

        tx.commit().await.map_err(|e| {
            warn!(error = %e, "Failed to commit round");
            AppError::DatabaseError(e.to_string())
        })?;

        let session = GameSession {
            id: session_row.get("id"),
            player_id,
            player_choice: round.player_choice,
            computer_choice: round.computer_choice,
            result: round.result,
            session_duration: round.session_duration,
            created_at: session_row.get("created_at"),
        };

        debug!(
            player_id = player_id,
            session_id = session.id,
            result = %round.result,
            "Recorded round in database"
        );
        Ok((player, session))
    }

    #[instrument(skip(self))]
    async fn leaderboard(&self, limit: i64) -> Result<Vec<Player>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {PLAYER_COLUMNS} FROM players \
             ORDER BY wins DESC, losses ASC, draws ASC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to fetch leaderboard");
            AppError::DatabaseError(e.to_string())
        })?;

        Ok(rows.iter().map(player_from_row).collect())
    }

    #[instrument(skip(self))]
    async fn recent_sessions(
        &self,
        player_id: i32,
        limit: i64,
    ) -> Result<Vec<GameSession>, AppError> {
        let rows = sqlx::query(
            "SELECT id, player_id, player_choice, computer_choice, result, \
             session_duration, created_at FROM game_sessions \
             WHERE player_id = $1 ORDER BY created_at DESC, id DESC LIMIT $2",
        )
        .bind(player_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, player_id = player_id, "Failed to fetch recent sessions");
            AppError::DatabaseError(e.to_string())
        })?;

        rows.iter().map(session_from_row).collect()
    }

    #[instrument(skip(self))]
    async fn session_results(&self, player_id: i32) -> Result<Vec<Outcome>, AppError> {
        let rows = sqlx::query(
            "SELECT result FROM game_sessions WHERE player_id = $1 \
             ORDER BY created_at DESC, id DESC",
        )
        .bind(player_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, player_id = player_id, "Failed to fetch session results");
            AppError::DatabaseError(e.to_string())
        })?;

        rows.iter()
            .map(|row| {
                let result: String = row.get("result");
                parse_enum(&result)
            })
            .collect()
    }

    #[instrument(skip(self))]
    async fn session_page(
        &self,
        player_id: i32,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<GameSession>, i64), AppError> {
        let total: i64 = sqlx::query("SELECT COUNT(*) AS count FROM game_sessions WHERE player_id = $1")
            .bind(player_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, player_id = player_id, "Failed to count sessions");
                AppError::DatabaseError(e.to_string())
            })?
            .get("count");

        let rows = sqlx::query(
            "SELECT id, player_id, player_choice, computer_choice, result, \
             session_duration, created_at FROM game_sessions \
             WHERE player_id = $1 ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3",
        )
        .bind(player_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, player_id = player_id, "Failed to fetch session page");
            AppError::DatabaseError(e.to_string())
        })?;

        let sessions = rows
            .iter()
            .map(session_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((sessions, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::outcome::Choice;

    fn round(player: Choice, computer: Choice, result: Outcome) -> NewSession {
        NewSession {
            player_choice: player,
            computer_choice: computer,
            result,
            session_duration: Some(12),
        }
    }

    fn winning_round() -> NewSession {
        round(Choice::Rock, Choice::Scissors, Outcome::Win)
    }

    fn losing_round() -> NewSession {
        round(Choice::Rock, Choice::Paper, Outcome::Lose)
    }

    #[tokio::test]
    async fn find_or_create_is_idempotent_per_username() {
        let repo = InMemoryGameRepository::new();

        let (first, created) = repo.find_or_create_player("alice").await.unwrap();
        assert!(created);
        assert_eq!(first.wins, 0);

        let (second, created) = repo.find_or_create_player("alice").await.unwrap();
        assert!(!created);
        assert_eq!(second.id, first.id);
        assert_eq!(repo.player_count(), 1);
    }

    #[tokio::test]
    async fn record_round_increments_matching_counter() {
        let repo = InMemoryGameRepository::new();
        let (player, _) = repo.find_or_create_player("bob").await.unwrap();

        let (after_win, session) = repo.record_round(player.id, &winning_round()).await.unwrap();
        assert_eq!(after_win.wins, 1);
        assert_eq!(after_win.losses, 0);
        assert_eq!(session.player_id, player.id);
        assert_eq!(session.result, Outcome::Win);

        let (after_loss, _) = repo.record_round(player.id, &losing_round()).await.unwrap();
        assert_eq!(after_loss.wins, 1);
        assert_eq!(after_loss.losses, 1);
        assert_eq!(after_loss.total_games(), 2);
    }

    #[tokio::test]
    async fn record_round_for_unknown_player_is_not_found() {
        let repo = InMemoryGameRepository::new();
        let result = repo.record_round(999, &winning_round()).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn leaderboard_prefers_fewer_losses_on_equal_wins() {
        let repo = InMemoryGameRepository::new();

        let (a, _) = repo.find_or_create_player("player_a").await.unwrap();
        let (b, _) = repo.find_or_create_player("player_b").await.unwrap();
        for _ in 0..5 {
            repo.record_round(a.id, &winning_round()).await.unwrap();
            repo.record_round(b.id, &winning_round()).await.unwrap();
        }
        repo.record_round(a.id, &losing_round()).await.unwrap();

        let board = repo.leaderboard(10).await.unwrap();
        assert_eq!(board[0].username, "player_b");
        assert_eq!(board[1].username, "player_a");
    }

    #[tokio::test]
    async fn leaderboard_respects_limit() {
        let repo = InMemoryGameRepository::new();
        for name in ["p1", "p2", "p3"] {
            repo.find_or_create_player(name).await.unwrap();
        }

        let board = repo.leaderboard(2).await.unwrap();
        assert_eq!(board.len(), 2);
    }

    #[tokio::test]
    async fn sessions_are_returned_newest_first() {
        let repo = InMemoryGameRepository::new();
        let (player, _) = repo.find_or_create_player("carol").await.unwrap();

        repo.record_round(player.id, &losing_round()).await.unwrap();
        repo.record_round(player.id, &winning_round()).await.unwrap();

        let recent = repo.recent_sessions(player.id, 10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].result, Outcome::Win);
        assert_eq!(recent[1].result, Outcome::Lose);

        let results = repo.session_results(player.id).await.unwrap();
        assert_eq!(results, vec![Outcome::Win, Outcome::Lose]);
    }

    #[tokio::test]
    async fn session_page_reports_total_across_pages() {
        let repo = InMemoryGameRepository::new();
        let (player, _) = repo.find_or_create_player("dave").await.unwrap();
        for _ in 0..5 {
            repo.record_round(player.id, &winning_round()).await.unwrap();
        }

        let (first_page, total) = repo.session_page(player.id, 2, 0).await.unwrap();
        assert_eq!(first_page.len(), 2);
        assert_eq!(total, 5);

        let (last_page, total) = repo.session_page(player.id, 2, 4).await.unwrap();
        assert_eq!(last_page.len(), 1);
        assert_eq!(total, 5);
    }
}
