use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::models::NewSession;
use super::outcome::decide;
use super::repository::GameRepository;
use super::streaks;
use super::types::{
    HistoryData, Pagination, PlayerStatsData, PlayerSummary, SubmitGameData,
};
use crate::shared::AppError;

pub const DEFAULT_LEADERBOARD_LIMIT: i64 = 10;
pub const DEFAULT_HISTORY_LIMIT: i64 = 20;
pub const RECENT_GAMES_LIMIT: i64 = 10;

/// Service for recording rounds and answering aggregate queries
pub struct GameService {
    repository: Arc<dyn GameRepository>,
}

impl GameService {
    pub fn new(repository: Arc<dyn GameRepository>) -> Self {
        Self { repository }
    }

    /// Records one finished round: find-or-create the player, bump the
    /// matching counter, append the session, return refreshed aggregates.
    #[instrument(skip(self, round))]
    pub async fn submit_result(
        &self,
        username: &str,
        round: NewSession,
    ) -> Result<SubmitGameData, AppError> {
        // The client computes the outcome; the submitted result is
        // recorded as-is, a disagreement with the choices is only logged
        let expected = decide(round.player_choice, round.computer_choice);
        if expected != round.result {
            warn!(
                submitted = %round.result,
                expected = %expected,
                "Submitted result does not match choices"
            );
        }

        let (player, is_new_user) = self.repository.find_or_create_player(username).await?;
        let (player, game_session) = self.repository.record_round(player.id, &round).await?;

        info!(
            username = %player.username,
            result = %round.result,
            is_new_user = is_new_user,
            total_games = player.total_games(),
            "Round recorded"
        );

        Ok(SubmitGameData {
            user: PlayerSummary::from(&player),
            game_session,
            is_new_user,
        })
    }

    /// Players ranked by wins, ties broken toward fewer losses then fewer
    /// draws. A missing or non-positive limit falls back to the default.
    #[instrument(skip(self))]
    pub async fn get_leaderboard(
        &self,
        limit: Option<i64>,
    ) -> Result<Vec<PlayerSummary>, AppError> {
        let limit = match limit {
            Some(l) if l > 0 => l,
            _ => DEFAULT_LEADERBOARD_LIMIT,
        };
        let players = self.repository.leaderboard(limit).await?;
        debug!(entries = players.len(), "Fetched leaderboard");
        Ok(players.iter().map(PlayerSummary::from).collect())
    }

    /// Aggregates, the 10 most recent sessions, and streak info
    #[instrument(skip(self))]
    pub async fn get_player_stats(&self, username: &str) -> Result<PlayerStatsData, AppError> {
        let player = self
            .repository
            .find_player(username)
            .await?
            .ok_or_else(|| AppError::NotFound("Player not found".to_string()))?;

        let recent_games = self
            .repository
            .recent_sessions(player.id, RECENT_GAMES_LIMIT)
            .await?;
        let results = self.repository.session_results(player.id).await?;
        let streaks = streaks::calculate(&results);

        Ok(PlayerStatsData {
            player: PlayerSummary::from(&player),
            created_at: player.created_at,
            updated_at: player.updated_at,
            recent_games,
            streaks,
        })
    }

    /// One page of a player's session log, newest first
    #[instrument(skip(self))]
    pub async fn get_player_history(
        &self,
        username: &str,
        page: Option<i64>,
        limit: Option<i64>,
    ) -> Result<HistoryData, AppError> {
        let page = page.filter(|p| *p > 0).unwrap_or(1);
        let limit = limit.filter(|l| *l > 0).unwrap_or(DEFAULT_HISTORY_LIMIT);

        let player = self
            .repository
            .find_player(username)
            .await?
            .ok_or_else(|| AppError::NotFound("Player not found".to_string()))?;

        // page and limit come straight from the query string; saturate
        // instead of overflowing on absurd values
        let offset = (page - 1).saturating_mul(limit);
        let (games, total) = self.repository.session_page(player.id, limit, offset).await?;
        let pages = if total == 0 { 0 } else { (total - 1) / limit + 1 };

        Ok(HistoryData {
            games,
            pagination: Pagination {
                total,
                page,
                limit,
                pages,
            },
        })
    }
}
