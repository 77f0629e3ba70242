use serde::Serialize;

use super::outcome::Outcome;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StreakSummary {
    pub current_streak: u32,
    pub longest_win_streak: u32,
}

/// Derives streak info from a player's results ordered newest first.
///
/// The current streak is the contiguous run of non-lose results ending at
/// the most recent session; it stops accumulating at the first lose. The
/// longest win streak scans the entire history for the longest contiguous
/// run of wins.
pub fn calculate(results: &[Outcome]) -> StreakSummary {
    let mut current_streak = 0;
    let mut longest_win_streak = 0;
    let mut win_run = 0;
    let mut lose_seen = false;

    for result in results {
        match result {
            Outcome::Win => {
                win_run += 1;
                longest_win_streak = longest_win_streak.max(win_run);
                if !lose_seen {
                    current_streak += 1;
                }
            }
            Outcome::Draw => {
                win_run = 0;
                if !lose_seen {
                    current_streak += 1;
                }
            }
            Outcome::Lose => {
                win_run = 0;
                lose_seen = true;
            }
        }
    }

    StreakSummary {
        current_streak,
        longest_win_streak,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::outcome::Outcome::{Draw, Lose, Win};

    #[test]
    fn empty_history_yields_zero_streaks() {
        assert_eq!(calculate(&[]), StreakSummary::default());
    }

    #[test]
    fn lose_ends_the_current_streak() {
        let summary = calculate(&[Win, Win, Lose, Win]);
        assert_eq!(summary.current_streak, 2);
        assert_eq!(summary.longest_win_streak, 2);
    }

    #[test]
    fn draws_extend_current_but_not_win_streak() {
        let summary = calculate(&[Draw, Win, Win]);
        assert_eq!(summary.current_streak, 3);
        assert_eq!(summary.longest_win_streak, 2);
    }

    #[test]
    fn longest_win_streak_can_predate_a_lose() {
        let summary = calculate(&[Lose, Win, Win, Win, Lose, Win]);
        assert_eq!(summary.current_streak, 0);
        assert_eq!(summary.longest_win_streak, 3);
    }

    #[test]
    fn all_losses_yield_zero() {
        assert_eq!(calculate(&[Lose, Lose, Lose]), StreakSummary::default());
    }
}
