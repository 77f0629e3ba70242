use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// A hand thrown by either side of a round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Choice {
    Rock,
    Paper,
    Scissors,
}

impl Choice {
    /// True when `self` beats `other` under the fixed cycle:
    /// rock beats scissors, scissors beats paper, paper beats rock
    pub fn beats(self, other: Choice) -> bool {
        matches!(
            (self, other),
            (Choice::Rock, Choice::Scissors)
                | (Choice::Scissors, Choice::Paper)
                | (Choice::Paper, Choice::Rock)
        )
    }
}

/// The result of a round from the player's perspective
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Outcome {
    Win,
    Lose,
    Draw,
}

/// Pure, total outcome rule. Invalid choice strings are rejected at the
/// request boundary before this is reached.
pub fn decide(player: Choice, computer: Choice) -> Outcome {
    if player == computer {
        Outcome::Draw
    } else if player.beats(computer) {
        Outcome::Win
    } else {
        Outcome::Lose
    }
}
