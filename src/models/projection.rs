//! Read-only leaderboard shapes. Computed on demand, never persisted.

use serde::{Deserialize, Serialize};

use super::CharacterId;

/// Per-region character popularity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopularCharacterProjection {
    pub region_id: i32,
    pub character_id: CharacterId,
    pub total_wins: u64,
    pub total_losses: u64,
    pub total_battles: u64,
    /// 0 to 100
    pub winrate_percentage: f64,
}

/// Region-independent win-rate ranking row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterWinRate {
    pub character_id: CharacterId,
    pub total_wins: u64,
    pub total_losses: u64,
    pub total_battles: u64,
    /// 0 to 100
    pub winrate_percentage: f64,
    /// Distinct players with at least one battle on the character
    pub player_count: u32,
}
