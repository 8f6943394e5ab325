//! Per-character, per-version ranked statistics.

use serde::{Deserialize, Serialize};

use super::{CharacterId, CharacterStatsId, PlayerId};

/// Ranked record of one character in one game version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterStats {
    /// Character code
    pub character_id: CharacterId,

    /// Game version the battles were played on (e.g. 10901)
    pub game_version: i32,

    pub wins: u32,

    pub losses: u32,

    /// Dan rank reached in the most recent battle
    pub dan_rank: i32,

    /// Unix timestamp (seconds) of the most recent battle
    pub latest_battle: i64,
}

impl CharacterStats {
    /// Create an empty record for a character and version.
    pub fn new(character_id: impl Into<CharacterId>, game_version: i32) -> Self {
        Self {
            character_id: character_id.into(),
            game_version,
            wins: 0,
            losses: 0,
            dan_rank: 0,
            latest_battle: 0,
        }
    }

    pub fn with_record(mut self, wins: u32, losses: u32) -> Self {
        self.wins = wins;
        self.losses = losses;
        self
    }

    pub fn with_dan_rank(mut self, dan_rank: i32) -> Self {
        self.dan_rank = dan_rank;
        self
    }

    pub fn with_latest_battle(mut self, latest_battle: i64) -> Self {
        self.latest_battle = latest_battle;
        self
    }

    /// Composite key of this record.
    pub fn id(&self) -> CharacterStatsId {
        CharacterStatsId::new(self.character_id.clone(), self.game_version)
    }

    /// Wins plus losses.
    pub fn total_matches(&self) -> u64 {
        u64::from(self.wins) + u64::from(self.losses)
    }

    /// Record one battle result.
    ///
    /// Counters always move. The dan rank and latest battle only move forward
    /// in time, so a late report cannot roll the rank back.
    pub fn record_result(&mut self, won: bool, dan_rank: i32, battle_at: i64) {
        if won {
            self.wins = self.wins.saturating_add(1);
        } else {
            self.losses = self.losses.saturating_add(1);
        }

        if battle_at >= self.latest_battle {
            self.dan_rank = dan_rank;
            self.latest_battle = battle_at;
        }
    }
}

/// Storage row: a [`CharacterStats`] tagged with its owning player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterStatsRow {
    pub player_id: PlayerId,

    #[serde(flatten)]
    pub stats: CharacterStats,
}

impl CharacterStatsRow {
    pub fn new(player_id: PlayerId, stats: CharacterStats) -> Self {
        Self { player_id, stats }
    }
}
