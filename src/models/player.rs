//! Player aggregate.
//!
//! A [`Player`] exclusively owns its name history and its character stats.
//! Storage persists those collections as separate tables but always loads,
//! saves and deletes them together with the player.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{CharacterId, CharacterStats, CharacterStatsId, PastPlayerName, PlayerId};
use crate::enums::EnumsMapper;

/// Placeholder shown when a player has no character stats.
pub const NO_CHARACTER_DATA: &str = "No Character Data";

/// Placeholder rank shown alongside [`NO_CHARACTER_DATA`].
pub const NO_RANK: &str = "N/A";

/// Display names of a player's main character and its dan rank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MainCharacterInfo {
    pub character_name: String,
    pub dan_rank: String,
}

impl MainCharacterInfo {
    /// The "no data" sentinel pair.
    pub fn none() -> Self {
        Self {
            character_name: NO_CHARACTER_DATA.to_string(),
            dan_rank: NO_RANK.to_string(),
        }
    }

    pub fn is_none(&self) -> bool {
        self.character_name == NO_CHARACTER_DATA
    }
}

/// A ladder player.
///
/// Two players are equal when their `player_id`s are equal, whatever the
/// rest of their state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    /// Unique identifier
    pub player_id: PlayerId,

    /// Current display name
    pub name: String,

    /// Platform identifier
    pub polaris_id: String,

    /// Power rating from the most recent battle
    pub tekken_power: i64,

    pub region_id: Option<i32>,

    pub area_id: Option<i32>,

    pub language: Option<String>,

    /// Unix timestamp (seconds) of the most recent battle, 0 when unknown
    pub latest_battle: i64,

    /// Names used before `name`, unique by name
    #[serde(skip)]
    pub player_names: Vec<PastPlayerName>,

    /// Ranked stats keyed by (character, game version)
    #[serde(skip)]
    pub character_stats: BTreeMap<CharacterStatsId, CharacterStats>,
}

impl Player {
    /// Create a player with no battles recorded.
    pub fn new(player_id: impl Into<PlayerId>, name: String, polaris_id: String) -> Self {
        Self {
            player_id: player_id.into(),
            name,
            polaris_id,
            tekken_power: 0,
            region_id: None,
            area_id: None,
            language: None,
            latest_battle: 0,
            player_names: Vec::new(),
            character_stats: BTreeMap::new(),
        }
    }

    /// Builder method to set the region and area.
    pub fn with_region(mut self, region_id: i32, area_id: i32) -> Self {
        self.region_id = Some(region_id);
        self.area_id = Some(area_id);
        self
    }

    pub fn with_language(mut self, language: String) -> Self {
        self.language = Some(language);
        self
    }

    pub fn with_tekken_power(mut self, tekken_power: i64) -> Self {
        self.tekken_power = tekken_power;
        self
    }

    pub fn with_latest_battle(mut self, latest_battle: i64) -> Self {
        self.latest_battle = latest_battle;
        self
    }

    /// Set the power rating, unless `battle_time` is older than the latest
    /// recorded battle.
    pub fn update_tekken_power(&mut self, new_power: i64, battle_time: i64) {
        if battle_time >= self.latest_battle {
            self.tekken_power = new_power;
        }
    }

    /// Recompute `latest_battle` from the character stats (0 when empty).
    pub fn refresh_latest_battle(&mut self) {
        self.latest_battle = self
            .character_stats
            .values()
            .map(|stats| stats.latest_battle)
            .max()
            .unwrap_or(0);
    }

    /// Insert or replace a stats entry under its own key.
    pub fn insert_character_stats(&mut self, stats: CharacterStats) {
        self.character_stats.insert(stats.id(), stats);
    }

    /// Record a ranked result for a character, creating its entry if needed.
    pub fn record_character_result(
        &mut self,
        character_id: CharacterId,
        game_version: i32,
        won: bool,
        dan_rank: i32,
        battle_at: i64,
    ) {
        let key = CharacterStatsId::new(character_id.clone(), game_version);
        self.character_stats
            .entry(key)
            .or_insert_with(|| CharacterStats::new(character_id, game_version))
            .record_result(won, dan_rank, battle_at);
    }

    /// Whether `name` appears in the name history.
    pub fn has_player_name(&self, name: &str) -> bool {
        self.player_names.iter().any(|past| past.name == name)
    }

    /// Adopt `new_name`, moving the current name into the history.
    ///
    /// Returns false when the name is unchanged.
    pub fn rename(&mut self, new_name: &str, battle_at: i64) -> bool {
        if self.name == new_name {
            return false;
        }

        let old_name = std::mem::replace(&mut self.name, new_name.to_string());
        if !old_name.is_empty() && !self.has_player_name(&old_name) {
            self.player_names.push(PastPlayerName::new(
                self.player_id.clone(),
                old_name,
                battle_at,
            ));
        }
        true
    }

    /// The player's main character and the dan rank it reached.
    ///
    /// Picks the highest dan rank across all entries, then among the
    /// characters holding that rank the one with the most matches summed
    /// over every game version. Equal match counts go to the smallest
    /// character id.
    pub fn main_character(&self) -> Option<(CharacterId, i32)> {
        let highest_dan_rank = self.character_stats.values().map(|s| s.dan_rank).max()?;

        let mut total_matches: BTreeMap<&CharacterId, u64> = BTreeMap::new();
        for (key, stats) in &self.character_stats {
            *total_matches.entry(&key.character_id).or_default() += stats.total_matches();
        }

        self.character_stats
            .iter()
            .filter(|(_, stats)| stats.dan_rank == highest_dan_rank)
            .map(|(key, _)| &key.character_id)
            .max_by_key(|id| (total_matches.get(id).copied().unwrap_or(0), Reverse(*id)))
            .map(|id| (id.clone(), highest_dan_rank))
    }

    /// Display names of the main character and its rank.
    ///
    /// Codes the mapper does not know are shown as-is.
    pub fn most_played_character_info(&self, mapper: &dyn EnumsMapper) -> MainCharacterInfo {
        let Some((character_id, dan_rank)) = self.main_character() else {
            return MainCharacterInfo::none();
        };

        let character_name = mapper.character_name(&character_id).unwrap_or_else(|| {
            warn!("Unknown character id {} for {}", character_id, self.player_id);
            character_id.to_string()
        });
        let dan_rank = mapper.dan_name(dan_rank).unwrap_or_else(|| {
            warn!("Unknown dan rank {} for {}", dan_rank, self.player_id);
            dan_rank.to_string()
        });

        MainCharacterInfo {
            character_name,
            dan_rank,
        }
    }
}

impl PartialEq for Player {
    fn eq(&self, other: &Self) -> bool {
        self.player_id == other.player_id
    }
}

impl Eq for Player {}

impl Hash for Player {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.player_id.hash(state);
    }
}
