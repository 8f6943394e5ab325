//! Display-name lookup for character codes and dan ranks.
//!
//! Reporting code depends on the [`EnumsMapper`] trait so tests and callers
//! can substitute their own tables. [`StaticEnumsMapper`] carries the built-in
//! roster and can be extended from a TOML file:
//!
//! ```toml
//! [characters]
//! "45" = "New Fighter"
//!
//! [dan_ranks]
//! "30" = "Tekken God Prime"
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::models::CharacterId;

/// Errors loading name tables.
#[derive(Debug, Error)]
pub enum EnumsError {
    #[error("Failed to read name tables: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse name tables: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Translates ladder codes into human-readable names.
pub trait EnumsMapper: Send + Sync {
    /// Display name of a character, `None` for unknown codes.
    fn character_name(&self, character_id: &CharacterId) -> Option<String>;

    /// Display name of a dan rank, `None` for unknown ranks.
    fn dan_name(&self, dan_rank: i32) -> Option<String>;
}

const CHARACTERS: &[(&str, &str)] = &[
    ("0", "Paul"),
    ("1", "Law"),
    ("2", "King"),
    ("3", "Yoshimitsu"),
    ("4", "Hwoarang"),
    ("5", "Xiaoyu"),
    ("6", "Jin"),
    ("7", "Bryan"),
    ("8", "Kazuya"),
    ("9", "Steve"),
    ("10", "Jack-8"),
    ("11", "Asuka"),
    ("12", "Devil Jin"),
    ("13", "Feng"),
    ("14", "Lili"),
    ("15", "Dragunov"),
    ("16", "Leo"),
    ("17", "Lars"),
    ("18", "Alisa"),
    ("19", "Claudio"),
    ("20", "Shaheen"),
    ("21", "Nina"),
    ("22", "Lee"),
    ("23", "Kuma"),
    ("24", "Panda"),
    ("28", "Zafina"),
    ("29", "Leroy"),
    ("32", "Jun"),
    ("33", "Reina"),
    ("34", "Azucena"),
    ("35", "Victor"),
    ("36", "Raven"),
    ("38", "Eddy"),
    ("39", "Lidia"),
    ("40", "Heihachi"),
    ("41", "Clive"),
    ("42", "Anna"),
    ("43", "Fahkumram"),
    ("44", "Armor King"),
];

const DAN_RANKS: &[&str] = &[
    "Beginner",
    "1st Dan",
    "2nd Dan",
    "Fighter",
    "Strategist",
    "Combatant",
    "Brawler",
    "Ranger",
    "Cavalry",
    "Warrior",
    "Assailant",
    "Dominator",
    "Vanquisher",
    "Destroyer",
    "Eliminator",
    "Garyu",
    "Shinryu",
    "Tenryu",
    "Mighty Ruler",
    "Flame Ruler",
    "Battle Ruler",
    "Fujin",
    "Raijin",
    "Kishin",
    "Bushin",
    "Tekken King",
    "Tekken Emperor",
    "Tekken God",
    "Tekken God Supreme",
    "God of Destruction",
];

/// Override tables as read from disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NameTables {
    #[serde(default)]
    pub characters: BTreeMap<String, String>,

    #[serde(default)]
    pub dan_ranks: BTreeMap<String, String>,
}

/// Table-backed [`EnumsMapper`].
#[derive(Debug, Clone)]
pub struct StaticEnumsMapper {
    characters: BTreeMap<String, String>,
    dan_ranks: BTreeMap<i32, String>,
}

impl Default for StaticEnumsMapper {
    fn default() -> Self {
        let characters = CHARACTERS
            .iter()
            .map(|(id, name)| (id.to_string(), name.to_string()))
            .collect();
        let dan_ranks = DAN_RANKS
            .iter()
            .enumerate()
            .map(|(rank, name)| (rank as i32, name.to_string()))
            .collect();

        Self {
            characters,
            dan_ranks,
        }
    }
}

impl StaticEnumsMapper {
    /// Built-in tables extended by `tables`; entries in `tables` win.
    ///
    /// Dan rank keys that are not integers are ignored.
    pub fn with_overrides(mut self, tables: NameTables) -> Self {
        self.characters.extend(tables.characters);
        for (rank, name) in tables.dan_ranks {
            match rank.trim().parse::<i32>() {
                Ok(rank) => {
                    self.dan_ranks.insert(rank, name);
                }
                Err(_) => warn!("Ignoring non-numeric dan rank key {:?}", rank),
            }
        }
        self
    }

    /// Built-in tables extended from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, EnumsError> {
        let contents = std::fs::read_to_string(path)?;
        let tables: NameTables = toml::from_str(&contents)?;
        info!(
            "Loaded {} character and {} dan rank overrides from {:?}",
            tables.characters.len(),
            tables.dan_ranks.len(),
            path
        );
        Ok(Self::default().with_overrides(tables))
    }
}

impl EnumsMapper for StaticEnumsMapper {
    fn character_name(&self, character_id: &CharacterId) -> Option<String> {
        self.characters.get(character_id.as_str()).cloned()
    }

    fn dan_name(&self, dan_rank: i32) -> Option<String> {
        self.dan_ranks.get(&dan_rank).cloned()
    }
}
