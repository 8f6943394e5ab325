//! Identifier types: hashed row ids, player ids and the character stats key.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// A deterministic row ID derived from content hash.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(String);

impl EntityId {
    /// Create a new EntityId from a hash string.
    pub fn new(hash: String) -> Self {
        Self(hash)
    }

    /// Generate an EntityId from input fields.
    /// Uses SHA256 and takes the first 16 characters for brevity.
    pub fn generate(fields: &[&str]) -> Self {
        let mut hasher = Sha256::new();
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                hasher.update(b"|");
            }
            hasher.update(field.as_bytes());
        }
        let hash = hex::encode(hasher.finalize());
        Self(hash[..16].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Ladder-assigned player identifier (the replay feed's `user_id`).
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PlayerId({})", self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for PlayerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// In-game character code, e.g. `"8"` for Kazuya.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CharacterId(String);

impl CharacterId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CharacterId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Composite key of a player's character stats: one row per character per
/// game version.
///
/// Ordered by character id first, then game version, which is the iteration
/// order of [`crate::models::Player::character_stats`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CharacterStatsId {
    pub character_id: CharacterId,
    pub game_version: i32,
}

impl CharacterStatsId {
    pub fn new(character_id: impl Into<CharacterId>, game_version: i32) -> Self {
        Self {
            character_id: character_id.into(),
            game_version,
        }
    }
}

/// Type alias for past player name row IDs
pub type PastPlayerNameId = EntityId;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_generation_deterministic() {
        let id1 = EntityId::generate(&["player-1", "Arslan Ash"]);
        let id2 = EntityId::generate(&["player-1", "Arslan Ash"]);
        assert_eq!(id1, id2);
    }

    #[test]
    fn test_entity_id_different_inputs() {
        let id1 = EntityId::generate(&["player-1", "Arslan Ash"]);
        let id2 = EntityId::generate(&["player-1", "Knee"]);
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_entity_id_field_separator() {
        // "ab|c" and "a|bc" must not collide
        let id1 = EntityId::generate(&["ab", "c"]);
        let id2 = EntityId::generate(&["a", "bc"]);
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_entity_id_hex_format() {
        let id = EntityId::generate(&["test"]);
        assert_eq!(id.as_str().len(), 16);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_player_id_serializes_as_plain_string() {
        let id = PlayerId::from("3BfrQ7eN");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"3BfrQ7eN\"");
        assert_eq!(format!("{}", id), "3BfrQ7eN");
        assert!(format!("{:?}", id).contains("3BfrQ7eN"));
    }

    #[test]
    fn test_character_stats_id_ordering() {
        let mut keys = vec![
            CharacterStatsId::new("8", 10901),
            CharacterStatsId::new("12", 10801),
            CharacterStatsId::new("8", 10801),
        ];
        keys.sort();

        assert_eq!(keys[0], CharacterStatsId::new("12", 10801));
        assert_eq!(keys[1], CharacterStatsId::new("8", 10801));
        assert_eq!(keys[2], CharacterStatsId::new("8", 10901));
    }
}
