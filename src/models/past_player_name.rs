//! Historical display names.

use serde::{Deserialize, Serialize};

use super::{EntityId, PastPlayerNameId, PlayerId};

/// A name a player used before their current one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PastPlayerName {
    /// Unique identifier (derived from player_id + name)
    pub id: PastPlayerNameId,

    /// Owning player
    pub player_id: PlayerId,

    pub name: String,

    /// Battle time at which the name was replaced
    pub recorded_at: i64,
}

impl PastPlayerName {
    /// Create a new PastPlayerName with auto-generated ID.
    pub fn new(player_id: PlayerId, name: String, recorded_at: i64) -> Self {
        let id = EntityId::generate(&[player_id.as_str(), &name]);
        Self {
            id,
            player_id,
            name,
            recorded_at,
        }
    }
}
