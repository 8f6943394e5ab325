//! Repository traits.
//!
//! Callers depend on these rather than on [`super::LadderStore`] directly.

use async_trait::async_trait;

use super::StorageError;
use crate::models::{
    Battle, CharacterStats, CharacterStatsId, PastPlayerName, PastPlayerNameId, Player, PlayerId,
};

/// Player aggregates, loaded and stored together with their owned rows.
#[async_trait]
pub trait PlayerRepository: Send + Sync {
    /// Insert or replace a player together with its names and stats.
    ///
    /// Owned rows missing from the aggregate are deleted.
    async fn save(&self, player: &Player) -> Result<(), StorageError>;

    async fn find_by_id(&self, player_id: &PlayerId) -> Result<Option<Player>, StorageError>;

    async fn find_all(&self) -> Result<Vec<Player>, StorageError>;

    async fn exists_by_id(&self, player_id: &PlayerId) -> Result<bool, StorageError>;

    /// Delete a player and every row it owns. Returns false if absent.
    async fn delete_by_id(&self, player_id: &PlayerId) -> Result<bool, StorageError>;

    async fn count(&self) -> Result<usize, StorageError>;
}

/// Historical player names.
#[async_trait]
pub trait PastPlayerNamesRepository: Send + Sync {
    /// Insert or replace a name row. The owning player must exist.
    async fn save(&self, name: &PastPlayerName) -> Result<(), StorageError>;

    async fn find_by_id(&self, id: &PastPlayerNameId)
        -> Result<Option<PastPlayerName>, StorageError>;

    async fn find_all(&self) -> Result<Vec<PastPlayerName>, StorageError>;

    async fn find_by_player(&self, player_id: &PlayerId)
        -> Result<Vec<PastPlayerName>, StorageError>;

    async fn exists_by_id(&self, id: &PastPlayerNameId) -> Result<bool, StorageError>;

    async fn delete_by_id(&self, id: &PastPlayerNameId) -> Result<bool, StorageError>;

    async fn count(&self) -> Result<usize, StorageError>;
}

/// Per-character stats rows.
#[async_trait]
pub trait CharacterStatsRepository: Send + Sync {
    /// Insert or replace a stats row. The owning player must exist.
    async fn save(&self, player_id: &PlayerId, stats: &CharacterStats) -> Result<(), StorageError>;

    async fn find_by_id(
        &self,
        player_id: &PlayerId,
        id: &CharacterStatsId,
    ) -> Result<Option<CharacterStats>, StorageError>;

    async fn find_by_player(&self, player_id: &PlayerId)
        -> Result<Vec<CharacterStats>, StorageError>;

    /// Every row with its owning player.
    async fn find_all(&self) -> Result<Vec<(PlayerId, CharacterStats)>, StorageError>;

    async fn delete_by_id(
        &self,
        player_id: &PlayerId,
        id: &CharacterStatsId,
    ) -> Result<bool, StorageError>;

    async fn count(&self) -> Result<usize, StorageError>;
}

/// Ingested battle reports.
#[async_trait]
pub trait BattleRepository: Send + Sync {
    async fn exists_by_id(&self, battle_id: &str) -> Result<bool, StorageError>;

    async fn find_by_id(&self, battle_id: &str) -> Result<Option<Battle>, StorageError>;

    async fn count(&self) -> Result<usize, StorageError>;
}
