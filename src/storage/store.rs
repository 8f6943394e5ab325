//! In-memory ladder tables backed by JSONL files.

use std::collections::{BTreeMap, HashSet};
use std::ops::Bound;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::{
    BattleRepository, CharacterStatsRepository, JsonlReader, JsonlWriter,
    PastPlayerNamesRepository, PlayerRepository, StagedFile, StorageConfig, StorageError, Table,
};
use crate::models::{
    Battle, CharacterId, CharacterStats, CharacterStatsId, CharacterStatsRow, EntityId,
    PastPlayerName, PastPlayerNameId, Player, PlayerId,
};

type NameKey = (PlayerId, PastPlayerNameId);
type StatsKey = (PlayerId, CharacterStatsId);

/// The full set of ladder tables.
///
/// Player rows are kept without their owned collections; those live in
/// `player_names` and `character_stats` keyed by owning player first, so a
/// player's rows form one contiguous range. `name_owners` indexes name ids
/// back to their owner.
#[derive(Debug, Clone, Default)]
pub struct Tables {
    players: BTreeMap<PlayerId, Player>,
    player_names: BTreeMap<NameKey, PastPlayerName>,
    name_owners: BTreeMap<PastPlayerNameId, PlayerId>,
    character_stats: BTreeMap<StatsKey, CharacterStats>,
    battles: BTreeMap<String, Battle>,
    dirty: HashSet<Table>,
}

fn names_start(player_id: &PlayerId) -> Bound<NameKey> {
    Bound::Included((player_id.clone(), EntityId::new(String::new())))
}

fn stats_start(player_id: &PlayerId) -> Bound<StatsKey> {
    Bound::Included((
        player_id.clone(),
        CharacterStatsId::new(CharacterId::new(""), i32::MIN),
    ))
}

impl Tables {
    fn names_of<'a>(
        &'a self,
        player_id: &'a PlayerId,
    ) -> impl Iterator<Item = (&'a NameKey, &'a PastPlayerName)> + 'a {
        self.player_names
            .range((names_start(player_id), Bound::Unbounded))
            .take_while(move |((owner, _), _)| owner == player_id)
    }

    fn stats_of<'a>(
        &'a self,
        player_id: &'a PlayerId,
    ) -> impl Iterator<Item = (&'a StatsKey, &'a CharacterStats)> + 'a {
        self.character_stats
            .range((stats_start(player_id), Bound::Unbounded))
            .take_while(move |((owner, _), _)| owner == player_id)
    }

    fn assemble(&self, row: &Player) -> Player {
        let mut player = row.clone();
        player.player_names = self
            .names_of(&row.player_id)
            .map(|(_, name)| name.clone())
            .collect();
        player.player_names.sort_by_key(|name| name.recorded_at);
        player.character_stats = self
            .stats_of(&row.player_id)
            .map(|((_, key), stats)| (key.clone(), stats.clone()))
            .collect();
        player
    }

    /// Load a player aggregate.
    pub fn player(&self, player_id: &PlayerId) -> Option<Player> {
        self.players.get(player_id).map(|row| self.assemble(row))
    }

    /// Load every player aggregate, ordered by id.
    pub fn all_players(&self) -> Vec<Player> {
        self.players.values().map(|row| self.assemble(row)).collect()
    }

    pub fn contains_player(&self, player_id: &PlayerId) -> bool {
        self.players.contains_key(player_id)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Insert or replace a player aggregate; owned rows not present in the
    /// aggregate are removed.
    pub fn put_player(&mut self, player: &Player) {
        let player_id = player.player_id.clone();

        self.remove_owned_rows(&player_id);

        for name in &player.player_names {
            let mut name = name.clone();
            name.player_id = player_id.clone();
            self.insert_name(name);
        }
        for (key, stats) in &player.character_stats {
            self.character_stats
                .insert((player_id.clone(), key.clone()), stats.clone());
        }

        let mut row = player.clone();
        row.player_names.clear();
        row.character_stats.clear();
        self.players.insert(player_id, row);

        self.mark(&[Table::Players, Table::PlayerNames, Table::CharacterStats]);
    }

    /// Delete a player and all rows it owns.
    pub fn remove_player(&mut self, player_id: &PlayerId) -> bool {
        if self.players.remove(player_id).is_none() {
            return false;
        }
        let (names, stats) = self.remove_owned_rows(player_id);
        debug!(
            "Deleted player {} with {} names and {} stats rows",
            player_id, names, stats
        );
        self.mark(&[Table::Players, Table::PlayerNames, Table::CharacterStats]);
        true
    }

    fn remove_owned_rows(&mut self, player_id: &PlayerId) -> (usize, usize) {
        let name_keys: Vec<NameKey> = self.names_of(player_id).map(|(k, _)| k.clone()).collect();
        let stats_keys: Vec<StatsKey> = self.stats_of(player_id).map(|(k, _)| k.clone()).collect();

        for key in &name_keys {
            self.player_names.remove(key);
            self.name_owners.remove(&key.1);
        }
        for key in &stats_keys {
            self.character_stats.remove(key);
        }
        (name_keys.len(), stats_keys.len())
    }

    fn require_player(&self, entity: &'static str, player_id: &PlayerId) -> Result<(), StorageError> {
        if self.players.contains_key(player_id) {
            Ok(())
        } else {
            Err(StorageError::ForeignKey {
                entity,
                player_id: player_id.to_string(),
            })
        }
    }

    fn insert_name(&mut self, name: PastPlayerName) {
        if let Some(previous) = self
            .name_owners
            .insert(name.id.clone(), name.player_id.clone())
        {
            if previous != name.player_id {
                self.player_names.remove(&(previous, name.id.clone()));
            }
        }
        self.player_names
            .insert((name.player_id.clone(), name.id.clone()), name);
    }

    pub fn put_player_name(&mut self, name: &PastPlayerName) -> Result<(), StorageError> {
        self.require_player("player name", &name.player_id)?;
        self.insert_name(name.clone());
        self.mark(&[Table::PlayerNames]);
        Ok(())
    }

    pub fn player_name(&self, id: &PastPlayerNameId) -> Option<&PastPlayerName> {
        let owner = self.name_owners.get(id)?;
        self.player_names.get(&(owner.clone(), id.clone()))
    }

    pub fn player_names(&self) -> impl Iterator<Item = &PastPlayerName> {
        self.player_names.values()
    }

    pub fn player_names_of(&self, player_id: &PlayerId) -> Vec<PastPlayerName> {
        self.names_of(player_id).map(|(_, name)| name.clone()).collect()
    }

    pub fn remove_player_name(&mut self, id: &PastPlayerNameId) -> bool {
        match self.name_owners.remove(id) {
            Some(owner) => {
                self.player_names.remove(&(owner, id.clone()));
                self.mark(&[Table::PlayerNames]);
                true
            }
            None => false,
        }
    }

    pub fn put_character_stats(
        &mut self,
        player_id: &PlayerId,
        stats: &CharacterStats,
    ) -> Result<(), StorageError> {
        self.require_player("character stats", player_id)?;
        self.character_stats
            .insert((player_id.clone(), stats.id()), stats.clone());
        self.mark(&[Table::CharacterStats]);
        Ok(())
    }

    pub fn character_stats(&self, player_id: &PlayerId, id: &CharacterStatsId) -> Option<&CharacterStats> {
        self.character_stats.get(&(player_id.clone(), id.clone()))
    }

    pub fn character_stats_of(&self, player_id: &PlayerId) -> Vec<CharacterStats> {
        self.stats_of(player_id).map(|(_, stats)| stats.clone()).collect()
    }

    pub fn all_character_stats(&self) -> impl Iterator<Item = (&PlayerId, &CharacterStats)> {
        self.character_stats
            .iter()
            .map(|((player_id, _), stats)| (player_id, stats))
    }

    pub fn remove_character_stats(&mut self, player_id: &PlayerId, id: &CharacterStatsId) -> bool {
        let removed = self
            .character_stats
            .remove(&(player_id.clone(), id.clone()))
            .is_some();
        if removed {
            self.mark(&[Table::CharacterStats]);
        }
        removed
    }

    pub fn has_battle(&self, battle_id: &str) -> bool {
        self.battles.contains_key(battle_id)
    }

    pub fn battle(&self, battle_id: &str) -> Option<&Battle> {
        self.battles.get(battle_id)
    }

    pub fn battle_count(&self) -> usize {
        self.battles.len()
    }

    pub fn put_battle(&mut self, battle: Battle) {
        self.battles.insert(battle.battle_id.clone(), battle);
        self.mark(&[Table::Battles]);
    }

    fn mark(&mut self, tables: &[Table]) {
        self.dirty.extend(tables.iter().copied());
    }
}

/// Shared handle to the ladder tables.
///
/// Cloning is cheap; all clones see the same data. Reads take a shared lock,
/// transactions take the exclusive lock for their whole duration.
#[derive(Clone)]
pub struct LadderStore {
    config: Arc<StorageConfig>,
    tables: Arc<RwLock<Tables>>,
}

impl LadderStore {
    /// Load all tables from `config.tables_dir()`.
    ///
    /// Rows owned by a player that no longer exists are dropped.
    pub fn open(config: StorageConfig) -> Result<Self, StorageError> {
        let mut tables = Tables::default();

        for player in JsonlReader::<Player>::for_table(&config, Table::Players).read_all()? {
            tables.players.insert(player.player_id.clone(), player);
        }

        let mut orphans = 0;
        for name in JsonlReader::<PastPlayerName>::for_table(&config, Table::PlayerNames).read_all()? {
            if tables.contains_player(&name.player_id) {
                tables.insert_name(name);
            } else {
                orphans += 1;
            }
        }
        for row in JsonlReader::<CharacterStatsRow>::for_table(&config, Table::CharacterStats).read_all()? {
            if tables.contains_player(&row.player_id) {
                tables
                    .character_stats
                    .insert((row.player_id, row.stats.id()), row.stats);
            } else {
                orphans += 1;
            }
        }
        for battle in JsonlReader::<Battle>::for_table(&config, Table::Battles).read_all()? {
            tables.battles.insert(battle.battle_id.clone(), battle);
        }

        if orphans > 0 {
            warn!("Dropped {} rows owned by missing players", orphans);
            tables.mark(&[Table::PlayerNames, Table::CharacterStats]);
        }

        info!(
            "Opened ladder store at {:?}: {} players, {} stats rows, {} battles",
            config.tables_dir(),
            tables.players.len(),
            tables.character_stats.len(),
            tables.battles.len()
        );

        Ok(Self {
            config: Arc::new(config),
            tables: Arc::new(RwLock::new(tables)),
        })
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Run `f` against a consistent view of the tables.
    pub async fn read<R>(&self, f: impl FnOnce(&Tables) -> R) -> R {
        let tables = self.tables.read().await;
        f(&tables)
    }

    /// Run `f` against a copy of the tables and commit the result.
    ///
    /// On `Ok` every modified table is rewritten on disk before the new
    /// state becomes visible. On `Err` from `f`, or from writing any table,
    /// memory and table files are left as they were.
    pub async fn transaction<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&mut Tables) -> Result<T, StorageError>,
    {
        let mut guard = self.tables.write().await;
        let mut working = guard.clone();
        working.dirty.clear();

        let value = f(&mut working)?;

        if !working.dirty.is_empty() {
            let config = Arc::clone(&self.config);
            let mut committed = tokio::task::spawn_blocking(move || {
                persist(&config, &working).map(|()| working)
            })
            .await??;
            committed.dirty.clear();
            *guard = committed;
        }
        Ok(value)
    }

    /// Rewrite every table, regardless of what changed.
    pub async fn flush(&self) -> Result<(), StorageError> {
        let mut guard = self.tables.write().await;
        let mut snapshot = guard.clone();
        snapshot.mark(&Table::ALL);

        let config = Arc::clone(&self.config);
        tokio::task::spawn_blocking(move || persist(&config, &snapshot)).await??;
        guard.dirty.clear();
        Ok(())
    }

    pub fn players(&self) -> JsonlPlayerRepository {
        JsonlPlayerRepository(self.clone())
    }

    pub fn player_names(&self) -> JsonlPastPlayerNamesRepository {
        JsonlPastPlayerNamesRepository(self.clone())
    }

    pub fn character_stats(&self) -> JsonlCharacterStatsRepository {
        JsonlCharacterStatsRepository(self.clone())
    }

    pub fn battles(&self) -> JsonlBattleRepository {
        JsonlBattleRepository(self.clone())
    }
}

/// Write every dirty table.
///
/// All tables are staged to their `.tmp` files before any is renamed over its
/// table. If staging fails, the staged files are deleted and no table
/// changes.
fn persist(config: &StorageConfig, tables: &Tables) -> Result<(), StorageError> {
    let mut staged: Vec<StagedFile> = Vec::new();

    for table in Table::ALL {
        if !tables.dirty.contains(&table) {
            continue;
        }
        match stage_table(config, tables, table) {
            Ok(file) => staged.push(file),
            Err(e) => {
                warn!(
                    "Failed to write {}, discarding {} staged tables: {}",
                    table.filename(),
                    staged.len(),
                    e
                );
                for file in staged {
                    file.discard();
                }
                return Err(e);
            }
        }
    }

    let mut staged = staged.into_iter();
    while let Some(file) = staged.next() {
        if let Err(e) = file.commit() {
            for rest in staged.by_ref() {
                rest.discard();
            }
            return Err(e);
        }
    }
    Ok(())
}

fn stage_table(
    config: &StorageConfig,
    tables: &Tables,
    table: Table,
) -> Result<StagedFile, StorageError> {
    match table {
        Table::Players => {
            JsonlWriter::<Player>::for_table(config, table).stage(tables.players.values())
        }
        Table::PlayerNames => JsonlWriter::<PastPlayerName>::for_table(config, table)
            .stage(tables.player_names.values()),
        Table::CharacterStats => {
            let rows: Vec<CharacterStatsRow> = tables
                .character_stats
                .iter()
                .map(|((player_id, _), stats)| {
                    CharacterStatsRow::new(player_id.clone(), stats.clone())
                })
                .collect();
            JsonlWriter::<CharacterStatsRow>::for_table(config, table).stage(&rows)
        }
        Table::Battles => {
            JsonlWriter::<Battle>::for_table(config, table).stage(tables.battles.values())
        }
    }
}

/// [`PlayerRepository`] over a [`LadderStore`].
#[derive(Clone)]
pub struct JsonlPlayerRepository(LadderStore);

#[async_trait]
impl PlayerRepository for JsonlPlayerRepository {
    async fn save(&self, player: &Player) -> Result<(), StorageError> {
        debug!("Saving player {}", player.player_id);
        self.0
            .transaction(|tables| {
                tables.put_player(player);
                Ok(())
            })
            .await
    }

    async fn find_by_id(&self, player_id: &PlayerId) -> Result<Option<Player>, StorageError> {
        Ok(self.0.read(|tables| tables.player(player_id)).await)
    }

    async fn find_all(&self) -> Result<Vec<Player>, StorageError> {
        Ok(self.0.read(|tables| tables.all_players()).await)
    }

    async fn exists_by_id(&self, player_id: &PlayerId) -> Result<bool, StorageError> {
        Ok(self.0.read(|tables| tables.contains_player(player_id)).await)
    }

    async fn delete_by_id(&self, player_id: &PlayerId) -> Result<bool, StorageError> {
        let deleted = self
            .0
            .transaction(|tables| Ok(tables.remove_player(player_id)))
            .await?;
        if deleted {
            info!("Deleted player {}", player_id);
        }
        Ok(deleted)
    }

    async fn count(&self) -> Result<usize, StorageError> {
        Ok(self.0.read(|tables| tables.player_count()).await)
    }
}

/// [`PastPlayerNamesRepository`] over a [`LadderStore`].
#[derive(Clone)]
pub struct JsonlPastPlayerNamesRepository(LadderStore);

#[async_trait]
impl PastPlayerNamesRepository for JsonlPastPlayerNamesRepository {
    async fn save(&self, name: &PastPlayerName) -> Result<(), StorageError> {
        self.0.transaction(|tables| tables.put_player_name(name)).await
    }

    async fn find_by_id(
        &self,
        id: &PastPlayerNameId,
    ) -> Result<Option<PastPlayerName>, StorageError> {
        Ok(self.0.read(|tables| tables.player_name(id).cloned()).await)
    }

    async fn find_all(&self) -> Result<Vec<PastPlayerName>, StorageError> {
        Ok(self
            .0
            .read(|tables| tables.player_names().cloned().collect())
            .await)
    }

    async fn find_by_player(
        &self,
        player_id: &PlayerId,
    ) -> Result<Vec<PastPlayerName>, StorageError> {
        Ok(self.0.read(|tables| tables.player_names_of(player_id)).await)
    }

    async fn exists_by_id(&self, id: &PastPlayerNameId) -> Result<bool, StorageError> {
        Ok(self.0.read(|tables| tables.player_name(id).is_some()).await)
    }

    async fn delete_by_id(&self, id: &PastPlayerNameId) -> Result<bool, StorageError> {
        self.0
            .transaction(|tables| Ok(tables.remove_player_name(id)))
            .await
    }

    async fn count(&self) -> Result<usize, StorageError> {
        Ok(self.0.read(|tables| tables.player_names().count()).await)
    }
}

/// [`CharacterStatsRepository`] over a [`LadderStore`].
#[derive(Clone)]
pub struct JsonlCharacterStatsRepository(LadderStore);

#[async_trait]
impl CharacterStatsRepository for JsonlCharacterStatsRepository {
    async fn save(&self, player_id: &PlayerId, stats: &CharacterStats) -> Result<(), StorageError> {
        self.0
            .transaction(|tables| tables.put_character_stats(player_id, stats))
            .await
    }

    async fn find_by_id(
        &self,
        player_id: &PlayerId,
        id: &CharacterStatsId,
    ) -> Result<Option<CharacterStats>, StorageError> {
        Ok(self
            .0
            .read(|tables| tables.character_stats(player_id, id).cloned())
            .await)
    }

    async fn find_by_player(
        &self,
        player_id: &PlayerId,
    ) -> Result<Vec<CharacterStats>, StorageError> {
        Ok(self.0.read(|tables| tables.character_stats_of(player_id)).await)
    }

    async fn find_all(&self) -> Result<Vec<(PlayerId, CharacterStats)>, StorageError> {
        Ok(self
            .0
            .read(|tables| {
                tables
                    .all_character_stats()
                    .map(|(player_id, stats)| (player_id.clone(), stats.clone()))
                    .collect()
            })
            .await)
    }

    async fn delete_by_id(
        &self,
        player_id: &PlayerId,
        id: &CharacterStatsId,
    ) -> Result<bool, StorageError> {
        self.0
            .transaction(|tables| Ok(tables.remove_character_stats(player_id, id)))
            .await
    }

    async fn count(&self) -> Result<usize, StorageError> {
        Ok(self.0.read(|tables| tables.all_character_stats().count()).await)
    }
}

/// [`BattleRepository`] over a [`LadderStore`].
#[derive(Clone)]
pub struct JsonlBattleRepository(LadderStore);

#[async_trait]
impl BattleRepository for JsonlBattleRepository {
    async fn exists_by_id(&self, battle_id: &str) -> Result<bool, StorageError> {
        Ok(self.0.read(|tables| tables.has_battle(battle_id)).await)
    }

    async fn find_by_id(&self, battle_id: &str) -> Result<Option<Battle>, StorageError> {
        Ok(self.0.read(|tables| tables.battle(battle_id).cloned()).await)
    }

    async fn count(&self) -> Result<usize, StorageError> {
        Ok(self.0.read(|tables| tables.battle_count()).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_factories::{battle, player_with_stats, side};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn open(temp_dir: &TempDir) -> LadderStore {
        LadderStore::open(StorageConfig::new(temp_dir.path().to_path_buf())).unwrap()
    }

    fn renamed_player(id: &str) -> Player {
        let mut player = player_with_stats(id, Some(1), &[("8", 10, 5), ("6", 3, 3)]);
        player.rename("Current", 100);
        player
    }

    #[tokio::test]
    async fn test_save_and_find_player() {
        let temp_dir = TempDir::new().unwrap();
        let store = open(&temp_dir);
        let player = renamed_player("p1");

        store.players().save(&player).await.unwrap();

        let found = store
            .players()
            .find_by_id(&PlayerId::from("p1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.name, "Current");
        assert_eq!(found.player_names.len(), 1);
        assert_eq!(found.character_stats, player.character_stats);
        assert!(store.players().exists_by_id(&PlayerId::from("p1")).await.unwrap());
        assert!(store
            .players()
            .find_by_id(&PlayerId::from("nobody"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_reopen_sees_committed_state() {
        let temp_dir = TempDir::new().unwrap();
        {
            let store = open(&temp_dir);
            store.players().save(&renamed_player("p1")).await.unwrap();
            store.players().save(&renamed_player("p2")).await.unwrap();
        }

        let store = open(&temp_dir);
        assert_eq!(store.players().count().await.unwrap(), 2);
        assert_eq!(store.character_stats().count().await.unwrap(), 4);
        assert_eq!(store.player_names().count().await.unwrap(), 2);

        let p2 = store.players().find_by_id(&PlayerId::from("p2")).await.unwrap().unwrap();
        assert_eq!(p2.character_stats.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_player_cascades() {
        let temp_dir = TempDir::new().unwrap();
        let store = open(&temp_dir);
        store.players().save(&renamed_player("p1")).await.unwrap();
        store.players().save(&renamed_player("p2")).await.unwrap();

        assert!(store.players().delete_by_id(&PlayerId::from("p1")).await.unwrap());
        assert!(!store.players().delete_by_id(&PlayerId::from("p1")).await.unwrap());

        let p1 = PlayerId::from("p1");
        assert!(store.player_names().find_by_player(&p1).await.unwrap().is_empty());
        assert!(store.character_stats().find_by_player(&p1).await.unwrap().is_empty());
        assert_eq!(store.character_stats().count().await.unwrap(), 2);

        let reopened = open(&temp_dir);
        assert_eq!(reopened.players().count().await.unwrap(), 1);
        assert_eq!(reopened.character_stats().count().await.unwrap(), 2);
        assert_eq!(reopened.player_names().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_save_removes_orphaned_rows() {
        let temp_dir = TempDir::new().unwrap();
        let store = open(&temp_dir);
        let mut player = renamed_player("p1");
        store.players().save(&player).await.unwrap();

        player.character_stats.remove(&CharacterStatsId::new("6", 10901));
        player.player_names.clear();
        store.players().save(&player).await.unwrap();

        let stats = store
            .character_stats()
            .find_by_player(&PlayerId::from("p1"))
            .await
            .unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].character_id, CharacterId::from("8"));
        assert_eq!(store.player_names().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_player_names_crud() {
        let temp_dir = TempDir::new().unwrap();
        let store = open(&temp_dir);
        store
            .players()
            .save(&player_with_stats("p1", None, &[]))
            .await
            .unwrap();

        let name = PastPlayerName::new(PlayerId::from("p1"), "Old Name".to_string(), 42);
        store.player_names().save(&name).await.unwrap();

        let repo = store.player_names();
        assert_eq!(repo.find_by_id(&name.id).await.unwrap(), Some(name.clone()));
        assert!(repo.exists_by_id(&name.id).await.unwrap());
        assert_eq!(repo.find_all().await.unwrap(), vec![name.clone()]);

        assert!(repo.delete_by_id(&name.id).await.unwrap());
        assert!(!repo.delete_by_id(&name.id).await.unwrap());
        assert!(repo.find_by_id(&name.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_player_name_requires_player() {
        let temp_dir = TempDir::new().unwrap();
        let store = open(&temp_dir);

        let name = PastPlayerName::new(PlayerId::from("ghost"), "Boo".to_string(), 1);
        let err = store.player_names().save(&name).await.unwrap_err();

        assert!(matches!(err, StorageError::ForeignKey { .. }));
        assert_eq!(store.player_names().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_character_stats_crud() {
        let temp_dir = TempDir::new().unwrap();
        let store = open(&temp_dir);
        store
            .players()
            .save(&player_with_stats("p1", None, &[]))
            .await
            .unwrap();

        let p1 = PlayerId::from("p1");
        let stats = CharacterStats::new("8", 10901).with_record(7, 3);
        let repo = store.character_stats();
        repo.save(&p1, &stats).await.unwrap();

        assert_eq!(repo.find_by_id(&p1, &stats.id()).await.unwrap(), Some(stats.clone()));
        assert_eq!(repo.find_all().await.unwrap(), vec![(p1.clone(), stats.clone())]);

        // Stats saved through the row repository show up on the aggregate
        let player = store.players().find_by_id(&p1).await.unwrap().unwrap();
        assert_eq!(player.character_stats.len(), 1);

        assert!(repo.delete_by_id(&p1, &stats.id()).await.unwrap());
        assert_eq!(repo.count().await.unwrap(), 0);

        let err = repo.save(&PlayerId::from("ghost"), &stats).await.unwrap_err();
        assert!(matches!(err, StorageError::ForeignKey { .. }));
    }

    #[tokio::test]
    async fn test_failed_transaction_changes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let store = open(&temp_dir);

        let result: Result<(), StorageError> = store
            .transaction(|tables| {
                tables.put_player(&renamed_player("p1"));
                Err(StorageError::NotFound {
                    entity: "battle",
                    id: "b0".to_string(),
                })
            })
            .await;

        assert!(result.is_err());
        assert_eq!(store.players().count().await.unwrap(), 0);
        assert!(!store.config().table_path(Table::Players).exists());
    }

    #[tokio::test]
    async fn test_failed_table_write_changes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let store = open(&temp_dir);
        store.players().save(&renamed_player("p1")).await.unwrap();

        let players_path = store.config().table_path(Table::Players);
        let stats_path = store.config().table_path(Table::CharacterStats);
        let players_before = std::fs::read_to_string(&players_path).unwrap();
        let stats_before = std::fs::read_to_string(&stats_path).unwrap();

        // A directory in the way fails only the battles write
        let blocked = JsonlWriter::<Battle>::for_table(store.config(), Table::Battles).tmp_path();
        std::fs::create_dir_all(&blocked).unwrap();

        let b = battle(
            "b1",
            100,
            side("p2", "B", "8", 10, 1),
            side("p3", "C", "6", 10, 1),
            1,
        );
        let result = store
            .transaction(|tables| {
                tables.put_player(&renamed_player("p2"));
                tables.put_battle(b.clone());
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(StorageError::Io(_))));
        assert_eq!(store.players().count().await.unwrap(), 1);
        assert_eq!(store.battles().count().await.unwrap(), 0);
        assert_eq!(std::fs::read_to_string(&players_path).unwrap(), players_before);
        assert_eq!(std::fs::read_to_string(&stats_path).unwrap(), stats_before);
        assert!(!players_path.with_extension("jsonl.tmp").exists());
        assert!(!stats_path.with_extension("jsonl.tmp").exists());

        std::fs::remove_dir(&blocked).unwrap();
        let reopened = open(&temp_dir);
        assert_eq!(reopened.players().count().await.unwrap(), 1);
        assert_eq!(reopened.character_stats().count().await.unwrap(), 2);
        assert!(!reopened.battles().exists_by_id("b1").await.unwrap());
    }

    #[tokio::test]
    async fn test_name_lookup_by_id_follows_cascade() {
        let temp_dir = TempDir::new().unwrap();
        let store = open(&temp_dir);
        let player = renamed_player("p1");
        let name_id = player.player_names[0].id.clone();
        store.players().save(&player).await.unwrap();

        let found = store.player_names().find_by_id(&name_id).await.unwrap();
        assert_eq!(found.map(|n| n.player_id), Some(PlayerId::from("p1")));

        store.players().delete_by_id(&PlayerId::from("p1")).await.unwrap();
        assert!(!store.player_names().exists_by_id(&name_id).await.unwrap());
        assert!(!store.player_names().delete_by_id(&name_id).await.unwrap());

        // Reopened tables rebuild the index
        store.players().save(&player).await.unwrap();
        let reopened = open(&temp_dir);
        assert!(reopened.player_names().exists_by_id(&name_id).await.unwrap());
        assert!(reopened.player_names().delete_by_id(&name_id).await.unwrap());
        assert_eq!(reopened.player_names().count().await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_transactions_all_commit() {
        let temp_dir = TempDir::new().unwrap();
        let store = open(&temp_dir);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .players()
                        .save(&renamed_player(&format!("p{}", i)))
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.players().count().await.unwrap(), 8);
        let reopened = open(&temp_dir);
        assert_eq!(reopened.players().count().await.unwrap(), 8);
        assert_eq!(reopened.character_stats().count().await.unwrap(), 16);
    }

    #[tokio::test]
    async fn test_open_drops_orphan_rows() {
        let temp_dir = TempDir::new().unwrap();
        let config = StorageConfig::new(temp_dir.path().to_path_buf());
        JsonlWriter::<CharacterStatsRow>::for_table(&config, Table::CharacterStats)
            .write_all(&[CharacterStatsRow::new(
                PlayerId::from("ghost"),
                CharacterStats::new("8", 1),
            )])
            .unwrap();

        let store = LadderStore::open(config).unwrap();
        assert_eq!(store.character_stats().count().await.unwrap(), 0);

        store.flush().await.unwrap();
        let rows = JsonlReader::<CharacterStatsRow>::for_table(store.config(), Table::CharacterStats)
            .read_all()
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_battles_repository() {
        let temp_dir = TempDir::new().unwrap();
        let store = open(&temp_dir);
        let b = battle(
            "b1",
            100,
            side("p1", "A", "8", 10, 1),
            side("p2", "B", "6", 10, 1),
            1,
        );

        store
            .transaction(|tables| {
                tables.put_battle(b.clone());
                Ok(())
            })
            .await
            .unwrap();

        assert!(store.battles().exists_by_id("b1").await.unwrap());
        assert_eq!(store.battles().find_by_id("b1").await.unwrap(), Some(b));
        assert_eq!(store.battles().count().await.unwrap(), 1);
        assert!(!store.battles().exists_by_id("b2").await.unwrap());
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let temp_dir = TempDir::new().unwrap();
        let store = open(&temp_dir);
        let other = store.clone();

        store.players().save(&renamed_player("p1")).await.unwrap();
        assert_eq!(other.players().count().await.unwrap(), 1);
    }
}
