//! Battle ingestion pipeline.
//!
//! Applies battle reports to both participants' player aggregates. A batch
//! is ingested in a single store transaction: either every accepted battle
//! lands or none does.

use std::collections::BTreeSet;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::config::IngestConfig;
use crate::models::{Battle, BattleSide, Player, PlayerId};
use crate::storage::{JsonlReader, LadderStore, StorageError, Tables};

/// Outcome of an ingestion batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestResult {
    pub battles_ingested: usize,
    pub duplicates_skipped: usize,
    pub unranked_skipped: usize,
    pub invalid_skipped: usize,
    pub players_created: usize,
    pub players_updated: usize,
}

/// Read a JSONL battle feed. Unparseable lines are skipped.
pub fn read_battles(path: &Path) -> Result<Vec<Battle>, StorageError> {
    let reader = JsonlReader::<Battle>::new(path.to_path_buf());
    if !reader.exists() {
        return Err(StorageError::PathNotFound(path.to_path_buf()));
    }
    reader.read_all()
}

/// Ingest a batch of battles.
///
/// Battles are applied oldest first. Battle ids already stored, or repeated
/// within the batch, are skipped.
pub async fn ingest_battles(
    store: &LadderStore,
    mut battles: Vec<Battle>,
    config: &IngestConfig,
) -> Result<IngestResult, StorageError> {
    battles.sort_by_key(|b| b.battle_at);
    let total = battles.len();

    let result = store
        .transaction(|tables| Ok(apply_battles(tables, battles, config)))
        .await?;

    info!(
        "Ingested {}/{} battles ({} duplicate, {} unranked, {} invalid); {} new players, {} updated",
        result.battles_ingested,
        total,
        result.duplicates_skipped,
        result.unranked_skipped,
        result.invalid_skipped,
        result.players_created,
        result.players_updated
    );
    Ok(result)
}

fn apply_battles(tables: &mut Tables, battles: Vec<Battle>, config: &IngestConfig) -> IngestResult {
    let mut result = IngestResult::default();
    let mut created: BTreeSet<PlayerId> = BTreeSet::new();
    let mut touched: BTreeSet<PlayerId> = BTreeSet::new();

    for battle in battles {
        if tables.has_battle(&battle.battle_id) {
            debug!("Skipping known battle {}", battle.battle_id);
            result.duplicates_skipped += 1;
            continue;
        }
        if config.ranked_only && !battle.is_ranked() {
            debug!("Skipping {:?} battle {}", battle.kind(), battle.battle_id);
            result.unranked_skipped += 1;
            continue;
        }
        if battle.winner != 1 && battle.winner != 2 {
            warn!(
                "Skipping battle {} with invalid winner {}",
                battle.battle_id, battle.winner
            );
            result.invalid_skipped += 1;
            continue;
        }

        for (side, won) in battle.sides() {
            if apply_side(tables, &battle, side, won) {
                created.insert(side.user_id.clone());
            }
            touched.insert(side.user_id.clone());
        }

        tables.put_battle(battle);
        result.battles_ingested += 1;
    }

    result.players_created = created.len();
    result.players_updated = touched.difference(&created).count();
    result
}

/// Apply one side of a battle. Returns true when the player was created.
fn apply_side(tables: &mut Tables, battle: &Battle, side: &BattleSide, won: bool) -> bool {
    let (mut player, created) = match tables.player(&side.user_id) {
        Some(player) => (player, false),
        None => (
            Player::new(side.user_id.clone(), side.name.clone(), side.polaris_id.clone()),
            true,
        ),
    };

    player.update_tekken_power(side.power, battle.battle_at);

    // Profile fields follow the newest battle only
    if battle.battle_at >= player.latest_battle {
        if player.rename(&side.name, battle.battle_at) {
            debug!("Player {} is now known as {}", player.player_id, player.name);
        }
        player.polaris_id = side.polaris_id.clone();
        if side.region_id.is_some() {
            player.region_id = side.region_id;
        }
        if side.area_id.is_some() {
            player.area_id = side.area_id;
        }
        if let Some(lang) = &side.lang {
            player.language = Some(lang.clone());
        }
    }

    player.record_character_result(
        side.chara_id.clone(),
        battle.game_version,
        won,
        side.rank,
        battle.battle_at,
    );
    player.refresh_latest_battle();

    tables.put_player(&player);
    created
}
