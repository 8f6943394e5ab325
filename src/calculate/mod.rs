//! Leaderboard calculations.
//!
//! Derives read-only projections from player aggregates:
//! - Character popularity per region
//! - Character win-rate rankings across regions

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use crate::models::{CharacterId, CharacterWinRate, Player, PopularCharacterProjection};

/// Which stats rows feed a leaderboard.
#[derive(Debug, Clone, Default)]
pub struct LeaderboardFilter {
    /// Only rows of this game version
    pub game_version: Option<i32>,

    /// Only players from this region
    pub region_id: Option<i32>,

    /// Win-rate rankings drop characters with fewer battles
    pub min_battles: u64,
}

impl LeaderboardFilter {
    pub fn with_game_version(mut self, game_version: i32) -> Self {
        self.game_version = Some(game_version);
        self
    }

    pub fn with_region(mut self, region_id: i32) -> Self {
        self.region_id = Some(region_id);
        self
    }

    pub fn with_min_battles(mut self, min_battles: u64) -> Self {
        self.min_battles = min_battles;
        self
    }

    fn accepts_player(&self, player: &Player) -> bool {
        match self.region_id {
            Some(region) => player.region_id == Some(region),
            None => true,
        }
    }

    fn accepts_version(&self, game_version: i32) -> bool {
        self.game_version.map_or(true, |v| v == game_version)
    }
}

/// Win rate as a percentage (0 to 100). Zero battles yields 0.
pub fn calculate_win_rate_percentage(wins: u64, battles: u64) -> f64 {
    if battles == 0 {
        0.0
    } else {
        wins as f64 / battles as f64 * 100.0
    }
}

#[derive(Debug, Default)]
struct Totals {
    wins: u64,
    losses: u64,
}

impl Totals {
    fn battles(&self) -> u64 {
        self.wins + self.losses
    }
}

/// Character popularity per region.
///
/// Players without a region are left out. Rows are ordered by region, then
/// by battles (most first), then by character id.
pub fn popular_characters(
    players: &[Player],
    filter: &LeaderboardFilter,
) -> Vec<PopularCharacterProjection> {
    let mut groups: BTreeMap<(i32, &CharacterId), Totals> = BTreeMap::new();

    for player in players.iter().filter(|p| filter.accepts_player(p)) {
        let Some(region_id) = player.region_id else {
            continue;
        };
        for (key, stats) in &player.character_stats {
            if !filter.accepts_version(key.game_version) {
                continue;
            }
            let totals = groups.entry((region_id, &key.character_id)).or_default();
            totals.wins += u64::from(stats.wins);
            totals.losses += u64::from(stats.losses);
        }
    }

    let mut rows: Vec<PopularCharacterProjection> = groups
        .into_iter()
        .filter(|(_, totals)| totals.battles() > 0)
        .map(|((region_id, character_id), totals)| PopularCharacterProjection {
            region_id,
            character_id: character_id.clone(),
            total_wins: totals.wins,
            total_losses: totals.losses,
            total_battles: totals.battles(),
            winrate_percentage: calculate_win_rate_percentage(totals.wins, totals.battles()),
        })
        .collect();

    rows.sort_by(|a, b| {
        a.region_id
            .cmp(&b.region_id)
            .then_with(|| b.total_battles.cmp(&a.total_battles))
            .then_with(|| a.character_id.cmp(&b.character_id))
    });
    rows
}

/// The single most-played character of each region.
pub fn most_popular_by_region(
    players: &[Player],
    filter: &LeaderboardFilter,
) -> Vec<PopularCharacterProjection> {
    let mut rows = popular_characters(players, filter);
    rows.dedup_by_key(|row| row.region_id);
    rows
}

/// Character win-rate rankings.
///
/// Characters with fewer than `filter.min_battles` battles are dropped.
/// Ordered by win rate, then battles (both highest first), then character id.
pub fn character_win_rates(players: &[Player], filter: &LeaderboardFilter) -> Vec<CharacterWinRate> {
    let mut totals: BTreeMap<&CharacterId, Totals> = BTreeMap::new();
    let mut player_counts: BTreeMap<&CharacterId, u32> = BTreeMap::new();

    for player in players.iter().filter(|p| filter.accepts_player(p)) {
        let mut played = BTreeSet::new();
        for (key, stats) in &player.character_stats {
            if !filter.accepts_version(key.game_version) || stats.total_matches() == 0 {
                continue;
            }
            let entry = totals.entry(&key.character_id).or_default();
            entry.wins += u64::from(stats.wins);
            entry.losses += u64::from(stats.losses);
            played.insert(&key.character_id);
        }
        for character_id in played {
            *player_counts.entry(character_id).or_default() += 1;
        }
    }

    let mut rows: Vec<CharacterWinRate> = totals
        .into_iter()
        .filter(|(_, t)| t.battles() > 0 && t.battles() >= filter.min_battles)
        .map(|(character_id, t)| CharacterWinRate {
            character_id: character_id.clone(),
            total_wins: t.wins,
            total_losses: t.losses,
            total_battles: t.battles(),
            winrate_percentage: calculate_win_rate_percentage(t.wins, t.battles()),
            player_count: player_counts.get(character_id).copied().unwrap_or(0),
        })
        .collect();

    rows.sort_by(|a, b| {
        b.winrate_percentage
            .partial_cmp(&a.winrate_percentage)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.total_battles.cmp(&a.total_battles))
            .then_with(|| a.character_id.cmp(&b.character_id))
    });
    rows
}
