//! Builders shared by tests across the crate.

use super::{Battle, BattleSide, CharacterId, CharacterStats, Player, PlayerId, RANKED_BATTLE};

pub fn side(user_id: &str, name: &str, chara_id: &str, rank: i32, power: i64) -> BattleSide {
    BattleSide {
        user_id: PlayerId::from(user_id),
        polaris_id: format!("polaris-{}", user_id),
        name: name.to_string(),
        chara_id: CharacterId::from(chara_id),
        rank,
        power,
        region_id: Some(1),
        area_id: Some(3),
        lang: Some("en".to_string()),
        rounds: 3,
    }
}

pub fn battle(id: &str, battle_at: i64, p1: BattleSide, p2: BattleSide, winner: u8) -> Battle {
    Battle {
        battle_id: id.to_string(),
        battle_at,
        battle_type: RANKED_BATTLE,
        game_version: 10901,
        stage_id: Some(100),
        winner,
        p1,
        p2,
    }
}

/// A player in `region_id` with one stats entry per `(character, wins, losses)`.
pub fn player_with_stats(id: &str, region_id: Option<i32>, entries: &[(&str, u32, u32)]) -> Player {
    let mut player = Player::new(id, format!("name-{}", id), format!("polaris-{}", id));
    player.region_id = region_id;
    for (character, wins, losses) in entries {
        player.insert_character_stats(
            CharacterStats::new(*character, 10901)
                .with_record(*wins, *losses)
                .with_dan_rank(10),
        );
    }
    player
}
