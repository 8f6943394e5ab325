//! Battle reports from the ladder replay feed.

use serde::{Deserialize, Serialize};

use super::{CharacterId, PlayerId};

/// Battle type code for ranked matches.
pub const RANKED_BATTLE: i32 = 2;

/// Kind of match a battle was played in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BattleType {
    Quick,
    Ranked,
    Group,
    Player,
    Unknown(i32),
}

impl BattleType {
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => BattleType::Quick,
            RANKED_BATTLE => BattleType::Ranked,
            3 => BattleType::Group,
            4 => BattleType::Player,
            other => BattleType::Unknown(other),
        }
    }
}

/// One participant of a battle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleSide {
    pub user_id: PlayerId,
    pub polaris_id: String,
    pub name: String,
    pub chara_id: CharacterId,
    /// Dan rank after the battle
    pub rank: i32,
    /// Power rating after the battle
    pub power: i64,
    #[serde(default)]
    pub region_id: Option<i32>,
    #[serde(default)]
    pub area_id: Option<i32>,
    #[serde(default)]
    pub lang: Option<String>,
    #[serde(default)]
    pub rounds: u32,
}

/// A single battle report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Battle {
    pub battle_id: String,
    /// Unix timestamp (seconds)
    pub battle_at: i64,
    pub battle_type: i32,
    pub game_version: i32,
    #[serde(default)]
    pub stage_id: Option<i32>,
    /// 1 when `p1` won, 2 when `p2` won
    pub winner: u8,
    pub p1: BattleSide,
    pub p2: BattleSide,
}

impl Battle {
    pub fn kind(&self) -> BattleType {
        BattleType::from_code(self.battle_type)
    }

    pub fn is_ranked(&self) -> bool {
        self.kind() == BattleType::Ranked
    }

    /// Both sides paired with whether they won.
    pub fn sides(&self) -> [(&BattleSide, bool); 2] {
        [(&self.p1, self.winner == 1), (&self.p2, self.winner == 2)]
    }
}
