//! Core data models for the ladder tracker.

mod battle;
mod character_stats;
mod ids;
mod past_player_name;
mod player;
mod projection;

pub use battle::*;
pub use character_stats::*;
pub use ids::*;
pub use past_player_name::*;
pub use player::*;
pub use projection::*;

#[cfg(test)]
pub(crate) mod test_factories;
