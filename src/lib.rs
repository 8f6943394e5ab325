//! # Tekken Stats
//!
//! A local statistics tracker for a fighting-game ranked ladder.
//!
//! ## Architecture
//!
//! - **models**: Players, character stats, name history, battles, projections
//! - **enums**: Character and dan rank display names
//! - **storage**: JSONL tables, repositories and transactions
//! - **ingest**: Applies battle reports to player aggregates
//! - **calculate**: Leaderboard aggregation
//! - **config**: Configuration loading and validation

pub mod calculate;
pub mod config;
pub mod enums;
pub mod ingest;
pub mod models;
pub mod storage;

pub use models::*;
