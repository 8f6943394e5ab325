//! Filesystem persistence for ladder data.
//!
//! Every table is a JSONL file under `<data_dir>/tables/`. [`LadderStore`]
//! holds the tables in memory, serves the repository traits and rewrites
//! the files on each committed transaction.

mod jsonl;
mod repository;
mod store;

pub use jsonl::*;
pub use repository::*;
pub use store::*;

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("Storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("{entity} references missing player {player_id}")]
    ForeignKey {
        entity: &'static str,
        player_id: String,
    },
}

/// Configuration for storage paths.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl StorageConfig {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn tables_dir(&self) -> PathBuf {
        self.data_dir.join("tables")
    }

    /// Path of a table file.
    pub fn table_path(&self, table: Table) -> PathBuf {
        self.tables_dir().join(table.filename())
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::new(PathBuf::from("./data"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_config_paths() {
        let config = StorageConfig::new(PathBuf::from("/data"));

        assert_eq!(config.tables_dir(), PathBuf::from("/data/tables"));
        assert_eq!(
            config.table_path(Table::Players),
            PathBuf::from("/data/tables/players.jsonl")
        );
    }

    #[test]
    fn test_storage_config_default() {
        let config = StorageConfig::default();
        assert_eq!(config.data_dir, PathBuf::from("./data"));
    }

    #[test]
    fn test_error_messages() {
        let err = StorageError::NotFound {
            entity: "player",
            id: "p1".to_string(),
        };
        assert_eq!(err.to_string(), "player not found: p1");

        let err = StorageError::ForeignKey {
            entity: "player name",
            player_id: "p9".to_string(),
        };
        assert_eq!(err.to_string(), "player name references missing player p9");
    }
}
