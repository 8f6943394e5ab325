//! JSONL (JSON Lines) storage.
//!
//! Each line is a valid JSON object representing one row.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use super::{StorageConfig, StorageError};

/// Tables of the ladder store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Players,
    PlayerNames,
    CharacterStats,
    Battles,
}

impl Table {
    pub const ALL: [Table; 4] = [
        Table::Players,
        Table::PlayerNames,
        Table::CharacterStats,
        Table::Battles,
    ];

    /// Get the filename for this table.
    pub fn filename(&self) -> &'static str {
        match self {
            Table::Players => "players.jsonl",
            Table::PlayerNames => "player_names.jsonl",
            Table::CharacterStats => "character_stats.jsonl",
            Table::Battles => "battles.jsonl",
        }
    }
}

/// JSONL file writer.
pub struct JsonlWriter<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T: Serialize> JsonlWriter<T> {
    /// Create a new JSONL writer for the given path.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    /// Create a writer for a table.
    pub fn for_table(config: &StorageConfig, table: Table) -> Self {
        Self::new(config.table_path(table))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ensure the parent directory exists.
    fn ensure_dir(&self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Path of the sibling file rows are staged in.
    pub fn tmp_path(&self) -> PathBuf {
        self.path.with_extension("jsonl.tmp")
    }

    /// Write rows to the sibling `.tmp` file without touching the table.
    ///
    /// The returned [`StagedFile`] replaces the table on
    /// [`StagedFile::commit`]. If writing fails, the partial `.tmp` file is
    /// removed.
    pub fn stage<'a, I>(&self, rows: I) -> Result<StagedFile, StorageError>
    where
        I: IntoIterator<Item = &'a T>,
        T: 'a,
    {
        self.ensure_dir()?;

        let tmp_path = self.tmp_path();
        match write_rows(&tmp_path, rows) {
            Ok(rows) => Ok(StagedFile {
                tmp_path,
                path: self.path.clone(),
                rows,
            }),
            Err(e) => {
                // The tmp path may be something we did not create
                if tmp_path.is_file() {
                    let _ = fs::remove_file(&tmp_path);
                }
                Err(e)
            }
        }
    }

    /// Write rows, replacing the entire file.
    ///
    /// Rows go to a sibling `.tmp` file first which is then renamed over the
    /// target, so a reader never sees a half-written table.
    pub fn write_all<'a, I>(&self, rows: I) -> Result<usize, StorageError>
    where
        I: IntoIterator<Item = &'a T>,
        T: 'a,
    {
        self.stage(rows)?.commit()
    }
}

fn write_rows<'a, T, I>(tmp_path: &Path, rows: I) -> Result<usize, StorageError>
where
    T: Serialize + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let file = File::create(tmp_path)?;
    let mut writer = BufWriter::new(file);
    let mut count = 0;

    for row in rows {
        let json = serde_json::to_string(row)?;
        writeln!(writer, "{}", json)?;
        count += 1;
    }

    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(count)
}

/// A fully written `.tmp` file waiting to replace its table.
#[must_use = "a staged file must be committed or discarded"]
#[derive(Debug)]
pub struct StagedFile {
    tmp_path: PathBuf,
    path: PathBuf,
    rows: usize,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Rename the staged file over the table. Returns the row count.
    pub fn commit(self) -> Result<usize, StorageError> {
        fs::rename(&self.tmp_path, &self.path)?;
        debug!("Wrote {} rows to {:?}", self.rows, self.path);
        Ok(self.rows)
    }

    /// Delete the staged file, leaving the table as it was.
    pub fn discard(self) {
        if let Err(e) = fs::remove_file(&self.tmp_path) {
            warn!("Failed to remove staged file {:?}: {}", self.tmp_path, e);
        }
    }
}

/// JSONL file reader.
pub struct JsonlReader<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T: DeserializeOwned> JsonlReader<T> {
    /// Create a new JSONL reader for the given path.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    /// Create a reader for a table.
    pub fn for_table(config: &StorageConfig, table: Table) -> Self {
        Self::new(config.table_path(table))
    }

    /// Check if the file exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read all rows from the file. A missing file reads as empty.
    pub fn read_all(&self) -> Result<Vec<T>, StorageError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        let mut rows = Vec::new();

        for (index, line) in reader.lines().enumerate() {
            let line = line?;

            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str(&line) {
                Ok(row) => rows.push(row),
                Err(e) => {
                    warn!(
                        "Failed to parse line {} in {:?}: {}",
                        index + 1,
                        self.path,
                        e
                    );
                }
            }
        }

        debug!("Read {} rows from {:?}", rows.len(), self.path);
        Ok(rows)
    }
}
