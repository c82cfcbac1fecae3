/*
 *  Copyright 2025-2026 Colliery Software
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! Per-puzzle archive of known-good solutions.
//!
//! Each puzzle lives in `<dir>/<questionId>.json`. Records are rewritten
//! through a temporary file in the same directory and renamed into place, so
//! a crash mid-write never leaves a truncated record behind. Read-modify-write
//! cycles on one archive (and its clones) are serialized.

use parking_lot::Mutex;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::StoreError;
use crate::models::{Puzzle, PuzzleRecord, Solution};

/// Directory-backed archive of [`PuzzleRecord`]s plus the sighting ledger.
#[derive(Debug, Clone)]
pub struct SolutionArchive {
    dir: PathBuf,
    ledger_path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl SolutionArchive {
    /// Opens the archive rooted at `dir`, creating it if needed.
    pub fn open(dir: impl Into<PathBuf>, ledger_path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;
        Ok(Self {
            dir,
            ledger_path: ledger_path.into(),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the record for `question_id`. Characters outside
    /// `[A-Za-z0-9_-]` are replaced so ids can never escape the directory.
    pub fn record_path(&self, question_id: &str) -> PathBuf {
        let file_stem: String = question_id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.json", file_stem))
    }

    pub fn exists(&self, question_id: &str) -> bool {
        self.record_path(question_id).is_file()
    }

    /// Reads the record for `question_id`, if one was saved.
    pub fn load(&self, question_id: &str) -> Result<Option<PuzzleRecord>, StoreError> {
        let path = self.record_path(question_id);
        if !path.is_file() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).map_err(|e| StoreError::io(&path, e))?;
        let record = serde_json::from_str(&content).map_err(|e| StoreError::serialization(&path, e))?;
        Ok(Some(record))
    }

    /// Atomically writes `record`, replacing any previous version.
    pub fn save(&self, record: &PuzzleRecord) -> Result<(), StoreError> {
        let path = self.record_path(&record.question_id);
        let content =
            serde_json::to_string_pretty(record).map_err(|e| StoreError::serialization(&path, e))?;

        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(|e| StoreError::io(&self.dir, e))?;
        tmp.write_all(content.as_bytes())
            .and_then(|_| tmp.as_file().sync_data())
            .map_err(|e| StoreError::io(tmp.path(), e))?;
        tmp.persist(&path)
            .map_err(|e| StoreError::io(&path, e.error))?;

        debug!(
            question_id = %record.question_id,
            solutions = record.solutions.len(),
            "Saved puzzle record"
        );
        Ok(())
    }

    /// Saves a fresh record for `puzzle` unless one already exists.
    ///
    /// Returns `true` if a new record was written.
    pub fn create_if_absent(&self, puzzle: &Puzzle) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock();
        if self.exists(&puzzle.question_id) {
            return Ok(false);
        }
        self.save(&PuzzleRecord::from_puzzle(puzzle))?;
        Ok(true)
    }

    /// Number of archived solutions for `question_id`, `None` if unknown.
    pub fn solution_count(&self, question_id: &str) -> Result<Option<usize>, StoreError> {
        Ok(self.load(question_id)?.map(|record| record.solutions.len()))
    }

    /// Merges `incoming` into the record by code text and persists the
    /// result only when something new was added.
    ///
    /// A missing record is started from scratch. Returns the number of
    /// solutions appended.
    pub fn merge_solutions(
        &self,
        question_id: &str,
        incoming: Vec<Solution>,
    ) -> Result<usize, StoreError> {
        let _guard = self.write_lock.lock();
        let mut record = self
            .load(question_id)?
            .unwrap_or_else(|| PuzzleRecord::empty(question_id));
        let added = record.merge_solutions(incoming);
        if added > 0 {
            self.save(&record)?;
        }
        Ok(added)
    }

    /// Appends a `handle-questionId` line to the sighting ledger.
    pub fn record_sighting(&self, public_handle: &str, question_id: &str) -> Result<(), StoreError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.ledger_path)
            .map_err(|e| StoreError::io(&self.ledger_path, e))?;
        file.write_all(format!("{}-{}\n", public_handle, question_id).as_bytes())
            .map_err(|e| StoreError::io(&self.ledger_path, e))
    }

    /// Lists every archived puzzle with its solution count, sorted by id.
    pub fn summary(&self) -> Result<Vec<(String, usize)>, StoreError> {
        let entries = fs::read_dir(&self.dir).map_err(|e| StoreError::io(&self.dir, e))?;
        let mut summary = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| StoreError::io(&self.dir, e))?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let content = fs::read_to_string(&path).map_err(|e| StoreError::io(&path, e))?;
            let record: PuzzleRecord =
                serde_json::from_str(&content).map_err(|e| StoreError::serialization(&path, e))?;
            summary.push((record.question_id, record.solutions.len()));
        }
        summary.sort();
        Ok(summary)
    }
}
