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

//! Append-only store of match handles that were already joined.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::StoreError;

/// Newline-delimited log of joined match handles.
///
/// The file is read once on [`open`](HandleStore::open) and then only ever
/// appended to. Handles are trimmed on both paths. A handle enters the
/// in-memory set as soon as [`add`](HandleStore::add) is called, even when
/// the append then fails, so a joined match is never joined again in the
/// same run.
pub struct HandleStore {
    path: PathBuf,
    seen: Mutex<HashSet<String>>,
}

impl HandleStore {
    /// Opens (or starts) the store at `path`, creating parent directories.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
            }
        }

        let seen: HashSet<String> = if path.exists() {
            fs::read_to_string(&path)
                .map_err(|e| StoreError::io(&path, e))?
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect()
        } else {
            HashSet::new()
        };
        debug!(path = %path.display(), count = seen.len(), "Loaded seen match handles");

        Ok(Self {
            path,
            seen: Mutex::new(seen),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, handle: &str) -> bool {
        self.seen.lock().contains(handle.trim())
    }

    pub fn len(&self) -> usize {
        self.seen.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Durably records `handle`.
    ///
    /// Returns `Ok(false)` without touching the file if the handle is already
    /// known or blank. On a write error the handle stays marked as seen for
    /// this process and the error is returned.
    pub fn add(&self, handle: &str) -> Result<bool, StoreError> {
        let handle = handle.trim();
        if handle.is_empty() {
            return Ok(false);
        }
        let mut seen = self.seen.lock();
        if !seen.insert(handle.to_string()) {
            return Ok(false);
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| StoreError::io(&self.path, e))?;
        file.write_all(format!("{}\n", handle).as_bytes())
            .and_then(|_| file.sync_data())
            .map_err(|e| StoreError::io(&self.path, e))?;
        Ok(true)
    }
}
