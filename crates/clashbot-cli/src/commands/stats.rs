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

//! Implementation of the `stats` command.

use anyhow::{Context, Result};
use clashbot::config::{ARCHIVE_DIR, HANDLES_FILE, LEDGER_FILE};
use clashbot::{HandleStore, SolutionArchive};
use std::path::Path;

/// Lists archived puzzles with their solution counts. Needs no credentials.
pub fn run(data_dir: &Path) -> Result<()> {
    let handles =
        HandleStore::open(data_dir.join(HANDLES_FILE)).context("Failed to open handle store")?;
    let archive = SolutionArchive::open(data_dir.join(ARCHIVE_DIR), data_dir.join(LEDGER_FILE))
        .context("Failed to open solution archive")?;
    let summary = archive.summary().context("Failed to read solution archive")?;

    print!("{}", render(handles.len(), &summary));
    Ok(())
}

fn render(seen_handles: usize, summary: &[(String, usize)]) -> String {
    let mut out = String::new();
    let total: usize = summary.iter().map(|(_, count)| count).sum();
    let width = summary
        .iter()
        .map(|(id, _)| id.len())
        .max()
        .unwrap_or(0)
        .max("QUESTION".len());

    out.push_str(&format!("{:<width$}  SOLUTIONS\n", "QUESTION", width = width));
    for (question_id, count) in summary {
        out.push_str(&format!("{:<width$}  {}\n", question_id, count, width = width));
    }
    out.push_str(&format!(
        "\n{} question(s), {} solution(s), {} joined match(es)\n",
        summary.len(),
        total,
        seen_handles
    ));
    out
}
