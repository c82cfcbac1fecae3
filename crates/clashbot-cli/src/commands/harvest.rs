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

//! Implementation of the `harvest` command.
//!
//! Reprocesses one finished match by hand, typically using a
//! `handle-questionId` pair from the sighting ledger.

use anyhow::{Context, Result};
use tracing::info;

use super::{open_orchestrator, BotArgs};

pub async fn run(bot: &BotArgs, handle: &str, question_id: &str) -> Result<()> {
    let orchestrator = open_orchestrator(bot.config()?)?;
    let outcome = orchestrator
        .harvest_solutions(handle, question_id)
        .await
        .with_context(|| format!("Failed to harvest match '{}'", handle))?;

    if outcome.added == 0 {
        info!(
            "No new solutions for question {} ({} qualifying)",
            question_id, outcome.qualifying
        );
    } else {
        info!(
            "Archived {} new solution(s) for question {} ({} qualifying)",
            outcome.added, question_id, outcome.qualifying
        );
    }
    Ok(())
}
