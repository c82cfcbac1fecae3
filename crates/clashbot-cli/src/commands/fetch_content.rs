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

//! Implementation of the `fetch-content` command.

use anyhow::{Context, Result};
use clashbot::ContentOutcome;
use tracing::info;

use super::{open_orchestrator, BotArgs};

/// Fetches and archives one match's puzzle. No follow-up stage is scheduled.
pub async fn run(bot: &BotArgs, handle: &str) -> Result<()> {
    let orchestrator = open_orchestrator(bot.config()?)?;
    let outcome = orchestrator
        .save_content(handle)
        .await
        .with_context(|| format!("Failed to fetch content of match '{}'", handle))?;

    match outcome {
        ContentOutcome::SavedNew {
            question_id,
            test_session_handle,
        } => info!(
            "Saved new question {} (test session {})",
            question_id, test_session_handle
        ),
        ContentOutcome::AlreadyKnown {
            question_id,
            solution_count,
            ..
        } => info!(
            "Question {} already archived with {} solution(s)",
            question_id, solution_count
        ),
    }
    Ok(())
}
