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

//! Deferred stage bookkeeping.
//!
//! Every joined match owns a small list of pending stages, each with the
//! instant at which it becomes due. The scheduler never sleeps or spawns on
//! its own: callers pass `now` in and execute whatever [`take_due`] hands
//! back, which keeps it deterministic under a paused tokio clock.
//!
//! [`take_due`]: StageScheduler::take_due

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// A deferred unit of work for one match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    /// Start the test session and archive the puzzle.
    FetchContent,
    /// Submit an archived solution, if any, under the test session.
    MaybeSubmit {
        test_session_handle: String,
        question_id: String,
    },
    /// Share the submitted solution publicly.
    Share,
    /// Collect perfect shared solutions from the final report.
    HarvestSolutions { question_id: String },
}

impl Stage {
    pub fn kind(&self) -> StageKind {
        match self {
            Stage::FetchContent => StageKind::FetchContent,
            Stage::MaybeSubmit { .. } => StageKind::MaybeSubmit,
            Stage::Share => StageKind::Share,
            Stage::HarvestSolutions { .. } => StageKind::HarvestSolutions,
        }
    }

    pub fn question_id(&self) -> Option<&str> {
        match self {
            Stage::MaybeSubmit { question_id, .. } | Stage::HarvestSolutions { question_id } => {
                Some(question_id.as_str())
            }
            Stage::FetchContent | Stage::Share => None,
        }
    }
}

/// Payload-free tag of a [`Stage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StageKind {
    FetchContent,
    MaybeSubmit,
    Share,
    HarvestSolutions,
}

impl StageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StageKind::FetchContent => "fetch_content",
            StageKind::MaybeSubmit => "maybe_submit",
            StageKind::Share => "share",
            StageKind::HarvestSolutions => "harvest_solutions",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stage bound to its match and due time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledStage {
    pub handle: String,
    pub stage: Stage,
    pub due: Instant,
}

/// Pending stages keyed by match handle.
#[derive(Debug, Default)]
pub struct StageScheduler {
    pending: HashMap<String, Vec<(Instant, Stage)>>,
}

impl StageScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `stage` for `handle`, due at `now + delay`.
    pub fn schedule(&mut self, handle: &str, stage: Stage, delay: Duration, now: Instant) -> Instant {
        let due = now + delay;
        self.pending
            .entry(handle.to_string())
            .or_default()
            .push((due, stage));
        due
    }

    /// Removes every entry due at or before `now`, earliest first.
    pub fn take_due(&mut self, now: Instant) -> Vec<ScheduledStage> {
        let mut due = Vec::new();
        self.pending.retain(|handle, stages| {
            let mut i = 0;
            while i < stages.len() {
                if stages[i].0 <= now {
                    let (at, stage) = stages.remove(i);
                    due.push(ScheduledStage {
                        handle: handle.clone(),
                        stage,
                        due: at,
                    });
                } else {
                    i += 1;
                }
            }
            !stages.is_empty()
        });
        // stable: entries of one handle keep insertion order on equal due
        due.sort_by_key(|s| s.due);
        due
    }

    /// Tags of the stages still pending for `handle`, earliest first.
    pub fn pending_for(&self, handle: &str) -> Vec<StageKind> {
        let mut stages: Vec<_> = self
            .pending
            .get(handle)
            .map(|stages| stages.iter().map(|(due, s)| (*due, s.kind())).collect())
            .unwrap_or_default();
        stages.sort_by_key(|(due, _)| *due);
        stages.into_iter().map(|(_, kind)| kind).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
