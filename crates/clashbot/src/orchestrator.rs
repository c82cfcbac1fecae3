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

//! # Match Lifecycle Orchestrator
//!
//! The orchestrator owns two loops:
//!
//! - **Discovery**: polls the pending-match list, joins the first unseen
//!   match and schedules its content fetch. Each poll completes fully before
//!   the loop sleeps for `poll_interval`.
//! - **Stages**: ticks every `scheduler_tick`, takes due stages from the
//!   [`StageScheduler`] and spawns each one as an independent task.
//!
//! A handle is written to the [`HandleStore`] only after the join succeeded
//! and before anything is scheduled for it, so a match is joined at most
//! once even across restarts. If that write fails the handle is still
//! remembered for the rest of the run and nothing is scheduled. Stages are
//! never retried; every failure is classified and recorded through the
//! [`OutcomeRecorder`]. Store I/O runs on the blocking pool.

use futures::stream::{self, StreamExt, TryStreamExt};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::client::ContestClient;
use crate::config::OrchestratorConfig;
use crate::error::{StageError, StoreError};
use crate::jitter::Jitter;
use crate::models::Solution;
use crate::outcome::{record_failure, Counter, FailureContext, OutcomeRecorder};
use crate::scheduler::{ScheduledStage, Stage, StageKind, StageScheduler};
use crate::store::{HandleStore, SolutionArchive};

/// Result of one discovery cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The service listed no pending match.
    NoPendingMatches,
    /// The first pending match was joined before.
    AlreadySeen(String),
    /// Joined, persisted and scheduled for content fetch.
    Joined(String),
    /// The join call failed; the handle stays unseen.
    JoinFailed(String),
    /// The join succeeded but the handle could not be persisted. Nothing
    /// was scheduled and the handle counts as seen until restart.
    HandleNotPersisted(String),
    /// Listing pending matches failed.
    DiscoveryFailed,
}

/// Result of a successful content fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentOutcome {
    /// First sighting of the puzzle; an empty record was written.
    SavedNew {
        question_id: String,
        test_session_handle: String,
    },
    /// The puzzle was already archived and left untouched.
    AlreadyKnown {
        question_id: String,
        test_session_handle: String,
        solution_count: usize,
    },
}

impl ContentOutcome {
    pub fn question_id(&self) -> &str {
        match self {
            ContentOutcome::SavedNew { question_id, .. }
            | ContentOutcome::AlreadyKnown { question_id, .. } => question_id,
        }
    }

    pub fn test_session_handle(&self) -> &str {
        match self {
            ContentOutcome::SavedNew {
                test_session_handle,
                ..
            }
            | ContentOutcome::AlreadyKnown {
                test_session_handle,
                ..
            } => test_session_handle,
        }
    }
}

/// Result of a submission attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// No record exists for the puzzle.
    NoRecord,
    /// The record has no solutions yet.
    NoSolutions,
    /// The solution at `index` was submitted.
    Submitted { index: usize, language_id: String },
}

/// Result of a solution harvest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarvestOutcome {
    /// Submissions in the report that qualified for fetching.
    pub qualifying: usize,
    /// Solutions appended to the archive.
    pub added: usize,
}

/// Runs a store operation on the blocking pool.
async fn blocking<T, F>(op: F) -> Result<T, StoreError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(op).await?
}

/// Drives joined matches through their deferred stages.
pub struct Orchestrator {
    config: OrchestratorConfig,
    client: Arc<dyn ContestClient>,
    recorder: Arc<dyn OutcomeRecorder>,
    handles: Arc<HandleStore>,
    archive: SolutionArchive,
    scheduler: Mutex<StageScheduler>,
    jitter: Jitter,
}

impl Orchestrator {
    /// Opens both stores under the configured data directory.
    pub fn open(
        config: OrchestratorConfig,
        client: Arc<dyn ContestClient>,
        recorder: Arc<dyn OutcomeRecorder>,
    ) -> Result<Self, StoreError> {
        let handles = HandleStore::open(config.handles_path())?;
        let archive = SolutionArchive::open(config.archive_dir(), config.ledger_path())?;
        let jitter = Jitter::new(config.jitter_seed());
        Ok(Self {
            config,
            client,
            recorder,
            handles: Arc::new(handles),
            archive,
            scheduler: Mutex::new(StageScheduler::new()),
            jitter,
        })
    }

    pub fn handles(&self) -> &HandleStore {
        &self.handles
    }

    pub fn archive(&self) -> &SolutionArchive {
        &self.archive
    }

    /// Lock on the pending stage list. Never hold it across an `.await`.
    pub fn scheduler(&self) -> parking_lot::MutexGuard<'_, StageScheduler> {
        self.scheduler.lock()
    }

    fn schedule(&self, handle: &str, stage: Stage, delay: std::time::Duration) {
        let kind = stage.kind();
        self.scheduler.lock().schedule(handle, stage, delay, Instant::now());
        debug!(handle, stage = %kind, delay_ms = delay.as_millis() as u64, "Scheduled stage");
    }

    fn record(&self, stage: &str, handle: Option<&str>, question_id: Option<&str>, err: &StageError) {
        record_failure(
            self.recorder.as_ref(),
            FailureContext {
                stage,
                handle,
                question_id,
            },
            err,
        );
    }

    fn fail<T>(
        &self,
        stage: StageKind,
        handle: &str,
        question_id: Option<&str>,
        result: Result<T, StageError>,
    ) -> Result<T, StageError> {
        if let Err(err) = &result {
            self.record(stage.as_str(), Some(handle), question_id, err);
        }
        result
    }

    /// Runs one discovery cycle. Never fails; every error is recorded.
    pub async fn poll_once(&self) -> PollOutcome {
        let pending = match self.client.list_pending_matches().await {
            Ok(pending) => pending,
            Err(err) => {
                self.record("discover", None, None, &err.into());
                return PollOutcome::DiscoveryFailed;
            }
        };

        let Some(candidate) = pending.into_iter().next() else {
            debug!("No pending matches");
            return PollOutcome::NoPendingMatches;
        };
        let handle = candidate.public_handle;

        if self.handles.contains(&handle) {
            debug!(handle = %handle, "Pending match already joined");
            return PollOutcome::AlreadySeen(handle);
        }

        if let Err(err) = self.client.join_match(&handle).await {
            self.record("join", Some(handle.as_str()), None, &err.into());
            return PollOutcome::JoinFailed(handle);
        }

        let handles = Arc::clone(&self.handles);
        let joined = handle.clone();
        if let Err(err) = blocking(move || handles.add(&joined)).await {
            self.record("join", Some(handle.as_str()), None, &err.into());
            return PollOutcome::HandleNotPersisted(handle);
        }

        self.recorder.increment(Counter::MatchJoined);
        info!(
            handle = %handle,
            discovered_at = %candidate.discovered_at,
            "Joined match"
        );
        self.schedule(&handle, Stage::FetchContent, self.config.content_delay());
        PollOutcome::Joined(handle)
    }

    async fn try_save_content(&self, handle: &str) -> Result<ContentOutcome, StageError> {
        let content = self.client.fetch_match_content(handle).await?;
        let question_id = content.puzzle.question_id.clone();
        let test_session_handle = content.test_session_handle;
        let puzzle = content.puzzle;

        let archive = self.archive.clone();
        let sighting = handle.to_string();
        let known = blocking(move || {
            if archive.create_if_absent(&puzzle)? {
                archive.record_sighting(&sighting, &puzzle.question_id)?;
                return Ok(None);
            }
            Ok(Some(archive.solution_count(&puzzle.question_id)?.unwrap_or(0)))
        })
        .await?;

        let Some(solution_count) = known else {
            self.recorder.increment(Counter::PuzzleSavedNew);
            info!(handle, question_id = %question_id, "Saved new puzzle");
            return Ok(ContentOutcome::SavedNew {
                question_id,
                test_session_handle,
            });
        };

        self.recorder.increment(Counter::PuzzleAlreadyKnown);
        info!(
            handle,
            question_id = %question_id,
            solution_count,
            "Puzzle already archived"
        );
        Ok(ContentOutcome::AlreadyKnown {
            question_id,
            test_session_handle,
            solution_count,
        })
    }

    /// Fetches a match's content and archives its puzzle without scheduling
    /// any follow-up stage.
    pub async fn save_content(&self, handle: &str) -> Result<ContentOutcome, StageError> {
        let result = self.try_save_content(handle).await;
        self.fail(StageKind::FetchContent, handle, None, result)
    }

    /// Content stage: archives the puzzle, then schedules the submission at
    /// a random offset in `[0, submit_window_max)` and the harvest at
    /// `harvest_delay`. Nothing is scheduled on failure.
    pub async fn harvest_content(&self, handle: &str) -> Result<ContentOutcome, StageError> {
        let outcome = self.save_content(handle).await?;

        let submit_delay = self.jitter.delay_within(self.config.submit_window_max());
        self.schedule(
            handle,
            Stage::MaybeSubmit {
                test_session_handle: outcome.test_session_handle().to_string(),
                question_id: outcome.question_id().to_string(),
            },
            submit_delay,
        );
        self.schedule(
            handle,
            Stage::HarvestSolutions {
                question_id: outcome.question_id().to_string(),
            },
            self.config.harvest_delay(),
        );
        Ok(outcome)
    }

    async fn try_maybe_submit(
        &self,
        handle: &str,
        test_session_handle: &str,
        question_id: &str,
    ) -> Result<SubmitOutcome, StageError> {
        let archive = self.archive.clone();
        let id = question_id.to_string();
        let Some(record) = blocking(move || archive.load(&id)).await? else {
            debug!(handle, question_id, "No archived record, skipping submission");
            return Ok(SubmitOutcome::NoRecord);
        };
        let Some(index) = self.jitter.pick_index(record.solutions.len()) else {
            debug!(handle, question_id, "No archived solution, skipping submission");
            return Ok(SubmitOutcome::NoSolutions);
        };

        let solution = &record.solutions[index];
        self.client
            .submit_solution(
                test_session_handle,
                &solution.code,
                &solution.programming_language_id,
            )
            .await?;
        self.recorder.increment(Counter::SolutionSubmitted);
        info!(
            handle,
            question_id,
            language = %solution.programming_language_id,
            "Submitted archived solution"
        );

        self.schedule(handle, Stage::Share, self.config.share_delay());
        Ok(SubmitOutcome::Submitted {
            index,
            language_id: solution.programming_language_id.clone(),
        })
    }

    /// Submits one archived solution, chosen uniformly, if the puzzle has
    /// any. A successful submission schedules the share stage.
    pub async fn maybe_submit(
        &self,
        handle: &str,
        test_session_handle: &str,
        question_id: &str,
    ) -> Result<SubmitOutcome, StageError> {
        let result = self
            .try_maybe_submit(handle, test_session_handle, question_id)
            .await;
        self.fail(StageKind::MaybeSubmit, handle, Some(question_id), result)
    }

    /// Shares this account's submission for `handle`.
    pub async fn share(&self, handle: &str) -> Result<(), StageError> {
        let result = self
            .client
            .share_solution(handle)
            .await
            .map_err(StageError::from);
        if result.is_ok() {
            self.recorder.increment(Counter::SolutionShared);
            info!(handle, "Shared solution");
        }
        self.fail(StageKind::Share, handle, None, result)
    }

    async fn try_harvest_solutions(
        &self,
        handle: &str,
        question_id: &str,
    ) -> Result<HarvestOutcome, StageError> {
        let report = self.client.fetch_match_report(handle).await?;
        let submissions = report.harvestable_submissions();
        debug!(
            handle,
            question_id,
            participants = report.participants.len(),
            qualifying = submissions.len(),
            "Fetched match report"
        );

        let solutions: Vec<Solution> = stream::iter(submissions.iter().copied())
            .map(|submission_id| {
                let client = Arc::clone(&self.client);
                async move { client.fetch_submitted_code(submission_id).await }
            })
            .buffered(self.config.harvest_concurrency())
            .try_collect()
            .await?;

        let archive = self.archive.clone();
        let id = question_id.to_string();
        let added = blocking(move || archive.merge_solutions(&id, solutions)).await?;
        if added > 0 {
            self.recorder.increment(Counter::SolutionsNew);
            info!(handle, question_id, added, "Archived new solutions");
        } else {
            debug!(handle, question_id, "No new solutions");
        }
        Ok(HarvestOutcome {
            qualifying: submissions.len(),
            added,
        })
    }

    /// Collects every perfect, shared solution from the match report and
    /// merges them into the archive. A single failed fetch discards the
    /// whole batch.
    pub async fn harvest_solutions(
        &self,
        handle: &str,
        question_id: &str,
    ) -> Result<HarvestOutcome, StageError> {
        self.recorder.increment(Counter::SolutionsFetched);
        let result = self.try_harvest_solutions(handle, question_id).await;
        self.fail(StageKind::HarvestSolutions, handle, Some(question_id), result)
    }

    /// Runs one scheduled stage. Failures are already recorded by the stage.
    pub async fn execute_stage(&self, scheduled: ScheduledStage) {
        let handle = scheduled.handle.as_str();
        debug!(
            handle,
            stage = %scheduled.stage.kind(),
            question_id = scheduled.stage.question_id(),
            "Running stage"
        );
        let _ = match &scheduled.stage {
            Stage::FetchContent => self.harvest_content(handle).await.map(|_| ()),
            Stage::MaybeSubmit {
                test_session_handle,
                question_id,
            } => self
                .maybe_submit(handle, test_session_handle, question_id)
                .await
                .map(|_| ()),
            Stage::Share => self.share(handle).await,
            Stage::HarvestSolutions { question_id } => self
                .harvest_solutions(handle, question_id)
                .await
                .map(|_| ()),
        };
    }

    /// Executes every stage due now, one after another. Returns how many ran.
    pub async fn run_due_stages(&self) -> usize {
        let due = self.scheduler.lock().take_due(Instant::now());
        let count = due.len();
        for scheduled in due {
            self.execute_stage(scheduled).await;
        }
        count
    }

    async fn discovery_loop(self: Arc<Self>) {
        loop {
            self.poll_once().await;
            tokio::time::sleep(self.config.poll_interval()).await;
        }
    }

    async fn stage_loop(self: Arc<Self>) {
        let mut tasks = JoinSet::new();
        let mut tick = tokio::time::interval(self.config.scheduler_tick());
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tick.tick().await;

            while let Some(joined) = tasks.try_join_next() {
                if let Err(err) = joined {
                    if err.is_panic() {
                        error!(error = %err, "Stage task panicked");
                    }
                }
            }

            let due = self.scheduler.lock().take_due(Instant::now());
            for scheduled in due {
                let this = Arc::clone(&self);
                tasks.spawn(async move { this.execute_stage(scheduled).await });
            }
        }
    }

    /// Runs discovery and stage execution until the future is dropped.
    pub async fn run(self: Arc<Self>) {
        info!(
            data_dir = %self.config.data_dir().display(),
            handles_file = %self.handles.path().display(),
            seen_handles = self.handles.len(),
            poll_interval_s = self.config.poll_interval().as_secs(),
            "Starting clash orchestrator"
        );
        tokio::join!(
            Arc::clone(&self).discovery_loop(),
            Arc::clone(&self).stage_loop()
        );
    }
}
