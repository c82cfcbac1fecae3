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

//! # Clashbot
//!
//! Lifecycle orchestration for short-lived, timed multiplayer coding matches.
//!
//! The crate discovers pending matches, joins them at most once, and then
//! drives each joined match through a set of deferred stages:
//!
//! 1. **Fetch content** shortly after joining, once the match has started.
//! 2. **Maybe submit** a previously archived solution at a jittered offset.
//! 3. **Share** the submission once the service has processed it.
//! 4. **Harvest solutions** after the match is guaranteed to be over.
//!
//! Durable state lives in two flat-file stores: the [`HandleStore`] of
//! already-joined match handles and the [`SolutionArchive`] of puzzles and
//! their known-good solutions.
//!
//! ## Example
//!
//! ```rust,ignore
//! use clashbot::{HttpContestClient, MetricsRecorder, Orchestrator, OrchestratorConfig};
//! use std::sync::Arc;
//!
//! let config = OrchestratorConfig::builder()
//!     .user_id("1234321")
//!     .session_token("cg-session")
//!     .build()?;
//! let client = Arc::new(HttpContestClient::new(&config)?);
//! let orchestrator = Arc::new(Orchestrator::open(config, client, Arc::new(MetricsRecorder::new()))?);
//! orchestrator.run().await;
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod jitter;
pub mod models;
pub mod orchestrator;
pub mod outcome;
pub mod scheduler;
pub mod store;

pub use client::{ContestClient, HttpContestClient};
pub use config::{parse_duration, OrchestratorConfig, OrchestratorConfigBuilder};
pub use error::{ClientError, ConfigError, ErrorClass, StageError, StoreError};
pub use jitter::Jitter;
pub use models::{MatchContent, MatchReport, Participant, PendingMatch, Puzzle, PuzzleRecord, Solution};
pub use orchestrator::{ContentOutcome, HarvestOutcome, Orchestrator, PollOutcome, SubmitOutcome};
pub use outcome::{Counter, MetricsRecorder, OutcomeRecorder};
pub use scheduler::{ScheduledStage, Stage, StageKind, StageScheduler};
pub use store::{HandleStore, SolutionArchive};
