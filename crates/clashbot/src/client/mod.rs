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

//! Contest service capability.
//!
//! The orchestrator only talks to the remote service through the
//! [`ContestClient`] trait, so tests can drive it with an in-memory fake and
//! production uses [`HttpContestClient`].

use async_trait::async_trait;

use crate::error::ClientError;
use crate::models::{MatchContent, MatchReport, PendingMatch, Solution};

mod http;

pub use http::HttpContestClient;

/// Operations the orchestrator needs from the contest service.
#[async_trait]
pub trait ContestClient: Send + Sync {
    /// Lists matches that are still waiting for players.
    async fn list_pending_matches(&self) -> Result<Vec<PendingMatch>, ClientError>;

    /// Joins a pending match. Fails if the match already started or is full.
    async fn join_match(&self, public_handle: &str) -> Result<(), ClientError>;

    /// Opens a test session for a started match and returns its puzzle.
    async fn fetch_match_content(&self, public_handle: &str) -> Result<MatchContent, ClientError>;

    /// Submits code under a match's test session.
    async fn submit_solution(
        &self,
        test_session_handle: &str,
        code: &str,
        language_id: &str,
    ) -> Result<(), ClientError>;

    /// Publicly shares this account's submission for a match.
    async fn share_solution(&self, public_handle: &str) -> Result<(), ClientError>;

    /// Fetches the report of a (finished) match.
    async fn fetch_match_report(&self, public_handle: &str) -> Result<MatchReport, ClientError>;

    /// Fetches the code of one submission listed in a report.
    async fn fetch_submitted_code(&self, submission_id: i64) -> Result<Solution, ClientError>;
}
