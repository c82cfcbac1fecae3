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

//! In-memory fakes shared by the integration tests.

use async_trait::async_trait;
use clashbot::{
    ClientError, ContestClient, Counter, MatchContent, MatchReport, Orchestrator,
    OrchestratorConfig, OutcomeRecorder, Participant, PendingMatch, Puzzle, Solution,
};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// One call observed by [`FakeContestClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListPending,
    Join(String),
    FetchContent(String),
    Submit {
        test_session_handle: String,
        code: String,
        language_id: String,
    },
    Share(String),
    Report(String),
    Code(i64),
}

#[derive(Default)]
struct FakeState {
    pending: Vec<String>,
    contents: HashMap<String, MatchContent>,
    reports: HashMap<String, MatchReport>,
    code: HashMap<i64, Solution>,
    discovery_status: Option<u16>,
    join_status: Option<u16>,
    submit_status: Option<u16>,
    share_status: Option<u16>,
    calls: Vec<Call>,
}

/// Scriptable [`ContestClient`] that records every call.
///
/// Missing content, reports and code answer with HTTP 404.
#[derive(Default)]
pub struct FakeContestClient {
    state: Mutex<FakeState>,
}

fn status(endpoint: &str, status: u16) -> ClientError {
    ClientError::Status {
        endpoint: endpoint.to_string(),
        status,
        body: String::new(),
    }
}

impl FakeContestClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_pending(&self, handles: &[&str]) {
        self.state.lock().pending = handles.iter().map(|h| h.to_string()).collect();
    }

    pub fn set_content(&self, handle: &str, test_session_handle: &str, question_id: &str) {
        let content = MatchContent {
            test_session_handle: test_session_handle.to_string(),
            puzzle: Puzzle {
                question_id: question_id.to_string(),
                title: Some(format!("Puzzle {}", question_id)),
                statement: Some("Print the input reversed.".to_string()),
                metadata: json!({"currentQuestion": {"question": {"id": question_id}}}),
            },
        };
        self.state.lock().contents.insert(handle.to_string(), content);
    }

    pub fn set_report(&self, handle: &str, participants: Vec<Participant>) {
        let report = MatchReport {
            public_handle: Some(handle.to_string()),
            finished: true,
            participants,
        };
        self.state.lock().reports.insert(handle.to_string(), report);
    }

    pub fn set_code(&self, submission_id: i64, code: &str, language_id: &str) {
        let mut solution = Solution::new(code, language_id);
        solution.test_session_question_submission_id = Some(submission_id);
        self.state.lock().code.insert(submission_id, solution);
    }

    pub fn fail_discovery(&self, code: Option<u16>) {
        self.state.lock().discovery_status = code;
    }

    pub fn fail_join(&self, code: Option<u16>) {
        self.state.lock().join_status = code;
    }

    pub fn fail_submit(&self, code: Option<u16>) {
        self.state.lock().submit_status = code;
    }

    pub fn fail_share(&self, code: Option<u16>) {
        self.state.lock().share_status = code;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.state.lock().calls.iter().filter(|c| pred(c)).count()
    }

    pub fn joins(&self) -> usize {
        self.count(|c| matches!(c, Call::Join(_)))
    }

    pub fn submissions(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Submit { .. }))
            .collect()
    }
}

#[async_trait]
impl ContestClient for FakeContestClient {
    async fn list_pending_matches(&self) -> Result<Vec<PendingMatch>, ClientError> {
        let mut state = self.state.lock();
        state.calls.push(Call::ListPending);
        if let Some(code) = state.discovery_status {
            return Err(status("ClashOfCode/findPendingClashes", code));
        }
        Ok(state.pending.iter().map(|h| PendingMatch::new(h.as_str())).collect())
    }

    async fn join_match(&self, public_handle: &str) -> Result<(), ClientError> {
        let mut state = self.state.lock();
        state.calls.push(Call::Join(public_handle.to_string()));
        match state.join_status {
            Some(code) => Err(status("ClashOfCode/playClash", code)),
            None => Ok(()),
        }
    }

    async fn fetch_match_content(&self, public_handle: &str) -> Result<MatchContent, ClientError> {
        let mut state = self.state.lock();
        state.calls.push(Call::FetchContent(public_handle.to_string()));
        state
            .contents
            .get(public_handle)
            .cloned()
            .ok_or_else(|| status("TestSession/startTestSession", 404))
    }

    async fn submit_solution(
        &self,
        test_session_handle: &str,
        code: &str,
        language_id: &str,
    ) -> Result<(), ClientError> {
        let mut state = self.state.lock();
        state.calls.push(Call::Submit {
            test_session_handle: test_session_handle.to_string(),
            code: code.to_string(),
            language_id: language_id.to_string(),
        });
        match state.submit_status {
            Some(code) => Err(status("TestSession/submit", code)),
            None => Ok(()),
        }
    }

    async fn share_solution(&self, public_handle: &str) -> Result<(), ClientError> {
        let mut state = self.state.lock();
        state.calls.push(Call::Share(public_handle.to_string()));
        match state.share_status {
            Some(code) => Err(status("ClashOfCode/shareCodinGamerSolutionByHandle", code)),
            None => Ok(()),
        }
    }

    async fn fetch_match_report(&self, public_handle: &str) -> Result<MatchReport, ClientError> {
        let mut state = self.state.lock();
        state.calls.push(Call::Report(public_handle.to_string()));
        state
            .reports
            .get(public_handle)
            .cloned()
            .ok_or_else(|| status("ClashOfCode/findClashReportInfoByHandle", 404))
    }

    async fn fetch_submitted_code(&self, submission_id: i64) -> Result<Solution, ClientError> {
        let mut state = self.state.lock();
        state.calls.push(Call::Code(submission_id));
        state
            .code
            .get(&submission_id)
            .cloned()
            .ok_or_else(|| status("Solution/findSolution", 404))
    }
}

/// Collects every counter increment.
#[derive(Default)]
pub struct RecordingRecorder {
    counters: Mutex<Vec<Counter>>,
}

impl RecordingRecorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn count(&self, counter: Counter) -> usize {
        self.counters.lock().iter().filter(|c| **c == counter).count()
    }

    pub fn all(&self) -> Vec<Counter> {
        self.counters.lock().clone()
    }
}

impl OutcomeRecorder for RecordingRecorder {
    fn increment(&self, counter: Counter) {
        self.counters.lock().push(counter);
    }
}

pub fn participant(score: f64, shared: bool, submission_id: Option<i64>) -> Participant {
    Participant {
        codingamer_nickname: Some(format!("player-{:?}", submission_id)),
        score,
        solution_shared: shared,
        submission_id,
    }
}

/// Everything a test needs to drive one orchestrator.
pub struct Harness {
    pub dir: TempDir,
    pub client: Arc<FakeContestClient>,
    pub recorder: Arc<RecordingRecorder>,
    pub orchestrator: Arc<Orchestrator>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_dir(TempDir::new().expect("temp dir"))
    }

    /// Opens a fresh orchestrator over an existing data directory.
    pub fn with_dir(dir: TempDir) -> Self {
        let client = FakeContestClient::new();
        let recorder = RecordingRecorder::new();
        let config = OrchestratorConfig::builder()
            .user_id("1234321")
            .session_token("test-session")
            .data_dir(dir.path())
            .poll_interval(Duration::from_secs(20))
            .content_delay(Duration::from_secs(120))
            .submit_window_max(Duration::from_secs(300))
            .harvest_delay(Duration::from_secs(17 * 60))
            .share_delay(Duration::from_secs(10))
            .harvest_concurrency(2)
            .jitter_seed(Some(7))
            .build()
            .expect("valid config");
        let orchestrator = Orchestrator::open(config, client.clone(), recorder.clone())
            .expect("stores open");
        Self {
            dir,
            client,
            recorder,
            orchestrator: Arc::new(orchestrator),
        }
    }
}
