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

//! Domain models exchanged with the contest service and persisted in the
//! solution archive.
//!
//! Wire names follow the service's camelCase JSON so that archived records
//! keep the exact field names the service produced.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

use crate::error::ClientError;

/// Score a participant needs for their solution to be harvested.
pub const PERFECT_SCORE: f64 = 100.0;

/// A match currently listed as pending by the discovery endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingMatch {
    pub public_handle: String,
    /// Local time at which the discovery response was parsed.
    #[serde(skip, default = "Utc::now")]
    pub discovered_at: DateTime<Utc>,
}

impl PendingMatch {
    pub fn new(public_handle: impl Into<String>) -> Self {
        Self {
            public_handle: public_handle.into(),
            discovered_at: Utc::now(),
        }
    }
}

/// The programming problem attached to a match.
#[derive(Debug, Clone, PartialEq)]
pub struct Puzzle {
    pub question_id: String,
    pub title: Option<String>,
    pub statement: Option<String>,
    /// Verbatim content payload the puzzle was extracted from.
    pub metadata: Value,
}

/// Content of a started match: the puzzle and the test session to submit under.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchContent {
    pub test_session_handle: String,
    pub puzzle: Puzzle,
}

impl MatchContent {
    /// Extracts the test session handle and puzzle from a raw test-session
    /// payload. `fallback_session` is used when the payload omits
    /// `testSessionHandle`.
    pub fn from_payload(
        endpoint: &str,
        payload: Value,
        fallback_session: &str,
    ) -> Result<Self, ClientError> {
        let unexpected = |message: &str| ClientError::UnexpectedPayload {
            endpoint: endpoint.to_string(),
            message: message.to_string(),
        };

        let question = payload
            .pointer("/currentQuestion/question")
            .ok_or_else(|| unexpected("missing currentQuestion.question"))?;
        let question_id = match question.get("id") {
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            _ => return Err(unexpected("missing question id")),
        };
        let title = question
            .get("title")
            .and_then(Value::as_str)
            .map(str::to_string);
        let statement = question
            .get("statement")
            .and_then(Value::as_str)
            .map(str::to_string);
        let test_session_handle = payload
            .get("testSessionHandle")
            .and_then(Value::as_str)
            .unwrap_or(fallback_session)
            .to_string();

        Ok(Self {
            test_session_handle,
            puzzle: Puzzle {
                question_id,
                title,
                statement,
                metadata: payload,
            },
        })
    }
}

/// One accepted submission harvested from a finished match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Solution {
    pub code: String,
    pub programming_language_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pseudo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codingamer_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codingamer_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_session_question_submission_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<i64>,
}

impl Solution {
    pub fn new(code: impl Into<String>, programming_language_id: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            programming_language_id: programming_language_id.into(),
            pseudo: None,
            codingamer_id: None,
            codingamer_handle: None,
            test_session_question_submission_id: None,
            creation_time: None,
        }
    }
}

/// One player's line in a finished match report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    #[serde(default)]
    pub codingamer_nickname: Option<String>,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub solution_shared: bool,
    #[serde(default)]
    pub submission_id: Option<i64>,
}

impl Participant {
    /// Returns the submission id if this participant's code is worth fetching:
    /// a perfect score on a publicly shared solution.
    pub fn harvestable_submission(&self) -> Option<i64> {
        if self.score >= PERFECT_SCORE && self.solution_shared {
            self.submission_id
        } else {
            None
        }
    }
}

/// Final report of a match.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchReport {
    #[serde(default)]
    pub public_handle: Option<String>,
    #[serde(default)]
    pub finished: bool,
    #[serde(default, alias = "players")]
    pub participants: Vec<Participant>,
}

impl MatchReport {
    pub fn harvestable_submissions(&self) -> Vec<i64> {
        self.participants
            .iter()
            .filter_map(Participant::harvestable_submission)
            .collect()
    }
}

/// On-disk record of a puzzle and its known-good solutions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PuzzleRecord {
    pub question_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statement: Option<String>,
    #[serde(default)]
    pub metadata: Value,
    #[serde(default)]
    pub solutions: Vec<Solution>,
}

impl PuzzleRecord {
    /// A fresh record for a newly seen puzzle, with no solutions.
    pub fn from_puzzle(puzzle: &Puzzle) -> Self {
        Self {
            question_id: puzzle.question_id.clone(),
            title: puzzle.title.clone(),
            statement: puzzle.statement.clone(),
            metadata: puzzle.metadata.clone(),
            solutions: Vec::new(),
        }
    }

    /// A bare record for a puzzle whose content was never saved.
    pub fn empty(question_id: impl Into<String>) -> Self {
        Self {
            question_id: question_id.into(),
            title: None,
            statement: None,
            metadata: Value::Null,
            solutions: Vec::new(),
        }
    }

    /// Appends every solution whose code text is not yet present, in order.
    /// Returns how many were appended.
    pub fn merge_solutions(&mut self, incoming: impl IntoIterator<Item = Solution>) -> usize {
        let mut known: HashSet<String> = self.solutions.iter().map(|s| s.code.clone()).collect();
        let before = self.solutions.len();
        for solution in incoming {
            if known.insert(solution.code.clone()) {
                self.solutions.push(solution);
            }
        }
        self.solutions.len() - before
    }
}
