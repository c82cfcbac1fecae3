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

//! Outcome counters.
//!
//! The orchestrator increments a [`Counter`] at every stage transition and
//! every failure. [`MetricsRecorder`] forwards them to the `metrics` facade,
//! where an exporter installed by the binary can pick them up.

use std::fmt;

use tracing::{error, warn};

use crate::error::{ErrorClass, StageError};

/// Named counters recorded by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Counter {
    MatchJoined,
    PuzzleSavedNew,
    PuzzleAlreadyKnown,
    SolutionsFetched,
    SolutionsNew,
    SolutionSubmitted,
    SolutionShared,
    GenericError,
    ClientError,
}

impl Counter {
    pub const ALL: [Counter; 9] = [
        Counter::MatchJoined,
        Counter::PuzzleSavedNew,
        Counter::PuzzleAlreadyKnown,
        Counter::SolutionsFetched,
        Counter::SolutionsNew,
        Counter::SolutionSubmitted,
        Counter::SolutionShared,
        Counter::GenericError,
        Counter::ClientError,
    ];

    /// Exported metric name.
    pub fn metric_name(self) -> &'static str {
        match self {
            Counter::MatchJoined => "codingame_bot_clash_join",
            Counter::PuzzleSavedNew => "codingame_bot_clash_question_save_new",
            Counter::PuzzleAlreadyKnown => "codingame_bot_clash_question_has_solution",
            Counter::SolutionsFetched => "codingame_bot_clash_solutions_fetch",
            Counter::SolutionsNew => "codingame_bot_clash_solutions_new",
            Counter::SolutionSubmitted => "codingame_bot_clash_solution_submit",
            Counter::SolutionShared => "codingame_bot_clash_solution_share",
            Counter::GenericError => "codingame_bot_error_generic",
            Counter::ClientError => "codingame_bot_error_client",
        }
    }

    pub fn help(self) -> &'static str {
        match self {
            Counter::MatchJoined => "Count entered a Clash of Code match",
            Counter::PuzzleSavedNew => {
                "How many times we started a match and saved its question data"
            }
            Counter::PuzzleAlreadyKnown => {
                "How many times we landed on a match whose question was already archived"
            }
            Counter::SolutionsFetched => "How many times we fetched a match's solutions",
            Counter::SolutionsNew => {
                "How many times a match contained full pass solutions we did not have before"
            }
            Counter::SolutionSubmitted => "How many archived solutions we submitted",
            Counter::SolutionShared => "How many submissions we shared",
            Counter::GenericError => "Failures not attributable to the request itself",
            Counter::ClientError => "Failures where the service rejected the request",
        }
    }

    /// Counter used for a failure of the given class.
    pub fn for_class(class: ErrorClass) -> Counter {
        match class {
            ErrorClass::ClientSide => Counter::ClientError,
            ErrorClass::Generic => Counter::GenericError,
        }
    }
}

impl fmt::Display for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.metric_name())
    }
}

/// Fire-and-forget counter sink.
pub trait OutcomeRecorder: Send + Sync {
    fn increment(&self, counter: Counter);
}

/// Records counters through the global `metrics` recorder.
#[derive(Debug, Clone, Copy)]
pub struct MetricsRecorder;

impl MetricsRecorder {
    /// Registers counter descriptions with the installed recorder.
    pub fn new() -> Self {
        for counter in Counter::ALL {
            metrics::describe_counter!(counter.metric_name(), counter.help());
        }
        Self
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl OutcomeRecorder for MetricsRecorder {
    fn increment(&self, counter: Counter) {
        metrics::counter!(counter.metric_name()).increment(1);
    }
}

/// Context attached to a recorded failure.
#[derive(Debug, Clone, Copy)]
pub struct FailureContext<'a> {
    pub stage: &'a str,
    pub handle: Option<&'a str>,
    pub question_id: Option<&'a str>,
}

/// Classifies `err`, increments the matching error counter and logs it with
/// enough context to reprocess the handle/question pair by hand.
pub fn record_failure(
    recorder: &dyn OutcomeRecorder,
    ctx: FailureContext<'_>,
    err: &StageError,
) -> ErrorClass {
    let class = err.class();
    recorder.increment(Counter::for_class(class));
    let handle = ctx.handle.unwrap_or("-");
    let question_id = ctx.question_id.unwrap_or("-");
    match class {
        ErrorClass::ClientSide => warn!(
            stage = ctx.stage,
            handle,
            question_id,
            error = %err,
            "Stage rejected by service"
        ),
        ErrorClass::Generic => error!(
            stage = ctx.stage,
            handle,
            question_id,
            error = %err,
            "Stage failed"
        ),
    }
    class
}
