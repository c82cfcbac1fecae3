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

//! End-to-end runs of both orchestrator loops under a paused clock.

use clashbot::{Counter, Solution};
use std::sync::Arc;
use std::time::Duration;

use crate::fixtures::{participant, Call, Harness};

#[tokio::test(start_paused = true)]
async fn test_full_match_lifecycle() {
    let h = Harness::new();
    h.client.set_pending(&["abc"]);
    h.client.set_content("abc", "ts-1", "737259");
    h.client.set_report(
        "abc",
        vec![
            participant(100.0, true, Some(11)),
            participant(60.0, true, Some(12)),
        ],
    );
    h.client.set_code(11, "rev", "Bash");

    let run = tokio::spawn(Arc::clone(&h.orchestrator).run());

    // content at 2 min, harvest 17 min later
    tokio::time::sleep(Duration::from_secs(2 * 60 + 17 * 60 + 30)).await;
    run.abort();

    assert_eq!(h.client.joins(), 1);
    assert_eq!(h.client.count(|c| *c == Call::FetchContent("abc".into())), 1);
    assert_eq!(h.client.count(|c| *c == Call::Report("abc".into())), 1);
    // the archive was empty when the submission stage ran
    assert!(h.client.submissions().is_empty());

    let record = h.orchestrator.archive().load("737259").unwrap().unwrap();
    assert_eq!(record.solutions, {
        let mut expected = Solution::new("rev", "Bash");
        expected.test_session_question_submission_id = Some(11);
        vec![expected]
    });
    assert_eq!(h.recorder.count(Counter::MatchJoined), 1);
    assert_eq!(h.recorder.count(Counter::PuzzleSavedNew), 1);
    assert_eq!(h.recorder.count(Counter::SolutionsNew), 1);
    assert!(h.orchestrator.scheduler().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_known_puzzle_gets_submitted_and_shared() {
    let h = Harness::new();
    h.orchestrator
        .archive()
        .merge_solutions("5", vec![Solution::new("echo ok", "Bash")])
        .unwrap();
    h.client.set_pending(&["abc"]);
    h.client.set_content("abc", "ts-9", "5");
    h.client.set_report("abc", vec![]);

    let run = tokio::spawn(Arc::clone(&h.orchestrator).run());
    tokio::time::sleep(Duration::from_secs(20 * 60)).await;
    run.abort();

    assert_eq!(
        h.client.submissions(),
        vec![Call::Submit {
            test_session_handle: "ts-9".into(),
            code: "echo ok".into(),
            language_id: "Bash".into(),
        }]
    );
    assert_eq!(h.client.count(|c| *c == Call::Share("abc".into())), 1);
    assert_eq!(h.recorder.count(Counter::PuzzleAlreadyKnown), 1);
    assert_eq!(h.recorder.count(Counter::SolutionSubmitted), 1);
    assert_eq!(h.recorder.count(Counter::SolutionShared), 1);
    assert_eq!(h.recorder.count(Counter::SolutionsNew), 0);
}

#[tokio::test(start_paused = true)]
async fn test_discovery_keeps_polling_after_failures() {
    let h = Harness::new();
    h.client.fail_discovery(Some(502));

    let run = tokio::spawn(Arc::clone(&h.orchestrator).run());
    tokio::time::sleep(Duration::from_secs(65)).await;
    run.abort();

    // polls at 0s, 20s, 40s and 60s
    assert_eq!(h.client.count(|c| *c == Call::ListPending), 4);
    assert_eq!(h.recorder.count(Counter::GenericError), 4);
}
