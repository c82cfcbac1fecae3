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

//! HTTP implementation of [`ContestClient`].
//!
//! Every service call is a `POST` to `{base_url}/services/<Service>/<method>`
//! with a JSON array of positional arguments as the body.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, COOKIE, REFERER, USER_AGENT};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::debug;

use super::ContestClient;
use crate::config::OrchestratorConfig;
use crate::error::{ClientError, ConfigError};
use crate::models::{MatchContent, MatchReport, PendingMatch, Solution};

const FIND_PENDING: &str = "ClashOfCode/findPendingClashes";
const PLAY_CLASH: &str = "ClashOfCode/playClash";
const START_CLASH_SESSION: &str = "ClashOfCode/startClashTestSession";
const START_TEST_SESSION: &str = "TestSession/startTestSession";
const SUBMIT: &str = "TestSession/submit";
const SHARE: &str = "ClashOfCode/shareCodinGamerSolutionByHandle";
const FIND_REPORT: &str = "ClashOfCode/findClashReportInfoByHandle";
const FIND_SOLUTION: &str = "Solution/findSolution";

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/117.0.0.0 Safari/537.36";
const MAX_ERROR_BODY: usize = 512;

/// Contest client speaking the service's JSON-over-POST protocol.
#[derive(Clone)]
pub struct HttpContestClient {
    base_url: String,
    user_id: String,
    client: reqwest::Client,
}

impl HttpContestClient {
    /// Builds a client from the orchestrator configuration.
    ///
    /// Fails if the session token cannot be used as a cookie header value.
    pub fn new(config: &OrchestratorConfig) -> Result<Self, ConfigError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        let cookie = HeaderValue::from_str(&format!("cgSession={}", config.session_token()))
            .map_err(|e| ConfigError::InvalidValue {
                field: "session_token",
                message: e.to_string(),
            })?;
        headers.insert(COOKIE, cookie);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                field: "http_client",
                message: e.to_string(),
            })?;

        Ok(Self {
            base_url: config.base_url().trim_end_matches('/').to_string(),
            user_id: config.user_id().to_string(),
            client,
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/services/{}", self.base_url, endpoint)
    }

    fn referer(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Sends one service call and returns the raw response body.
    async fn call(&self, endpoint: &str, referer: &str, body: Value) -> Result<Vec<u8>, ClientError> {
        debug!(endpoint, "POST service call");
        let response = self
            .client
            .post(self.url(endpoint))
            .header(REFERER, self.referer(referer))
            .json(&body)
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                endpoint: endpoint.to_string(),
                source,
            })?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|source| ClientError::Transport {
                endpoint: endpoint.to_string(),
                source,
            })?;

        if !status.is_success() {
            let mut body = String::from_utf8_lossy(&bytes).into_owned();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(ClientError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(bytes.to_vec())
    }

    async fn call_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        referer: &str,
        body: Value,
    ) -> Result<T, ClientError> {
        let bytes = self.call(endpoint, referer, body).await?;
        serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl ContestClient for HttpContestClient {
    async fn list_pending_matches(&self) -> Result<Vec<PendingMatch>, ClientError> {
        self.call_json(FIND_PENDING, "multiplayer/clashofcode", json!([]))
            .await
    }

    async fn join_match(&self, public_handle: &str) -> Result<(), ClientError> {
        // playClash joins whichever match the service is filling; the handle
        // only identifies the match for logging.
        debug!(handle = public_handle, "joining waiting match");
        self.call(
            PLAY_CLASH,
            "multiplayer/clashofcode",
            json!([self.user_id, null]),
        )
        .await
        .map(|_| ())
    }

    async fn fetch_match_content(&self, public_handle: &str) -> Result<MatchContent, ClientError> {
        let referer = format!("clashofcode/clash/{}", public_handle);
        let session: Value = self
            .call_json(
                START_CLASH_SESSION,
                &referer,
                json!([self.user_id, public_handle]),
            )
            .await?;
        let session_handle = session
            .get("handle")
            .and_then(Value::as_str)
            .ok_or_else(|| ClientError::UnexpectedPayload {
                endpoint: START_CLASH_SESSION.to_string(),
                message: "missing test session handle".to_string(),
            })?
            .to_string();

        let payload: Value = self
            .call_json(START_TEST_SESSION, &referer, json!([session_handle]))
            .await?;
        MatchContent::from_payload(START_TEST_SESSION, payload, &session_handle)
    }

    async fn submit_solution(
        &self,
        test_session_handle: &str,
        code: &str,
        language_id: &str,
    ) -> Result<(), ClientError> {
        self.call(
            SUBMIT,
            "multiplayer/clashofcode",
            json!([
                test_session_handle,
                {"code": code, "programmingLanguageId": language_id},
                null
            ]),
        )
        .await
        .map(|_| ())
    }

    async fn share_solution(&self, public_handle: &str) -> Result<(), ClientError> {
        self.call(
            SHARE,
            &format!("clashofcode/clash/report/{}", public_handle),
            json!([self.user_id, public_handle]),
        )
        .await
        .map(|_| ())
    }

    async fn fetch_match_report(&self, public_handle: &str) -> Result<MatchReport, ClientError> {
        self.call_json(
            FIND_REPORT,
            &format!("clashofcode/clash/report/{}", public_handle),
            json!([public_handle]),
        )
        .await
    }

    async fn fetch_submitted_code(&self, submission_id: i64) -> Result<Solution, ClientError> {
        self.call_json(
            FIND_SOLUTION,
            "multiplayer/clashofcode",
            json!([self.user_id, submission_id]),
        )
        .await
    }
}
