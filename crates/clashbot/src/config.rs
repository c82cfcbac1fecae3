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

//! Configuration types for the [`Orchestrator`](crate::Orchestrator).
//!
//! Use [`OrchestratorConfig::builder()`] to create a configuration:
//!
//! ```rust,ignore
//! let config = OrchestratorConfig::builder()
//!     .user_id("1234321")
//!     .session_token("cg-session")
//!     .harvest_delay(Duration::from_secs(17 * 60))
//!     .build()?;
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

/// File name of the joined-handle store inside the data directory.
pub const HANDLES_FILE: &str = "public-handles.txt";
/// Directory name of the per-puzzle archive inside the data directory.
pub const ARCHIVE_DIR: &str = "clash-db";
/// File name of the sighting ledger inside the data directory.
pub const LEDGER_FILE: &str = "clash-questions.txt";

/// Configuration for the orchestrator and its HTTP client.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct OrchestratorConfig {
    user_id: String,
    session_token: String,
    base_url: String,
    data_dir: PathBuf,
    poll_interval: Duration,
    content_delay: Duration,
    submit_window_max: Duration,
    harvest_delay: Duration,
    share_delay: Duration,
    scheduler_tick: Duration,
    harvest_concurrency: usize,
    request_timeout: Duration,
    jitter_seed: Option<u64>,
}

impl OrchestratorConfig {
    /// Creates a new configuration builder with default values.
    pub fn builder() -> OrchestratorConfigBuilder {
        OrchestratorConfigBuilder::default()
    }

    /// Short numeric user identifier of the account driving the bot.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Value of the session cookie.
    pub fn session_token(&self) -> &str {
        &self.session_token
    }

    /// Root URL of the contest service.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Directory holding the handle store, the archive and the ledger.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Pause between two discovery polls.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Delay between joining a match and fetching its content.
    pub fn content_delay(&self) -> Duration {
        self.content_delay
    }

    /// Upper bound (exclusive) of the jittered submission delay.
    pub fn submit_window_max(&self) -> Duration {
        self.submit_window_max
    }

    /// Delay between fetching content and harvesting solutions.
    pub fn harvest_delay(&self) -> Duration {
        self.harvest_delay
    }

    /// Delay between a successful submission and sharing it.
    pub fn share_delay(&self) -> Duration {
        self.share_delay
    }

    /// How often the scheduler looks for due stages.
    pub fn scheduler_tick(&self) -> Duration {
        self.scheduler_tick
    }

    /// Maximum number of concurrent code fetches during a harvest.
    pub fn harvest_concurrency(&self) -> usize {
        self.harvest_concurrency
    }

    /// Per-request timeout of the HTTP client.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Fixed RNG seed for jitter and solution choice, if any.
    pub fn jitter_seed(&self) -> Option<u64> {
        self.jitter_seed
    }

    /// Path of the newline-delimited handle store.
    pub fn handles_path(&self) -> PathBuf {
        self.data_dir.join(HANDLES_FILE)
    }

    /// Directory holding one JSON record per puzzle.
    pub fn archive_dir(&self) -> PathBuf {
        self.data_dir.join(ARCHIVE_DIR)
    }

    /// Path of the `handle-questionId` sighting ledger.
    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join(LEDGER_FILE)
    }
}

/// Builder for [`OrchestratorConfig`].
#[derive(Debug, Clone)]
pub struct OrchestratorConfigBuilder {
    config: OrchestratorConfig,
}

impl Default for OrchestratorConfigBuilder {
    fn default() -> Self {
        Self {
            config: OrchestratorConfig {
                user_id: String::new(),
                session_token: String::new(),
                base_url: "https://www.codingame.com".to_string(),
                data_dir: PathBuf::from("."),
                poll_interval: Duration::from_secs(20),
                content_delay: Duration::from_secs(2 * 60),
                submit_window_max: Duration::from_secs(5 * 60),
                harvest_delay: Duration::from_secs(17 * 60),
                share_delay: Duration::from_secs(10),
                scheduler_tick: Duration::from_secs(1),
                harvest_concurrency: 8,
                request_timeout: Duration::from_secs(30),
                jitter_seed: None,
            },
        }
    }
}

impl OrchestratorConfigBuilder {
    /// Sets the user identifier.
    pub fn user_id(mut self, value: impl Into<String>) -> Self {
        self.config.user_id = value.into();
        self
    }

    /// Sets the session cookie value.
    pub fn session_token(mut self, value: impl Into<String>) -> Self {
        self.config.session_token = value.into();
        self
    }

    /// Sets the service root URL.
    pub fn base_url(mut self, value: impl Into<String>) -> Self {
        self.config.base_url = value.into();
        self
    }

    /// Sets the data directory.
    pub fn data_dir(mut self, value: impl Into<PathBuf>) -> Self {
        self.config.data_dir = value.into();
        self
    }

    /// Sets the discovery poll interval.
    pub fn poll_interval(mut self, value: Duration) -> Self {
        self.config.poll_interval = value;
        self
    }

    /// Sets the join-to-content delay.
    pub fn content_delay(mut self, value: Duration) -> Self {
        self.config.content_delay = value;
        self
    }

    /// Sets the submission jitter window.
    pub fn submit_window_max(mut self, value: Duration) -> Self {
        self.config.submit_window_max = value;
        self
    }

    /// Sets the content-to-harvest delay.
    pub fn harvest_delay(mut self, value: Duration) -> Self {
        self.config.harvest_delay = value;
        self
    }

    /// Sets the submit-to-share delay.
    pub fn share_delay(mut self, value: Duration) -> Self {
        self.config.share_delay = value;
        self
    }

    /// Sets the scheduler tick.
    pub fn scheduler_tick(mut self, value: Duration) -> Self {
        self.config.scheduler_tick = value;
        self
    }

    /// Sets the harvest fan-out cap.
    pub fn harvest_concurrency(mut self, value: usize) -> Self {
        self.config.harvest_concurrency = value;
        self
    }

    /// Sets the HTTP request timeout.
    pub fn request_timeout(mut self, value: Duration) -> Self {
        self.config.request_timeout = value;
        self
    }

    /// Fixes the jitter RNG seed.
    pub fn jitter_seed(mut self, value: Option<u64>) -> Self {
        self.config.jitter_seed = value;
        self
    }

    /// Validates and builds the configuration.
    pub fn build(self) -> Result<OrchestratorConfig, ConfigError> {
        let config = self.config;
        if config.user_id.trim().is_empty() {
            return Err(ConfigError::MissingCredential("USER_ID"));
        }
        if config.session_token.trim().is_empty() {
            return Err(ConfigError::MissingCredential("SESSION_TOKEN"));
        }
        if config.base_url.trim().is_empty() {
            return Err(invalid("base_url", "must not be empty"));
        }
        if config.poll_interval.is_zero() {
            return Err(invalid("poll_interval", "must be greater than zero"));
        }
        if config.scheduler_tick.is_zero() {
            return Err(invalid("scheduler_tick", "must be greater than zero"));
        }
        if config.submit_window_max.is_zero() {
            return Err(invalid("submit_window_max", "must be greater than zero"));
        }
        if config.harvest_concurrency == 0 {
            return Err(invalid("harvest_concurrency", "must be at least 1"));
        }
        Ok(config)
    }
}

fn invalid(field: &'static str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        message: message.to_string(),
    }
}

/// Parse a duration string like "20s", "2m", "17m", "1m30s" into a [`Duration`].
///
/// Supported units:
/// - `d` - days
/// - `h` - hours
/// - `m` - minutes
/// - `s` - seconds
pub fn parse_duration(s: &str) -> Result<Duration, ConfigError> {
    let s = s.trim().to_lowercase();
    if s.is_empty() {
        return Err(ConfigError::InvalidDuration(
            "duration string cannot be empty".to_string(),
        ));
    }

    let mut total = Duration::ZERO;
    let mut current_num = String::new();

    for c in s.chars() {
        if c.is_ascii_digit() {
            current_num.push(c);
            continue;
        }
        if current_num.is_empty() {
            return Err(ConfigError::InvalidDuration(format!(
                "expected number before '{}' in '{}'",
                c, s
            )));
        }

        let num: u64 = current_num
            .parse()
            .map_err(|_| ConfigError::InvalidDuration(format!("invalid number in '{}'", s)))?;
        current_num.clear();

        let secs = match c {
            'd' => num.saturating_mul(86_400),
            'h' => num.saturating_mul(3_600),
            'm' => num.saturating_mul(60),
            's' => num,
            _ => {
                return Err(ConfigError::InvalidDuration(format!(
                    "unknown unit '{}' in '{}'; use d, h, m or s",
                    c, s
                )))
            }
        };
        total = total.saturating_add(Duration::from_secs(secs));
    }

    if !current_num.is_empty() {
        return Err(ConfigError::InvalidDuration(format!(
            "'{}' is missing a unit; use d, h, m or s",
            s
        )));
    }

    Ok(total)
}
