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

//! Subcommand implementations and the arguments they share.

use anyhow::{Context, Result};
use clap::Args;
use clashbot::{
    parse_duration, HttpContestClient, MetricsRecorder, Orchestrator, OrchestratorConfig,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub mod fetch_content;
pub mod harvest;
pub mod run;
pub mod stats;

/// Account, service and timing settings shared by every subcommand.
#[derive(Args, Debug)]
pub struct BotArgs {
    /// Numeric id of the account driving the bot
    #[arg(long, env = "USER_ID", global = true)]
    pub user_id: Option<String>,

    /// Value of the service session cookie
    #[arg(long, env = "SESSION_TOKEN", global = true, hide_env_values = true)]
    pub session_token: Option<String>,

    /// Root URL of the contest service
    #[arg(
        long,
        env = "CLASHBOT_BASE_URL",
        global = true,
        default_value = "https://www.codingame.com"
    )]
    pub base_url: String,

    /// Directory holding the handle store, the archive and the ledger
    #[arg(long, env = "CLASHBOT_DATA_DIR", global = true, default_value = ".")]
    pub data_dir: PathBuf,

    /// Pause between two discovery polls (e.g. "20s")
    #[arg(long, env = "POLL_INTERVAL", global = true, default_value = "20s", value_parser = parse_duration)]
    pub poll_interval: Duration,

    /// Delay between joining a match and fetching its content
    #[arg(long, env = "CONTENT_DELAY", global = true, default_value = "2m", value_parser = parse_duration)]
    pub content_delay: Duration,

    /// Upper bound of the randomized submission delay
    #[arg(
        long = "submit-window",
        env = "SUBMIT_WINDOW_MAX",
        global = true,
        default_value = "5m",
        value_parser = parse_duration
    )]
    pub submit_window_max: Duration,

    /// Delay between fetching content and harvesting solutions
    #[arg(long, env = "HARVEST_DELAY", global = true, default_value = "17m", value_parser = parse_duration)]
    pub harvest_delay: Duration,

    /// Delay between a submission and sharing it
    #[arg(long, env = "SHARE_DELAY", global = true, default_value = "10s", value_parser = parse_duration)]
    pub share_delay: Duration,

    /// Maximum concurrent code fetches per harvest
    #[arg(long, env = "HARVEST_CONCURRENCY", global = true, default_value_t = 8)]
    pub harvest_concurrency: usize,

    /// Per-request HTTP timeout
    #[arg(long, env = "REQUEST_TIMEOUT", global = true, default_value = "30s", value_parser = parse_duration)]
    pub request_timeout: Duration,

    /// Fixed seed for submission timing and solution choice
    #[arg(long, env = "JITTER_SEED", global = true)]
    pub jitter_seed: Option<u64>,
}

impl BotArgs {
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Builds the orchestrator configuration. Missing credentials are fatal.
    pub fn config(&self) -> Result<OrchestratorConfig> {
        let config = OrchestratorConfig::builder()
            .user_id(self.user_id.clone().unwrap_or_default())
            .session_token(self.session_token.clone().unwrap_or_default())
            .base_url(self.base_url.clone())
            .data_dir(self.data_dir.clone())
            .poll_interval(self.poll_interval)
            .content_delay(self.content_delay)
            .submit_window_max(self.submit_window_max)
            .harvest_delay(self.harvest_delay)
            .share_delay(self.share_delay)
            .harvest_concurrency(self.harvest_concurrency)
            .request_timeout(self.request_timeout)
            .jitter_seed(self.jitter_seed)
            .build()
            .context("Invalid configuration. Set --user-id/USER_ID and --session-token/SESSION_TOKEN")?;
        Ok(config)
    }
}

/// Prometheus exporter settings for `run`.
#[derive(Args, Debug)]
pub struct MetricsArgs {
    /// Expose counters on a Prometheus endpoint
    #[arg(
        long,
        env = "USE_METRICS",
        action = clap::ArgAction::SetTrue,
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    pub metrics: bool,

    /// Port of the Prometheus endpoint
    #[arg(long, env = "METRICS_PORT", default_value_t = 62622)]
    pub metrics_port: u16,
}

/// Builds the HTTP client and opens the stores under the data directory.
pub fn open_orchestrator(config: OrchestratorConfig) -> Result<Arc<Orchestrator>> {
    let client = HttpContestClient::new(&config).context("Failed to build HTTP client")?;
    let orchestrator = Orchestrator::open(config, Arc::new(client), Arc::new(MetricsRecorder::new()))
        .context("Failed to open data stores")?;
    Ok(Arc::new(orchestrator))
}
