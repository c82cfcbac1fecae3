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

//! Implementation of the `run` command.

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tracing::info;

use super::{open_orchestrator, BotArgs, MetricsArgs};

/// Installs the Prometheus exporter on `0.0.0.0:<port>`.
fn install_exporter(port: u16) -> Result<()> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .add_global_label("app", "codingame-bot")
        .install()
        .context("Failed to install Prometheus exporter")?;
    info!("Serving metrics on {}", addr);
    Ok(())
}

/// Runs discovery and stage execution until Ctrl-C.
pub async fn run(bot: &BotArgs, metrics: &MetricsArgs) -> Result<()> {
    let config = bot.config()?;
    // The recorder must be installed before counters are described.
    if metrics.metrics {
        install_exporter(metrics.metrics_port)?;
    }
    let orchestrator = open_orchestrator(config)?;

    tokio::select! {
        _ = Arc::clone(&orchestrator).run() => {}
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
            info!("Received Ctrl-C, shutting down");
        }
    }
    Ok(())
}
