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

//! Clashbot CLI - runs the match orchestrator and its manual maintenance commands.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

use commands::{BotArgs, MetricsArgs};

/// Clashbot - joins pending coding matches and archives their winning solutions
#[derive(Parser)]
#[command(name = "clashbot")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    bot: BotArgs,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll for matches and drive them through every stage until Ctrl-C
    Run {
        #[command(flatten)]
        metrics: MetricsArgs,
    },

    /// Harvest the solutions of one finished match into the archive
    Harvest {
        /// Public handle of the match
        #[arg(long)]
        handle: String,

        /// Question id the solutions belong to
        #[arg(long)]
        question: String,
    },

    /// Fetch and archive the puzzle of one started match
    FetchContent {
        /// Public handle of the match
        #[arg(long)]
        handle: String,
    },

    /// List archived puzzles and how many solutions each holds
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Commands::Run { metrics } => commands::run::run(&cli.bot, &metrics).await?,
        Commands::Harvest { handle, question } => {
            commands::harvest::run(&cli.bot, &handle, &question).await?
        }
        Commands::FetchContent { handle } => commands::fetch_content::run(&cli.bot, &handle).await?,
        Commands::Stats => commands::stats::run(cli.bot.data_dir())?,
    }

    Ok(())
}
