// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! fleet - thin CLI client for the fleetd tool surface.

mod client;
mod env;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client::DaemonClient;
use serde_json::Value;

#[derive(Parser, Debug)]
#[command(name = "fleet", version, about = "Thin client for the fleetd process-orchestration daemon")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List every tool the daemon exposes
    Tools,
    /// Call a tool by name with a JSON argument object
    Call {
        /// Tool name, e.g. `process.start`
        name: String,
        /// JSON-encoded arguments (defaults to `{}`)
        #[arg(default_value = "{}")]
        args: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = DaemonClient::new();

    let output = match cli.command {
        Commands::Tools => client.list_tools().await?,
        Commands::Call { name, args } => {
            let args: Value = serde_json::from_str(&args).context("arguments must be a JSON object")?;
            client.call_tool(&name, args).await?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod main_tests;
