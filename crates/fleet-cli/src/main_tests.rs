// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::error::ErrorKind;
use clap::Parser;

use super::{Cli, Commands};

#[test]
fn version_long() {
    let err = Cli::try_parse_from(["fleet", "--version"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DisplayVersion);
}

#[test]
fn no_subcommand_is_an_error() {
    let err = Cli::try_parse_from(["fleet"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingSubcommand);
}

#[test]
fn tools_subcommand_parses() {
    let cli = Cli::try_parse_from(["fleet", "tools"]).unwrap();
    assert!(matches!(cli.command, Commands::Tools));
}

#[test]
fn call_subcommand_parses_name_and_default_args() {
    let cli = Cli::try_parse_from(["fleet", "call", "process.list"]).unwrap();
    match cli.command {
        Commands::Call { name, args } => {
            assert_eq!(name, "process.list");
            assert_eq!(args, "{}");
        }
        other => panic!("expected Commands::Call, got {other:?}"),
    }
}

#[test]
fn call_subcommand_parses_explicit_args() {
    let cli = Cli::try_parse_from(["fleet", "call", "process.start", r#"{"command":["echo"]}"#]).unwrap();
    match cli.command {
        Commands::Call { name, args } => {
            assert_eq!(name, "process.start");
            assert_eq!(args, r#"{"command":["echo"]}"#);
        }
        other => panic!("expected Commands::Call, got {other:?}"),
    }
}
