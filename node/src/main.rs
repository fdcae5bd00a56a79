// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Lockbox CLI
//!
//! Entry point for the `lockbox` binary. Parses CLI arguments, initializes
//! logging, runs one ledger operation against the data directory, and prints
//! the result as JSON on stdout.
//!
//! ## Exit status
//!
//! - `0`: success
//! - `1`–`10`: the ledger rejected the operation; the status is the ledger
//!   error code (`1` Unauthorized … `10` Callback) and stdout carries an
//!   `{"error": ..}` object
//! - `70`: anything else (I/O, corrupt store, uninitialized data directory)

mod cli;
mod commands;
mod journal;
mod logging;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use lockbox_contracts::VaultError;
use serde_json::{json, Value};

use cli::{Commands, LockboxCli};

/// Exit status for failures outside the ledger's error taxonomy.
const EXIT_INTERNAL: u8 = 70;

fn main() -> ExitCode {
    let cli = LockboxCli::parse();

    if let Commands::Version = cli.command {
        print_version();
        return ExitCode::SUCCESS;
    }

    logging::init_logging(logging::DEFAULT_FILTER, cli.log_format);

    match commands::execute(cli).and_then(|value| print_json(&value)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report(err),
    }
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Map a failed command to its exit status.
fn report(err: anyhow::Error) -> ExitCode {
    match err.downcast_ref::<VaultError>() {
        Some(rejection) => {
            let body = json!({
                "error": {
                    "code": rejection.code(),
                    "message": rejection.to_string(),
                }
            });
            if print_json(&body).is_err() {
                eprintln!("error: {rejection}");
            }
            ExitCode::from(rejection.code())
        }
        None => {
            tracing::error!("{err:#}");
            ExitCode::from(EXIT_INTERNAL)
        }
    }
}

/// Prints version information to stdout.
fn print_version() {
    println!("lockbox   {}", env!("CARGO_PKG_VERSION"));
    println!("protocol  {}", lockbox_protocol::config::PROTOCOL_VERSION);
}
