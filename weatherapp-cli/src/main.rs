//! Binary crate for the `weatherapp` command-line tool.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Logging setup
//! - Interactive location prompts

use std::process::ExitCode;

use clap::Parser;

mod cli;
mod logging;
mod prompt;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cmd = cli::Cli::parse();
    cmd.run().await
}
