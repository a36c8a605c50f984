// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// unredact: strip overlay redactions from a PDF.
//
// Entry point. Initialises logging, parses the single path argument and runs
// the pipeline. Output goes to `<stem>-unredacted<.ext>` beside the input;
// nothing is written when the input cannot be processed.

mod cli;
mod summary;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use unredact_core::EngineConfig;
use unredact_core::error::Result;
use unredact_document::{output_path_for, unredact_file};

use cli::Cli;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    tracing::info!(file = %cli.file.display(), "unredact starting");

    match run(&cli) {
        Ok(output) => {
            eprintln!("wrote {}", output.display());
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(%err, "unredact failed");
            for line in summary::error_lines(&err) {
                eprintln!("{}", line);
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<PathBuf> {
    let output = output_path_for(&cli.file)?;
    let report = unredact_file(&cli.file, &output, &EngineConfig::default())?;

    eprintln!("{}", summary::summary_line(&report));
    for line in summary::warning_lines(&report) {
        eprintln!("{}", line);
    }
    Ok(output)
}
