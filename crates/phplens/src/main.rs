// Copyright (c) 2026 - present The phplens authors
// SPDX-License-Identifier: MIT

//! phplens: run PHPUnit and report test diagnostics per file
//!
//! Runs PHPUnit once (or on every change in watch mode), parses its JUnit or
//! TeamCity output and prints the failing tests grouped per file.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use phplens::config::{Config, OutputFormat};
use phplens::filesystem::LocalFilesystem;
use phplens::process::TokioProcessRunner;
use phplens::watch::ChangeDetector;
use phplens::{PhpunitDriver, RunEvent, RunRequest, is_runnable, report};
use phplens_results::{Store, TypeGroups};
use tracing::{debug, error, info, trace, warn};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let config = Config::parse();

    // Logs go to stderr, the report to stdout
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(config.log_level().into()),
        )
        .init();

    config.validate()?;
    let root = config
        .root_path()
        .context("Cannot determine the project root")?;
    let target = config.target_path();

    let driver = PhpunitDriver::new(
        root,
        Arc::new(LocalFilesystem::new()),
        Arc::new(TokioProcessRunner),
    )
    .with_debounce(config.debounce());
    spawn_event_logger(&driver);

    let mut store = Store::new();
    let passed = run(&driver, &config, &target, &mut store).await?;
    if !config.watch {
        return Ok(if passed {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    }

    info!(path = %target.display(), "Watching for changes");
    let mut detector = ChangeDetector::new(&target);
    let mut ticker = tokio::time::interval(config.poll_interval());
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if detector.changed(&target) {
                    if let Err(e) = run(&driver, &config, &target, &mut store).await {
                        error!(error = %e, "Run failed");
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Stopping watch");
                return Ok(ExitCode::SUCCESS);
            }
        }
    }
}

/// Run PHPUnit once and print the report; returns whether all tests passed
async fn run(
    driver: &PhpunitDriver,
    config: &Config,
    target: &Path,
    store: &mut Store,
) -> anyhow::Result<bool> {
    if target.is_file() {
        let source = tokio::fs::read_to_string(target)
            .await
            .with_context(|| format!("Cannot read {}", target.display()))?;
        if !is_runnable(target, &source) {
            warn!(path = %target.display(), "Not a PHPUnit test file, skipping");
            return Ok(true);
        }
    }

    let mut request = RunRequest::new(target.display().to_string())
        .with_options(config.command_options());
    if let Some(ref phpunit) = config.phpunit {
        request = request.with_executable(phpunit.clone());
    }

    let cases = driver.handle(request).await?;
    store.put(cases);

    match config.format {
        OutputFormat::Text => print!("{}", report::render_text(store, &TypeGroups::default())),
        OutputFormat::Json => println!("{}", report::render_json(store)?),
    }
    Ok(store.summary().all_passed())
}

/// Forward driver events to the log
fn spawn_event_logger(driver: &PhpunitDriver) {
    let mut events = driver.subscribe();
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                RunEvent::Command(command) => info!(%command, "Running PHPUnit"),
                RunEvent::Stdout(line) => trace!(target: "phpunit::stdout", "{line}"),
                RunEvent::Stderr(line) => debug!(target: "phpunit::stderr", "{line}"),
                RunEvent::TestFinished(case) => {
                    debug!(test = %case.name, status = %case.kind, line = case.line, "Test finished");
                }
                RunEvent::Finished { total } => debug!(total, "Run finished"),
                RunEvent::Failed(reason) => debug!(%reason, "Run failed"),
            }
        }
    });
}
