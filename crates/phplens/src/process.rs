// Copyright (c) 2026 - present The phplens authors
// SPDX-License-Identifier: MIT

//! External process execution with line-streamed output

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::RunError;

/// One line of process output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputLine {
    /// Line read from stdout
    Stdout(String),
    /// Line read from stderr
    Stderr(String),
}

/// Runs a command line to completion
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run `argv` in `cwd`, forwarding every output line to `output`
    ///
    /// Returns the captured stdout once the process has exited. A non-zero
    /// exit status is not an error: PHPUnit exits non-zero when tests fail.
    async fn run(
        &self,
        argv: &[String],
        cwd: &Path,
        output: mpsc::UnboundedSender<OutputLine>,
    ) -> Result<String, RunError>;
}

/// Runner backed by `tokio::process`
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioProcessRunner;

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(
        &self,
        argv: &[String],
        cwd: &Path,
        output: mpsc::UnboundedSender<OutputLine>,
    ) -> Result<String, RunError> {
        let Some((program, args)) = argv.split_first() else {
            return Err(RunError::ProcessSpawn {
                program: String::new(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command line"),
            });
        };

        let mut child = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| RunError::ProcessSpawn {
                program: program.clone(),
                source,
            })?;
        debug!(program = %program, pid = ?child.id(), "Spawned process");

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let stderr_tx = output.clone();
        let read_stderr = async move {
            if let Some(stderr) = stderr {
                let mut reader = BufReader::new(stderr);
                while let Some(line) = read_line_lossy(&mut reader).await? {
                    let _ = stderr_tx.send(OutputLine::Stderr(line));
                }
            }
            Ok::<_, std::io::Error>(())
        };
        let read_stdout = async {
            let mut captured = String::new();
            if let Some(stdout) = stdout {
                let mut reader = BufReader::new(stdout);
                while let Some(line) = read_line_lossy(&mut reader).await? {
                    captured.push_str(&line);
                    captured.push('\n');
                    let _ = output.send(OutputLine::Stdout(line));
                }
            }
            Ok::<_, std::io::Error>(captured)
        };

        let (captured, stderr_done) = tokio::join!(read_stdout, read_stderr);
        let status = child.wait().await?;
        debug!(program = %program, %status, "Process exited");

        stderr_done?;
        Ok(captured?)
    }
}

/// Read one line, replacing invalid UTF-8 instead of failing
///
/// Returns `None` at end of stream. The trailing `\n` (and `\r`) is removed.
async fn read_line_lossy<R>(reader: &mut R) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    if reader.read_until(b'\n', &mut buf).await? == 0 {
        return Ok(None);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
    Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
}
