// Copyright (c) 2026 - present The phplens authors
// SPDX-License-Identifier: MIT

//! PHPUnit driver
//!
//! Builds the PHPUnit command line, debounces run requests, executes PHPUnit
//! through a [`ProcessRunner`] and turns its output into test cases with the
//! parser matching the requested output format.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock, Mutex, PoisonError};
use std::time::Duration;

use phplens_results::{Format, ParserFactory, TestCase};
use regex::Regex;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use crate::debounce::Debouncer;
use crate::error::RunError;
use crate::filesystem::Filesystem;
use crate::options::CommandOptions;
use crate::process::{OutputLine, ProcessRunner};

/// Default debounce delay between a request and the PHPUnit launch
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

/// Configuration files probed under the project root, in order
const CONFIGURATION_FILES: [&str; 2] = ["phpunit.xml", "phpunit.xml.dist"];

static ANSI_ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]").expect("ANSI escape pattern is valid")
});

/// Marks a source file as a PHPUnit test
///
/// Matches `PHPUnit\Framework\TestCase`, the legacy
/// `PHPUnit_Framework_TestCase` and project base classes named `TestCase`.
const TEST_CASE_KEYWORD: &str = "TestCase";

/// Lifecycle of the most recent request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    /// No request seen yet
    Idle,
    /// A request is waiting for its debounce delay or for the running process
    Debouncing,
    /// PHPUnit is running
    Executing,
    /// The last run produced test cases
    Succeeded,
    /// The last run ended with an error
    Failed,
}

/// Progress notifications published to subscribers
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    /// Command line about to be executed
    Command(String),
    /// Line of PHPUnit stdout
    Stdout(String),
    /// Line of PHPUnit stderr
    Stderr(String),
    /// A test completed (TeamCity runs only)
    TestFinished(TestCase),
    /// The run completed and produced `total` test cases
    Finished {
        /// Number of test cases parsed
        total: usize,
    },
    /// The run failed
    Failed(String),
}

/// A request to run PHPUnit against a file or directory
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    /// Test file or directory, appended as the last argument
    pub path: String,
    /// Caller options, passed through untouched
    pub options: CommandOptions,
    /// Explicit PHPUnit executable
    pub executable: Option<String>,
}

impl RunRequest {
    /// Request a run of `path` with no extra options
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Set the caller options
    #[must_use]
    pub fn with_options(mut self, options: CommandOptions) -> Self {
        self.options = options;
        self
    }

    /// Set an explicit PHPUnit executable
    #[must_use]
    pub fn with_executable(mut self, executable: impl Into<String>) -> Self {
        self.executable = Some(executable.into());
        self
    }
}

/// Drives PHPUnit runs for one project root
pub struct PhpunitDriver {
    root: PathBuf,
    files: Arc<dyn Filesystem>,
    runner: Arc<dyn ProcessRunner>,
    parsers: ParserFactory,
    debouncer: Debouncer,
    delay: Duration,
    execution: tokio::sync::Mutex<()>,
    latest: AtomicU64,
    waiting: AtomicUsize,
    state: watch::Sender<RunState>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<RunEvent>>>,
}

impl PhpunitDriver {
    /// Create a driver for the project at `root`
    #[must_use]
    pub fn new(
        root: impl Into<PathBuf>,
        files: Arc<dyn Filesystem>,
        runner: Arc<dyn ProcessRunner>,
    ) -> Self {
        Self {
            root: root.into(),
            files,
            runner,
            parsers: ParserFactory::new(),
            debouncer: Debouncer::new(),
            delay: DEFAULT_DEBOUNCE,
            execution: tokio::sync::Mutex::new(()),
            latest: AtomicU64::new(0),
            waiting: AtomicUsize::new(0),
            state: watch::Sender::new(RunState::Idle),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Set the debounce delay
    #[must_use]
    pub fn with_debounce(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Use a custom parser factory
    #[must_use]
    pub fn with_parsers(mut self, parsers: ParserFactory) -> Self {
        self.parsers = parsers;
        self
    }

    /// Project root used as working directory
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> RunState {
        *self.state.borrow()
    }

    /// Watch lifecycle transitions
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<RunState> {
        self.state.subscribe()
    }

    /// Receive progress events for every subsequent run
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<RunEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    /// Debounce a request, then run it
    ///
    /// Only the most recent request runs. One that is still waiting when a
    /// newer request arrives, either for its delay or for the process
    /// already running, is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Superseded`] if another request arrives before
    /// this one starts, otherwise any error from [`Self::fire`].
    pub async fn handle(&self, request: RunRequest) -> Result<Vec<TestCase>, RunError> {
        let generation = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        let waiting = Waiting::enter(&self.waiting);
        self.state.send_if_modified(|state| {
            if *state == RunState::Executing {
                false
            } else {
                *state = RunState::Debouncing;
                true
            }
        });

        let ticket = self.debouncer.schedule(self.delay);
        if let Err(e) = ticket.wait().await {
            debug!(path = %request.path, "Request superseded");
            return Err(e);
        }

        let running = self.execution.lock().await;
        drop(waiting);
        if self.latest.load(Ordering::SeqCst) != generation {
            debug!(path = %request.path, "Request superseded while queued");
            return Err(RunError::Superseded);
        }
        self.run(running, request).await
    }

    /// Run immediately, bypassing the debounce timer
    ///
    /// Runs are serialized: a second call waits for the first process to end.
    ///
    /// # Errors
    ///
    /// Returns an error if no executable is found, the process cannot be
    /// spawned, or its output cannot be parsed.
    pub async fn fire(&self, request: RunRequest) -> Result<Vec<TestCase>, RunError> {
        let running = self.execution.lock().await;
        self.run(running, request).await
    }

    async fn run(
        &self,
        _running: tokio::sync::MutexGuard<'_, ()>,
        request: RunRequest,
    ) -> Result<Vec<TestCase>, RunError> {
        self.set_state(RunState::Executing);

        let result = self.execute(request).await;
        let outcome = match &result {
            Ok(cases) => {
                info!(total = cases.len(), "PHPUnit run finished");
                self.emit(RunEvent::Finished { total: cases.len() });
                RunState::Succeeded
            }
            Err(e) => {
                info!(error = %e, "PHPUnit run failed");
                self.emit(RunEvent::Failed(e.to_string()));
                RunState::Failed
            }
        };
        if self.waiting.load(Ordering::SeqCst) > 0 {
            self.set_state(RunState::Debouncing);
        } else {
            self.set_state(outcome);
        }
        result
    }

    async fn execute(&self, request: RunRequest) -> Result<Vec<TestCase>, RunError> {
        let RunRequest {
            path,
            mut options,
            executable,
        } = request;

        let teamcity = options.is_teamcity();
        let log = if teamcity {
            None
        } else {
            let log = self.files.tmpfile("phplens-junit", "xml");
            options.put("--log-junit", log.display().to_string());
            Some(log)
        };
        if !options.has_configuration() {
            match self.configuration().await {
                Some(config) => {
                    options.put("-c", config.display().to_string());
                }
                None => debug!(root = %self.root.display(), "No PHPUnit configuration file"),
            }
        }

        let program = self.executable(executable.as_deref()).await?;
        let mut argv = vec![program];
        argv.extend(options.to_args());
        argv.push(path);
        self.emit(RunEvent::Command(argv.join(" ")));

        let (tx, mut rx) = mpsc::unbounded_channel();
        let run = self.runner.run(&argv, &self.root, tx);
        let forward = async {
            let mut live = teamcity.then(|| self.parsers.teamcity().streaming());
            while let Some(line) = rx.recv().await {
                match line {
                    OutputLine::Stdout(text) => {
                        if let Some(parser) = live.as_mut() {
                            for case in parser.process_line(&strip_ansi(&text)) {
                                self.emit(RunEvent::TestFinished(case));
                            }
                        }
                        self.emit(RunEvent::Stdout(text));
                    }
                    OutputLine::Stderr(text) => self.emit(RunEvent::Stderr(text)),
                }
            }
        };
        let (stdout, ()) = tokio::join!(run, forward);
        let stdout = stdout?;

        match log {
            None => Ok(self
                .parsers
                .create_for(Format::TeamCity)
                .parse(&strip_ansi(&stdout))?),
            Some(log) => {
                let content = self.files.get(&log).await;
                if content.is_ok() || self.files.exists(&log).await {
                    self.files.unlink(&log).await;
                } else {
                    debug!(log = %log.display(), "PHPUnit wrote no JUnit report");
                }
                Ok(self.parsers.create_for(Format::JUnit).parse(&content?)?)
            }
        }
    }

    /// First existing configuration file under the root
    async fn configuration(&self) -> Option<PathBuf> {
        for name in CONFIGURATION_FILES {
            let candidate = self.root.join(name);
            if self.files.exists(&candidate).await {
                debug!(config = %candidate.display(), "Using PHPUnit configuration");
                return Some(candidate);
            }
        }
        None
    }

    /// Resolve the PHPUnit executable
    async fn executable(&self, explicit: Option<&str>) -> Result<String, RunError> {
        if let Some(explicit) = explicit.filter(|e| !e.is_empty() && *e != "phpunit") {
            debug!(executable = explicit, "Using explicit PHPUnit executable");
            return Ok(explicit.to_string());
        }

        let candidates = [
            self.root.join("vendor").join("bin").join("phpunit"),
            self.root.join("phpunit.phar"),
            PathBuf::from("phpunit"),
        ];
        for candidate in &candidates {
            if let Some(found) = self.files.find(candidate, &self.root).await {
                debug!(executable = %found.display(), "Resolved PHPUnit executable");
                return Ok(found.display().to_string());
            }
        }
        Err(RunError::ExecutableNotFound {
            searched: candidates
                .iter()
                .map(|c| c.display().to_string())
                .collect(),
        })
    }

    fn set_state(&self, state: RunState) {
        self.state.send_replace(state);
    }

    fn emit(&self, event: RunEvent) {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

/// Counts a request between its arrival and the start of its run
struct Waiting<'a>(&'a AtomicUsize);

impl<'a> Waiting<'a> {
    fn enter(count: &'a AtomicUsize) -> Self {
        count.fetch_add(1, Ordering::SeqCst);
        Self(count)
    }
}

impl Drop for Waiting<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for PhpunitDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhpunitDriver")
            .field("root", &self.root)
            .field("delay", &self.delay)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Check if a file looks like a PHPUnit test case
///
/// The file must be a `.php` file (but not a `.git.php` conflict copy) whose
/// source mentions a `TestCase`. Test classes often extend a project base
/// class, so the import is enough.
#[must_use]
pub fn is_runnable(path: &Path, source: &str) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.ends_with(".php")
        && !name.ends_with(".git.php")
        && source.contains(TEST_CASE_KEYWORD)
}

/// Remove terminal color sequences
#[must_use]
pub fn strip_ansi(text: &str) -> String {
    ANSI_ESCAPE.replace_all(text, "").into_owned()
}
