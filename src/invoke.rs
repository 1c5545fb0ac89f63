//! Invocation adapter: the one place external programs are spawned
//!
//! An `Invocation` describes a single run of ripgrep, git or gh. The
//! `Invoker` runs it and classifies the outcome. A non-zero exit is never an
//! `Err` here; it is encoded in `ExitClass` so callers can tell "no matches"
//! apart from "tool missing" and from a genuine failure.

use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use strum::{Display, EnumString};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::config::ToolPaths;
use crate::error::ReconError;

/// External tools the engine knows how to drive
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, Serialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    Rg,
    Git,
    Gh,
}

impl Tool {
    /// Exit codes that mean "ran fine, found nothing"
    pub fn no_match_codes(self) -> &'static [i32] {
        match self {
            // 0 = matches, 1 = no matches, 2+ = error
            Tool::Rg => &[1],
            Tool::Git | Tool::Gh => &[],
        }
    }
}

/// One external program run. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub tool: Tool,
    /// Binary override; the configured binary for `tool` is used when unset
    pub program: Option<String>,
    pub args: Vec<String>,
    pub timeout: Option<Duration>,
}

impl Invocation {
    pub fn new(tool: Tool) -> Self {
        Self {
            tool,
            program: None,
            args: Vec::new(),
            timeout: None,
        }
    }

    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.program = Some(program.into());
        self
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Shell-quoted command line, for logs and `--verbose` output
    pub fn command_line(&self, program: &str) -> String {
        let mut words = Vec::with_capacity(self.args.len() + 1);
        words.push(program);
        words.extend(self.args.iter().map(String::as_str));
        shell_words::join(words)
    }
}

/// How an invocation ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitClass {
    Success,
    NoMatches,
    ToolMissing,
    ExecutionError(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationResult {
    pub tool: Tool,
    pub class: ExitClass,
    pub code: Option<i32>,
    pub stdout: String,
}

impl InvocationResult {
    pub fn missing(tool: Tool) -> Self {
        Self {
            tool,
            class: ExitClass::ToolMissing,
            code: None,
            stdout: String::new(),
        }
    }

    pub fn success(tool: Tool, stdout: impl Into<String>) -> Self {
        Self {
            tool,
            class: ExitClass::Success,
            code: Some(0),
            stdout: stdout.into(),
        }
    }

    pub fn no_matches(tool: Tool) -> Self {
        Self {
            tool,
            class: ExitClass::NoMatches,
            code: tool.no_match_codes().first().copied(),
            stdout: String::new(),
        }
    }

    pub fn failed(tool: Tool, code: i32, message: impl Into<String>) -> Self {
        Self {
            tool,
            class: ExitClass::ExecutionError(message.into()),
            code: Some(code),
            stdout: String::new(),
        }
    }

    /// Raw stdout, or the error this outcome maps to
    pub fn into_stdout(self) -> Result<String, ReconError> {
        match self.class {
            ExitClass::Success => Ok(self.stdout),
            ExitClass::NoMatches => Ok(String::new()),
            ExitClass::ToolMissing => Err(ReconError::ToolUnavailable { tool: self.tool }),
            ExitClass::ExecutionError(message) => Err(ReconError::Invocation {
                tool: self.tool,
                code: match self.code {
                    Some(code) => format!("exit status {code}"),
                    None => "signal".to_string(),
                },
                message,
            }),
        }
    }

    pub fn into_lines(self) -> Result<Vec<String>, ReconError> {
        self.into_stdout().map(|stdout| split_lines(&stdout))
    }
}

/// Split tool output into lines, dropping `\r` and blank lines
pub fn split_lines(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}

/// Runs invocations. The process boundary sits behind this trait so the
/// engine can be exercised without real tools installed.
#[async_trait]
pub trait Invoker: Send + Sync {
    /// Run one invocation to completion
    ///
    /// Returns `Err` only when the process cannot be started (other than
    /// "not found") or when `cancel` fires first.
    async fn invoke(
        &self,
        invocation: &Invocation,
        cancel: &CancellationToken,
    ) -> Result<InvocationResult, ReconError>;
}

/// Spawns real subprocesses with tokio
#[derive(Debug, Clone)]
pub struct ProcessInvoker {
    tools: ToolPaths,
    root: PathBuf,
}

impl ProcessInvoker {
    pub fn new(tools: ToolPaths, root: impl Into<PathBuf>) -> Self {
        Self {
            tools,
            root: root.into(),
        }
    }

    fn program<'a>(&'a self, invocation: &'a Invocation) -> &'a str {
        invocation
            .program
            .as_deref()
            .unwrap_or_else(|| self.tools.program(invocation.tool))
    }
}

#[async_trait]
impl Invoker for ProcessInvoker {
    async fn invoke(
        &self,
        invocation: &Invocation,
        cancel: &CancellationToken,
    ) -> Result<InvocationResult, ReconError> {
        if cancel.is_cancelled() {
            return Err(ReconError::Cancelled);
        }

        let tool = invocation.tool;
        let program = self.program(invocation);

        // A missing root also surfaces as NotFound from spawn; keep it apart
        // from a missing binary.
        if !self.root.is_dir() {
            return Err(ReconError::Config(format!(
                "project root does not exist: {}",
                self.root.display()
            )));
        }

        log::debug!("$ {}", invocation.command_line(program));
        let started = Instant::now();

        let child = Command::new(program)
            .args(&invocation.args)
            .current_dir(&self.root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("{} not found (program '{}')", tool, program);
                return Ok(InvocationResult::missing(tool));
            }
            Err(e) => return Err(ReconError::Spawn { tool, source: e }),
        };

        let deadline = async {
            match invocation.timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending().await,
            }
        };

        // Dropping the wait future drops the child, and kill_on_drop
        // terminates it.
        let output = tokio::select! {
            output = child.wait_with_output() => {
                output.map_err(|e| ReconError::Spawn { tool, source: e })?
            }
            _ = cancel.cancelled() => {
                log::debug!("{} cancelled after {:?}", tool, started.elapsed());
                return Err(ReconError::Cancelled);
            }
            _ = deadline => {
                let secs = invocation.timeout.map(|t| t.as_secs()).unwrap_or_default();
                return Ok(InvocationResult {
                    tool,
                    class: ExitClass::ExecutionError(format!("timed out after {secs}s")),
                    code: None,
                    stdout: String::new(),
                });
            }
        };

        let stderr = String::from_utf8_lossy(&output.stderr);
        let class = classify(tool, output.status, &stderr);
        log::debug!(
            "{} finished in {:?}: {:?}",
            tool,
            started.elapsed(),
            class
        );

        Ok(InvocationResult {
            tool,
            class,
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        })
    }
}

fn classify(tool: Tool, status: ExitStatus, stderr: &str) -> ExitClass {
    match status.code() {
        Some(0) => ExitClass::Success,
        Some(code) if tool.no_match_codes().contains(&code) => ExitClass::NoMatches,
        Some(code) => {
            ExitClass::ExecutionError(first_line(stderr, &format!("exit status {code}")))
        }
        None => ExitClass::ExecutionError(first_line(stderr, "terminated by signal")),
    }
}

fn first_line(stderr: &str, fallback: &str) -> String {
    stderr
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or(fallback)
        .to_string()
}
