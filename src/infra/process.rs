//! Synchronous external tool invocation with optional bounded wait.
//!
//! stderr goes to an anonymous temp file rather than a pipe, so a chatty
//! tool can never block on a full pipe buffer while we wait on it.

use std::ffi::OsString;
use std::fmt;
use std::io::{Read, Seek, SeekFrom};
use std::process::{Command, ExitStatus, Stdio};
use std::time::Duration;

use tracing::{debug, trace};
use wait_timeout::ChildExt;

use crate::core::error::PipelineError;

/// Upper bound on captured stderr kept for diagnostics
const STDERR_LIMIT: usize = 4096;

/// Program plus leading arguments; per-call arguments are appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand
{
    program: OsString,
    args: Vec<OsString>,
}

impl ToolCommand
{
    pub fn new(program: impl Into<OsString>) -> Self
    {
        Self { program: program.into(), args: Vec::new() }
    }

    /// Build from a `[program, args...]` list. `~` and `$VAR` in the
    /// program are expanded. Returns None for an empty list.
    pub fn from_argv(argv: &[String]) -> Option<Self>
    {
        let (program, rest) = argv.split_first()?;
        let program = shellexpand::full(program)
            .map(|p| p.into_owned())
            .unwrap_or_else(|_| program.clone());

        Some(Self {
            program: program.into(),
            args: rest
                .iter()
                .map(OsString::from)
                .collect(),
        })
    }

    pub fn arg(
        mut self,
        arg: impl Into<OsString>,
    ) -> Self
    {
        self.args
            .push(arg.into());
        self
    }

    fn to_command(&self) -> Command
    {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }
}

impl fmt::Display for ToolCommand
{
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result
    {
        write!(f, "{}", self.program.to_string_lossy())?;
        for a in &self.args
        {
            write!(f, " {}", a.to_string_lossy())?;
        }
        Ok(())
    }
}

/// How a finished tool exited
#[derive(Debug)]
pub struct ToolExit
{
    pub status: ExitStatus,
    pub stderr: String,
}

impl ToolExit
{
    /// Exit code, None when terminated by a signal
    pub fn code(&self) -> Option<i32>
    {
        self.status
            .code()
    }
}

/// Run `tool` with `extra` arguments appended and wait for it.
///
/// Spawn failures and timeouts are errors; any exit status is returned for
/// the caller to classify.
pub fn run_tool<I, A>(
    tool: &ToolCommand,
    extra: I,
    timeout: Option<Duration>,
) -> Result<ToolExit, PipelineError>
where
    I: IntoIterator<Item = A>,
    A: Into<OsString>,
{
    let mut cmd = tool.to_command();
    cmd.args(
        extra
            .into_iter()
            .map(Into::into),
    );

    let mut stderr_sink = tempfile::tempfile().map_err(PipelineError::Io)?;
    let stderr_handle = stderr_sink
        .try_clone()
        .map_err(PipelineError::Io)?;

    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::from(stderr_handle));

    trace!(command = ?cmd, "spawning external tool");
    let mut child = cmd
        .spawn()
        .map_err(|source| PipelineError::Spawn { program: tool.to_string(), source })?;

    let status = match timeout
    {
        Some(limit) => match child
            .wait_timeout(limit)
            .map_err(PipelineError::Io)?
        {
            Some(status) => status,
            None =>
            {
                let _ = child.kill();
                let _ = child.wait();
                return Err(PipelineError::TimedOut { program: tool.to_string(), after: limit });
            }
        },
        None => child
            .wait()
            .map_err(PipelineError::Io)?,
    };

    let stderr = read_capped(&mut stderr_sink);
    debug!(program = %tool, ?status, "external tool finished");

    Ok(ToolExit { status, stderr })
}

/// Read back at most `STDERR_LIMIT` bytes of captured output, lossily.
fn read_capped(file: &mut std::fs::File) -> String
{
    let mut buf = Vec::new();
    let read = file
        .seek(SeekFrom::Start(0))
        .and_then(|_| {
            file.by_ref()
                .take(STDERR_LIMIT as u64)
                .read_to_end(&mut buf)
        });

    match read
    {
        Ok(_) => String::from_utf8_lossy(&buf)
            .trim_end()
            .to_string(),
        Err(_) => String::new(),
    }
}
