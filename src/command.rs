//! Running the command attached to an action
//!
//! A triggered action spawns its command as a child process, captures a
//! bounded amount of stdout/stderr for the log and waits at most
//! [`CommandSettings::timeout`] for it. A command that outruns the timeout is
//! killed. None of the failures here stop the action that triggered it.

use std::process::Stdio;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tracing::{debug, instrument, warn};

use crate::error::ExecutionError;

#[cfg(unix)]
use nix::{
    sys::signal::{Signal, killpg},
    unistd::Pid,
};

/// How a command string is turned into a process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandMode {
    /// Hand the whole string to the platform shell
    #[default]
    Shell,

    /// Split on whitespace and execute the first word directly
    Exec,
}

/// Execution limits shared by every action
#[derive(Debug, Clone)]
pub struct CommandSettings {
    pub mode: CommandMode,
    pub timeout: Duration,
    /// Per-stream capture limit; anything beyond is read and dropped
    pub max_output_bytes: usize,
}

impl Default for CommandSettings {
    fn default() -> Self {
        Self {
            mode: CommandMode::Shell,
            timeout: Duration::from_secs(30),
            max_output_bytes: 64 * 1024,
        }
    }
}

/// What a successful run left behind
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    /// Either stream exceeded the capture limit
    pub truncated: bool,
    pub duration: Duration,
}

/// Something that can act on a triggered command string
#[async_trait]
pub trait Trigger: Send + Sync {
    async fn execute(&self, command: &str) -> Result<ExecutionReport, ExecutionError>;
}

/// [`Trigger`] that runs commands as OS processes
#[derive(Debug, Clone, Default)]
pub struct CommandTrigger {
    settings: CommandSettings,
}

impl CommandTrigger {
    pub fn new(settings: CommandSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &CommandSettings {
        &self.settings
    }

    fn build(&self, command: &str) -> Result<Command, ExecutionError> {
        match self.settings.mode {
            CommandMode::Shell => Ok(shell_command(command)),
            CommandMode::Exec => {
                let mut words = command.split_whitespace();
                let program = words
                    .next()
                    .ok_or_else(|| ExecutionError::Spawn("empty command".to_string()))?;
                let mut cmd = Command::new(program);
                cmd.args(words);
                Ok(cmd)
            }
        }
    }
}

#[cfg(unix)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(not(unix))]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

#[async_trait]
impl Trigger for CommandTrigger {
    #[instrument(skip(self), fields(mode = ?self.settings.mode))]
    async fn execute(&self, command: &str) -> Result<ExecutionReport, ExecutionError> {
        let mut cmd = self.build(command)?;
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Own process group, so a timeout reaches everything the command forked
        #[cfg(unix)]
        cmd.process_group(0);

        let start = Instant::now();
        let mut child = cmd
            .spawn()
            .map_err(|e| ExecutionError::Spawn(e.to_string()))?;
        debug!(pid = child.id(), "spawned command");

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let cap = self.settings.max_output_bytes;

        // Filled as output arrives, so whatever was read survives a timeout
        let stdout_buf = Mutex::new(Captured::default());
        let stderr_buf = Mutex::new(Captured::default());

        let run = async {
            tokio::join!(
                child.wait(),
                read_capped(stdout, cap, &stdout_buf, "stdout"),
                read_capped(stderr, cap, &stderr_buf, "stderr")
            )
        };
        let result = tokio::time::timeout(self.settings.timeout, run).await;

        let stdout = take_captured(&stdout_buf);
        let stderr = take_captured(&stderr_buf);

        let status = match result {
            Ok((status, ..)) => status?,
            Err(_elapsed) => {
                terminate(&mut child).await;
                return Err(ExecutionError::Timeout {
                    after: self.settings.timeout,
                    stdout: stdout.text(),
                    stderr: stderr.text(),
                });
            }
        };

        let exit_code = status.code().unwrap_or(-1);

        if !status.success() {
            return Err(ExecutionError::NonZero {
                code: exit_code,
                stderr: stderr.text(),
            });
        }

        Ok(ExecutionReport {
            exit_code,
            stdout: stdout.text(),
            stderr: stderr.text(),
            truncated: stdout.truncated || stderr.truncated,
            duration: start.elapsed(),
        })
    }
}

/// Kill a timed out command together with everything it spawned, then reap it
async fn terminate(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        let group = Pid::from_raw(pid as i32);
        if let Err(e) = killpg(group, Signal::SIGKILL) {
            warn!(pid, "failed to kill process group of timed out command: {e}");
        }
    }

    if let Err(e) = child.kill().await {
        warn!("failed to kill timed out command: {e}");
    }
}

#[derive(Debug, Default)]
struct Captured {
    bytes: Vec<u8>,
    truncated: bool,
}

impl Captured {
    fn push(&mut self, chunk: &[u8], cap: usize) {
        let room = cap.saturating_sub(self.bytes.len());
        if chunk.len() > room {
            self.truncated = true;
        }
        self.bytes.extend_from_slice(&chunk[..chunk.len().min(room)]);
    }

    fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

fn take_captured(buf: &Mutex<Captured>) -> Captured {
    buf.lock()
        .map(|mut captured| std::mem::take(&mut *captured))
        .unwrap_or_default()
}

/// Read a stream to its end, keeping at most `cap` bytes in `buf`.
///
/// Bytes beyond the cap are read and dropped so the child never stalls on a
/// full pipe.
async fn read_capped<R: AsyncRead + Unpin>(
    stream: Option<R>,
    cap: usize,
    buf: &Mutex<Captured>,
    name: &'static str,
) {
    let Some(mut stream) = stream else {
        return;
    };

    let mut chunk = [0u8; 8192];
    loop {
        match stream.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                if let Ok(mut captured) = buf.lock() {
                    captured.push(&chunk[..n], cap);
                }
            }
            Err(e) => {
                debug!(stream = name, "failed to read command output: {e}");
                break;
            }
        }
    }
}
