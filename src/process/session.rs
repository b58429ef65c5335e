//! Demo process session
//!
//! One session is one child invocation:
//! `UNSTARTED → RUNNING → INPUT_CLOSED → EXITED → REAPED`.
//! The input stream is always closed before the harness blocks on exit, and a
//! session is only reaped once its stdout is drained and its exit status
//! collected.

use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use crate::common::config::LauncherConfig;
use crate::common::{Error, Result};
use crate::protocol::{codec, Envelope, Response};

use super::exit_code_of;

/// Lifecycle state of a [`ProcessSession`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unstarted,
    Running,
    InputClosed,
    Exited,
    Reaped,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Unstarted => "unstarted",
            SessionState::Running => "running",
            SessionState::InputClosed => "input-closed",
            SessionState::Exited => "exited",
            SessionState::Reaped => "reaped",
        };
        f.write_str(name)
    }
}

/// What to start and how to wire it
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    /// Executable to run
    pub program: PathBuf,
    /// Working directory of the child
    pub cwd: PathBuf,
    /// Command-line arguments
    pub args: Vec<String>,
    /// Pipe stdout back to the harness instead of inheriting it
    pub capture_stdout: bool,
}

impl LaunchSpec {
    /// Render the invocation for logs
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.display().to_string())
            .chain(self.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A single demo process and the pipes the harness owns
pub struct ProcessSession {
    spec: LaunchSpec,
    state: SessionState,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stdout: Option<BufReader<ChildStdout>>,
    exit_code: Option<i32>,
}

impl ProcessSession {
    pub fn new(spec: LaunchSpec) -> Self {
        Self {
            spec,
            state: SessionState::Unstarted,
            child: None,
            stdin: None,
            stdout: None,
            exit_code: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Exit code once the child has exited
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    pub fn spec(&self) -> &LaunchSpec {
        &self.spec
    }

    /// OS process id while the child is alive
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(|c| c.id())
    }

    fn expect_state(&self, action: &str, allowed: &[SessionState]) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(Error::invalid_state(action, &self.state.to_string()))
        }
    }

    /// Start the child process
    ///
    /// The bus discovery variable is forced to the empty string; without it a
    /// GTK demo can stall for seconds trying to reach a session bus.
    pub async fn launch(&mut self, launcher: &LauncherConfig) -> Result<()> {
        self.expect_state("launch", &[SessionState::Unstarted])?;

        let mut cmd = Command::new(&self.spec.program);
        cmd.args(&self.spec.args)
            .current_dir(&self.spec.cwd)
            .env(&launcher.bus_address_var, "")
            .envs(&launcher.extra_env)
            .stdin(Stdio::piped())
            .stdout(if self.spec.capture_stdout {
                Stdio::piped()
            } else {
                Stdio::inherit()
            })
            .stderr(Stdio::inherit()) // Let demo diagnostics go to stderr
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| Error::spawn_failed(&self.spec.program, e))?;

        self.stdin = Some(child.stdin.take().ok_or_else(|| {
            Error::spawn_failed(&self.spec.program, "failed to open child stdin")
        })?);

        if self.spec.capture_stdout {
            let stdout = child.stdout.take().ok_or_else(|| {
                Error::spawn_failed(&self.spec.program, "failed to open child stdout")
            })?;
            self.stdout = Some(BufReader::new(stdout));
        }

        tracing::debug!(pid = ?child.id(), "Launched: {}", self.spec.command_line());
        self.child = Some(child);
        self.state = SessionState::Running;
        Ok(())
    }

    /// Zero-timeout check whether the child has already exited
    pub fn poll_exited(&mut self) -> Result<Option<i32>> {
        self.expect_state("poll", &[SessionState::Running, SessionState::InputClosed])?;
        let child = self.child_mut()?;
        match child.try_wait()? {
            Some(status) => {
                let code = exit_code_of(status);
                self.exit_code = Some(code);
                self.state = SessionState::Exited;
                Ok(Some(code))
            }
            None => Ok(None),
        }
    }

    /// Write one request envelope to the child's stdin
    pub async fn send(&mut self, envelope: &Envelope) -> Result<()> {
        self.expect_state("write input", &[SessionState::Running])?;
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| Error::Internal("stdin already closed".to_string()))?;
        codec::write_envelope(stdin, envelope).await?;
        tracing::trace!("Sent envelope with {} fields", envelope.builder_models.len());
        Ok(())
    }

    /// Close stdin, signalling end-of-input to the child
    pub fn close_input(&mut self) -> Result<()> {
        self.expect_state("close input", &[SessionState::Running])?;
        drop(self.stdin.take());
        self.state = SessionState::InputClosed;
        Ok(())
    }

    /// Read one response envelope from the child's stdout
    pub async fn receive(&mut self) -> Result<Response> {
        self.expect_state("read output", &[SessionState::Running, SessionState::InputClosed])?;
        let stdout = self.stdout.as_mut().ok_or_else(|| {
            Error::Internal("stdout is not captured for this session".to_string())
        })?;
        codec::read_envelope(stdout).await
    }

    /// Read one raw text line from the child's stdout, without the newline
    pub async fn receive_line(&mut self) -> Result<String> {
        self.expect_state("read output", &[SessionState::Running, SessionState::InputClosed])?;
        let stdout = self.stdout.as_mut().ok_or_else(|| {
            Error::Internal("stdout is not captured for this session".to_string())
        })?;
        let mut line = String::new();
        if stdout.read_line(&mut line).await? == 0 {
            return Err(Error::protocol("demo closed its output without printing a line", ""));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// [`receive`](Self::receive) bounded by `timeout`
    ///
    /// A child that prints nothing in time is terminated and
    /// [`Error::ChildTimeout`] is returned.
    pub async fn receive_within(&mut self, timeout: Option<Duration>, grace: Duration) -> Result<Response> {
        let Some(limit) = timeout else {
            return self.receive().await;
        };
        let outcome = tokio::time::timeout(limit, self.receive()).await;
        match outcome {
            Ok(received) => received,
            Err(_) => self.give_up(limit, grace).await,
        }
    }

    /// [`receive_line`](Self::receive_line) bounded by `timeout`
    pub async fn receive_line_within(&mut self, timeout: Option<Duration>, grace: Duration) -> Result<String> {
        let Some(limit) = timeout else {
            return self.receive_line().await;
        };
        let outcome = tokio::time::timeout(limit, self.receive_line()).await;
        match outcome {
            Ok(received) => received,
            Err(_) => self.give_up(limit, grace).await,
        }
    }

    async fn give_up<T>(&mut self, limit: Duration, grace: Duration) -> Result<T> {
        tracing::warn!(pid = ?self.pid(), "No output from demo within {:?}", limit);
        self.terminate(grace).await?;
        Err(Error::ChildTimeout(limit))
    }

    /// Wait for the child to exit and return its exit code
    ///
    /// Any remaining stdout is drained so a child blocked on a full pipe can
    /// finish. With a timeout, a child that does not exit in time is
    /// terminated and [`Error::ChildTimeout`] is returned.
    pub async fn wait(&mut self, timeout: Option<Duration>, grace: Duration) -> Result<i32> {
        if self.state == SessionState::Exited {
            return self
                .exit_code
                .ok_or_else(|| Error::Internal("exited session without exit code".to_string()));
        }
        self.expect_state("wait for exit", &[SessionState::InputClosed])?;

        let stdout = self.stdout.take();
        let child = self
            .child
            .as_mut()
            .ok_or_else(|| Error::Internal("no child process".to_string()))?;

        let finish = async move {
            if let Some(mut out) = stdout {
                let mut rest = Vec::new();
                out.read_to_end(&mut rest).await?;
                let rest = String::from_utf8_lossy(&rest);
                if !rest.trim().is_empty() {
                    tracing::warn!("Ignoring trailing output from demo: {}", rest.trim());
                }
            }
            let status = child.wait().await?;
            Ok::<_, std::io::Error>(status)
        };

        let status = match timeout {
            None => finish.await?,
            Some(limit) => {
                let outcome = tokio::time::timeout(limit, finish).await;
                match outcome {
                    Ok(status) => status?,
                    Err(_) => {
                        tracing::warn!(pid = ?self.pid(), "Demo did not exit within {:?}", limit);
                        self.terminate(grace).await?;
                        return Err(Error::ChildTimeout(limit));
                    }
                }
            }
        };

        let code = exit_code_of(status);
        tracing::debug!(pid = ?self.pid(), code, "Demo exited");
        self.exit_code = Some(code);
        self.state = SessionState::Exited;
        Ok(code)
    }

    /// Forcefully stop the child: SIGTERM, then SIGKILL after `grace`
    pub async fn terminate(&mut self, grace: Duration) -> Result<()> {
        let child = self.child_mut()?;

        #[cfg(unix)]
        if let Some(pid) = child.id() {
            // SAFETY: signalling a pid we spawned and have not yet reaped
            unsafe {
                libc::kill(pid as libc::pid_t, libc::SIGTERM);
            }
            if let Ok(status) = tokio::time::timeout(grace, child.wait()).await {
                let code = exit_code_of(status?);
                self.exit_code = Some(code);
                self.state = SessionState::Exited;
                return Ok(());
            }
        }
        #[cfg(not(unix))]
        let _ = grace;

        let child = self.child_mut()?;
        child.kill().await?;
        let code = exit_code_of(child.wait().await?);
        self.exit_code = Some(code);
        self.state = SessionState::Exited;
        Ok(())
    }

    /// Release every OS resource held by the session
    ///
    /// Safe to call from any state and more than once. A child that is still
    /// running gets its input closed and is waited on (bounded by `timeout`,
    /// then terminated). Errors here are logged, never returned, so cleanup
    /// after a failed scenario cannot mask the original failure.
    pub async fn reap(&mut self, timeout: Option<Duration>, grace: Duration) {
        match self.state {
            SessionState::Reaped => return,
            SessionState::Unstarted => {
                self.state = SessionState::Reaped;
                return;
            }
            SessionState::Running => {
                drop(self.stdin.take());
                self.state = SessionState::InputClosed;
            }
            SessionState::InputClosed | SessionState::Exited => {}
        }

        if self.state == SessionState::InputClosed {
            if let Err(e) = self.wait(timeout, grace).await {
                tracing::warn!("Error while reaping demo process: {}", e);
            }
        }

        drop(self.stdin.take());
        drop(self.stdout.take());
        drop(self.child.take());
        self.state = SessionState::Reaped;
        tracing::trace!("Session reaped");
    }

    fn child_mut(&mut self) -> Result<&mut Child> {
        self.child
            .as_mut()
            .ok_or_else(|| Error::Internal("no child process".to_string()))
    }
}

impl Drop for ProcessSession {
    fn drop(&mut self) {
        if !matches!(self.state, SessionState::Reaped | SessionState::Unstarted) {
            // kill_on_drop takes care of the process itself
            tracing::debug!(state = %self.state, "Session dropped before it was reaped");
        }
    }
}
