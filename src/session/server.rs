//! Server process session.
//!
//! A session spawns the server with piped stdio, owns both pipes through a
//! [`LineClient`], and tears the process down on shutdown or drop.

use std::collections::VecDeque;
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::task::JoinHandle;

use super::{
    ExchangeKind, ServerCommand, SessionError, SessionState, SessionStateMachine, SessionStats,
};
use crate::rpc::{ClientError, Exchange, LineClient, Request, Response, TransportError};

/// Default bound on waiting for the server to exit after termination is requested.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Number of server stderr lines kept for diagnostics.
const STDERR_TAIL_LINES: usize = 20;

/// How long to wait for the exit status once the output stream has closed.
const EXIT_PROBE_TIMEOUT: Duration = Duration::from_millis(200);

type StderrTail = Arc<Mutex<VecDeque<String>>>;

/// A running server process and the client attached to its stdio.
#[derive(Debug)]
pub struct ServerSession {
    child: Child,
    client: LineClient<ChildStdout, ChildStdin>,
    machine: SessionStateMachine,
    stderr_tail: StderrTail,
    stderr_task: Option<JoinHandle<()>>,
}

impl ServerSession {
    /// Spawn the server described by `command`.
    ///
    /// The session starts in [`SessionState::Starting`]. Must be called from
    /// within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the process fails to spawn.
    pub fn spawn(command: &ServerCommand) -> Result<Self, SessionError> {
        let mut cmd = Command::new(command.program());
        cmd.args(command.get_args())
            .envs(command.build_env())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = command.get_working_dir() {
            cmd.current_dir(dir);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| SessionError::from_spawn(command.program(), e))?;

        let stdin = child.stdin.take().ok_or(SessionError::MissingPipe("stdin"))?;
        let stdout = child.stdout.take().ok_or(SessionError::MissingPipe("stdout"))?;
        let stderr = child.stderr.take().ok_or(SessionError::MissingPipe("stderr"))?;

        let stderr_tail = StderrTail::default();
        let stderr_task = forward_stderr(stderr, Arc::clone(&stderr_tail));

        tracing::info!(
            program = command.program(),
            pid = child.id(),
            "Spawned server process"
        );

        Ok(Self {
            child,
            client: LineClient::new(stdout, stdin),
            machine: SessionStateMachine::new(),
            stderr_tail,
            stderr_task: Some(stderr_task),
        })
    }

    /// Give the server `grace` to come up, then check it is still running.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ExitedDuringStartup`] if the process exited,
    /// or [`SessionError::InvalidTransition`] if the session is not starting.
    pub async fn wait_ready(&mut self, grace: Duration) -> Result<(), SessionError> {
        if self.state() != SessionState::Starting {
            return Err(SessionError::InvalidTransition {
                from: self.state(),
                to: SessionState::Ready,
            });
        }

        tokio::time::sleep(grace).await;

        match self.child.try_wait() {
            Ok(Some(status)) => {
                self.abandon();
                // Let the stderr reader drain before reporting.
                if let Some(task) = self.stderr_task.take() {
                    let _ = tokio::time::timeout(EXIT_PROBE_TIMEOUT, task).await;
                }
                Err(SessionError::ExitedDuringStartup {
                    code: status.code(),
                    stderr: self.stderr_tail().join("\n"),
                })
            }
            Ok(None) => {
                self.machine.transition(SessionState::Ready);
                Ok(())
            }
            Err(e) => {
                self.abandon();
                Err(SessionError::Spawn(e))
            }
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.machine.state()
    }

    /// Exchange statistics so far.
    #[must_use]
    pub fn stats(&self) -> SessionStats {
        self.machine.stats()
    }

    /// Get the process ID, if still running.
    #[must_use]
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Most recent lines the server wrote to stderr.
    #[must_use]
    pub fn stderr_tail(&self) -> Vec<String> {
        self.stderr_tail
            .lock()
            .map(|tail| tail.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Allocate the next request id.
    pub fn allocate_id(&mut self) -> u64 {
        self.client.allocate_id()
    }

    /// Send a request and wait at most `timeout` for its response.
    ///
    /// A session still in `Starting` is treated as ready.
    ///
    /// # Errors
    ///
    /// See [`LineClient::send_request`]. If the server has exited, the
    /// transport error is [`TransportError::ProcessExited`] and the session
    /// moves to `Terminated` for good.
    pub async fn send_request(
        &mut self,
        request: &Request,
        timeout: Duration,
    ) -> Result<Response, ClientError> {
        if self.state().is_finished() {
            return Err(TransportError::Closed.into());
        }
        self.machine.transition(SessionState::Ready);
        self.machine.transition(SessionState::Exchanging);

        let result = self.client.send_request(request, timeout).await;

        match &result {
            Ok(response) if response.is_error() => {
                self.finish_exchange(ExchangeKind::RemoteError);
            }
            Ok(_) => self.finish_exchange(ExchangeKind::Success),
            Err(ClientError::Timeout(_)) => self.finish_exchange(ExchangeKind::Timeout),
            Err(ClientError::Parse { .. } | ClientError::Serialize(_)) => {
                self.finish_exchange(ExchangeKind::ParseError);
            }
            Err(ClientError::Transport(_)) => {
                self.machine.record(ExchangeKind::TransportFailure);
                self.machine.transition(SessionState::Terminated);
            }
        }

        match result {
            Err(ClientError::Transport(err)) => Err(self.classify_transport(err).await.into()),
            other => other,
        }
    }

    /// Allocate an id and send `method` with `params`.
    ///
    /// # Errors
    ///
    /// See [`ServerSession::send_request`].
    pub async fn call(
        &mut self,
        method: &str,
        params: Map<String, Value>,
        timeout: Duration,
    ) -> Result<Response, ClientError> {
        let request = Request::new(self.allocate_id(), method, params);
        self.send_request(&request, timeout).await
    }

    /// Stop the server: close its input, request termination, and wait at
    /// most `timeout` for it to exit before killing it.
    ///
    /// Returns the exit status, or `None` if it had to be killed.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Terminate`] if the process cannot be stopped.
    pub async fn shutdown(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<ExitStatus>, SessionError> {
        if !self.state().is_finished() {
            self.machine.transition(SessionState::Terminating);
        }
        self.client.close();
        let _ = self.client.writer_mut().shutdown().await;

        let status = self.graceful_terminate(timeout).await;

        if let Some(task) = self.stderr_task.take() {
            let _ = tokio::time::timeout(EXIT_PROBE_TIMEOUT, task).await;
        }
        self.machine.transition(SessionState::Terminated);
        tracing::info!(status = ?status.as_ref().ok(), "Server session ended");

        status.map_err(SessionError::Terminate)
    }

    /// Give up on a server that did not come up.
    fn abandon(&mut self) {
        self.client.close();
        self.machine.transition(SessionState::Terminated);
    }

    fn finish_exchange(&mut self, kind: ExchangeKind) {
        self.machine.record(kind);
        self.machine.transition(SessionState::Ready);
    }

    async fn classify_transport(&mut self, err: TransportError) -> TransportError {
        match err {
            TransportError::StreamClosed | TransportError::BrokenPipe(_) => {
                match tokio::time::timeout(EXIT_PROBE_TIMEOUT, self.child.wait()).await {
                    Ok(Ok(status)) => {
                        tracing::warn!(code = ?status.code(), "Server process exited");
                        TransportError::ProcessExited(status.code())
                    }
                    _ => err,
                }
            }
            other => other,
        }
    }

    async fn graceful_terminate(
        &mut self,
        timeout: Duration,
    ) -> std::io::Result<Option<ExitStatus>> {
        if let Some(status) = self.child.try_wait()? {
            return Ok(Some(status));
        }

        #[cfg(unix)]
        self.send_sigterm();

        match tokio::time::timeout(timeout, self.child.wait()).await {
            Ok(status) => status.map(Some),
            Err(_) => {
                tracing::warn!(
                    timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                    "Server did not exit in time, killing"
                );
                self.child.kill().await?;
                Ok(None)
            }
        }
    }

    #[cfg(unix)]
    fn send_sigterm(&self) {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        if let Some(pid) = self.id() {
            let nix_pid = Pid::from_raw(i32::try_from(pid).unwrap_or(i32::MAX));
            let _ = kill(nix_pid, Signal::SIGTERM);
        }
    }
}

#[async_trait]
impl Exchange for ServerSession {
    async fn exchange(
        &mut self,
        method: &str,
        params: Map<String, Value>,
        timeout: Duration,
    ) -> Result<Response, ClientError> {
        self.call(method, params, timeout).await
    }
}

/// Forward server stderr to the log, keeping the last few lines.
fn forward_stderr(stderr: ChildStderr, tail: StderrTail) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            tracing::debug!(target: "mcp_line_client::server", "{line}");
            if let Ok(mut tail) = tail.lock() {
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
        }
    })
}
