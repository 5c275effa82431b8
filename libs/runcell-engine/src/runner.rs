//! Process Runner
//!
//! Spawns exactly one external process and drives it to completion:
//!
//! - stdin is written in full and then closed (closed immediately when
//!   empty, so an interactive read sees EOF instead of hanging)
//! - stdout and stderr are drained concurrently chunk by chunk, so a child
//!   filling one pipe never deadlocks against the other
//! - each stream keeps at most `max_output_bytes`; the rest is read and
//!   discarded so the child is never blocked on a full pipe
//! - a wall-clock timer armed at spawn kills the whole process group on
//!   expiry, keeping whatever output arrived before the kill
//! - after a normal exit the group is killed as well, so background
//!   descendants never outlive the run
//!
//! A non-zero exit code is reported, not treated as an error.

use crate::launcher::{Launcher, ResourceLimits};
use crate::toolchain::Invocation;
use std::io;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin};
use tokio::time;
use tracing::{debug, warn};

const READ_CHUNK_BYTES: usize = 8 * 1024;

/// How long to keep draining pipes after the child is gone. Bounds the wait
/// when a killed tree leaves data buffered in the pipes.
const DRAIN_GRACE: Duration = Duration::from_millis(250);

/// How the process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Exit code; death by signal N is reported as 128 + N
    Exited(i32),
    TimedOut,
}

/// Captured result of one process run
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub completion: Completion,
    pub stdout: String,
    pub stderr: String,
    pub stdout_truncated: bool,
    pub stderr_truncated: bool,
    pub elapsed: Duration,
}

impl ProcessOutput {
    pub fn exit_code(&self) -> Option<i32> {
        match self.completion {
            Completion::Exited(code) => Some(code),
            Completion::TimedOut => None,
        }
    }

    pub fn timed_out(&self) -> bool {
        self.completion == Completion::TimedOut
    }

    pub fn success(&self) -> bool {
        self.completion == Completion::Exited(0)
    }

    pub fn truncated(&self) -> bool {
        self.stdout_truncated || self.stderr_truncated
    }
}

/// Bounded accumulator for one output stream
#[derive(Debug)]
struct Capture {
    buf: Vec<u8>,
    limit: usize,
    truncated: bool,
}

impl Capture {
    fn new(limit: usize) -> Self {
        Self {
            buf: Vec::new(),
            limit,
            truncated: false,
        }
    }

    fn push(&mut self, chunk: &[u8]) {
        let room = self.limit.saturating_sub(self.buf.len());
        if chunk.len() > room {
            self.truncated = true;
        }
        self.buf.extend_from_slice(&chunk[..chunk.len().min(room)]);
    }

    /// Read until EOF. Partial data stays in `self` if the future is dropped.
    async fn drain<R>(&mut self, pipe: &mut Option<R>) -> io::Result<()>
    where
        R: AsyncRead + Unpin,
    {
        let Some(reader) = pipe.as_mut() else {
            return Ok(());
        };
        let mut chunk = [0u8; READ_CHUNK_BYTES];
        loop {
            let n = reader.read(&mut chunk).await?;
            if n == 0 {
                *pipe = None;
                return Ok(());
            }
            self.push(&chunk[..n]);
        }
    }

    fn into_string(self) -> (String, bool) {
        (String::from_utf8_lossy(&self.buf).into_owned(), self.truncated)
    }
}

async fn feed_stdin(pipe: Option<ChildStdin>, payload: &[u8]) {
    let Some(mut pipe) = pipe else {
        return;
    };
    if payload.is_empty() {
        return;
    }
    if let Err(e) = pipe.write_all(payload).await {
        // The program exited or closed stdin without reading everything
        if e.kind() != io::ErrorKind::BrokenPipe {
            debug!(error = %e, "Failed to write stdin");
        }
        return;
    }
    if let Err(e) = pipe.shutdown().await {
        debug!(error = %e, "Failed to close stdin");
    }
}

/// Spawns processes through a [`Launcher`] and supervises them
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    launcher: Arc<dyn Launcher>,
    max_output_bytes: usize,
}

impl ProcessRunner {
    pub fn new(launcher: Arc<dyn Launcher>, max_output_bytes: usize) -> Self {
        Self {
            launcher,
            max_output_bytes,
        }
    }

    pub fn max_output_bytes(&self) -> usize {
        self.max_output_bytes
    }

    /// Run `invocation` to completion or until `timeout` elapses
    ///
    /// Returns `Err` only when the process could not be spawned or waited
    /// on; everything the program itself does is reported in the output.
    pub async fn run(
        &self,
        invocation: &Invocation,
        stdin: &str,
        limits: &ResourceLimits,
        timeout: Duration,
    ) -> io::Result<ProcessOutput> {
        let mut command = self.launcher.command(invocation, limits);
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let started = Instant::now();
        let mut child = command.spawn()?;
        let pid = child.id();
        debug!(
            program = %invocation.program,
            pid = ?pid,
            timeout_ms = timeout.as_millis() as u64,
            "Process spawned"
        );

        let stdin_pipe = child.stdin.take();
        let mut stdout_pipe = child.stdout.take();
        let mut stderr_pipe = child.stderr.take();
        let mut stdout = Capture::new(self.max_output_bytes);
        let mut stderr = Capture::new(self.max_output_bytes);

        let completion = {
            let io = async {
                let (_, out, err) = tokio::join!(
                    feed_stdin(stdin_pipe, stdin.as_bytes()),
                    stdout.drain(&mut stdout_pipe),
                    stderr.drain(&mut stderr_pipe),
                );
                if let Err(e) = out.and(err) {
                    warn!(error = %e, "Failed to read process output");
                }
            };
            tokio::pin!(io);
            let deadline = time::sleep(timeout);
            tokio::pin!(deadline);

            // The leader's exit decides the outcome; pipes held open by
            // descendants must not turn an exited process into a timeout
            let mut io_done = false;
            let exited = loop {
                tokio::select! {
                    biased;
                    status = child.wait() => break Some(status?),
                    _ = &mut io, if !io_done => io_done = true,
                    _ = &mut deadline => break None,
                }
            };

            let completion = match exited {
                Some(status) => {
                    // Background descendants must not outlive the request
                    kill_group(pid);
                    Completion::Exited(exit_code(status))
                }
                None => {
                    kill_tree(&mut child, pid);
                    child.wait().await?;
                    debug!(
                        program = %invocation.program,
                        pid = ?pid,
                        "Process timed out and was killed"
                    );
                    Completion::TimedOut
                }
            };

            // Pick up whatever was buffered in the pipes before the kill
            if !io_done && time::timeout(DRAIN_GRACE, &mut io).await.is_err() {
                debug!(program = %invocation.program, "Output drain cut short");
            }
            completion
        };

        let (stdout, stdout_truncated) = stdout.into_string();
        let (stderr, stderr_truncated) = stderr.into_string();

        Ok(ProcessOutput {
            completion,
            stdout,
            stderr,
            stdout_truncated,
            stderr_truncated,
            elapsed: started.elapsed(),
        })
    }
}

/// Kill the child and every descendant sharing its process group
fn kill_tree(child: &mut Child, pid: Option<u32>) {
    kill_group(pid);
    if let Err(e) = child.start_kill() {
        debug!(error = %e, "Child already exited before kill");
    }
}

/// SIGKILL the process group created at spawn; ESRCH (group already empty)
/// is expected and ignored
fn kill_group(pid: Option<u32>) {
    #[cfg(unix)]
    if let Some(pid) = pid {
        // SAFETY: plain syscall on the group id assigned by `process_group(0)`.
        unsafe {
            libc::kill(-(pid as libc::pid_t), libc::SIGKILL);
        }
    }
    #[cfg(not(unix))]
    let _ = pid;
}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}
