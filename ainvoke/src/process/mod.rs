//! Child process execution for agent commands.
//!
//! Two strategies share one lifecycle: spawn in the run directory, feed the
//! prompt, drain output concurrently, wait for exit under a [`RunContext`].
//!
//! - [`piped`]: plain OS pipes, stdout and stderr captured separately.
//! - [`pty`]: a pseudo-terminal as the controlling terminal, streams merged.
//!
//! In both modes the child leads its own process group, so a cancelled run
//! kills everything the agent forked, not just the direct child.

pub mod piped;
pub mod pty;

use std::fmt;
use std::io::{self, Read, Write};
use std::process::{Child, ExitStatus};
use std::thread::{self, ScopedJoinHandle};
use std::time::Duration;

use tracing::{debug, warn};
use wait_timeout::ChildExt;

use crate::cancel::{RunContext, Termination};
use crate::error::Error;

/// How often a running child is checked against its context.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How often stream threads are checked once the child has exited.
const STREAM_POLL_INTERVAL: Duration = Duration::from_millis(10);

const READ_CHUNK: usize = 8192;

/// Captured result of one agent run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutput {
    pub stdout: Vec<u8>,
    /// Always empty in pty mode.
    pub stderr: Vec<u8>,
    /// `0` on success or when the child never ran; `-1` when it was killed
    /// by a signal.
    pub exit_code: i32,
}

/// A failed run, with whatever output was captured before the failure.
#[derive(Debug)]
pub struct RunFailure {
    pub output: RunOutput,
    pub error: Error,
}

impl RunFailure {
    pub fn new(output: RunOutput, error: Error) -> Self {
        Self { output, error }
    }

    pub fn exit_code(&self) -> i32 {
        self.output.exit_code
    }
}

impl From<Error> for RunFailure {
    fn from(error: Error) -> Self {
        Self::new(RunOutput::default(), error)
    }
}

impl fmt::Display for RunFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl std::error::Error for RunFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

pub type RunResult = std::result::Result<RunOutput, RunFailure>;

/// How the wait ended.
enum Exit {
    Exited(ExitStatus),
    Terminated(Termination, ExitStatus),
}

fn split_argv(argv: &[String]) -> Result<(&String, &[String]), Error> {
    argv.split_first().ok_or(Error::EmptyCommand)
}

/// Wait for `child`, killing its process group once `ctx` is done.
fn wait_for_exit(child: &mut Child, ctx: &RunContext) -> Result<Exit, Error> {
    loop {
        if let Some(reason) = ctx.done() {
            warn!(pid = child.id(), %reason, "terminating agent process group");
            kill_process_group(child);
            let status = child
                .wait()
                .map_err(|err| Error::io("wait for agent after kill", err))?;
            return Ok(Exit::Terminated(reason, status));
        }

        let step = ctx
            .remaining()
            .map_or(POLL_INTERVAL, |remaining| remaining.min(POLL_INTERVAL));
        match child.wait_timeout(step) {
            Ok(Some(status)) => return Ok(Exit::Exited(status)),
            Ok(None) => {}
            Err(err) => {
                kill_process_group(child);
                let _ = child.wait();
                return Err(Error::io("wait for agent", err));
            }
        }
    }
}

/// Wait for the stream threads after the child exited.
///
/// Anything the agent forked may still hold its output open, so the streams
/// can outlive the child. If `ctx` ends first, the group `pgid` is killed
/// and the exit becomes a termination.
fn await_streams(exit: Exit, pgid: u32, ctx: &RunContext, finished: impl Fn() -> bool) -> Exit {
    let Exit::Exited(status) = exit else {
        return exit;
    };
    while !finished() {
        if let Some(reason) = ctx.done() {
            warn!(pgid, %reason, "terminating processes left behind by agent");
            if let Err(err) = signal_group(pgid) {
                warn!(pgid, err = %err, "failed to kill agent process group");
            }
            return Exit::Terminated(reason, status);
        }
        let step = ctx
            .remaining()
            .map_or(STREAM_POLL_INTERVAL, |remaining| remaining.min(STREAM_POLL_INTERVAL));
        thread::sleep(step);
    }
    Exit::Exited(status)
}

fn kill_process_group(child: &mut Child) {
    let pid = child.id();
    if let Err(err) = signal_group(pid) {
        debug!(pid, err = %err, "group kill failed, killing child only");
        if let Err(err) = child.kill() {
            warn!(pid, err = %err, "failed to kill agent");
        }
    }
}

/// SIGKILL every process in group `pgid`. An empty group is not an error.
#[allow(unsafe_code)]
fn signal_group(pgid: u32) -> io::Result<()> {
    let pgid = libc::pid_t::try_from(pgid).map_err(io::Error::other)?;
    // SAFETY: plain syscall on a process group id we created; no memory involved.
    let rc = unsafe { libc::kill(-pgid, libc::SIGKILL) };
    if rc == 0 {
        return Ok(());
    }
    match io::Error::last_os_error() {
        err if err.raw_os_error() == Some(libc::ESRCH) => Ok(()),
        err => Err(err),
    }
}

/// Copy `reader` to the end, keeping everything and forwarding to `sink`.
///
/// A failing sink is dropped with a warning; draining continues so the child
/// never blocks on a full pipe or pty buffer.
fn drain<R: Read>(
    mut reader: R,
    sink: &mut (dyn Write + Send),
    stream: &str,
) -> io::Result<Vec<u8>> {
    let mut collected = Vec::new();
    let mut chunk = [0u8; READ_CHUNK];
    let mut forwarding = true;

    loop {
        let n = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            // A pty master reports EIO once every slave handle is closed.
            Err(err) if err.raw_os_error() == Some(libc::EIO) => break,
            Err(err) => return Err(err),
        };
        collected.extend_from_slice(&chunk[..n]);

        if forwarding && let Err(err) = sink.write_all(&chunk[..n]).and_then(|()| sink.flush()) {
            warn!(stream, err = %err, "failed to forward agent output, sink disabled");
            forwarding = false;
        }
    }

    Ok(collected)
}

fn join_drain(
    handle: ScopedJoinHandle<'_, io::Result<Vec<u8>>>,
    stream: &str,
) -> Result<Vec<u8>, Error> {
    match handle.join() {
        Ok(Ok(bytes)) => Ok(bytes),
        Ok(Err(err)) => Err(Error::io(format!("read agent {stream}"), err)),
        Err(_) => Err(Error::io(
            format!("read agent {stream}"),
            io::Error::other("output reader thread panicked"),
        )),
    }
}

fn join_feed(handle: ScopedJoinHandle<'_, io::Result<()>>) -> Result<(), Error> {
    match handle.join() {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(Error::io("write stdin", err)),
        Err(_) => Err(Error::io(
            "write stdin",
            io::Error::other("stdin writer thread panicked"),
        )),
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

/// Turn the wait outcome plus captured streams into a run result.
///
/// A failed or killed child takes precedence over stream errors, which are
/// reported only when the child itself succeeded.
fn finish(
    exit: Exit,
    stdout: Result<Vec<u8>, Error>,
    stderr: Result<Vec<u8>, Error>,
    fed: Result<(), Error>,
) -> RunResult {
    let (status, terminated) = match exit {
        Exit::Exited(status) => (status, None),
        Exit::Terminated(reason, status) => (status, Some(reason)),
    };

    let mut stream_error = None;
    let mut keep = |result: Result<Vec<u8>, Error>| match result {
        Ok(bytes) => bytes,
        Err(err) => {
            stream_error.get_or_insert(err);
            Vec::new()
        }
    };
    let output = RunOutput {
        stdout: keep(stdout),
        stderr: keep(stderr),
        exit_code: exit_code(status),
    };
    debug!(exit_code = output.exit_code, terminated = ?terminated, "agent finished");

    if let Some(reason) = terminated {
        return Err(RunFailure::new(output, Error::Terminated { reason }));
    }
    if !status.success() {
        let exit_code = output.exit_code;
        return Err(RunFailure::new(output, Error::RunFailed { exit_code }));
    }
    if let Some(err) = stream_error.or(fed.err()) {
        return Err(RunFailure::new(output, err));
    }
    Ok(output)
}
