//! Pseudo-terminal execution for agents that insist on an interactive tty.
//!
//! The pty replaces stdin, stdout and stderr, so both output streams arrive
//! merged on the master side. The prompt is "typed" into the terminal as a
//! single line followed by Ctrl-D.

use std::fs::File;
use std::io::{self, Write};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Command, Stdio};
use std::{ptr, thread};

use tracing::{debug, error, instrument};

use super::{
    RunFailure, RunResult, await_streams, drain, finish, join_drain, join_feed, split_argv,
    wait_for_exit,
};
use crate::cancel::RunContext;
use crate::error::Error;

/// End-of-transmission (Ctrl-D): end of input for line-oriented readers.
const EOT: u8 = 0x04;

const WINDOW_ROWS: u16 = 24;
const WINDOW_COLS: u16 = 80;

/// Run `argv` in `workdir` attached to a fresh pseudo-terminal.
///
/// A dedicated thread drains the master side while the prompt is written
/// and the child is awaited; the call returns only after that thread has
/// copied everything, so the returned stdout is never torn. The returned
/// stderr is always empty.
#[instrument(skip_all, fields(program = argv.first().map(String::as_str), workdir = %workdir.display()))]
pub fn run(
    ctx: &RunContext,
    argv: &[String],
    workdir: &Path,
    stdin: &[u8],
    sink: &mut (dyn Write + Send),
) -> RunResult {
    let (program, args) = split_argv(argv)?;
    if let Some(reason) = ctx.done() {
        return Err(Error::Terminated { reason }.into());
    }

    let (master, slave) = open_pty().map_err(Error::Pty)?;
    let reader = File::from(master.try_clone().map_err(Error::Pty)?);
    let writer = File::from(master.try_clone().map_err(Error::Pty)?);

    let mut cmd = Command::new(program);
    cmd.args(args)
        .current_dir(workdir)
        .stdin(Stdio::from(slave.try_clone().map_err(Error::Pty)?))
        .stdout(Stdio::from(slave.try_clone().map_err(Error::Pty)?))
        .stderr(Stdio::from(slave));
    attach_controlling_terminal(&mut cmd);

    let spawned = cmd.spawn();
    // The parent must not keep slave handles open, or master reads never
    // observe the child's exit.
    drop(cmd);
    let mut child = spawned.map_err(|source| {
        error!(err = %source, "failed to spawn agent");
        Error::Spawn {
            program: program.clone(),
            source,
        }
    })?;
    let pgid = child.id();
    debug!(pid = pgid, "spawned agent on pty");

    thread::scope(|scope| {
        let drained = scope.spawn(move || drain(reader, sink, "pty"));
        let typed = scope.spawn(move || type_prompt(writer, stdin));

        let exit = wait_for_exit(&mut child, ctx).map(|exit| {
            await_streams(exit, pgid, ctx, || drained.is_finished() && typed.is_finished())
        });
        drop(master);

        let fed = join_feed(typed);
        let stdout = join_drain(drained, "pty");
        match exit {
            Ok(exit) => finish(exit, stdout, Ok(Vec::new()), fed),
            Err(err) => Err(RunFailure::from(err)),
        }
    })
}

/// Type `prompt` as one submitted line, then Ctrl-D.
///
/// EIO means the child already closed its side of the terminal, which is
/// how a child that never reads its input looks from here.
fn type_prompt(mut master: File, prompt: &[u8]) -> io::Result<()> {
    match write_line(&mut master, prompt) {
        Err(err) if err.raw_os_error() == Some(libc::EIO) => {
            debug!("pty closed before prompt was fully written");
            return Ok(());
        }
        Err(err) => return Err(err),
        Ok(()) => {}
    }

    if let Err(err) = master.write_all(&[EOT]) {
        debug!(err = %err, "failed to send EOT");
    }
    Ok(())
}

fn write_line(master: &mut File, line: &[u8]) -> io::Result<()> {
    if line.is_empty() {
        return Ok(());
    }
    master.write_all(line)?;
    if !line.ends_with(b"\n") {
        master.write_all(b"\n")?;
    }
    Ok(())
}

#[allow(unsafe_code)]
fn open_pty() -> io::Result<(OwnedFd, OwnedFd)> {
    let mut master: libc::c_int = -1;
    let mut slave: libc::c_int = -1;
    let mut size = libc::winsize {
        ws_row: WINDOW_ROWS,
        ws_col: WINDOW_COLS,
        ws_xpixel: 0,
        ws_ypixel: 0,
    };
    // SAFETY: the out-pointers are valid for the call; name and termios are optional.
    let rc = unsafe {
        libc::openpty(
            &mut master,
            &mut slave,
            ptr::null_mut(),
            ptr::null_mut(),
            &mut size,
        )
    };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: openpty succeeded, so both descriptors are open and owned here.
    let (master, slave) = unsafe { (OwnedFd::from_raw_fd(master), OwnedFd::from_raw_fd(slave)) };
    set_cloexec(&master)?;
    set_cloexec(&slave)?;
    Ok((master, slave))
}

#[allow(unsafe_code)]
fn set_cloexec(fd: &OwnedFd) -> io::Result<()> {
    // SAFETY: fcntl on a descriptor we own.
    let rc = unsafe { libc::fcntl(fd.as_raw_fd(), libc::F_SETFD, libc::FD_CLOEXEC) };
    if rc == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Make the child a session leader whose controlling terminal is the pty.
///
/// The new session is also a new process group, which is what cancellation
/// kills.
#[allow(unsafe_code)]
fn attach_controlling_terminal(cmd: &mut Command) {
    // SAFETY: the hook runs between fork and exec and only makes
    // async-signal-safe syscalls. Stdio is already redirected to the slave.
    unsafe {
        cmd.pre_exec(|| {
            if libc::setsid() == -1 {
                return Err(io::Error::last_os_error());
            }
            if libc::ioctl(libc::STDIN_FILENO, libc::TIOCSCTTY as _, 0) == -1 {
                return Err(io::Error::last_os_error());
            }
            Ok(())
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::test_support::sh;
    use std::time::{Duration, Instant};

    #[test]
    fn child_sees_a_terminal() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut sink = Vec::new();
        let output = run(
            &RunContext::background(),
            &sh("if [ -t 0 ] && [ -t 1 ]; then echo is-tty; else echo no-tty; fi"),
            temp.path(),
            b"",
            &mut sink,
        )
        .expect("run");

        let text = String::from_utf8_lossy(&output.stdout);
        assert!(text.contains("is-tty"), "output: {text}");
        assert_eq!(sink, output.stdout);
        assert!(output.stderr.is_empty());
    }

    #[test]
    fn stderr_is_merged_into_stdout() {
        let temp = tempfile::tempdir().expect("tempdir");
        let output = run(
            &RunContext::background(),
            &sh("echo 'stderr line' >&2"),
            temp.path(),
            b"",
            &mut io::sink(),
        )
        .expect("run");

        assert!(String::from_utf8_lossy(&output.stdout).contains("stderr line"));
        assert!(output.stderr.is_empty());
    }

    #[test]
    fn prompt_is_submitted_and_terminated_with_eot() {
        let temp = tempfile::tempdir().expect("tempdir");
        run(
            &RunContext::background(),
            &sh("cat > prompt.txt"),
            temp.path(),
            b"first line\nsecond line",
            &mut io::sink(),
        )
        .expect("run");

        let typed = std::fs::read_to_string(temp.path().join("prompt.txt")).expect("prompt");
        assert_eq!(typed, "first line\nsecond line\n");
    }

    #[test]
    fn nonzero_exit_is_reported() {
        let temp = tempfile::tempdir().expect("tempdir");
        let failure = run(
            &RunContext::background(),
            &sh("exit 7"),
            temp.path(),
            b"",
            &mut io::sink(),
        )
        .unwrap_err();
        assert_eq!(failure.error.kind(), ErrorKind::RunFailed);
        assert_eq!(failure.exit_code(), 7);
    }

    #[test]
    fn missing_binary_is_a_spawn_failure() {
        let temp = tempfile::tempdir().expect("tempdir");
        let failure = run(
            &RunContext::background(),
            &["definitely-missing-agent-binary".to_string()],
            temp.path(),
            b"",
            &mut io::sink(),
        )
        .unwrap_err();
        assert!(matches!(failure.error, Error::Spawn { .. }));
    }

    #[test]
    fn deadline_kills_child_and_drains() {
        let temp = tempfile::tempdir().expect("tempdir");
        let ctx = RunContext::background().with_timeout(Duration::from_millis(300));
        let started = Instant::now();
        let failure = run(&ctx, &sh("echo started; sleep 30"), temp.path(), b"", &mut io::sink())
            .unwrap_err();

        assert_eq!(failure.error.kind(), ErrorKind::Terminated);
        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(String::from_utf8_lossy(&failure.output.stdout).contains("started"));
    }
}
