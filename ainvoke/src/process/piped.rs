//! Piped execution: prompt on stdin, stdout and stderr captured separately.

use std::io::{self, Write};
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{ChildStdin, Command, Stdio};
use std::thread;

use tracing::{debug, error, instrument};

use super::{
    RunFailure, RunResult, await_streams, drain, finish, join_drain, join_feed, kill_process_group,
    split_argv, wait_for_exit,
};
use crate::cancel::RunContext;
use crate::error::Error;

/// Run `argv` in `workdir` with `stdin` piped in.
///
/// Both streams are read concurrently with the wait, so a chatty child never
/// blocks on a full pipe, and each is copied to its sink as it arrives.
#[instrument(skip_all, fields(program = argv.first().map(String::as_str), workdir = %workdir.display()))]
pub fn run(
    ctx: &RunContext,
    argv: &[String],
    workdir: &Path,
    stdin: &[u8],
    stdout_sink: &mut (dyn Write + Send),
    stderr_sink: &mut (dyn Write + Send),
) -> RunResult {
    let (program, args) = split_argv(argv)?;
    if let Some(reason) = ctx.done() {
        return Err(Error::Terminated { reason }.into());
    }

    let mut cmd = Command::new(program);
    cmd.args(args)
        .current_dir(workdir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .process_group(0);

    let mut child = cmd.spawn().map_err(|source| {
        error!(err = %source, "failed to spawn agent");
        Error::Spawn {
            program: program.clone(),
            source,
        }
    })?;
    let pgid = child.id();
    debug!(pid = pgid, "spawned agent");

    let (Some(child_stdin), Some(child_stdout), Some(child_stderr)) =
        (child.stdin.take(), child.stdout.take(), child.stderr.take())
    else {
        kill_process_group(&mut child);
        let _ = child.wait();
        return Err(RunFailure::from(Error::io(
            "attach agent pipes",
            io::Error::other("stdio was not piped"),
        )));
    };

    thread::scope(|scope| {
        let feed = scope.spawn(move || feed_stdin(child_stdin, stdin));
        let out = scope.spawn(move || drain(child_stdout, stdout_sink, "stdout"));
        let err = scope.spawn(move || drain(child_stderr, stderr_sink, "stderr"));

        let exit = wait_for_exit(&mut child, ctx).map(|exit| {
            await_streams(exit, pgid, ctx, || {
                out.is_finished() && err.is_finished() && feed.is_finished()
            })
        });

        let stdout = join_drain(out, "stdout");
        let stderr = join_drain(err, "stderr");
        let fed = join_feed(feed);
        match exit {
            Ok(exit) => finish(exit, stdout, stderr, fed),
            Err(err) => Err(RunFailure::from(err)),
        }
    })
}

/// Write the whole prompt, then close stdin so the child sees EOF.
///
/// An agent may exit without reading its stdin; the resulting broken pipe
/// is not an error.
fn feed_stdin(mut pipe: ChildStdin, data: &[u8]) -> io::Result<()> {
    match pipe.write_all(data) {
        Err(err) if err.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        other => other,
    }
}
