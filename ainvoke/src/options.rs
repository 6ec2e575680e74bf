//! Per-call run options.

use std::fmt;
use std::io::{self, Write};

/// Sink that receives a copy of the child's output as it is produced.
pub type Sink<'a> = Box<dyn Write + Send + 'a>;

/// Options resolved once per [`crate::runner::Runner::run`] call.
///
/// Defaults: both sinks discard, `tty` inherits the runner's configured
/// mode. Output is always captured into the returned buffers as well; the
/// sinks only see a copy.
pub struct RunOptions<'a> {
    pub stdout: Sink<'a>,
    /// Unused in pty mode, where the terminal merges both streams into
    /// `stdout`.
    pub stderr: Sink<'a>,
    /// `Some` overrides the runner's pty setting for this call.
    pub tty: Option<bool>,
}

impl Default for RunOptions<'_> {
    fn default() -> Self {
        Self {
            stdout: Box::new(io::sink()),
            stderr: Box::new(io::sink()),
            tty: None,
        }
    }
}

impl fmt::Debug for RunOptions<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunOptions")
            .field("tty", &self.tty)
            .finish_non_exhaustive()
    }
}

impl RunOptions<'_> {
    pub(crate) fn use_tty(&self, configured: bool) -> bool {
        self.tty.unwrap_or(configured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_inherits_configured_tty() {
        let opts = RunOptions::default();
        assert!(opts.use_tty(true));
        assert!(!opts.use_tty(false));
    }

    #[test]
    fn explicit_tty_overrides_configuration() {
        let opts = RunOptions {
            tty: Some(false),
            ..RunOptions::default()
        };
        assert!(!opts.use_tty(true));
    }

    #[test]
    fn default_sinks_accept_writes() {
        let mut opts = RunOptions::default();
        opts.stdout.write_all(b"dropped").expect("stdout sink");
        opts.stderr.write_all(b"dropped").expect("stderr sink");
    }
}
