//! Run coding-agent CLIs as schema-checked functions.
//!
//! An invocation hands an agent a JSON input file and a prompt describing
//! the input and output JSON schemas, runs the agent as a child process, and
//! accepts the result only if the agent wrote an `output.json` that
//! validates. The architecture splits into:
//!
//! - **Core**: [`schema`], [`prompt`], [`contract`] (the run-directory file
//!   contract), [`process`] (piped and pty execution), and the [`runner`]
//!   facade tying them together under a [`cancel::RunContext`].
//! - **Collaborators**: [`vendor`] flag injection for known agent CLIs,
//!   [`config`] for TOML-described agents, and the [`agent`] adapter that
//!   turns a configured agent into a message-in, text-out call.
//!
//! The `ainvoke` binary wraps all of this as a command-line tool.

pub mod agent;
pub mod cancel;
pub mod config;
pub mod contract;
pub mod error;
pub mod exit_codes;
pub mod logging;
pub mod options;
pub mod process;
pub mod prompt;
pub mod runner;
pub mod schema;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod vendor;

pub use cancel::{RunContext, Termination};
pub use error::{Error, ErrorKind, Result, SchemaRole};
pub use options::RunOptions;
pub use process::{RunFailure, RunOutput, RunResult};
pub use runner::{ExecRunner, Invocation, Runner};
