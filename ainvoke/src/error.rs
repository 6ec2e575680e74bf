//! Error taxonomy for agent invocations.
//!
//! Every failure of [`crate::runner::Runner::run`] is one [`Error`]. Callers
//! that only need to branch on the failure class use [`Error::kind`].

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::cancel::Termination;

/// Which side of the file contract a schema guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaRole {
    Input,
    Output,
}

impl fmt::Display for SchemaRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaRole::Input => f.write_str("input"),
            SchemaRole::Output => f.write_str("output"),
        }
    }
}

/// Flat classification of [`Error`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    RunDirMissing,
    InputMissing,
    SchemaEmpty,
    SchemaMalformed,
    SchemaMismatch,
    OutputMissing,
    RunFailed,
    Terminated,
    /// Spawn, pty, template, encoding and other I/O failures.
    Infrastructure,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("run dir missing: {}: {source}", path.display())]
    RunDirMissing {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("input file missing: {}: {source}", path.display())]
    InputMissing {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{role} schema is empty")]
    SchemaEmpty { role: SchemaRole },

    #[error("invalid {role} schema: {message}")]
    SchemaMalformed { role: SchemaRole, message: String },

    #[error("{role} does not match schema: {details}")]
    SchemaMismatch { role: SchemaRole, details: String },

    #[error("output file missing: {}: {source}", path.display())]
    OutputMissing {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("agent run failed: exit code {exit_code}")]
    RunFailed { exit_code: i32 },

    /// The runner killed the child because the context ended.
    #[error("agent terminated: {reason}")]
    Terminated { reason: Termination },

    #[error("agent command is empty")]
    EmptyCommand,

    #[error("spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("allocate pty: {0}")]
    Pty(#[source] io::Error),

    #[error("marshal input: {0}")]
    EncodeInput(#[source] serde_json::Error),

    #[error("render prompt template: {0}")]
    Template(#[from] minijinja::Error),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        Error::Io {
            context: context.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::RunDirMissing { .. } => ErrorKind::RunDirMissing,
            Error::InputMissing { .. } => ErrorKind::InputMissing,
            Error::SchemaEmpty { .. } => ErrorKind::SchemaEmpty,
            Error::SchemaMalformed { .. } => ErrorKind::SchemaMalformed,
            Error::SchemaMismatch { .. } => ErrorKind::SchemaMismatch,
            Error::OutputMissing { .. } => ErrorKind::OutputMissing,
            Error::RunFailed { .. } => ErrorKind::RunFailed,
            Error::Terminated { .. } => ErrorKind::Terminated,
            Error::EmptyCommand
            | Error::Spawn { .. }
            | Error::Pty(_)
            | Error::EncodeInput(_)
            | Error::Template(_)
            | Error::Io { .. } => ErrorKind::Infrastructure,
        }
    }

    /// Exit code of the child when it exited on its own with a failure.
    ///
    /// `None` means the failure happened around the child (spawn, schema
    /// gate, I/O) or the child was killed and has no exit code.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Error::RunFailed { exit_code } => Some(*exit_code),
            _ => None,
        }
    }

    /// The schema side involved, for schema-gate failures.
    pub fn schema_role(&self) -> Option<SchemaRole> {
        match self {
            Error::SchemaEmpty { role }
            | Error::SchemaMalformed { role, .. }
            | Error::SchemaMismatch { role, .. } => Some(*role),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
