//! Runner facade: one call from invocation to validated output.
//!
//! Sequencing, each step stopping at the first error:
//!
//! 1. write and validate `input.json`
//! 2. render the prompt
//! 3. resolve options (runner pty setting, caller overrides)
//! 4. execute the agent under the caller's [`RunContext`]
//! 5. require `output.json` and validate it against the output schema
//!
//! The output file is never inspected unless the agent exited successfully.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::cancel::RunContext;
use crate::contract;
use crate::error::{Error, Result, SchemaRole};
use crate::options::RunOptions;
use crate::process::{self, RunFailure, RunResult};
use crate::prompt::{self, PromptRequest};
use crate::schema;

/// One request to run an agent under the file/schema contract.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Invocation {
    /// Existing directory holding `input.json` and `output.json`; also the
    /// agent's working directory.
    pub run_dir: PathBuf,
    /// Structured input. `None` means `input.json` is already on disk.
    pub input: Option<Value>,
    pub input_schema: String,
    pub output_schema: String,
    pub system_prompt: Option<String>,
    /// Advisory model preference included in the prompt.
    pub model_hint: Option<String>,
}

impl Invocation {
    pub fn new(run_dir: impl Into<PathBuf>) -> Self {
        Self {
            run_dir: run_dir.into(),
            ..Self::default()
        }
    }

    /// Set the structured input from any serializable value.
    pub fn with_input<T: Serialize>(mut self, input: &T) -> Result<Self> {
        self.input = Some(serde_json::to_value(input).map_err(Error::EncodeInput)?);
        Ok(self)
    }

    pub fn input_path(&self) -> PathBuf {
        contract::input_path(&self.run_dir)
    }

    pub fn output_path(&self) -> PathBuf {
        contract::output_path(&self.run_dir)
    }
}

/// Executes an agent for an [`Invocation`].
pub trait Runner {
    fn run(&self, ctx: &RunContext, inv: &Invocation, opts: RunOptions<'_>) -> RunResult;
}

/// Runner that spawns a fixed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecRunner {
    argv: Vec<String>,
    use_tty: bool,
}

impl ExecRunner {
    pub fn new(argv: Vec<String>, use_tty: bool) -> Result<Self> {
        if argv.first().is_none_or(|program| program.trim().is_empty()) {
            return Err(Error::EmptyCommand);
        }
        Ok(Self { argv, use_tty })
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    pub fn use_tty(&self) -> bool {
        self.use_tty
    }
}

impl Runner for ExecRunner {
    #[instrument(skip_all, fields(program = %self.argv[0], run_dir = %inv.run_dir.display()))]
    fn run(&self, ctx: &RunContext, inv: &Invocation, mut opts: RunOptions<'_>) -> RunResult {
        contract::write_input(inv)?;
        let prompt = render_prompt(inv)?;
        let tty = opts.use_tty(self.use_tty);
        info!(tty, "running agent");

        let output = if tty {
            process::pty::run(ctx, &self.argv, &inv.run_dir, prompt.as_bytes(), &mut *opts.stdout)
        } else {
            process::piped::run(
                ctx,
                &self.argv,
                &inv.run_dir,
                prompt.as_bytes(),
                &mut *opts.stdout,
                &mut *opts.stderr,
            )
        }
        .inspect_err(|failure| {
            debug!(err = %failure.error, exit_code = failure.exit_code(), "agent run failed");
        })?;

        match check_output(&inv.run_dir, &inv.output_schema) {
            Ok(()) => {
                debug!("output validated");
                Ok(output)
            }
            Err(error) => Err(RunFailure::new(output, error)),
        }
    }
}

fn render_prompt(inv: &Invocation) -> Result<String> {
    let input_path = inv.input_path();
    let output_path = inv.output_path();
    prompt::render(&PromptRequest {
        system_prompt: inv.system_prompt.as_deref(),
        input_path: &input_path,
        input_schema: &inv.input_schema,
        output_path: &output_path,
        output_schema: &inv.output_schema,
        model_hint: inv.model_hint.as_deref(),
    })
}

fn check_output(run_dir: &Path, output_schema: &str) -> Result<()> {
    let data = contract::read_output(run_dir)?;
    schema::validate(SchemaRole::Output, output_schema, &data)
}
