//! Message-in, text-out adapter over a configured agent.
//!
//! [`ExecAgent`] is the shape chat-style hosts want: one user message goes
//! in, one response string comes out. The default schemas make that a thin
//! wrapper (`{"input": msg}` in, the `output` string out); custom schemas
//! pass structured JSON through untouched.

use std::borrow::Cow;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::cancel::RunContext;
use crate::config::{AgentConfig, DEFAULT_INPUT_SCHEMA, DEFAULT_OUTPUT_SCHEMA};
use crate::contract;
use crate::options::RunOptions;
use crate::process::RunFailure;
use crate::runner::{ExecRunner, Runner};

#[derive(Debug, Clone)]
pub struct ExecAgent {
    name: String,
    config: AgentConfig,
    runner: ExecRunner,
}

impl ExecAgent {
    /// Blank schemas fall back to the defaults.
    pub fn new(name: impl Into<String>, mut config: AgentConfig) -> Result<Self> {
        if config.input_schema.trim().is_empty() {
            config.input_schema = DEFAULT_INPUT_SCHEMA.to_string();
        }
        if config.output_schema.trim().is_empty() {
            config.output_schema = DEFAULT_OUTPUT_SCHEMA.to_string();
        }
        config.validate()?;
        let runner = config.runner()?;
        Ok(Self {
            name: name.into(),
            config,
            runner,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Run the agent once on `message` and return its response text.
    ///
    /// The run directory must already exist; unlike adapters that prepare
    /// their own scratch space, this one never creates it.
    ///
    /// On failure the error carries the agent's stderr (or stdout, when
    /// stderr is empty) and can be downcast to [`RunFailure`].
    #[instrument(skip_all, fields(agent = %self.name))]
    pub fn respond(&self, ctx: &RunContext, message: &str) -> Result<String> {
        let inv = self.config.invocation(Some(self.prepare_input(message)));
        let ctx = match self.config.timeout() {
            Some(timeout) => ctx.with_timeout(timeout),
            None => ctx.clone(),
        };

        if let Err(failure) = self.runner.run(&ctx, &inv, RunOptions::default()) {
            return Err(run_failed(failure));
        }

        let output = contract::read_output(&inv.run_dir).context("read output")?;
        debug!(bytes = output.len(), "agent responded");
        Ok(self.format_response(&output))
    }

    fn prepare_input(&self, message: &str) -> Value {
        if self.config.input_schema == DEFAULT_INPUT_SCHEMA {
            return serde_json::json!({ "input": message });
        }
        parse_message(message)
    }

    fn format_response(&self, output: &[u8]) -> String {
        let raw = String::from_utf8_lossy(output);
        if self.config.output_schema != DEFAULT_OUTPUT_SCHEMA {
            return raw.into_owned();
        }
        match serde_json::from_slice::<Value>(output) {
            Ok(Value::Object(mut fields)) => match fields.remove("output") {
                Some(Value::String(text)) => text,
                _ => raw.into_owned(),
            },
            _ => raw.into_owned(),
        }
    }
}

/// JSON when the message looks like an object or array and parses, else
/// the message as a JSON string.
fn parse_message(message: &str) -> Value {
    let trimmed = message.trim();
    if (trimmed.starts_with('{') || trimmed.starts_with('['))
        && let Ok(value) = serde_json::from_str(trimmed)
    {
        return value;
    }
    if trimmed.is_empty() {
        return Value::String(String::new());
    }
    Value::String(message.to_string())
}

fn run_failed(failure: RunFailure) -> anyhow::Error {
    let echoed = diagnostic_output(&failure);
    let message = if echoed.trim().is_empty() {
        "run failed".to_string()
    } else {
        format!("run failed (output: {})", echoed.trim_end())
    };
    anyhow::Error::new(failure).context(message)
}

fn diagnostic_output(failure: &RunFailure) -> Cow<'_, str> {
    if failure.output.stderr.is_empty() {
        String::from_utf8_lossy(&failure.output.stdout)
    } else {
        String::from_utf8_lossy(&failure.output.stderr)
    }
}
