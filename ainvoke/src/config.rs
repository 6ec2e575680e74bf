//! Agent configuration, usually loaded from a TOML file.
//!
//! ```toml
//! vendor = "codex"
//! model = "gpt-5.1-codex-mini"
//! system_prompt = "Input is a name, answer as Hello, <name>!"
//! timeout_secs = 600
//! run_dir = "runs/hello"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::runner::{ExecRunner, Invocation};
use crate::vendor::Vendor;

/// Input schema used when none is configured: `{"input": string}`.
pub const DEFAULT_INPUT_SCHEMA: &str =
    r#"{"type":"object","properties":{"input":{"type":"string"}},"required":["input"]}"#;
/// Output schema used when none is configured: `{"output": string}`.
pub const DEFAULT_OUTPUT_SCHEMA: &str =
    r#"{"type":"object","properties":{"output":{"type":"string"}},"required":["output"]}"#;

/// How to run one agent (TOML).
///
/// Missing fields take their defaults, so a config naming only a `vendor`
/// is complete.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AgentConfig {
    /// Known agent CLI. Supplies the program name when `cmd` is empty and
    /// the vendor's non-interactive flags.
    pub vendor: Option<Vendor>,

    /// Command line, program first. Overrides the vendor's program name.
    pub cmd: Vec<String>,

    /// Appended to `cmd` before vendor flags are filled in.
    pub extra_args: Vec<String>,

    pub model: Option<String>,

    /// Run the agent on a pseudo-terminal. Defaults to piped.
    pub use_tty: Option<bool>,

    /// Wall-clock limit for one run in seconds; `0` means none.
    pub timeout_secs: u64,

    pub system_prompt: Option<String>,
    pub input_schema: String,
    pub output_schema: String,

    /// Existing directory for `input.json` and `output.json`.
    pub run_dir: PathBuf,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            vendor: None,
            cmd: Vec::new(),
            extra_args: Vec::new(),
            model: None,
            use_tty: None,
            timeout_secs: 0,
            system_prompt: None,
            input_schema: DEFAULT_INPUT_SCHEMA.to_string(),
            output_schema: DEFAULT_OUTPUT_SCHEMA.to_string(),
            run_dir: PathBuf::from("."),
        }
    }
}

impl AgentConfig {
    pub fn validate(&self) -> Result<()> {
        if self.vendor.is_none() && self.cmd.is_empty() {
            return Err(anyhow!("either vendor or cmd must be set"));
        }
        if let Some(program) = self.cmd.first()
            && program.trim().is_empty()
        {
            return Err(anyhow!("cmd must start with a program name"));
        }
        if self.run_dir.as_os_str().is_empty() {
            return Err(anyhow!("run_dir must not be empty"));
        }
        Ok(())
    }

    /// Full command line: program, extra args, then vendor flags.
    pub fn argv(&self) -> Vec<String> {
        let mut argv = if self.cmd.is_empty() {
            self.vendor
                .map(|vendor| vec![vendor.program().to_string()])
                .unwrap_or_default()
        } else {
            self.cmd.clone()
        };
        argv.extend(self.extra_args.iter().cloned());

        match self.vendor {
            Some(vendor) => vendor.apply(&argv, self.model.as_deref()),
            None => argv,
        }
    }

    pub fn use_tty(&self) -> bool {
        self.use_tty.unwrap_or(false)
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    pub fn runner(&self) -> Result<ExecRunner> {
        ExecRunner::new(self.argv(), self.use_tty()).context("build agent runner")
    }

    /// Invocation in `run_dir` with the configured schemas and prompt.
    ///
    /// `input: None` runs against an `input.json` already in `run_dir`.
    pub fn invocation(&self, input: Option<Value>) -> Invocation {
        Invocation {
            input,
            input_schema: self.input_schema.clone(),
            output_schema: self.output_schema.clone(),
            system_prompt: self.system_prompt.clone(),
            model_hint: self.model.clone(),
            ..Invocation::new(&self.run_dir)
        }
    }
}

/// Load and validate an agent config from a TOML file.
pub fn load_config(path: &Path) -> Result<AgentConfig> {
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: AgentConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}
