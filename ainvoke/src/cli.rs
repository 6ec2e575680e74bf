//! Command-line surface of the `ainvoke` binary.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "ainvoke",
    version,
    about = "Run coding-agent CLIs as schema-checked JSON functions"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Invoke an agent command with normalized JSON I/O.
    Exec(ExecArgs),
    /// Invoke codex with normalized JSON I/O.
    Codex(VendorArgs),
    /// Invoke claude with normalized JSON I/O.
    Claude(VendorArgs),
    /// Invoke gemini with normalized JSON I/O.
    Gemini(VendorArgs),
    /// Invoke opencode with normalized JSON I/O.
    Opencode(VendorArgs),
    /// Invoke the agent described by a TOML config file.
    Run(RunArgs),
    /// Show examples and usage instructions.
    Quickstart,
}

/// Flags shared by `exec` and the vendor wrappers.
#[derive(Debug, Args)]
pub struct CommonArgs {
    /// Input JSON schema (inline).
    #[arg(long, conflicts_with = "input_schema_file")]
    pub input_schema: Option<String>,

    /// Path to the input JSON schema.
    #[arg(long, value_name = "PATH")]
    pub input_schema_file: Option<PathBuf>,

    /// Output JSON schema (inline).
    #[arg(long, conflicts_with = "output_schema_file")]
    pub output_schema: Option<String>,

    /// Path to the output JSON schema.
    #[arg(long, value_name = "PATH")]
    pub output_schema_file: Option<PathBuf>,

    /// System prompt for the agent.
    #[arg(long)]
    pub prompt: Option<String>,

    /// Input value: JSON when it starts with `{` or `[`, otherwise a string.
    /// Without it, an existing `input.json` in the work dir is used.
    #[arg(long)]
    pub input: Option<String>,

    /// Extra argument for the agent command (repeatable).
    #[arg(long = "extra-args", value_name = "ARG", allow_hyphen_values = true)]
    pub extra_args: Vec<String>,

    /// Run directory for input/output files.
    #[arg(long, default_value = ".")]
    pub work_dir: PathBuf,

    /// Kill the agent after this many seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Forward agent stdout/stderr to stderr.
    #[arg(long)]
    pub debug: bool,
}

#[derive(Debug, Args)]
pub struct ExecArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Run the agent in a pseudo-terminal (`--tty=false` to pipe).
    #[arg(
        long,
        default_value_t = true,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        action = ArgAction::Set
    )]
    pub tty: bool,

    /// Agent command and its arguments.
    #[arg(
        value_name = "CMD",
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub cmd: Vec<String>,
}

#[derive(Debug, Args)]
pub struct VendorArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Model identifier.
    #[arg(long)]
    pub model: Option<String>,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Agent config file (TOML).
    #[arg(long, value_name = "PATH")]
    pub config: PathBuf,

    /// Input value, parsed like `exec --input`.
    #[arg(long)]
    pub input: Option<String>,

    /// Overrides the config's `run_dir`.
    #[arg(long)]
    pub work_dir: Option<PathBuf>,

    /// Overrides the config's `timeout_secs`.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Forward agent stdout/stderr to stderr.
    #[arg(long)]
    pub debug: bool,
}

pub const QUICKSTART: &str = r#"Quickstart Guide for ainvoke

1. Generic Execution (exec)
   Run any agent command with normalized I/O.

   ainvoke exec \
     --input-schema='{"type":"object","properties":{"input":{"type":"string"}},"required":["input"]}' \
     --output-schema='{"type":"object","properties":{"output":{"type":"string"}},"required":["output"]}' \
     --prompt="Input is a name, answer as Hello, <name>!" \
     --input='{"input":"Bro"}' \
     --extra-args=--model=gpt-5.1-codex-mini \
     --extra-args=--sandbox=workspace-write \
     -- codex exec

2. Claude Wrapper
   Run Claude agents with default flags.

   ainvoke claude \
     --model="claude-3-5-sonnet-latest" \
     --prompt="Input is a name, answer as Salam, <name>!" \
     --input='{"input":"Bro"}'

3. Codex Wrapper
   Simplified invocation for Codex agents.

   ainvoke codex \
     --model="gpt-5.1-codex-mini" \
     --prompt="Input is a name, answer as Salam, <name>!" \
     --input='{"input":"Bro"}'

4. Gemini Wrapper
   Run Gemini agents with default flags.

   ainvoke gemini \
     --model="gemini-3-flash-preview" \
     --prompt="Input is a name, answer as Salam, <name>!" \
     --input='{"input":"Bro"}'

5. OpenCode Wrapper
   Run OpenCode agents with default flags.

   ainvoke opencode \
     --model="opencode/big-pickle" \
     --prompt="Input is a name, answer as Salam, <name>!" \
     --input='{"input":"Bro"}'

6. Config File
   Describe an agent once in TOML and reuse it.

   # agent.toml
   vendor = "codex"
   model = "gpt-5.1-codex-mini"
   system_prompt = "Input is a name, answer as Hello, <name>!"
   timeout_secs = 600

   ainvoke run --config agent.toml --input Bro

The JSON written to output.json is printed on stdout. On failure the
agent's diagnostics and the error go to stderr and the exit code is the
agent's own (or 1). Set RUST_LOG=ainvoke=debug for runner diagnostics."#;
