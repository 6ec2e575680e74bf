//! `ainvoke`: run a coding-agent CLI as a schema-checked JSON function.
//!
//! Prints the agent's `output.json` on success. On failure echoes the
//! agent's diagnostics and the error to stderr and exits with the agent's
//! exit code (or 1).

mod cli;

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use ainvoke::cancel::RunContext;
use ainvoke::config::{self, DEFAULT_INPUT_SCHEMA, DEFAULT_OUTPUT_SCHEMA};
use ainvoke::contract;
use ainvoke::exit_codes;
use ainvoke::logging;
use ainvoke::options::RunOptions;
use ainvoke::runner::{ExecRunner, Invocation, Runner};
use ainvoke::vendor::Vendor;
use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use signal_hook::iterator::{Handle, Signals};
use tracing::debug;

use crate::cli::{Cli, Command, CommonArgs, RunArgs, VendorArgs, QUICKSTART};

fn main() {
    logging::init();
    let cli = Cli::parse();
    let code = match run(cli) {
        Ok(()) => exit_codes::OK,
        Err(failure) => failure.report(),
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<(), Failure> {
    let plan = match cli.command {
        Command::Exec(args) => {
            let mut argv = args.cmd;
            argv.extend(args.common.extra_args.iter().cloned());
            Plan::from_common(argv, args.tty, &args.common)?
        }
        Command::Codex(args) => vendor_plan(Vendor::Codex, &args)?,
        Command::Claude(args) => vendor_plan(Vendor::Claude, &args)?,
        Command::Gemini(args) => vendor_plan(Vendor::Gemini, &args)?,
        Command::Opencode(args) => vendor_plan(Vendor::Opencode, &args)?,
        Command::Run(args) => Plan::from_config(&args)?,
        Command::Quickstart => {
            println!("{QUICKSTART}");
            return Ok(());
        }
    };
    plan.execute()
}

fn vendor_plan(vendor: Vendor, args: &VendorArgs) -> Result<Plan> {
    let mut argv = vec![vendor.program().to_string()];
    argv.extend(args.common.extra_args.iter().cloned());
    let argv = vendor.apply(&argv, args.model.as_deref());
    Plan::from_common(argv, false, &args.common)
}

/// Everything one CLI invocation needs, resolved from flags or config.
struct Plan {
    runner: ExecRunner,
    invocation: Invocation,
    timeout: Option<Duration>,
    debug: bool,
}

impl Plan {
    fn from_common(argv: Vec<String>, use_tty: bool, args: &CommonArgs) -> Result<Self> {
        let input_schema = resolve_schema(
            args.input_schema.as_deref(),
            args.input_schema_file.as_deref(),
            DEFAULT_INPUT_SCHEMA,
            "input",
        )?;
        let output_schema = resolve_schema(
            args.output_schema.as_deref(),
            args.output_schema_file.as_deref(),
            DEFAULT_OUTPUT_SCHEMA,
            "output",
        )?;
        let input = args.input.as_deref().map(parse_input).transpose()?;

        Ok(Self {
            runner: ExecRunner::new(argv, use_tty).context("build agent runner")?,
            invocation: Invocation {
                input,
                input_schema,
                output_schema,
                system_prompt: args.prompt.clone(),
                ..Invocation::new(work_dir(&args.work_dir))
            },
            timeout: args.timeout.filter(|secs| *secs > 0).map(Duration::from_secs),
            debug: args.debug,
        })
    }

    fn from_config(args: &RunArgs) -> Result<Self> {
        let mut cfg = config::load_config(&args.config)?;
        if let Some(work_dir) = &args.work_dir {
            cfg.run_dir = work_dir.clone();
        }
        if let Some(timeout) = args.timeout {
            cfg.timeout_secs = timeout;
        }
        let input = args.input.as_deref().map(parse_input).transpose()?;

        Ok(Self {
            runner: cfg.runner()?,
            invocation: cfg.invocation(input),
            timeout: cfg.timeout(),
            debug: args.debug,
        })
    }

    fn execute(self) -> Result<(), Failure> {
        let root = RunContext::background();
        let _signals = CancelOnSignal::install(&root)?;
        let ctx = match self.timeout {
            Some(timeout) => root.with_timeout(timeout),
            None => root,
        };

        let opts = if self.debug {
            RunOptions {
                stdout: Box::new(io::stderr()),
                stderr: Box::new(io::stderr()),
                tty: None,
            }
        } else {
            RunOptions::default()
        };

        debug!(argv = ?self.runner.argv(), "invoking agent");
        if let Err(failure) = self.runner.run(&ctx, &self.invocation, opts) {
            let echo = if !self.runner.use_tty() && failure.output.stderr.is_empty() {
                failure.output.stdout
            } else {
                failure.output.stderr
            };
            return Err(Failure {
                exit_code: exit_codes::for_child(failure.error.exit_code()),
                echo,
                error: anyhow::Error::new(failure.error).context("run invocation"),
            });
        }

        let output = contract::read_output(&self.invocation.run_dir).context("read output")?;
        let mut stdout = io::stdout().lock();
        stdout
            .write_all(&output)
            .and_then(|()| stdout.flush())
            .context("write stdout")?;
        Ok(())
    }
}

fn work_dir(path: &Path) -> PathBuf {
    if path.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        path.to_path_buf()
    }
}

fn resolve_schema(
    inline: Option<&str>,
    file: Option<&Path>,
    default: &str,
    label: &str,
) -> Result<String> {
    if let Some(path) = file {
        return fs::read_to_string(path)
            .with_context(|| format!("read {label} schema file {}", path.display()));
    }
    Ok(inline.unwrap_or(default).to_string())
}

/// JSON when the value starts with `{` or `[`, otherwise a JSON string.
fn parse_input(raw: &str) -> Result<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Value::String(String::new()));
    }
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).context("parse input JSON");
    }
    Ok(Value::String(raw.to_string()))
}

/// A failed command: what to echo, what to report, how to exit.
struct Failure {
    exit_code: i32,
    echo: Vec<u8>,
    error: anyhow::Error,
}

impl From<anyhow::Error> for Failure {
    fn from(error: anyhow::Error) -> Self {
        Self {
            exit_code: exit_codes::FAILURE,
            echo: Vec::new(),
            error,
        }
    }
}

impl Failure {
    fn report(self) -> i32 {
        let mut stderr = io::stderr().lock();
        if !self.echo.is_empty() {
            let _ = stderr.write_all(&self.echo);
        }
        let _ = writeln!(stderr, "{:#}", self.error);
        self.exit_code
    }
}

/// Cancels a context on SIGINT/SIGTERM until dropped.
struct CancelOnSignal {
    handle: Handle,
    thread: Option<JoinHandle<()>>,
}

impl CancelOnSignal {
    fn install(ctx: &RunContext) -> Result<Self> {
        let mut signals = Signals::new([libc::SIGINT, libc::SIGTERM])
            .context("register signal handlers")?;
        let handle = signals.handle();
        let ctx = ctx.clone();
        let thread = thread::spawn(move || {
            for signal in signals.forever() {
                debug!(signal, "cancelling run");
                ctx.cancel();
            }
        });
        Ok(Self {
            handle,
            thread: Some(thread),
        })
    }
}

impl Drop for CancelOnSignal {
    fn drop(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
