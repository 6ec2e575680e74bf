//! Test-only helpers: scripted shell agents and ready-made invocations.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;

use crate::runner::Invocation;

/// Input schema of the hello agent: `{"name": string}`.
pub const HELLO_INPUT_SCHEMA: &str =
    r#"{"type":"object","properties":{"name":{"type":"string"}},"required":["name"]}"#;
/// Output schema of the hello agent: `{"result": string}`.
pub const HELLO_OUTPUT_SCHEMA: &str =
    r#"{"type":"object","properties":{"result":{"type":"string"}},"required":["result"]}"#;

/// Shell script that greets the `name` found in `input.json`.
pub const HELLO_SCRIPT: &str = r#"name=$(sed -n 's/.*"name":"\([^"]*\)".*/\1/p' input.json)
printf '{"result":"Hello, %s!"}' "$name" > output.json"#;

/// `/bin/sh -c <script>` as an argv.
pub fn sh(script: &str) -> Vec<String> {
    vec!["/bin/sh".to_string(), "-c".to_string(), script.to_string()]
}

pub fn hello_agent() -> Vec<String> {
    sh(HELLO_SCRIPT)
}

/// Invocation of the hello agent for `name` in `run_dir`.
pub fn hello_invocation(run_dir: &Path, name: &str) -> Invocation {
    Invocation {
        input: Some(json!({ "name": name })),
        input_schema: HELLO_INPUT_SCHEMA.to_string(),
        output_schema: HELLO_OUTPUT_SCHEMA.to_string(),
        ..Invocation::new(run_dir)
    }
}

/// Write a shell script named `name` into `dir`, to be run as `/bin/sh <path>`.
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("{body}\n")).expect("write script");
    path
}
