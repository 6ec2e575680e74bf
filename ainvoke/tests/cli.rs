//! CLI tests for the `ainvoke` binary.
//!
//! Spawns the binary against scripted agents and checks stdout, stderr and
//! exit codes. Agent scripts are passed to `/bin/sh` and are never executed
//! directly.

use std::fs;
use std::process::{Command, Output};

use ainvoke::exit_codes;
use ainvoke::test_support::{
    HELLO_INPUT_SCHEMA, HELLO_OUTPUT_SCHEMA, HELLO_SCRIPT, write_script,
};
use serde_json::{Value, json};

fn ainvoke(dir: &std::path::Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_ainvoke"))
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .expect("run ainvoke")
}

#[test]
fn exec_prints_validated_output() {
    let temp = tempfile::tempdir().expect("tempdir");
    let agent = write_script(temp.path(), "hello.sh", HELLO_SCRIPT);
    let agent = agent.to_str().expect("utf-8 path");

    let out = ainvoke(
        temp.path(),
        &[
            "exec",
            "--tty=false",
            "--input-schema",
            HELLO_INPUT_SCHEMA,
            "--output-schema",
            HELLO_OUTPUT_SCHEMA,
            "--input",
            r#"{"name":"Ada"}"#,
            "/bin/sh",
            agent,
        ],
    );

    assert_eq!(out.status.code(), Some(exit_codes::OK));
    let printed: Value = serde_json::from_slice(&out.stdout).expect("stdout json");
    assert_eq!(printed, json!({"result": "Hello, Ada!"}));
}

#[test]
fn exec_default_schemas_on_pty() {
    let temp = tempfile::tempdir().expect("tempdir");
    let agent = write_script(
        temp.path(),
        "echo.sh",
        r#"printf '{"output":"pong"}' > output.json"#,
    );
    let agent = agent.to_str().expect("utf-8 path");

    let out = ainvoke(
        temp.path(),
        &["exec", "--input", r#"{"input":"ping"}"#, "/bin/sh", agent],
    );

    assert_eq!(out.status.code(), Some(exit_codes::OK));
    assert_eq!(out.stdout, br#"{"output":"pong"}"#);
    let input = fs::read_to_string(temp.path().join("input.json")).expect("input");
    assert_eq!(input, r#"{"input":"ping"}"#);
}

#[test]
fn failing_agent_exit_code_and_stderr_are_propagated() {
    let temp = tempfile::tempdir().expect("tempdir");
    let agent = write_script(temp.path(), "fail.sh", "echo 'model overloaded' >&2; exit 42");
    let agent = agent.to_str().expect("utf-8 path");

    let out = ainvoke(
        temp.path(),
        &[
            "exec",
            "--tty=false",
            "--input",
            r#"{"input":"x"}"#,
            "/bin/sh",
            agent,
        ],
    );

    assert_eq!(out.status.code(), Some(42));
    assert!(out.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.starts_with("model overloaded\n"), "stderr: {stderr}");
    assert!(stderr.contains("exit code 42"), "stderr: {stderr}");
    assert!(!stderr.contains("WARN"), "stderr: {stderr}");
}

#[test]
fn stdout_is_echoed_when_stderr_is_empty() {
    let temp = tempfile::tempdir().expect("tempdir");
    let agent = write_script(temp.path(), "quiet.sh", "echo 'forgot the file'");
    let agent = agent.to_str().expect("utf-8 path");

    let out = ainvoke(
        temp.path(),
        &[
            "exec",
            "--tty=false",
            "--input",
            r#"{"input":"x"}"#,
            "/bin/sh",
            agent,
        ],
    );

    assert_eq!(out.status.code(), Some(exit_codes::FAILURE));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.starts_with("forgot the file\n"), "stderr: {stderr}");
    assert!(stderr.contains("output file missing"), "stderr: {stderr}");
}

#[test]
fn schema_flag_and_file_are_mutually_exclusive() {
    let temp = tempfile::tempdir().expect("tempdir");
    let out = ainvoke(
        temp.path(),
        &[
            "exec",
            "--input-schema",
            "{}",
            "--input-schema-file",
            "schema.json",
            "true",
        ],
    );
    assert_ne!(out.status.code(), Some(exit_codes::OK));
}

#[test]
fn timeout_terminates_agent() {
    let temp = tempfile::tempdir().expect("tempdir");
    let agent = write_script(temp.path(), "slow.sh", "sleep 30");
    let agent = agent.to_str().expect("utf-8 path");

    let started = std::time::Instant::now();
    let out = ainvoke(
        temp.path(),
        &[
            "exec",
            "--tty=false",
            "--timeout",
            "1",
            "--input",
            r#"{"input":"x"}"#,
            "/bin/sh",
            agent,
        ],
    );

    assert!(started.elapsed() < std::time::Duration::from_secs(15));
    assert_eq!(out.status.code(), Some(exit_codes::FAILURE));
    assert!(String::from_utf8_lossy(&out.stderr).contains("deadline exceeded"));
}

#[test]
fn run_uses_toml_config() {
    let temp = tempfile::tempdir().expect("tempdir");
    let run_dir = temp.path().join("run");
    fs::create_dir(&run_dir).expect("run dir");
    let agent = write_script(
        temp.path(),
        "reply.sh",
        r#"printf '{"output":"configured"}' > output.json"#,
    );
    let config = format!(
        "cmd = [\"/bin/sh\", {agent:?}]\nsystem_prompt = \"be brief\"\nrun_dir = {run_dir:?}\n",
        agent = agent.display().to_string(),
        run_dir = run_dir.display().to_string(),
    );
    fs::write(temp.path().join("agent.toml"), config).expect("config");

    let out = ainvoke(
        temp.path(),
        &["run", "--config", "agent.toml", "--input", r#"{"input":"hi"}"#],
    );

    assert_eq!(
        out.status.code(),
        Some(exit_codes::OK),
        "stderr: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    assert_eq!(out.stdout, br#"{"output":"configured"}"#);
    assert!(run_dir.join("input.json").exists());
}

#[test]
fn quickstart_prints_examples() {
    let temp = tempfile::tempdir().expect("tempdir");
    let out = ainvoke(temp.path(), &["quickstart"]);
    assert_eq!(out.status.code(), Some(exit_codes::OK));
    assert!(String::from_utf8_lossy(&out.stdout).contains("ainvoke codex"));
}
