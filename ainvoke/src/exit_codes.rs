//! Stable exit codes for the `ainvoke` CLI.

/// The agent produced schema-valid output.
pub const OK: i32 = 0;
/// Any failure that has no child exit code of its own: schema gate, missing
/// output, spawn failure, timeout, bad flags.
pub const FAILURE: i32 = 1;

/// Exit code for a failed run: the child's own code when it has a positive
/// one, otherwise [`FAILURE`].
pub fn for_child(exit_code: Option<i32>) -> i32 {
    match exit_code {
        Some(code) if code > 0 => code,
        _ => FAILURE,
    }
}
