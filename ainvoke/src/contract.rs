//! The run-directory file contract: `input.json` in, `output.json` out.
//!
//! The run directory belongs to the caller. Nothing here creates it.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result, SchemaRole};
use crate::runner::Invocation;
use crate::schema;

/// Request payload written (or pre-supplied) for the agent.
pub const INPUT_FILE_NAME: &str = "input.json";
/// Response payload the agent is expected to write.
pub const OUTPUT_FILE_NAME: &str = "output.json";

#[cfg(unix)]
const INPUT_FILE_MODE: u32 = 0o644;

pub fn input_path(run_dir: &Path) -> PathBuf {
    run_dir.join(INPUT_FILE_NAME)
}

pub fn output_path(run_dir: &Path) -> PathBuf {
    run_dir.join(OUTPUT_FILE_NAME)
}

/// Materialize and validate `input.json` for `inv`.
///
/// With a structured input the value is encoded as compact JSON, validated,
/// then written over any existing file. Without one, the file already on
/// disk is read back and validated.
pub fn write_input(inv: &Invocation) -> Result<()> {
    fs::metadata(&inv.run_dir).map_err(|source| Error::RunDirMissing {
        path: inv.run_dir.clone(),
        source,
    })?;
    let path = input_path(&inv.run_dir);

    let Some(input) = &inv.input else {
        let data = fs::read(&path).map_err(|source| Error::InputMissing {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), bytes = data.len(), "validating pre-supplied input");
        return schema::validate(SchemaRole::Input, &inv.input_schema, &data);
    };

    let data = serde_json::to_vec(input).map_err(Error::EncodeInput)?;
    schema::validate(SchemaRole::Input, &inv.input_schema, &data)?;
    write_file(&path, &data)?;
    debug!(path = %path.display(), bytes = data.len(), "wrote input");
    Ok(())
}

/// Read `output.json` from `run_dir`.
///
/// Fails with [`Error::OutputMissing`] when the agent did not write it, so
/// absence stays distinguishable from a schema failure.
pub fn read_output(run_dir: &Path) -> Result<Vec<u8>> {
    let path = output_path(run_dir);
    fs::read(&path).map_err(|source| Error::OutputMissing { path, source })
}

#[cfg(unix)]
fn write_file(path: &Path, data: &[u8]) -> Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(INPUT_FILE_MODE)
        .open(path)
        .map_err(|err| Error::io(format!("write {}", path.display()), err))?;
    file.write_all(data)
        .map_err(|err| Error::io(format!("write {}", path.display()), err))
}

#[cfg(not(unix))]
fn write_file(path: &Path, data: &[u8]) -> Result<()> {
    fs::write(path, data).map_err(|err| Error::io(format!("write {}", path.display()), err))
}
