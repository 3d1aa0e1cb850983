//! Filesystem and process utilities: small helpers the CLI bootstrap and
//! `gen_sh`-adjacent tooling lean on.

pub mod shell;

use crate::errors::FsError;

/// Reads a file's contents as a `String`, tagging the path on failure.
pub fn read_file(path: &std::path::Path) -> Result<String, FsError> {
    std::fs::read_to_string(path).map_err(|e| FsError::ReadFromFile(path.to_path_buf(), e))
}

/// Creates `dir` and all missing parent components.
pub fn create_dir_all(dir: &std::path::Path) -> Result<(), FsError> {
    std::fs::create_dir_all(dir).map_err(|e| FsError::CreateDirectory(dir.to_path_buf(), e))
}
