use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WasmAssetError {
    #[error("failed to install {tool}: {message}")]
    ToolInstall { tool: String, message: String },

    #[error("command failed ({status}): {command}\n{stderr}")]
    ToolFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("failed to spawn {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("unsupported module structure in {path}: {message}")]
    StructuralViolation { path: PathBuf, message: String },

    #[error("wrapper patch `{substitution}` matched {matches} times in {path} (expected exactly 1)")]
    Patch {
        path: PathBuf,
        substitution: &'static str,
        matches: usize,
    },

    #[error("invalid package descriptor at {path}: {message}")]
    Descriptor { path: PathBuf, message: String },

    #[error("failed to parse config at {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
