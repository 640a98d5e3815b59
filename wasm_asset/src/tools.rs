//! External collaborators: the native toolchain, the binding generator and
//! the installer for both. The process-backed implementations shell out the
//! way a developer would from the crate directory.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use duct::cmd as duct_cmd;
use serde::Deserialize;
use tracing::debug;
use which::which;

use crate::error::WasmAssetError;
use crate::session::ToolSpec;

pub const WASM_TARGET: &str = "wasm32-unknown-unknown";
pub const PACKAGE_DIR_NAME: &str = "pkg";

pub trait Toolchain {
    /// Builds a module package (descriptor, entry module, binary) and returns
    /// its directory.
    fn build_package(&self, crate_dir: &Path) -> Result<PathBuf, WasmAssetError>;

    /// Builds the raw binary and returns its path.
    fn build_binary(&self, crate_dir: &Path) -> Result<PathBuf, WasmAssetError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindgenOutput {
    pub wrapper_path: PathBuf,
    pub binary_path: PathBuf,
}

pub trait BindingGenerator {
    fn generate(&self, wasm_path: &Path, out_dir: &Path) -> Result<BindgenOutput, WasmAssetError>;
}

pub trait ToolInstaller {
    fn is_installed(&self, tool: ToolSpec) -> bool;
    fn install(&self, tool: ToolSpec) -> Result<(), WasmAssetError>;
}

#[derive(Debug, Clone)]
pub struct ProcessToolchain {
    wasm_pack_target: String,
}

impl ProcessToolchain {
    pub fn new(wasm_pack_target: impl Into<String>) -> Self {
        Self {
            wasm_pack_target: wasm_pack_target.into(),
        }
    }
}

impl Toolchain for ProcessToolchain {
    fn build_package(&self, crate_dir: &Path) -> Result<PathBuf, WasmAssetError> {
        run_tool(
            "wasm-pack",
            [
                "--verbose",
                "build",
                "--target",
                self.wasm_pack_target.as_str(),
                "--no-typescript",
            ],
            Some(crate_dir),
        )?;
        Ok(crate_dir.join(PACKAGE_DIR_NAME))
    }

    fn build_binary(&self, crate_dir: &Path) -> Result<PathBuf, WasmAssetError> {
        run_tool(
            "cargo",
            ["build", "--target", WASM_TARGET, "--release"],
            Some(crate_dir),
        )?;
        let target_dir = cargo_target_directory(crate_dir)?;
        let crate_name = cargo_package_name(crate_dir)?;
        let wasm_path = target_dir
            .join(WASM_TARGET)
            .join("release")
            .join(format!("{}.wasm", crate_name.replace('-', "_")));
        if !wasm_path.is_file() {
            return Err(WasmAssetError::Io {
                path: wasm_path,
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "cargo build finished without producing the expected binary",
                ),
            });
        }
        Ok(wasm_path)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessBindingGenerator;

impl BindingGenerator for ProcessBindingGenerator {
    fn generate(&self, wasm_path: &Path, out_dir: &Path) -> Result<BindgenOutput, WasmAssetError> {
        run_tool(
            "wasm-bindgen",
            [
                wasm_path.as_os_str().to_os_string(),
                OsString::from("--no-modules"),
                OsString::from("--out-dir"),
                out_dir.as_os_str().to_os_string(),
            ],
            Some(out_dir),
        )?;
        Ok(bindgen_output_paths(wasm_path, out_dir))
    }
}

/// wasm-bindgen writes `<stem>.js` and `<stem>_bg.wasm` into the out dir.
pub fn bindgen_output_paths(wasm_path: &Path, out_dir: &Path) -> BindgenOutput {
    let stem = wasm_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    BindgenOutput {
        wrapper_path: out_dir.join(format!("{stem}.js")),
        binary_path: out_dir.join(format!("{stem}_bg.wasm")),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessInstaller;

impl ToolInstaller for ProcessInstaller {
    fn is_installed(&self, tool: ToolSpec) -> bool {
        which(tool.binary).is_ok()
    }

    fn install(&self, tool: ToolSpec) -> Result<(), WasmAssetError> {
        run_tool("cargo", ["install", tool.install_crate], None)
            .map(|_| ())
            .map_err(|err| WasmAssetError::ToolInstall {
                tool: tool.binary.to_string(),
                message: err.to_string(),
            })
    }
}

fn run_tool<I, S>(
    program: &str,
    args: I,
    dir: Option<&Path>,
) -> Result<std::process::Output, WasmAssetError>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    let args = args.into_iter().map(Into::into).collect::<Vec<OsString>>();
    let display_command = std::iter::once(program.to_string())
        .chain(args.iter().map(|a| a.to_string_lossy().to_string()))
        .collect::<Vec<_>>()
        .join(" ");
    debug!(command = %display_command, dir = ?dir, "running tool");

    let mut expression = duct_cmd(program, &args)
        .stdout_capture()
        .stderr_capture()
        .unchecked();
    if let Some(dir) = dir {
        expression = expression.dir(dir);
    }
    let out = expression.run().map_err(|source| WasmAssetError::Spawn {
        command: display_command.clone(),
        source,
    })?;

    if !out.status.success() {
        let status = out
            .status
            .code()
            .map(|code| format!("exit code {code}"))
            .unwrap_or_else(|| "terminated by signal".to_string());
        return Err(WasmAssetError::ToolFailed {
            command: display_command,
            status,
            stderr: String::from_utf8_lossy(&out.stderr).trim_end().to_string(),
        });
    }
    Ok(out)
}

#[derive(Debug, Deserialize)]
struct CargoMetadata {
    target_directory: PathBuf,
}

fn cargo_target_directory(crate_dir: &Path) -> Result<PathBuf, WasmAssetError> {
    let out = run_tool(
        "cargo",
        ["metadata", "--format-version", "1", "--no-deps"],
        Some(crate_dir),
    )?;
    serde_json::from_slice::<CargoMetadata>(&out.stdout)
        .map(|metadata| metadata.target_directory)
        .map_err(|err| WasmAssetError::ToolFailed {
            command: "cargo metadata".to_string(),
            status: "unreadable output".to_string(),
            stderr: err.to_string(),
        })
}

pub fn cargo_package_name(crate_dir: &Path) -> Result<String, WasmAssetError> {
    let manifest_path = crate_dir.join("Cargo.toml");
    let raw = std::fs::read_to_string(&manifest_path).map_err(|source| WasmAssetError::Io {
        path: manifest_path.clone(),
        source,
    })?;
    let manifest =
        toml::from_str::<toml::Value>(&raw).map_err(|err| WasmAssetError::Descriptor {
            path: manifest_path.clone(),
            message: err.to_string(),
        })?;
    manifest
        .get("package")
        .and_then(|package| package.get("name"))
        .and_then(|name| name.as_str())
        .map(str::to_string)
        .ok_or_else(|| WasmAssetError::Descriptor {
            path: manifest_path,
            message: "missing [package] name".to_string(),
        })
}
