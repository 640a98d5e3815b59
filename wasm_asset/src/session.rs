use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use once_cell::sync::OnceCell;
use tracing::{debug, info};

use crate::error::WasmAssetError;
use crate::tools::ToolInstaller;
use crate::wrapper::LOADER_DIR_NAME;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolSpec {
    pub binary: &'static str,
    pub install_crate: &'static str,
}

pub const WASM_PACK: ToolSpec = ToolSpec {
    binary: "wasm-pack",
    install_crate: "wasm-pack",
};

pub const WASM_BINDGEN: ToolSpec = ToolSpec {
    binary: "wasm-bindgen",
    install_crate: "wasm-bindgen-cli",
};

/// Tools confirmed present during this session.
///
/// Only successful checks and installs are remembered; a failed install is
/// attempted again by the next asset that needs the tool.
#[derive(Debug, Default)]
pub struct InstallState {
    confirmed: Mutex<BTreeSet<&'static str>>,
}

impl InstallState {
    pub fn ensure_installed(
        &self,
        tool: ToolSpec,
        installer: &dyn ToolInstaller,
    ) -> Result<(), WasmAssetError> {
        let mut confirmed = self
            .confirmed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if confirmed.contains(tool.binary) {
            return Ok(());
        }
        if installer.is_installed(tool) {
            debug!(tool = tool.binary, "tool present");
        } else {
            info!(tool = tool.binary, krate = tool.install_crate, "installing missing tool");
            installer.install(tool)?;
        }
        confirmed.insert(tool.binary);
        Ok(())
    }

    pub fn is_confirmed(&self, tool: ToolSpec) -> bool {
        self.confirmed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(tool.binary)
    }
}

/// State shared by every asset built in one bundler session.
#[derive(Debug)]
pub struct BuildSession {
    cache_dir: PathBuf,
    install_state: InstallState,
    loader_dir: OnceCell<PathBuf>,
}

impl BuildSession {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            install_state: InstallState::default(),
            loader_dir: OnceCell::new(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn install_state(&self) -> &InstallState {
        &self.install_state
    }

    /// `<cache_dir>/.wasm-loaders`, created on first use.
    pub fn ensure_loader_dir(&self) -> Result<&Path, WasmAssetError> {
        self.loader_dir
            .get_or_try_init(|| {
                let dir = self.cache_dir.join(LOADER_DIR_NAME);
                std::fs::create_dir_all(&dir).map_err(|source| WasmAssetError::Io {
                    path: dir.clone(),
                    source,
                })?;
                debug!(dir = %dir.display(), "created loader directory");
                Ok(dir)
            })
            .map(PathBuf::as_path)
    }
}
