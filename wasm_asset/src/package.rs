use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::WasmAssetError;

pub const DESCRIPTOR_FILE: &str = "package.json";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageDescriptor {
    pub name: Option<String>,
    pub main: Option<String>,
    pub module: Option<String>,
    /// Either a path or a remapping object; only the path form names an entry.
    pub browser: Option<serde_json::Value>,
}

impl PackageDescriptor {
    pub fn from_json(raw: &str, path: &Path) -> Result<Self, WasmAssetError> {
        serde_json::from_str::<Self>(raw).map_err(|err| WasmAssetError::Descriptor {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
    }

    pub fn entry_relative_path(&self) -> Option<&str> {
        let browser = self.browser.as_ref().and_then(|value| value.as_str());
        [self.main.as_deref(), self.module.as_deref(), browser]
            .into_iter()
            .flatten()
            .find(|entry| !entry.trim().is_empty())
    }
}

/// A toolchain-emitted package directory: binary, thin entry module, descriptor.
#[derive(Debug, Clone)]
pub struct ModulePackage {
    pub package_dir: PathBuf,
    pub entry_path: PathBuf,
    pub package_name: String,
    pub descriptor: PackageDescriptor,
}

impl ModulePackage {
    pub fn load(package_dir: &Path) -> Result<Self, WasmAssetError> {
        let descriptor_path = package_dir.join(DESCRIPTOR_FILE);
        let raw = std::fs::read_to_string(&descriptor_path).map_err(|source| {
            WasmAssetError::Io {
                path: descriptor_path.clone(),
                source,
            }
        })?;
        let descriptor = PackageDescriptor::from_json(&raw, &descriptor_path)?;
        Self::from_descriptor(package_dir, descriptor, &descriptor_path)
    }

    pub fn from_descriptor(
        package_dir: &Path,
        descriptor: PackageDescriptor,
        descriptor_path: &Path,
    ) -> Result<Self, WasmAssetError> {
        let Some(entry) = descriptor.entry_relative_path() else {
            return Err(WasmAssetError::Descriptor {
                path: descriptor_path.to_path_buf(),
                message: "none of `main`, `module`, `browser` names an entry file".to_string(),
            });
        };
        let entry_path = package_dir.join(entry);
        let package_name = descriptor
            .name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| WasmAssetError::Descriptor {
                path: descriptor_path.to_path_buf(),
                message: "missing `name`".to_string(),
            })?;
        Ok(Self {
            package_dir: package_dir.to_path_buf(),
            entry_path,
            package_name,
            descriptor,
        })
    }

    /// wasm-pack names the binary after the crate with `-` folded to `_`.
    pub fn default_binary_name(&self) -> String {
        let base = self
            .package_name
            .rsplit('/')
            .next()
            .unwrap_or(&self.package_name);
        format!("{}_bg.wasm", base.replace('-', "_"))
    }
}
