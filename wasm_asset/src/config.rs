use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::error::WasmAssetError;
use crate::loader::ModuleFormat;
use crate::pipeline::BuildStrategy;
use crate::wrapper::PatchMode;

pub const DEFAULT_PUBLIC_URL: &str = "/";
pub const DEFAULT_CACHE_DIR: &str = ".cache";
pub const DEFAULT_WASM_PACK_TARGET: &str = "bundler";

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WasmAssetConfig {
    pub public_url: Option<String>,
    pub cache_dir: Option<String>,
    pub strategy: Option<BuildStrategy>,
    pub module_format: Option<ModuleFormat>,
    pub wrapper_patch: Option<PatchMode>,
    pub wasm_pack_target: Option<String>,
    pub source_maps: Option<bool>,
}

impl WasmAssetConfig {
    /// Fields set in `overrides` win.
    pub fn merged_with(&self, overrides: &WasmAssetConfig) -> WasmAssetConfig {
        WasmAssetConfig {
            public_url: overrides.public_url.clone().or_else(|| self.public_url.clone()),
            cache_dir: overrides.cache_dir.clone().or_else(|| self.cache_dir.clone()),
            strategy: overrides.strategy.or(self.strategy),
            module_format: overrides.module_format.or(self.module_format),
            wrapper_patch: overrides.wrapper_patch.or(self.wrapper_patch),
            wasm_pack_target: overrides
                .wasm_pack_target
                .clone()
                .or_else(|| self.wasm_pack_target.clone()),
            source_maps: overrides.source_maps.or(self.source_maps),
        }
    }
}

/// Fully defaulted settings for one build session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSettings {
    pub public_url: String,
    pub cache_dir: PathBuf,
    pub strategy: BuildStrategy,
    pub module_format: ModuleFormat,
    pub wrapper_patch: PatchMode,
    pub wasm_pack_target: String,
    pub source_maps: bool,
}

impl BuildSettings {
    pub fn resolve(project_root: &Path, config: &WasmAssetConfig) -> Self {
        let cache_dir = config
            .cache_dir
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_CACHE_DIR);
        Self {
            public_url: config
                .public_url
                .clone()
                .unwrap_or_else(|| DEFAULT_PUBLIC_URL.to_string()),
            cache_dir: project_root.join(cache_dir),
            strategy: config.strategy.unwrap_or_default(),
            module_format: config.module_format.unwrap_or_default(),
            wrapper_patch: config.wrapper_patch.unwrap_or_default(),
            wasm_pack_target: config
                .wasm_pack_target
                .clone()
                .unwrap_or_else(|| DEFAULT_WASM_PACK_TARGET.to_string()),
            source_maps: config.source_maps.unwrap_or(false),
        }
    }
}

pub fn discover_config_path(project_root: &Path) -> Option<PathBuf> {
    let names = [
        "wasm-asset.toml",
        "wasm-asset.config.json",
        "wasm-asset.config.json5",
        "wasm-asset.config.yaml",
        "wasm-asset.config.yml",
        ".wasmassetrc.json",
    ];
    names
        .into_iter()
        .map(|name| project_root.join(name))
        .find(|p| p.exists())
}

pub fn load_config(project_root: &Path) -> Result<WasmAssetConfig, WasmAssetError> {
    if let Some(path) = discover_config_path(project_root) {
        return load_config_from_path(&path);
    }

    let cargo_toml_path = project_root.join("Cargo.toml");
    if cargo_toml_path.exists() {
        if let Some(config) =
            load_toml_config(&cargo_toml_path, TomlConfigSource::CargoPackageMetadata)?
        {
            return Ok(config);
        }
    }

    Ok(WasmAssetConfig::default())
}

pub fn load_config_from_path(path: &Path) -> Result<WasmAssetConfig, WasmAssetError> {
    let ext = path
        .extension()
        .and_then(|x| x.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "json" | "json5" => load_json_config(path),
        "yaml" | "yml" => load_yaml_config(path),
        "toml" => load_toml_config(path, TomlConfigSource::FullFile).map(|v| v.unwrap_or_default()),
        _ => Ok(WasmAssetConfig::default()),
    }
}

fn read_config_text(path: &Path) -> Result<String, WasmAssetError> {
    std::fs::read_to_string(path).map_err(|source| WasmAssetError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn load_json_config(path: &Path) -> Result<WasmAssetConfig, WasmAssetError> {
    let raw = read_config_text(path)?;
    json5::from_str::<WasmAssetConfig>(&raw)
        .or_else(|_| serde_json::from_str::<WasmAssetConfig>(&raw))
        .map_err(|err| WasmAssetError::ConfigParse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
}

fn load_yaml_config(path: &Path) -> Result<WasmAssetConfig, WasmAssetError> {
    let raw = read_config_text(path)?;
    serde_yaml::from_str::<WasmAssetConfig>(&raw).map_err(|err| WasmAssetError::ConfigParse {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TomlConfigSource {
    FullFile,
    CargoPackageMetadata,
}

fn load_toml_config(
    path: &Path,
    source: TomlConfigSource,
) -> Result<Option<WasmAssetConfig>, WasmAssetError> {
    let raw = read_config_text(path)?;

    let toml_value =
        toml::from_str::<toml::Value>(&raw).map_err(|err| WasmAssetError::ConfigParse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;

    let maybe_table_value = match source {
        TomlConfigSource::FullFile => Some(toml_value),
        TomlConfigSource::CargoPackageMetadata => extract_cargo_package_metadata(&toml_value),
    };

    let Some(table_value) = maybe_table_value else {
        return Ok(None);
    };

    let json_value =
        serde_json::to_value(table_value).map_err(|err| WasmAssetError::ConfigParse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
    let normalized = normalize_keys_to_camel_case(&json_value);

    serde_json::from_value::<WasmAssetConfig>(normalized)
        .map(Some)
        .map_err(|err| WasmAssetError::ConfigParse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
}

fn extract_cargo_package_metadata(value: &toml::Value) -> Option<toml::Value> {
    value
        .as_table()
        .and_then(|root| root.get("package"))
        .and_then(|package| package.as_table())
        .and_then(|package_table| package_table.get("metadata"))
        .and_then(|metadata| metadata.as_table())
        .and_then(|metadata_table| metadata_table.get("wasm-asset"))
        .cloned()
}

fn normalize_keys_to_camel_case(value: &JsonValue) -> JsonValue {
    match value {
        JsonValue::Object(object) => JsonValue::Object(
            object
                .iter()
                .map(|(key, value)| (normalize_key(key), normalize_keys_to_camel_case(value)))
                .collect(),
        ),
        JsonValue::Array(array) => {
            JsonValue::Array(array.iter().map(normalize_keys_to_camel_case).collect())
        }
        other => other.clone(),
    }
}

/// `public_url` and `public-url` both become `publicUrl`.
fn normalize_key(key: &str) -> String {
    if !key.contains(['_', '-']) {
        return key.to_string();
    }

    let mut segments = key.split(['_', '-']).filter(|segment| !segment.is_empty());
    let Some(first_segment) = segments.next() else {
        return key.to_string();
    };

    let mut normalized_key = String::from(first_segment);
    for segment in segments {
        let mut chars = segment.chars();
        let Some(first_char) = chars.next() else {
            continue;
        };
        normalized_key.push(first_char.to_ascii_uppercase());
        normalized_key.extend(chars);
    }
    normalized_key
}
