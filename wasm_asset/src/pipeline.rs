//! One asset build, start to finish.
//!
//! Both strategies share the toolchain step and differ in what happens to its
//! output: `Direct` inlines a synthesized loader as the asset's code, while
//! `WithBindingGenerator` persists a patched wrapper and registers it as the
//! loader for a per-asset synthetic type.

use std::path::{Path, PathBuf};

use oxc_allocator::Allocator;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::BuildSettings;
use crate::error::WasmAssetError;
use crate::host::{AssetHost, LoaderPaths};
use crate::loader::{LoaderSpec, ModuleFormat, SynthesizedLoader, synthesize_loader};
use crate::package::ModulePackage;
use crate::rewrite::{ImportReference, RewrittenModule, rewrite_entry};
use crate::session::{BuildSession, WASM_BINDGEN, WASM_PACK};
use crate::tools::{BindingGenerator, ToolInstaller, Toolchain};
use crate::url::{relative_dependency, url_join};
use crate::wrapper::{asset_hash, patch_wrapper, persist_loader, render_bundle_loader, type_tag};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BuildStrategy {
    /// wasm-pack alone; the loader is inlined.
    #[default]
    Direct,
    /// cargo + wasm-bindgen `--no-modules`; the loader is registered.
    #[serde(alias = "bindgen")]
    WithBindingGenerator,
}

#[derive(Clone, Copy)]
pub struct BuildTools<'t> {
    pub toolchain: &'t dyn Toolchain,
    pub binding_generator: &'t dyn BindingGenerator,
    pub installer: &'t dyn ToolInstaller,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRequest {
    pub asset_path: PathBuf,
    pub crate_dir: PathBuf,
}

impl AssetRequest {
    pub fn for_asset(asset_path: &Path) -> Result<Self, WasmAssetError> {
        let crate_dir = find_crate_dir(asset_path).ok_or_else(|| WasmAssetError::Io {
            path: asset_path.to_path_buf(),
            source: std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no Cargo.toml in any parent directory",
            ),
        })?;
        Ok(Self {
            asset_path: asset_path.to_path_buf(),
            crate_dir,
        })
    }
}

pub fn find_crate_dir(asset_path: &Path) -> Option<PathBuf> {
    asset_path
        .ancestors()
        .find(|dir| dir.join("Cargo.toml").is_file())
        .map(Path::to_path_buf)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetOutput {
    /// Generated module source that replaces the asset's code, with its
    /// source map when `sourceMaps` is on.
    Inline {
        code: String,
        source_map: Option<String>,
    },
    /// The asset is the binary itself, emitted under `type_tag` and loaded by
    /// the registered loader.
    Registered {
        type_tag: String,
        loader_path: PathBuf,
        binary_path: PathBuf,
    },
}

pub fn build_asset(
    session: &BuildSession,
    tools: &BuildTools<'_>,
    host: &mut dyn AssetHost,
    request: &AssetRequest,
    settings: &BuildSettings,
) -> Result<AssetOutput, WasmAssetError> {
    info!(
        asset = %request.asset_path.display(),
        strategy = ?settings.strategy,
        "building wasm asset"
    );
    match settings.strategy {
        BuildStrategy::Direct => build_direct(session, tools, host, request, settings),
        BuildStrategy::WithBindingGenerator => {
            build_with_binding_generator(session, tools, host, request, settings)
        }
    }
}

fn build_direct(
    session: &BuildSession,
    tools: &BuildTools<'_>,
    host: &mut dyn AssetHost,
    request: &AssetRequest,
    settings: &BuildSettings,
) -> Result<AssetOutput, WasmAssetError> {
    session
        .install_state()
        .ensure_installed(WASM_PACK, tools.installer)?;
    let package_dir = tools.toolchain.build_package(&request.crate_dir)?;
    let package = ModulePackage::load(&package_dir)?;
    let source_text = read_text(&package.entry_path)?;

    let loader = transform_entry(
        &package.entry_path,
        &source_text,
        &package.package_name,
        settings.module_format,
        settings.source_maps,
        |import| {
            let binary = import
                .map(ImportReference::binary_specifier)
                .unwrap_or_else(|| package.default_binary_name());
            let dependency =
                relative_dependency(&request.asset_path, &package.package_dir.join(&binary));
            let fragment = host.register_binary_dependency(&dependency);
            url_join(host.public_url(), &fragment)
        },
    )?;
    Ok(AssetOutput::Inline {
        code: loader.code,
        source_map: loader.source_map,
    })
}

/// Rewrites one entry module and synthesizes its loader. `binary_url` turns
/// the captured import (if any) into the URL the loader fetches. With
/// `source_map` the result maps back to `entry_path`.
pub fn transform_entry(
    entry_path: &Path,
    source_text: &str,
    module_id: &str,
    format: ModuleFormat,
    source_map: bool,
    binary_url: impl FnOnce(Option<&ImportReference>) -> String,
) -> Result<SynthesizedLoader, WasmAssetError> {
    let allocator = Allocator::default();
    let RewrittenModule {
        program,
        exports,
        import,
    } = rewrite_entry(&allocator, source_text, entry_path)?;
    let binary_url = binary_url(import.as_ref());
    debug!(module_id, url = %binary_url, "synthesizing loader");

    let spec = LoaderSpec {
        module_id,
        binary_url: &binary_url,
        exports: &exports,
        format,
    };
    synthesize_loader(&allocator, &spec, program, source_map.then_some(entry_path))
}

fn build_with_binding_generator(
    session: &BuildSession,
    tools: &BuildTools<'_>,
    host: &mut dyn AssetHost,
    request: &AssetRequest,
    settings: &BuildSettings,
) -> Result<AssetOutput, WasmAssetError> {
    let wasm_path = tools.toolchain.build_binary(&request.crate_dir)?;
    session
        .install_state()
        .ensure_installed(WASM_BINDGEN, tools.installer)?;

    let out_dir = wasm_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| request.crate_dir.clone());
    let generated = tools.binding_generator.generate(&wasm_path, &out_dir)?;

    let wrapper_text = read_text(&generated.wrapper_path)?;
    let patched = patch_wrapper(&wrapper_text, &generated.wrapper_path, settings.wrapper_patch)?;
    let loader = render_bundle_loader(&patched, settings.module_format);

    let hash = asset_hash(&request.asset_path);
    let loader_path = persist_loader(session, &hash, &loader)?;
    let type_tag = type_tag(&hash);
    host.register_loader(&type_tag, LoaderPaths::same(loader_path.clone()));
    info!(type_tag = %type_tag, loader = %loader_path.display(), "registered wasm loader");

    Ok(AssetOutput::Registered {
        type_tag,
        loader_path,
        binary_path: generated.binary_path,
    })
}

fn read_text(path: &Path) -> Result<String, WasmAssetError> {
    std::fs::read_to_string(path).map_err(|source| WasmAssetError::Io {
        path: path.to_path_buf(),
        source,
    })
}
