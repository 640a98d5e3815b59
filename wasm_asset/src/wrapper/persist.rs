use std::io::Write;
use std::path::{Path, PathBuf};

use sha1::{Digest, Sha1};
use tracing::debug;

use crate::error::WasmAssetError;
use crate::session::BuildSession;

pub const LOADER_DIR_NAME: &str = ".wasm-loaders";

/// Stable per-asset key: sha1 of the asset path as given.
pub fn asset_hash(asset_path: &Path) -> String {
    let digest = Sha1::digest(asset_path.to_string_lossy().as_bytes());
    hex::encode(digest)
}

/// The host registry keys loaders by type, one per extension, so every
/// binding-generated asset gets a type of its own.
pub fn type_tag(hash: &str) -> String {
    format!("wasm-{hash}")
}

pub fn loader_file_name(hash: &str) -> String {
    format!("wasm-loader-{hash}.js")
}

/// Writes to a temp file inside the loader directory, then renames it into
/// place. A failed write leaves no partial loader behind.
pub fn persist_loader(
    session: &BuildSession,
    hash: &str,
    content: &str,
) -> Result<PathBuf, WasmAssetError> {
    let dir = session.ensure_loader_dir()?;
    let target = dir.join(loader_file_name(hash));

    let mut temp = tempfile::Builder::new()
        .prefix(".wasm-loader-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|source| WasmAssetError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    temp.write_all(content.as_bytes())
        .and_then(|()| temp.flush())
        .map_err(|source| WasmAssetError::Io {
            path: temp.path().to_path_buf(),
            source,
        })?;
    temp.persist(&target).map_err(|err| WasmAssetError::Io {
        path: target.clone(),
        source: err.error,
    })?;

    debug!(loader = %target.display(), bytes = content.len(), "wrote wasm loader");
    Ok(target)
}
