//! Adapts wasm-bindgen's `--no-modules` wrapper to a loader that receives an
//! already fetched binary.

use std::path::Path;

use oxc_allocator::Allocator;
use oxc_ast_visit::Visit;
use serde::Deserialize;
use tracing::debug;

use crate::error::WasmAssetError;
use crate::loader::ModuleFormat;
use crate::parse::parse_script;

mod locate;
mod persist;

pub use persist::{LOADER_DIR_NAME, asset_hash, loader_file_name, persist_loader, type_tag};

/// Global the generator assigns its init function to.
pub const GLOBAL_BINDING_NAME: &str = "wasm_bindgen";

/// Local binding the patched wrapper assigns to instead.
pub const LOCAL_INIT_BINDING: &str = "initWasm";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapperSubstitution {
    /// `self.wasm_bindgen` -> `initWasm`
    GlobalBinding,
    /// Binaries are served under a custom extension, so the MIME type breaks
    /// `instantiateStreaming`; the detection is forced to `false`.
    StreamingDetection,
}

impl WrapperSubstitution {
    pub const ALL: [WrapperSubstitution; 2] = [
        WrapperSubstitution::GlobalBinding,
        WrapperSubstitution::StreamingDetection,
    ];

    pub fn label(self) -> &'static str {
        match self {
            WrapperSubstitution::GlobalBinding => "global-binding",
            WrapperSubstitution::StreamingDetection => "streaming-detection",
        }
    }

    fn replacement(self) -> &'static str {
        match self {
            WrapperSubstitution::GlobalBinding => LOCAL_INIT_BINDING,
            WrapperSubstitution::StreamingDetection => "false",
        }
    }

    fn literal_pattern(self) -> &'static str {
        match self {
            WrapperSubstitution::GlobalBinding => "self.wasm_bindgen",
            WrapperSubstitution::StreamingDetection => {
                "typeof WebAssembly.instantiateStreaming === 'function'"
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PatchMode {
    /// Locate the expressions in the parsed wrapper.
    #[default]
    Structural,
    /// Literal substring replacement. Only for wrappers the parser rejects;
    /// recognizes the `self.wasm_bindgen` spelling alone.
    Textual,
}

/// Applies both substitutions. Each must match exactly once.
pub fn patch_wrapper(
    source_text: &str,
    path: &Path,
    mode: PatchMode,
) -> Result<String, WasmAssetError> {
    let patched = match mode {
        PatchMode::Structural => patch_structural(source_text, path)?,
        PatchMode::Textual => patch_textual(source_text, path)?,
    };
    debug!(wrapper = %path.display(), ?mode, "patched binding wrapper");
    Ok(patched)
}

fn patch_structural(source_text: &str, path: &Path) -> Result<String, WasmAssetError> {
    let allocator = Allocator::default();
    let program = parse_script(&allocator, source_text, path)?;
    let mut sites = locate::SubstitutionSites::default();
    sites.visit_program(&program);

    let mut edits = Vec::with_capacity(WrapperSubstitution::ALL.len());
    for substitution in WrapperSubstitution::ALL {
        let [span] = sites.spans(substitution) else {
            return Err(patch_error(path, substitution, sites.spans(substitution).len()));
        };
        edits.push((span.start as usize, span.end as usize, substitution.replacement()));
    }
    edits.sort_by_key(|(start, _, _)| *start);

    let mut out = String::with_capacity(source_text.len());
    let mut cursor = 0usize;
    for (start, end, replacement) in edits {
        out.push_str(&source_text[cursor..start]);
        out.push_str(replacement);
        cursor = end;
    }
    out.push_str(&source_text[cursor..]);
    Ok(out)
}

fn patch_textual(source_text: &str, path: &Path) -> Result<String, WasmAssetError> {
    let mut out = source_text.to_string();
    for substitution in WrapperSubstitution::ALL {
        let pattern = substitution.literal_pattern();
        let matches = out.matches(pattern).count();
        if matches != 1 {
            return Err(patch_error(path, substitution, matches));
        }
        out = out.replacen(pattern, substitution.replacement(), 1);
    }
    Ok(out)
}

fn patch_error(path: &Path, substitution: WrapperSubstitution, matches: usize) -> WasmAssetError {
    WasmAssetError::Patch {
        path: path.to_path_buf(),
        substitution: substitution.label(),
        matches,
    }
}

/// Wraps a patched wrapper into a factory taking the fetched binary and
/// resolving to the assembled export object.
pub fn render_bundle_loader(patched: &str, format: ModuleFormat) -> String {
    let binding = format.default_binding();
    format!(
        r#"let {LOCAL_INIT_BINDING};

{patched}

{binding} function loadWASMBundle(bundle) {{
  return {LOCAL_INIT_BINDING}(bundle).then(() => Object.assign({{}}, {LOCAL_INIT_BINDING}));
}};
"#
    )
}
