use std::path::Path;

use oxc_allocator::Allocator;
use oxc_ast::ast::Program;
use oxc_ast_visit::VisitMut;
use oxc_codegen::{Codegen, CodegenOptions};
use oxc_span::{SPAN, Span};
use serde::Deserialize;

use crate::error::WasmAssetError;
use crate::parse::parse_module;
use crate::rewrite::{ExportDescriptor, INSTANCE_EXPORTS_ALIAS};

const PRELUDE_PATH: &str = "<wasm loader prelude>";

/// Top-level bindings [`render_prelude`] declares besides the instance alias.
pub const PRELUDE_BINDINGS: [&str; 4] = ["__wasmId", "__wasmURL", "__exports", "__importWasm"];

/// How the generated module publishes its default export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ModuleFormat {
    #[default]
    Esm,
    #[serde(alias = "commonjs", alias = "cjs")]
    CommonJs,
}

impl ModuleFormat {
    pub(crate) fn default_binding(self) -> &'static str {
        match self {
            ModuleFormat::Esm => "export default",
            ModuleFormat::CommonJs => "module.exports =",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LoaderSpec<'s> {
    pub module_id: &'s str,
    pub binary_url: &'s str,
    pub exports: &'s ExportDescriptor,
    pub format: ModuleFormat,
}

/// Declarations placed ahead of the rewritten body.
///
/// The default export settles only after the binary is fetched and
/// instantiated; until then the alias is `undefined`, so body code that touches
/// it during module evaluation sees no instance.
pub fn render_prelude(spec: &LoaderSpec<'_>) -> String {
    let module_id = js_string_literal(spec.module_id);
    let binary_url = js_string_literal(spec.binary_url);
    let exports = render_export_object(spec.exports);
    let default_binding = spec.format.default_binding();
    format!(
        r#"const __wasmId = {module_id};
const __wasmURL = {binary_url};
const __exports = {exports};

let {INSTANCE_EXPORTS_ALIAS};

{default_binding} __importWasm(__wasmURL, {{ ["./" + __wasmId]: __exports }}).then(function (wasmModule) {{
  {INSTANCE_EXPORTS_ALIAS} = wasmModule.instance.exports;
  return __exports;
}});

function __importWasm(url, importObject) {{
  return fetch(url).then(function (res) {{
    if (WebAssembly.instantiateStreaming) {{
      return WebAssembly.instantiateStreaming(res, importObject);
    }}
    return res.arrayBuffer().then(function (data) {{
      return WebAssembly.instantiate(data, importObject);
    }});
  }});
}}
"#
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedLoader {
    pub code: String,
    /// JSON source map back to the entry module, when one was requested.
    pub source_map: Option<String>,
}

/// Emits the final module: prelude declarations followed by the rewritten
/// entry body.
///
/// The prelude is spliced into `program` with its spans cleared, so with
/// `source_map_path` set only the entry's own statements get mappings.
pub fn synthesize_loader<'a>(
    allocator: &'a Allocator,
    spec: &LoaderSpec<'_>,
    mut program: Program<'a>,
    source_map_path: Option<&Path>,
) -> Result<SynthesizedLoader, WasmAssetError> {
    let prelude_text = allocator.alloc_str(&render_prelude(spec));
    let mut prelude = parse_module(allocator, prelude_text, Path::new(PRELUDE_PATH))?;
    SpanEraser.visit_program(&mut prelude);

    let body = std::mem::replace(&mut program.body, oxc_allocator::Vec::new_in(allocator));
    for statement in prelude.body {
        program.body.push(statement);
    }
    for statement in body {
        program.body.push(statement);
    }

    let options = CodegenOptions {
        source_map_path: source_map_path.map(Path::to_path_buf),
        ..CodegenOptions::default()
    };
    let printed = Codegen::new().with_options(options).build(&program);
    Ok(SynthesizedLoader {
        code: printed.code,
        source_map: printed.map.map(|map| map.to_json_string()),
    })
}

/// Prelude nodes point into a throwaway string, not the entry source.
struct SpanEraser;

impl<'a> VisitMut<'a> for SpanEraser {
    fn visit_span(&mut self, it: &mut Span) {
        *it = SPAN;
    }
}

fn render_export_object(exports: &ExportDescriptor) -> String {
    if exports.is_empty() {
        return "{}".to_string();
    }
    let entries = exports
        .names()
        .map(|name| format!("{}: {name}", js_string_literal(name)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{{ {entries} }}")
}

fn js_string_literal(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}
