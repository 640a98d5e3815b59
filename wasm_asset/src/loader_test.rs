use std::path::Path;

use oxc_allocator::Allocator;
use oxc_ast::ast::{BindingPatternKind, Declaration, Statement};

use crate::error::WasmAssetError;
use crate::loader::{LoaderSpec, ModuleFormat, PRELUDE_BINDINGS, SynthesizedLoader, render_prelude};
use crate::parse::parse_module;
use crate::pipeline::transform_entry;
use crate::rewrite::{ExportDescriptor, ImportReference};

const HELLO_ENTRY: &str = r#"import * as wasm from './hello_bg';

export function add(a, b) {
    return wasm.add(a, b);
}
"#;

fn transform(source_text: &str, format: ModuleFormat) -> Result<String, WasmAssetError> {
    transform_with_map(source_text, format, false).map(|loader| loader.code)
}

fn transform_with_map(
    source_text: &str,
    format: ModuleFormat,
    source_map: bool,
) -> Result<SynthesizedLoader, WasmAssetError> {
    transform_entry(
        Path::new("pkg/hello.js"),
        source_text,
        "hello",
        format,
        source_map,
        |import| {
            format!(
                "/dist/{}",
                import
                    .map(ImportReference::binary_specifier)
                    .unwrap_or_else(|| "fallback.wasm".to_string())
                    .trim_start_matches("./")
            )
        },
    )
}

fn top_level_names(code: &str) -> Vec<String> {
    let allocator = Allocator::default();
    let program = parse_module(&allocator, code, Path::new("loader.js")).unwrap();
    program
        .body
        .iter()
        .filter_map(|statement| match statement {
            Statement::VariableDeclaration(var) => match &var.declarations[0].id.kind {
                BindingPatternKind::BindingIdentifier(ident) => Some(ident.name.to_string()),
                _ => None,
            },
            Statement::FunctionDeclaration(function) => {
                function.id.as_ref().map(|id| id.name.to_string())
            }
            Statement::ExportDefaultDeclaration(_) => Some("<export default>".to_string()),
            Statement::ExpressionStatement(_) => Some("<expression>".to_string()),
            Statement::ImportDeclaration(_) => Some("<import>".to_string()),
            Statement::ExportNamedDeclaration(export) => match &export.declaration {
                Some(Declaration::FunctionDeclaration(_)) => Some("<export fn>".to_string()),
                _ => Some("<export>".to_string()),
            },
            _ => None,
        })
        .collect()
}

#[test]
fn prelude_embeds_id_url_and_export_table() {
    let exports = ExportDescriptor::from_names(["add", "sub"]);
    let prelude = render_prelude(&LoaderSpec {
        module_id: "hello",
        binary_url: "/dist/hello_bg.wasm",
        exports: &exports,
        format: ModuleFormat::Esm,
    });

    assert!(prelude.contains(r#"const __wasmId = "hello";"#), "{prelude}");
    assert!(prelude.contains(r#"const __wasmURL = "/dist/hello_bg.wasm";"#), "{prelude}");
    assert!(prelude.contains(r#"const __exports = { "add": add, "sub": sub };"#), "{prelude}");
    assert!(prelude.contains(r#"["./" + __wasmId]: __exports"#), "{prelude}");
    assert!(prelude.contains("export default __importWasm("), "{prelude}");
}

#[test]
fn prelude_with_no_exports_uses_empty_object() {
    let exports = ExportDescriptor::default();
    let prelude = render_prelude(&LoaderSpec {
        module_id: "empty",
        binary_url: "/e.wasm",
        exports: &exports,
        format: ModuleFormat::CommonJs,
    });

    assert!(prelude.contains("const __exports = {};"), "{prelude}");
    assert!(prelude.contains("module.exports = __importWasm("), "{prelude}");
    assert!(!prelude.contains("export default"), "{prelude}");
}

#[test]
fn prelude_escapes_ids_and_urls() {
    let exports = ExportDescriptor::default();
    let prelude = render_prelude(&LoaderSpec {
        module_id: r#"we"ird"#,
        binary_url: "/a b\\c.wasm",
        exports: &exports,
        format: ModuleFormat::Esm,
    });

    assert!(prelude.contains(r#"const __wasmId = "we\"ird";"#), "{prelude}");
    assert!(prelude.contains(r#"const __wasmURL = "/a b\\c.wasm";"#), "{prelude}");
    let allocator = Allocator::default();
    assert!(parse_module(&allocator, &prelude, Path::new("prelude.js")).is_ok());
}

#[test]
fn loader_places_prelude_before_rewritten_body() {
    let code = transform(HELLO_ENTRY, ModuleFormat::Esm).unwrap();

    assert_eq!(
        top_level_names(&code),
        vec![
            "__wasmId",
            "__wasmURL",
            "__exports",
            "__wasmInstanceExports",
            "<export default>",
            "__importWasm",
            "add",
        ]
    );
}

#[test]
fn loader_fetches_url_derived_from_import() {
    let code = transform(HELLO_ENTRY, ModuleFormat::Esm).unwrap();

    assert!(code.contains("/dist/hello_bg.wasm"), "{code}");
    assert!(code.contains("__wasmInstanceExports.add(a, b)"), "{code}");
    assert!(code.contains("instantiateStreaming"), "{code}");
    assert!(code.contains("arrayBuffer"), "{code}");
}

#[test]
fn loader_without_import_uses_fallback_binary() {
    let code = transform("export const answer = 42;\n", ModuleFormat::Esm).unwrap();

    assert!(code.contains("/dist/fallback.wasm"), "{code}");
    assert_eq!(
        top_level_names(&code).last().map(String::as_str),
        Some("answer")
    );
}

#[test]
fn commonjs_loader_has_no_module_syntax() {
    let code = transform(HELLO_ENTRY, ModuleFormat::CommonJs).unwrap();
    let names = top_level_names(&code);

    assert!(code.contains("module.exports"), "{code}");
    assert!(!names.iter().any(|name| name.starts_with("<export")), "{names:?}");
    assert!(!names.iter().any(|name| name == "<import>"), "{names:?}");
}

#[test]
fn loader_propagates_structural_violations() {
    let err = transform("export * from './x';\n", ModuleFormat::Esm).unwrap_err();
    assert!(
        matches!(err, WasmAssetError::StructuralViolation { .. }),
        "{err:?}"
    );
}

#[test]
fn export_before_import_yields_plain_function_and_derived_url() {
    let code = transform(
        "export function add(a,b){return a+b} import x from './m'",
        ModuleFormat::Esm,
    )
    .unwrap();

    assert!(code.contains("/dist/m.wasm"), "{code}");
    assert!(code.contains(r#""add": add"#), "{code}");
    let names = top_level_names(&code);
    assert_eq!(names.last().map(String::as_str), Some("add"));
    assert!(!names.iter().any(|name| name == "<import>" || name == "<export fn>"));
}

#[test]
fn prelude_declares_every_reserved_binding() {
    let exports = ExportDescriptor::default();
    let prelude = render_prelude(&LoaderSpec {
        module_id: "hello",
        binary_url: "/hello.wasm",
        exports: &exports,
        format: ModuleFormat::Esm,
    });
    let names = top_level_names(&prelude);

    for binding in PRELUDE_BINDINGS {
        assert!(names.iter().any(|name| name == binding), "{binding} in {names:?}");
    }
}

#[test]
fn loader_refuses_entry_declaring_placeholder_name() {
    let err = transform(
        "import x from './m';\nexport function wasm() { return 1; }\n",
        ModuleFormat::Esm,
    )
    .unwrap_err();
    assert!(
        matches!(err, WasmAssetError::StructuralViolation { .. }),
        "{err:?}"
    );
}

#[test]
fn source_map_is_absent_unless_requested() {
    let loader = transform_with_map(HELLO_ENTRY, ModuleFormat::Esm, false).unwrap();
    assert_eq!(loader.source_map, None);
}

#[test]
fn source_map_points_body_back_at_entry() {
    let loader = transform_with_map(HELLO_ENTRY, ModuleFormat::Esm, true).unwrap();
    let map: serde_json::Value =
        serde_json::from_str(loader.source_map.as_deref().unwrap()).unwrap();

    assert_eq!(map["version"], 3);
    assert_eq!(map["sources"], serde_json::json!(["pkg/hello.js"]));
    assert_eq!(map["sourcesContent"], serde_json::json!([HELLO_ENTRY]));
    let mappings = map["mappings"].as_str().unwrap();
    assert!(!mappings.is_empty());

    // Prelude lines carry no segments; the first mapped line is the body.
    let first_mapped = mappings.split(';').position(|line| !line.is_empty()).unwrap();
    let add_line = loader
        .code
        .lines()
        .position(|line| line.starts_with("function add("))
        .unwrap();
    assert_eq!(first_mapped, add_line, "{}", loader.code);
}

#[test]
fn source_map_does_not_change_code() {
    let plain = transform_with_map(HELLO_ENTRY, ModuleFormat::Esm, false).unwrap();
    let mapped = transform_with_map(HELLO_ENTRY, ModuleFormat::Esm, true).unwrap();
    similar_asserts::assert_eq!(plain.code, mapped.code);
}
