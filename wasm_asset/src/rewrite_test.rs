use std::path::Path;

use oxc_allocator::Allocator;
use oxc_ast::ast::Statement;
use oxc_codegen::Codegen;

use crate::error::WasmAssetError;
use crate::parse::parse_module;
use crate::rewrite::{
    ExportDescriptor, ImportReference, inspect_module_shape, rename_placeholder, rewrite_entry,
};

const ENTRY: &str = "pkg/hello.js";

const HELLO_ENTRY: &str = r#"import * as wasm from './hello_bg';

export function add(a, b) {
    return wasm.add(a, b);
}

export const greeting = "hi";
"#;

fn rewrite_err(source_text: &str) -> WasmAssetError {
    let allocator = Allocator::default();
    match rewrite_entry(&allocator, source_text, Path::new(ENTRY)) {
        Ok(module) => panic!("expected an error, got exports {:?}", module.exports),
        Err(err) => err,
    }
}

fn assert_violation(source_text: &str, needle: &str) {
    match rewrite_err(source_text) {
        WasmAssetError::StructuralViolation { path, message } => {
            assert_eq!(path, Path::new(ENTRY));
            assert!(message.contains(needle), "message was: {message}");
        }
        other => panic!("expected a structural violation, got {other:?}"),
    }
}

#[test]
fn rewrite_captures_exports_and_import_in_source_order() {
    let allocator = Allocator::default();
    let module = rewrite_entry(&allocator, HELLO_ENTRY, Path::new(ENTRY)).unwrap();

    assert_eq!(module.exports, ExportDescriptor::from_names(["add", "greeting"]));
    assert_eq!(module.import, Some(ImportReference::new("./hello_bg")));
    assert_eq!(
        module.import.as_ref().map(ImportReference::binary_specifier),
        Some("./hello_bg.wasm".to_string())
    );
}

#[test]
fn rewrite_leaves_plain_declarations_and_no_module_syntax() {
    let allocator = Allocator::default();
    let module = rewrite_entry(&allocator, HELLO_ENTRY, Path::new(ENTRY)).unwrap();

    assert_eq!(module.program.body.len(), 2);
    assert!(matches!(
        module.program.body[0],
        Statement::FunctionDeclaration(_)
    ));
    assert!(matches!(
        module.program.body[1],
        Statement::VariableDeclaration(_)
    ));

    let code = Codegen::new().build(&module.program).code;
    assert!(!code.contains("import"), "{code}");
    assert!(!code.contains("export"), "{code}");
    assert!(code.contains("__wasmInstanceExports.add"), "{code}");
    assert!(!code.contains("wasm.add"), "{code}");
}

#[test]
fn rewrite_keeps_property_names_called_wasm() {
    let source_text = r#"import * as wasm from './m';
export function memory(holder) {
    return holder.wasm === wasm.memory;
}
"#;
    let allocator = Allocator::default();
    let module = rewrite_entry(&allocator, source_text, Path::new(ENTRY)).unwrap();
    let code = Codegen::new().build(&module.program).code;

    assert!(code.contains("holder.wasm"), "{code}");
    assert!(code.contains("__wasmInstanceExports.memory"), "{code}");
}

#[test]
fn rewrite_accepts_module_without_exports_or_import() {
    let allocator = Allocator::default();
    let module = rewrite_entry(&allocator, "const unused = 1;\n", Path::new(ENTRY)).unwrap();

    assert!(module.exports.is_empty());
    assert_eq!(module.import, None);
    assert_eq!(module.program.body.len(), 1);
}

#[test]
fn rewrite_unwraps_named_default_function() {
    let source_text = "export default function init() { return 1; }\n";
    let allocator = Allocator::default();
    let module = rewrite_entry(&allocator, source_text, Path::new(ENTRY)).unwrap();

    assert_eq!(module.exports, ExportDescriptor::from_names(["init"]));
    assert!(matches!(
        module.program.body[0],
        Statement::FunctionDeclaration(_)
    ));
}

#[test]
fn rewrite_rejects_second_import() {
    assert_violation(
        "import * as wasm from './a';\nimport b from './b';\n",
        "more than one import",
    );
}

#[test]
fn rewrite_rejects_export_list() {
    assert_violation("const a = 1;\nexport { a };\n", "export { ... }");
}

#[test]
fn rewrite_rejects_reexports() {
    assert_violation("export { a } from './other';\n", "re-export");
    assert_violation("export * from './other';\n", "export *");
}

#[test]
fn rewrite_rejects_unnamed_default_exports() {
    assert_violation("export default function () {}\n", "anonymous");
    assert_violation("export default 42;\n", "expression");
}

#[test]
fn rewrite_rejects_destructured_exports() {
    assert_violation("export const { a } = globalThis;\n", "destructuring");
}

#[test]
fn rewrite_rejects_duplicate_export_names() {
    let err = rewrite_err("export function a() {}\nexport default function a() {}\n");
    assert!(
        matches!(
            err,
            WasmAssetError::StructuralViolation { .. } | WasmAssetError::Parse { .. }
        ),
        "{err:?}"
    );
}

#[test]
fn rewrite_rejects_exported_placeholder_name() {
    assert_violation(
        "import x from './m';\nexport function wasm() { return 1; }\n",
        "`wasm` collides",
    );
    assert_violation("export default class wasm {}\n", "`wasm` collides");
}

#[test]
fn rewrite_rejects_top_level_placeholder_declarations() {
    assert_violation("let wasm = 1;\nexport const a = wasm;\n", "`wasm` collides");
    assert_violation("var [first, wasm] = [];\n", "`wasm` collides");
    assert_violation("function wasm() {}\n", "`wasm` collides");
    assert_violation("class wasm {}\n", "`wasm` collides");
}

#[test]
fn rewrite_rejects_names_the_loader_declares() {
    assert_violation(
        "export const __wasmInstanceExports = {};\n",
        "`__wasmInstanceExports` collides",
    );
    assert_violation("const __wasmURL = '/x.wasm';\n", "`__wasmURL` collides");
    assert_violation("export function __importWasm() {}\n", "`__importWasm` collides");
}

#[test]
fn rewrite_allows_placeholder_in_nested_scopes_and_import() {
    let allocator = Allocator::default();
    let module = rewrite_entry(
        &allocator,
        "import wasm from './hello_bg';\nexport function f() { let wasm = 2; return wasm; }\n",
        Path::new(ENTRY),
    )
    .unwrap();

    assert_eq!(module.exports, ExportDescriptor::from_names(["f"]));
}

#[test]
fn rewrite_reports_parse_errors_with_path() {
    match rewrite_err("export function (\n") {
        WasmAssetError::Parse { path, message } => {
            assert_eq!(path, Path::new(ENTRY));
            assert!(!message.is_empty());
        }
        other => panic!("expected a parse error, got {other:?}"),
    }
}

#[test]
fn rename_placeholder_is_idempotent() {
    let allocator = Allocator::default();
    let mut program = parse_module(
        &allocator,
        "let wasm;\nfunction f() { return wasm.g(wasm); }\n",
        Path::new(ENTRY),
    )
    .unwrap();

    assert_eq!(rename_placeholder(&mut program), 3);
    assert_eq!(rename_placeholder(&mut program), 0);
}

#[test]
fn inspect_module_shape_does_not_modify_program() {
    let allocator = Allocator::default();
    let program = parse_module(&allocator, HELLO_ENTRY, Path::new(ENTRY)).unwrap();
    let before = Codegen::new().build(&program).code;

    let shape = inspect_module_shape(&program, Path::new(ENTRY)).unwrap();

    assert_eq!(shape.exports.len(), 2);
    assert_eq!(Codegen::new().build(&program).code, before);
}

#[test]
fn binary_specifier_does_not_double_the_suffix() {
    assert_eq!(
        ImportReference::new("./hello_bg.wasm").binary_specifier(),
        "./hello_bg.wasm"
    );
    assert_eq!(
        ImportReference::new("./hello_bg").binary_specifier(),
        "./hello_bg.wasm"
    );
}
