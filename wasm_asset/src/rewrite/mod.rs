//! Entry-module rewriting.
//!
//! wasm-pack's bundler glue statically imports the binary and exports plain
//! functions that call into it. The loader instead fetches the binary at
//! runtime, so the glue is reduced to ordinary top-level declarations that
//! reach the instance through [`INSTANCE_EXPORTS_ALIAS`].

use std::path::Path;

use oxc_allocator::Allocator;
use oxc_ast::ast::{ExportDefaultDeclarationKind, Program, Statement};
use tracing::debug;

use crate::error::WasmAssetError;
use crate::parse::parse_module;

mod rename;
mod shape;

pub use rename::{INSTANCE_EXPORTS_ALIAS, PLACEHOLDER_BINDING, rename_placeholder};
pub use shape::{BINARY_SUFFIX, ExportDescriptor, ImportReference, ModuleShape, inspect_module_shape};

#[derive(Debug)]
pub struct RewrittenModule<'a> {
    pub program: Program<'a>,
    pub exports: ExportDescriptor,
    pub import: Option<ImportReference>,
}

pub fn rewrite_entry<'a>(
    allocator: &'a Allocator,
    source_text: &'a str,
    path: &Path,
) -> Result<RewrittenModule<'a>, WasmAssetError> {
    let mut program = parse_module(allocator, source_text, path)?;
    let ModuleShape { exports, import } = inspect_module_shape(&program, path)?;
    let renamed = rename_placeholder(&mut program);
    unwrap_module_declarations(allocator, &mut program);
    debug!(
        entry = %path.display(),
        exports = exports.len(),
        import = import.as_ref().map(ImportReference::specifier),
        renamed,
        "rewrote entry module"
    );
    Ok(RewrittenModule {
        program,
        exports,
        import,
    })
}

/// Replaces each export declaration by the declaration it wraps and drops the
/// import. Shapes other than these were already rejected by
/// [`inspect_module_shape`].
fn unwrap_module_declarations<'a>(allocator: &'a Allocator, program: &mut Program<'a>) {
    let body = std::mem::replace(&mut program.body, oxc_allocator::Vec::new_in(allocator));
    for statement in body {
        match statement {
            Statement::ImportDeclaration(_) => {}
            Statement::ExportNamedDeclaration(export) => {
                if let Some(declaration) = export.unbox().declaration {
                    program.body.push(Statement::from(declaration));
                }
            }
            Statement::ExportDefaultDeclaration(export) => match export.unbox().declaration {
                ExportDefaultDeclarationKind::FunctionDeclaration(function) => {
                    program.body.push(Statement::FunctionDeclaration(function));
                }
                ExportDefaultDeclarationKind::ClassDeclaration(class) => {
                    program.body.push(Statement::ClassDeclaration(class));
                }
                _ => {}
            },
            other => program.body.push(other),
        }
    }
}
