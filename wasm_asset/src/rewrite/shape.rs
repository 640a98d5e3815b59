use std::path::Path;

use indexmap::IndexSet;
use oxc_ast::ast::{
    BindingPatternKind, Declaration, ExportDefaultDeclaration, ExportDefaultDeclarationKind,
    ExportNamedDeclaration, Program, Statement,
};

use crate::error::WasmAssetError;
use crate::loader::PRELUDE_BINDINGS;

use super::{INSTANCE_EXPORTS_ALIAS, PLACEHOLDER_BINDING};

pub const BINARY_SUFFIX: &str = ".wasm";

/// Exported names of the entry module, in first-seen source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportDescriptor {
    names: IndexSet<String>,
}

impl ExportDescriptor {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    fn insert(&mut self, name: &str) -> bool {
        self.names.insert(name.to_string())
    }
}

/// The specifier of the entry module's only import: its sibling binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReference {
    specifier: String,
}

impl ImportReference {
    pub fn new(specifier: impl Into<String>) -> Self {
        Self {
            specifier: specifier.into(),
        }
    }

    pub fn specifier(&self) -> &str {
        &self.specifier
    }

    pub fn binary_specifier(&self) -> String {
        if self.specifier.ends_with(BINARY_SUFFIX) {
            self.specifier.clone()
        } else {
            format!("{}{BINARY_SUFFIX}", self.specifier)
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ModuleShape {
    pub exports: ExportDescriptor,
    pub import: Option<ImportReference>,
}

/// Read-only pass over the top level. Everything the rewrite later unwraps or
/// removes is checked here first, so the rewrite never meets a shape it cannot
/// handle.
pub fn inspect_module_shape(
    program: &Program<'_>,
    path: &Path,
) -> Result<ModuleShape, WasmAssetError> {
    let mut shape = ModuleShape::default();
    for statement in &program.body {
        match statement {
            Statement::ImportDeclaration(it) => {
                let specifier = it.source.value.as_str();
                if let Some(previous) = &shape.import {
                    return Err(violation(
                        path,
                        format!(
                            "more than one import declaration (`{}` and `{specifier}`)",
                            previous.specifier()
                        ),
                    ));
                }
                shape.import = Some(ImportReference::new(specifier));
            }
            Statement::ExportNamedDeclaration(it) => {
                for name in named_export_names(it).map_err(|message| violation(path, message))? {
                    record_export(&mut shape.exports, name, path)?;
                }
            }
            Statement::ExportDefaultDeclaration(it) => {
                let name = default_export_name(it).map_err(|message| violation(path, message))?;
                record_export(&mut shape.exports, name, path)?;
            }
            Statement::VariableDeclaration(var) => {
                for declarator in &var.declarations {
                    for ident in declarator.id.get_binding_identifiers() {
                        check_top_level_name(ident.name.as_str(), path)?;
                    }
                }
            }
            Statement::FunctionDeclaration(function) => {
                if let Some(id) = &function.id {
                    check_top_level_name(id.name.as_str(), path)?;
                }
            }
            Statement::ClassDeclaration(class) => {
                if let Some(id) = &class.id {
                    check_top_level_name(id.name.as_str(), path)?;
                }
            }
            Statement::ExportAllDeclaration(it) => {
                return Err(violation(
                    path,
                    format!("`export * from \"{}\"` has no local declaration", it.source.value),
                ));
            }
            _ => {}
        }
    }
    Ok(shape)
}

fn record_export(
    exports: &mut ExportDescriptor,
    name: &str,
    path: &Path,
) -> Result<(), WasmAssetError> {
    check_top_level_name(name, path)?;
    if exports.insert(name) {
        return Ok(());
    }
    Err(violation(path, format!("`{name}` is exported more than once")))
}

/// Top-level names the loader declares itself, or that the placeholder rename
/// would turn into one of those. Import locals are exempt: the import is
/// dropped.
fn check_top_level_name(name: &str, path: &Path) -> Result<(), WasmAssetError> {
    let reserved = name == PLACEHOLDER_BINDING
        || name == INSTANCE_EXPORTS_ALIAS
        || PRELUDE_BINDINGS.contains(&name);
    if !reserved {
        return Ok(());
    }
    Err(violation(
        path,
        format!("top-level binding `{name}` collides with a name the loader declares"),
    ))
}

fn named_export_names<'b>(it: &'b ExportNamedDeclaration<'_>) -> Result<Vec<&'b str>, String> {
    if let Some(source) = &it.source {
        return Err(format!("re-export from \"{}\" has no local declaration", source.value));
    }
    let Some(declaration) = &it.declaration else {
        return Err("`export { ... }` lists have no declaration to unwrap".to_string());
    };
    match declaration {
        Declaration::VariableDeclaration(var) => var
            .declarations
            .iter()
            .map(|declarator| match &declarator.id.kind {
                BindingPatternKind::BindingIdentifier(ident) => Ok(ident.name.as_str()),
                _ => Err("destructuring patterns are not supported in exports".to_string()),
            })
            .collect(),
        Declaration::FunctionDeclaration(function) => function
            .id
            .as_ref()
            .map(|id| vec![id.name.as_str()])
            .ok_or_else(|| "exported function has no name".to_string()),
        Declaration::ClassDeclaration(class) => class
            .id
            .as_ref()
            .map(|id| vec![id.name.as_str()])
            .ok_or_else(|| "exported class has no name".to_string()),
        _ => Err("unsupported export declaration kind".to_string()),
    }
}

fn default_export_name<'b>(it: &'b ExportDefaultDeclaration<'_>) -> Result<&'b str, String> {
    let id = match &it.declaration {
        ExportDefaultDeclarationKind::FunctionDeclaration(function) => function.id.as_ref(),
        ExportDefaultDeclarationKind::ClassDeclaration(class) => class.id.as_ref(),
        _ => return Err("default export of an expression has no name".to_string()),
    };
    id.map(|id| id.name.as_str())
        .ok_or_else(|| "anonymous default export has no name".to_string())
}

fn violation(path: &Path, message: String) -> WasmAssetError {
    WasmAssetError::StructuralViolation {
        path: path.to_path_buf(),
        message,
    }
}
