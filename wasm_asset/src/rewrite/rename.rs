use oxc_ast::ast::{BindingIdentifier, IdentifierReference, Program};
use oxc_ast_visit::VisitMut;

/// Name the generator gives the raw instance exports inside its glue code.
pub const PLACEHOLDER_BINDING: &str = "wasm";

/// Internal alias the loader declares and fills once instantiation settles.
pub const INSTANCE_EXPORTS_ALIAS: &str = "__wasmInstanceExports";

/// Renames every bare `wasm` identifier to the alias and returns how many were
/// touched. Property names such as `obj.wasm` are `IdentifierName`s and stay.
pub fn rename_placeholder(program: &mut Program<'_>) -> usize {
    let mut renamer = PlaceholderRenamer::default();
    renamer.visit_program(program);
    renamer.renamed
}

#[derive(Debug, Default)]
struct PlaceholderRenamer {
    renamed: usize,
}

impl<'a> VisitMut<'a> for PlaceholderRenamer {
    fn visit_identifier_reference(&mut self, it: &mut IdentifierReference<'a>) {
        if it.name.as_str() == PLACEHOLDER_BINDING {
            it.name = INSTANCE_EXPORTS_ALIAS.into();
            self.renamed += 1;
        }
    }

    fn visit_binding_identifier(&mut self, it: &mut BindingIdentifier<'a>) {
        if it.name.as_str() == PLACEHOLDER_BINDING {
            it.name = INSTANCE_EXPORTS_ALIAS.into();
            self.renamed += 1;
        }
    }
}
