use oxc_ast::ast::{
    AssignmentExpression, AssignmentTarget, BinaryExpression, Expression, StaticMemberExpression,
};
use oxc_ast_visit::{Visit, walk};
use oxc_span::Span;
use oxc_syntax::operator::{AssignmentOperator, BinaryOperator, UnaryOperator};

use super::WrapperSubstitution;

const GLOBAL_OBJECTS: [&str; 3] = ["self", "window", "globalThis"];

/// Spans of the expressions each substitution rewrites, found by shape.
#[derive(Debug, Default)]
pub(super) struct SubstitutionSites {
    pub(super) global_binding: Vec<Span>,
    pub(super) streaming_detection: Vec<Span>,
}

impl SubstitutionSites {
    pub(super) fn spans(&self, substitution: WrapperSubstitution) -> &[Span] {
        match substitution {
            WrapperSubstitution::GlobalBinding => &self.global_binding,
            WrapperSubstitution::StreamingDetection => &self.streaming_detection,
        }
    }
}

impl<'a> Visit<'a> for SubstitutionSites {
    fn visit_static_member_expression(&mut self, it: &StaticMemberExpression<'a>) {
        if is_global_binding(it) {
            self.global_binding.push(it.span);
            return;
        }
        walk::walk_static_member_expression(self, it);
    }

    fn visit_assignment_expression(&mut self, it: &AssignmentExpression<'a>) {
        if let Some(target) = bare_global_binding(it) {
            self.global_binding.push(target);
            self.visit_expression(&it.right);
            return;
        }
        walk::walk_assignment_expression(self, it);
    }

    fn visit_binary_expression(&mut self, it: &BinaryExpression<'a>) {
        if is_streaming_detection(it) {
            self.streaming_detection.push(it.span);
            return;
        }
        walk::walk_binary_expression(self, it);
    }
}

/// `self.wasm_bindgen`, also through `window` or `globalThis`.
fn is_global_binding(it: &StaticMemberExpression<'_>) -> bool {
    let Expression::Identifier(object) = &it.object else {
        return false;
    };
    GLOBAL_OBJECTS.contains(&object.name.as_str())
        && it.property.name.as_str() == super::GLOBAL_BINDING_NAME
}

/// `wasm_bindgen = ...` as newer `--no-modules` output writes it, assigning
/// a top-level `let wasm_bindgen`. Declarations and reads are left alone.
fn bare_global_binding(it: &AssignmentExpression<'_>) -> Option<Span> {
    if it.operator != AssignmentOperator::Assign {
        return None;
    }
    match &it.left {
        AssignmentTarget::AssignmentTargetIdentifier(ident)
            if ident.name.as_str() == super::GLOBAL_BINDING_NAME =>
        {
            Some(ident.span)
        }
        _ => None,
    }
}

/// `typeof WebAssembly.instantiateStreaming === 'function'` in either operand
/// order, strict or loose.
fn is_streaming_detection(it: &BinaryExpression<'_>) -> bool {
    if !matches!(
        it.operator,
        BinaryOperator::StrictEquality | BinaryOperator::Equality
    ) {
        return false;
    }
    (is_typeof_instantiate_streaming(&it.left) && is_function_literal(&it.right))
        || (is_function_literal(&it.left) && is_typeof_instantiate_streaming(&it.right))
}

fn is_typeof_instantiate_streaming(expr: &Expression<'_>) -> bool {
    let Expression::UnaryExpression(unary) = expr.without_parentheses() else {
        return false;
    };
    if unary.operator != UnaryOperator::Typeof {
        return false;
    }
    let Expression::StaticMemberExpression(member) = unary.argument.without_parentheses() else {
        return false;
    };
    matches!(&member.object, Expression::Identifier(object) if object.name.as_str() == "WebAssembly")
        && member.property.name.as_str() == "instantiateStreaming"
}

fn is_function_literal(expr: &Expression<'_>) -> bool {
    matches!(expr.without_parentheses(), Expression::StringLiteral(lit) if lit.value.as_str() == "function")
}
