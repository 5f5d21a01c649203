//! Reference (inout) and mutability analysis
//!
//! An operand bound to an inout slot must be addressable and mutable. Its
//! declaration is then marked as boxed storage, and every later read of
//! that declaration goes through the box. Marks only ever get set, so the
//! second semantic pass can re-derive use sites from the final declaration
//! marks without losing anything from the first.

use crate::ast::{LiteralKind, Name, NodeId, NodeKind, NodeTag};
use crate::common::{CompileError, CompileResult};
use crate::walk::Walker;
use tracing::trace;

impl Walker<'_> {
    /// Derive a use site's `is_reference` from its declaration. Operands
    /// that are themselves handed to an inout slot pass the box along and
    /// stay unmarked.
    pub(crate) fn refresh_reference(&mut self, id: NodeId, decl: NodeId) {
        let ann = self.ast.ann(id);
        if ann.is_reference_argument || ann.is_operator_parameter {
            return;
        }
        let inout = matches!(self.ast.kind(decl), NodeKind::TypeExpression(param) if param.inout);
        if inout || self.ast.ann(decl).is_pointer {
            self.ast.ann_mut(id).is_reference = true;
        }
    }

    /// Validate `operand` for the inout slot `slot` of `owner` and box the
    /// storage it names
    pub(crate) fn require_reference(&mut self, operand: NodeId, slot: &str, owner: &str) -> CompileResult<()> {
        let span = self.ast.span(operand);
        let label = match self.ast.kind(operand) {
            NodeKind::Literal(lit) if lit.kind == LiteralKind::Identifier => self.ast.name(lit.value).to_string(),
            NodeKind::Member { property, .. } => self.ast.name(*property).to_string(),
            _ => {
                return Err(CompileError::mutability(
                    format!("Argument '{}' of '{}' is not mutable", slot, owner),
                    span,
                ));
            }
        };
        if self.ast.ann(operand).is_constant {
            return Err(CompileError::mutability(
                format!(
                    "Cannot pass immutable '{}' as reference to '{}' of '{}'",
                    label, slot, owner
                ),
                span,
            ));
        }
        if let Some(decl) = self.origin_declaration(operand) {
            self.mark_pointer(decl);
        }
        Ok(())
    }

    fn mark_pointer(&mut self, decl: NodeId) {
        let ann = self.ast.ann_mut(decl);
        if !ann.is_pointer {
            trace!(%decl, "declaration boxed");
        }
        ann.is_pointer = true;
        ann.is_reference = true;
    }

    /// Declaration an identifier or member operand names
    pub(crate) fn origin_declaration(&self, operand: NodeId) -> Option<NodeId> {
        match self.ast.kind(operand) {
            NodeKind::Literal(lit) if lit.kind == LiteralKind::Identifier => {
                self.resolve(lit.value).and_then(|binding| binding.decl())
            }
            NodeKind::Member { .. } => self.member_declaration(operand),
            _ => None,
        }
    }

    /// Flag call arguments before they are walked, so that their own
    /// visitors already know whether they sit in an inout slot
    pub(crate) fn mark_call_arguments(&mut self, callee: Name, arguments: &[NodeId]) {
        let params = self.callee_parameters(callee);
        for (index, argument) in arguments.iter().enumerate() {
            let inout = params
                .get(index)
                .is_some_and(|param| self.is_inout(*param));
            let ann = self.ast.ann_mut(*argument);
            ann.is_parameter = true;
            ann.is_reference_argument |= inout;
        }
    }

    /// Same as [`Walker::mark_call_arguments`] for the operands of a custom
    /// binary operator
    pub(crate) fn mark_operator_operands(&mut self, operator: Name, left: NodeId, right: NodeId) {
        let Some(op) = self.custom_operator(operator) else {
            return;
        };
        let Some(ctor) = self.operator_implementation(op) else {
            return;
        };
        let NodeKind::Constructor(ctor) = self.ast.kind(ctor) else {
            return;
        };
        let params = ctor.params.clone();
        for (operand, param) in [left, right].into_iter().zip(params) {
            if self.is_inout(param) {
                self.ast.ann_mut(operand).is_operator_parameter = true;
            }
        }
    }

    pub(crate) fn is_inout(&self, param: NodeId) -> bool {
        matches!(self.ast.kind(param), NodeKind::TypeExpression(p) if p.inout)
    }

    /// Custom operator declaration bound to `symbol`, if any
    pub(crate) fn custom_operator(&self, symbol: Name) -> Option<NodeId> {
        self.resolve(symbol)
            .and_then(|binding| binding.decl())
            .filter(|decl| self.ast.tag(*decl) == NodeTag::Operator)
    }
}
