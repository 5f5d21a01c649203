//! Semantic visitor set

use crate::ast::{NodeId, NodeKind, NodeTag, Parameter};
use crate::common::{CompileError, CompileResult};
use crate::types::{NativeType, TypeDesc};
use crate::walk::Walker;

impl Walker<'_> {
    pub(crate) fn visit_semantic(&mut self, id: NodeId) -> CompileResult<()> {
        match self.ast.kind(id).clone() {
            NodeKind::Program { .. } | NodeKind::Block { .. } => Ok(()),
            NodeKind::Variable(var) => self.visit_variable(id, &var),
            NodeKind::Function(func) => {
                self.check_static(id, func.is_static)?;
                if self.ast.resolved_type(id).is_none() {
                    // Open for inference and no return was found
                    let void = self.ast.native(NativeType::Void);
                    self.set_type(id, void);
                }
                self.check_returns(id)
            }
            NodeKind::Constructor(ctor) => {
                let owner = self.ast.parent(id).map(|parent| self.ast.tag(parent));
                if !matches!(owner, Some(NodeTag::Class | NodeTag::Operator)) {
                    return Err(CompileError::structural(
                        "Constructors are only allowed in classes and operators",
                        self.ast.span(id),
                    ));
                }
                let ty = match ctor.ret {
                    Some(ret) => self.resolve_type_name(ret, self.ast.span(id))?,
                    None => self.ast.native(NativeType::Void),
                };
                self.set_type(id, ty);
                self.check_returns(id)
            }
            NodeKind::Class(class) => {
                let ctor = self.class_constructor(id);
                let ann = self.ast.ann_mut(id);
                ann.constructor = ctor;
                ann.resolved_type = Some(TypeDesc::named(class.name));
                Ok(())
            }
            NodeKind::Enum(decl) => {
                self.set_type(id, TypeDesc::named(decl.name));
                Ok(())
            }
            NodeKind::Operator(op) => {
                let symbol = self.ast.name(op.symbol).to_string();
                self.operator_parameters(id, &symbol)?;
                let ctor = self.operator_implementation(id);
                let ty = ctor
                    .and_then(|ctor| self.declaration_type(ctor))
                    .unwrap_or(self.ast.native(NativeType::Void));
                let ann = self.ast.ann_mut(id);
                ann.constructor = ctor;
                ann.resolved_type = Some(ty);
                Ok(())
            }
            NodeKind::Literal(lit) => self.visit_literal(id, &lit),
            NodeKind::Binary {
                operator,
                left,
                right,
            } => self.visit_binary(id, operator, left, right),
            NodeKind::Unary {
                operator, argument, ..
            } => self.visit_unary(id, operator, argument),
            NodeKind::Ternary {
                test,
                consequent,
                alternate,
            } => self.visit_ternary(id, test, consequent, alternate),
            NodeKind::Member { object, property } => self.visit_member(id, object, property),
            NodeKind::Call { callee, arguments } => self.visit_call(id, callee, &arguments),
            NodeKind::TypeExpression(param) => self.visit_parameter(id, &param),
            NodeKind::If { test, .. } | NodeKind::While { test, .. } => self.check_condition(test),
            NodeKind::Break | NodeKind::Continue => {
                if self.in_loop() {
                    return Ok(());
                }
                let keyword = if self.ast.tag(id) == NodeTag::Break { "break" } else { "continue" };
                Err(CompileError::structural(
                    format!("'{}' is only valid inside a loop", keyword),
                    self.ast.span(id),
                ))
            }
            NodeKind::Return { argument } => self.visit_return(id, argument),
            NodeKind::PseudoProperty(_) => {
                let in_class = self
                    .ast
                    .parent(id)
                    .and_then(|property| self.ast.parent(property))
                    .is_some_and(|owner| self.ast.tag(owner) == NodeTag::Class);
                if !in_class {
                    return Err(CompileError::structural(
                        "Accessors are only allowed on class properties",
                        self.ast.span(id),
                    ));
                }
                self.check_returns(id)
            }
            NodeKind::Precedence { level } => {
                let op = self.marker_owner(id, "precedence")?;
                self.ast.ann_mut(op).precedence = Some(level);
                Ok(())
            }
            NodeKind::Associativity { associativity } => {
                let op = self.marker_owner(id, "associativity")?;
                self.ast.ann_mut(op).associativity = Some(associativity);
                Ok(())
            }
            // Replaced before visiting, or rejected by the structural handler
            NodeKind::Import { .. } => Ok(()),
        }
    }

    fn check_static(&self, id: NodeId, is_static: bool) -> CompileResult<()> {
        let in_class = self
            .ast
            .parent(id)
            .is_some_and(|parent| self.ast.tag(parent) == NodeTag::Class);
        if is_static && !in_class {
            return Err(CompileError::structural(
                "Only class members can be static",
                self.ast.span(id),
            ));
        }
        Ok(())
    }

    fn visit_parameter(&mut self, id: NodeId, param: &Parameter) -> CompileResult<()> {
        let ty = self.resolve_type_name(param.ty, self.ast.span(id))?;
        let ann = self.ast.ann_mut(id);
        ann.resolved_type = Some(ty);
        ann.is_argument = true;
        ann.is_reference |= param.inout;
        self.declare(param.name, id)
    }

    /// Whether the innermost enclosing body is a loop. Function-like
    /// scopes end the search.
    fn in_loop(&self) -> bool {
        let Ok(scope) = self.scope() else {
            return false;
        };
        for scope in self.scopes.chain(scope) {
            match self.ast.tag(self.scopes.owner(scope)) {
                NodeTag::While => return true,
                NodeTag::Function
                | NodeTag::Constructor
                | NodeTag::PseudoProperty
                | NodeTag::Class
                | NodeTag::Operator
                | NodeTag::Program => return false,
                _ => {}
            }
        }
        false
    }

    fn marker_owner(&self, id: NodeId, marker: &str) -> CompileResult<NodeId> {
        self.ast
            .parent(id)
            .filter(|parent| self.ast.tag(*parent) == NodeTag::Operator)
            .ok_or_else(|| {
                CompileError::structural(
                    format!("'{}' is only allowed inside an operator declaration", marker),
                    self.ast.span(id),
                )
            })
    }
}
