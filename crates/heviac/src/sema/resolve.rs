//! Type resolution and inference
//!
//! Every expression visitor stores its result in `resolved_type`, so a
//! parent only ever reads the cached types of its already walked children.

use crate::ast::{
    Accessor, Fixity, Literal, LiteralKind, Mutability, Name, NodeId, NodeKind, NodeTag,
    VariableDecl,
};
use crate::common::{CompileError, CompileResult, Span};
use crate::sema::Binding;
use crate::types::{
    native_binary, native_unary, Associativity, NativeType, OperatorClass, TypeDesc, UnaryClass,
};
use crate::walk::Walker;
use tracing::trace;

impl Walker<'_> {
    pub(crate) fn type_of(&self, id: NodeId) -> CompileResult<TypeDesc> {
        self.ast.resolved_type(id).ok_or_else(|| {
            CompileError::structural(
                format!("'{}' has no resolved type", self.ast.tag(id)),
                self.ast.span(id),
            )
        })
    }

    pub(crate) fn set_type(&mut self, id: NodeId, ty: TypeDesc) {
        self.ast.ann_mut(id).resolved_type = Some(ty);
    }

    pub(crate) fn type_str(&self, ty: &TypeDesc) -> String {
        self.ast.type_name(ty).to_string()
    }

    /// `value` may be stored where `expected` is wanted. Null goes either way.
    pub(crate) fn accepts(&self, expected: &TypeDesc, value: &TypeDesc) -> bool {
        expected.same(value) || value.is(NativeType::Null) || expected.is(NativeType::Null)
    }

    /// A written type name: a native, or a class or enum in scope
    pub(crate) fn resolve_type_name(&self, name: Name, span: Option<Span>) -> CompileResult<TypeDesc> {
        let ty = self.ast.type_desc(name);
        if ty.is_native() {
            return Ok(ty);
        }
        match self.resolve(name).and_then(Binding::decl) {
            Some(decl) if matches!(self.ast.tag(decl), NodeTag::Class | NodeTag::Enum) => Ok(ty),
            _ => Err(CompileError::name_resolution(
                format!("Type '{}' is not defined", self.ast.name(name)),
                span,
            )),
        }
    }

    /// Type a declaration stands for when referenced by name. `None` for a
    /// variable whose initializer has not been typed yet.
    pub(crate) fn declaration_type(&self, decl: NodeId) -> Option<TypeDesc> {
        match self.ast.kind(decl) {
            NodeKind::Variable(var) => match var.ty {
                Some(ty) => Some(self.ast.type_desc(ty)),
                None => self.ast.resolved_type(decl),
            },
            NodeKind::Function(_) => Some(
                self.ast
                    .resolved_type(decl)
                    .unwrap_or(self.ast.native(NativeType::Void)),
            ),
            NodeKind::Constructor(ctor) => Some(match ctor.ret {
                Some(ret) => self.ast.type_desc(ret),
                None => self.ast.native(NativeType::Void),
            }),
            NodeKind::Class(class) => Some(TypeDesc::named(class.name)),
            NodeKind::Enum(decl) => Some(TypeDesc::named(decl.name)),
            NodeKind::Operator(_) => {
                let ctor = self.operator_implementation(decl)?;
                self.declaration_type(ctor)
            }
            NodeKind::TypeExpression(param) => Some(self.ast.type_desc(param.ty)),
            // Enum keys
            NodeKind::Literal(_) | NodeKind::Binary { .. } => Some(self.ast.native(NativeType::Int)),
            _ => self.ast.resolved_type(decl),
        }
    }

    pub(crate) fn visit_literal(&mut self, id: NodeId, lit: &Literal) -> CompileResult<()> {
        let ty = match lit.kind {
            LiteralKind::Number => {
                self.ast.ann_mut(id).is_constant = true;
                if self.ast.name(lit.value).contains('.') {
                    self.ast.native(NativeType::Double)
                } else {
                    self.ast.native(NativeType::Int)
                }
            }
            LiteralKind::String => self.ast.native(NativeType::String),
            LiteralKind::Boolean => self.ast.native(NativeType::Boolean),
            LiteralKind::Null => self.ast.native(NativeType::Null),
            LiteralKind::This => {
                let class = self.enclosing(NodeTag::Class).ok_or_else(|| {
                    CompileError::structural("'this' is only valid inside a class", self.ast.span(id))
                })?;
                self.declaration_type(class)
                    .unwrap_or(self.ast.native(NativeType::Void))
            }
            LiteralKind::Identifier => self.resolve_identifier(id, lit.value)?,
        };
        self.set_type(id, ty);
        Ok(())
    }

    fn resolve_identifier(&mut self, id: NodeId, name: Name) -> CompileResult<TypeDesc> {
        match self.resolve(name) {
            Some(Binding::Native(_)) => Ok(self.ast.native(NativeType::Void)),
            Some(Binding::Decl(decl)) => {
                let ty = self.declaration_type(decl).ok_or_else(|| {
                    CompileError::name_resolution(
                        format!("'{}' is used before its type is known", self.ast.name(name)),
                        self.ast.span(id),
                    )
                })?;
                let constant = match self.ast.kind(decl) {
                    NodeKind::Variable(var) => var.mutability == Mutability::Const,
                    NodeKind::Literal(_) | NodeKind::Binary { .. } => true,
                    _ => false,
                };
                self.ast.ann_mut(id).is_constant = constant;
                self.refresh_reference(id, decl);
                Ok(ty)
            }
            None => match NativeType::from_name(self.ast.name(name)) {
                Some(native) => Ok(self.ast.native(native)),
                None => Err(CompileError::name_resolution(
                    format!("'{}' is not defined", self.ast.name(name)),
                    self.ast.span(id),
                )),
            },
        }
    }

    pub(crate) fn visit_variable(&mut self, id: NodeId, var: &VariableDecl) -> CompileResult<()> {
        let span = self.ast.span(id);
        let name = self.ast.name(var.name).to_string();
        let is_property = self
            .ast
            .parent(id)
            .is_some_and(|parent| self.ast.tag(parent) == NodeTag::Class);
        if var.is_static && !is_property {
            return Err(CompileError::structural(
                format!("Only class properties can be static, '{}' is not", name),
                span,
            ));
        }

        let ty = if var.is_pseudo {
            if !is_property {
                return Err(CompileError::structural(
                    format!("Computed property '{}' must be declared inside a class", name),
                    span,
                ));
            }
            let declared = var.ty.ok_or_else(|| {
                CompileError::structural(
                    format!("Computed property '{}' needs a declared type", name),
                    span,
                )
            })?;
            self.resolve_type_name(declared, span)?
        } else {
            let value = self.type_of(var.init)?;
            match var.ty {
                Some(declared) => {
                    let declared = self.resolve_type_name(declared, span)?;
                    if !self.accepts(&declared, &value) {
                        return Err(CompileError::type_mismatch(
                            format!(
                                "'{}' expected '{}' but got '{}'",
                                name,
                                self.type_str(&declared),
                                self.type_str(&value)
                            ),
                            span,
                        ));
                    }
                    declared
                }
                None => {
                    self.ast.ann_mut(id).is_inferenced = true;
                    value
                }
            }
        };

        let instantiated = !var.is_pseudo
            && self.ast.tag(var.init) == NodeTag::Call
            && self.ast.ann(var.init).is_instantiated_class;
        let ann = self.ast.ann_mut(id);
        ann.resolved_type = Some(ty);
        ann.is_constant = var.mutability == Mutability::Const;
        ann.is_class_property = is_property;
        ann.is_instantiated_class = instantiated;
        self.declare(var.name, id)
    }

    /// Arithmetic needs operands of one type and yields the left type, so
    /// Double arithmetic stays Double.
    pub(crate) fn visit_binary(
        &mut self,
        id: NodeId,
        operator: Name,
        left: NodeId,
        right: NodeId,
    ) -> CompileResult<()> {
        let symbol = self.ast.name(operator).to_string();
        if let Some(op) = self.custom_operator(operator) {
            let ty = self.resolve_custom_binary(id, op, &symbol, left, right)?;
            let (precedence, associativity) = {
                let ann = self.ast.ann(op);
                (ann.precedence, ann.associativity)
            };
            let ann = self.ast.ann_mut(id);
            ann.resolved_type = Some(ty);
            ann.precedence = precedence;
            ann.associativity = associativity;
            return Ok(());
        }

        let native = native_binary(&symbol).ok_or_else(|| {
            CompileError::name_resolution(
                format!("Operator '{}' is not defined", symbol),
                self.ast.span(id),
            )
        })?;
        let left_ty = self.type_of(left)?;
        let right_ty = self.type_of(right)?;
        let ty = match native.class {
            OperatorClass::Comparison => self.ast.native(NativeType::Boolean),
            OperatorClass::Logical => {
                for operand in [&left_ty, &right_ty] {
                    if !operand.is(NativeType::Boolean) {
                        return Err(self.operand_mismatch(id, &symbol, "Boolean", operand));
                    }
                }
                self.ast.native(NativeType::Boolean)
            }
            OperatorClass::Arithmetic => {
                if !left_ty.same(&right_ty) {
                    let expected = self.type_str(&left_ty);
                    return Err(self.operand_mismatch(id, &symbol, &expected, &right_ty));
                }
                left_ty
            }
            OperatorClass::Assignment => {
                self.check_assignment_target(id, left)?;
                let result = match native.associativity {
                    Associativity::Right => right_ty,
                    Associativity::Left | Associativity::None => left_ty,
                };
                if !self.accepts(&left_ty, &result) {
                    return Err(CompileError::type_mismatch(
                        format!(
                            "Cannot assign value of type '{}' to type '{}'",
                            self.type_str(&result),
                            self.type_str(&left_ty)
                        ),
                        self.ast.span(id),
                    ));
                }
                result
            }
        };
        let ann = self.ast.ann_mut(id);
        ann.resolved_type = Some(ty);
        ann.precedence = Some(native.precedence);
        ann.associativity = Some(native.associativity);
        Ok(())
    }

    fn operand_mismatch(&self, id: NodeId, symbol: &str, expected: &str, actual: &TypeDesc) -> CompileError {
        CompileError::type_mismatch(
            format!(
                "Operator '{}' expected '{}' but got '{}'",
                symbol,
                expected,
                self.type_str(actual)
            ),
            self.ast.span(id),
        )
    }

    /// Left side of an assignment: an identifier or member, not constant and
    /// not a class name
    fn check_assignment_target(&self, id: NodeId, target: NodeId) -> CompileResult<()> {
        let span = self.ast.span(id);
        let label = match self.ast.kind(target) {
            NodeKind::Literal(lit) if lit.kind == LiteralKind::Identifier => {
                if let Some(decl) = self.resolve(lit.value).and_then(Binding::decl)
                    && self.ast.tag(decl) == NodeTag::Class
                {
                    return Err(CompileError::mutability(
                        format!("'{}' is immutable", self.ast.name(lit.value)),
                        span,
                    ));
                }
                self.ast.name(lit.value).to_string()
            }
            NodeKind::Member { property, .. } => self.ast.name(*property).to_string(),
            NodeKind::Literal(lit) if lit.kind == LiteralKind::This => {
                return Err(CompileError::mutability("Cannot assign to 'this'", span));
            }
            other => {
                return Err(CompileError::mutability(
                    format!("Cannot assign to '{}'", other.tag()),
                    span,
                ));
            }
        };
        if self.ast.ann(target).is_constant {
            return Err(CompileError::mutability(
                format!("Constant '{}' is immutable", label),
                span,
            ));
        }
        Ok(())
    }

    fn resolve_custom_binary(
        &mut self,
        id: NodeId,
        op: NodeId,
        symbol: &str,
        left: NodeId,
        right: NodeId,
    ) -> CompileResult<TypeDesc> {
        let span = self.ast.span(id);
        if let NodeKind::Operator(decl) = self.ast.kind(op)
            && decl.fixity != Fixity::Infix
        {
            return Err(CompileError::type_mismatch(
                format!("Operator '{}' is not an infix operator", symbol),
                span,
            ));
        }
        let params = self.operator_parameters(op, symbol)?;
        for (operand, param) in [(left, params[0]), (right, params[1])] {
            let NodeKind::TypeExpression(param) = self.ast.kind(param).clone() else {
                continue;
            };
            if param.inout {
                let slot = self.ast.name(param.name).to_string();
                self.require_reference(operand, &slot, symbol)?;
            }
            let expected = self.ast.type_desc(param.ty);
            let actual = self.type_of(operand)?;
            if !expected.same(&actual) {
                let expected = self.type_str(&expected);
                return Err(self.operand_mismatch(id, symbol, &expected, &actual));
            }
        }
        Ok(self
            .declaration_type(op)
            .unwrap_or(self.ast.native(NativeType::Void)))
    }

    pub(crate) fn visit_unary(&mut self, id: NodeId, operator: Name, argument: NodeId) -> CompileResult<()> {
        let symbol = self.ast.name(operator).to_string();
        let span = self.ast.span(id);
        let class = native_unary(&symbol).ok_or_else(|| {
            CompileError::name_resolution(format!("Operator '{}' is not defined", symbol), span)
        })?;
        let ty = self.type_of(argument)?;
        match class {
            UnaryClass::Not => {
                if !ty.is(NativeType::Boolean) {
                    return Err(self.operand_mismatch(id, &symbol, "Boolean", &ty));
                }
            }
            UnaryClass::Negate | UnaryClass::Plus | UnaryClass::Increment | UnaryClass::Decrement => {
                if !ty.is_numeric() {
                    return Err(CompileError::type_mismatch(
                        format!(
                            "Operator '{}' expected a numeric operand but got '{}'",
                            symbol,
                            self.type_str(&ty)
                        ),
                        span,
                    ));
                }
            }
        }
        if class.mutates() {
            let assignable = self.ast.identifier(argument).is_some()
                || self.ast.tag(argument) == NodeTag::Member;
            if !assignable {
                return Err(CompileError::mutability(
                    format!("Operator '{}' needs an assignable operand", symbol),
                    span,
                ));
            }
            if self.ast.ann(argument).is_constant {
                return Err(CompileError::mutability(
                    format!("Operator '{}' cannot modify a constant", symbol),
                    span,
                ));
            }
        }
        self.set_type(id, ty);
        Ok(())
    }

    pub(crate) fn visit_ternary(
        &mut self,
        id: NodeId,
        test: NodeId,
        consequent: NodeId,
        alternate: NodeId,
    ) -> CompileResult<()> {
        self.check_condition(test)?;
        let then_ty = self.type_of(consequent)?;
        let else_ty = self.type_of(alternate)?;
        if !then_ty.same(&else_ty) {
            return Err(CompileError::type_mismatch(
                format!(
                    "Ternary branches expected '{}' but got '{}'",
                    self.type_str(&then_ty),
                    self.type_str(&else_ty)
                ),
                self.ast.span(id),
            ));
        }
        self.set_type(id, then_ty);
        Ok(())
    }

    /// `if`, `while` and ternary tests must be Boolean
    pub(crate) fn check_condition(&self, test: NodeId) -> CompileResult<()> {
        let ty = self.type_of(test)?;
        if !ty.is(NativeType::Boolean) {
            return Err(CompileError::type_mismatch(
                format!("Condition expected 'Boolean' but got '{}'", self.type_str(&ty)),
                self.ast.span(test),
            ));
        }
        Ok(())
    }

    /// Declared or inferred return type of a return context; `None` while a
    /// function's type is still open for inference
    fn return_signature(&self, context: NodeId) -> Option<TypeDesc> {
        let void = self.ast.native(NativeType::Void);
        match self.ast.kind(context) {
            NodeKind::Function(func) => match func.ret {
                Some(ret) => Some(self.ast.type_desc(ret)),
                None if !self.ctx.config().infer_return_types => Some(void),
                None if self.ast.ann(context).is_inferenced => self.ast.resolved_type(context),
                None => None,
            },
            NodeKind::PseudoProperty(prop) if prop.accessor == Accessor::Get => {
                let property = self.ast.parent(context)?;
                match self.ast.kind(property) {
                    NodeKind::Variable(var) => var.ty.map(|ty| self.ast.type_desc(ty)),
                    _ => Some(void),
                }
            }
            NodeKind::PseudoProperty(_) => Some(void),
            _ => self.declaration_type(context),
        }
    }

    /// Name used for a return context in messages
    pub(crate) fn context_label(&self, context: NodeId) -> String {
        match self.ast.kind(context) {
            NodeKind::Function(func) => self.ast.name(func.name).to_string(),
            NodeKind::PseudoProperty(prop) => {
                let property = self
                    .ast
                    .parent(context)
                    .and_then(|parent| self.ast.declared_name(parent))
                    .map(|name| self.ast.name(name).to_string())
                    .unwrap_or_default();
                let accessor = if prop.accessor == Accessor::Get { "get" } else { "set" };
                format!("{}.{}", property, accessor)
            }
            _ => self
                .ast
                .parent(context)
                .and_then(|owner| self.ast.declared_name(owner))
                .map(|name| self.ast.name(name).to_string())
                .unwrap_or_else(|| "constructor".to_string()),
        }
    }

    pub(crate) fn visit_return(&mut self, id: NodeId, argument: Option<NodeId>) -> CompileResult<()> {
        let span = self.ast.span(id);
        let context = self.return_context().ok_or_else(|| {
            CompileError::structural("'return' is only valid inside a function", span)
        })?;
        let value = argument.map(|arg| self.type_of(arg)).transpose()?;
        let void = self.ast.native(NativeType::Void);
        let label = self.context_label(context);

        match self.return_signature(context) {
            Some(expected) => match value {
                Some(value) if expected.is(NativeType::Void) => {
                    return Err(CompileError::type_mismatch(
                        format!(
                            "'{}' is declared 'Void' but returns '{}'",
                            label,
                            self.type_str(&value)
                        ),
                        span,
                    ));
                }
                Some(value) if !self.accepts(&expected, &value) => {
                    return Err(CompileError::type_mismatch(
                        format!(
                            "'{}' expected return type '{}' but got '{}'",
                            label,
                            self.type_str(&expected),
                            self.type_str(&value)
                        ),
                        span,
                    ));
                }
                None if !expected.is(NativeType::Void) => {
                    return Err(CompileError::type_mismatch(
                        format!(
                            "'{}' must return a value of type '{}'",
                            label,
                            self.type_str(&expected)
                        ),
                        span,
                    ));
                }
                _ => {}
            },
            None => {
                let inferred = value.unwrap_or(void);
                trace!(function = %label, ty = %self.type_str(&inferred), "return type inferred");
                let ann = self.ast.ann_mut(context);
                ann.resolved_type = Some(inferred);
                ann.is_inferenced = true;
            }
        }
        let ann = self.ast.ann_mut(context);
        ann.does_return = true;
        self.set_type(id, value.unwrap_or(void));
        Ok(())
    }

    /// A non-Void context must have seen a return by the end of its body
    pub(crate) fn check_returns(&self, context: NodeId) -> CompileResult<()> {
        let Some(expected) = self.return_signature(context) else {
            return Ok(());
        };
        if expected.is(NativeType::Void) || self.ast.ann(context).does_return {
            return Ok(());
        }
        Err(CompileError::structural(
            format!(
                "'{}' must return a value of type '{}'",
                self.context_label(context),
                self.type_str(&expected)
            ),
            self.ast.span(context),
        ))
    }
}
