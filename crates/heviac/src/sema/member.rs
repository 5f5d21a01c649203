//! Member, call and enum resolution

use crate::ast::{LiteralKind, Literal, Mutability, Name, NodeId, NodeKind, NodeTag};
use crate::common::{CompileError, CompileResult};
use crate::sema::{Binding, NativeFunction};
use crate::types::{NativeType, TypeDesc};
use crate::walk::Walker;
use tracing::trace;

/// One enum key with its value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct EnumKey {
    pub name: Name,
    pub node: NodeId,
    pub value: i64,
}

impl Walker<'_> {
    fn first_constructor(&self, body: NodeId) -> Option<NodeId> {
        self.statements(body)
            .into_iter()
            .find(|member| self.ast.tag(*member) == NodeTag::Constructor)
    }

    /// The constructor of a class. Searched in the body so that a class can
    /// be instantiated before its own declaration is walked.
    pub(crate) fn class_constructor(&self, class: NodeId) -> Option<NodeId> {
        match self.ast.kind(class) {
            NodeKind::Class(decl) => self.first_constructor(decl.body),
            _ => None,
        }
    }

    /// The two-argument implementation of a custom operator
    pub(crate) fn operator_implementation(&self, op: NodeId) -> Option<NodeId> {
        match self.ast.kind(op) {
            NodeKind::Operator(decl) => self.first_constructor(decl.body),
            _ => None,
        }
    }

    /// Parameters of an operator implementation, which must be exactly two
    pub(crate) fn operator_parameters(&self, op: NodeId, symbol: &str) -> CompileResult<Vec<NodeId>> {
        let span = self.ast.span(op);
        let ctor = self.operator_implementation(op).ok_or_else(|| {
            CompileError::structural(format!("Operator '{}' has no implementation", symbol), span)
        })?;
        let params = match self.ast.kind(ctor) {
            NodeKind::Constructor(ctor) => ctor.params.clone(),
            _ => Vec::new(),
        };
        if params.len() != 2 {
            return Err(CompileError::structural(
                format!(
                    "Operator '{}' must take exactly two parameters, found {}",
                    symbol,
                    params.len()
                ),
                self.ast.span(ctor).or(span),
            ));
        }
        Ok(params)
    }

    /// Property or method `name` declared directly in a class body
    pub(crate) fn class_member(&self, class: NodeId, name: Name) -> Option<NodeId> {
        let NodeKind::Class(decl) = self.ast.kind(class) else {
            return None;
        };
        self.statements(decl.body).into_iter().find(|member| {
            matches!(
                self.ast.kind(*member),
                NodeKind::Variable(_) | NodeKind::Function(_)
            ) && self.ast.declared_name(*member) == Some(name)
        })
    }

    fn is_static(&self, member: NodeId) -> bool {
        match self.ast.kind(member) {
            NodeKind::Variable(var) => var.is_static,
            NodeKind::Function(func) => func.is_static,
            _ => false,
        }
    }

    /// Class declaration a type names, if it is a class
    pub(crate) fn class_of(&self, ty: &TypeDesc) -> Option<NodeId> {
        if ty.is_native() {
            return None;
        }
        self.resolve(ty.name)
            .and_then(Binding::decl)
            .filter(|decl| self.ast.tag(*decl) == NodeTag::Class)
    }

    /// Keys of an enum in declaration order. Implicit keys count up from
    /// zero, or from one past the last explicit value.
    pub(crate) fn enum_keys(&self, keys: &[NodeId]) -> CompileResult<Vec<EnumKey>> {
        // None once the previous value was i64::MAX
        let mut next = Some(0i64);
        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            let (name, value) = match self.ast.kind(*key) {
                NodeKind::Literal(lit) if lit.kind == LiteralKind::Identifier => {
                    let value = next.ok_or_else(|| {
                        CompileError::structural(
                            format!("Value of enum key '{}' overflows", self.ast.name(lit.value)),
                            self.ast.span(*key),
                        )
                    })?;
                    (lit.value, value)
                }
                NodeKind::Binary { left, right, .. } => {
                    let name = self.ast.identifier(*left).ok_or_else(|| {
                        CompileError::structural("Enum key must be an identifier", self.ast.span(*key))
                    })?;
                    let value = self.integer_literal(*right).ok_or_else(|| {
                        CompileError::structural(
                            format!(
                                "Value of enum key '{}' must be an integer literal",
                                self.ast.name(name)
                            ),
                            self.ast.span(*key),
                        )
                    })?;
                    (name, value)
                }
                other => {
                    return Err(CompileError::structural(
                        format!("Unexpected '{}' in enum declaration", other.tag()),
                        self.ast.span(*key),
                    ));
                }
            };
            out.push(EnumKey {
                name,
                node: *key,
                value,
            });
            next = value.checked_add(1);
        }
        Ok(out)
    }

    fn integer_literal(&self, id: NodeId) -> Option<i64> {
        match self.ast.kind(id) {
            NodeKind::Literal(Literal {
                value,
                kind: LiteralKind::Number,
            }) => self.ast.name(*value).parse().ok(),
            NodeKind::Unary {
                operator,
                argument,
                prefix: true,
            } if self.ast.name(*operator) == "-" => self.integer_literal(*argument).map(|v| -v),
            _ => None,
        }
    }

    /// Bind the keys of a freshly created enum scope
    pub(crate) fn register_enum_keys(&mut self, id: NodeId, keys: &[NodeId]) -> CompileResult<()> {
        let int = self.ast.native(NativeType::Int);
        for key in self.enum_keys(keys)? {
            self.declare(key.name, key.node)?;
            self.ast.node_mut(key.node).parent = Some(id);
            if let NodeKind::Binary { left, .. } = self.ast.kind(key.node) {
                let left = *left;
                self.ast.node_mut(left).parent = Some(key.node);
                self.ast.ann_mut(left).resolved_type = Some(int);
            }
            let ann = self.ast.ann_mut(key.node);
            ann.enum_value = Some(key.value);
            ann.resolved_type = Some(int);
            ann.is_constant = true;
        }
        Ok(())
    }

    /// `(key, value expression)` of every explicitly valued key
    pub(crate) fn enum_values(&self, keys: &[NodeId]) -> Vec<(NodeId, NodeId)> {
        keys.iter()
            .filter_map(|key| match self.ast.kind(*key) {
                NodeKind::Binary { right, .. } => Some((*key, *right)),
                _ => None,
            })
            .collect()
    }

    fn enum_key(&self, decl: NodeId, property: Name) -> Option<EnumKey> {
        let NodeKind::Enum(decl) = self.ast.kind(decl) else {
            return None;
        };
        self.enum_keys(&decl.keys)
            .ok()?
            .into_iter()
            .find(|key| key.name == property)
    }

    /// Parameters of whatever a call's callee names; empty for natives
    pub(crate) fn callee_parameters(&self, callee: Name) -> Vec<NodeId> {
        let Some(decl) = self.resolve(callee).and_then(Binding::decl) else {
            return Vec::new();
        };
        match self.ast.kind(decl) {
            NodeKind::Function(func) => func.params.clone(),
            NodeKind::Class(_) => match self.class_constructor(decl).map(|ctor| self.ast.kind(ctor)) {
                Some(NodeKind::Constructor(ctor)) => ctor.params.clone(),
                _ => Vec::new(),
            },
            _ => Vec::new(),
        }
    }

    pub(crate) fn visit_call(&mut self, id: NodeId, callee: Name, arguments: &[NodeId]) -> CompileResult<()> {
        let span = self.ast.span(id);
        let name = self.ast.name(callee).to_string();
        let (params, ty) = match self.resolve(callee) {
            None => {
                return Err(CompileError::name_resolution(
                    format!("Cannot resolve call to '{}'", name),
                    span,
                ));
            }
            Some(Binding::Native(NativeFunction::Print)) => {
                let void = self.ast.native(NativeType::Void);
                self.set_type(id, void);
                return Ok(());
            }
            Some(Binding::Decl(decl)) => match self.ast.kind(decl) {
                NodeKind::Function(func) => {
                    let params = func.params.clone();
                    let ty = self
                        .declaration_type(decl)
                        .unwrap_or(self.ast.native(NativeType::Void));
                    (params, ty)
                }
                NodeKind::Class(class) => {
                    let ty = TypeDesc::named(class.name);
                    if self.class_constructor(decl).is_none() {
                        return Err(CompileError::structural(
                            format!("Class '{}' has no constructor", name),
                            span,
                        ));
                    }
                    self.ast.ann_mut(id).is_instantiated_class = true;
                    (self.callee_parameters(callee), ty)
                }
                other => {
                    return Err(CompileError::type_mismatch(
                        format!("'{}' is a {} and cannot be called", name, other.tag()),
                        span,
                    ));
                }
            },
        };

        if arguments.len() > params.len() {
            return Err(CompileError::arity(
                format!(
                    "Too many arguments in call to '{}': expected {}, got {}",
                    name,
                    params.len(),
                    arguments.len()
                ),
                span,
            ));
        }
        if arguments.len() < params.len() {
            return Err(CompileError::arity(
                format!(
                    "Not enough arguments in call to '{}': expected {}, got {}",
                    name,
                    params.len(),
                    arguments.len()
                ),
                span,
            ));
        }

        for (argument, param) in arguments.iter().zip(params) {
            let NodeKind::TypeExpression(param) = self.ast.kind(param).clone() else {
                continue;
            };
            let slot = self.ast.name(param.name).to_string();
            if param.inout {
                self.require_reference(*argument, &slot, &name)?;
            }
            let expected = self.ast.type_desc(param.ty);
            let actual = self.type_of(*argument)?;
            if !self.accepts(&expected, &actual) {
                return Err(CompileError::type_mismatch(
                    format!(
                        "Argument '{}' of '{}' expected '{}' but got '{}'",
                        slot,
                        name,
                        self.type_str(&expected),
                        self.type_str(&actual)
                    ),
                    self.ast.span(*argument).or(span),
                ));
            }
        }
        self.set_type(id, ty);
        Ok(())
    }

    /// Declaration a member expression resolves to, for members of classes
    pub(crate) fn member_declaration(&self, member: NodeId) -> Option<NodeId> {
        let NodeKind::Member {
            object: Some(object),
            property,
        } = self.ast.kind(member)
        else {
            return None;
        };
        let class = match self.ast.kind(*object) {
            NodeKind::Literal(lit) if lit.kind == LiteralKind::This => self.enclosing(NodeTag::Class)?,
            _ => match self.origin_declaration(*object) {
                Some(decl) if self.ast.tag(decl) == NodeTag::Class => decl,
                _ => self.class_of(&self.ast.resolved_type(*object)?)?,
            },
        };
        self.class_member(class, *property)
    }

    pub(crate) fn visit_member(&mut self, id: NodeId, object: Option<NodeId>, property: Name) -> CompileResult<()> {
        let object = match object {
            Some(object) => object,
            None => self.fill_enum_shorthand(id, property)?,
        };
        let span = self.ast.span(id);
        let prop = self.ast.name(property).to_string();
        self.ast.ann_mut(id).is_absolute = self.ast.identifier(object).is_some();

        let (class, through) = match self.ast.kind(object).clone() {
            NodeKind::Literal(Literal {
                kind: LiteralKind::This,
                ..
            }) => {
                let class = self.enclosing(NodeTag::Class).ok_or_else(|| {
                    CompileError::structural("'this' is only valid inside a class", span)
                })?;
                (class, Through::This)
            }
            NodeKind::Literal(Literal {
                kind: LiteralKind::Identifier,
                value,
            }) => match self.resolve(value).and_then(Binding::decl) {
                Some(decl) if self.ast.tag(decl) == NodeTag::Enum => {
                    return self.resolve_enum_member(id, decl, value, property);
                }
                Some(decl) if self.ast.tag(decl) == NodeTag::Class => (decl, Through::Type),
                Some(decl) => {
                    let class = self.instance_class(object, &prop)?;
                    (class, Through::Instance(Some(decl)))
                }
                None => (self.instance_class(object, &prop)?, Through::Instance(None)),
            },
            _ => (self.instance_class(object, &prop)?, Through::Instance(None)),
        };

        let class_name = self
            .ast
            .declared_name(class)
            .map(|name| self.ast.name(name).to_string())
            .unwrap_or_default();
        let member = self.class_member(class, property).ok_or_else(|| {
            let owner = match through {
                Through::This => "this".to_string(),
                _ => class_name.clone(),
            };
            CompileError::name_resolution(format!("'{}' does not have member '{}'", owner, prop), span)
        })?;

        match through {
            Through::This if self.is_static(member) => {
                return Err(CompileError::structural(
                    format!("Static member '{}' cannot be accessed through 'this'", prop),
                    span,
                ));
            }
            Through::Type if !self.is_static(member) => {
                return Err(CompileError::structural(
                    format!(
                        "Cannot access non-static member '{}' through class '{}'",
                        prop, class_name
                    ),
                    span,
                ));
            }
            Through::Instance(Some(decl)) if self.ast.tag(decl) == NodeTag::Variable => {
                if !self.ast.ann(decl).is_instantiated_class {
                    let variable = self
                        .ast
                        .declared_name(decl)
                        .map(|name| self.ast.name(name).to_string())
                        .unwrap_or_default();
                    return Err(CompileError::structural(
                        format!("'{}' is not an instance of '{}'", variable, class_name),
                        span,
                    ));
                }
            }
            _ => {}
        }

        let ty = self.declaration_type(member).ok_or_else(|| {
            CompileError::name_resolution(format!("'{}' is used before its type is known", prop), span)
        })?;
        let constant = matches!(
            self.ast.kind(member),
            NodeKind::Variable(var) if var.mutability == Mutability::Const
        );
        self.ast.ann_mut(id).is_constant = constant;
        self.refresh_reference(id, member);
        self.set_type(id, ty);
        Ok(())
    }

    /// Class of an instance expression, from its resolved type
    fn instance_class(&self, object: NodeId, prop: &str) -> CompileResult<NodeId> {
        let ty = self.type_of(object)?;
        self.class_of(&ty).ok_or_else(|| {
            CompileError::name_resolution(
                format!("Type '{}' does not have member '{}'", self.type_str(&ty), prop),
                self.ast.span(object),
            )
        })
    }

    fn resolve_enum_member(&mut self, id: NodeId, decl: NodeId, name: Name, property: Name) -> CompileResult<()> {
        let key = self.enum_key(decl, property).ok_or_else(|| {
            CompileError::name_resolution(
                format!(
                    "Enum '{}' has no member '{}'",
                    self.ast.name(name),
                    self.ast.name(property)
                ),
                self.ast.span(id),
            )
        })?;
        let int = self.ast.native(NativeType::Int);
        let ann = self.ast.ann_mut(id);
        ann.enum_value = Some(key.value);
        ann.is_constant = true;
        ann.resolved_type = Some(int);
        Ok(())
    }

    /// `.Key`: find the one visible enum declaring `Key` and make it the
    /// object of the member expression
    fn fill_enum_shorthand(&mut self, id: NodeId, property: Name) -> CompileResult<NodeId> {
        let span = self.ast.span(id);
        let scope = self.scope()?;
        let mut found = Vec::new();
        for scope in self.scopes.chain(scope) {
            found = self
                .scopes
                .get(scope)
                .bindings()
                .filter(|(_, decl)| self.ast.tag(*decl) == NodeTag::Enum)
                .filter(|(_, decl)| self.enum_key(*decl, property).is_some())
                .map(|(name, _)| name)
                .collect();
            if !found.is_empty() {
                break;
            }
        }
        found.sort_by_key(|name| self.ast.name(*name).to_string());
        let enum_name = match found.as_slice() {
            [name] => *name,
            [] => {
                return Err(CompileError::name_resolution(
                    format!("No enum declares '.{}'", self.ast.name(property)),
                    span,
                ));
            }
            [first, second, ..] => {
                return Err(CompileError::name_resolution(
                    format!(
                        "'.{}' is ambiguous between '{}' and '{}'",
                        self.ast.name(property),
                        self.ast.name(*first),
                        self.ast.name(*second)
                    ),
                    span,
                ));
            }
        };
        let object = self.ast.add(
            NodeKind::Literal(Literal {
                value: enum_name,
                kind: LiteralKind::Identifier,
            }),
            span,
        );
        if let NodeKind::Member { object: slot, .. } = self.ast.kind_mut(id) {
            *slot = Some(object);
        }
        trace!(member = %id, enum_name = self.ast.name(enum_name), "enum shorthand filled in");
        self.walk_node(object, Some(id))?;
        Ok(object)
    }
}

/// How a class member is reached
#[derive(Debug, Clone, Copy)]
enum Through {
    This,
    Type,
    Instance(Option<NodeId>),
}
