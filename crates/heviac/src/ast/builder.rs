//! Construction API for parsers and tests
//!
//! The builder fills in the defaults the grammar implies: a missing
//! initializer becomes a `null` literal, every body is wrapped in a block
//! and operator declarations get their markers and implementation.

use super::*;
use crate::common::Span;
use crate::types::Associativity;

pub struct AstBuilder<'a> {
    ast: &'a mut Ast,
}

impl<'a> AstBuilder<'a> {
    pub fn new(ast: &'a mut Ast) -> Self {
        Self { ast }
    }

    pub fn ast(&mut self) -> &mut Ast {
        self.ast
    }

    /// Attach a source location to an already built node
    pub fn at(&mut self, id: NodeId, span: Span) -> NodeId {
        self.ast.node_mut(id).span = Some(span);
        id
    }

    fn literal(&mut self, text: &str, kind: LiteralKind) -> NodeId {
        let value = self.ast.intern(text);
        self.ast.add(NodeKind::Literal(Literal { value, kind }), None)
    }

    pub fn ident(&mut self, name: &str) -> NodeId {
        self.literal(name, LiteralKind::Identifier)
    }

    pub fn this(&mut self) -> NodeId {
        self.literal("this", LiteralKind::This)
    }

    pub fn number(&mut self, text: &str) -> NodeId {
        self.literal(text, LiteralKind::Number)
    }

    pub fn string(&mut self, text: &str) -> NodeId {
        self.literal(text, LiteralKind::String)
    }

    pub fn boolean(&mut self, value: bool) -> NodeId {
        self.literal(if value { "true" } else { "false" }, LiteralKind::Boolean)
    }

    pub fn null(&mut self) -> NodeId {
        self.literal("null", LiteralKind::Null)
    }

    pub fn binary(&mut self, operator: &str, left: NodeId, right: NodeId) -> NodeId {
        let operator = self.ast.intern(operator);
        self.ast.add(NodeKind::Binary { operator, left, right }, None)
    }

    pub fn assign(&mut self, left: NodeId, right: NodeId) -> NodeId {
        self.binary("=", left, right)
    }

    pub fn prefix(&mut self, operator: &str, argument: NodeId) -> NodeId {
        let operator = self.ast.intern(operator);
        self.ast.add(NodeKind::Unary { operator, argument, prefix: true }, None)
    }

    pub fn postfix(&mut self, operator: &str, argument: NodeId) -> NodeId {
        let operator = self.ast.intern(operator);
        self.ast.add(NodeKind::Unary { operator, argument, prefix: false }, None)
    }

    pub fn ternary(&mut self, test: NodeId, consequent: NodeId, alternate: NodeId) -> NodeId {
        self.ast.add(NodeKind::Ternary { test, consequent, alternate }, None)
    }

    pub fn member(&mut self, object: NodeId, property: &str) -> NodeId {
        let property = self.ast.intern(property);
        self.ast.add(NodeKind::Member { object: Some(object), property }, None)
    }

    /// `.Key` with the enum left implicit
    pub fn enum_shorthand(&mut self, property: &str) -> NodeId {
        let property = self.ast.intern(property);
        self.ast.add(NodeKind::Member { object: None, property }, None)
    }

    pub fn call(&mut self, callee: &str, arguments: Vec<NodeId>) -> NodeId {
        let callee = self.ast.intern(callee);
        self.ast.add(NodeKind::Call { callee, arguments }, None)
    }

    pub fn variable(
        &mut self,
        mutability: Mutability,
        name: &str,
        ty: Option<&str>,
        init: Option<NodeId>,
    ) -> NodeId {
        let init = match init {
            Some(init) => init,
            None => self.null(),
        };
        let name = self.ast.intern(name);
        let ty = ty.map(|ty| self.ast.intern(ty));
        self.ast.add(
            NodeKind::Variable(VariableDecl {
                mutability,
                name,
                ty,
                init,
                is_static: false,
                is_pseudo: false,
            }),
            None,
        )
    }

    pub fn var(&mut self, name: &str, ty: Option<&str>, init: Option<NodeId>) -> NodeId {
        self.variable(Mutability::Var, name, ty, init)
    }

    pub fn let_(&mut self, name: &str, ty: Option<&str>, init: Option<NodeId>) -> NodeId {
        self.variable(Mutability::Let, name, ty, init)
    }

    pub fn const_(&mut self, name: &str, ty: Option<&str>, init: Option<NodeId>) -> NodeId {
        self.variable(Mutability::Const, name, ty, init)
    }

    /// Mark a variable or function declaration `static`
    pub fn make_static(&mut self, id: NodeId) -> NodeId {
        match self.ast.kind_mut(id) {
            NodeKind::Variable(var) => var.is_static = true,
            NodeKind::Function(func) => func.is_static = true,
            _ => {}
        }
        id
    }

    /// Computed property: `var name: ty { get { ... } set(v) { ... } }`
    pub fn computed(&mut self, name: &str, ty: &str, accessors: Vec<NodeId>) -> NodeId {
        let init = self.block(accessors);
        let name = self.ast.intern(name);
        let ty = self.ast.intern(ty);
        self.ast.add(
            NodeKind::Variable(VariableDecl {
                mutability: Mutability::Var,
                name,
                ty: Some(ty),
                init,
                is_static: false,
                is_pseudo: true,
            }),
            None,
        )
    }

    pub fn getter(&mut self, body: Vec<NodeId>) -> NodeId {
        let body = self.block(body);
        self.ast.add(
            NodeKind::PseudoProperty(PseudoProperty {
                accessor: Accessor::Get,
                params: Vec::new(),
                body,
            }),
            None,
        )
    }

    pub fn setter(&mut self, params: Vec<NodeId>, body: Vec<NodeId>) -> NodeId {
        let body = self.block(body);
        self.ast.add(
            NodeKind::PseudoProperty(PseudoProperty {
                accessor: Accessor::Set,
                params,
                body,
            }),
            None,
        )
    }

    pub fn param(&mut self, name: &str, ty: &str) -> NodeId {
        let name = self.ast.intern(name);
        let ty = self.ast.intern(ty);
        self.ast.add(NodeKind::TypeExpression(Parameter { name, ty, inout: false }), None)
    }

    pub fn inout_param(&mut self, name: &str, ty: &str) -> NodeId {
        let name = self.ast.intern(name);
        let ty = self.ast.intern(ty);
        self.ast.add(NodeKind::TypeExpression(Parameter { name, ty, inout: true }), None)
    }

    pub fn block(&mut self, body: Vec<NodeId>) -> NodeId {
        self.ast.add(NodeKind::Block { body }, None)
    }

    pub fn function(
        &mut self,
        name: &str,
        params: Vec<NodeId>,
        ret: Option<&str>,
        body: Vec<NodeId>,
    ) -> NodeId {
        let body = self.block(body);
        let name = self.ast.intern(name);
        let ret = ret.map(|ret| self.ast.intern(ret));
        self.ast.add(
            NodeKind::Function(FunctionDecl {
                name,
                params,
                ret,
                body,
                is_static: false,
            }),
            None,
        )
    }

    pub fn constructor(&mut self, params: Vec<NodeId>, ret: Option<&str>, body: Vec<NodeId>) -> NodeId {
        let body = self.block(body);
        let ret = ret.map(|ret| self.ast.intern(ret));
        self.ast.add(NodeKind::Constructor(ConstructorDecl { params, ret, body }), None)
    }

    pub fn class(&mut self, name: &str, members: Vec<NodeId>) -> NodeId {
        let body = self.block(members);
        let name = self.ast.intern(name);
        self.ast.add(NodeKind::Class(ClassDecl { name, body }), None)
    }

    pub fn enumeration(&mut self, name: &str, keys: Vec<NodeId>) -> NodeId {
        let name = self.ast.intern(name);
        self.ast.add(NodeKind::Enum(EnumDecl { name, keys }), None)
    }

    /// `Key = value` inside an enum
    pub fn enum_key_value(&mut self, key: &str, value: NodeId) -> NodeId {
        let key = self.ident(key);
        self.assign(key, value)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn operator(
        &mut self,
        symbol: &str,
        fixity: Fixity,
        precedence: Option<u32>,
        associativity: Option<Associativity>,
        params: Vec<NodeId>,
        ret: Option<&str>,
        body: Vec<NodeId>,
    ) -> NodeId {
        let mut items = Vec::new();
        if let Some(level) = precedence {
            items.push(self.ast.add(NodeKind::Precedence { level }, None));
        }
        if let Some(associativity) = associativity {
            items.push(self.ast.add(NodeKind::Associativity { associativity }, None));
        }
        items.push(self.constructor(params, ret, body));
        let body = self.block(items);
        let symbol = self.ast.intern(symbol);
        self.ast.add(NodeKind::Operator(OperatorDecl { symbol, fixity, body }), None)
    }

    pub fn precedence(&mut self, level: u32) -> NodeId {
        self.ast.add(NodeKind::Precedence { level }, None)
    }

    pub fn associativity(&mut self, associativity: Associativity) -> NodeId {
        self.ast.add(NodeKind::Associativity { associativity }, None)
    }

    pub fn if_(&mut self, test: NodeId, consequent: Vec<NodeId>, alternate: Option<NodeId>) -> NodeId {
        let consequent = self.block(consequent);
        self.ast.add(NodeKind::If { test, consequent, alternate }, None)
    }

    pub fn while_(&mut self, test: NodeId, body: Vec<NodeId>) -> NodeId {
        let body = self.block(body);
        self.ast.add(NodeKind::While { test, body }, None)
    }

    pub fn break_(&mut self) -> NodeId {
        self.ast.add(NodeKind::Break, None)
    }

    pub fn continue_(&mut self) -> NodeId {
        self.ast.add(NodeKind::Continue, None)
    }

    pub fn ret(&mut self, argument: Option<NodeId>) -> NodeId {
        self.ast.add(NodeKind::Return { argument }, None)
    }

    pub fn import(&mut self, specifiers: &[&str]) -> NodeId {
        let specifiers = specifiers.iter().map(|s| s.to_string()).collect();
        self.ast.add(NodeKind::Import { specifiers }, None)
    }

    /// Wrap top-level statements into a program and make it the root
    pub fn program(&mut self, body: Vec<NodeId>) -> NodeId {
        let body = self.block(body);
        let program = self.ast.add(NodeKind::Program { body }, None);
        self.ast.set_root(program);
        program
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_initializer_is_null() {
        let mut ast = Ast::new();
        let mut b = AstBuilder::new(&mut ast);
        let x = b.var("x", Some("Int"), None);
        let NodeKind::Variable(var) = ast.kind(x) else {
            panic!("expected variable");
        };
        match ast.kind(var.init) {
            NodeKind::Literal(lit) => assert_eq!(lit.kind, LiteralKind::Null),
            _ => panic!("expected null literal"),
        }
    }

    #[test]
    fn test_operator_layout() {
        let mut ast = Ast::new();
        let mut b = AstBuilder::new(&mut ast);
        let l = b.param("a", "Int");
        let r = b.param("b", "Int");
        let op = b.operator("<>", Fixity::Infix, Some(140), Some(Associativity::Left), vec![l, r], Some("Int"), vec![]);
        let NodeKind::Operator(decl) = ast.kind(op) else {
            panic!("expected operator");
        };
        let NodeKind::Block { body } = ast.kind(decl.body) else {
            panic!("expected block");
        };
        let tags: Vec<_> = body.iter().map(|id| ast.tag(*id)).collect();
        assert_eq!(tags, vec![NodeTag::Precedence, NodeTag::Associativity, NodeTag::Constructor]);
    }
}
