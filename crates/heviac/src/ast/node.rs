//! Node kinds, declarations and analysis annotations

use super::{Name, NodeId};
use crate::sema::ScopeId;
use crate::types::{Associativity, TypeDesc};
use std::fmt;

/// Node kinds
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Root; `body` is a [`NodeKind::Block`]
    Program { body: NodeId },

    /// `{ ... }`
    Block { body: Vec<NodeId> },

    /// `var x: Int = 1`, `let y = x`, `const z = 2`
    Variable(VariableDecl),

    /// `func f(a: Int) -> Int { ... }`
    Function(FunctionDecl),

    /// `init(...) { ... }` in a class, or the implementation of an operator
    Constructor(ConstructorDecl),

    /// `class Point { ... }`
    Class(ClassDecl),

    /// `enum Color { Red, Green = 4 }`
    Enum(EnumDecl),

    /// `infix operator <> { ... }`
    Operator(OperatorDecl),

    /// Identifier, number, string, boolean, null or `this`
    Literal(Literal),

    /// `a + b`, `a = b`, `a <> b`
    Binary {
        operator: Name,
        left: NodeId,
        right: NodeId,
    },

    /// `!a`, `-a`, `a++`
    Unary {
        operator: Name,
        argument: NodeId,
        prefix: bool,
    },

    /// `test ? consequent : alternate`
    Ternary {
        test: NodeId,
        consequent: NodeId,
        alternate: NodeId,
    },

    /// `object.property`; `object` is `None` for the enum shorthand `.Key`
    Member {
        object: Option<NodeId>,
        property: Name,
    },

    /// `callee(arguments...)`
    Call {
        callee: Name,
        arguments: Vec<NodeId>,
    },

    /// A parameter: `name: Type` or `name: inout Type`
    TypeExpression(Parameter),

    /// `if (test) { ... } else ...`; `alternate` is a block or another `if`
    If {
        test: NodeId,
        consequent: NodeId,
        alternate: Option<NodeId>,
    },

    /// `while (test) { ... }`
    While { test: NodeId, body: NodeId },

    Break,

    Continue,

    /// `return [argument]`
    Return { argument: Option<NodeId> },

    /// `import "a", "b"`
    Import { specifiers: Vec<String> },

    /// `get { ... }` / `set(v) { ... }` inside a computed property
    PseudoProperty(PseudoProperty),

    /// `precedence 140` inside an operator declaration
    Precedence { level: u32 },

    /// `associativity left` inside an operator declaration
    Associativity { associativity: Associativity },
}

impl NodeKind {
    pub fn tag(&self) -> NodeTag {
        match self {
            NodeKind::Program { .. } => NodeTag::Program,
            NodeKind::Block { .. } => NodeTag::Block,
            NodeKind::Variable(_) => NodeTag::Variable,
            NodeKind::Function(_) => NodeTag::Function,
            NodeKind::Constructor(_) => NodeTag::Constructor,
            NodeKind::Class(_) => NodeTag::Class,
            NodeKind::Enum(_) => NodeTag::Enum,
            NodeKind::Operator(_) => NodeTag::Operator,
            NodeKind::Literal(_) => NodeTag::Literal,
            NodeKind::Binary { .. } => NodeTag::Binary,
            NodeKind::Unary { .. } => NodeTag::Unary,
            NodeKind::Ternary { .. } => NodeTag::Ternary,
            NodeKind::Member { .. } => NodeTag::Member,
            NodeKind::Call { .. } => NodeTag::Call,
            NodeKind::TypeExpression(_) => NodeTag::TypeExpression,
            NodeKind::If { .. } => NodeTag::If,
            NodeKind::While { .. } => NodeTag::While,
            NodeKind::Break => NodeTag::Break,
            NodeKind::Continue => NodeTag::Continue,
            NodeKind::Return { .. } => NodeTag::Return,
            NodeKind::Import { .. } => NodeTag::Import,
            NodeKind::PseudoProperty(_) => NodeTag::PseudoProperty,
            NodeKind::Precedence { .. } => NodeTag::Precedence,
            NodeKind::Associativity { .. } => NodeTag::Associativity,
        }
    }
}

/// Field-less mirror of [`NodeKind`], for kind comparisons and messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeTag {
    Program,
    Block,
    Variable,
    Function,
    Constructor,
    Class,
    Enum,
    Operator,
    Literal,
    Binary,
    Unary,
    Ternary,
    Member,
    Call,
    TypeExpression,
    If,
    While,
    Break,
    Continue,
    Return,
    Import,
    PseudoProperty,
    Precedence,
    Associativity,
}

impl NodeTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeTag::Program => "Program",
            NodeTag::Block => "BlockStatement",
            NodeTag::Variable => "VariableDeclaration",
            NodeTag::Function => "FunctionDeclaration",
            NodeTag::Constructor => "ConstructorDeclaration",
            NodeTag::Class => "ClassDeclaration",
            NodeTag::Enum => "EnumDeclaration",
            NodeTag::Operator => "OperatorDeclaration",
            NodeTag::Literal => "Literal",
            NodeTag::Binary => "BinaryExpression",
            NodeTag::Unary => "UnaryExpression",
            NodeTag::Ternary => "TernaryExpression",
            NodeTag::Member => "MemberExpression",
            NodeTag::Call => "CallExpression",
            NodeTag::TypeExpression => "TypeExpression",
            NodeTag::If => "IfStatement",
            NodeTag::While => "WhileStatement",
            NodeTag::Break => "BreakStatement",
            NodeTag::Continue => "ContinueStatement",
            NodeTag::Return => "ReturnStatement",
            NodeTag::Import => "ImportDeclaration",
            NodeTag::PseudoProperty => "PseudoProperty",
            NodeTag::Precedence => "PrecedenceExpression",
            NodeTag::Associativity => "AssociativityExpression",
        }
    }
}

impl fmt::Display for NodeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declaration keyword; only `const` bindings are immutable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutability {
    Var,
    Let,
    Const,
}

#[derive(Debug, Clone)]
pub struct VariableDecl {
    pub mutability: Mutability,
    pub name: Name,
    /// Declared type, `None` when inferred from `init`
    pub ty: Option<Name>,
    /// Initializer; the parser supplies a `null` literal when absent and a
    /// block of accessors for computed properties
    pub init: NodeId,
    pub is_static: bool,
    pub is_pseudo: bool,
}

#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub name: Name,
    /// [`NodeKind::TypeExpression`] nodes
    pub params: Vec<NodeId>,
    /// `None` leaves the return type open for inference
    pub ret: Option<Name>,
    pub body: NodeId,
    pub is_static: bool,
}

#[derive(Debug, Clone)]
pub struct ConstructorDecl {
    pub params: Vec<NodeId>,
    pub ret: Option<Name>,
    pub body: NodeId,
}

#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub name: Name,
    pub body: NodeId,
}

#[derive(Debug, Clone)]
pub struct EnumDecl {
    pub name: Name,
    /// Identifier literals, or `Key = value` binary expressions
    pub keys: Vec<NodeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fixity {
    Infix,
    Prefix,
    Postfix,
}

#[derive(Debug, Clone)]
pub struct OperatorDecl {
    pub symbol: Name,
    pub fixity: Fixity,
    /// Holds the precedence/associativity markers and the implementation
    pub body: NodeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    Identifier,
    Number,
    String,
    Boolean,
    Null,
    This,
}

#[derive(Debug, Clone)]
pub struct Literal {
    pub value: Name,
    pub kind: LiteralKind,
}

#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: Name,
    pub ty: Name,
    pub inout: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accessor {
    Get,
    Set,
}

#[derive(Debug, Clone)]
pub struct PseudoProperty {
    pub accessor: Accessor,
    pub params: Vec<NodeId>,
    pub body: NodeId,
}

/// Folded value recorded by the optimization phase
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Constant {
    Int(i64),
    Double(f64),
    Boolean(bool),
}

/// Analysis fields. Everything here starts empty and is only ever filled
/// in by the walker; emitters read these and never re-derive them.
#[derive(Debug, Clone, Default)]
pub struct Annotations {
    pub resolved_type: Option<TypeDesc>,
    /// Scope owned by this node, built at most once
    pub context: Option<ScopeId>,
    pub is_constant: bool,
    /// Use site reads through a box, or declaration is a reference cell
    pub is_reference: bool,
    /// Declaration storage must be boxed
    pub is_pointer: bool,
    /// Declared parameter of a function, constructor or accessor
    pub is_argument: bool,
    /// Actual argument of a call
    pub is_parameter: bool,
    /// Operand bound to an inout slot of a custom operator
    pub is_operator_parameter: bool,
    /// Actual argument bound to an inout parameter
    pub is_reference_argument: bool,
    pub is_class_property: bool,
    pub does_return: bool,
    pub is_inferenced: bool,
    pub is_instantiated_class: bool,
    pub is_class_creation: bool,
    pub is_alternate_if: bool,
    /// Member access whose object is a plain identifier
    pub is_absolute: bool,
    pub constructor: Option<NodeId>,
    pub precedence: Option<u32>,
    pub associativity: Option<Associativity>,
    pub enum_value: Option<i64>,
    pub constant: Option<Constant>,
    pub emit_name: Option<Name>,
    pub import_uid: Option<u32>,
    /// Walk that last finished visiting this variable declaration
    pub visited_pass: u32,
}
