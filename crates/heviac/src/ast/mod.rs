//! Abstract syntax tree
//!
//! The tree lives in an arena: children are owned top-down through
//! [`NodeId`] handles and the only upward edge, `parent`, is a plain id
//! set by the walker. Identifiers, operator symbols and type names are
//! interned once and compared as [`Name`]s.

mod builder;
mod node;

pub use builder::AstBuilder;
pub use node::*;

use crate::common::Span;
use crate::types::{NativeType, TypeDesc};
use string_interner::{DefaultStringInterner, DefaultSymbol};
use std::fmt;

/// Interned identifier
pub type Name = DefaultSymbol;

/// Stable handle of a node in the [`Ast`] arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A node: static syntax plus the analysis fields filled in while walking
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Option<Span>,
    pub parent: Option<NodeId>,
    pub ann: Annotations,
}

/// Node arena and identifier interner
pub struct Ast {
    nodes: Vec<Node>,
    interner: DefaultStringInterner,
    natives: Vec<Name>,
    root: Option<NodeId>,
}

impl Ast {
    pub fn new() -> Self {
        let mut interner = DefaultStringInterner::new();
        let natives = NativeType::ALL
            .iter()
            .map(|ty| interner.get_or_intern(ty.as_str()))
            .collect();
        Self {
            nodes: Vec::new(),
            interner,
            natives,
            root: None,
        }
    }

    pub fn add(&mut self, kind: NodeKind, span: Option<Span>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind,
            span,
            parent: None,
            ann: Annotations::default(),
        });
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn set_root(&mut self, root: NodeId) {
        self.root = Some(root);
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    pub fn kind_mut(&mut self, id: NodeId) -> &mut NodeKind {
        &mut self.nodes[id.index()].kind
    }

    pub fn tag(&self, id: NodeId) -> NodeTag {
        self.kind(id).tag()
    }

    pub fn ann(&self, id: NodeId) -> &Annotations {
        &self.nodes[id.index()].ann
    }

    pub fn ann_mut(&mut self, id: NodeId) -> &mut Annotations {
        &mut self.nodes[id.index()].ann
    }

    pub fn span(&self, id: NodeId) -> Option<Span> {
        self.nodes[id.index()].span
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    pub fn resolved_type(&self, id: NodeId) -> Option<TypeDesc> {
        self.ann(id).resolved_type
    }

    /// Nearest ancestor of the given kind
    pub fn ancestor(&self, id: NodeId, tag: NodeTag) -> Option<NodeId> {
        let mut current = self.parent(id);
        while let Some(node) = current {
            if self.tag(node) == tag {
                return Some(node);
            }
            current = self.parent(node);
        }
        None
    }

    pub fn intern(&mut self, text: &str) -> Name {
        self.interner.get_or_intern(text)
    }

    /// Look up an already interned string without inserting it
    pub fn lookup_name(&self, text: &str) -> Option<Name> {
        self.interner.get(text)
    }

    pub fn name(&self, name: Name) -> &str {
        self.interner.resolve(name).unwrap_or("<unknown>")
    }

    pub fn native(&self, ty: NativeType) -> TypeDesc {
        TypeDesc {
            name: self.natives[ty.index()],
            native: Some(ty),
        }
    }

    /// Descriptor for a type name, flagged native when it names a primitive
    pub fn type_desc(&self, name: Name) -> TypeDesc {
        TypeDesc {
            name,
            native: NativeType::from_name(self.name(name)),
        }
    }

    pub fn type_name(&self, ty: &TypeDesc) -> &str {
        self.name(ty.name)
    }

    /// Name a declaration is registered under, if it has one
    pub fn declared_name(&self, id: NodeId) -> Option<Name> {
        match self.kind(id) {
            NodeKind::Variable(var) => Some(var.name),
            NodeKind::Function(func) => Some(func.name),
            NodeKind::Class(class) => Some(class.name),
            NodeKind::Enum(decl) => Some(decl.name),
            NodeKind::Operator(op) => Some(op.symbol),
            NodeKind::TypeExpression(param) => Some(param.name),
            NodeKind::Literal(lit) if lit.kind == LiteralKind::Identifier => Some(lit.value),
            _ => None,
        }
    }

    /// Direct children in source order
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        match self.kind(id) {
            NodeKind::Program { body } => vec![*body],
            NodeKind::Block { body } => body.clone(),
            NodeKind::Variable(var) => vec![var.init],
            NodeKind::Function(func) => with_body(&func.params, func.body),
            NodeKind::Constructor(ctor) => with_body(&ctor.params, ctor.body),
            NodeKind::PseudoProperty(prop) => with_body(&prop.params, prop.body),
            NodeKind::Class(class) => vec![class.body],
            NodeKind::Enum(decl) => decl.keys.clone(),
            NodeKind::Operator(op) => vec![op.body],
            NodeKind::Binary { left, right, .. } => vec![*left, *right],
            NodeKind::Unary { argument, .. } => vec![*argument],
            NodeKind::Ternary {
                test,
                consequent,
                alternate,
            } => vec![*test, *consequent, *alternate],
            NodeKind::Member { object, .. } => object.iter().copied().collect(),
            NodeKind::Call { arguments, .. } => arguments.clone(),
            NodeKind::If {
                test,
                consequent,
                alternate,
            } => {
                let mut children = vec![*test, *consequent];
                children.extend(alternate);
                children
            }
            NodeKind::While { test, body } => vec![*test, *body],
            NodeKind::Return { argument } => argument.iter().copied().collect(),
            NodeKind::Literal(_)
            | NodeKind::TypeExpression(_)
            | NodeKind::Break
            | NodeKind::Continue
            | NodeKind::Import { .. }
            | NodeKind::Precedence { .. }
            | NodeKind::Associativity { .. } => Vec::new(),
        }
    }

    /// Every node reachable from `id`, pre-order
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).into_iter().rev());
        }
        out
    }

    /// Indented outline of the subtree with names and resolved types
    pub fn dump(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.dump_into(id, 0, &mut out);
        out
    }

    fn dump_into(&self, id: NodeId, depth: usize, out: &mut String) {
        use std::fmt::Write;

        let _ = write!(out, "{:indent$}{}", "", self.tag(id), indent = depth * 2);
        let label = match self.kind(id) {
            NodeKind::Literal(lit) => Some(lit.value),
            NodeKind::Binary { operator, .. } | NodeKind::Unary { operator, .. } => Some(*operator),
            NodeKind::Member { property, .. } => Some(*property),
            NodeKind::Call { callee, .. } => Some(*callee),
            _ => self.declared_name(id),
        };
        if let Some(label) = label {
            let _ = write!(out, " {}", self.name(label));
        }
        if let Some(ty) = self.resolved_type(id) {
            let _ = write!(out, ": {}", self.type_name(&ty));
        }
        out.push('\n');
        for child in self.children(id) {
            self.dump_into(child, depth + 1, out);
        }
    }

    /// Identifier literal text, `None` for any other node
    pub fn identifier(&self, id: NodeId) -> Option<Name> {
        match self.kind(id) {
            NodeKind::Literal(lit) if lit.kind == LiteralKind::Identifier => Some(lit.value),
            _ => None,
        }
    }
}

fn with_body(params: &[NodeId], body: NodeId) -> Vec<NodeId> {
    let mut children = params.to_vec();
    children.push(body);
    children
}

impl Default for Ast {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Ast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ast")
            .field("nodes", &self.nodes.len())
            .field("root", &self.root)
            .finish()
    }
}
