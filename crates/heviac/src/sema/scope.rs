//! Symbol table and scope management
//!
//! Scopes live in an arena and link to their parent by id. Each scope is
//! owned by exactly one AST node and is created the first time that node
//! is walked; later passes find it again through the node's `context`.

use crate::ast::{Ast, Name, NodeId, NodeTag};
use std::collections::HashMap;
use std::fmt;

/// Handle of a scope in the [`ScopeArena`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(u32);

impl ScopeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scope{}", self.0)
    }
}

/// Built-in functions visible from every scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeFunction {
    /// Variadic, returns `Void`
    Print,
}

impl NativeFunction {
    pub const ALL: [NativeFunction; 1] = [NativeFunction::Print];

    pub fn as_str(&self) -> &'static str {
        match self {
            NativeFunction::Print => "print",
        }
    }
}

/// What a name resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Decl(NodeId),
    Native(NativeFunction),
}

impl Binding {
    pub fn decl(self) -> Option<NodeId> {
        match self {
            Binding::Decl(id) => Some(id),
            Binding::Native(_) => None,
        }
    }
}

/// A single scope
#[derive(Debug)]
pub struct Scope {
    owner: NodeId,
    parent: Option<ScopeId>,
    table: HashMap<Name, NodeId>,
}

impl Scope {
    pub fn owner(&self) -> NodeId {
        self.owner
    }

    pub fn parent(&self) -> Option<ScopeId> {
        self.parent
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn bindings(&self) -> impl Iterator<Item = (Name, NodeId)> + '_ {
        self.table.iter().map(|(name, node)| (*name, *node))
    }
}

/// All scopes of one compilation
#[derive(Debug)]
pub struct ScopeArena {
    scopes: Vec<Scope>,
    natives: HashMap<Name, NativeFunction>,
}

impl ScopeArena {
    pub fn new(ast: &mut Ast) -> Self {
        let natives = NativeFunction::ALL
            .iter()
            .map(|native| (ast.intern(native.as_str()), *native))
            .collect();
        Self {
            scopes: Vec::new(),
            natives,
        }
    }

    pub fn create(&mut self, owner: NodeId, parent: Option<ScopeId>) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            owner,
            parent,
            table: HashMap::new(),
        });
        id
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    pub fn owner(&self, id: ScopeId) -> NodeId {
        self.get(id).owner
    }

    pub fn parent(&self, id: ScopeId) -> Option<ScopeId> {
        self.get(id).parent
    }

    /// Bind `name` locally. Duplicates are not checked here; callers run
    /// the redeclaration guard first.
    pub fn register(&mut self, id: ScopeId, name: Name, node: NodeId) {
        self.scopes[id.index()].table.insert(name, node);
    }

    pub fn lookup_local(&self, id: ScopeId, name: Name) -> Option<NodeId> {
        self.get(id).table.get(&name).copied()
    }

    /// Nearest binding of `name`: local table, natives, then the parent chain
    pub fn resolve(&self, id: ScopeId, name: Name) -> Option<Binding> {
        self.resolve_visible(id, name, |_| true)
    }

    /// Like [`ScopeArena::resolve`], but a local binding rejected by
    /// `visible` is passed over as if the scope did not declare it
    pub fn resolve_visible(
        &self,
        id: ScopeId,
        name: Name,
        visible: impl Fn(NodeId) -> bool,
    ) -> Option<Binding> {
        let mut current = Some(id);
        while let Some(scope) = current {
            if let Some(node) = self.lookup_local(scope, name)
                && visible(node)
            {
                return Some(Binding::Decl(node));
            }
            if let Some(native) = self.natives.get(&name) {
                return Some(Binding::Native(*native));
            }
            current = self.parent(scope);
        }
        None
    }

    /// Owner of the nearest enclosing scope whose owner has the given kind
    pub fn by_kind(&self, id: ScopeId, ast: &Ast, tag: NodeTag) -> Option<NodeId> {
        self.chain(id)
            .map(|scope| self.owner(scope))
            .find(|owner| ast.tag(*owner) == tag)
    }

    /// `id` and all of its ancestors, innermost first
    pub fn chain(&self, id: ScopeId) -> impl Iterator<Item = ScopeId> + '_ {
        std::iter::successors(Some(id), move |scope| self.parent(*scope))
    }
}
