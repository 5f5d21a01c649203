//! Phase-driven walker
//!
//! One traversal serves every phase. `walk_node` records the parent, runs
//! the structural handler for the node's shape (scope push/pop, hoisting,
//! recursion into children) and then hands the node to the visitor set of
//! the active phase. Children are always finished before their parent is
//! visited.

mod phase;

pub use phase::{AnalysisConfig, AnalysisContext, Phase, Writer};

use crate::ast::{Ast, Name, NodeId, NodeKind, NodeTag};
use crate::common::{CompileError, CompileResult};
use crate::import::ImportResolver;
use crate::sema::{Binding, ScopeArena, ScopeId};
use crate::types::NativeType;
use tracing::{debug, trace};

pub struct Walker<'a> {
    pub(crate) ast: &'a mut Ast,
    pub(crate) scopes: &'a mut ScopeArena,
    pub(crate) ctx: &'a mut AnalysisContext,
    imports: &'a mut ImportResolver,
    stack: Vec<ScopeId>,
    /// Enclosing functions, constructors and accessors, innermost last
    returns: Vec<NodeId>,
}

impl<'a> Walker<'a> {
    pub fn new(
        ast: &'a mut Ast,
        scopes: &'a mut ScopeArena,
        ctx: &'a mut AnalysisContext,
        imports: &'a mut ImportResolver,
    ) -> Self {
        Self {
            ast,
            scopes,
            ctx,
            imports,
            stack: Vec::new(),
            returns: Vec::new(),
        }
    }

    /// Walk the whole tree under `root` with the active phase
    pub fn walk(&mut self, root: NodeId) -> CompileResult<()> {
        debug!(
            phase = %self.ctx.phase(),
            compiled = self.ctx.compiled(),
            "walk"
        );
        self.ctx.begin_pass();
        self.stack.clear();
        self.returns.clear();
        self.walk_node(root, None)
    }

    pub(crate) fn walk_node(&mut self, id: NodeId, parent: Option<NodeId>) -> CompileResult<()> {
        self.ast.node_mut(id).parent = parent;
        self.structure(id)?;
        match self.ctx.phase() {
            Phase::Semantic => self.visit_semantic(id)?,
            Phase::Optimization => self.visit_optimization(id)?,
            Phase::Synthesis => self.visit_synthesis(id)?,
        }
        if self.ast.tag(id) == NodeTag::Variable {
            self.ast.ann_mut(id).visited_pass = self.ctx.pass();
        }
        Ok(())
    }

    /// Innermost scope
    pub(crate) fn scope(&self) -> CompileResult<ScopeId> {
        self.stack
            .last()
            .copied()
            .ok_or_else(|| CompileError::structural("No enclosing scope", None))
    }

    pub(crate) fn resolve(&self, name: Name) -> Option<Binding> {
        let scope = self.stack.last().copied()?;
        self.resolve_from(scope, name)
    }

    /// Resolve starting at `scope`. Scope tables are complete after the
    /// first pass, so a variable the current walk has not reached yet is
    /// skipped and the lookup continues outward.
    pub(crate) fn resolve_from(&self, scope: ScopeId, name: Name) -> Option<Binding> {
        self.scopes.resolve_visible(scope, name, |decl| {
            self.ast.tag(decl) != NodeTag::Variable
                || self.ast.ann(decl).visited_pass == self.ctx.pass()
        })
    }

    /// Nearest enclosing scope owner of the given kind
    pub(crate) fn enclosing(&self, tag: NodeTag) -> Option<NodeId> {
        let scope = self.stack.last().copied()?;
        self.scopes.by_kind(scope, self.ast, tag)
    }

    /// Innermost function, constructor or accessor being walked
    pub(crate) fn return_context(&self) -> Option<NodeId> {
        self.returns.last().copied()
    }

    /// Bind `name` in the innermost scope. On the first pass an existing
    /// local binding of another node is a redeclaration; once compiled the
    /// scopes are complete and nothing is registered again.
    pub(crate) fn declare(&mut self, name: Name, node: NodeId) -> CompileResult<()> {
        if self.ctx.compiled() {
            return Ok(());
        }
        let scope = self.scope()?;
        if let Some(existing) = self.scopes.lookup_local(scope, name)
            && existing != node
        {
            return Err(CompileError::redeclaration(
                format!("'{}' is already declared in this scope", self.ast.name(name)),
                self.ast.span(node),
            ));
        }
        trace!(name = self.ast.name(name), %node, %scope, "register");
        self.scopes.register(scope, name, node);
        Ok(())
    }

    /// Push the scope owned by `owner`, creating it on first sight. A new
    /// scope gets the named declarations of `body` hoisted into it.
    fn enter(&mut self, owner: NodeId, body: Option<NodeId>) -> CompileResult<bool> {
        if let Some(scope) = self.ast.ann(owner).context {
            self.stack.push(scope);
            return Ok(false);
        }
        let scope = self.scopes.create(owner, self.stack.last().copied());
        self.ast.ann_mut(owner).context = Some(scope);
        self.stack.push(scope);
        trace!(%owner, %scope, kind = %self.ast.tag(owner), "scope created");
        if let Some(body) = body {
            for stmt in self.statements(body) {
                self.hoist(stmt)?;
            }
        }
        Ok(true)
    }

    fn exit(&mut self) {
        self.stack.pop();
    }

    /// Register a function, class, enum or operator ahead of its block
    fn hoist(&mut self, stmt: NodeId) -> CompileResult<()> {
        let name = match self.ast.kind(stmt) {
            NodeKind::Function(func) => {
                let declared = match func.ret {
                    Some(ret) => Some(self.ast.type_desc(ret)),
                    None if !self.ctx.config().infer_return_types => {
                        Some(self.ast.native(NativeType::Void))
                    }
                    None => None,
                };
                let name = func.name;
                if let Some(ty) = declared {
                    self.ast.ann_mut(stmt).resolved_type = Some(ty);
                }
                name
            }
            NodeKind::Class(class) => class.name,
            NodeKind::Enum(decl) => decl.name,
            NodeKind::Operator(op) => op.symbol,
            _ => return Ok(()),
        };
        self.declare(name, stmt)
    }

    pub(crate) fn statements(&self, block: NodeId) -> Vec<NodeId> {
        match self.ast.kind(block) {
            NodeKind::Block { body } => body.clone(),
            _ => Vec::new(),
        }
    }

    fn statement_at(&self, block: NodeId, index: usize) -> Option<NodeId> {
        match self.ast.kind(block) {
            NodeKind::Block { body } => body.get(index).copied(),
            _ => None,
        }
    }

    /// Walk the statements of a body block; they hang off `owner`
    fn walk_statements(&mut self, block: NodeId, owner: NodeId) -> CompileResult<()> {
        self.ast.node_mut(block).parent = Some(owner);
        for stmt in self.statements(block) {
            self.walk_node(stmt, Some(owner))?;
        }
        Ok(())
    }

    /// Structural handler: recurse into children by node shape
    fn structure(&mut self, id: NodeId) -> CompileResult<()> {
        match self.ast.kind(id).clone() {
            NodeKind::Program { body } => self.walk_program(id, body),
            NodeKind::Block { .. } => {
                self.enter(id, Some(id))?;
                for stmt in self.statements(id) {
                    self.walk_node(stmt, Some(id))?;
                }
                self.exit();
                Ok(())
            }
            NodeKind::Variable(var) => {
                if var.is_pseudo {
                    self.ast.node_mut(var.init).parent = Some(id);
                    for accessor in self.statements(var.init) {
                        self.walk_node(accessor, Some(id))?;
                    }
                    Ok(())
                } else {
                    self.walk_node(var.init, Some(id))
                }
            }
            NodeKind::Function(func) => self.walk_callable(id, &func.params, func.body),
            NodeKind::Constructor(ctor) => self.walk_callable(id, &ctor.params, ctor.body),
            NodeKind::PseudoProperty(prop) => self.walk_callable(id, &prop.params, prop.body),
            NodeKind::Class(class) => {
                if !self.ctx.compiled() {
                    self.relocate_constructor(id, class.name, class.body)?;
                }
                self.enter(id, Some(class.body))?;
                self.walk_statements(class.body, id)?;
                self.exit();
                Ok(())
            }
            NodeKind::Enum(decl) => {
                if self.enter(id, None)? {
                    self.register_enum_keys(id, &decl.keys)?;
                }
                for (key, value) in self.enum_values(&decl.keys) {
                    self.walk_node(value, Some(key))?;
                }
                self.exit();
                Ok(())
            }
            NodeKind::Operator(op) => {
                self.enter(id, Some(op.body))?;
                self.walk_statements(op.body, id)?;
                self.exit();
                Ok(())
            }
            NodeKind::Binary {
                operator,
                left,
                right,
            } => {
                if self.ctx.phase() == Phase::Semantic {
                    self.mark_operator_operands(operator, left, right);
                }
                self.walk_node(left, Some(id))?;
                self.walk_node(right, Some(id))
            }
            NodeKind::Unary { argument, .. } => self.walk_node(argument, Some(id)),
            NodeKind::Ternary {
                test,
                consequent,
                alternate,
            } => {
                self.walk_node(test, Some(id))?;
                self.walk_node(consequent, Some(id))?;
                self.walk_node(alternate, Some(id))
            }
            NodeKind::Member { object, .. } => match object {
                Some(object) => self.walk_node(object, Some(id)),
                None => Ok(()),
            },
            NodeKind::Call { callee, arguments } => {
                if self.ctx.phase() == Phase::Semantic {
                    self.mark_call_arguments(callee, &arguments);
                }
                for argument in arguments {
                    self.walk_node(argument, Some(id))?;
                }
                Ok(())
            }
            NodeKind::If {
                test,
                consequent,
                alternate,
            } => {
                self.walk_node(test, Some(id))?;
                self.walk_node(consequent, Some(id))?;
                if let Some(alternate) = alternate {
                    if self.ast.tag(alternate) == NodeTag::If {
                        self.ast.ann_mut(alternate).is_alternate_if = true;
                    }
                    self.walk_node(alternate, Some(id))?;
                }
                Ok(())
            }
            NodeKind::While { test, body } => {
                self.enter(id, Some(body))?;
                self.walk_node(test, Some(id))?;
                self.walk_statements(body, id)?;
                self.exit();
                Ok(())
            }
            NodeKind::Return { argument } => match argument {
                Some(argument) => self.walk_node(argument, Some(id)),
                None => Ok(()),
            },
            NodeKind::Import { .. } => Err(CompileError::structural(
                "Imports are only allowed at the top level",
                self.ast.span(id),
            )),
            NodeKind::Literal(_)
            | NodeKind::TypeExpression(_)
            | NodeKind::Break
            | NodeKind::Continue
            | NodeKind::Precedence { .. }
            | NodeKind::Associativity { .. } => Ok(()),
        }
    }

    /// Functions, constructors and accessors: own scope, parameters, then
    /// the body as a return context
    fn walk_callable(&mut self, id: NodeId, params: &[NodeId], body: NodeId) -> CompileResult<()> {
        self.enter(id, Some(body))?;
        for param in params {
            self.walk_node(*param, Some(id))?;
        }
        self.returns.push(id);
        self.walk_statements(body, id)?;
        self.returns.pop();
        self.exit();
        Ok(())
    }

    fn walk_program(&mut self, id: NodeId, body: NodeId) -> CompileResult<()> {
        self.enter(id, Some(body))?;
        self.ast.node_mut(body).parent = Some(id);
        let mut index = 0;
        while let Some(stmt) = self.statement_at(body, index) {
            if let NodeKind::Import { specifiers } = self.ast.kind(stmt) {
                let specifiers = specifiers.clone();
                // The splice lands at `index`, which is walked next
                self.splice_import(body, index, stmt, &specifiers)?;
                continue;
            }
            self.walk_node(stmt, Some(id))?;
            index += 1;
        }
        self.exit();
        Ok(())
    }

    fn splice_import(
        &mut self,
        body: NodeId,
        index: usize,
        import: NodeId,
        specifiers: &[String],
    ) -> CompileResult<()> {
        let from = self.ast.ann(import).import_uid;
        let uid = self.ctx.next_uid();
        self.ast.ann_mut(import).import_uid = Some(uid);
        let statements = self.imports.load(self.ast, specifiers, from, uid)?;
        for stmt in &statements {
            self.ast.ann_mut(*stmt).import_uid = Some(uid);
        }
        if let NodeKind::Block { body } = self.ast.kind_mut(body) {
            body.splice(index..=index, statements.iter().copied());
        }
        debug!(uid, count = statements.len(), "import spliced");
        for stmt in statements {
            self.hoist(stmt)?;
        }
        Ok(())
    }

    /// Move the single constructor of a class to the end of its body
    fn relocate_constructor(&mut self, class: NodeId, name: Name, body: NodeId) -> CompileResult<()> {
        let members = self.statements(body);
        let ctors: Vec<NodeId> = members
            .iter()
            .copied()
            .filter(|member| self.ast.tag(*member) == NodeTag::Constructor)
            .collect();
        let ctor = match ctors.as_slice() {
            [ctor] => *ctor,
            [] => {
                return Err(CompileError::structural(
                    format!("Class '{}' has no constructor", self.ast.name(name)),
                    self.ast.span(class),
                ));
            }
            [_, second, ..] => {
                return Err(CompileError::structural(
                    format!("Class '{}' has more than one constructor", self.ast.name(name)),
                    self.ast.span(*second),
                ));
            }
        };
        if let NodeKind::Block { body } = self.ast.kind_mut(body) {
            body.retain(|member| *member != ctor);
            body.push(ctor);
        }
        self.ast.ann_mut(class).constructor = Some(ctor);
        Ok(())
    }
}
