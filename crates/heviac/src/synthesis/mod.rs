//! Synthesis visitors
//!
//! Last annotations before the emitters run: construction calls are
//! flagged, and variables that shadow an outer binding get a unique name
//! so flat targets can declare them side by side.

use crate::ast::{LiteralKind, Name, NodeId, NodeKind};
use crate::common::CompileResult;
use crate::sema::Binding;
use crate::walk::Walker;
use tracing::debug;

impl Walker<'_> {
    pub(crate) fn visit_synthesis(&mut self, id: NodeId) -> CompileResult<()> {
        match self.ast.kind(id) {
            NodeKind::Call { .. } => {
                if self.ast.ann(id).is_instantiated_class {
                    self.ast.ann_mut(id).is_class_creation = true;
                }
            }
            NodeKind::Variable(var) => {
                let name = var.name;
                if self.ctx.config().rename_identifiers
                    && !self.ast.ann(id).is_class_property
                    && self.shadows(name)?
                {
                    let emit = format!("{}_{}", self.ast.name(name), self.ctx.next_rename());
                    debug!(from = self.ast.name(name), to = %emit, "rename");
                    let emit = self.ast.intern(&emit);
                    self.ast.ann_mut(id).emit_name = Some(emit);
                }
            }
            NodeKind::Literal(lit) if lit.kind == LiteralKind::Identifier => {
                let renamed = self
                    .resolve(lit.value)
                    .and_then(Binding::decl)
                    .and_then(|decl| self.ast.ann(decl).emit_name);
                if renamed.is_some() {
                    self.ast.ann_mut(id).emit_name = renamed;
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Whether `name` is already bound outside the innermost scope
    fn shadows(&self, name: Name) -> CompileResult<bool> {
        let scope = self.scope()?;
        Ok(self
            .scopes
            .parent(scope)
            .and_then(|parent| self.resolve_from(parent, name))
            .is_some())
    }
}
