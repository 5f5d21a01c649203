//! Emitter trait and registry
//!
//! Emitters read the fully annotated tree after the synthesis phase and
//! write target text through a [`Writer`]. They never re-derive what the
//! analysis already recorded.

use crate::ast::{Ast, NodeId};
use crate::common::{CompileError, CompileResult};
use crate::walk::Writer;

/// Text produced by one emitter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitterOutput {
    pub name: &'static str,
    pub text: String,
}

/// Trait for code emitters
pub trait Emitter: Send + Sync {
    /// The name of this emitter (e.g., "c", "llvm")
    fn name(&self) -> &'static str;

    /// Write the annotated program under `root`
    fn emit(&self, ast: &Ast, root: NodeId, writer: &mut Writer) -> CompileResult<()>;
}

/// Registry of emitters, run in registration order
pub struct EmitterRegistry {
    emitters: Vec<Box<dyn Emitter>>,
}

impl EmitterRegistry {
    pub fn new() -> Self {
        Self { emitters: Vec::new() }
    }

    pub fn register(&mut self, emitter: Box<dyn Emitter>) -> CompileResult<()> {
        if self.find_by_name(emitter.name()).is_some() {
            return Err(CompileError::structural(
                format!("Emitter '{}' is already registered", emitter.name()),
                None,
            ));
        }
        self.emitters.push(emitter);
        Ok(())
    }

    pub fn find_by_name(&self, name: &str) -> Option<&dyn Emitter> {
        self.emitters
            .iter()
            .find(|e| e.name() == name)
            .map(|e| e.as_ref())
    }

    pub fn list(&self) -> impl Iterator<Item = &dyn Emitter> {
        self.emitters.iter().map(|e| e.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.emitters.is_empty()
    }
}

impl Default for EmitterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Writes the annotated tree as an indented outline. Handy for checking
/// what the analysis produced.
pub struct OutlineEmitter;

impl Emitter for OutlineEmitter {
    fn name(&self) -> &'static str {
        "outline"
    }

    fn emit(&self, ast: &Ast, root: NodeId, writer: &mut Writer) -> CompileResult<()> {
        for line in ast.dump(root).lines() {
            writer.line(line);
        }
        Ok(())
    }
}
