//! Hevia compiler - semantic core
//!
//! This library analyzes a parsed Hevia program and annotates its tree for
//! the code emitters that follow.
//!
//! ## Architecture
//!
//! The compiler is organized into:
//! - **AST** (`ast/`): Arena tree, annotations and a builder for front ends
//! - **Walker** (`walk/`): One traversal, dispatched by phase
//! - **Semantic analysis** (`sema/`): Scopes, types, references, members and calls
//! - **Imports** (`import/`): Module resolution and splicing
//! - **Optimization** (`optimize/`): Constant folding
//! - **Synthesis** (`synthesis/`): Emitter-facing annotations
//! - **Driver** (`driver/`): Phase pipeline and emitter registry
//! - **Common** (`common/`): Shared infrastructure (errors, spans)
//! - **Types** (`types/`): Native types and operators

pub mod common;
pub mod types;
pub mod ast;
pub mod walk;
pub mod sema;
pub mod import;
pub mod optimize;
pub mod synthesis;
pub mod driver;

// Re-exports for convenience
pub use common::{CompileError, CompileResult, DiagnosticReporter, ErrorKind, Span};
pub use ast::{Ast, AstBuilder, NodeId, NodeKind, NodeTag};
pub use walk::{AnalysisConfig, AnalysisContext, Phase, Walker, Writer};
pub use sema::{ScopeArena, ScopeId};
pub use import::{ImportResolver, MemoryProvider, SourceParser, SourceProvider};
pub use driver::{Analysis, Compiler, Emitter, EmitterOutput, EmitterRegistry, OutlineEmitter};
