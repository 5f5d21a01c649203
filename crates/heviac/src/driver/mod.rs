//! Compilation driver and phase orchestration

mod emit;

pub use emit::{Emitter, EmitterOutput, EmitterRegistry, OutlineEmitter};

use crate::ast::{Ast, NodeId, NodeTag};
use crate::common::{CompileError, CompileResult};
use crate::import::{ImportResolver, SourceParser, SourceProvider};
use crate::sema::ScopeArena;
use crate::walk::{AnalysisConfig, AnalysisContext, Phase, Walker, Writer};
use std::path::Path;
use tracing::{debug, info};

/// Scopes and context left behind by a finished analysis
#[derive(Debug)]
pub struct Analysis {
    pub root: NodeId,
    pub scopes: ScopeArena,
    pub context: AnalysisContext,
}

/// Runs the analysis phases over a program and hands the result to the
/// registered emitters
pub struct Compiler {
    config: AnalysisConfig,
    imports: ImportResolver,
    emitters: EmitterRegistry,
}

impl Compiler {
    pub fn new(config: AnalysisConfig) -> Self {
        Self::with_imports(config, ImportResolver::default())
    }

    pub fn with_provider(config: AnalysisConfig, provider: Box<dyn SourceProvider>) -> Self {
        Self::with_imports(config, ImportResolver::new(provider))
    }

    fn with_imports(config: AnalysisConfig, mut imports: ImportResolver) -> Self {
        imports.set_extension(config.source_extension.clone());
        Self {
            config,
            imports,
            emitters: EmitterRegistry::new(),
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn set_parser(&mut self, parser: Box<dyn SourceParser>) {
        self.imports.set_parser(parser);
    }

    /// Directory the entry file's imports resolve from
    pub fn set_root(&mut self, root: impl AsRef<Path>) {
        self.imports.set_root(root.as_ref());
    }

    pub fn imports(&self) -> &ImportResolver {
        &self.imports
    }

    pub fn register_emitter(&mut self, emitter: Box<dyn Emitter>) -> CompileResult<()> {
        self.emitters.register(emitter)
    }

    pub fn emitters(&self) -> &EmitterRegistry {
        &self.emitters
    }

    /// Two semantic passes, then optimization, then synthesis
    pub fn analyze(&mut self, ast: &mut Ast) -> CompileResult<Analysis> {
        let root = program_root(ast)?;
        self.imports.reset();
        let mut scopes = ScopeArena::new(ast);
        let mut context = AnalysisContext::new(self.config.clone());

        self.run(ast, &mut scopes, &mut context, root)?;
        context.mark_compiled();
        self.run(ast, &mut scopes, &mut context, root)?;
        if self.config.dump_ast {
            debug!("annotated tree:\n{}", ast.dump(root));
        }

        context.set_phase(Phase::Optimization);
        self.run(ast, &mut scopes, &mut context, root)?;
        context.set_phase(Phase::Synthesis);
        self.run(ast, &mut scopes, &mut context, root)?;

        info!(nodes = ast.len(), scopes = scopes.len(), "analysis complete");
        Ok(Analysis {
            root,
            scopes,
            context,
        })
    }

    /// Analyze and run every emitter in registration order
    pub fn compile(&mut self, ast: &mut Ast) -> CompileResult<Vec<EmitterOutput>> {
        let analysis = self.analyze(ast)?;
        let mut outputs = Vec::new();
        for emitter in self.emitters.list() {
            let mut writer = Writer::new(analysis.context.phase());
            emitter.emit(ast, analysis.root, &mut writer)?;
            debug!(emitter = emitter.name(), bytes = writer.as_str().len(), "emitted");
            outputs.push(EmitterOutput {
                name: emitter.name(),
                text: writer.finish(),
            });
        }
        Ok(outputs)
    }

    /// Read and parse an entry file through the registered provider and
    /// parser, then compile it. Its imports resolve from its directory.
    pub fn compile_file(&mut self, path: &Path) -> CompileResult<(Ast, Vec<EmitterOutput>)> {
        let source = self
            .imports
            .provider()
            .read(path)
            .map_err(|e| CompileError::import(e.to_string(), path))?;
        let parser = self
            .imports
            .parser()
            .ok_or_else(|| CompileError::import("No parser registered", path))?;
        let mut ast = Ast::new();
        let root = parser.parse(&source, path, &mut ast)?;
        ast.set_root(root);
        if let Some(dir) = path.parent() {
            self.imports.set_root(dir);
        }
        self.imports.set_entry(path);
        let outputs = self.compile(&mut ast)?;
        Ok((ast, outputs))
    }

    fn run(
        &mut self,
        ast: &mut Ast,
        scopes: &mut ScopeArena,
        context: &mut AnalysisContext,
        root: NodeId,
    ) -> CompileResult<()> {
        Walker::new(ast, scopes, context, &mut self.imports).walk(root)
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new(AnalysisConfig::default())
    }
}

fn program_root(ast: &Ast) -> CompileResult<NodeId> {
    let root = ast
        .root()
        .ok_or_else(|| CompileError::structural("Tree has no program root", None))?;
    if ast.tag(root) != NodeTag::Program {
        return Err(CompileError::structural(
            format!("Expected a program at the root, found '{}'", ast.tag(root)),
            ast.span(root),
        ));
    }
    Ok(root)
}

#[cfg(test)]
mod tests;
