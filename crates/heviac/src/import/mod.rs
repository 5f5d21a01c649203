//! Module imports
//!
//! `import "math"` resolves, relative to the importing file, to
//! `math.hevia` or to `math/index.hevia` when `math` is a directory. The
//! module is parsed by the host's [`SourceParser`] straight into the same
//! [`Ast`] and its top-level statements are spliced into the program.

use crate::ast::{Ast, NodeId, NodeKind};
use crate::common::{CompileError, CompileResult};
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where module text comes from
pub trait SourceProvider {
    fn read(&self, path: &Path) -> io::Result<String>;

    fn is_file(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;
}

/// Reads modules from disk
#[derive(Debug, Default, Clone, Copy)]
pub struct FsProvider;

impl SourceProvider for FsProvider {
    fn read(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }
}

/// In-memory module set, keyed by path
#[derive(Debug, Default, Clone)]
pub struct MemoryProvider {
    files: HashMap<PathBuf, String>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, source: impl Into<String>) {
        self.files.insert(path.into(), source.into());
    }
}

impl SourceProvider for MemoryProvider {
    fn read(&self, path: &Path) -> io::Result<String> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
    }

    fn is_file(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.files.keys().any(|file| file != path && file.starts_with(path))
    }
}

/// Turns module text into nodes of an existing tree
pub trait SourceParser {
    /// Parse `source` into `ast` and return the new Program node
    fn parse(&self, source: &str, path: &Path, ast: &mut Ast) -> CompileResult<NodeId>;
}

/// A resolved module file and the directory its own imports resolve from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModulePath {
    pub file: PathBuf,
    pub dir: PathBuf,
}

/// Resolves and loads imported modules
pub struct ImportResolver {
    provider: Box<dyn SourceProvider>,
    parser: Option<Box<dyn SourceParser>>,
    root: PathBuf,
    extension: String,
    /// Base directory of every spliced import, by uid
    dirs: HashMap<u32, PathBuf>,
    /// Import that spliced in the node carrying each uid
    parents: HashMap<u32, Option<u32>>,
    /// Module files loaded by each uid
    files: HashMap<u32, Vec<PathBuf>>,
    loaded: HashSet<PathBuf>,
    entry: Option<PathBuf>,
}

impl ImportResolver {
    pub fn new(provider: Box<dyn SourceProvider>) -> Self {
        Self {
            provider,
            parser: None,
            root: PathBuf::from("."),
            extension: "hevia".to_string(),
            dirs: HashMap::new(),
            parents: HashMap::new(),
            files: HashMap::new(),
            loaded: HashSet::new(),
            entry: None,
        }
    }

    pub fn set_parser(&mut self, parser: Box<dyn SourceParser>) {
        self.parser = Some(parser);
    }

    pub fn parser(&self) -> Option<&dyn SourceParser> {
        self.parser.as_deref()
    }

    pub fn provider(&self) -> &dyn SourceProvider {
        self.provider.as_ref()
    }

    /// Directory imports of the entry file resolve from
    pub fn set_root(&mut self, root: impl Into<PathBuf>) {
        self.root = root.into();
    }

    /// File the program itself was read from, so that importing it back
    /// is reported as a cycle
    pub fn set_entry(&mut self, entry: impl Into<PathBuf>) {
        self.entry = Some(entry.into());
    }

    /// Forget the modules of a previous compilation
    pub fn reset(&mut self) {
        self.dirs.clear();
        self.parents.clear();
        self.files.clear();
        self.loaded.clear();
    }

    pub fn set_extension(&mut self, extension: impl Into<String>) {
        self.extension = extension.into();
    }

    /// Base directory for an import node spliced in by import `uid`, or the
    /// entry directory for imports written in the entry file
    pub fn base_dir(&self, uid: Option<u32>) -> &Path {
        uid.and_then(|uid| self.dirs.get(&uid))
            .map(PathBuf::as_path)
            .unwrap_or(self.root.as_path())
    }

    pub fn resolve(&self, base: &Path, specifier: &str) -> CompileResult<ModulePath> {
        let file = base.join(format!("{}.{}", specifier, self.extension));
        if self.provider.is_file(&file) {
            return Ok(ModulePath {
                file,
                dir: base.to_path_buf(),
            });
        }
        let dir = base.join(specifier);
        if self.provider.is_dir(&dir) {
            let file = dir.join(format!("index.{}", self.extension));
            if self.provider.is_file(&file) {
                return Ok(ModulePath { file, dir });
            }
        }
        Err(CompileError::import(
            format!("Cannot resolve module '{}'", specifier),
            file,
        ))
    }

    /// Whether `file` is the entry file or was loaded by the import chain
    /// that leads to `from`
    fn in_chain(&self, file: &Path, from: Option<u32>) -> bool {
        if self.entry.as_deref() == Some(file) {
            return true;
        }
        let mut current = from;
        while let Some(uid) = current {
            if self.files.get(&uid).is_some_and(|files| files.iter().any(|f| f == file)) {
                return true;
            }
            current = self.parents.get(&uid).copied().flatten();
        }
        false
    }

    /// Load every specifier of one import and return the top-level
    /// statements to splice, in order. A module already spliced through
    /// another import is skipped; one that imports itself back through
    /// the chain is an error.
    pub fn load(
        &mut self,
        ast: &mut Ast,
        specifiers: &[String],
        from: Option<u32>,
        uid: u32,
    ) -> CompileResult<Vec<NodeId>> {
        let base = self.base_dir(from).to_path_buf();
        self.parents.insert(uid, from);
        let mut statements = Vec::new();
        for specifier in specifiers {
            let module = self.resolve(&base, specifier)?;
            if self.in_chain(&module.file, from) {
                return Err(CompileError::import(
                    format!("Cyclic import of '{}'", specifier),
                    module.file,
                ));
            }
            if !self.loaded.insert(module.file.clone()) {
                debug!(module = %module.file.display(), "already imported");
                continue;
            }
            self.files.entry(uid).or_default().push(module.file.clone());
            let source = self
                .provider
                .read(&module.file)
                .map_err(|e| CompileError::import(e.to_string(), &module.file))?;
            let parser = self.parser.as_deref().ok_or_else(|| {
                CompileError::import("No parser registered for imports", &module.file)
            })?;
            let program = parser.parse(&source, &module.file, ast)?;
            debug!(module = %module.file.display(), uid, "import loaded");
            statements.extend(program_statements(ast, program)?);
            // Nested imports of a directory module resolve from that directory
            self.dirs.insert(uid, module.dir);
        }
        Ok(statements)
    }
}

impl Default for ImportResolver {
    fn default() -> Self {
        Self::new(Box::new(FsProvider))
    }
}

fn program_statements(ast: &Ast, program: NodeId) -> CompileResult<Vec<NodeId>> {
    let NodeKind::Program { body } = ast.kind(program) else {
        return Err(CompileError::structural(
            format!("Parser returned '{}' instead of a program", ast.tag(program)),
            ast.span(program),
        ));
    };
    match ast.kind(*body) {
        NodeKind::Block { body } => Ok(body.clone()),
        _ => Err(CompileError::structural(
            "Program body is not a block",
            ast.span(program),
        )),
    }
}
