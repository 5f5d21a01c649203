//! Error types and diagnostic reporting

use codespan_reporting::diagnostic::{Diagnostic, Label};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{Buffer, ColorChoice, StandardStream, WriteColor};
use std::path::PathBuf;
use thiserror::Error;
use super::Span;

fn at(span: &Option<Span>) -> String {
    match span {
        Some(span) => format!(" at {}", span),
        None => String::new(),
    }
}

/// Compile error with optional source location.
///
/// Every variant is fatal; the walker stops at the first one.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("{message}{}", at(.span))]
    NameResolution { message: String, span: Option<Span> },

    #[error("{message}{}", at(.span))]
    Redeclaration { message: String, span: Option<Span> },

    #[error("{message}{}", at(.span))]
    TypeMismatch { message: String, span: Option<Span> },

    #[error("{message}{}", at(.span))]
    Arity { message: String, span: Option<Span> },

    #[error("{message}{}", at(.span))]
    Mutability { message: String, span: Option<Span> },

    #[error("{message}{}", at(.span))]
    Structural { message: String, span: Option<Span> },

    #[error("Import error: {message} ({})", .path.display())]
    Import { message: String, path: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error category, for callers that branch on the kind of failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NameResolution,
    Redeclaration,
    TypeMismatch,
    Arity,
    Mutability,
    Structural,
    Import,
    Io,
}

impl CompileError {
    pub fn name_resolution(message: impl Into<String>, span: Option<Span>) -> Self {
        Self::NameResolution {
            message: message.into(),
            span,
        }
    }

    pub fn redeclaration(message: impl Into<String>, span: Option<Span>) -> Self {
        Self::Redeclaration {
            message: message.into(),
            span,
        }
    }

    pub fn type_mismatch(message: impl Into<String>, span: Option<Span>) -> Self {
        Self::TypeMismatch {
            message: message.into(),
            span,
        }
    }

    pub fn arity(message: impl Into<String>, span: Option<Span>) -> Self {
        Self::Arity {
            message: message.into(),
            span,
        }
    }

    pub fn mutability(message: impl Into<String>, span: Option<Span>) -> Self {
        Self::Mutability {
            message: message.into(),
            span,
        }
    }

    pub fn structural(message: impl Into<String>, span: Option<Span>) -> Self {
        Self::Structural {
            message: message.into(),
            span,
        }
    }

    pub fn import(message: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::Import {
            message: message.into(),
            path: path.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CompileError::NameResolution { .. } => ErrorKind::NameResolution,
            CompileError::Redeclaration { .. } => ErrorKind::Redeclaration,
            CompileError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            CompileError::Arity { .. } => ErrorKind::Arity,
            CompileError::Mutability { .. } => ErrorKind::Mutability,
            CompileError::Structural { .. } => ErrorKind::Structural,
            CompileError::Import { .. } => ErrorKind::Import,
            CompileError::Io(_) => ErrorKind::Io,
        }
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            CompileError::NameResolution { span, .. }
            | CompileError::Redeclaration { span, .. }
            | CompileError::TypeMismatch { span, .. }
            | CompileError::Arity { span, .. }
            | CompileError::Mutability { span, .. }
            | CompileError::Structural { span, .. } => *span,
            CompileError::Import { .. } | CompileError::Io(_) => None,
        }
    }

    /// The bare message, without the location suffix
    pub fn message(&self) -> String {
        match self {
            CompileError::NameResolution { message, .. }
            | CompileError::Redeclaration { message, .. }
            | CompileError::TypeMismatch { message, .. }
            | CompileError::Arity { message, .. }
            | CompileError::Mutability { message, .. }
            | CompileError::Structural { message, .. }
            | CompileError::Import { message, .. } => message.clone(),
            CompileError::Io(err) => err.to_string(),
        }
    }
}

pub type CompileResult<T> = Result<T, CompileError>;

/// Diagnostic reporter for pretty error output
pub struct DiagnosticReporter {
    files: SimpleFiles<String, String>,
    writer: StandardStream,
    config: term::Config,
}

impl DiagnosticReporter {
    pub fn new() -> Self {
        Self {
            files: SimpleFiles::new(),
            writer: StandardStream::stderr(ColorChoice::Auto),
            config: term::Config::default(),
        }
    }

    pub fn add_file(&mut self, name: impl Into<String>, source: impl Into<String>) -> usize {
        self.files.add(name.into(), source.into())
    }

    fn diagnostic(&self, file_id: usize, error: &CompileError) -> Diagnostic<usize> {
        let title = match error.kind() {
            ErrorKind::NameResolution => "Name resolution error",
            ErrorKind::Redeclaration => "Redeclaration error",
            ErrorKind::TypeMismatch => "Type error",
            ErrorKind::Arity => "Arity error",
            ErrorKind::Mutability => "Mutability error",
            ErrorKind::Structural => "Structural error",
            ErrorKind::Import => "Import error",
            ErrorKind::Io => "IO error",
        };

        let diagnostic = Diagnostic::error().with_message(title);
        match error.span() {
            Some(span) if !span.is_empty() => diagnostic.with_labels(vec![
                Label::primary(file_id, span.start..span.end).with_message(error.message()),
            ]),
            _ => diagnostic.with_notes(vec![error.to_string()]),
        }
    }

    pub fn report_error(&self, file_id: usize, error: &CompileError) {
        let diagnostic = self.diagnostic(file_id, error);
        let _ = term::emit(&mut self.writer.lock(), &self.config, &self.files, &diagnostic);
    }

    /// Render into any color-aware sink instead of stderr
    pub fn emit_to(
        &self,
        sink: &mut dyn WriteColor,
        file_id: usize,
        error: &CompileError,
    ) -> Result<(), codespan_reporting::files::Error> {
        let diagnostic = self.diagnostic(file_id, error);
        term::emit(sink, &self.config, &self.files, &diagnostic)
    }

    pub fn render(&self, file_id: usize, error: &CompileError) -> String {
        let mut buffer = Buffer::no_color();
        if self.emit_to(&mut buffer, file_id, error).is_err() {
            return error.to_string();
        }
        String::from_utf8_lossy(buffer.as_slice()).into_owned()
    }
}

impl Default for DiagnosticReporter {
    fn default() -> Self {
        Self::new()
    }
}
