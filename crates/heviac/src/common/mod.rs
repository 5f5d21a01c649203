//! Common infrastructure shared across the analysis phases

mod error;
mod span;

pub use error::{CompileError, CompileResult, DiagnosticReporter, ErrorKind};
pub use span::Span;
