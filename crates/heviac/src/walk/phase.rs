//! Phases, analysis state and the phase-gated writer

use std::fmt;
use tracing::debug;

/// Which visitor set runs on the next walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Semantic,
    Optimization,
    Synthesis,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Semantic => "semantic",
            Phase::Optimization => "optimization",
            Phase::Synthesis => "synthesis",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration options for the analysis passes
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Infer a function's type from its first return when none is declared
    pub infer_return_types: bool,
    /// Give shadowing variables a unique emit name during synthesis
    pub rename_identifiers: bool,
    /// Extension of importable modules, without the dot
    pub source_extension: String,
    /// Dump the annotated tree through `tracing` after the semantic passes
    pub dump_ast: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            infer_return_types: true,
            rename_identifiers: true,
            source_extension: "hevia".to_string(),
            dump_ast: false,
        }
    }
}

/// Mutable state shared by every walk of one compilation
#[derive(Debug)]
pub struct AnalysisContext {
    phase: Phase,
    compiled: bool,
    uid: u32,
    renames: u32,
    pass: u32,
    config: AnalysisConfig,
}

impl AnalysisContext {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            phase: Phase::Semantic,
            compiled: false,
            uid: 0,
            renames: 0,
            pass: 0,
            config,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Switch to `phase`. The previous phase is fully dropped first, so
    /// exactly one phase is ever active.
    pub fn set_phase(&mut self, phase: Phase) {
        debug!(from = %self.phase, to = %phase, "phase switch");
        self.phase = phase;
    }

    /// Whether the first semantic pass has completed
    pub fn compiled(&self) -> bool {
        self.compiled
    }

    pub fn mark_compiled(&mut self) {
        self.compiled = true;
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Start a new walk over the tree
    pub fn begin_pass(&mut self) -> u32 {
        self.pass += 1;
        self.pass
    }

    /// Number of the walk in progress, counting from 1
    pub fn pass(&self) -> u32 {
        self.pass
    }

    /// Next synthetic id for spliced imports
    pub fn next_uid(&mut self) -> u32 {
        self.uid += 1;
        self.uid
    }

    /// Next suffix for a renamed identifier
    pub fn next_rename(&mut self) -> u32 {
        self.renames += 1;
        self.renames
    }
}

impl Default for AnalysisContext {
    fn default() -> Self {
        Self::new(AnalysisConfig::default())
    }
}

/// Text sink handed to emitters.
///
/// Writes and indentation are dropped unless the writer was opened for
/// [`Phase::Synthesis`], so a stray emit during analysis produces nothing.
#[derive(Debug)]
pub struct Writer {
    active: bool,
    buffer: String,
    indent: usize,
    padding: &'static str,
    at_line_start: bool,
}

impl Writer {
    pub fn new(phase: Phase) -> Self {
        Self {
            active: phase == Phase::Synthesis,
            buffer: String::new(),
            indent: 0,
            padding: "  ",
            at_line_start: true,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn write(&mut self, text: &str) {
        if !self.active || text.is_empty() {
            return;
        }
        if self.at_line_start {
            for _ in 0..self.indent {
                self.buffer.push_str(self.padding);
            }
            self.at_line_start = false;
        }
        self.buffer.push_str(text);
    }

    pub fn newline(&mut self) {
        if !self.active {
            return;
        }
        self.buffer.push('\n');
        self.at_line_start = true;
    }

    pub fn line(&mut self, text: &str) {
        self.write(text);
        self.newline();
    }

    pub fn indent(&mut self) {
        if self.active {
            self.indent += 1;
        }
    }

    pub fn dedent(&mut self) {
        if self.active {
            self.indent = self.indent.saturating_sub(1);
        }
    }

    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    pub fn finish(self) -> String {
        self.buffer
    }
}
