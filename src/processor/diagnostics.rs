//! Side channel for everything the pipeline reports but recovers from.
//!
//! Nothing in the front end aborts on bad input. Each stage reports what it
//! skipped or defaulted here and carries on with the largest partial result.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize)]
pub enum DiagnosticKind {
    /// Unrecognised character or unterminated span; lexing stopped.
    #[error("lex error")]
    Lex,
    /// Malformed statement shape; statement skipped.
    #[error("syntax error")]
    Syntax,
    /// Unknown type tag or arity mismatch; value defaulted or padded.
    #[error("type error")]
    Type,
    /// Name not found; zero value returned.
    #[error("lookup miss")]
    LookupMiss,
    /// Name already present; first entry kept.
    #[error("duplicate key")]
    DuplicateKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("line {line}: {kind}: {message}")]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a diagnostic and logs it as a warning.
    pub fn report(&mut self, kind: DiagnosticKind, line: usize, message: impl Into<String>) {
        let diagnostic = Diagnostic {
            kind,
            line,
            message: message.into(),
        };
        log::warn!("{diagnostic}");
        self.items.push(diagnostic);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.items.iter().filter(|d| d.kind == kind).count()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

/// A best-effort result together with everything reported while producing it.
#[derive(Debug, Clone, Serialize)]
pub struct Parsed<T> {
    pub value: T,
    pub diagnostics: Diagnostics,
}

impl<T> Parsed<T> {
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}
