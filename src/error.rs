//! Error handling module for the lexforge translator.
//!
//! Structured error types using `thiserror`, modeled one-to-one on the error
//! kinds spec.md §7 names. All variants are fatal: the translator never
//! retries or partially recovers from a malformed `.l` source.

use thiserror::Error;

/// Main error type for the lexforge translator.
#[derive(Error, Debug)]
pub enum LexForgeError {
    /// Unknown directive, unsplittable PROLOGUE line, unterminated `%{` block,
    /// second `/` in one pattern, unescaped `$` after a trailing context `/`.
    #[error("{0}:{1}: syntax error: {2}")]
    Syntax(String, usize, String),

    /// `{NAME}` where NAME is neither a defined substitution nor a valid
    /// repetition range.
    #[error("{0}:{1}: no such substitution or repetition range: {2}")]
    UndefinedReference(String, usize, String),

    /// `{N,M}` with M < N.
    #[error("{0}:{1}: invalid repetition range {2}-{3}")]
    MalformedRepetition(String, usize, i64, i64),

    /// Unbalanced braces across an action's continuation lines.
    #[error("{0}:{1}: unterminated action block (missing closing '}}')")]
    MalformedAction(String, usize),

    /// The action body failed to parse as Rust statements.
    #[error("{0}:{1}: failed to parse action block as Rust: {2}")]
    ActionParse(String, usize, String),

    /// Errors surfaced while reading the source or writing the output.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure to initialize the logging subsystem.
    #[error("logging initialization failed: {0}")]
    Logging(String),
}

impl LexForgeError {
    /// The 1-based source line number this error is anchored to, if any.
    pub fn line(&self) -> Option<usize> {
        match self {
            LexForgeError::Syntax(_, line, _) => Some(*line),
            LexForgeError::UndefinedReference(_, line, _) => Some(*line),
            LexForgeError::MalformedRepetition(_, line, _, _) => Some(*line),
            LexForgeError::MalformedAction(_, line) => Some(*line),
            LexForgeError::ActionParse(_, line, _) => Some(*line),
            LexForgeError::Io(_) | LexForgeError::Logging(_) => None,
        }
    }
}

/// Result type alias used throughout the translator.
pub type Result<T> = std::result::Result<T, LexForgeError>;
