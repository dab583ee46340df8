//! Centralised error hierarchy for the **Lox interpreter**.
//!
//! All subsystems (scanner, parser, resolver, runtime, CLI) must convert their
//! internal failure modes into one of the variants defined here.  This enables a
//! uniform `Result<T>` alias throughout the crate and ergonomic inter‑operation
//! with `anyhow`, while still preserving rich diagnostic detail.
//!
//! The module **does not** print diagnostics itself — that belongs to the
//! driver, which also maps variants onto process exit codes.

use std::io;
use thiserror::Error;

use log::info;

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoxError {
    /// Lexical (scanner) error with source line information.
    #[error("[line {line}] Error: {message}")]
    Lex {
        /// Human‑readable description.
        message: String,

        /// 1‑based line where the error occurred.
        line: usize,
    },

    /// Syntactic (parser) error.
    #[error("[line {line}] Error: {message}")]
    Parse { message: String, line: usize },

    /// Static‑analysis or resolution failure (e.g. early‑binding errors).
    #[error("[line {line}] Error: {message}")]
    Resolve { message: String, line: usize },

    /// Runtime evaluation error.
    #[error("{message}\n[line {line}]")]
    Runtime { message: String, line: usize },

    /// Wrapper around `std::io::Error` (transparent).  Enables `?` on I/O ops.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// UTF‑8 validation failure when ingesting external text.
    #[error(transparent)]
    Utf8(#[from] std::str::Utf8Error),
}

impl LoxError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", line, message);

        LoxError::Lex { message, line }
    }

    /// Helper constructor for the **parser**.
    pub fn parse<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Parse error: line={}, msg={}", line, message);

        LoxError::Parse { message, line }
    }

    /// Helper constructor for the **resolver**.
    pub fn resolve<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Resolve error: line={}, msg={}", line, message);

        LoxError::Resolve { message, line }
    }

    /// Helper constructor for the **evaluator**.
    pub fn runtime<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Runtime error: line={}, msg={}", line, message);

        LoxError::Runtime { message, line }
    }

    /// Is this a compile‑time (lex/parse/resolve) diagnostic, as opposed to a
    /// runtime failure?  The driver uses this to pick the exit code.
    pub fn is_compiletime(&self) -> bool {
        matches!(
            self,
            LoxError::Lex { .. } | LoxError::Parse { .. } | LoxError::Resolve { .. }
        )
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, LoxError>;
