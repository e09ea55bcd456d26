//! Unified error handling.
//!
//! Every phase reports its own error type; this module folds them into one
//! enum with a position and a driver-friendly display format
//! (`FILE:LINE:COL : MESSAGE`).


use std::fmt;

use crate::lexer::{LexError, Position};
use crate::parser::ParseError;
use crate::runtime::RuntimeError;

#[derive(Debug, Clone, PartialEq)]
pub enum VesperError {
    Lex { message: String, pos: Position },
    Parse { message: String, pos: Position },
    Runtime {
        message: String,
        pos: Option<Position>,
    },
}

impl VesperError {
    pub fn runtime_bare(message: impl Into<String>) -> Self {
        VesperError::Runtime {
            message: message.into(),
            pos: None,
        }
    }

    /// Short phase tag, mostly for diagnostics and tests.
    pub fn kind(&self) -> &'static str {
        match self {
            VesperError::Lex { .. } => "LexError",
            VesperError::Parse { .. } => "ParseError",
            VesperError::Runtime { .. } => "RuntimeError",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            VesperError::Lex { message, .. }
            | VesperError::Parse { message, .. }
            | VesperError::Runtime { message, .. } => message,
        }
    }

    pub fn position(&self) -> Option<&Position> {
        match self {
            VesperError::Lex { pos, .. } | VesperError::Parse { pos, .. } => Some(pos),
            VesperError::Runtime { pos, .. } => pos.as_ref(),
        }
    }
}

impl fmt::Display for VesperError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position() {
            Some(pos) => write!(f, "{} : {}", pos, self.message()),
            None => f.write_str(self.message()),
        }
    }
}

impl std::error::Error for VesperError {}

impl From<LexError> for VesperError {
    fn from(err: LexError) -> Self {
        VesperError::Lex {
            message: err.to_string(),
            pos: err.position().clone(),
        }
    }
}

impl From<ParseError> for VesperError {
    fn from(err: ParseError) -> Self {
        VesperError::Parse {
            message: err.message,
            pos: err.pos,
        }
    }
}

impl From<RuntimeError> for VesperError {
    fn from(err: RuntimeError) -> Self {
        VesperError::Runtime {
            message: err.message,
            pos: err.pos,
        }
    }
}
