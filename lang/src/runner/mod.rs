//! Driver-facing entry points.
//!
//! A [`Session`] owns a persistent global environment and the evaluator's
//! stop flag, and exposes evaluate-string / evaluate-stream operations.
//! Parse and lex errors refuse evaluation outright; runtime errors come
//! back as a single terminating error.

#[cfg(test)]
mod tests;

use std::io::Read;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::VesperError;
use crate::lexer::Lexer;
use crate::parser::ast::Program;
use crate::parser::Parser;
use crate::runtime::{Environment, Evaluator, Value};

/// An evaluation session: a global environment that survives across calls
/// (the REPL leans on this) plus a cooperative cancellation flag.
pub struct Session {
    env: Rc<Environment>,
    evaluator: Evaluator,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            env: Environment::new(),
            evaluator: Evaluator::new(),
        }
    }

    /// Shared flag a driver may set (from any thread) to stop evaluation at
    /// the next statement or loop boundary.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.evaluator.stop_handle()
    }

    /// Drop every binding and start over with a fresh global environment.
    pub fn reset(&mut self) {
        self.env = Environment::new();
        self.stop_handle().store(false, Ordering::Relaxed);
    }

    /// Lex, parse and evaluate a source buffer. Evaluation only runs when
    /// the parse produced no errors.
    pub fn eval_source(
        &mut self,
        source: impl Into<Vec<u8>>,
        filename: &str,
    ) -> Result<Value, Vec<VesperError>> {
        let program = parse_source(source, filename)?;
        self.eval_program(&program)
    }

    /// Evaluate everything a reader yields, as one program.
    pub fn eval_reader(
        &mut self,
        mut reader: impl Read,
        filename: &str,
    ) -> Result<Value, Vec<VesperError>> {
        let mut source = Vec::new();
        if let Err(err) = reader.read_to_end(&mut source) {
            return Err(vec![VesperError::runtime_bare(err.to_string())]);
        }
        self.eval_source(source, filename)
    }

    pub fn eval_program(&mut self, program: &Program) -> Result<Value, Vec<VesperError>> {
        self.evaluator
            .eval_program(program, &self.env)
            .map_err(|err| vec![VesperError::from(err)])
    }
}

/// Parse a source buffer, mapping accumulated parser errors into the
/// unified error type.
pub fn parse_source(
    source: impl Into<Vec<u8>>,
    filename: &str,
) -> Result<Program, Vec<VesperError>> {
    let mut parser = Parser::new(Lexer::new(source, filename));
    let program = parser.parse_program();
    let errors = parser.into_errors();

    if errors.is_empty() {
        Ok(program)
    } else {
        Err(errors.into_iter().map(VesperError::from).collect())
    }
}
