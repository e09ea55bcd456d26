//! Recursive tree-walking evaluator.
//!
//! Runtime failures are ordinary `Err` values and `?` carries them out of
//! every recursion; `ret` travels as the internal [`Value::Return`] wrapper
//! and is unwrapped at the program top level and at call boundaries.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::lexer::{Position, Token, TokenKind};
use crate::parser::ast::{Block, Expr, Identifier, Program, Stmt};

use super::builtins;
use super::env::Environment;
use super::value::{FunctionValue, Kind, Value};

/// A runtime error: message plus the source position of the offending
/// expression. Builtins report without a position; the evaluator fills in
/// the call site.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeError {
    pub message: String,
    pub pos: Option<Position>,
}

impl RuntimeError {
    pub fn new(pos: Position, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            pos: Some(pos),
        }
    }

    /// An error with no position yet; used by builtins.
    pub fn bare(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            pos: None,
        }
    }

    fn at(mut self, pos: &Position) -> Self {
        if self.pos.is_none() {
            self.pos = Some(pos.clone());
        }
        self
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for RuntimeError {}

/// The evaluator. Holds the cooperative stop flag; everything else threads
/// through the recursion explicitly.
#[derive(Debug, Default)]
pub struct Evaluator {
    stop: Arc<AtomicBool>,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stop(stop: Arc<AtomicBool>) -> Self {
        Self { stop }
    }

    /// Handle the driver can set from another thread to wind evaluation
    /// down. The flag is polled at statement boundaries and at every loop
    /// iteration; evaluation then finishes with `nil`.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    fn stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    /// Evaluate a program, returning the value of its last statement. A
    /// `ret` at the top level unwraps here.
    pub fn eval_program(
        &self,
        program: &Program,
        env: &Rc<Environment>,
    ) -> Result<Value, RuntimeError> {
        let mut result = Value::Nil;

        for stmt in &program.statements {
            if self.stopped() {
                return Ok(Value::Nil);
            }
            match self.eval_stmt(stmt, env)? {
                Value::Return(inner) => return Ok(*inner),
                value => result = value,
            }
        }

        Ok(result)
    }

    fn eval_stmt(&self, stmt: &Stmt, env: &Rc<Environment>) -> Result<Value, RuntimeError> {
        match stmt {
            Stmt::Let { name, value, .. } => {
                let value = self.eval_expr(value, env)?;
                env.set(&name.value, value);
                Ok(Value::Nil)
            }
            Stmt::Return { value, .. } => {
                let value = self.eval_expr(value, env)?;
                Ok(Value::Return(Box::new(value)))
            }
            Stmt::Expr { expr, .. } => self.eval_expr(expr, env),
        }
    }

    /// Evaluate a block, bubbling a `Return` wrapper without unwrapping so
    /// the enclosing call (or program) unwraps exactly once.
    fn eval_block(&self, block: &Block, env: &Rc<Environment>) -> Result<Value, RuntimeError> {
        let mut result = Value::Nil;

        for stmt in &block.statements {
            if self.stopped() {
                return Ok(Value::Nil);
            }
            result = self.eval_stmt(stmt, env)?;
            if matches!(result, Value::Return(_)) {
                return Ok(result);
            }
        }

        Ok(result)
    }

    fn eval_expr(&self, expr: &Expr, env: &Rc<Environment>) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Int { value, .. } => Ok(Value::Int(*value)),
            Expr::Float { value, .. } => Ok(Value::Float(*value)),
            Expr::Str { value, .. } => Ok(Value::string(value.as_bytes())),
            Expr::Bool { value, .. } => Ok(Value::Bool(*value)),
            Expr::Nil { .. } => Ok(Value::Nil),
            Expr::Identifier(id) => self.eval_identifier(id, env),
            Expr::Access { token, segments } => self.resolve_access(token, segments, env),
            Expr::Prefix { token, op, right } => {
                let right = self.eval_expr(right, env)?;
                self.eval_prefix(token, *op, right)
            }
            Expr::Infix {
                token,
                op,
                left,
                right,
            } => {
                if *op == TokenKind::Assign {
                    return self.eval_assign(token, left, right, env);
                }
                let left = self.eval_expr(left, env)?;
                let right = self.eval_expr(right, env)?;
                self.eval_infix(token, left, right)
            }
            Expr::Index { token, left, index } => {
                let left = self.eval_expr(left, env)?;
                let index = self.eval_expr(index, env)?;
                self.eval_index(token, left, index)
            }
            Expr::If {
                cond, then, alt, ..
            } => {
                if self.eval_expr(cond, env)?.is_truthy() {
                    self.eval_block(then, env)
                } else if let Some(alt) = alt {
                    self.eval_block(alt, env)
                } else {
                    Ok(Value::Nil)
                }
            }
            Expr::While {
                cond, body, then, ..
            } => self.eval_while(cond, body, then.as_deref(), env),
            Expr::Function { params, body, .. } => {
                Ok(Value::Function(Rc::new(FunctionValue {
                    params: params.iter().map(|p| p.value.clone()).collect(),
                    body: Rc::clone(body),
                    env: Rc::clone(env),
                })))
            }
            Expr::Array { elements, .. } => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.eval_expr(element, env)?);
                }
                Ok(Value::array(values))
            }
            Expr::Call {
                token,
                callee,
                args,
            } => {
                let callee = self.eval_expr(callee, env)?;
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval_expr(arg, env)?);
                }
                self.call(token, callee, values)
            }
        }
    }

    fn eval_identifier(
        &self,
        id: &Identifier,
        env: &Rc<Environment>,
    ) -> Result<Value, RuntimeError> {
        if let Some(value) = env.get(&id.value) {
            return Ok(value);
        }
        if let Some(builtin) = builtins::lookup(&id.value) {
            return Ok(Value::Builtin(builtin));
        }
        Err(RuntimeError::new(
            id.token.pos.clone(),
            format!("identifier not found: {}", id.value),
        ))
    }

    /// Walk an `a.b.c` chain: every non-terminal segment must name a
    /// function, whose captured environment the walk descends into; the
    /// terminal segment is looked up in the innermost environment (falling
    /// back to the builtin table).
    fn resolve_access(
        &self,
        token: &Token,
        segments: &[String],
        env: &Rc<Environment>,
    ) -> Result<Value, RuntimeError> {
        let scope = self.resolve_access_scope(token, segments, env)?;
        let name = segments.last().expect("access chain has segments");

        if let Some(value) = scope.get(name) {
            return Ok(value);
        }
        if let Some(builtin) = builtins::lookup(name) {
            return Ok(Value::Builtin(builtin));
        }
        Err(RuntimeError::new(
            token.pos.clone(),
            format!("identifier '{name}' does not exist in context of function"),
        ))
    }

    /// Descend through every non-terminal segment of an access chain and
    /// return the environment the terminal segment lives in.
    fn resolve_access_scope(
        &self,
        token: &Token,
        segments: &[String],
        env: &Rc<Environment>,
    ) -> Result<Rc<Environment>, RuntimeError> {
        let mut scope = Rc::clone(env);

        for (i, segment) in segments[..segments.len() - 1].iter().enumerate() {
            let value = match scope.get(segment) {
                Some(value) => value,
                None if i == 0 => {
                    return Err(RuntimeError::new(
                        token.pos.clone(),
                        format!("identifier not found: {segment}"),
                    ))
                }
                None => {
                    return Err(RuntimeError::new(
                        token.pos.clone(),
                        format!("identifier '{segment}' does not exist in context of function"),
                    ))
                }
            };

            match value {
                Value::Function(func) => scope = Rc::clone(&func.env),
                other => {
                    return Err(RuntimeError::new(
                        token.pos.clone(),
                        format!(
                            "cannot use '.' operator on type '{}'. Must be function",
                            other.kind()
                        ),
                    ))
                }
            }
        }

        Ok(scope)
    }

    fn eval_prefix(
        &self,
        token: &Token,
        op: TokenKind,
        right: Value,
    ) -> Result<Value, RuntimeError> {
        match op {
            TokenKind::Bang => Ok(Value::Bool(!right.is_truthy())),
            TokenKind::Minus => match right {
                Value::Int(n) => Ok(Value::Int(n.wrapping_neg())),
                Value::Float(n) => Ok(Value::Float(-n)),
                other => Err(RuntimeError::new(
                    token.pos.clone(),
                    format!("unknown operator '-' for type '{}'", other.kind()),
                )),
            },
            _ => Err(RuntimeError::new(
                token.pos.clone(),
                format!("unknown operator '{}' for type '{}'", token, right.kind()),
            )),
        }
    }

    /// `=` with an identifier, access-chain or index target. The target
    /// must already exist (for the first two) and keep its type, unless
    /// either side is nil.
    fn eval_assign(
        &self,
        token: &Token,
        left: &Expr,
        right: &Expr,
        env: &Rc<Environment>,
    ) -> Result<Value, RuntimeError> {
        match left {
            Expr::Identifier(id) => {
                let Some(current) = env.get(&id.value) else {
                    return Err(RuntimeError::new(
                        id.token.pos.clone(),
                        format!(
                            "cannot assign value to variable '{}' that does not exist",
                            id.value
                        ),
                    ));
                };

                let value = self.eval_expr(right, env)?;
                self.check_assignable(&id.token, &id.value, &current, &value)?;
                env.assign(&id.value, value.clone());
                Ok(value)
            }
            Expr::Access {
                token: access_token,
                segments,
            } => {
                let scope = self.resolve_access_scope(access_token, segments, env)?;
                let name = segments.last().expect("access chain has segments");

                let Some(current) = scope.get(name) else {
                    return Err(RuntimeError::new(
                        access_token.pos.clone(),
                        format!("cannot assign value to variable '{name}' that does not exist"),
                    ));
                };

                let value = self.eval_expr(right, env)?;
                self.check_assignable(access_token, name, &current, &value)?;
                scope.assign(name, value.clone());
                Ok(value)
            }
            Expr::Index {
                token: index_token,
                left: target,
                index,
            } => {
                let elements = match self.eval_expr(target, env)? {
                    Value::Array(elements) => elements,
                    other => {
                        return Err(RuntimeError::new(
                            index_token.pos.clone(),
                            format!("cannot assign to index of type '{}'", other.kind()),
                        ))
                    }
                };

                let i = match self.eval_expr(index, env)? {
                    Value::Int(i) => i,
                    other => {
                        return Err(RuntimeError::new(
                            index_token.pos.clone(),
                            format!("cannot index type 'array' with type '{}'", other.kind()),
                        ))
                    }
                };

                let value = self.eval_expr(right, env)?;
                let len = elements.borrow().len();
                let slot = normalize_index(i, len).ok_or_else(|| {
                    RuntimeError::new(
                        index_token.pos.clone(),
                        out_of_bounds(i, Kind::Array, len),
                    )
                })?;
                elements.borrow_mut()[slot] = value.clone();
                Ok(value)
            }
            _ => Err(RuntimeError::new(
                token.pos.clone(),
                "cannot bind a literal to a value".to_string(),
            )),
        }
    }

    fn check_assignable(
        &self,
        token: &Token,
        name: &str,
        current: &Value,
        value: &Value,
    ) -> Result<(), RuntimeError> {
        if current.kind() == value.kind() || current.is_nil() || value.is_nil() {
            return Ok(());
        }
        Err(RuntimeError::new(
            token.pos.clone(),
            format!(
                "cannot assign variable '{}' of type '{}' to value '{}' of type '{}'",
                name,
                current.kind(),
                value,
                value.kind()
            ),
        ))
    }

    fn eval_infix(
        &self,
        token: &Token,
        left: Value,
        right: Value,
    ) -> Result<Value, RuntimeError> {
        let op = token.kind;

        if !left.kind().can_apply(op, right.kind()) {
            return Err(RuntimeError::new(
                token.pos.clone(),
                format!(
                    "cannot apply operator '{}' for type '{}' and '{}'",
                    token,
                    left.kind(),
                    right.kind()
                ),
            ));
        }

        match (left, right) {
            (Value::Int(l), Value::Int(r)) => self.eval_int_infix(token, l, r),
            (Value::Float(l), Value::Float(r)) => self.eval_float_infix(token, l, r),
            // Mixed numeric operands promote the int side to float.
            (Value::Int(l), Value::Float(r)) => self.eval_float_infix(token, l as f64, r),
            (Value::Float(l), Value::Int(r)) => self.eval_float_infix(token, l, r as f64),
            (Value::Str(l), Value::Str(r)) => self.eval_string_infix(token, &l, &r),
            (Value::Array(l), Value::Array(r)) => self.eval_array_infix(token, &l, &r),
            (left, right) => match op {
                TokenKind::Equal => Ok(Value::Bool(left == right)),
                TokenKind::NotEqual => Ok(Value::Bool(left != right)),
                _ => Err(RuntimeError::new(
                    token.pos.clone(),
                    format!(
                        "unknown operator '{}' for type '{}' and '{}'",
                        token,
                        left.kind(),
                        right.kind()
                    ),
                )),
            },
        }
    }

    fn eval_int_infix(&self, token: &Token, l: i64, r: i64) -> Result<Value, RuntimeError> {
        let value = match token.kind {
            TokenKind::Plus => Value::Int(l.wrapping_add(r)),
            TokenKind::Minus => Value::Int(l.wrapping_sub(r)),
            TokenKind::Times => Value::Int(l.wrapping_mul(r)),
            TokenKind::Divide => {
                if r == 0 {
                    return Err(RuntimeError::new(
                        token.pos.clone(),
                        format!("cannot divide {l} by 0"),
                    ));
                }
                Value::Int(l.wrapping_div(r))
            }
            TokenKind::Mod => {
                if r == 0 {
                    return Err(RuntimeError::new(
                        token.pos.clone(),
                        format!("cannot modulo {l} by 0"),
                    ));
                }
                Value::Int(l.wrapping_rem(r))
            }
            TokenKind::Exp => Value::Int((l as f64).powf(r as f64) as i64),
            TokenKind::Less => Value::Bool(l < r),
            TokenKind::Greater => Value::Bool(l > r),
            TokenKind::Equal => Value::Bool(l == r),
            TokenKind::NotEqual => Value::Bool(l != r),
            _ => {
                return Err(RuntimeError::new(
                    token.pos.clone(),
                    format!("unknown operator '{token}' for type 'int' and 'int'"),
                ))
            }
        };
        Ok(value)
    }

    fn eval_float_infix(&self, token: &Token, l: f64, r: f64) -> Result<Value, RuntimeError> {
        let value = match token.kind {
            TokenKind::Plus => Value::Float(l + r),
            TokenKind::Minus => Value::Float(l - r),
            TokenKind::Times => Value::Float(l * r),
            TokenKind::Divide => {
                if r == 0.0 {
                    return Err(RuntimeError::new(
                        token.pos.clone(),
                        format!("cannot divide {l} by 0"),
                    ));
                }
                Value::Float(l / r)
            }
            TokenKind::Mod => {
                if r == 0.0 {
                    return Err(RuntimeError::new(
                        token.pos.clone(),
                        format!("cannot modulo {l} by 0"),
                    ));
                }
                Value::Float(l % r)
            }
            TokenKind::Exp => Value::Float(l.powf(r)),
            TokenKind::Less => Value::Bool(l < r),
            TokenKind::Greater => Value::Bool(l > r),
            TokenKind::Equal => Value::Bool(l == r),
            TokenKind::NotEqual => Value::Bool(l != r),
            _ => {
                return Err(RuntimeError::new(
                    token.pos.clone(),
                    format!("unknown operator '{token}' for type 'float' and 'float'"),
                ))
            }
        };
        Ok(value)
    }

    fn eval_string_infix(
        &self,
        token: &Token,
        l: &[u8],
        r: &[u8],
    ) -> Result<Value, RuntimeError> {
        match token.kind {
            TokenKind::Plus => Ok(Value::string([l, r].concat())),
            TokenKind::Equal => Ok(Value::Bool(l == r)),
            TokenKind::NotEqual => Ok(Value::Bool(l != r)),
            _ => Err(RuntimeError::new(
                token.pos.clone(),
                format!("unknown operator '{token}' for type 'string' and 'string'"),
            )),
        }
    }

    fn eval_array_infix(
        &self,
        token: &Token,
        l: &Rc<std::cell::RefCell<Vec<Value>>>,
        r: &Rc<std::cell::RefCell<Vec<Value>>>,
    ) -> Result<Value, RuntimeError> {
        match token.kind {
            TokenKind::Plus => {
                let mut elements = l.borrow().clone();
                elements.extend(r.borrow().iter().cloned());
                Ok(Value::array(elements))
            }
            TokenKind::Equal => Ok(Value::Bool(array_eq(l, r))),
            TokenKind::NotEqual => Ok(Value::Bool(!array_eq(l, r))),
            _ => Err(RuntimeError::new(
                token.pos.clone(),
                format!("unknown operator '{token}' for type 'array' and 'array'"),
            )),
        }
    }

    /// `a[i]` over arrays and strings, with negative indices counting back
    /// from the end. String indexing returns a one-byte string.
    fn eval_index(
        &self,
        token: &Token,
        left: Value,
        index: Value,
    ) -> Result<Value, RuntimeError> {
        match (left, index) {
            (Value::Array(elements), Value::Int(i)) => {
                let len = elements.borrow().len();
                match normalize_index(i, len) {
                    Some(slot) => Ok(elements.borrow()[slot].clone()),
                    None => Err(RuntimeError::new(
                        token.pos.clone(),
                        out_of_bounds(i, Kind::Array, len),
                    )),
                }
            }
            (Value::Str(bytes), Value::Int(i)) => match normalize_index(i, bytes.len()) {
                Some(slot) => Ok(Value::string(vec![bytes[slot]])),
                None => Err(RuntimeError::new(
                    token.pos.clone(),
                    out_of_bounds(i, Kind::Str, bytes.len()),
                )),
            },
            (left @ (Value::Array(_) | Value::Str(_)), index) => Err(RuntimeError::new(
                token.pos.clone(),
                format!(
                    "cannot index type '{}' with type '{}'",
                    left.kind(),
                    index.kind()
                ),
            )),
            (left, _) => Err(RuntimeError::new(
                token.pos.clone(),
                format!("cannot index type '{}'", left.kind()),
            )),
        }
    }

    fn eval_while(
        &self,
        cond: &Expr,
        body: &Block,
        then: Option<&Expr>,
        env: &Rc<Environment>,
    ) -> Result<Value, RuntimeError> {
        while !self.stopped() {
            if !self.eval_expr(cond, env)?.is_truthy() {
                break;
            }

            // The body's value is discarded, but a `ret` inside the loop
            // must still travel out to the enclosing function.
            let result = self.eval_block(body, env)?;
            if matches!(result, Value::Return(_)) {
                return Ok(result);
            }

            if let Some(then) = then {
                self.eval_expr(then, env)?;
            }
        }

        Ok(Value::Nil)
    }

    fn call(
        &self,
        token: &Token,
        callee: Value,
        args: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        match callee {
            Value::Builtin(builtin) => {
                (builtin.func)(&args).map_err(|err| err.at(&token.pos))
            }
            Value::Function(func) => {
                if func.params.len() != args.len() {
                    return Err(RuntimeError::new(
                        token.pos.clone(),
                        format!(
                            "invalid number of arguments for function. Expected {} got {}",
                            func.params.len(),
                            args.len()
                        ),
                    ));
                }

                // The activation frame chains to the *captured* environment,
                // not the caller's.
                let frame = Environment::with_parent(Rc::clone(&func.env));
                for (param, arg) in func.params.iter().zip(args) {
                    frame.set(param, arg);
                }

                match self.eval_block(&func.body, &frame)? {
                    Value::Return(inner) => Ok(*inner),
                    value => Ok(value),
                }
            }
            other => Err(RuntimeError::new(
                token.pos.clone(),
                format!("type '{}' not a function", other.kind()),
            )),
        }
    }
}

fn array_eq(
    l: &Rc<std::cell::RefCell<Vec<Value>>>,
    r: &Rc<std::cell::RefCell<Vec<Value>>>,
) -> bool {
    Rc::ptr_eq(l, r) || *l.borrow() == *r.borrow()
}

/// Map an index (possibly negative, counting back from the end) onto
/// `0..len`, or `None` when it falls outside.
fn normalize_index(i: i64, len: usize) -> Option<usize> {
    let max = len as i64 - 1;
    let normalized = if i < 0 { max + i + 1 } else { i };
    if normalized < 0 || normalized > max {
        None
    } else {
        Some(normalized as usize)
    }
}

fn out_of_bounds(i: i64, kind: Kind, len: usize) -> String {
    format!(
        "index {} out of bounds of {}. Max {}",
        i,
        kind.name(),
        len as i64 - 1
    )
}
