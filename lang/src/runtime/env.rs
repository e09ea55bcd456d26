//! Lexically nested variable scopes.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::value::Value;

/// A name-to-value map with an optional parent. Function calls create a
/// child of the function's *captured* environment, which is what gives the
/// language lexical scoping and closures.
///
/// Environments are reference counted; a closure stored inside its own
/// defining scope forms a cycle that is simply leaked, which is acceptable
/// for short-lived programs.
#[derive(Debug, Default)]
pub struct Environment {
    vars: RefCell<HashMap<String, Value>>,
    parent: Option<Rc<Environment>>,
}

impl Environment {
    pub fn new() -> Rc<Environment> {
        Rc::new(Environment::default())
    }

    pub fn with_parent(parent: Rc<Environment>) -> Rc<Environment> {
        Rc::new(Environment {
            vars: RefCell::new(HashMap::new()),
            parent: Some(parent),
        })
    }

    /// Look a name up here, then up the parent chain.
    pub fn get(&self, name: &str) -> Option<Value> {
        match self.vars.borrow().get(name) {
            Some(value) => Some(value.clone()),
            None => self.parent.as_ref().and_then(|p| p.get(name)),
        }
    }

    /// Bind a name in this scope, shadowing any parent binding.
    pub fn set(&self, name: &str, value: Value) {
        self.vars.borrow_mut().insert(name.to_string(), value);
    }

    /// Rebind an existing name wherever it lives in the chain. Returns
    /// false when no scope holds the name; the caller turns that into an
    /// error.
    pub fn assign(&self, name: &str, value: Value) -> bool {
        let mut vars = self.vars.borrow_mut();
        if vars.contains_key(name) {
            vars.insert(name.to_string(), value);
            return true;
        }
        drop(vars);

        match &self.parent {
            Some(parent) => parent.assign(name, value),
            None => false,
        }
    }
}
