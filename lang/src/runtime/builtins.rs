//! Built-in host functions.
//!
//! The evaluator only knows the calling contract: a builtin takes the
//! already-evaluated arguments and returns a value or an error. Errors
//! leave the position empty; the evaluator stamps the call site on them.

use std::io::{self, Read, Write};

use super::eval::RuntimeError;
use super::value::Value;

pub type BuiltinFn = fn(&[Value]) -> Result<Value, RuntimeError>;

/// A named host function.
#[derive(Debug)]
pub struct Builtin {
    pub name: &'static str,
    pub func: BuiltinFn,
}

static BUILTINS: &[Builtin] = &[
    Builtin { name: "len", func: len },
    Builtin { name: "first", func: first },
    Builtin { name: "last", func: last },
    Builtin { name: "rest", func: rest },
    Builtin { name: "lead", func: lead },
    Builtin { name: "push", func: push },
    Builtin { name: "pop", func: pop },
    Builtin { name: "alloc", func: alloc },
    Builtin { name: "set", func: set },
    Builtin { name: "join", func: join },
    Builtin { name: "split", func: split },
    Builtin { name: "println", func: println },
    Builtin { name: "print", func: print },
    Builtin { name: "readln", func: readln },
    Builtin { name: "read", func: read },
    Builtin { name: "readc", func: readc },
    Builtin { name: "readall", func: readall },
    Builtin { name: "atoi", func: atoi },
    Builtin { name: "itoa", func: itoa },
    Builtin { name: "in", func: file_in },
    Builtin { name: "out", func: file_out },
];

/// Look a builtin up by name.
pub fn lookup(name: &str) -> Option<&'static Builtin> {
    BUILTINS.iter().find(|b| b.name == name)
}

fn arity(args: &[Value], expected: usize) -> Result<(), RuntimeError> {
    if args.len() != expected {
        return Err(RuntimeError::bare(format!(
            "wrong number of arguments. got '{}', expected '{}'",
            args.len(),
            expected
        )));
    }
    Ok(())
}

fn unsupported(name: &str, arg: &Value) -> RuntimeError {
    RuntimeError::bare(format!(
        "argument to '{}' not supported, got '{}'",
        name,
        arg.kind()
    ))
}

fn len(args: &[Value]) -> Result<Value, RuntimeError> {
    arity(args, 1)?;
    match &args[0] {
        Value::Str(bytes) => Ok(Value::Int(bytes.len() as i64)),
        Value::Array(elements) => Ok(Value::Int(elements.borrow().len() as i64)),
        other => Err(unsupported("len", other)),
    }
}

fn first(args: &[Value]) -> Result<Value, RuntimeError> {
    arity(args, 1)?;
    match &args[0] {
        Value::Str(bytes) => Ok(match bytes.first() {
            Some(&b) => Value::string(vec![b]),
            None => Value::Nil,
        }),
        Value::Array(elements) => Ok(elements.borrow().first().cloned().unwrap_or(Value::Nil)),
        other => Err(unsupported("first", other)),
    }
}

fn last(args: &[Value]) -> Result<Value, RuntimeError> {
    arity(args, 1)?;
    match &args[0] {
        Value::Str(bytes) => Ok(match bytes.last() {
            Some(&b) => Value::string(vec![b]),
            None => Value::Nil,
        }),
        Value::Array(elements) => Ok(elements.borrow().last().cloned().unwrap_or(Value::Nil)),
        other => Err(unsupported("last", other)),
    }
}

/// Everything after the first element; `nil` when empty.
fn rest(args: &[Value]) -> Result<Value, RuntimeError> {
    arity(args, 1)?;
    match &args[0] {
        Value::Str(bytes) => Ok(if bytes.is_empty() {
            Value::Nil
        } else {
            Value::string(bytes[1..].to_vec())
        }),
        Value::Array(elements) => {
            let elements = elements.borrow();
            Ok(if elements.is_empty() {
                Value::Nil
            } else {
                Value::array(elements[1..].to_vec())
            })
        }
        other => Err(unsupported("rest", other)),
    }
}

/// Everything before the last element; `nil` when empty.
fn lead(args: &[Value]) -> Result<Value, RuntimeError> {
    arity(args, 1)?;
    match &args[0] {
        Value::Str(bytes) => Ok(if bytes.is_empty() {
            Value::Nil
        } else {
            Value::string(bytes[..bytes.len() - 1].to_vec())
        }),
        Value::Array(elements) => {
            let elements = elements.borrow();
            Ok(if elements.is_empty() {
                Value::Nil
            } else {
                Value::array(elements[..elements.len() - 1].to_vec())
            })
        }
        other => Err(unsupported("lead", other)),
    }
}

/// Append to a copy. Arrays come back as a fresh array one element longer;
/// strings concatenate. The receiver is never mutated (contrast `set`).
fn push(args: &[Value]) -> Result<Value, RuntimeError> {
    arity(args, 2)?;
    match &args[0] {
        Value::Str(bytes) => match &args[1] {
            Value::Str(tail) => Ok(Value::string([&bytes[..], &tail[..]].concat())),
            other => Err(RuntimeError::bare(format!(
                "cannot push '{}' to string",
                other.kind()
            ))),
        },
        Value::Array(elements) => {
            let mut copy = elements.borrow().clone();
            copy.push(args[1].clone());
            Ok(Value::array(copy))
        }
        other => Err(unsupported("push", other)),
    }
}

/// Remove and return the last array element, in place. On strings it
/// returns the final byte without mutating (strings are value-semantic).
fn pop(args: &[Value]) -> Result<Value, RuntimeError> {
    arity(args, 1)?;
    match &args[0] {
        Value::Str(bytes) => Ok(match bytes.last() {
            Some(&b) => Value::string(vec![b]),
            None => Value::Nil,
        }),
        Value::Array(elements) => Ok(elements.borrow_mut().pop().unwrap_or(Value::Nil)),
        other => Err(unsupported("pop", other)),
    }
}

/// `alloc(n, v)` builds an n-element array filled with v.
fn alloc(args: &[Value]) -> Result<Value, RuntimeError> {
    arity(args, 2)?;
    match &args[0] {
        Value::Int(n) => {
            if *n < 0 {
                return Ok(Value::Nil);
            }
            Ok(Value::array(vec![args[1].clone(); *n as usize]))
        }
        other => Err(unsupported("alloc", other)),
    }
}

/// `set(arr, i, v)` stores in place; the write is visible through every
/// alias of the array.
fn set(args: &[Value]) -> Result<Value, RuntimeError> {
    arity(args, 3)?;
    match &args[0] {
        Value::Array(elements) => {
            let Value::Int(i) = args[1] else {
                return Err(RuntimeError::bare(format!(
                    "second argument to 'set' not supported, got '{}'",
                    args[1].kind()
                )));
            };
            let len = elements.borrow().len();
            if i < 0 || i >= len as i64 {
                return Err(RuntimeError::bare(format!(
                    "index {} out of bounds of array. Max {}",
                    i,
                    len as i64 - 1
                )));
            }
            elements.borrow_mut()[i as usize] = args[2].clone();
            Ok(Value::Nil)
        }
        other => Err(unsupported("set", other)),
    }
}

fn join(args: &[Value]) -> Result<Value, RuntimeError> {
    arity(args, 2)?;
    match &args[0] {
        Value::Array(elements) => match &args[1] {
            Value::Str(sep) => {
                let parts: Vec<Vec<u8>> = elements
                    .borrow()
                    .iter()
                    .map(|e| e.to_string().into_bytes())
                    .collect();
                Ok(Value::string(parts.join(&sep[..])))
            }
            other => Err(RuntimeError::bare(format!(
                "second argument to 'join' not supported, got '{}'",
                other.kind()
            ))),
        },
        other => Err(unsupported("join", other)),
    }
}

fn split(args: &[Value]) -> Result<Value, RuntimeError> {
    arity(args, 2)?;
    match &args[0] {
        Value::Str(bytes) => match &args[1] {
            Value::Str(sep) => {
                let parts = split_bytes(bytes, sep);
                Ok(Value::array(
                    parts.into_iter().map(Value::string).collect(),
                ))
            }
            other => Err(RuntimeError::bare(format!(
                "second argument to 'split' not supported, got '{}'",
                other.kind()
            ))),
        },
        other => Err(unsupported("split", other)),
    }
}

/// Split on a byte separator. An empty separator yields one piece per byte.
fn split_bytes(bytes: &[u8], sep: &[u8]) -> Vec<Vec<u8>> {
    if sep.is_empty() {
        return bytes.iter().map(|&b| vec![b]).collect();
    }

    let mut parts = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i + sep.len() <= bytes.len() {
        if &bytes[i..i + sep.len()] == sep {
            parts.push(bytes[start..i].to_vec());
            i += sep.len();
            start = i;
        } else {
            i += 1;
        }
    }
    parts.push(bytes[start..].to_vec());
    parts
}

/// Print each argument on its own line.
fn println(args: &[Value]) -> Result<Value, RuntimeError> {
    let mut out = io::stdout();
    for arg in args {
        let _ = writeln!(out, "{arg}");
    }
    Ok(Value::Nil)
}

fn print(args: &[Value]) -> Result<Value, RuntimeError> {
    let mut out = io::stdout();
    for arg in args {
        let _ = write!(out, "{arg}");
    }
    let _ = out.flush();
    Ok(Value::Nil)
}

fn readln(args: &[Value]) -> Result<Value, RuntimeError> {
    arity(args, 0)?;
    let mut line = String::new();
    let _ = io::stdin().read_line(&mut line);
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    Ok(Value::string(line.into_bytes()))
}

/// Read one whitespace-delimited word from stdin.
fn read(args: &[Value]) -> Result<Value, RuntimeError> {
    arity(args, 0)?;
    let mut word = Vec::new();
    let stdin = io::stdin();
    let mut handle = stdin.lock();
    let mut byte = [0u8];

    // Skip leading whitespace.
    loop {
        match handle.read(&mut byte) {
            Ok(0) => return Ok(Value::string(word)),
            Ok(_) if byte[0].is_ascii_whitespace() => continue,
            Ok(_) => {
                word.push(byte[0]);
                break;
            }
            Err(_) => return Ok(Value::string(word)),
        }
    }

    loop {
        match handle.read(&mut byte) {
            Ok(0) => break,
            Ok(_) if byte[0].is_ascii_whitespace() => break,
            Ok(_) => word.push(byte[0]),
            Err(_) => break,
        }
    }

    Ok(Value::string(word))
}

/// Read a single byte; `nil` at end of input.
fn readc(args: &[Value]) -> Result<Value, RuntimeError> {
    arity(args, 0)?;
    let mut byte = [0u8];
    match io::stdin().read(&mut byte) {
        Ok(1) => Ok(Value::string(vec![byte[0]])),
        _ => Ok(Value::Nil),
    }
}

fn readall(args: &[Value]) -> Result<Value, RuntimeError> {
    arity(args, 0)?;
    let mut buffer = Vec::new();
    let _ = io::stdin().read_to_end(&mut buffer);
    Ok(Value::string(buffer))
}

/// Byte value of a one-byte string.
fn atoi(args: &[Value]) -> Result<Value, RuntimeError> {
    arity(args, 1)?;
    match &args[0] {
        Value::Str(bytes) => {
            if bytes.len() == 1 {
                Ok(Value::Int(bytes[0] as i64))
            } else {
                Err(RuntimeError::bare(format!(
                    "argument to 'atoi' must be a string of length 1. Got '{}'",
                    bytes.len()
                )))
            }
        }
        other => Err(unsupported("atoi", other)),
    }
}

/// One-byte string for a byte value.
fn itoa(args: &[Value]) -> Result<Value, RuntimeError> {
    arity(args, 1)?;
    match &args[0] {
        Value::Int(n) => {
            if (0..256).contains(n) {
                Ok(Value::string(vec![*n as u8]))
            } else {
                Err(RuntimeError::bare(format!(
                    "argument to 'itoa' must be between 0 and 256. Got '{n}'"
                )))
            }
        }
        other => Err(unsupported("itoa", other)),
    }
}

/// `in(path)` reads a whole file into a string.
fn file_in(args: &[Value]) -> Result<Value, RuntimeError> {
    arity(args, 1)?;
    match &args[0] {
        Value::Str(path) => {
            let path = String::from_utf8_lossy(path).into_owned();
            match std::fs::read(&path) {
                Ok(bytes) => Ok(Value::string(bytes)),
                Err(err) => Err(RuntimeError::bare(err.to_string())),
            }
        }
        other => Err(unsupported("in", other)),
    }
}

/// `out(path, s)` writes a string to a file, truncating it.
fn file_out(args: &[Value]) -> Result<Value, RuntimeError> {
    arity(args, 2)?;
    match &args[0] {
        Value::Str(path) => match &args[1] {
            Value::Str(contents) => {
                let path = String::from_utf8_lossy(path).into_owned();
                match std::fs::write(&path, contents) {
                    Ok(()) => Ok(Value::Nil),
                    Err(err) => Err(RuntimeError::bare(err.to_string())),
                }
            }
            other => Err(unsupported("out", other)),
        },
        other => Err(unsupported("out", other)),
    }
}
