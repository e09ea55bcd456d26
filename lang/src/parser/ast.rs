//! AST node types for Vesper programs.
//!
//! Nodes are built by the parser and immutable afterwards. Every node keeps
//! its leading token so runtime errors can point back into the source.
//!
//! The `Display` implementations render a deterministic JavaScript-flavored
//! form (`var` / `return` / `function`) used by the `--js` emit path and by
//! snapshot tests.

use std::fmt;
use std::rc::Rc;

use crate::lexer::{Token, TokenKind};

/// A whole source file or REPL chunk.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `let name = value`
    Let {
        token: Token,
        name: Identifier,
        value: Expr,
    },
    /// `ret value`
    Return { token: Token, value: Expr },
    /// A bare expression in statement position.
    Expr { token: Token, expr: Expr },
}

/// A braced, `:`-introduced, or single bare statement block. The leading
/// token records which form was written.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub token: Token,
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    pub token: Token,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Int {
        token: Token,
        value: i64,
    },
    Float {
        token: Token,
        value: f64,
    },
    Str {
        token: Token,
        value: String,
    },
    Bool {
        token: Token,
        value: bool,
    },
    Nil {
        token: Token,
    },
    Identifier(Identifier),
    /// A dotted chain `a.b.c`; always at least two segments. A single name
    /// is an `Identifier`, never an `Access`.
    Access {
        token: Token,
        segments: Vec<String>,
    },
    Prefix {
        token: Token,
        op: TokenKind,
        right: Box<Expr>,
    },
    Infix {
        token: Token,
        op: TokenKind,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Index {
        token: Token,
        left: Box<Expr>,
        index: Box<Expr>,
    },
    If {
        token: Token,
        cond: Box<Expr>,
        then: Block,
        alt: Option<Block>,
    },
    /// `while cond body` with an optional `then` expression evaluated after
    /// each iteration.
    While {
        token: Token,
        cond: Box<Expr>,
        body: Block,
        then: Option<Box<Expr>>,
    },
    /// `|a, b| body` or the zero-parameter `! body` shorthand. The body is
    /// reference-counted so closure values can share it without cloning the
    /// subtree.
    Function {
        token: Token,
        params: Vec<Identifier>,
        body: Rc<Block>,
    },
    Array {
        token: Token,
        elements: Vec<Expr>,
    },
    /// `callee(args)`, or `callee!` for a zero-argument call.
    Call {
        token: Token,
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
}

impl Expr {
    /// The token evaluation errors should point at.
    pub fn token(&self) -> &Token {
        match self {
            Expr::Int { token, .. }
            | Expr::Float { token, .. }
            | Expr::Str { token, .. }
            | Expr::Bool { token, .. }
            | Expr::Nil { token }
            | Expr::Access { token, .. }
            | Expr::Prefix { token, .. }
            | Expr::Infix { token, .. }
            | Expr::Index { token, .. }
            | Expr::If { token, .. }
            | Expr::While { token, .. }
            | Expr::Function { token, .. }
            | Expr::Array { token, .. }
            | Expr::Call { token, .. } => token,
            Expr::Identifier(id) => &id.token,
        }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, stmt) in self.statements.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{stmt}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stmt::Let { name, value, .. } => write!(f, "var {} = {};", name.value, value),
            Stmt::Return { value, .. } => write!(f, "return {value};"),
            Stmt::Expr { expr, .. } => write!(f, "{expr};"),
        }
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{ ")?;
        for stmt in &self.statements {
            write!(f, "{stmt} ")?;
        }
        f.write_str("}")
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Int { token, .. } | Expr::Float { token, .. } => f.write_str(&token.literal),
            Expr::Str { value, .. } => write!(f, "\"{}\"", escape_string(value)),
            Expr::Bool { value, .. } => write!(f, "{value}"),
            Expr::Nil { .. } => f.write_str("null"),
            Expr::Identifier(id) => f.write_str(&id.value),
            Expr::Access { segments, .. } => f.write_str(&segments.join(".")),
            Expr::Prefix { op, right, .. } => write!(f, "({op}{right})"),
            Expr::Infix {
                op, left, right, ..
            } => write!(f, "({left} {op} {right})"),
            Expr::Index { left, index, .. } => write!(f, "({left}[{index}])"),
            Expr::If {
                cond, then, alt, ..
            } => {
                write!(f, "if ({cond}) {then}")?;
                if let Some(alt) = alt {
                    write!(f, " else {alt}")?;
                }
                Ok(())
            }
            Expr::While {
                cond, body, then, ..
            } => {
                write!(f, "while ({cond}) ")?;
                match then {
                    // The post-iteration expression folds into the printed
                    // body as its final statement.
                    Some(then) => {
                        f.write_str("{ ")?;
                        for stmt in &body.statements {
                            write!(f, "{stmt} ")?;
                        }
                        write!(f, "{then}; }}")
                    }
                    None => write!(f, "{body}"),
                }
            }
            Expr::Function { params, body, .. } => {
                let names: Vec<&str> = params.iter().map(|p| p.value.as_str()).collect();
                write!(f, "function ({}) {}", names.join(", "), body)
            }
            Expr::Array { elements, .. } => {
                let parts: Vec<String> = elements.iter().map(|e| e.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Expr::Call { callee, args, .. } => {
                let parts: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                write!(f, "{}({})", callee, parts.join(", "))
            }
        }
    }
}

fn escape_string(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('\t', "\\t")
        .replace('\n', "\\n")
        .replace('"', "\\\"")
}
