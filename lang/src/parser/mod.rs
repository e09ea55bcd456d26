pub mod ast;

#[cfg(test)]
mod tests;

use std::fmt;
use std::rc::Rc;

use crate::lexer::{Lexer, Position, Token, TokenKind};
use ast::{Block, Expr, Identifier, Program, Stmt};

/// A parse failure: message plus the position it happened at. Failures do
/// not stop the parse; they accumulate and the program is only considered
/// valid when the list stays empty.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub pos: Position,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Binding powers for the Pratt expression loop, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Lowest,
    Assign,     // = += -=
    Equals,     // == !=
    Inequality, // < >
    Sum,        // + -
    Product,    // * /
    Exponent,   // ^ %
    Prefix,     // -x !x
    Call,       // f(x) f!
    Index,      // a[i]
}

fn precedence_of(kind: TokenKind) -> Precedence {
    match kind {
        TokenKind::Assign | TokenKind::Inc | TokenKind::Dec => Precedence::Assign,
        TokenKind::Equal | TokenKind::NotEqual => Precedence::Equals,
        TokenKind::Less | TokenKind::Greater => Precedence::Inequality,
        TokenKind::Plus | TokenKind::Minus => Precedence::Sum,
        TokenKind::Times | TokenKind::Divide => Precedence::Product,
        TokenKind::Exp | TokenKind::Mod => Precedence::Exponent,
        TokenKind::LParen | TokenKind::Bang => Precedence::Call,
        TokenKind::LBracket => Precedence::Index,
        _ => Precedence::Lowest,
    }
}

/// Pratt parser over a `(current, next)` token window pulled straight from
/// the lexer. Lex errors fold into the parse error list as they surface.
pub struct Parser {
    lexer: Lexer,
    current: Token,
    next: Token,
    errors: Vec<ParseError>,
}

/// Convenience entry point: lex and parse a whole source buffer.
pub fn parse(source: impl Into<Vec<u8>>, filename: &str) -> Result<Program, Vec<ParseError>> {
    let mut parser = Parser::new(Lexer::new(source, filename));
    let program = parser.parse_program();
    let errors = parser.into_errors();
    if errors.is_empty() {
        Ok(program)
    } else {
        Err(errors)
    }
}

impl Parser {
    pub fn new(lexer: Lexer) -> Self {
        let mut parser = Self {
            lexer,
            current: Token::new(TokenKind::Eof, "", Position::new("".into(), 1, 0, 0)),
            next: Token::new(TokenKind::Eof, "", Position::new("".into(), 1, 0, 0)),
            errors: Vec::new(),
        };
        parser.advance();
        parser.advance();
        parser
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<ParseError> {
        self.errors
    }

    pub fn parse_program(&mut self) -> Program {
        let mut program = Program::default();

        while self.current.kind != TokenKind::Eof {
            if let Some(stmt) = self.parse_statement() {
                program.statements.push(stmt);
            }
            self.advance();
        }

        program
    }

    fn parse_statement(&mut self) -> Option<Stmt> {
        match self.current.kind {
            TokenKind::Let => self.parse_let_statement(),
            TokenKind::Return => self.parse_return_statement(),
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_let_statement(&mut self) -> Option<Stmt> {
        let token = self.current.clone();

        if !self.expect_next(TokenKind::Identifier) {
            return None;
        }
        let name = Identifier {
            token: self.current.clone(),
            value: self.current.literal.clone(),
        };

        if !self.expect_next(TokenKind::Assign) {
            return None;
        }
        self.advance();

        let value = self.parse_expression(Precedence::Lowest)?;

        if self.next_is(TokenKind::Terminator) {
            self.advance();
        }

        Some(Stmt::Let { token, name, value })
    }

    fn parse_return_statement(&mut self) -> Option<Stmt> {
        let token = self.current.clone();
        self.advance();

        let value = self.parse_expression(Precedence::Lowest)?;

        if self.next_is(TokenKind::Terminator) {
            self.advance();
        }

        Some(Stmt::Return { token, value })
    }

    fn parse_expression_statement(&mut self) -> Option<Stmt> {
        let token = self.current.clone();
        let expr = self.parse_expression(Precedence::Lowest)?;

        if self.next_is(TokenKind::Terminator) {
            self.advance();
        }

        Some(Stmt::Expr { token, expr })
    }

    fn parse_expression(&mut self, precedence: Precedence) -> Option<Expr> {
        let mut left = self.parse_prefix()?;

        while precedence < precedence_of(self.next.kind) {
            left = match self.next.kind {
                TokenKind::Plus
                | TokenKind::Minus
                | TokenKind::Times
                | TokenKind::Divide
                | TokenKind::Exp
                | TokenKind::Mod
                | TokenKind::Less
                | TokenKind::Greater
                | TokenKind::Equal
                | TokenKind::NotEqual
                | TokenKind::Assign => {
                    self.advance();
                    self.parse_infix_expression(left)?
                }
                TokenKind::Inc | TokenKind::Dec => {
                    self.advance();
                    self.parse_compound_assignment(left)?
                }
                TokenKind::LParen => {
                    self.advance();
                    self.parse_call_expression(left)?
                }
                TokenKind::Bang => {
                    self.advance();
                    // `f!` calls with no arguments.
                    Expr::Call {
                        token: self.current.clone(),
                        callee: Box::new(left),
                        args: Vec::new(),
                    }
                }
                TokenKind::LBracket => {
                    self.advance();
                    self.parse_index_expression(left)?
                }
                _ => return Some(left),
            };
        }

        Some(left)
    }

    fn parse_prefix(&mut self) -> Option<Expr> {
        match self.current.kind {
            TokenKind::Identifier => self.parse_identifier(),
            TokenKind::Int => self.parse_integer_literal(),
            TokenKind::Float => self.parse_float_literal(),
            TokenKind::Str => Some(Expr::Str {
                token: self.current.clone(),
                value: self.current.literal.clone(),
            }),
            TokenKind::True | TokenKind::False => Some(Expr::Bool {
                token: self.current.clone(),
                value: self.current.kind == TokenKind::True,
            }),
            TokenKind::Nil => Some(Expr::Nil {
                token: self.current.clone(),
            }),
            TokenKind::Bang => self.parse_bang_expression(),
            TokenKind::Minus => self.parse_prefix_expression(),
            TokenKind::LParen => self.parse_grouped_expression(),
            TokenKind::LBracket => self.parse_array_literal(),
            TokenKind::If => self.parse_if_expression(),
            TokenKind::While => self.parse_while_expression(),
            TokenKind::Bar => self.parse_function_literal(),
            _ => {
                self.error(format!("'{}' is not a valid operator", self.current));
                None
            }
        }
    }

    /// A lone name, or a dotted `a.b.c` access chain when the next token is
    /// a dot.
    fn parse_identifier(&mut self) -> Option<Expr> {
        let token = self.current.clone();

        if !self.next_is(TokenKind::Dot) {
            return Some(Expr::Identifier(Identifier {
                value: token.literal.clone(),
                token,
            }));
        }

        let mut segments = vec![token.literal.clone()];
        while self.next_is(TokenKind::Dot) {
            self.advance();
            if !self.expect_next(TokenKind::Identifier) {
                return None;
            }
            segments.push(self.current.literal.clone());
        }

        Some(Expr::Access { token, segments })
    }

    fn parse_integer_literal(&mut self) -> Option<Expr> {
        let token = self.current.clone();
        match token.literal.parse::<i64>() {
            Ok(value) => Some(Expr::Int { token, value }),
            Err(_) => {
                self.error(format!("could not parse '{}' as Integer", token.literal));
                None
            }
        }
    }

    fn parse_float_literal(&mut self) -> Option<Expr> {
        let token = self.current.clone();
        match token.literal.parse::<f64>() {
            Ok(value) => Some(Expr::Float { token, value }),
            Err(_) => {
                self.error(format!("could not parse '{}' as Float", token.literal));
                None
            }
        }
    }

    /// `!` is a function-literal shorthand when a body opener follows;
    /// otherwise it is logical negation.
    fn parse_bang_expression(&mut self) -> Option<Expr> {
        if self.next_is(TokenKind::LBrace) || self.next_is(TokenKind::Continue) {
            return self.parse_function_literal();
        }
        self.parse_prefix_expression()
    }

    fn parse_prefix_expression(&mut self) -> Option<Expr> {
        let token = self.current.clone();
        let op = token.kind;

        self.advance();
        let right = self.parse_expression(Precedence::Prefix)?;

        Some(Expr::Prefix {
            token,
            op,
            right: Box::new(right),
        })
    }

    fn parse_infix_expression(&mut self, left: Expr) -> Option<Expr> {
        let token = self.current.clone();
        let op = token.kind;
        let precedence = precedence_of(op);

        self.advance();
        let right = self.parse_expression(precedence)?;

        Some(Expr::Infix {
            token,
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    /// Rewrite `a += b` into `a = a + b` (and `-=` likewise) so the
    /// evaluator never sees compound assignment.
    fn parse_compound_assignment(&mut self, left: Expr) -> Option<Expr> {
        let token = self.current.clone();
        let op = match token.kind {
            TokenKind::Inc => TokenKind::Plus,
            _ => TokenKind::Minus,
        };

        self.advance();
        let right = self.parse_expression(Precedence::Assign)?;

        Some(Expr::Infix {
            token: token.clone(),
            op: TokenKind::Assign,
            left: Box::new(left.clone()),
            right: Box::new(Expr::Infix {
                token,
                op,
                left: Box::new(left),
                right: Box::new(right),
            }),
        })
    }

    fn parse_grouped_expression(&mut self) -> Option<Expr> {
        self.advance();
        let expr = self.parse_expression(Precedence::Lowest)?;
        if !self.expect_next(TokenKind::RParen) {
            return None;
        }
        Some(expr)
    }

    fn parse_array_literal(&mut self) -> Option<Expr> {
        let token = self.current.clone();
        let elements = self.parse_expression_list(TokenKind::RBracket)?;
        Some(Expr::Array { token, elements })
    }

    fn parse_if_expression(&mut self) -> Option<Expr> {
        let token = self.current.clone();

        self.advance();
        let cond = self.parse_expression(Precedence::Lowest)?;

        if !(self.next_is(TokenKind::LBrace) || self.next_is(TokenKind::Continue)) {
            self.error(format!(
                "expected '{{' or ':' following if condition, got '{}' instead",
                self.next
            ));
            return None;
        }
        self.advance();
        let then = self.parse_block()?;

        let mut alt = None;
        if self.next_is(TokenKind::Else) {
            self.advance();
            if self.next_is(TokenKind::LBrace) || self.next_is(TokenKind::Continue) {
                self.advance();
                alt = Some(self.parse_block()?);
            } else {
                // A bare statement after `else`, which is how `else if`
                // chains come out.
                self.advance();
                let block_token = self.current.clone();
                let stmt = self.parse_statement()?;
                alt = Some(Block {
                    token: block_token,
                    statements: vec![stmt],
                });
            }
        }

        Some(Expr::If {
            token,
            cond: Box::new(cond),
            then,
            alt,
        })
    }

    fn parse_while_expression(&mut self) -> Option<Expr> {
        let token = self.current.clone();

        self.advance();
        let cond = self.parse_expression(Precedence::Lowest)?;

        if !(self.next_is(TokenKind::LBrace) || self.next_is(TokenKind::Continue)) {
            self.error(format!(
                "expected '{{' or ':' following while condition, got '{}' instead",
                self.next
            ));
            return None;
        }
        self.advance();
        let body = self.parse_block()?;

        // `then` is not a reserved word; it only acts as the post-iteration
        // clause marker in this position.
        let mut then = None;
        if self.next.kind == TokenKind::Identifier && self.next.literal == "then" {
            self.advance();
            self.advance();
            then = Some(Box::new(self.parse_expression(Precedence::Lowest)?));
        }

        Some(Expr::While {
            token,
            cond: Box::new(cond),
            body,
            then,
        })
    }

    fn parse_function_literal(&mut self) -> Option<Expr> {
        let token = self.current.clone();

        // `!` takes no parameter list; `|...|` does.
        let params = if self.current.kind == TokenKind::Bang {
            Vec::new()
        } else {
            self.parse_function_params()?
        };

        // The body may open with `{` or `:`; otherwise the statement right
        // after the closing bar is the whole body.
        if self.next_is(TokenKind::LBrace) || self.next_is(TokenKind::Continue) {
            self.advance();
        }
        let body = self.parse_block()?;

        Some(Expr::Function {
            token,
            params,
            body: Rc::new(body),
        })
    }

    fn parse_function_params(&mut self) -> Option<Vec<Identifier>> {
        let mut params = Vec::new();

        // `||` is an empty parameter list.
        if self.next_is(TokenKind::Bar) {
            self.advance();
            return Some(params);
        }

        if !self.expect_next(TokenKind::Identifier) {
            return None;
        }
        params.push(Identifier {
            token: self.current.clone(),
            value: self.current.literal.clone(),
        });

        while self.next_is(TokenKind::Comma) {
            self.advance();
            if !self.expect_next(TokenKind::Identifier) {
                return None;
            }
            params.push(Identifier {
                token: self.current.clone(),
                value: self.current.literal.clone(),
            });
        }

        if !self.expect_next(TokenKind::Bar) {
            return None;
        }

        Some(params)
    }

    /// Parse a block with `current` on its leading token: `{` runs to the
    /// matching `}`, anything else delimits a single-statement block. Ends
    /// with `current` on the closing `}` or the statement's last token.
    fn parse_block(&mut self) -> Option<Block> {
        let leading = self.current.clone();
        let brace = leading.kind == TokenKind::LBrace;
        self.advance();

        let mut block = Block {
            token: leading,
            statements: Vec::new(),
        };

        // Empty blocks: `{}`, or `:` straight into a terminator.
        if (brace && self.current.kind == TokenKind::RBrace)
            || (!brace && self.current.kind == TokenKind::Terminator)
        {
            return Some(block);
        }

        if let Some(stmt) = self.parse_statement() {
            block.statements.push(stmt);
        }

        if brace {
            self.advance();
            while self.current.kind != TokenKind::RBrace {
                if self.current.kind == TokenKind::Eof {
                    self.error("unexpected EOF, expected '}'".to_string());
                    break;
                }
                if let Some(stmt) = self.parse_statement() {
                    block.statements.push(stmt);
                }
                self.advance();
            }
        }

        Some(block)
    }

    fn parse_call_expression(&mut self, callee: Expr) -> Option<Expr> {
        let token = self.current.clone();
        let args = self.parse_expression_list(TokenKind::RParen)?;
        Some(Expr::Call {
            token,
            callee: Box::new(callee),
            args,
        })
    }

    fn parse_index_expression(&mut self, left: Expr) -> Option<Expr> {
        let token = self.current.clone();

        self.advance();
        let index = self.parse_expression(Precedence::Lowest)?;

        if !self.expect_next(TokenKind::RBracket) {
            return None;
        }

        Some(Expr::Index {
            token,
            left: Box::new(left),
            index: Box::new(index),
        })
    }

    /// Comma-separated expressions ending at `close`; entered with `current`
    /// on the opening bracket.
    fn parse_expression_list(&mut self, close: TokenKind) -> Option<Vec<Expr>> {
        let mut list = Vec::new();

        if self.next_is(close) {
            self.advance();
            return Some(list);
        }

        self.advance();
        list.push(self.parse_expression(Precedence::Lowest)?);

        while self.next_is(TokenKind::Comma) {
            self.advance();
            self.advance();
            list.push(self.parse_expression(Precedence::Lowest)?);
        }

        if !self.expect_next(close) {
            return None;
        }

        Some(list)
    }

    fn next_is(&self, kind: TokenKind) -> bool {
        self.next.kind == kind
    }

    fn expect_next(&mut self, kind: TokenKind) -> bool {
        if self.next_is(kind) {
            self.advance();
            true
        } else {
            self.error(format!(
                "expected next token to be '{}', got '{}' instead",
                kind, self.next
            ));
            false
        }
    }

    fn advance(&mut self) {
        self.current = std::mem::replace(
            &mut self.next,
            Token::new(TokenKind::Eof, "", Position::new("".into(), 1, 0, 0)),
        );
        let (token, error) = self.lexer.next_token();
        self.next = token;
        if let Some(err) = error {
            self.errors.push(ParseError {
                message: err.to_string(),
                pos: err.position().clone(),
            });
        }
    }

    fn error(&mut self, message: String) {
        self.errors.push(ParseError {
            message,
            pos: self.current.pos.clone(),
        });
    }
}
