use expect_test::{expect, Expect};

use super::*;

/// Render the whole token stream (with any errors inline) as one compact
/// line: payload-carrying kinds show their literal.
fn check(input: &str, expect: Expect) {
    let mut lexer = Lexer::new(input, "test");
    let mut parts = Vec::new();

    loop {
        let (tok, err) = lexer.next_token();
        parts.push(render(&tok));
        if let Some(err) = err {
            parts.push(format!("error<{err}>"));
        }
        if tok.kind == TokenKind::Eof {
            break;
        }
    }

    expect.assert_eq(&parts.join(" "));
}

fn render(tok: &Token) -> String {
    match tok.kind {
        TokenKind::Int
        | TokenKind::Float
        | TokenKind::Str
        | TokenKind::Identifier
        | TokenKind::Illegal => format!("{:?}({})", tok.kind, tok.literal),
        kind => format!("{kind:?}"),
    }
}

#[test]
fn lex_integer_and_float_literals() {
    check("42", expect![["Int(42) Eof"]]);
    check("3.14", expect![["Float(3.14) Eof"]]);
    check("0 07", expect![["Int(0) Int(07) Eof"]]);
}

#[test]
fn dot_without_trailing_digit_is_not_a_float() {
    check("1.", expect![["Int(1) Dot Eof"]]);
    check("1.x", expect![["Int(1) Dot Identifier(x) Eof"]]);
    check("a.b", expect![["Identifier(a) Dot Identifier(b) Eof"]]);
}

#[test]
fn lex_identifiers_and_keywords() {
    check(
        "let if else while for ret return true false nil",
        expect![["Let If Else While While Return Return True False Nil Eof"]],
    );
    check("foo _bar b2", expect![["Identifier(foo) Identifier(_bar) Identifier(b2) Eof"]]);
    check("letx", expect![["Identifier(letx) Eof"]]);
}

#[test]
fn lex_operators() {
    check(
        "= + - * / ^ % < > . : |",
        expect![["Assign Plus Minus Times Divide Exp Mod Less Greater Dot Continue Bar Eof"]],
    );
}

#[test]
fn greedy_two_char_operators() {
    check(
        "a == b != c += d -= e",
        expect![[
            "Identifier(a) Equal Identifier(b) NotEqual Identifier(c) Inc Identifier(d) Dec Identifier(e) Eof"
        ]],
    );
    check("= =", expect![["Assign Assign Eof"]]);
    check("!x", expect![["Bang Identifier(x) Eof"]]);
}

#[test]
fn lex_string_literal() {
    check(r#""hello world""#, expect![["Str(hello world) Eof"]]);
    check(r#""""#, expect![["Str() Eof"]]);
}

#[test]
fn string_escapes_decode_at_lex_time() {
    check(r#""a\tb""#, expect![["Str(a\tb) Eof"]]);
    check(r#""a\nb""#, expect![["Str(a\nb) Eof"]]);
    // Only \t and \n are escapes; anything else keeps its backslash.
    check(r#""a\xb""#, expect![["Str(a\\xb) Eof"]]);
}

#[test]
fn unterminated_string_is_an_error() {
    check(r#""abc"#, expect![["Str(abc) error<unterminated string> Eof"]]);
}

#[test]
fn line_comments_run_to_end_of_line() {
    check("// a comment\n5", expect![["Int(5) Eof"]]);
    check("5 // trailing\n6", expect![["Int(5) Terminator Int(6) Eof"]]);
}

#[test]
fn newline_becomes_terminator_after_a_value() {
    check("a\nb", expect![["Identifier(a) Terminator Identifier(b) Eof"]]);
    check("5\n", expect![["Int(5) Terminator Eof"]]);
}

#[test]
fn consecutive_newlines_collapse_to_one_terminator() {
    check(
        "a\n\n\nb",
        expect![["Identifier(a) Terminator Identifier(b) Eof"]],
    );
}

#[test]
fn newline_after_open_tokens_is_a_continuation() {
    check("a +\nb", expect![["Identifier(a) Plus Identifier(b) Eof"]]);
    check("[1,\n2]", expect![["LBracket Int(1) Comma Int(2) RBracket Eof"]]);
    check("(\n1)", expect![["LParen Int(1) RParen Eof"]]);
    check("{\n}", expect![["LBrace RBrace Eof"]]);
    check("|x,\ny|", expect![["Bar Identifier(x) Comma Identifier(y) Bar Eof"]]);
    check("a =\n1", expect![["Identifier(a) Assign Int(1) Eof"]]);
    check("a.\nb", expect![["Identifier(a) Dot Identifier(b) Eof"]]);
    // Bang is an operator, so a zero-argument call keeps its line open.
    check("f!\ng", expect![["Identifier(f) Bang Identifier(g) Eof"]]);
}

#[test]
fn newline_after_closers_terminates() {
    check(
        "f(1)\ng",
        expect![["Identifier(f) LParen Int(1) RParen Terminator Identifier(g) Eof"]],
    );
}

#[test]
fn explicit_semicolons() {
    check(
        "a;b;",
        expect![["Identifier(a) Terminator Identifier(b) Terminator Eof"]],
    );
}

#[test]
fn balanced_brackets_lex_cleanly() {
    check(
        "({[]})",
        expect![["LParen LBrace LBracket RBracket RBrace RParen Eof"]],
    );
}

#[test]
fn extra_closer_is_an_error() {
    check(")", expect![["RParen error<extra )> Eof"]]);
    check("]", expect![["RBracket error<extra ]> Eof"]]);
}

#[test]
fn mismatched_closer_is_an_error() {
    check(
        "(]",
        expect![["LParen RBracket error<unbalanced (. got ]> Eof error<unclosed (>"]],
    );
}

#[test]
fn unclosed_bracket_reports_at_eof() {
    check("(", expect![["LParen Eof error<unclosed (>"]]);
    check("{ [", expect![["LBrace LBracket Eof error<unclosed [>"]]);
}

#[test]
fn unknown_byte_is_illegal() {
    check("@", expect![["Illegal(@) Eof"]]);
    check("5 # 6", expect![["Int(5) Illegal(#) Int(6) Eof"]]);
}

#[test]
fn positions_track_lines_columns_and_offsets() {
    let mut lexer = Lexer::new("ab\ncd", "test");
    let mut seen = Vec::new();
    loop {
        let (tok, _) = lexer.next_token();
        let done = tok.kind == TokenKind::Eof;
        seen.push(format!(
            "{}@{}:{}+{}",
            render(&tok),
            tok.pos.line,
            tok.pos.column,
            tok.pos.offset
        ));
        if done {
            break;
        }
    }
    assert_eq!(
        seen.join(" "),
        "Identifier(ab)@1:1+0 Terminator@2:0+2 Identifier(cd)@2:1+3 Eof@2:3+5"
    );
}

#[test]
fn position_filename_is_attached() {
    let mut lexer = Lexer::new("x", "main.vsp");
    let (tok, _) = lexer.next_token();
    assert_eq!(tok.pos.to_string(), "main.vsp:1:1");
}

#[test]
fn eof_repeats() {
    let mut lexer = Lexer::new("", "test");
    assert_eq!(lexer.next_token().0.kind, TokenKind::Eof);
    assert_eq!(lexer.next_token().0.kind, TokenKind::Eof);
}
