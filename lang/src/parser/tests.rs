use expect_test::{expect, Expect};

use super::*;

fn parse_program(source: &str) -> Program {
    parse(source, "test").expect("unexpected parse errors")
}

/// Snapshot the emitted (JavaScript-flavored) rendering of the parse.
fn check(source: &str, expect: Expect) {
    expect.assert_eq(&parse_program(source).to_string());
}

fn parse_errors(source: &str) -> Vec<ParseError> {
    match parse(source, "test") {
        Ok(_) => Vec::new(),
        Err(errors) => errors,
    }
}

#[test]
fn parse_literals() {
    check("5", expect![["5;"]]);
    check("3.14", expect![["3.14;"]]);
    check(r#""hi""#, expect![[r#""hi";"#]]);
    check("true", expect![["true;"]]);
    check("false", expect![["false;"]]);
    check("nil", expect![["null;"]]);
    check("foo", expect![["foo;"]]);
}

#[test]
fn string_literals_reescape_when_printed() {
    check(r#""a\tb""#, expect![[r#""a\tb";"#]]);
    check(r#""a\nb""#, expect![[r#""a\nb";"#]]);
}

#[test]
fn parse_prefix_expressions() {
    check("-5", expect![["(-5);"]]);
    check("!ok", expect![["(!ok);"]]);
    check("!!x", expect![["(!(!x));"]]);
}

#[test]
fn parse_infix_precedence() {
    check("1 + 2 * 3", expect![["(1 + (2 * 3));"]]);
    check("(1 + 2) * 3", expect![["((1 + 2) * 3);"]]);
    check("a + b / c", expect![["(a + (b / c));"]]);
    check("5 < 4 != 3 > 4", expect![["((5 < 4) != (3 > 4));"]]);
    check("2 ^ 3 * 4", expect![["((2 ^ 3) * 4);"]]);
    check("1 + 2 % 3", expect![["(1 + (2 % 3));"]]);
    check("-a * b", expect![["((-a) * b);"]]);
    check("a + b == c + d", expect![["((a + b) == (c + d));"]]);
}

#[test]
fn assignment_is_an_infix_expression() {
    check("a = 5", expect![["(a = 5);"]]);
    check("a = b = 5", expect![["((a = b) = 5);"]]);
    check("a = b + 1", expect![["(a = (b + 1));"]]);
}

#[test]
fn compound_assignment_rewrites_to_plain_assignment() {
    check("i += 1", expect![["(i = (i + 1));"]]);
    check("i -= 2", expect![["(i = (i - 2));"]]);
    check("a[0] += 4", expect![["((a[0]) = ((a[0]) + 4));"]]);
    check("i += 1 + 2", expect![["(i = (i + (1 + 2)));"]]);
}

#[test]
fn parse_array_literals_and_indexing() {
    check("[]", expect![["[];"]]);
    check("[1, 2 * 2, 3]", expect![["[1, (2 * 2), 3];"]]);
    check("a[1]", expect![["(a[1]);"]]);
    check("a[-1]", expect![["(a[(-1)]);"]]);
    check("a[1 + 1]", expect![["(a[(1 + 1)]);"]]);
}

#[test]
fn parse_call_expressions() {
    check("add(1, 2 * 3)", expect![["add(1, (2 * 3));"]]);
    check("f()", expect![["f();"]]);
    check("f!", expect![["f();"]]);
    check("f(1)(2)", expect![["f(1)(2);"]]);
}

#[test]
fn parse_function_literals() {
    check("|x, y| { x + y }", expect![["function (x, y) { (x + y); };"]]);
    check("|x| x + 2", expect![["function (x) { (x + 2); };"]]);
    check("|x| : x + 2", expect![["function (x) { (x + 2); };"]]);
    check("|| 5", expect![["function () { 5; };"]]);
    check("!{ 5 }", expect![["function () { 5; };"]]);
    check("! : 5", expect![["function () { 5; };"]]);
}

#[test]
fn function_literal_called_immediately() {
    check("|x| { x }(5)", expect![["function (x) { x; }(5);"]]);
}

#[test]
fn parse_let_and_return_statements() {
    check("let a = 5", expect![["var a = 5;"]]);
    check("let f = |x| x + 2; f(3)", expect![["var f = function (x) { (x + 2); };\nf(3);"]]);
    check("ret 10", expect![["return 10;"]]);
}

#[test]
fn parse_if_expressions() {
    check("if x { 1 }", expect![["if (x) { 1; };"]]);
    check("if x { 1 } else { 2 }", expect![["if (x) { 1; } else { 2; };"]]);
    check("if x : 1", expect![["if (x) { 1; };"]]);
    check("if x : 1 else : 2", expect![["if (x) { 1; } else { 2; };"]]);
    check("if a < b { a }", expect![["if ((a < b)) { a; };"]]);
}

#[test]
fn else_takes_a_bare_statement_for_chaining() {
    check(
        "if a { 1 } else if b { 2 } else { 3 }",
        expect![["if (a) { 1; } else { if (b) { 2; } else { 3; }; };"]],
    );
}

#[test]
fn parse_while_expressions() {
    check("while i < 3 { i += 1 }", expect![["while ((i < 3)) { (i = (i + 1)); };"]]);
    check("while x : f!", expect![["while (x) { f(); };"]]);
}

#[test]
fn while_with_then_clause() {
    check(
        "while x { f! } then g!",
        expect![["while (x) { f(); g(); };"]],
    );
}

#[test]
fn then_is_not_reserved_elsewhere() {
    check("let then = 5", expect![["var then = 5;"]]);
}

#[test]
fn parse_access_identifiers() {
    check("a.b", expect![["a.b;"]]);
    check("a.b.c", expect![["a.b.c;"]]);
    check("p.age = 6", expect![["(p.age = 6);"]]);
    check("p.f(1)", expect![["p.f(1);"]]);
}

#[test]
fn terminator_insertion_separates_statements() {
    check("let a = 5\nlet b = a", expect![["var a = 5;\nvar b = a;"]]);
    check("1 + 2\n3 * 4", expect![["(1 + 2);\n(3 * 4);"]]);
}

#[test]
fn multiline_blocks() {
    check(
        "let f = |x| {\n  let y = x + 1\n  ret y\n}",
        expect![["var f = function (x) { var y = (x + 1); return y; };"]],
    );
}

#[test]
fn nested_blocks() {
    check(
        "if a { if b { 1 } ret 2 }",
        expect![["if (a) { if (b) { 1; }; return 2; };"]],
    );
}

#[test]
fn empty_blocks_are_allowed() {
    check("if x {}", expect![["if (x) { };"]]);
    check("|| {}", expect![["function () { };"]]);
}

#[test]
fn missing_identifier_in_let_is_an_error() {
    let errors = parse_errors("let 5 = 3");
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].message,
        "expected next token to be 'Identifier', got '5' instead"
    );
}

#[test]
fn dangling_operator_is_an_error() {
    let errors = parse_errors("1 + ");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "'EOF' is not a valid operator");
}

#[test]
fn invalid_expression_start_is_an_error() {
    let errors = parse_errors("*");
    assert_eq!(errors[0].message, "'*' is not a valid operator");
}

#[test]
fn parsing_continues_after_an_error() {
    let mut parser = Parser::new(Lexer::new("let a 5; let b = 2", "test"));
    let program = parser.parse_program();
    assert_eq!(parser.errors().len(), 1);
    assert_eq!(
        parser.errors()[0].message,
        "expected next token to be '=', got '5' instead"
    );
    assert_eq!(
        program.statements.last().unwrap().to_string(),
        "var b = 2;"
    );
}

#[test]
fn lex_errors_fold_into_the_parse_error_list() {
    let errors = parse_errors("(");
    assert!(errors.iter().any(|e| e.message == "unclosed ("));
}

#[test]
fn unterminated_string_refuses_the_program() {
    let errors = parse_errors(r#"let s = "abc"#);
    assert!(errors.iter().any(|e| e.message == "unterminated string"));
}

#[test]
fn unclosed_block_reports_instead_of_looping() {
    let errors = parse_errors("if x { 1");
    assert!(errors.iter().any(|e| e.message.contains("expected '}'")));
}

#[test]
fn error_positions_point_into_the_source() {
    let errors = parse_errors("let 5 = 3");
    assert_eq!(errors[0].pos.filename.as_ref(), "test");
    assert_eq!(errors[0].pos.line, 1);
}

#[test]
fn invalid_integer_literal_is_reported() {
    // Over i64::MAX.
    let errors = parse_errors("9223372036854775808");
    assert_eq!(
        errors[0].message,
        "could not parse '9223372036854775808' as Integer"
    );
}

#[test]
fn printing_a_reparsed_print_is_stable() {
    let inputs = [
        "1 + 2 * 3",
        "-(5 + 5)",
        "a[1]",
        "f(1, 2)",
        "[1, [2, 3]]",
        "a.b.c",
        "!x",
        "a = b + 1",
        "x == nil",
    ];
    for input in inputs {
        let once = parse_program(input).to_string();
        let twice = parse_program(&once).to_string();
        assert_eq!(once, twice, "print unstable for {input:?}");
    }
}
