use std::sync::atomic::Ordering;

use super::*;

#[test]
fn eval_source_returns_the_final_value() {
    let mut session = Session::new();
    let value = session.eval_source("1 + 2 * 3", "test").unwrap();
    assert_eq!(value, Value::Int(7));
}

#[test]
fn bindings_persist_across_calls() {
    let mut session = Session::new();
    session.eval_source("let a = 5", "test").unwrap();
    let value = session.eval_source("a + 1", "test").unwrap();
    assert_eq!(value, Value::Int(6));
}

#[test]
fn reset_drops_all_bindings() {
    let mut session = Session::new();
    session.eval_source("let a = 5", "test").unwrap();
    session.reset();
    let errors = session.eval_source("a", "test").unwrap_err();
    assert_eq!(errors[0].message(), "identifier not found: a");
}

#[test]
fn parse_errors_refuse_evaluation() {
    let mut session = Session::new();
    let errors = session
        .eval_source("let a = ; println(1)", "test")
        .unwrap_err();
    assert!(!errors.is_empty());
    assert_eq!(errors[0].kind(), "ParseError");

    // Nothing from the bad chunk was evaluated or bound.
    let errors = session.eval_source("a", "test").unwrap_err();
    assert_eq!(errors[0].kind(), "RuntimeError");
}

#[test]
fn lex_errors_surface_through_the_parse_list() {
    let mut session = Session::new();
    let errors = session.eval_source(r#"let s = "abc"#, "test").unwrap_err();
    assert!(errors.iter().any(|e| e.message() == "unterminated string"));
}

#[test]
fn runtime_errors_come_back_as_a_single_error() {
    let mut session = Session::new();
    let errors = session.eval_source("1 / 0", "test").unwrap_err();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind(), "RuntimeError");
    assert_eq!(errors[0].message(), "cannot divide 1 by 0");
}

#[test]
fn errors_render_with_file_line_and_column() {
    let mut session = Session::new();
    let errors = session.eval_source("foobar", "main.vsp").unwrap_err();
    assert_eq!(errors[0].to_string(), "main.vsp:1:1 : identifier not found: foobar");
}

#[test]
fn eval_reader_consumes_a_stream() {
    let mut session = Session::new();
    let value = session.eval_reader(&b"40 + 2"[..], "stream").unwrap();
    assert_eq!(value, Value::Int(42));
}

#[test]
fn parse_source_builds_a_program_without_evaluating() {
    let program = parse_source("let a = 1\na + 2", "test").unwrap();
    assert_eq!(program.statements.len(), 2);
}

#[test]
fn stop_handle_cancels_between_statements() {
    let mut session = Session::new();
    session.stop_handle().store(true, Ordering::Relaxed);
    let value = session.eval_source("1 + 2", "test").unwrap();
    assert_eq!(value, Value::Nil);

    // A reset clears the flag again.
    session.reset();
    assert_eq!(session.eval_source("1 + 2", "test").unwrap(), Value::Int(3));
}
