//! Interactive read-eval-print loop.
//!
//! Single-line commands start with `:` (`:r` restarts with a fresh
//! environment, `:q`/`:x`/`:e` quit, `:c` clears the screen). `use PATH`
//! loads a file into the persistent environment. A line ending in `{`
//! switches to brace-continuation mode until the braces balance again.

use std::process::ExitCode;

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use vesper_lang::runner::Session;

const INTRO: &str = "\x1b[2J\x1b[0;0HVesper (repl). :q quits, :r restarts, use FILE loads a script.\n";

const RED: u8 = 31;
const GREEN: u8 = 32;
const YELLOW: u8 = 33;
const BLUE: u8 = 34;
const MAGENTA: u8 = 35;

fn color(text: &str, code: u8) -> String {
    format!("\x1b[{code}m{text}\x1b[0m")
}

enum Outcome {
    Restart,
    Quit,
}

pub fn run() -> ExitCode {
    loop {
        match run_session() {
            Ok(Outcome::Restart) => continue,
            Ok(Outcome::Quit) => return ExitCode::SUCCESS,
            Err(err) => {
                eprintln!("repl error: {err}");
                return ExitCode::from(1);
            }
        }
    }
}

fn run_session() -> rustyline::Result<Outcome> {
    print!("{INTRO}");

    let mut editor = DefaultEditor::new()?;
    let mut session = Session::new();

    loop {
        let mut line_num = 1;
        let prompt = format!("{line_num}{}", color("| ", GREEN));

        let line = match editor.readline(&prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                return Ok(Outcome::Quit)
            }
            Err(err) => return Err(err),
        };

        if line.trim().is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(&line);

        match line.trim() {
            ":r" => return Ok(Outcome::Restart),
            ":q" | ":x" | ":e" => return Ok(Outcome::Quit),
            ":c" => {
                print!("{INTRO}");
                continue;
            }
            _ => {}
        }

        if let Some(path) = line.trim().strip_prefix("use ") {
            load_file(&mut session, path.trim());
            continue;
        }

        let mut buffer = line.clone();
        buffer.push('\n');

        // Brace continuation: keep reading until the block closes.
        if line.trim_end().ends_with('{') {
            let mut depth = brace_depth(&line);
            while depth > 0 {
                line_num += 1;
                let prompt = format!("{line_num}{}", color("| ", BLUE));
                let next = match editor.readline(&prompt) {
                    Ok(next) => next,
                    Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                        return Ok(Outcome::Quit)
                    }
                    Err(err) => return Err(err),
                };
                depth += brace_depth(&next);
                buffer.push_str(&next);
                buffer.push('\n');
            }
        }

        match session.eval_source(buffer, "repl") {
            Ok(value) => {
                if !value.is_nil() {
                    println!(
                        " {} \t{}",
                        color("| ", MAGENTA),
                        color(&value.to_string(), YELLOW)
                    );
                }
            }
            Err(errors) => print_errors(&errors),
        }
    }
}

fn load_file(session: &mut Session, path: &str) {
    let source = match std::fs::read(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("failed to read file {path}: {err}");
            return;
        }
    };

    if let Err(errors) = session.eval_source(source, path) {
        print_errors(&errors);
    }
}

fn print_errors(errors: &[vesper_lang::error::VesperError]) {
    for err in errors {
        println!(" {} \t{}", color("| ", RED), color(&err.to_string(), RED));
    }
}

fn brace_depth(line: &str) -> i32 {
    let mut depth = 0;
    for c in line.chars() {
        match c {
            '{' => depth += 1,
            '}' => depth -= 1,
            _ => {}
        }
    }
    depth
}
