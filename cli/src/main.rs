//! Vesper CLI.
//!
//! Usage:
//!   vesper              Start the REPL
//!   vesper FILE         Evaluate a script; print the final non-nil value
//!   vesper --js FILE    Parse a script and emit its JavaScript rendering

mod repl;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use vesper_lang::runner::{parse_source, Session};

#[derive(Parser, Debug)]
#[command(name = "vesper")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Script file to evaluate; omit to start the REPL
    script: Option<PathBuf>,

    /// Emit the parsed program as JavaScript instead of evaluating it
    #[arg(long = "js")]
    emit_js: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let Some(script) = args.script else {
        return repl::run();
    };

    let source = match read_script(&script) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("{err:#}");
            return ExitCode::from(1);
        }
    };
    let filename = script.display().to_string();

    if args.emit_js {
        return emit_js(source, &filename);
    }

    let mut session = Session::new();
    match session.eval_source(source, &filename) {
        Ok(value) => {
            if !value.is_nil() {
                println!("{value}");
            }
            ExitCode::SUCCESS
        }
        Err(errors) => {
            for err in errors {
                eprintln!("{err}");
            }
            ExitCode::from(1)
        }
    }
}

fn read_script(path: &Path) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("error reading file {}", path.display()))
}

fn emit_js(source: Vec<u8>, filename: &str) -> ExitCode {
    match parse_source(source, filename) {
        Ok(program) => {
            if !program.statements.is_empty() {
                println!("{program}");
            }
            ExitCode::SUCCESS
        }
        Err(errors) => {
            for err in errors {
                eprintln!("{err}");
            }
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_args_repl_mode() {
        let args = Args::try_parse_from(["vesper"]).unwrap();
        assert!(args.script.is_none());
        assert!(!args.emit_js);
    }

    #[test]
    fn parse_args_script_mode() {
        let args = Args::try_parse_from(["vesper", "main.vsp"]).unwrap();
        assert_eq!(args.script, Some(PathBuf::from("main.vsp")));
        assert!(!args.emit_js);
    }

    #[test]
    fn parse_args_js_mode() {
        let args = Args::try_parse_from(["vesper", "--js", "main.vsp"]).unwrap();
        assert_eq!(args.script, Some(PathBuf::from("main.vsp")));
        assert!(args.emit_js);
    }
}
