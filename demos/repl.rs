//! Interactive REPL for MicroLisp
//!
//! Usage: cargo run --example repl
//!
//! Set `RUST_LOG=microlisp=debug` to see evaluator and snapshot events.

use anyhow::{Context, Result};
use microlisp::{HostArgs, LispEvaluator, Value};
use std::fs;
use std::io::{self, Write};
use std::time::Instant;

fn main() -> Result<()> {
    init_tracing();

    println!("MicroLisp REPL v{}", microlisp::VERSION);
    println!("Commands: load <file>, printenv, saveenv <file>, loadenv <file>, :json <expr>, quit");
    println!();

    let started = Instant::now();
    let mut evaluator = LispEvaluator::new();
    register_host_functions(&evaluator, started);

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if stdin.read_line(&mut input)? == 0 {
            break; // EOF
        }
        let input = input.trim();
        let (command, arg) = match input.split_once(char::is_whitespace) {
            Some((command, arg)) => (command, arg.trim()),
            None => (input, ""),
        };

        let outcome = match command {
            "" => continue,
            "quit" => break,
            "load" => load_file(&evaluator, arg),
            "printenv" => print_env(&evaluator),
            "saveenv" => save_env(&evaluator, arg),
            "loadenv" => {
                load_env(&mut evaluator, arg).map(|()| register_host_functions(&evaluator, started))
            }
            ":json" => print_json(&evaluator, arg),
            _ => {
                println!("{}", evaluator.read_eval_print(input));
                Ok(())
            }
        };

        if let Err(err) = outcome {
            eprintln!("error: {:#}", err);
        }
    }

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_writer(io::stderr))
            .with(EnvFilter::from_default_env())
            .init();
    }
}

/// Host functions are not part of snapshots, so this runs again after `loadenv`
fn register_host_functions(evaluator: &LispEvaluator, started: Instant) {
    evaluator.register_external("print", |args: &[Value]| {
        let rendered: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        println!("{}", rendered.join(" "));
        Ok(Value::nil())
    });
    evaluator.register_external("clock", move |args: &[Value]| {
        HostArgs::new("clock", args).expect_count(0)?;
        Ok(Value::Number(started.elapsed().as_secs_f64()))
    });
}

fn load_file(evaluator: &LispEvaluator, path: &str) -> Result<()> {
    let source = fs::read_to_string(path).with_context(|| format!("reading {}", path))?;
    println!("{}", evaluator.read_eval_print(&source));
    Ok(())
}

fn print_env(evaluator: &LispEvaluator) -> Result<()> {
    println!("{}", evaluator.save_environment()?);
    Ok(())
}

fn save_env(evaluator: &LispEvaluator, path: &str) -> Result<()> {
    let text = evaluator.save_environment()?;
    fs::write(path, text).with_context(|| format!("writing {}", path))?;
    println!("environment saved to {}", path);
    Ok(())
}

fn load_env(evaluator: &mut LispEvaluator, path: &str) -> Result<()> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path))?;
    evaluator
        .load_environment(&text)
        .with_context(|| format!("loading {}", path))?;
    println!("environment loaded from {}", path);
    Ok(())
}

fn print_json(evaluator: &LispEvaluator, source: &str) -> Result<()> {
    let value = evaluator.execute(source)?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
