//! # MicroLisp - A small embeddable Lisp
//!
//! A compact Lisp interpreter meant to live inside a host program: the host
//! registers its own operations as external functions, scripts call them,
//! and the whole interpreter state can be saved to text and restored later.
//!
//! ## Features
//!
//! - **Lexical closures** over a shared, mutable environment chain
//! - **Fixed primitive table** of 49 special forms and builtin operators
//! - **Snapshots** of the environment graph that keep shared and cyclic
//!   references intact
//! - **Host functions** registered by name, receiving evaluated arguments
//!
//! ## Quick Start
//!
//! ```rust
//! use microlisp::{LispEvaluator, Value};
//!
//! # fn main() -> microlisp::Result<()> {
//! let evaluator = LispEvaluator::new();
//! evaluator.execute("(define (square x) (* x x))")?;
//! let result = evaluator.execute("(square 5)")?;
//!
//! assert_eq!(result, Value::Number(25.0));
//! # Ok(())
//! # }
//! ```
//!
//! ### Scanner, Parser, Evaluator
//!
//! The stages can also be driven one by one:
//!
//! ```rust
//! use microlisp::{Environment, Parser, Scanner, Value};
//!
//! # fn main() -> microlisp::Result<()> {
//! let tokens = Scanner::new("(let ((x 1) (y 2)) (+ x y))").scan_tokens();
//! let parsed = Parser::new(tokens).parse();
//! assert!(parsed.is_ok());
//!
//! let env = Environment::new();
//! let result = microlisp::eval(&parsed.value, &env)?;
//! assert_eq!(result, Value::Number(3.0));
//! # Ok(())
//! # }
//! ```
//!
//! ### Host Functions
//!
//! ```rust
//! use microlisp::{HostArgs, LispEvaluator, Value};
//!
//! # fn main() -> microlisp::Result<()> {
//! let evaluator = LispEvaluator::new();
//! evaluator.register_external("half", |args: &[Value]| {
//!     let args = HostArgs::new("half", args);
//!     args.expect_count(1)?;
//!     Ok(Value::Number(args.number(0)? / 2.0))
//! });
//!
//! assert_eq!(evaluator.execute("(half 9)")?, Value::Number(4.5));
//! # Ok(())
//! # }
//! ```
//!
//! ### Saving and Restoring State
//!
//! ```rust
//! use microlisp::{LispEvaluator, Value};
//!
//! # fn main() -> microlisp::Result<()> {
//! let evaluator = LispEvaluator::new();
//! evaluator.execute("(define (make-counter) (begin (define n 0) (lambda () (begin (set! n (+ n 1)) n))))")?;
//! evaluator.execute("(define tick (make-counter))")?;
//! evaluator.execute("(tick)")?;
//!
//! let snapshot = evaluator.save_environment()?;
//!
//! let mut restored = LispEvaluator::new();
//! restored.load_environment(&snapshot)?;
//! assert_eq!(restored.execute("(tick)")?, Value::Number(2.0));
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Reader problems are collected in [`ParseResult::errors`]; evaluation and
//! snapshot failures come back as [`Error`]:
//!
//! ```rust
//! use microlisp::LispEvaluator;
//!
//! let evaluator = LispEvaluator::new();
//! let err = evaluator.execute("(set! undefined-sym 1)").unwrap_err();
//! assert!(err.to_string().contains("undefined-sym"));
//!
//! // Division by zero is defined to produce 0
//! assert_eq!(evaluator.read_eval_print("(/ 4 0)"), "parsed: (/ 4 0)\nresult: 0");
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Source Code → Scanner → Tokens → Parser → Value tree → Evaluator → Value
//!                                                  ↕
//!                                     Environment graph ↔ Snapshot text
//! ```
//!
//! - [`Scanner`] - splits source text into tokens
//! - [`Parser`] - reads one top-level form into a [`Value`] tree
//! - [`Evaluator`] - evaluates forms against a root [`Environment`]
//! - [`snapshot`] - environment graph to text and back
//! - [`host`] - host function registration and argument helpers

/// Version of the MicroLisp interpreter
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod error;
pub mod host;
pub mod lexer;
pub mod parser;
pub mod runtime;
pub mod snapshot;

// Re-export main types
pub use error::{Error, ErrorKind, Result};
pub use host::{ExternalFunction, HostArgs, HostRegistry};
pub use lexer::{SExprScanner, Token, TokenKind};
pub use parser::{ParseResult, SExprParser};
pub use runtime::{eval, Closure, Environment, EvaluatorConfig, LispEvaluator, Primitive, Value};
pub use snapshot::{deserialize, deserialize_into, serialize};

/// Type alias for the S-expression scanner (lexer).
pub type Scanner = SExprScanner;

/// Type alias for the S-expression parser.
pub type Parser = SExprParser;

/// Type alias for the evaluator (interpreter).
pub type Evaluator = LispEvaluator;

/// Reads one top-level form from `text`
///
/// Never fails: problems are listed in [`ParseResult::errors`] next to a
/// best-effort value.
pub fn parse(text: &str) -> ParseResult {
    let tokens = SExprScanner::new(text).scan_tokens();
    SExprParser::new(tokens).parse()
}
