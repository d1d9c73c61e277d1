//! MicroLisp reader
//!
//! Turns a token stream into a tree of [`Value`](crate::runtime::Value)s.
//! Structural problems are collected rather than raised.

mod sexpr_parser;

pub(crate) use sexpr_parser::reads_as_symbol;
pub use sexpr_parser::{ParseResult, SExprParser};
