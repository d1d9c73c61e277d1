//! Lexical analysis for MicroLisp
//!
//! Converts source text into a stream of parenthesis and word tokens.

mod sexpr_scanner;
mod token;

pub use sexpr_scanner::SExprScanner;
pub use token::{Token, TokenKind};
