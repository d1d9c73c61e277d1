use regex::Regex;

use crate::error::{Error, Result};
use crate::lexer::{Token, TokenKind};
use crate::runtime::{Primitive, Value};

lazy_static::lazy_static! {
    // Decimal floats only; words like `inf` or `nan` stay symbols
    static ref NUMBER_LITERAL: Regex =
        Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?$").expect("valid number pattern");
}

/// A parse tree plus every structural problem found while building it
///
/// Parsing never stops at the first error. When `errors` is non-empty the
/// value is a best-effort partial tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseResult {
    /// Parsed top-level form
    pub value: Value,
    /// Accumulated error messages, in discovery order
    pub errors: Vec<String>,
}

impl ParseResult {
    /// True if no errors were reported
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Append an error message
    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// The parsed value, or all errors folded into [`Error::ParseFailed`]
    pub fn into_result(self) -> Result<Value> {
        if self.errors.is_empty() {
            Ok(self.value)
        } else {
            Err(Error::ParseFailed(self.errors))
        }
    }
}

/// Recursive-descent reader over scanner tokens
///
/// One call to [`parse`](Self::parse) reads one top-level form; anything
/// after it is reported as trailing input.
pub struct SExprParser {
    tokens: Vec<Token>,
    current: usize,
    errors: Vec<String>,
}

impl SExprParser {
    /// Creates a new parser over scanned tokens
    pub fn new(tokens: Vec<Token>) -> Self {
        SExprParser {
            tokens,
            current: 0,
            errors: Vec::new(),
        }
    }

    /// Reads one top-level form and reports any leftover tokens
    pub fn parse(&mut self) -> ParseResult {
        let value = self.read_form();

        if !self.is_at_end() {
            self.errors
                .push("unexpected tokens found at end of program:".to_string());
            while !self.is_at_end() {
                let token = self.advance();
                self.errors.push(token.lexeme);
            }
        }

        ParseResult {
            value,
            errors: std::mem::take(&mut self.errors),
        }
    }

    fn read_form(&mut self) -> Value {
        if self.is_at_end() {
            self.errors.push("unexpected end of file".to_string());
            return Value::nil();
        }

        let token = self.advance();
        match token.kind {
            TokenKind::LeftParen => self.read_list(),
            TokenKind::RightParen => {
                self.errors.push("unexpected \")\"".to_string());
                Value::nil()
            }
            TokenKind::Word(word) => classify_word(&word),
            TokenKind::Eof => Value::nil(),
        }
    }

    fn read_list(&mut self) -> Value {
        let mut items = Vec::new();

        while !self.is_at_end() && !self.check(&TokenKind::RightParen) {
            let before = self.errors.len();
            let item = self.read_form();
            // Elements that failed to read are left out of the list
            if self.errors.len() == before {
                items.push(item);
            }
        }

        if self.is_at_end() {
            let last = items.last().map(|v| v.to_string()).unwrap_or_default();
            self.errors.push(format!("unmatched paren: {}", last));
            return Value::nil();
        }

        self.advance(); // the closing paren
        Value::list(items)
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.tokens.len() || self.tokens[self.current].kind == TokenKind::Eof
    }

    fn check(&self, kind: &TokenKind) -> bool {
        !self.is_at_end() && &self.tokens[self.current].kind == kind
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.current].clone();
        self.current += 1;
        token
    }
}

/// Bare-token classification: boolean, then number, then primitive, then symbol
fn classify_word(word: &str) -> Value {
    match word {
        "#t" => return Value::Bool(true),
        "#f" => return Value::Bool(false),
        _ => {}
    }

    if NUMBER_LITERAL.is_match(word) {
        if let Ok(n) = word.parse::<f64>() {
            return Value::Number(n);
        }
    }

    match Primitive::from_name(word) {
        Some(p) => Value::Atom(p),
        None => Value::symbol(word),
    }
}

/// True if `word` would read back as a single symbol token
pub(crate) fn reads_as_symbol(word: &str) -> bool {
    !word.is_empty()
        && !word
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '(' | ')' | ';' | '\0'))
        && matches!(classify_word(word), Value::Symbol(_))
}
