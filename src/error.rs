//! Error types for the MicroLisp interpreter

use thiserror::Error;

/// MicroLisp interpreter errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // Reader errors
    /// The reader reported one or more structural problems
    ///
    /// **Triggered by:** Callers that need a hard failure from [`crate::parse`],
    /// such as [`crate::LispEvaluator::execute`] or snapshot loading.
    /// **Example:** `(foo` (unmatched paren)
    #[error("parse error: {}", join_lines(.0))]
    ParseFailed(Vec<String>),

    // Evaluation errors
    /// Reference to a symbol that is not bound anywhere in the chain
    ///
    /// **Triggered by:** Evaluating an unbound symbol, or `set!` on one
    /// **Example:** `(set! undefined-sym 1)`
    #[error("unknown symbol: {name}")]
    UnknownSymbol {
        /// Symbol name
        name: String,
    },

    /// Wrong number or shape of operands for a special form or primitive
    ///
    /// **Example:** `(if #t 1)`, `(quote)`, `(let (x 1) x)`
    #[error("{op} {reason}")]
    InvalidArguments {
        /// Primitive or form name
        op: String,
        /// What was wrong
        reason: String,
    },

    /// Operand of the wrong type
    ///
    /// **Example:** `(+ 1 #t)`, `(length 5)`
    #[error("{op} expected {expected}, got {got}")]
    TypeError {
        /// Primitive or form name
        op: String,
        /// Expected type
        expected: String,
        /// Actual value
        got: String,
    },

    /// Closure applied to the wrong number of arguments
    #[error(
        "function applied to too {} arguments, expected {expected}, got {got}: {function}",
        arity_word(.expected, .got)
    )]
    ArityMismatch {
        /// Number of parameters
        expected: usize,
        /// Number of arguments supplied
        got: usize,
        /// Textual form of the closure
        function: String,
    },

    /// Head of an application evaluated to something that cannot be applied
    ///
    /// **Example:** `(1 2 3)`
    #[error("unable to apply non-function: {value}")]
    NotCallable {
        /// Textual form of the head value
        value: String,
    },

    /// `equal?` on two values of the same type with no defined equality
    #[error("{op}: unimplemented type combination")]
    UnsupportedComparison {
        /// Primitive name
        op: String,
    },

    /// `(define (if x) ...)` and friends
    #[error("can't redefine built-in function: {name}")]
    RedefineBuiltin {
        /// Primitive name
        name: String,
    },

    /// Failure raised by a host-registered external function
    #[error("{0}")]
    RuntimeError(String),

    // Snapshot errors
    /// Serialized environment text does not match the expected grammar
    #[error("environment deserialization: {0}")]
    Deserialize(String),

    /// Environment graph could not be written out
    #[error("environment serialization: {0}")]
    Serialize(String),
}

fn join_lines(messages: &[String]) -> String {
    messages.join("\n")
}

fn arity_word(expected: &usize, got: &usize) -> &'static str {
    if got > expected {
        "many"
    } else {
        "few"
    }
}

/// Which stage of the interpreter produced an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Reader problems
    Parse,
    /// Evaluation failures
    Eval,
    /// Snapshot serialization or deserialization failures
    Snapshot,
}

impl Error {
    /// Create a runtime error with a message
    pub fn runtime(msg: impl Into<String>) -> Self {
        Error::RuntimeError(msg.into())
    }

    /// Create a deserialization error with a message
    pub fn deserialize(msg: impl Into<String>) -> Self {
        Error::Deserialize(msg.into())
    }

    pub(crate) fn invalid_args(op: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidArguments {
            op: op.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn type_error(
        op: impl Into<String>,
        expected: impl Into<String>,
        got: impl ToString,
    ) -> Self {
        Error::TypeError {
            op: op.into(),
            expected: expected.into(),
            got: got.to_string(),
        }
    }

    /// Classify the error by interpreter stage
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ParseFailed(_) => ErrorKind::Parse,

            Error::Deserialize(_) | Error::Serialize(_) => ErrorKind::Snapshot,

            Error::UnknownSymbol { .. }
            | Error::InvalidArguments { .. }
            | Error::TypeError { .. }
            | Error::ArityMismatch { .. }
            | Error::NotCallable { .. }
            | Error::UnsupportedComparison { .. }
            | Error::RedefineBuiltin { .. }
            | Error::RuntimeError(_) => ErrorKind::Eval,
        }
    }
}

/// Result type for MicroLisp operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity_message_direction() {
        let many = Error::ArityMismatch {
            expected: 1,
            got: 3,
            function: "(lambda (x) x)".to_string(),
        };
        assert!(many.to_string().contains("too many"));

        let few = Error::ArityMismatch {
            expected: 2,
            got: 0,
            function: "(lambda (x y) x)".to_string(),
        };
        assert!(few.to_string().contains("too few"));
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            Error::ParseFailed(vec!["unmatched paren: ".into()]).kind(),
            ErrorKind::Parse
        );
        assert_eq!(
            Error::UnknownSymbol { name: "x".into() }.kind(),
            ErrorKind::Eval
        );
        assert_eq!(Error::deserialize("bad").kind(), ErrorKind::Snapshot);
    }

    #[test]
    fn test_parse_failed_joins_messages() {
        let err = Error::ParseFailed(vec!["a".into(), "b".into()]);
        assert_eq!(err.to_string(), "parse error: a\nb");
    }
}
