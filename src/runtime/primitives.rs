//! The fixed primitive table
//!
//! Every special form and builtin operator is named here and nowhere else.
//! The reader turns an exact name match into [`Value::Atom`](super::Value::Atom);
//! the table is never extended at runtime.

use std::collections::HashMap;
use std::fmt;

lazy_static::lazy_static! {
    static ref BY_NAME: HashMap<&'static str, Primitive> = Primitive::ALL
        .iter()
        .map(|p| (p.name(), *p))
        .collect();
}

/// Tag of a special form or builtin operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Primitive {
    If,
    Quote,
    Set,
    Define,
    Initialize,
    Lambda,
    Begin,
    Plus,
    Minus,
    Mult,
    Div,
    Not,
    And,
    Or,
    Gt,
    Lt,
    GtEq,
    LtEq,
    NumEq,
    Equal,
    Eq,
    Length,
    Cons,
    Car,
    Cdr,
    Append,
    List,
    IsList,
    IsNull,
    IsSymbol,
    IsDefined,
    Modulo,
    Abs,
    Floor,
    Ceiling,
    Min,
    Max,
    Apply,
    Id,
    Sqrt,
    Let,
    Pow,
    Ln,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan2,
}

impl Primitive {
    /// All primitives in table order; `ALL[p.index()] == p`
    pub const ALL: [Primitive; 49] = [
        Primitive::If,
        Primitive::Quote,
        Primitive::Set,
        Primitive::Define,
        Primitive::Initialize,
        Primitive::Lambda,
        Primitive::Begin,
        Primitive::Plus,
        Primitive::Minus,
        Primitive::Mult,
        Primitive::Div,
        Primitive::Not,
        Primitive::And,
        Primitive::Or,
        Primitive::Gt,
        Primitive::Lt,
        Primitive::GtEq,
        Primitive::LtEq,
        Primitive::NumEq,
        Primitive::Equal,
        Primitive::Eq,
        Primitive::Length,
        Primitive::Cons,
        Primitive::Car,
        Primitive::Cdr,
        Primitive::Append,
        Primitive::List,
        Primitive::IsList,
        Primitive::IsNull,
        Primitive::IsSymbol,
        Primitive::IsDefined,
        Primitive::Modulo,
        Primitive::Abs,
        Primitive::Floor,
        Primitive::Ceiling,
        Primitive::Min,
        Primitive::Max,
        Primitive::Apply,
        Primitive::Id,
        Primitive::Sqrt,
        Primitive::Let,
        Primitive::Pow,
        Primitive::Ln,
        Primitive::Sin,
        Primitive::Cos,
        Primitive::Tan,
        Primitive::Asin,
        Primitive::Acos,
        Primitive::Atan2,
    ];

    /// Source-level name of the primitive
    pub fn name(self) -> &'static str {
        match self {
            Primitive::If => "if",
            Primitive::Quote => "quote",
            Primitive::Set => "set!",
            Primitive::Define => "define",
            Primitive::Initialize => "initialize",
            Primitive::Lambda => "lambda",
            Primitive::Begin => "begin",
            Primitive::Plus => "+",
            Primitive::Minus => "-",
            Primitive::Mult => "*",
            Primitive::Div => "/",
            Primitive::Not => "not",
            Primitive::And => "and",
            Primitive::Or => "or",
            Primitive::Gt => ">",
            Primitive::Lt => "<",
            Primitive::GtEq => ">=",
            Primitive::LtEq => "<=",
            Primitive::NumEq => "=",
            Primitive::Equal => "equal?",
            Primitive::Eq => "eq?",
            Primitive::Length => "length",
            Primitive::Cons => "cons",
            Primitive::Car => "car",
            Primitive::Cdr => "cdr",
            Primitive::Append => "append",
            Primitive::List => "list",
            Primitive::IsList => "list?",
            Primitive::IsNull => "null?",
            Primitive::IsSymbol => "symbol?",
            Primitive::IsDefined => "defined?",
            Primitive::Modulo => "modulo",
            Primitive::Abs => "abs",
            Primitive::Floor => "floor",
            Primitive::Ceiling => "ceiling",
            Primitive::Min => "min",
            Primitive::Max => "max",
            Primitive::Apply => "apply",
            Primitive::Id => "id",
            Primitive::Sqrt => "sqrt",
            Primitive::Let => "let",
            Primitive::Pow => "pow",
            Primitive::Ln => "ln",
            Primitive::Sin => "sin",
            Primitive::Cos => "cos",
            Primitive::Tan => "tan",
            Primitive::Asin => "asin",
            Primitive::Acos => "acos",
            Primitive::Atan2 => "atan2",
        }
    }

    /// Small integer tag (position in the table)
    pub fn index(self) -> usize {
        self as usize
    }

    /// Exact-match lookup of a primitive by name
    pub fn from_name(name: &str) -> Option<Primitive> {
        BY_NAME.get(name).copied()
    }

    /// Special forms control the evaluation of their own operands
    pub fn is_special_form(self) -> bool {
        matches!(
            self,
            Primitive::If
                | Primitive::Quote
                | Primitive::Set
                | Primitive::Define
                | Primitive::Initialize
                | Primitive::Lambda
                | Primitive::Begin
                | Primitive::Let
                | Primitive::Apply
                | Primitive::Id
                | Primitive::IsDefined
        )
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}
