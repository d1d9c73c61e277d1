//! Runtime for MicroLisp: values, environments and the evaluator

mod environment;
mod lisp_evaluator;
mod primitives;
mod value;

pub use environment::Environment;
pub use lisp_evaluator::{eval, EvaluatorConfig, LispEvaluator};
pub use primitives::Primitive;
pub use value::{Closure, Value};
