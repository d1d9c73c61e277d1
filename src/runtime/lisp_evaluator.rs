use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::parser::ParseResult;
use crate::runtime::{Environment, Primitive, Value};

/// Evaluation settings
#[derive(Clone, Debug, Default)]
pub struct EvaluatorConfig {
    /// Emit a `trace!` event for every closure or external-function application
    pub trace_applications: bool,
}

/// Tree-walking evaluator over a root environment
///
/// Special forms receive their operands unevaluated:
/// - `(quote x)`, `(if test conseq alt)`, `(set! sym expr)`
/// - `(define sym expr...)`, `(define (f args...) body...)`, `(initialize sym expr...)`
/// - `(lambda (params...) body)`, `(begin expr...)`, `(let ((sym expr)...) body)`
/// - `(apply f args)`, `(id x)`, `(defined? sym)`
///
/// Every other primitive evaluates its operands left to right first.
/// Recursion goes straight through the host stack; there is no tail-call
/// elimination.
pub struct LispEvaluator {
    env: Environment,
    config: EvaluatorConfig,
}

impl LispEvaluator {
    /// Creates an evaluator with an empty root environment
    pub fn new() -> Self {
        Self::with_environment(Environment::new())
    }

    /// Creates an evaluator over an existing root environment
    pub fn with_environment(env: Environment) -> Self {
        LispEvaluator {
            env,
            config: EvaluatorConfig::default(),
        }
    }

    /// Creates an evaluator with custom settings
    pub fn with_config(config: EvaluatorConfig) -> Self {
        LispEvaluator {
            env: Environment::new(),
            config,
        }
    }

    /// The root environment
    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Current settings
    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Binds a host function in the root environment
    pub fn register_external<F>(&self, name: impl Into<String>, func: F)
    where
        F: Fn(&[Value]) -> Result<Value> + 'static,
    {
        self.env.register_external(name, func);
    }

    /// Reads one top-level form
    pub fn parse(&self, text: &str) -> ParseResult {
        crate::parse(text)
    }

    /// Evaluates `expr` in the root environment
    pub fn eval(&self, expr: &Value) -> Result<Value> {
        self.eval_in(expr, &self.env)
    }

    /// Parses and evaluates `text`, failing on any reader error
    pub fn execute(&self, text: &str) -> Result<Value> {
        let form = self.parse(text).into_result()?;
        self.eval(&form)
    }

    /// Parses and evaluates `text`, describing the outcome as text
    ///
    /// Produces `parsed: <form>\nresult: <value>`, `error: <message>` or
    /// `parse error: <messages>`.
    pub fn read_eval_print(&self, text: &str) -> String {
        let parsed = self.parse(text);
        if !parsed.is_ok() {
            return format!("parse error: {}", parsed.errors.join("\n"));
        }

        debug!(form = %parsed.value, "evaluating top-level form");
        match self.eval(&parsed.value) {
            Ok(result) => format!("parsed: {}\nresult: {}", parsed.value, result),
            Err(e) => format!("error: {}", e),
        }
    }

    /// Serializes the whole graph reachable from the root
    pub fn save_environment(&self) -> Result<String> {
        crate::snapshot::serialize(&self.env)
    }

    /// Replaces the root with a graph read from snapshot text
    ///
    /// On failure the current root is left untouched. Host functions are
    /// never part of a snapshot and must be registered again afterwards.
    pub fn load_environment(&mut self, text: &str) -> Result<()> {
        self.env = crate::snapshot::deserialize(text)?;
        Ok(())
    }

    /// Evaluates `expr` in `env`
    pub fn eval_in(&self, expr: &Value, env: &Environment) -> Result<Value> {
        match expr {
            Value::Symbol(name) => env.get(name),
            Value::List(items) => match items.split_first() {
                None => Ok(expr.clone()),
                Some((Value::Atom(p), operands)) => self.eval_primitive(*p, expr, operands, env),
                Some((head, operands)) => self.eval_application(expr, head, operands, env),
            },
            Value::Atom(_)
            | Value::Number(_)
            | Value::Bool(_)
            | Value::Closure(_)
            | Value::External(_) => Ok(expr.clone()),
        }
    }

    /// Applies a function value to already-evaluated arguments
    pub fn apply(&self, func: &Value, args: Vec<Value>) -> Result<Value> {
        match func {
            Value::Closure(closure) => {
                if closure.params.len() != args.len() {
                    return Err(Error::ArityMismatch {
                        expected: closure.params.len(),
                        got: args.len(),
                        function: closure.to_string(),
                    });
                }
                if self.config.trace_applications {
                    trace!(function = %closure, args = args.len(), "applying closure");
                }
                let frame = closure.env.extend(&closure.params, args);
                self.eval_in(&closure.body, &frame)
            }
            Value::External(ext) => {
                if self.config.trace_applications {
                    trace!(args = args.len(), "applying external function");
                }
                ext.call(&args)
            }
            Value::Atom(p) if !p.is_special_form() => self.call_builtin(*p, &args),
            other => Err(Error::NotCallable {
                value: other.to_string(),
            }),
        }
    }

    fn eval_application(
        &self,
        form: &Value,
        head: &Value,
        operands: &[Value],
        env: &Environment,
    ) -> Result<Value> {
        let func = self.eval_in(head, env)?;
        // A computed primitive still sees the operands as written
        if let Value::Atom(p) = func {
            return self.eval_primitive(p, form, operands, env);
        }
        let args = self.eval_all(operands, env)?;
        self.apply(&func, args)
    }

    fn eval_all(&self, operands: &[Value], env: &Environment) -> Result<Vec<Value>> {
        operands.iter().map(|o| self.eval_in(o, env)).collect()
    }

    fn eval_primitive(
        &self,
        p: Primitive,
        form: &Value,
        operands: &[Value],
        env: &Environment,
    ) -> Result<Value> {
        if p.is_special_form() {
            self.eval_special(p, form, operands, env)
        } else {
            let args = self.eval_all(operands, env)?;
            self.call_builtin(p, &args)
        }
    }

    fn eval_special(
        &self,
        p: Primitive,
        form: &Value,
        operands: &[Value],
        env: &Environment,
    ) -> Result<Value> {
        let op = p.name();
        match p {
            Primitive::Quote => {
                expect_args(op, operands, 1)?;
                Ok(operands[0].clone())
            }

            Primitive::If => {
                expect_args(op, operands, 3)?;
                let test = self.eval_in(&operands[0], env)?;
                let branch = if test.is_truthy() {
                    &operands[1]
                } else {
                    &operands[2]
                };
                self.eval_in(branch, env)
            }

            Primitive::Set => {
                expect_args(op, operands, 2)?;
                let name = operands[0]
                    .as_symbol()
                    .ok_or_else(|| Error::invalid_args(op, "requires a symbol as its first argument"))?;
                let value = self.eval_in(&operands[1], env)?;
                if !env.set(name, value) {
                    return Err(Error::UnknownSymbol {
                        name: name.to_string(),
                    });
                }
                Ok(form.clone())
            }

            Primitive::Define | Primitive::Initialize => self.eval_define(p, operands, env),

            Primitive::Lambda => {
                expect_args(op, operands, 2)?;
                let params = param_names(&operands[0])?;
                Ok(Value::closure(env.clone(), params, operands[1].clone()))
            }

            Primitive::Begin => {
                let mut result = Value::nil();
                for expr in operands {
                    result = self.eval_in(expr, env)?;
                }
                Ok(result)
            }

            Primitive::Let => {
                expect_args(op, operands, 2)?;
                let desugared = desugar_let(&operands[0], &operands[1])?;
                self.eval_in(&desugared, env)
            }

            Primitive::Apply => {
                expect_args(op, operands, 2)?;
                let arg_list = self.eval_in(&operands[1], env)?;
                let args = arg_list.as_list(op)?;
                let func = self.eval_in(&operands[0], env)?;

                let mut call = Vec::with_capacity(args.len() + 1);
                call.push(func);
                call.extend(args.iter().cloned());
                self.eval_in(&Value::list(call), env)
            }

            Primitive::Id => {
                expect_args(op, operands, 1)?;
                self.eval_in(&operands[0], env)
            }

            Primitive::IsDefined => {
                expect_args(op, operands, 1)?;
                let name = operands[0].as_symbol().ok_or_else(|| {
                    Error::invalid_args(op, format!("takes a symbol as argument: {}", operands[0]))
                })?;
                Ok(Value::Bool(env.contains(name)))
            }

            _ => self.call_builtin(p, &self.eval_all(operands, env)?),
        }
    }

    /// `define` / `initialize`, including the `(define (f args...) body)` shorthand
    fn eval_define(&self, p: Primitive, operands: &[Value], env: &Environment) -> Result<Value> {
        let op = p.name();
        if operands.len() < 2 {
            return Err(Error::invalid_args(op, "requires at least two arguments"));
        }

        let body = if operands.len() > 2 {
            let mut seq = Vec::with_capacity(operands.len());
            seq.push(Value::Atom(Primitive::Begin));
            seq.extend(operands[1..].iter().cloned());
            Value::list(seq)
        } else {
            operands[1].clone()
        };

        match &operands[0] {
            Value::Symbol(name) => {
                let value = self.eval_in(&body, env)?;
                if p == Primitive::Initialize {
                    Ok(Value::Bool(env.initialize(name.to_string(), value)))
                } else {
                    env.define(name.to_string(), value);
                    Ok(Value::Bool(true))
                }
            }
            Value::List(target) => {
                let (name, params) = match target.split_first() {
                    Some((Value::Symbol(name), params)) => (name, params),
                    Some((Value::Atom(builtin), _)) => {
                        return Err(Error::RedefineBuiltin {
                            name: builtin.name().to_string(),
                        })
                    }
                    Some((other, _)) => {
                        return Err(Error::invalid_args(
                            op,
                            format!("target list must consist of symbols: {}", other),
                        ))
                    }
                    None => {
                        return Err(Error::invalid_args(
                            op,
                            "target list must name the function being defined",
                        ))
                    }
                };

                let lambda = Value::list(vec![
                    Value::Atom(Primitive::Lambda),
                    Value::list(params.to_vec()),
                    body,
                ]);
                let desugared = Value::list(vec![
                    Value::Atom(Primitive::Define),
                    Value::Symbol(name.clone()),
                    lambda,
                ]);
                self.eval_in(&desugared, env)?;
                Ok(desugared)
            }
            other => Err(Error::invalid_args(
                op,
                format!("target must be a symbol or symbol list: {}", other),
            )),
        }
    }

    /// Primitive operators over evaluated arguments
    fn call_builtin(&self, p: Primitive, args: &[Value]) -> Result<Value> {
        let op = p.name();
        match p {
            Primitive::Plus => numeric_fold(op, args, |nums| nums.iter().sum()),
            Primitive::Minus => numeric_fold(op, args, |nums| {
                nums[1..].iter().fold(nums[0], |acc, n| acc - n)
            }),
            Primitive::Mult => numeric_fold(op, args, |nums| {
                nums[1..].iter().fold(nums[0], |acc, n| acc * n)
            }),
            // Division by zero anywhere in the chain yields 0
            Primitive::Div => numeric_fold(op, args, |nums| {
                let mut acc = nums[0];
                for n in &nums[1..] {
                    if *n == 0.0 {
                        return 0.0;
                    }
                    acc /= n;
                }
                acc
            }),
            Primitive::Min => numeric_fold(op, args, |nums| {
                nums[1..].iter().fold(nums[0], |acc, n| nan_aware(acc, *n, f64::min))
            }),
            Primitive::Max => numeric_fold(op, args, |nums| {
                nums[1..].iter().fold(nums[0], |acc, n| nan_aware(acc, *n, f64::max))
            }),

            Primitive::Modulo => numeric_binop(op, args, |a, b| a % b),
            Primitive::Pow => numeric_binop(op, args, f64::powf),
            Primitive::Atan2 => numeric_binop(op, args, f64::atan2),

            Primitive::Abs => numeric_unary(op, args, f64::abs),
            Primitive::Floor => numeric_unary(op, args, f64::floor),
            Primitive::Ceiling => numeric_unary(op, args, f64::ceil),
            Primitive::Sqrt => numeric_unary(op, args, f64::sqrt),
            Primitive::Ln => numeric_unary(op, args, f64::ln),
            Primitive::Sin => numeric_unary(op, args, f64::sin),
            Primitive::Cos => numeric_unary(op, args, f64::cos),
            Primitive::Tan => numeric_unary(op, args, f64::tan),
            Primitive::Asin => numeric_unary(op, args, f64::asin),
            Primitive::Acos => numeric_unary(op, args, f64::acos),

            Primitive::Gt => compare(op, args, |a, b| a > b),
            Primitive::Lt => compare(op, args, |a, b| a < b),
            Primitive::GtEq => compare(op, args, |a, b| a >= b),
            Primitive::LtEq => compare(op, args, |a, b| a <= b),
            Primitive::NumEq => compare(op, args, |a, b| a == b),

            // Both operands must be booleans whatever the first one is
            Primitive::And => {
                expect_args(op, args, 2)?;
                let (a, b) = (args[0].as_bool(op)?, args[1].as_bool(op)?);
                Ok(Value::Bool(a && b))
            }
            Primitive::Or => {
                expect_args(op, args, 2)?;
                let (a, b) = (args[0].as_bool(op)?, args[1].as_bool(op)?);
                Ok(Value::Bool(a || b))
            }
            Primitive::Not => {
                expect_args(op, args, 1)?;
                Ok(Value::Bool(!args[0].is_truthy()))
            }

            Primitive::Equal => {
                expect_args(op, args, 2)?;
                structural_equal(op, &args[0], &args[1]).map(Value::Bool)
            }
            Primitive::Eq => {
                expect_args(op, args, 2)?;
                Ok(Value::Bool(args[0].ptr_eq(&args[1])))
            }

            Primitive::Length => {
                expect_args(op, args, 1)?;
                Ok(Value::Number(args[0].as_list(op)?.len() as f64))
            }
            Primitive::Cons => {
                expect_args(op, args, 2)?;
                let mut items = vec![args[0].clone()];
                match &args[1] {
                    Value::List(tail) => items.extend(tail.iter().cloned()),
                    other => items.push(other.clone()),
                }
                Ok(Value::list(items))
            }
            Primitive::Car => {
                expect_args(op, args, 1)?;
                match &args[0] {
                    Value::List(items) => Ok(items.first().cloned().unwrap_or_else(Value::nil)),
                    other => Ok(other.clone()),
                }
            }
            Primitive::Cdr => {
                expect_args(op, args, 1)?;
                match &args[0] {
                    Value::List(items) => Ok(Value::list(items.iter().skip(1).cloned().collect())),
                    _ => Ok(Value::nil()),
                }
            }
            Primitive::Append => {
                expect_args(op, args, 2)?;
                let mut items = args[0].as_list(op)?.to_vec();
                items.extend(args[1].as_list(op)?.iter().cloned());
                Ok(Value::list(items))
            }
            Primitive::List => Ok(Value::list(args.to_vec())),

            Primitive::IsList => {
                expect_args(op, args, 1)?;
                Ok(Value::Bool(matches!(args[0], Value::List(_))))
            }
            Primitive::IsNull => {
                expect_args(op, args, 1)?;
                Ok(Value::Bool(args[0].is_nil()))
            }
            Primitive::IsSymbol => {
                expect_args(op, args, 1)?;
                Ok(Value::Bool(matches!(args[0], Value::Symbol(_))))
            }

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
            | Primitive::IsDefined => Err(Error::NotCallable {
                value: op.to_string(),
            }),
        }
    }
}

impl Default for LispEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

/// Evaluates `expr` in `env` with default settings
pub fn eval(expr: &Value, env: &Environment) -> Result<Value> {
    LispEvaluator::with_environment(env.clone()).eval(expr)
}

fn expect_args(op: &str, args: &[Value], n: usize) -> Result<()> {
    if args.len() == n {
        return Ok(());
    }
    let wanted = match n {
        1 => "a single argument",
        2 => "two arguments",
        _ => "three arguments",
    };
    Err(Error::invalid_args(op, format!("requires {}", wanted)))
}

fn numbers(op: &str, args: &[Value]) -> Result<Vec<f64>> {
    args.iter().map(|a| a.as_number(op)).collect()
}

fn numeric_fold(op: &str, args: &[Value], f: impl Fn(&[f64]) -> f64) -> Result<Value> {
    if args.len() < 2 {
        return Err(Error::invalid_args(op, "requires at least two arguments"));
    }
    Ok(Value::Number(f(&numbers(op, args)?)))
}

fn numeric_binop(op: &str, args: &[Value], f: impl Fn(f64, f64) -> f64) -> Result<Value> {
    expect_args(op, args, 2)?;
    Ok(Value::Number(f(args[0].as_number(op)?, args[1].as_number(op)?)))
}

fn numeric_unary(op: &str, args: &[Value], f: impl Fn(f64) -> f64) -> Result<Value> {
    expect_args(op, args, 1)?;
    Ok(Value::Number(f(args[0].as_number(op)?)))
}

/// `min`/`max` step where a NaN on either side makes the result NaN
fn nan_aware(a: f64, b: f64, pick: fn(f64, f64) -> f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else {
        pick(a, b)
    }
}

fn compare(op: &str, args: &[Value], f: impl Fn(f64, f64) -> bool) -> Result<Value> {
    expect_args(op, args, 2)?;
    Ok(Value::Bool(f(args[0].as_number(op)?, args[1].as_number(op)?)))
}

/// `equal?`: numbers by value, symbols by name, different variants are
/// unequal, anything else is unsupported
fn structural_equal(op: &str, a: &Value, b: &Value) -> Result<bool> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => Ok(x == y),
        (Value::Symbol(x), Value::Symbol(y)) => Ok(x == y),
        _ if std::mem::discriminant(a) != std::mem::discriminant(b) => Ok(false),
        _ => Err(Error::UnsupportedComparison { op: op.to_string() }),
    }
}

fn param_names(list: &Value) -> Result<Vec<String>> {
    let op = Primitive::Lambda.name();
    let items = match list {
        Value::List(items) => items,
        _ => {
            return Err(Error::invalid_args(
                op,
                "requires an argument list as its first argument",
            ))
        }
    };
    items
        .iter()
        .map(|item| match item {
            Value::Symbol(name) => Ok(name.to_string()),
            other => Err(Error::invalid_args(
                op,
                format!("unexpected value in argument list: {}", other),
            )),
        })
        .collect()
}

/// `(let ((s e)...) body)` becomes `((lambda (s...) body) e...)`
fn desugar_let(bindings: &Value, body: &Value) -> Result<Value> {
    let op = Primitive::Let.name();
    let pairs = match bindings {
        Value::List(pairs) => pairs,
        _ => {
            return Err(Error::invalid_args(
                op,
                "requires a list of symbol/expression pairs",
            ))
        }
    };

    let mut names = Vec::with_capacity(pairs.len());
    let mut call = Vec::with_capacity(pairs.len() + 1);
    call.push(Value::nil());
    for pair in pairs.iter() {
        match pair {
            Value::List(p) if p.len() == 2 && matches!(p[0], Value::Symbol(_)) => {
                names.push(p[0].clone());
                call.push(p[1].clone());
            }
            _ => {
                return Err(Error::invalid_args(
                    op,
                    "bindings must each be a symbol/expression pair",
                ))
            }
        }
    }

    call[0] = Value::list(vec![
        Value::Atom(Primitive::Lambda),
        Value::list(names),
        body.clone(),
    ]);
    Ok(Value::list(call))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn run(evaluator: &LispEvaluator, source: &str) -> Result<Value> {
        evaluator.execute(source)
    }

    fn eval_str(source: &str) -> Result<Value> {
        run(&LispEvaluator::new(), source)
    }

    fn num(n: f64) -> Value {
        Value::Number(n)
    }

    #[test]
    fn test_self_evaluating() {
        assert_eq!(eval_str("42").unwrap(), num(42.0));
        assert_eq!(eval_str("#f").unwrap(), Value::Bool(false));
        assert_eq!(eval_str("+").unwrap(), Value::Atom(Primitive::Plus));
        assert_eq!(eval_str("()").unwrap(), Value::nil());
    }

    #[test]
    fn test_unknown_symbol() {
        let err = eval_str("nope").unwrap_err();
        assert_eq!(err.to_string(), "unknown symbol: nope");
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval_str("(+ 1 2 3)").unwrap(), num(6.0));
        assert_eq!(eval_str("(- 10 3 2)").unwrap(), num(5.0));
        assert_eq!(eval_str("(* 2 3 4)").unwrap(), num(24.0));
        assert_eq!(eval_str("(/ 12 2 3)").unwrap(), num(2.0));
        assert_eq!(eval_str("(min 4 2 8)").unwrap(), num(2.0));
        assert_eq!(eval_str("(max 4 2 8)").unwrap(), num(8.0));
        assert_eq!(eval_str("(modulo 7 3)").unwrap(), num(1.0));
        assert_eq!(eval_str("(pow 2 10)").unwrap(), num(1024.0));
        assert_eq!(eval_str("(abs -3)").unwrap(), num(3.0));
        assert_eq!(eval_str("(floor 2.7)").unwrap(), num(2.0));
        assert_eq!(eval_str("(ceiling 2.1)").unwrap(), num(3.0));
        assert_eq!(eval_str("(sqrt 16)").unwrap(), num(4.0));
    }

    #[test]
    fn test_min_max_propagate_nan() {
        let is_nan = |src: &str| matches!(eval_str(src), Ok(Value::Number(n)) if n.is_nan());
        assert!(is_nan("(min (sqrt -1) 1)"));
        assert!(is_nan("(min 1 (sqrt -1))"));
        assert!(is_nan("(max 3 (sqrt -1) 2)"));
        assert_eq!(eval_str("(max 3 5 2)").unwrap(), num(5.0));
    }

    #[test]
    fn test_division_by_zero_is_zero() {
        assert_eq!(eval_str("(/ 4 0)").unwrap(), num(0.0));
        assert_eq!(eval_str("(/ 8 2 0 5)").unwrap(), num(0.0));
    }

    #[test]
    fn test_arithmetic_arity_and_types() {
        let err = eval_str("(+ 1)").unwrap_err();
        assert_eq!(err.to_string(), "+ requires at least two arguments");
        assert!(matches!(eval_str("(+ 1 #t)"), Err(Error::TypeError { .. })));
        assert!(matches!(eval_str("(sqrt 1 2)"), Err(Error::InvalidArguments { .. })));
        assert!(matches!(eval_str("(modulo 1)"), Err(Error::InvalidArguments { .. })));
    }

    #[test]
    fn test_comparisons_and_logic() {
        assert_eq!(eval_str("(> 3 2)").unwrap(), Value::Bool(true));
        assert_eq!(eval_str("(<= 3 2)").unwrap(), Value::Bool(false));
        assert_eq!(eval_str("(= 2 2)").unwrap(), Value::Bool(true));
        assert_eq!(eval_str("(and #t #f)").unwrap(), Value::Bool(false));
        assert_eq!(eval_str("(or #t #f)").unwrap(), Value::Bool(true));
        assert_eq!(eval_str("(not #f)").unwrap(), Value::Bool(true));
        assert_eq!(eval_str("(not 0)").unwrap(), Value::Bool(false));
        assert!(eval_str("(and #t 1)").is_err());
        // Deciding operand first still type-checks the second
        assert!(matches!(eval_str("(and #f 1)"), Err(Error::TypeError { .. })));
        assert!(matches!(eval_str("(or #t 5)"), Err(Error::TypeError { .. })));
        assert!(eval_str("(< 1 #t)").is_err());
    }

    #[test]
    fn test_quote_does_not_evaluate() {
        assert_eq!(eval_str("(quote (1 2 3))").unwrap().to_string(), "(1 2 3)");
        assert_eq!(eval_str("(quote undefined)").unwrap(), Value::symbol("undefined"));
        assert!(eval_str("(quote 1 2)").is_err());
    }

    #[test]
    fn test_if_truthiness() {
        assert_eq!(eval_str("(if #t 1 2)").unwrap(), num(1.0));
        assert_eq!(eval_str("(if #f 1 2)").unwrap(), num(2.0));
        assert_eq!(eval_str("(if 0 1 2)").unwrap(), num(1.0));
        assert_eq!(eval_str("(if () 1 2)").unwrap(), num(1.0));
        // Only the chosen branch runs
        assert_eq!(eval_str("(if #t 1 unbound)").unwrap(), num(1.0));
        assert!(matches!(eval_str("(if #t 1)"), Err(Error::InvalidArguments { .. })));
    }

    #[test]
    fn test_define_and_call() {
        let ev = LispEvaluator::new();
        assert_eq!(run(&ev, "(define x 10)").unwrap(), Value::Bool(true));
        assert_eq!(run(&ev, "x").unwrap(), num(10.0));

        let desugared = run(&ev, "(define (square x) (* x x))").unwrap();
        assert_eq!(desugared.to_string(), "(define square (lambda (x) (* x x)))");
        assert_eq!(run(&ev, "(square 5)").unwrap(), num(25.0));
    }

    #[test]
    fn test_define_multi_expression_body() {
        let ev = LispEvaluator::new();
        run(&ev, "(define y 1)").unwrap();
        run(&ev, "(define z (set! y 5) (+ y 1))").unwrap();
        assert_eq!(run(&ev, "z").unwrap(), num(6.0));
    }

    #[test]
    fn test_define_rejects_builtin_target() {
        let err = eval_str("(define (car x) x)").unwrap_err();
        assert_eq!(
            err,
            Error::RedefineBuiltin {
                name: "car".to_string()
            }
        );
        assert!(eval_str("(define x)").is_err());
        assert!(eval_str("(define 1 2)").is_err());
    }

    #[test]
    fn test_initialize_binds_once() {
        let ev = LispEvaluator::new();
        assert_eq!(run(&ev, "(initialize n 1)").unwrap(), Value::Bool(true));
        assert_eq!(run(&ev, "(initialize n 2)").unwrap(), Value::Bool(false));
        assert_eq!(run(&ev, "n").unwrap(), num(1.0));
    }

    #[test]
    fn test_set() {
        let ev = LispEvaluator::new();
        run(&ev, "(define x 1)").unwrap();
        let form = run(&ev, "(set! x 2)").unwrap();
        assert_eq!(form.to_string(), "(set! x 2)");
        assert_eq!(run(&ev, "x").unwrap(), num(2.0));

        let err = run(&ev, "(set! undefined-sym 1)").unwrap_err();
        assert!(err.to_string().contains("undefined-sym"));
        assert!(!ev.env().contains("undefined-sym"));
        assert!(run(&ev, "(set! 1 2)").is_err());
    }

    #[test]
    fn test_lambda_and_arity() {
        let ev = LispEvaluator::new();
        assert_eq!(run(&ev, "((lambda (a b) (- a b)) 5 3)").unwrap(), num(2.0));
        assert_eq!(run(&ev, "((lambda () 7))").unwrap(), num(7.0));

        let many = run(&ev, "((lambda (a) a) 1 2)").unwrap_err();
        assert!(many.to_string().contains("too many"));
        let few = run(&ev, "((lambda (a b) a) 1)").unwrap_err();
        assert!(few.to_string().contains("too few"));

        assert!(run(&ev, "(lambda (1) 1)").is_err());
        assert!(run(&ev, "(lambda x 1)").is_err());
    }

    #[test]
    fn test_closures_capture_environment() {
        let ev = LispEvaluator::new();
        run(&ev, "(define (make-adder n) (lambda (x) (+ x n)))").unwrap();
        run(&ev, "(define add5 (make-adder 5))").unwrap();
        assert_eq!(run(&ev, "(add5 10)").unwrap(), num(15.0));
        assert!(!ev.env().contains("n"));
    }

    #[test]
    fn test_recursion() {
        let ev = LispEvaluator::new();
        run(
            &ev,
            "(define (fact n) (if (<= n 1) 1 (* n (fact (- n 1)))))",
        )
        .unwrap();
        assert_eq!(run(&ev, "(fact 10)").unwrap(), num(3628800.0));
    }

    #[test]
    fn test_begin() {
        assert_eq!(eval_str("(begin 1 2 3)").unwrap(), num(3.0));
        assert_eq!(eval_str("(begin)").unwrap(), Value::nil());
    }

    #[test]
    fn test_let() {
        assert_eq!(eval_str("(let ((x 1) (y 2)) (+ x y))").unwrap(), num(3.0));
        assert_eq!(eval_str("(let () 4)").unwrap(), num(4.0));
        assert!(eval_str("(let ((x)) x)").is_err());
        assert!(eval_str("(let ((1 2)) 1)").is_err());
        assert!(eval_str("(let x 1)").is_err());
    }

    #[test]
    fn test_apply_and_id() {
        assert_eq!(eval_str("(apply + (list 1 2 3))").unwrap(), num(6.0));
        assert_eq!(eval_str("(apply (lambda (a b) (* a b)) (list 3 4))").unwrap(), num(12.0));
        assert!(eval_str("(apply + 1)").is_err());
        assert_eq!(eval_str("(id 5)").unwrap(), num(5.0));
        assert_eq!(eval_str("((id +) 1 2)").unwrap(), num(3.0));
    }

    #[test]
    fn test_computed_special_form_sees_raw_operands() {
        assert_eq!(
            eval_str("((id quote) (a b))").unwrap().to_string(),
            "(a b)"
        );
    }

    #[test]
    fn test_list_operations() {
        assert_eq!(eval_str("(length (list 1 2 3))").unwrap(), num(3.0));
        assert_eq!(eval_str("(cons 1 (list 2 3))").unwrap().to_string(), "(1 2 3)");
        assert_eq!(eval_str("(cons 1 2)").unwrap().to_string(), "(1 2)");
        assert_eq!(eval_str("(car (list 1 2))").unwrap(), num(1.0));
        assert_eq!(eval_str("(car ())").unwrap(), Value::nil());
        assert_eq!(eval_str("(car 7)").unwrap(), num(7.0));
        assert_eq!(eval_str("(cdr (list 1 2 3))").unwrap().to_string(), "(2 3)");
        assert_eq!(eval_str("(cdr ())").unwrap(), Value::nil());
        assert_eq!(eval_str("(cdr 7)").unwrap(), Value::nil());
        assert_eq!(
            eval_str("(append (list 1) (list 2 3))").unwrap().to_string(),
            "(1 2 3)"
        );
        assert!(eval_str("(append (list 1) 2)").is_err());
        assert!(eval_str("(length 5)").is_err());
    }

    #[test]
    fn test_predicates() {
        assert_eq!(eval_str("(list? ())").unwrap(), Value::Bool(true));
        assert_eq!(eval_str("(list? 1)").unwrap(), Value::Bool(false));
        assert_eq!(eval_str("(null? ())").unwrap(), Value::Bool(true));
        assert_eq!(eval_str("(null? (list 1))").unwrap(), Value::Bool(false));
        assert_eq!(eval_str("(symbol? (quote a))").unwrap(), Value::Bool(true));
        assert_eq!(eval_str("(symbol? 1)").unwrap(), Value::Bool(false));
        assert!(eval_str("(defined? car)").is_err());

        let ev = LispEvaluator::new();
        assert_eq!(run(&ev, "(defined? x)").unwrap(), Value::Bool(false));
        run(&ev, "(define x 1)").unwrap();
        assert_eq!(run(&ev, "(defined? x)").unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_equality() {
        assert_eq!(eval_str("(equal? 1 1)").unwrap(), Value::Bool(true));
        assert_eq!(eval_str("(equal? (quote a) (quote a))").unwrap(), Value::Bool(true));
        assert_eq!(eval_str("(equal? 1 (quote a))").unwrap(), Value::Bool(false));
        assert!(matches!(
            eval_str("(equal? (list 1) (list 1))"),
            Err(Error::UnsupportedComparison { .. })
        ));

        let ev = LispEvaluator::new();
        run(&ev, "(define l (list 1 2))").unwrap();
        assert_eq!(run(&ev, "(eq? l l)").unwrap(), Value::Bool(true));
        assert_eq!(run(&ev, "(eq? l (list 1 2))").unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_eq_immediates_compare_by_value() {
        // Numbers, booleans and atoms carry no identity of their own
        assert_eq!(eval_str("(eq? 2 2)").unwrap(), Value::Bool(true));
        assert_eq!(eval_str("(eq? #t #t)").unwrap(), Value::Bool(true));
        assert_eq!(eval_str("(eq? car car)").unwrap(), Value::Bool(true));
        assert_eq!(eval_str("(eq? 2 3)").unwrap(), Value::Bool(false));
        // Two readings of the same name are distinct symbols
        assert_eq!(eval_str("(eq? (quote a) (quote a))").unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_non_function_application() {
        let err = eval_str("(1 2 3)").unwrap_err();
        assert_eq!(err.to_string(), "unable to apply non-function: 1");
    }

    #[test]
    fn test_external_functions() {
        let ev = LispEvaluator::new();
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        ev.register_external("tick", move |args: &[Value]| {
            counter.set(counter.get() + 1);
            Ok(Value::Number(args.len() as f64))
        });
        ev.register_external("fail", |_: &[Value]| Err(Error::runtime("host refused")));

        assert_eq!(run(&ev, "(tick 1 (+ 1 1) 3)").unwrap(), num(3.0));
        assert_eq!(calls.get(), 1);
        assert_eq!(run(&ev, "(fail)").unwrap_err().to_string(), "host refused");
    }

    #[test]
    fn test_read_eval_print() {
        let ev = LispEvaluator::new();
        assert_eq!(ev.read_eval_print("(+ 1 2)"), "parsed: (+ 1 2)\nresult: 3");
        assert_eq!(ev.read_eval_print("foo"), "error: unknown symbol: foo");
        assert_eq!(ev.read_eval_print("(foo"), "parse error: unmatched paren: foo");
    }

    #[test]
    fn test_free_eval_shares_environment() {
        let env = Environment::new();
        let form = crate::parse("(define x 3)").value;
        eval(&form, &env).unwrap();
        assert_eq!(env.lookup("x"), Some(num(3.0)));
    }

    #[test]
    fn test_config() {
        let ev = LispEvaluator::with_config(EvaluatorConfig {
            trace_applications: true,
        });
        assert!(ev.config().trace_applications);
        assert_eq!(run(&ev, "((lambda (x) x) 1)").unwrap(), num(1.0));
    }
}
