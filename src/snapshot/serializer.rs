use std::collections::HashMap;

use tracing::{debug, warn};

use super::{ENVCOUNT, FUNCENV, SETENV};
use crate::error::{Error, Result};
use crate::parser::reads_as_symbol;
use crate::runtime::{Environment, Value};

/// Every environment reachable from `root`, in discovery order
///
/// Discovery starts at `root` (index 0) and follows bindings, closure
/// captures, closure bodies, list elements and parent links. Each frame is
/// listed once no matter how many paths reach it.
pub fn collect_environments(root: &Environment) -> Vec<Environment> {
    let mut graph = EnvGraph::default();
    graph.visit_env(root);
    graph.order
}

#[derive(Default)]
struct EnvGraph {
    order: Vec<Environment>,
    index: HashMap<usize, usize>,
}

impl EnvGraph {
    fn visit_env(&mut self, env: &Environment) {
        if self.index.contains_key(&env.id()) {
            return;
        }
        self.index.insert(env.id(), self.order.len());
        self.order.push(env.clone());

        for (_, value) in env.bindings() {
            self.visit_value(&value);
        }
        if let Some(outer) = env.outer() {
            self.visit_env(&outer);
        }
    }

    fn visit_value(&mut self, value: &Value) {
        match value {
            Value::Closure(closure) => {
                self.visit_env(&closure.env);
                self.visit_value(&closure.body);
            }
            Value::List(items) => {
                for item in items.iter() {
                    self.visit_value(item);
                }
            }
            Value::Atom(_)
            | Value::Symbol(_)
            | Value::Number(_)
            | Value::Bool(_)
            | Value::External(_) => {}
        }
    }

    fn index_of(&self, env: &Environment) -> Result<usize> {
        self.index
            .get(&env.id())
            .copied()
            .ok_or_else(|| Error::Serialize("environment missing from graph".to_string()))
    }
}

/// Writes the snapshot text for the graph rooted at `root`
///
/// Fails if a binding name would not read back as a symbol.
pub fn serialize(root: &Environment) -> Result<String> {
    let mut graph = EnvGraph::default();
    graph.visit_env(root);

    let mut out = String::new();
    out.push_str(&format!("({} {}\n", ENVCOUNT, graph.order.len()));

    for (idx, env) in graph.order.iter().enumerate() {
        let outer = match env.outer() {
            Some(outer) => graph.index_of(&outer)? as i64,
            None => -1,
        };
        out.push_str(&format!("({} {} {}\n", SETENV, idx, outer));

        for (name, value) in env.bindings() {
            match &value {
                Value::External(_) => {
                    warn!(name = %name, "external function binding not saved");
                    continue;
                }
                Value::Closure(closure) => {
                    check_name(&name)?;
                    for param in &closure.params {
                        check_name(param)?;
                    }
                    let captured = graph.index_of(&closure.env)?;
                    out.push_str(&format!("({} {}\n", FUNCENV, captured));
                    out.push_str(&format!("(define {} {})\n", name, value));
                    out.push_str(")\n");
                }
                _ => {
                    check_name(&name)?;
                    out.push_str(&format!("(define {} {})\n", name, value));
                }
            }
        }
        out.push_str(")\n");
    }
    out.push(')');

    debug!(environments = graph.order.len(), bytes = out.len(), "serialized environment graph");
    Ok(out)
}

fn check_name(name: &str) -> Result<()> {
    if reads_as_symbol(name) {
        Ok(())
    } else {
        Err(Error::Serialize(format!(
            "binding name does not read back as a symbol: {:?}",
            name
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LispEvaluator;

    #[test]
    fn test_empty_root() {
        let env = Environment::new();
        assert_eq!(serialize(&env).unwrap(), "(!ENVCOUNT! 1\n(!SETENV! 0 -1\n)\n)");
    }

    #[test]
    fn test_plain_bindings_in_name_order() {
        let env = Environment::new();
        env.define("b", Value::Bool(true));
        env.define("a", Value::Number(1.5));
        env.define("l", Value::list(vec![Value::symbol("x"), Value::Number(2.0)]));
        assert_eq!(
            serialize(&env).unwrap(),
            "(!ENVCOUNT! 1\n(!SETENV! 0 -1\n(define a 1.5)\n(define b #t)\n(define l (x 2))\n)\n)"
        );
    }

    #[test]
    fn test_closure_block() {
        let ev = LispEvaluator::new();
        ev.execute("(define (sq x) (* x x))").unwrap();
        assert_eq!(
            ev.save_environment().unwrap(),
            "(!ENVCOUNT! 1\n(!SETENV! 0 -1\n(!FUNCENV! 0\n(define sq (lambda (x) (* x x)))\n)\n)\n)"
        );
    }

    #[test]
    fn test_captured_frames_are_collected_once() {
        let ev = LispEvaluator::new();
        ev.execute("(define (make n) (lambda () n))").unwrap();
        ev.execute("(define f (make 1))").unwrap();
        ev.execute("(define g f)").unwrap();

        let envs = collect_environments(ev.env());
        assert_eq!(envs.len(), 2);
        assert!(envs[0].ptr_eq(ev.env()));

        let text = serialize(ev.env()).unwrap();
        assert!(text.starts_with("(!ENVCOUNT! 2\n"));
        assert!(text.contains("(!SETENV! 1 0\n(define n 1)\n)"));
    }

    #[test]
    fn test_self_reference_terminates() {
        let env = Environment::new();
        let f = Value::closure(env.clone(), Vec::new(), Value::symbol("f"));
        env.define("f", f);
        assert_eq!(collect_environments(&env).len(), 1);
        assert!(serialize(&env).unwrap().contains("(!FUNCENV! 0\n(define f (lambda () f))\n)"));
    }

    #[test]
    fn test_outer_links_are_followed() {
        let root = Environment::new();
        let child = Environment::with_outer(&root);
        child.define("x", Value::Number(1.0));

        let text = serialize(&child).unwrap();
        assert!(text.starts_with("(!ENVCOUNT! 2\n(!SETENV! 0 1\n"));
        assert!(text.contains("(!SETENV! 1 -1\n)"));
    }

    #[test]
    fn test_external_functions_are_skipped() {
        let env = Environment::new();
        env.register_external("thrust", |_: &[Value]| Ok(Value::nil()));
        env.define("x", Value::Number(1.0));
        assert_eq!(
            serialize(&env).unwrap(),
            "(!ENVCOUNT! 1\n(!SETENV! 0 -1\n(define x 1)\n)\n)"
        );
    }

    #[test]
    fn test_unreadable_name_is_rejected() {
        let env = Environment::new();
        env.define("two words", Value::Number(1.0));
        assert!(matches!(serialize(&env), Err(Error::Serialize(_))));

        let env = Environment::new();
        env.define("car", Value::Number(1.0));
        assert!(serialize(&env).is_err());
    }
}
