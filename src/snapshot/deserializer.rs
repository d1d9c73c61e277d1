use tracing::debug;

use super::{ENVCOUNT, FUNCENV, SETENV};
use crate::error::{Error, Result};
use crate::runtime::{Environment, Primitive, Value};

/// Rebuilds an environment graph from snapshot text into a fresh root
pub fn deserialize(text: &str) -> Result<Environment> {
    let root = Environment::new();
    deserialize_into(text, &root)?;
    Ok(root)
}

/// Rebuilds an environment graph from snapshot text into `target`
///
/// `target` becomes environment 0. The whole text is validated before
/// anything is written, so on error `target` keeps its previous bindings
/// and parent.
pub fn deserialize_into(text: &str, target: &Environment) -> Result<()> {
    let blocks = decode(text)?;

    let shells: Vec<Environment> = std::iter::once(target.clone())
        .chain((1..blocks.len()).map(|_| Environment::new()))
        .collect();

    for (shell, block) in shells.iter().zip(blocks) {
        let bindings = block
            .entries
            .into_iter()
            .map(|entry| match entry {
                Entry::Plain { name, value } => (name, value),
                Entry::Closure {
                    name,
                    env,
                    params,
                    body,
                } => (name, Value::closure(shells[env].clone(), params, body)),
            })
            .collect();
        let outer = block.outer.map(|idx| shells[idx].clone());
        shell.replace(bindings, outer);
    }

    debug!(environments = shells.len(), "loaded environment snapshot");
    Ok(())
}

/// One `!SETENV!` block after validation
struct Block {
    outer: Option<usize>,
    entries: Vec<Entry>,
}

enum Entry {
    Plain {
        name: String,
        value: Value,
    },
    Closure {
        name: String,
        env: usize,
        params: Vec<String>,
        body: Value,
    },
}

fn decode(text: &str) -> Result<Vec<Block>> {
    let form = crate::parse(text)
        .into_result()
        .map_err(|e| Error::deserialize(e.to_string()))?;

    let top = match &form {
        Value::List(items) => items.as_slice(),
        _ => return Err(Error::deserialize("expected a list")),
    };
    if !matches!(top.first(), Some(Value::Symbol(s)) if &**s == ENVCOUNT) {
        return Err(Error::deserialize(format!("expected {}", ENVCOUNT)));
    }
    let count = match top.get(1) {
        Some(n) => index(n)
            .filter(|n| *n >= 1)
            .ok_or_else(|| Error::deserialize(format!("expected {} <count>: {}", ENVCOUNT, n)))?,
        None => return Err(Error::deserialize(format!("expected {} <count>", ENVCOUNT))),
    };
    let count = count as usize;
    if count != top.len() - 2 {
        return Err(Error::deserialize(format!(
            "expected {} {} to match elements {}",
            ENVCOUNT,
            count,
            top.len() - 2
        )));
    }

    top[2..]
        .iter()
        .enumerate()
        .map(|(position, block)| decode_block(block, position, count))
        .collect()
}

fn decode_block(block: &Value, position: usize, count: usize) -> Result<Block> {
    let items = match block {
        Value::List(items) if items.len() >= 3 => items.as_slice(),
        _ => {
            return Err(Error::deserialize(format!(
                "expected {} <number> <number> ...: {}",
                SETENV, block
            )))
        }
    };
    if !matches!(&items[0], Value::Symbol(s) if &**s == SETENV) {
        return Err(Error::deserialize(format!("expected {}: {}", SETENV, block)));
    }

    let own = index(&items[1]).ok_or_else(|| {
        Error::deserialize(format!("expected {} <number> <number> ...: {}", SETENV, block))
    })?;
    if own != position as i64 {
        return Err(Error::deserialize(format!(
            "environment index mismatch: expected {}, got {}",
            position, items[1]
        )));
    }

    let outer = match index(&items[2]) {
        Some(-1) => None,
        Some(idx) if idx >= 0 && (idx as usize) < count => Some(idx as usize),
        _ => {
            return Err(Error::deserialize(format!(
                "outer index out of range: {}",
                items[2]
            )))
        }
    };

    let entries = items[3..]
        .iter()
        .map(|entry| decode_entry(entry, count))
        .collect::<Result<Vec<_>>>()?;

    Ok(Block { outer, entries })
}

fn decode_entry(entry: &Value, count: usize) -> Result<Entry> {
    let parts = match entry {
        Value::List(parts) if parts.len() == 3 => parts.as_slice(),
        _ => {
            return Err(Error::deserialize(format!(
                "expected a list of 3 elements: {}",
                entry
            )))
        }
    };

    match &parts[0] {
        Value::Atom(Primitive::Define) => {
            let name = parts[1].as_symbol().ok_or_else(|| {
                Error::deserialize(format!("expected define symbol: {}", entry))
            })?;
            Ok(Entry::Plain {
                name: name.to_string(),
                value: parts[2].clone(),
            })
        }
        Value::Symbol(s) if &**s == FUNCENV => {
            let env = index(&parts[1])
                .filter(|idx| *idx >= 0 && (*idx as usize) < count)
                .ok_or_else(|| {
                    Error::deserialize(format!("{} <number> is out of range: {}", FUNCENV, entry))
                })? as usize;
            let (name, params, body) = decode_function(&parts[2])?;
            Ok(Entry::Closure {
                name,
                env,
                params,
                body,
            })
        }
        _ => Err(Error::deserialize(format!(
            "expected <define> atom or {}: {}",
            FUNCENV, entry
        ))),
    }
}

/// `(define name (lambda (params...) body))`
fn decode_function(define: &Value) -> Result<(String, Vec<String>, Value)> {
    let fail = || {
        Error::deserialize(format!(
            "expected (define <symbol> (lambda (<symbols>...) <body>)): {}",
            define
        ))
    };

    let parts = match define {
        Value::List(parts) if parts.len() == 3 => parts,
        _ => return Err(fail()),
    };
    if !matches!(parts[0], Value::Atom(Primitive::Define)) {
        return Err(fail());
    }
    let name = parts[1].as_symbol().ok_or_else(fail)?;

    let lambda = match &parts[2] {
        Value::List(lambda) if lambda.len() == 3 => lambda,
        _ => return Err(fail()),
    };
    if !matches!(lambda[0], Value::Atom(Primitive::Lambda)) {
        return Err(fail());
    }
    let params = match &lambda[1] {
        Value::List(params) => params
            .iter()
            .map(|p| p.as_symbol().map(str::to_string).ok_or_else(fail))
            .collect::<Result<Vec<_>>>()?,
        _ => return Err(fail()),
    };

    Ok((name.to_string(), params, lambda[2].clone()))
}

/// An integral number, as written by the serializer
fn index(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => Some(*n as i64),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_snapshot() {
        let env = deserialize("(!ENVCOUNT! 1 (!SETENV! 0 -1 (define x 5)))").unwrap();
        assert_eq!(env.lookup("x"), Some(Value::Number(5.0)));
        assert!(env.outer().is_none());
    }

    #[test]
    fn test_values_are_stored_unevaluated() {
        let env = deserialize("(!ENVCOUNT! 1 (!SETENV! 0 -1 (define x (+ 1 2)) (define s foo)))")
            .unwrap();
        assert_eq!(env.lookup("x").unwrap().to_string(), "(+ 1 2)");
        assert_eq!(env.lookup("s"), Some(Value::symbol("foo")));
    }

    #[test]
    fn test_forward_references() {
        let text = "(!ENVCOUNT! 2
            (!SETENV! 0 -1 (!FUNCENV! 1 (define get (lambda () n))))
            (!SETENV! 1 0 (define n 7)))";
        let env = deserialize(text).unwrap();
        match env.lookup("get") {
            Some(Value::Closure(c)) => {
                assert_eq!(c.env.lookup("n"), Some(Value::Number(7.0)));
                assert!(c.env.outer().unwrap().ptr_eq(&env));
            }
            other => panic!("expected closure, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_malformed_input() {
        let cases = [
            "5",
            "(!ENVCOUNT!)",
            "(ENVCOUNT 1 (!SETENV! 0 -1))",
            "(!ENVCOUNT! 0)",
            "(!ENVCOUNT! 1.5 (!SETENV! 0 -1))",
            "(!ENVCOUNT! 2 (!SETENV! 0 -1))",
            "(!ENVCOUNT! 1 (!SETENV! 1 -1))",
            "(!ENVCOUNT! 1 (!SETENV! 0 3))",
            "(!ENVCOUNT! 1 (!SETENV! 0))",
            "(!ENVCOUNT! 1 (SETENV 0 -1))",
            "(!ENVCOUNT! 1 (!SETENV! 0 -1 (define x)))",
            "(!ENVCOUNT! 1 (!SETENV! 0 -1 (define 1 2)))",
            "(!ENVCOUNT! 1 (!SETENV! 0 -1 (set! x 2)))",
            "(!ENVCOUNT! 1 (!SETENV! 0 -1 (!FUNCENV! 4 (define f (lambda () 1)))))",
            "(!ENVCOUNT! 1 (!SETENV! 0 -1 (!FUNCENV! 0 (define f 1))))",
            "(!ENVCOUNT! 1 (!SETENV! 0 -1 (!FUNCENV! 0 (define f (begin () 1)))))",
            "(!ENVCOUNT! 1 (!SETENV! 0 -1 (!FUNCENV! 0 (define f (lambda (1) 1)))))",
            "(!ENVCOUNT! 1 (!SETENV! 0 -1)",
        ];
        for text in cases {
            let err = deserialize(text).unwrap_err();
            assert!(
                matches!(err, Error::Deserialize(_)),
                "{} gave {:?}",
                text,
                err
            );
        }
    }

    #[test]
    fn test_failure_leaves_target_untouched() {
        let target = Environment::new();
        target.define("keep", Value::Bool(true));

        let text = "(!ENVCOUNT! 2 (!SETENV! 0 -1 (define x 1)) (!SETENV! 1 0 (define 2 2)))";
        assert!(deserialize_into(text, &target).is_err());
        assert_eq!(target.lookup("keep"), Some(Value::Bool(true)));
        assert!(!target.contains("x"));
    }

    #[test]
    fn test_success_replaces_target_contents() {
        let target = Environment::new();
        target.define("old", Value::Bool(true));
        deserialize_into("(!ENVCOUNT! 1 (!SETENV! 0 -1 (define new 1)))", &target).unwrap();
        assert!(!target.contains("old"));
        assert!(target.contains("new"));
    }
}
