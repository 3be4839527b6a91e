//! Dotted-path views of nested string-keyed maps (`"a.b.c" -> leaf`).

use crate::error::SchemaError;
use crate::value::{Value, ValueMap};

fn key_text(key: &Value) -> Result<&str, SchemaError> {
    key.as_str().ok_or_else(|| SchemaError::mismatch("a string key", key))
}

/// Flatten nested maps into dotted-path entries. Non-map values, lists
/// included, are leaves.
pub fn flatten(map: &ValueMap) -> Result<ValueMap, SchemaError> {
    fn walk(map: &ValueMap, prefix: &str, out: &mut ValueMap) -> Result<(), SchemaError> {
        for (key, value) in map.iter() {
            let key = key_text(key)?;
            let path = if prefix.is_empty() {
                key.to_string()
            } else {
                format!("{prefix}.{key}")
            };
            match value {
                Value::Map(inner) => walk(inner, &path, out)?,
                leaf => {
                    out.insert(path, leaf.clone());
                }
            }
        }
        Ok(())
    }

    let mut out = ValueMap::new();
    walk(map, "", &mut out)?;
    Ok(out)
}

/// Write `value` at a dotted `path`, creating intermediate maps.
///
/// # Errors
///
/// `TypeMismatch` when an intermediate segment already holds a non-map.
pub fn set_path(map: &mut ValueMap, path: &str, value: Value) -> Result<(), SchemaError> {
    let (parents, last) = match path.rsplit_once('.') {
        Some((parents, last)) => (Some(parents), last),
        None => (None, path),
    };
    let mut current = map;
    for part in parents.into_iter().flat_map(|p| p.split('.')) {
        let key = Value::from(part);
        if !current.contains_key(&key) {
            current.insert(key.clone(), Value::Map(ValueMap::new()));
        }
        current = match current.get_mut(&key) {
            Some(Value::Map(inner)) => inner,
            Some(other) => return Err(SchemaError::mismatch(format!("a map at '{part}' of '{path}'"), other)),
            None => return Err(SchemaError::Policy(format!("path segment '{part}' vanished"))),
        };
    }
    current.insert(last, value);
    Ok(())
}

/// Inverse of [`flatten`].
pub fn unflatten(entries: &ValueMap) -> Result<ValueMap, SchemaError> {
    let mut out = ValueMap::new();
    for (path, value) in entries.iter() {
        set_path(&mut out, key_text(path)?, value.clone())?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nested() -> ValueMap {
        let inner: ValueMap = [("lr", Value::Float(0.1)), ("steps", Value::Int(3))].into_iter().collect();
        [("name", Value::from("run")), ("optim", Value::Map(inner))].into_iter().collect()
    }

    #[test]
    fn test_flatten_joins_paths() {
        let flat = flatten(&nested()).unwrap();
        assert_eq!(flat.get_str("optim.lr"), Some(&Value::Float(0.1)));
        assert_eq!(flat.get_str("name"), Some(&Value::from("run")));
        assert_eq!(flat.len(), 3);
    }

    #[test]
    fn test_unflatten_inverts_flatten() {
        assert_eq!(unflatten(&flatten(&nested()).unwrap()).unwrap(), nested());
    }

    #[test]
    fn test_set_path_through_leaf_fails() {
        let mut map = nested();
        assert!(matches!(
            set_path(&mut map, "name.first", Value::Int(1)),
            Err(SchemaError::TypeMismatch { .. })
        ));
        set_path(&mut map, "optim.beta.one", Value::Float(0.9)).unwrap();
        assert_eq!(flatten(&map).unwrap().get_str("optim.beta.one"), Some(&Value::Float(0.9)));
    }
}
