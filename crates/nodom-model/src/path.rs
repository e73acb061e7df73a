//! Model paths
//!
//! Dotted paths (`user.tags.0`) addressing values inside a JSON tree.
//! Numeric segments index arrays, everything else indexes objects.

use serde_json::{Map, Value};

use crate::ModelError;

/// Key names that never trigger change notification
const RESERVED_KEYS: &[&str] = &["__proto__", "prototype", "constructor"];

/// Marker prefix for internal keys
pub const MARKER: char = '$';

/// Split a dotted path into its non-empty segments
pub fn split(path: &str) -> impl Iterator<Item = &str> {
    path.split('.').map(str::trim).filter(|s| !s.is_empty())
}

/// Join a base path with a relative path
pub fn join(base: &str, rel: &str) -> String {
    match (base.is_empty(), rel.is_empty()) {
        (true, _) => split(rel).collect::<Vec<_>>().join("."),
        (_, true) => base.to_string(),
        _ => {
            let mut out = base.to_string();
            for seg in split(rel) {
                out.push('.');
                out.push_str(seg);
            }
            out
        }
    }
}

/// Parent of a path (`a.b.c` -> `a.b`, `a` -> ``)
pub fn parent(path: &str) -> &str {
    path.rfind('.').map(|i| &path[..i]).unwrap_or("")
}

/// Last segment of a path
pub fn last(path: &str) -> &str {
    path.rfind('.').map(|i| &path[i + 1..]).unwrap_or(path)
}

/// Whether writes to this path bypass interception
pub fn is_reserved(path: &str) -> bool {
    split(path).any(|seg| seg.starts_with(MARKER) || RESERVED_KEYS.contains(&seg))
}

/// Resolve a path inside a value
pub fn lookup<'v>(value: &'v Value, path: &str) -> Option<&'v Value> {
    let mut current = value;
    for seg in split(path) {
        current = match current {
            Value::Object(map) => map.get(seg)?,
            Value::Array(items) => items.get(seg.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Write `new` at `path`, creating intermediate objects on the way.
///
/// Returns the previous value (`Null` when the key did not exist).
pub fn assign(root: &mut Value, path: &str, new: Value) -> Result<Value, ModelError> {
    let segs: Vec<&str> = split(path).collect();
    let Some((last, parents)) = segs.split_last() else {
        return Err(ModelError::EmptyPath);
    };

    let mut current = root;
    for seg in parents {
        if current.is_null() {
            *current = Value::Object(Map::new());
        }
        current = match current {
            Value::Object(map) => map
                .entry(seg.to_string())
                .or_insert_with(|| Value::Object(Map::new())),
            Value::Array(items) => {
                let index = parse_index(seg)?;
                let len = items.len();
                items.get_mut(index).ok_or(ModelError::OutOfBounds { index, len })?
            }
            _ => return Err(ModelError::NotContainer(path.to_string())),
        };
    }

    if current.is_null() {
        *current = Value::Object(Map::new());
    }
    match current {
        Value::Object(map) => Ok(map.insert(last.to_string(), new).unwrap_or(Value::Null)),
        Value::Array(items) => {
            let index = parse_index(last)?;
            let len = items.len();
            if index < len {
                Ok(std::mem::replace(&mut items[index], new))
            } else if index == len {
                items.push(new);
                Ok(Value::Null)
            } else {
                Err(ModelError::OutOfBounds { index, len })
            }
        }
        _ => Err(ModelError::NotContainer(path.to_string())),
    }
}

fn parse_index(seg: &str) -> Result<usize, ModelError> {
    seg.parse::<usize>()
        .map_err(|_| ModelError::InvalidIndex(seg.to_string()))
}
