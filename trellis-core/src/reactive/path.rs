//! Watch Path Expressions
//!
//! The imperative watch API accepts a simple dot-delimited path ("a.b.c") as
//! an alternative to a getter closure. Segments may contain word characters,
//! `_`, `$`, and digits; anything else makes the path unparsable, which the
//! caller reports and replaces with a no-op getter.
//!
//! Path walking reads keyed containers through the tracked path (that is the
//! whole point) and ordered containers through plain element reads when the
//! segment is all digits. A missing key or type mismatch yields `Null`.

use crate::value::Value;

fn allowed(c: char) -> bool {
    c.is_alphanumeric() || c == '.' || c == '_' || c == '$'
}

/// Split a dot-delimited path into segments, or `None` if it contains
/// characters outside the accepted set.
pub(crate) fn parse_path(path: &str) -> Option<Vec<String>> {
    if path.is_empty() || !path.chars().all(allowed) {
        return None;
    }
    Some(path.split('.').map(str::to_owned).collect())
}

/// Build a getter that walks `segments` from the root.
pub(crate) fn make_path_getter(segments: Vec<String>) -> impl Fn(&Value) -> Value {
    move |root: &Value| {
        let mut current = root.clone();
        for segment in &segments {
            current = match &current {
                Value::Map(map) => map.get(segment),
                Value::List(list) => match segment.parse::<usize>() {
                    Ok(index) => list.get(index),
                    Err(_) => return Value::Null,
                },
                _ => return Value::Null,
            };
        }
        current
    }
}
