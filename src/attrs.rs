//! Attribute adaptation from caller maps to backend values.

use serde_json::Value as JsonValue;

use crate::backend::KeyValue;

/// Ordered string-keyed mapping of arbitrary scalar values.
pub type Map = serde_json::Map<String, JsonValue>;

/// Build a [`Map`] from `key => value` pairs.
///
/// Values may be anything `serde::Serialize`; unserializable values become `null`.
///
/// ```rust,ignore
/// unit.info("processing", &[sig::attrs! { "user_id" => 123, "retry" => false }]);
/// ```
#[macro_export]
macro_rules! attrs {
    () => {
        $crate::Map::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::Map::new();
        $(
            map.insert(
                ::std::string::String::from($key),
                $crate::__private::serde_json::to_value(&$value)
                    .unwrap_or($crate::__private::serde_json::Value::Null),
            );
        )+
        map
    }};
}

/// Render a value in its default textual form; strings are taken verbatim.
pub fn coerce(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Flatten maps in order into string-valued attributes.
///
/// Repeated keys are kept; consumers resolve them last-write-wins.
pub fn flatten(maps: &[Map]) -> Vec<KeyValue> {
    maps.iter()
        .flat_map(|map| map.iter())
        .map(|(key, value)| KeyValue::new(key.as_str(), coerce(value)))
        .collect()
}

/// `key=value` pairs separated by spaces.
pub fn render(attributes: &[KeyValue]) -> String {
    attributes
        .iter()
        .map(|kv| format!("{}={}", kv.key, kv.value))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{lookup, Value};
    use serde_json::json;

    #[test]
    fn test_flatten_last_wins() {
        let maps = [
            crate::attrs! { "a" => 1 },
            crate::attrs! { "b" => 2 },
            crate::attrs! { "a" => 3 },
        ];
        let flat = flatten(&maps);
        assert_eq!(flat.len(), 3);
        assert_eq!(lookup(&flat, "a"), Some(&Value::from("3")));
        assert_eq!(lookup(&flat, "b"), Some(&Value::from("2")));
    }

    #[test]
    fn test_flatten_keeps_map_order() {
        let map = crate::attrs! { "z" => 1, "a" => 2, "m" => 3 };
        let keys: Vec<_> = flatten(&[map]).into_iter().map(|kv| kv.key).collect();
        assert_eq!(keys, ["z", "a", "m"]);
    }

    #[test]
    fn test_coerce_scalars() {
        assert_eq!(coerce(&json!("plain")), "plain");
        assert_eq!(coerce(&json!(123)), "123");
        assert_eq!(coerce(&json!(1.5)), "1.5");
        assert_eq!(coerce(&json!(true)), "true");
        assert_eq!(coerce(&JsonValue::Null), "null");
    }

    #[test]
    fn test_every_value_is_string() {
        let flat = flatten(&[crate::attrs! { "n" => 5u8, "ok" => false }]);
        assert!(flat.iter().all(|kv| kv.value.as_str().is_some()));
    }

    #[test]
    fn test_empty_macro() {
        assert!(crate::attrs! {}.is_empty());
        assert!(flatten(&[]).is_empty());
    }

    #[test]
    fn test_render() {
        let attrs = [KeyValue::new("file", "a.rs"), KeyValue::new("line", 3u32)];
        assert_eq!(render(&attrs), "file=a.rs line=3");
    }
}
