//! Tolerant field lookup over loosely-typed JSON records.
//!
//! Upstream services disagree on key spelling (PascalCase, camelCase,
//! snake_case) and nesting. Each field is described by a [`FieldSpec`]: an
//! ordered list of dotted paths tried in sequence, first usable value wins.

use serde_json::Value;

/// A named, priority-ordered list of candidate paths for one field.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub paths: &'static [&'static str],
}

impl FieldSpec {
    pub const fn new(name: &'static str, paths: &'static [&'static str]) -> Self {
        Self { name, paths }
    }

    pub fn pick<'a>(&self, record: &'a Value) -> Option<&'a Value> {
        pick(record, self.paths)
    }

    /// Extract the field as a string, `""` when no candidate matches.
    pub fn string(&self, record: &Value) -> String {
        pick_string(record, self.paths).unwrap_or_default()
    }
}

/// Follow a dotted path through nested objects.
///
/// Returns `None` as soon as a segment is missing or an intermediate value is
/// not an object. Arrays are never indexed.
pub fn lookup<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return None;
    }
    path.split('.')
        .try_fold(record, |cur, key| cur.as_object()?.get(key))
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

/// First value found at any of `paths` that is neither `null` nor `""`.
pub fn pick<'a>(record: &'a Value, paths: &[&str]) -> Option<&'a Value> {
    paths
        .iter()
        .filter_map(|path| lookup(record, path))
        .find(|v| is_present(v))
}

pub fn pick_or<'a>(record: &'a Value, paths: &[&str], default: &'a Value) -> &'a Value {
    pick(record, paths).unwrap_or(default)
}

/// Like [`pick`], rendering the match as text.
///
/// Strings are returned as-is, other scalars and nested values as their
/// compact JSON text.
pub fn pick_string(record: &Value, paths: &[&str]) -> Option<String> {
    pick(record, paths).map(value_to_string)
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lookup_follows_nested_objects() {
        let v = json!({ "BuyerInfo": { "BuyerName": "A. Buyer" } });
        assert_eq!(
            lookup(&v, "BuyerInfo.BuyerName"),
            Some(&json!("A. Buyer"))
        );
        assert_eq!(lookup(&v, "BuyerInfo.Missing"), None);
    }

    #[test]
    fn lookup_stops_at_non_objects() {
        let v = json!({ "a": "text", "list": [{ "b": 1 }] });
        assert_eq!(lookup(&v, "a.b"), None);
        assert_eq!(lookup(&v, "list.0.b"), None);
        assert_eq!(lookup(&json!(null), "a"), None);
        assert_eq!(lookup(&json!([1, 2]), "0"), None);
    }

    #[test]
    fn pick_returns_first_usable_path() {
        let v = json!({
            "download_link": null,
            "download_url": "",
            "data": { "download_url": "https://x/y" },
            "url": "/fallback"
        });
        let paths = ["missing", "download_link", "download_url", "data.download_url", "url"];
        assert_eq!(pick(&v, &paths), Some(&json!("https://x/y")));
    }

    #[test]
    fn pick_matches_manual_traversal_after_many_misses() {
        let v = json!({ "deep": { "er": { "key": 7 } } });
        let mut paths: Vec<String> = (0..50).map(|i| format!("nope{i}.x")).collect();
        paths.push("deep.er.key".to_string());
        let refs: Vec<&str> = paths.iter().map(String::as_str).collect();
        assert_eq!(pick(&v, &refs), v.get("deep").and_then(|d| d.get("er")).and_then(|e| e.get("key")));
    }

    #[test]
    fn whitespace_is_a_value() {
        let v = json!({ "a": " ", "b": "x" });
        assert_eq!(pick(&v, &["a", "b"]), Some(&json!(" ")));
    }

    #[test]
    fn pick_or_falls_back_to_default() {
        let default = json!("none");
        assert_eq!(pick_or(&json!({}), &["a"], &default), &default);
    }

    #[test]
    fn pick_string_renders_scalars() {
        let v = json!({ "n": 12345, "b": false, "o": { "k": 1 } });
        assert_eq!(pick_string(&v, &["n"]).as_deref(), Some("12345"));
        assert_eq!(pick_string(&v, &["b"]).as_deref(), Some("false"));
        assert_eq!(pick_string(&v, &["o"]).as_deref(), Some(r#"{"k":1}"#));
        assert_eq!(pick_string(&v, &["zz"]), None);
    }

    #[test]
    fn field_spec_defaults_to_empty_string() {
        const SPEC: FieldSpec = FieldSpec::new("status", &["OrderStatus", "status"]);
        assert_eq!(SPEC.string(&json!({ "status": "Pending" })), "Pending");
        assert_eq!(SPEC.string(&json!(42)), "");
    }
}
