//! String-to-typed-value inference for emitted scalars.
//!
//! Annotations and CRD parameters are plain strings; Homer expects booleans,
//! numbers, lists and maps for some fields. The decision is a fixed, ordered
//! predicate table: the first rule returning `Some` wins, otherwise the
//! original string is kept.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

/// `key:value[,key:value...]`
static RE_KEY_VALUE_LIST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^:,]+:[^,]*(?:,[^:,]+:[^,]*)*$").unwrap());

/// Case-insensitive literals recognised as booleans.
const TRUE_LITERALS: &[&str] = &["true", "1", "yes", "on"];
const FALSE_LITERALS: &[&str] = &["false", "0", "no", "off"];

/// Keys whose comma-separated values are emitted as lists (compared lowercase).
pub const ARRAY_KEYS: &[&str] = &[
    "hide",
    "hiddenfields",
    "successcodes",
    "groups",
    "environments",
    "stats",
];

/// Keys whose `k:v,k:v` values are emitted as maps (compared lowercase).
pub const OBJECT_KEYS: &[&str] = &["headers", "customheaders"];

/// A typed output value.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Bool(bool),
    Int(i64),
    /// Elements keep their native JSON types.
    List(Vec<serde_json::Value>),
    Map(BTreeMap<String, String>),
    String(String),
}

impl TypedValue {
    /// Converts to a YAML node for the output document.
    pub fn to_yaml(&self) -> serde_yaml::Value {
        match self {
            TypedValue::Bool(b) => serde_yaml::Value::Bool(*b),
            TypedValue::Int(i) => serde_yaml::Value::Number((*i).into()),
            TypedValue::List(items) => {
                serde_yaml::Value::Sequence(items.iter().map(json_to_yaml).collect())
            }
            TypedValue::Map(map) => {
                let mut mapping = serde_yaml::Mapping::new();
                for (k, v) in map {
                    mapping.insert(
                        serde_yaml::Value::String(k.clone()),
                        serde_yaml::Value::String(v.clone()),
                    );
                }
                serde_yaml::Value::Mapping(mapping)
            }
            TypedValue::String(s) => serde_yaml::Value::String(s.clone()),
        }
    }
}

impl From<TypedValue> for serde_json::Value {
    fn from(value: TypedValue) -> Self {
        match value {
            TypedValue::Bool(b) => serde_json::Value::Bool(b),
            TypedValue::Int(i) => serde_json::Value::from(i),
            TypedValue::List(items) => serde_json::Value::Array(items),
            TypedValue::Map(map) => serde_json::Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, serde_json::Value::String(v)))
                    .collect(),
            ),
            TypedValue::String(s) => serde_json::Value::String(s),
        }
    }
}

fn json_to_yaml(value: &serde_json::Value) -> serde_yaml::Value {
    // Every JSON value has a YAML representation.
    serde_yaml::to_value(value).unwrap_or(serde_yaml::Value::Null)
}

type InferRule = fn(&str, &str) -> Option<TypedValue>;

/// The ordered decision table.
const RULES: &[(&str, InferRule)] = &[
    ("boolean", infer_bool),
    ("integer", infer_int),
    ("json-array", infer_json_array),
    ("array-key", infer_delimited_list),
    ("object-key", infer_key_value_map),
];

/// Infers the typed value of `value` emitted under `key`.
pub fn infer(key: &str, value: &str) -> TypedValue {
    RULES
        .iter()
        .find_map(|(_, rule)| rule(key, value))
        .unwrap_or_else(|| TypedValue::String(value.to_string()))
}

/// Key-independent inference, used while parsing simple boolean attributes.
pub fn infer_value(value: &str) -> TypedValue {
    infer("", value)
}

/// Integer-only inference for numeric root settings. Anything that is not an
/// integer stays a string.
pub fn infer_integer(value: &str) -> TypedValue {
    infer_int("", value).unwrap_or_else(|| TypedValue::String(value.to_string()))
}

/// Returns the name of the rule that would decide `value` under `key`.
pub fn matching_rule(key: &str, value: &str) -> Option<&'static str> {
    RULES
        .iter()
        .find(|(_, rule)| rule(key, value).is_some())
        .map(|(name, _)| *name)
}

fn is_array_key(key: &str) -> bool {
    ARRAY_KEYS.contains(&key.to_ascii_lowercase().as_str())
}

fn is_object_key(key: &str) -> bool {
    OBJECT_KEYS.contains(&key.to_ascii_lowercase().as_str())
}

fn infer_bool(_key: &str, value: &str) -> Option<TypedValue> {
    if TRUE_LITERALS.iter().any(|l| l.eq_ignore_ascii_case(value)) {
        Some(TypedValue::Bool(true))
    } else if FALSE_LITERALS.iter().any(|l| l.eq_ignore_ascii_case(value)) {
        Some(TypedValue::Bool(false))
    } else {
        None
    }
}

fn infer_int(_key: &str, value: &str) -> Option<TypedValue> {
    if value.contains('.') {
        return None;
    }
    value.parse::<i64>().ok().map(TypedValue::Int)
}

fn infer_json_array(_key: &str, value: &str) -> Option<TypedValue> {
    let trimmed = value.trim();
    if !(trimmed.starts_with('[') && trimmed.ends_with(']')) {
        return None;
    }
    serde_json::from_str::<Vec<serde_json::Value>>(trimmed)
        .ok()
        .map(TypedValue::List)
}

fn infer_delimited_list(key: &str, value: &str) -> Option<TypedValue> {
    if !is_array_key(key) || !value.contains(',') || value.contains(':') {
        return None;
    }
    let items = value
        .split(',')
        .map(str::trim)
        .map(|item| serde_json::Value::from(infer_scalar(item)))
        .collect();
    Some(TypedValue::List(items))
}

fn infer_key_value_map(key: &str, value: &str) -> Option<TypedValue> {
    if !is_object_key(key) || !RE_KEY_VALUE_LIST.is_match(value) {
        return None;
    }
    let map = value
        .split(',')
        .filter_map(|pair| pair.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();
    Some(TypedValue::Map(map))
}

/// Scalar-only inference for list elements.
fn infer_scalar(value: &str) -> TypedValue {
    infer_bool("", value)
        .or_else(|| infer_int("", value))
        .unwrap_or_else(|| TypedValue::String(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_boolean_literals_any_case() {
        for v in ["true", "TRUE", "Yes", "on", "1"] {
            assert_eq!(infer("target", v), TypedValue::Bool(true), "{v}");
        }
        for v in ["false", "No", "OFF", "0"] {
            assert_eq!(infer("target", v), TypedValue::Bool(false), "{v}");
        }
    }

    #[test]
    fn test_boolean_requires_exact_match() {
        assert_eq!(infer("x", " true"), TypedValue::String(" true".into()));
        assert_eq!(infer("x", "yess"), TypedValue::String("yess".into()));
    }

    #[test]
    fn test_integers() {
        assert_eq!(infer("columns", "3"), TypedValue::Int(3));
        assert_eq!(infer("x", "-42"), TypedValue::Int(-42));
        assert_eq!(infer("x", "10"), TypedValue::Int(10));
        assert_eq!(infer("x", "1.5"), TypedValue::String("1.5".into()));
        assert_eq!(infer("x", "12a"), TypedValue::String("12a".into()));
    }

    #[test]
    fn test_json_array_keeps_native_types() {
        assert_eq!(
            infer("anything", r#"[1, "two", true, {"a": 1}]"#),
            TypedValue::List(vec![json!(1), json!("two"), json!(true), json!({"a": 1})])
        );
    }

    #[test]
    fn test_malformed_json_array_falls_through() {
        assert_eq!(infer("x", "[1, 2"), TypedValue::String("[1, 2".into()));
        // Not valid JSON, but an array key with commas: handled by the list rule.
        assert_eq!(
            infer("hide", "[a, b]"),
            TypedValue::List(vec![json!("[a"), json!("b]")])
        );
    }

    #[test]
    fn test_array_keys_split_and_infer_elements() {
        assert_eq!(
            infer("successCodes", "200, 301,404"),
            TypedValue::List(vec![json!(200), json!(301), json!(404)])
        );
        assert_eq!(
            infer("hide", "cpu, yes, 0"),
            TypedValue::List(vec![json!("cpu"), json!(true), json!(false)])
        );
    }

    #[test]
    fn test_array_keys_need_comma_and_no_colon() {
        assert_eq!(infer("groups", "single"), TypedValue::String("single".into()));
        assert_eq!(infer("groups", "a:b,c"), TypedValue::String("a:b,c".into()));
        assert_eq!(infer("title", "a,b"), TypedValue::String("a,b".into()));
    }

    #[test]
    fn test_object_keys_parse_maps() {
        let mut expected = BTreeMap::new();
        expected.insert("X-Api-Key".to_string(), "abc".to_string());
        expected.insert("Accept".to_string(), "application/json".to_string());
        assert_eq!(
            infer("headers", "X-Api-Key: abc, Accept:application/json"),
            TypedValue::Map(expected)
        );
        assert_eq!(
            infer("headers", "no-colon-here"),
            TypedValue::String("no-colon-here".into())
        );
        assert_eq!(infer("subtitle", "a:b"), TypedValue::String("a:b".into()));
    }

    #[test]
    fn test_infer_value_ignores_key_rules() {
        assert_eq!(infer_value("Yes"), TypedValue::Bool(true));
        assert_eq!(infer_value("a,b"), TypedValue::String("a,b".into()));
        assert_eq!(infer_value("k:v"), TypedValue::String("k:v".into()));
    }

    #[test]
    fn test_matching_rule_order() {
        assert_eq!(matching_rule("hide", "1"), Some("boolean"));
        assert_eq!(matching_rule("hide", "7"), Some("integer"));
        assert_eq!(matching_rule("hide", "[7]"), Some("json-array"));
        assert_eq!(matching_rule("hide", "a,b"), Some("array-key"));
        assert_eq!(matching_rule("headers", "a:b"), Some("object-key"));
        assert_eq!(matching_rule("name", "plain"), None);
    }

    #[test]
    fn test_to_yaml() {
        assert_eq!(TypedValue::Int(3).to_yaml(), serde_yaml::Value::Number(3i64.into()));
        assert_eq!(
            TypedValue::List(vec![json!(1), json!("a")]).to_yaml(),
            serde_yaml::from_str::<serde_yaml::Value>("[1, a]").unwrap()
        );
    }
}
