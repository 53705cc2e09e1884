//! Parsing of prefixed resource annotations into entry and group maps.
//!
//! Keys are scoped by a fixed prefix (`item.homer.rajsingh.info/` for
//! entries, `service.homer.rajsingh.info/` for groups). After the prefix:
//!
//! - `quick.0.name` writes `ArrayObjects["quick"][0]["name"]`,
//! - `customHeaders.Authorization` writes `NestedObjects["customHeaders"]["Authorization"]`,
//! - anything else is a scalar parameter.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::schema::{ArrayObjects, Entry, Group, NestedObjects, ParamMap};

use super::infer::{infer_value, TypedValue};

/// Annotation prefix for entry (item) fields.
pub const ITEM_ANNOTATION_PREFIX: &str = "item.homer.rajsingh.info/";

/// Annotation prefix for group (service) fields.
pub const SERVICE_ANNOTATION_PREFIX: &str = "service.homer.rajsingh.info/";

/// Largest accepted array index in `<name>.<index>.<field>` keys.
pub const MAX_ARRAY_INDEX: usize = 255;

/// Separator between object name and property in nested keys.
const PATH_SEPARATOR: char = '.';

static RE_ARRAY_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z][A-Za-z0-9_-]*)\.(\d+)\.([A-Za-z][A-Za-z0-9_-]*)$").unwrap()
});

/// Link targets Homer understands.
const VALID_TARGETS: &[&str] = &["_blank", "_self", "_parent", "_top"];

/// Scalar keys normalised to `true`/`false` at parse time (compared lowercase).
const BOOLEAN_KEYS: &[&str] = &["usecredentials", "legacyapi"];

/// How invalid annotation values are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationPolicy {
    /// Drop invalid values.
    Strict,
    /// Keep invalid values and log a warning.
    #[default]
    Warn,
    /// Perform no checks.
    None,
}

impl fmt::Display for ValidationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationPolicy::Strict => write!(f, "strict"),
            ValidationPolicy::Warn => write!(f, "warn"),
            ValidationPolicy::None => write!(f, "none"),
        }
    }
}

impl std::str::FromStr for ValidationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "strict" => Ok(ValidationPolicy::Strict),
            "warn" => Ok(ValidationPolicy::Warn),
            "none" => Ok(ValidationPolicy::None),
            _ => Err(format!("Unknown validation policy: {}", s)),
        }
    }
}

/// What happened to an invalid annotation value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueAction {
    Dropped,
    Kept,
}

/// A rejected or suspicious annotation value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationIssue {
    pub key: String,
    pub value: String,
    pub reason: String,
    pub action: IssueAction,
}

/// Maps an annotation can be written into.
pub trait AnnotationTarget {
    fn parameters_mut(&mut self) -> &mut ParamMap;
    fn nested_objects_mut(&mut self) -> &mut NestedObjects;
    /// `None` when the target has no array objects.
    fn array_objects_mut(&mut self) -> Option<&mut ArrayObjects>;
}

impl AnnotationTarget for Entry {
    fn parameters_mut(&mut self) -> &mut ParamMap {
        &mut self.parameters
    }

    fn nested_objects_mut(&mut self) -> &mut NestedObjects {
        &mut self.nested_objects
    }

    fn array_objects_mut(&mut self) -> Option<&mut ArrayObjects> {
        Some(&mut self.array_objects)
    }
}

impl AnnotationTarget for Group {
    fn parameters_mut(&mut self) -> &mut ParamMap {
        &mut self.parameters
    }

    fn nested_objects_mut(&mut self) -> &mut NestedObjects {
        &mut self.nested_objects
    }

    fn array_objects_mut(&mut self) -> Option<&mut ArrayObjects> {
        None
    }
}

/// Parser for one annotation prefix and validation policy.
#[derive(Debug, Clone)]
pub struct AnnotationParser {
    prefix: String,
    policy: ValidationPolicy,
}

impl AnnotationParser {
    pub fn new(prefix: impl Into<String>, policy: ValidationPolicy) -> Self {
        Self {
            prefix: prefix.into(),
            policy,
        }
    }

    /// Parser for entry annotations.
    pub fn items(policy: ValidationPolicy) -> Self {
        Self::new(ITEM_ANNOTATION_PREFIX, policy)
    }

    /// Parser for group annotations.
    pub fn services(policy: ValidationPolicy) -> Self {
        Self::new(SERVICE_ANNOTATION_PREFIX, policy)
    }

    /// Writes every recognised annotation into `target`.
    ///
    /// Keys without the prefix are ignored. Returns the validation issues
    /// encountered; none of them abort parsing.
    pub fn parse_into<T: AnnotationTarget>(
        &self,
        annotations: &BTreeMap<String, String>,
        target: &mut T,
    ) -> Vec<AnnotationIssue> {
        let mut issues = Vec::new();

        for (raw_key, value) in annotations {
            let Some(key) = raw_key.strip_prefix(&self.prefix) else {
                continue;
            };
            if key.is_empty() {
                continue;
            }

            if let Some(caps) = RE_ARRAY_KEY.captures(key) {
                self.write_array_field(target, &caps[1], &caps[2], &caps[3], value, &mut issues);
            } else if let Some((object, property)) = key.split_once(PATH_SEPARATOR) {
                if object.is_empty() || property.is_empty() {
                    log::debug!("Ignoring malformed annotation key '{}'", raw_key);
                    continue;
                }
                target
                    .nested_objects_mut()
                    .entry(object.to_string())
                    .or_default()
                    .insert(property.to_string(), value.clone());
            } else if let Some(value) = self.scalar_value(key, value, &mut issues) {
                target.parameters_mut().insert(key.to_string(), value);
            }
        }

        issues
    }

    fn write_array_field<T: AnnotationTarget>(
        &self,
        target: &mut T,
        name: &str,
        index: &str,
        field: &str,
        value: &str,
        issues: &mut Vec<AnnotationIssue>,
    ) {
        let Some(arrays) = target.array_objects_mut() else {
            log::debug!("Ignoring array annotation '{}' on a group", name);
            return;
        };

        let index = match index.parse::<usize>() {
            Ok(i) if i <= MAX_ARRAY_INDEX => i,
            _ => {
                issues.push(AnnotationIssue {
                    key: format!("{}.{}.{}", name, index, field),
                    value: value.to_string(),
                    reason: format!("array index exceeds {}", MAX_ARRAY_INDEX),
                    action: IssueAction::Dropped,
                });
                return;
            }
        };

        let list = arrays.entry(name.to_string()).or_default();
        if list.len() <= index {
            list.resize_with(index + 1, ParamMap::new);
        }
        list[index].insert(field.to_string(), value.to_string());
    }

    /// Normalises or validates a scalar value; `None` means drop it.
    fn scalar_value(
        &self,
        key: &str,
        value: &str,
        issues: &mut Vec<AnnotationIssue>,
    ) -> Option<String> {
        if key == "keywords" {
            return Some(normalize_keywords(value));
        }

        if BOOLEAN_KEYS.contains(&key.to_ascii_lowercase().as_str()) {
            return Some(match infer_value(value) {
                TypedValue::Bool(b) => b.to_string(),
                _ => value.to_string(),
            });
        }

        let Some(check) = validator_for(key) else {
            return Some(value.to_string());
        };

        match self.policy {
            ValidationPolicy::None => Some(value.to_string()),
            ValidationPolicy::Strict => match check(value) {
                Ok(()) => Some(value.to_string()),
                Err(reason) => {
                    issues.push(AnnotationIssue {
                        key: key.to_string(),
                        value: value.to_string(),
                        reason,
                        action: IssueAction::Dropped,
                    });
                    None
                }
            },
            ValidationPolicy::Warn => {
                if let Err(reason) = check(value) {
                    log::warn!(
                        "Annotation '{}{}' has invalid value '{}': {}",
                        self.prefix,
                        key,
                        value,
                        reason
                    );
                    issues.push(AnnotationIssue {
                        key: key.to_string(),
                        value: value.to_string(),
                        reason,
                        action: IssueAction::Kept,
                    });
                }
                Some(value.to_string())
            }
        }
    }
}

type ValueCheck = fn(&str) -> Result<(), String>;

fn validator_for(key: &str) -> Option<ValueCheck> {
    match key {
        "url" => Some(check_url),
        "target" => Some(check_target),
        "warningValue" | "dangerValue" => Some(check_number),
        _ => None,
    }
}

/// Splits on commas, trims, drops empties and rejoins.
pub fn normalize_keywords(value: &str) -> String {
    value
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}

/// Returns true if `url` has an http, https or ftp scheme and a host part.
pub fn has_supported_scheme(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    ["http://", "https://", "ftp://"]
        .iter()
        .any(|scheme| lower.starts_with(scheme) && lower.len() > scheme.len())
}

fn check_url(value: &str) -> Result<(), String> {
    if value.chars().any(char::is_whitespace) {
        return Err("URL must not contain whitespace".to_string());
    }
    if has_supported_scheme(value) {
        Ok(())
    } else {
        Err("URL must use http://, https:// or ftp://".to_string())
    }
}

fn check_target(value: &str) -> Result<(), String> {
    if VALID_TARGETS.contains(&value) {
        Ok(())
    } else {
        Err(format!("target must be one of: {}", VALID_TARGETS.join(", ")))
    }
}

fn check_number(value: &str) -> Result<(), String> {
    match value.trim().parse::<f64>() {
        Ok(n) if n.is_finite() => Ok(()),
        _ => Err("value must be a number".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotations(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn item(key: &str) -> String {
        format!("{}{}", ITEM_ANNOTATION_PREFIX, key)
    }

    #[test]
    fn test_scalar_and_foreign_keys() {
        let raw = annotations(&[
            (&item("subtitle"), "Media server"),
            (&item("logo"), "https://cdn/logo.png"),
            ("kubernetes.io/ingress.class", "nginx"),
            (ITEM_ANNOTATION_PREFIX, "empty-key"),
        ]);
        let mut entry = Entry::new("jellyfin");
        let issues = AnnotationParser::items(ValidationPolicy::Warn).parse_into(&raw, &mut entry);

        assert!(issues.is_empty());
        assert_eq!(entry.param("subtitle"), Some("Media server"));
        assert_eq!(entry.param("logo"), Some("https://cdn/logo.png"));
        assert_eq!(entry.parameters.len(), 3);
    }

    #[test]
    fn test_keywords_normalized() {
        let raw = annotations(&[(&item("keywords"), " media, ,movies ,tv,")]);
        let mut entry = Entry::new("x");
        AnnotationParser::items(ValidationPolicy::None).parse_into(&raw, &mut entry);
        assert_eq!(entry.param("keywords"), Some("media,movies,tv"));
    }

    #[test]
    fn test_nested_objects() {
        let raw = annotations(&[
            (&item("customHeaders.Authorization"), "Bearer x"),
            (&item("customHeaders.X-Trace"), "on"),
        ]);
        let mut entry = Entry::new("x");
        AnnotationParser::items(ValidationPolicy::Warn).parse_into(&raw, &mut entry);

        let headers = &entry.nested_objects["customHeaders"];
        assert_eq!(headers["Authorization"], "Bearer x");
        assert_eq!(headers["X-Trace"], "on");
    }

    #[test]
    fn test_array_objects_pad_sparse_indices() {
        let raw = annotations(&[
            (&item("quick.2.name"), "Logs"),
            (&item("quick.0.name"), "Admin"),
            (&item("quick.0.url"), "https://admin"),
        ]);
        let mut entry = Entry::new("x");
        AnnotationParser::items(ValidationPolicy::Warn).parse_into(&raw, &mut entry);

        let quick = &entry.array_objects["quick"];
        assert_eq!(quick.len(), 3);
        assert_eq!(quick[0]["name"], "Admin");
        assert_eq!(quick[0]["url"], "https://admin");
        assert!(quick[1].is_empty());
        assert_eq!(quick[2]["name"], "Logs");
    }

    #[test]
    fn test_array_index_limit() {
        let raw = annotations(&[(&item("quick.9999.name"), "Too far")]);
        let mut entry = Entry::new("x");
        let issues = AnnotationParser::items(ValidationPolicy::None).parse_into(&raw, &mut entry);

        assert!(entry.array_objects.is_empty());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].action, IssueAction::Dropped);
    }

    #[test]
    fn test_groups_ignore_array_keys() {
        let raw = annotations(&[
            (&format!("{}quick.0.name", SERVICE_ANNOTATION_PREFIX), "x"),
            (&format!("{}icon", SERVICE_ANNOTATION_PREFIX), "fas fa-film"),
        ]);
        let mut group = Group::new("Media");
        AnnotationParser::services(ValidationPolicy::Warn).parse_into(&raw, &mut group);
        assert_eq!(group.parameters.get("icon").unwrap(), "fas fa-film");
        assert!(group.nested_objects.is_empty());
    }

    #[test]
    fn test_strict_drops_invalid_values() {
        let raw = annotations(&[
            (&item("url"), "not a url"),
            (&item("target"), "_new"),
            (&item("warningValue"), "high"),
            (&item("dangerValue"), "90"),
        ]);
        let mut entry = Entry::new("x");
        let issues = AnnotationParser::items(ValidationPolicy::Strict).parse_into(&raw, &mut entry);

        assert_eq!(entry.param("url"), None);
        assert_eq!(entry.param("target"), None);
        assert_eq!(entry.param("warningValue"), None);
        assert_eq!(entry.param("dangerValue"), Some("90"));
        assert_eq!(issues.len(), 3);
        assert!(issues.iter().all(|i| i.action == IssueAction::Dropped));
    }

    #[test]
    fn test_warn_keeps_invalid_values() {
        let raw = annotations(&[(&item("url"), "gopher://old")]);
        let mut entry = Entry::new("x");
        let issues = AnnotationParser::items(ValidationPolicy::Warn).parse_into(&raw, &mut entry);

        assert_eq!(entry.param("url"), Some("gopher://old"));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].action, IssueAction::Kept);
    }

    #[test]
    fn test_none_skips_checks() {
        let raw = annotations(&[(&item("target"), "whatever")]);
        let mut entry = Entry::new("x");
        let issues = AnnotationParser::items(ValidationPolicy::None).parse_into(&raw, &mut entry);
        assert!(issues.is_empty());
        assert_eq!(entry.param("target"), Some("whatever"));
    }

    #[test]
    fn test_boolean_keys_normalized() {
        let raw = annotations(&[(&item("useCredentials"), "Yes"), (&item("legacyApi"), "maybe")]);
        let mut entry = Entry::new("x");
        AnnotationParser::items(ValidationPolicy::Warn).parse_into(&raw, &mut entry);
        assert_eq!(entry.param("useCredentials"), Some("true"));
        assert_eq!(entry.param("legacyApi"), Some("maybe"));
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("STRICT".parse::<ValidationPolicy>().unwrap(), ValidationPolicy::Strict);
        assert_eq!("none".parse::<ValidationPolicy>().unwrap(), ValidationPolicy::None);
        assert!("loose".parse::<ValidationPolicy>().is_err());
        assert_eq!(ValidationPolicy::default(), ValidationPolicy::Warn);
    }

    #[test]
    fn test_has_supported_scheme() {
        assert!(has_supported_scheme("https://example.com"));
        assert!(has_supported_scheme("HTTP://example.com"));
        assert!(has_supported_scheme("ftp://files"));
        assert!(!has_supported_scheme("https://"));
        assert!(!has_supported_scheme("example.com"));
    }
}
