//! Decides which group a discovered entry belongs to.
//!
//! Resolution order:
//! 1. explicit group-name annotation,
//! 2. fuzzy match against groups holding foundation entries,
//! 3. the configured fallback strategy.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::schema::Configuration;

use super::annotations::SERVICE_ANNOTATION_PREFIX;
use super::OriginContext;

/// Group used when every strategy comes up empty.
pub const DEFAULT_GROUP: &str = "default";

/// Label consulted by the `label` strategy when none is configured.
pub const DEFAULT_LABEL_KEY: &str = "app.kubernetes.io/part-of";

// Empirical weights, kept for behavioural parity. Tunable, not derived.
const SCORE_ANNOTATION_MATCH: u32 = 200;
const SCORE_NAMESPACE_EXACT: u32 = 100;
const SCORE_NAMESPACE_PARTIAL: u32 = 50;
const MIN_CONFIDENCE: u32 = 30;

/// Annotation naming the target group explicitly.
pub fn group_name_annotation() -> String {
    format!("{}name", SERVICE_ANNOTATION_PREFIX)
}

/// Fallback strategy when no foundation group matches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupingStrategy {
    #[default]
    Namespace,
    Label,
    Custom,
}

impl fmt::Display for GroupingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupingStrategy::Namespace => write!(f, "namespace"),
            GroupingStrategy::Label => write!(f, "label"),
            GroupingStrategy::Custom => write!(f, "custom"),
        }
    }
}

/// A custom grouping rule. All conditions must match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupingRule {
    #[serde(default)]
    pub name: String,

    /// Key to pattern. `*` matches any value, `prefix*` matches by prefix.
    #[serde(default)]
    pub condition: BTreeMap<String, String>,

    pub group: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupingConfig {
    #[serde(default)]
    pub strategy: GroupingStrategy,

    #[serde(default = "default_label_key")]
    pub label_key: String,

    #[serde(default)]
    pub custom_rules: Vec<GroupingRule>,
}

fn default_label_key() -> String {
    DEFAULT_LABEL_KEY.to_string()
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            strategy: GroupingStrategy::default(),
            label_key: default_label_key(),
            custom_rules: Vec::new(),
        }
    }
}

/// Why a group was chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionReason {
    Annotation,
    FuzzyMatch { score: u32 },
    Strategy(GroupingStrategy),
    /// A custom rule matched; carries the rule name.
    CustomRule(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub group: String,
    pub reason: ResolutionReason,
}

pub struct GroupResolver {
    config: GroupingConfig,
}

impl GroupResolver {
    pub fn new(config: GroupingConfig) -> Self {
        Self { config }
    }

    /// Resolves the group for one origin. `tree` is only read.
    pub fn resolve(&self, tree: &Configuration, context: &OriginContext) -> Resolution {
        let explicit = context.annotations.get(&group_name_annotation());

        if let Some(name) = explicit.filter(|n| !n.trim().is_empty()) {
            return Resolution {
                group: canonical_group_name(tree, name.trim()),
                reason: ResolutionReason::Annotation,
            };
        }

        if let Some((group, score)) = best_foundation_match(tree, &context.namespace, explicit) {
            return Resolution {
                group,
                reason: ResolutionReason::FuzzyMatch { score },
            };
        }

        self.fallback(context)
    }

    fn fallback(&self, context: &OriginContext) -> Resolution {
        match self.config.strategy {
            GroupingStrategy::Namespace => namespace_resolution(context),
            GroupingStrategy::Label => {
                match context
                    .labels
                    .get(&self.config.label_key)
                    .filter(|v| !v.is_empty())
                {
                    Some(value) => Resolution {
                        group: value.clone(),
                        reason: ResolutionReason::Strategy(GroupingStrategy::Label),
                    },
                    None => namespace_resolution(context),
                }
            }
            GroupingStrategy::Custom => {
                match self
                    .config
                    .custom_rules
                    .iter()
                    .find(|rule| rule_matches(rule, context))
                {
                    Some(rule) => Resolution {
                        group: rule.group.clone(),
                        reason: ResolutionReason::CustomRule(rule.name.clone()),
                    },
                    None => namespace_resolution(context),
                }
            }
        }
    }
}

fn namespace_resolution(context: &OriginContext) -> Resolution {
    let group = if context.namespace.is_empty() {
        DEFAULT_GROUP.to_string()
    } else {
        context.namespace.clone()
    };
    Resolution {
        group,
        reason: ResolutionReason::Strategy(GroupingStrategy::Namespace),
    }
}

/// Scores one foundation group.
///
/// When the group-name annotation is present at all, only the annotation
/// path is scored.
pub fn score_group(group_name: &str, namespace: &str, annotation: Option<&String>) -> u32 {
    if let Some(wanted) = annotation {
        return if wanted.eq_ignore_ascii_case(group_name) {
            SCORE_ANNOTATION_MATCH
        } else {
            0
        };
    }

    if namespace.is_empty() || group_name.is_empty() {
        return 0;
    }

    let ns = namespace.to_lowercase();
    let name = group_name.to_lowercase();
    if ns == name {
        SCORE_NAMESPACE_EXACT
    } else if ns.contains(&name) || name.contains(&ns) {
        SCORE_NAMESPACE_PARTIAL
    } else {
        0
    }
}

/// Highest-scoring foundation group at or above the confidence threshold.
/// Ties keep the first group encountered.
/// Spells `name` like the foundation group it matches case-insensitively, if
/// any. Other names are returned unchanged.
pub fn canonical_group_name(tree: &Configuration, name: &str) -> String {
    tree.services
        .iter()
        .filter(|g| g.has_foundation_entry())
        .find(|g| g.name().eq_ignore_ascii_case(name))
        .map_or_else(|| name.to_string(), |g| g.name().to_string())
}

fn best_foundation_match(
    tree: &Configuration,
    namespace: &str,
    annotation: Option<&String>,
) -> Option<(String, u32)> {
    let mut best: Option<(&str, u32)> = None;

    for group in tree.services.iter().filter(|g| g.has_foundation_entry()) {
        let score = score_group(group.name(), namespace, annotation);
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((group.name(), score));
        }
    }

    best.filter(|(_, score)| *score >= MIN_CONFIDENCE)
        .map(|(name, score)| (name.to_string(), score))
}

fn rule_matches(rule: &GroupingRule, context: &OriginContext) -> bool {
    if rule.condition.is_empty() {
        return false;
    }
    rule.condition.iter().all(|(key, pattern)| {
        context
            .labels
            .get(key)
            .or_else(|| context.annotations.get(key))
            .is_some_and(|value| pattern_matches(pattern, value))
    })
}

/// `*` matches anything, `prefix*` matches by prefix, otherwise exact.
fn pattern_matches(pattern: &str, value: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    match pattern.strip_suffix('*') {
        Some(prefix) => value.starts_with(prefix),
        None => pattern == value,
    }
}
