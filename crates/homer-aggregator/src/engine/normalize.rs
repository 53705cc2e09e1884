//! Tree-wide validation, defaults and deterministic ordering.

use std::cmp::Ordering;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::schema::{Colors, Configuration, Entry, Group};
use crate::error::ValidationError;

use super::annotations::has_supported_scheme;

static RE_HEX_COLOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#(?:[0-9A-Fa-f]{3}|[0-9A-Fa-f]{6})$").unwrap());

/// Named color tokens accepted for background keys.
const NAMED_COLORS: &[&str] = &[
    "transparent",
    "inherit",
    "initial",
    "unset",
    "currentcolor",
    "white",
    "black",
    "red",
    "green",
    "blue",
    "yellow",
    "orange",
    "purple",
    "gray",
    "grey",
];

const LAYOUTS: &[&str] = &["columns", "list"];
const COLOR_THEMES: &[&str] = &["auto", "light", "dark"];

/// Validator for a configuration tree.
pub struct ConfigValidator {
    /// Collected validation errors.
    errors: Vec<String>,
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigValidator {
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    /// Validates the whole tree, collecting every problem before failing.
    pub fn validate(&mut self, config: &Configuration) -> Result<(), ValidationError> {
        self.errors.clear();

        if config.title.trim().is_empty() {
            self.errors.push("title is required".to_string());
        }

        self.validate_colors(&config.colors);

        let layout = config.defaults.layout.as_str();
        if !layout.is_empty() && !LAYOUTS.contains(&layout) {
            self.errors.push(format!(
                "defaults.layout must be one of {:?}, got '{}'",
                LAYOUTS, layout
            ));
        }

        let theme = config.defaults.color_theme.as_str();
        if !theme.is_empty() && !COLOR_THEMES.contains(&theme) {
            self.errors.push(format!(
                "defaults.colorTheme must be one of {:?}, got '{}'",
                COLOR_THEMES, theme
            ));
        }

        for (index, group) in config.services.iter().enumerate() {
            self.validate_group(index, group);
        }

        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(std::mem::take(&mut self.errors)))
        }
    }

    fn validate_colors(&mut self, colors: &Colors) {
        for (palette, values) in [("light", &colors.light), ("dark", &colors.dark)] {
            for (key, value) in values {
                if key.ends_with("background") && !is_valid_color(value) {
                    self.errors.push(format!(
                        "colors.{}.{}: invalid color '{}'",
                        palette, key, value
                    ));
                }
            }
        }
    }

    fn validate_group(&mut self, index: usize, group: &Group) {
        if group.name().trim().is_empty() {
            self.errors
                .push(format!("services[{}]: group name is required", index));
        }
        for (item_index, entry) in group.items.iter().enumerate() {
            self.validate_entry(group.name(), item_index, entry);
        }
    }

    fn validate_entry(&mut self, group: &str, index: usize, entry: &Entry) {
        if entry.name().trim().is_empty() {
            self.errors.push(format!(
                "group '{}' item[{}]: name is required",
                group, index
            ));
        }
        if let Some(url) = entry.param("url").filter(|u| !u.is_empty()) {
            if !has_supported_scheme(url) {
                self.errors.push(format!(
                    "group '{}' item '{}': url '{}' must use http://, https:// or ftp://",
                    group,
                    entry.name(),
                    url
                ));
            }
        }
    }
}

/// `#rgb`, `#rrggbb`, a named token, or any `rgb(...)`/`rgba(...)` form.
pub fn is_valid_color(value: &str) -> bool {
    let value = value.trim();
    RE_HEX_COLOR.is_match(value)
        || NAMED_COLORS.contains(&value.to_ascii_lowercase().as_str())
        || value.to_ascii_lowercase().starts_with("rgb")
}

/// Applies defaults and sorts groups and entries case-insensitively.
pub fn normalize(config: &mut Configuration) {
    if config.header.is_none() {
        config.header = Some(true);
    }

    config.services.sort_by(|a, b| by_name(a.name(), b.name()));
    for group in &mut config.services {
        group.items.sort_by(|a, b| by_name(a.name(), b.name()));
    }
}

/// Case-insensitive order with the exact name as tiebreak, so the order is total.
fn by_name(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Validates `config` and returns a normalized copy. The input is untouched.
pub fn validate_and_normalize(config: &Configuration) -> Result<Configuration, ValidationError> {
    ConfigValidator::new().validate(config)?;
    let mut normalized = config.clone();
    normalize(&mut normalized);
    Ok(normalized)
}
