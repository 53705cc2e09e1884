//! The dashboard configuration tree.
//!
//! A [`Configuration`] is the in-memory form of a Homer `config.yml` plus the
//! provenance bookkeeping the aggregation engine needs: every [`Entry`] knows
//! which origin produced it so that discovery batches can be replaced
//! wholesale without touching curated content.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Source token reserved for entries authored in the foundation manifest.
pub const FOUNDATION_SOURCE: &str = "foundation";

/// Internal footer value meaning "footer explicitly disabled".
///
/// An empty footer means "not set" and is omitted from the output; this
/// sentinel is emitted as a literal `false`.
pub const FOOTER_DISABLED: &str = "__footer_disabled__";

/// Flat string parameters of a group, entry or link.
pub type ParamMap = BTreeMap<String, String>;

/// Grouped sub-fields, e.g. `customHeaders -> {Authorization -> ...}`.
pub type NestedObjects = BTreeMap<String, ParamMap>;

/// Ordered lists of objects, e.g. `quick -> [{name, url}, ...]`.
pub type ArrayObjects = BTreeMap<String, Vec<ParamMap>>;

// ============================================================================
// Provenance
// ============================================================================

/// Where an entry came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provenance {
    /// Origin resource identifier (`<kind>/<name>`) or [`FOUNDATION_SOURCE`].
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source: String,

    /// Namespace of the origin resource.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub origin_namespace: String,

    /// Opaque timestamp of the last discovery refresh.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub last_update: String,
}

impl Provenance {
    /// Provenance for curated foundation content.
    pub fn foundation() -> Self {
        Self {
            source: FOUNDATION_SOURCE.to_string(),
            origin_namespace: String::new(),
            last_update: String::new(),
        }
    }

    /// Provenance for an entry produced by a discovery origin.
    pub fn discovered(origin: &Origin, last_update: impl Into<String>) -> Self {
        Self {
            source: origin.source.clone(),
            origin_namespace: origin.namespace.clone(),
            last_update: last_update.into(),
        }
    }

    pub fn is_foundation(&self) -> bool {
        self.source == FOUNDATION_SOURCE
    }

    /// True for a non-empty, non-foundation source.
    pub fn is_discovered(&self) -> bool {
        !self.source.is_empty() && !self.is_foundation()
    }

    /// Returns the owning origin for discovered entries.
    pub fn origin(&self) -> Option<Origin> {
        self.is_discovered()
            .then(|| Origin::new(&self.source, &self.origin_namespace))
    }

    /// Returns true if this provenance belongs to the given origin.
    pub fn belongs_to(&self, origin: &Origin) -> bool {
        self.source == origin.source && self.origin_namespace == origin.namespace
    }

    fn is_empty(&self) -> bool {
        self.source.is_empty() && self.origin_namespace.is_empty() && self.last_update.is_empty()
    }
}

/// The `(Source, OriginNamespace)` identity owning a batch of discovered entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Origin {
    pub source: String,
    pub namespace: String,
}

impl Origin {
    pub fn new(source: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            namespace: namespace.into(),
        }
    }

    pub fn is_foundation(&self) -> bool {
        self.source == FOUNDATION_SOURCE
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.source)
        } else {
            write!(f, "{}/{}", self.namespace, self.source)
        }
    }
}

// ============================================================================
// Entry
// ============================================================================

/// A dashboard item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    #[serde(default)]
    pub parameters: ParamMap,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub nested_objects: NestedObjects,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub array_objects: ArrayObjects,

    #[serde(default, skip_serializing_if = "Provenance::is_empty")]
    pub provenance: Provenance,
}

impl Entry {
    /// Creates an entry carrying only a name.
    pub fn new(name: impl Into<String>) -> Self {
        let mut entry = Self::default();
        entry.parameters.insert("name".to_string(), name.into());
        entry
    }

    /// Returns the entry name, or `""` if unset.
    pub fn name(&self) -> &str {
        self.param("name").unwrap_or("")
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).map(String::as_str)
    }

    pub fn set_param(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.parameters.insert(key.into(), value.into());
    }

    /// Builder-style parameter setter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_param(key, value);
        self
    }

    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = provenance;
        self
    }

    pub fn is_foundation(&self) -> bool {
        self.provenance.is_foundation()
    }
}

// ============================================================================
// Group
// ============================================================================

/// A named bucket of entries (a Homer "service" section).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    #[serde(default)]
    pub parameters: ParamMap,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub nested_objects: NestedObjects,

    #[serde(default)]
    pub items: Vec<Entry>,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        let mut group = Self::default();
        group.parameters.insert("name".to_string(), name.into());
        group
    }

    pub fn name(&self) -> &str {
        self.parameters.get("name").map(String::as_str).unwrap_or("")
    }

    pub fn with_item(mut self, entry: Entry) -> Self {
        self.items.push(entry);
        self
    }

    pub fn entry(&self, name: &str) -> Option<&Entry> {
        self.items.iter().find(|e| e.name() == name)
    }

    pub fn entry_mut(&mut self, name: &str) -> Option<&mut Entry> {
        self.items.iter_mut().find(|e| e.name() == name)
    }

    /// True if at least one entry has foundation provenance.
    pub fn has_foundation_entry(&self) -> bool {
        self.items.iter().any(Entry::is_foundation)
    }
}

// ============================================================================
// Root settings
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hotkey {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub search: String,
}

/// Light and dark palettes. Keys follow Homer's names (`highlight-primary`,
/// `background`, `card-background`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Colors {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub light: ParamMap,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dark: ParamMap,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Defaults {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub layout: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub color_theme: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proxy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_credentials: Option<bool>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: ParamMap,
}

/// Dynamic message banner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub mapping: ParamMap,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub refresh_interval: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub style: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub icon: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub content: String,
}

/// Navbar link.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub icon: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub target: String,
}

// ============================================================================
// Configuration (root)
// ============================================================================

/// Root of the dashboard tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    #[serde(default)]
    pub title: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub subtitle: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub document_title: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub logo: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub icon: String,

    /// Header visibility; `None` until normalized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<bool>,

    /// Footer HTML, empty when unset, [`FOOTER_DISABLED`] when disabled.
    #[serde(
        default,
        deserialize_with = "deserialize_footer",
        skip_serializing_if = "String::is_empty"
    )]
    pub footer: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub columns: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connectivity_check: Option<bool>,

    #[serde(default)]
    pub hotkey: Hotkey,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub theme: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stylesheet: Vec<String>,

    #[serde(default)]
    pub colors: Colors,

    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub proxy: Proxy,

    #[serde(default)]
    pub message: Message,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,

    #[serde(default)]
    pub services: Vec<Group>,
}

impl Configuration {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_group(mut self, group: Group) -> Self {
        self.services.push(group);
        self
    }

    /// Looks up a group by name, case-insensitively.
    pub fn group(&self, name: &str) -> Option<&Group> {
        self.services
            .iter()
            .find(|g| g.name().eq_ignore_ascii_case(name))
    }

    pub fn group_mut(&mut self, name: &str) -> Option<&mut Group> {
        self.services
            .iter_mut()
            .find(|g| g.name().eq_ignore_ascii_case(name))
    }

    /// Iterates over every entry in every group.
    pub fn entries(&self) -> impl Iterator<Item = (&Group, &Entry)> {
        self.services
            .iter()
            .flat_map(|g| g.items.iter().map(move |e| (g, e)))
    }

    /// Stamps foundation provenance on every entry that has none.
    pub fn mark_foundation(&mut self) {
        for group in &mut self.services {
            for entry in &mut group.items {
                if entry.provenance.source.is_empty() {
                    entry.provenance = Provenance::foundation();
                }
            }
        }
    }

    /// Marks the footer as explicitly disabled.
    pub fn disable_footer(&mut self) {
        self.footer = FOOTER_DISABLED.to_string();
    }

    pub fn footer_disabled(&self) -> bool {
        self.footer == FOOTER_DISABLED
    }
}

/// Accepts `footer: false` as well as footer text.
fn deserialize_footer<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FooterValue {
        Flag(bool),
        Text(String),
    }

    Ok(match Option::<FooterValue>::deserialize(deserializer)? {
        Some(FooterValue::Flag(false)) => FOOTER_DISABLED.to_string(),
        Some(FooterValue::Text(text)) if text.eq_ignore_ascii_case("false") => {
            FOOTER_DISABLED.to_string()
        }
        Some(FooterValue::Text(text)) => text,
        Some(FooterValue::Flag(true)) | None => String::new(),
    })
}
