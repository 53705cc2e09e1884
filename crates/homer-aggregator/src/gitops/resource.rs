//! K8s-style manifests the aggregator reads.
//!
//! Only the fields the aggregator uses are modelled; everything else in a
//! manifest is ignored on deserialization.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::schema::Configuration;
use crate::engine::annotations::ValidationPolicy;
use crate::engine::grouping::GroupingConfig;

/// API version of the `Dashboard` resource.
pub const DASHBOARD_API_VERSION: &str = "homer.rajsingh.info/v1alpha1";

/// The kind of resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    Dashboard,
    Ingress,
    #[serde(rename = "HTTPRoute")]
    HttpRoute,
}

impl ResourceKind {
    /// API versions accepted for this kind.
    pub fn api_versions(&self) -> &'static [&'static str] {
        match self {
            ResourceKind::Dashboard => &[DASHBOARD_API_VERSION],
            ResourceKind::Ingress => &["networking.k8s.io/v1"],
            ResourceKind::HttpRoute => &[
                "gateway.networking.k8s.io/v1",
                "gateway.networking.k8s.io/v1beta1",
            ],
        }
    }

    /// Lowercase token used in entry sources (`<kind>/<name>`).
    pub fn source_prefix(&self) -> &'static str {
        match self {
            ResourceKind::Dashboard => "dashboard",
            ResourceKind::Ingress => "ingress",
            ResourceKind::HttpRoute => "httproute",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::Dashboard => write!(f, "Dashboard"),
            ResourceKind::Ingress => write!(f, "Ingress"),
            ResourceKind::HttpRoute => write!(f, "HTTPRoute"),
        }
    }
}

impl std::str::FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dashboard" => Ok(ResourceKind::Dashboard),
            "ingress" => Ok(ResourceKind::Ingress),
            "httproute" => Ok(ResourceKind::HttpRoute),
            _ => Err(format!("Unknown resource kind: {}", s)),
        }
    }
}

/// Metadata for a resource, following K8s conventions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl ObjectMeta {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }
}

/// A generic K8s-style resource wrapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource<T> {
    pub api_version: String,
    pub kind: ResourceKind,
    pub metadata: ObjectMeta,
    pub spec: T,
}

impl<T> Resource<T> {
    /// Creates a resource with the kind's preferred API version.
    pub fn new(kind: ResourceKind, metadata: ObjectMeta, spec: T) -> Self {
        Self {
            api_version: kind.api_versions()[0].to_string(),
            kind,
            metadata,
            spec,
        }
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn namespace(&self) -> &str {
        &self.metadata.namespace
    }
}

// ============================================================================
// Dashboard Resource
// ============================================================================

/// `matchLabels` selector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelector {
    #[serde(default)]
    pub match_labels: BTreeMap<String, String>,
}

/// The foundation configuration plus aggregation settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSpec {
    #[serde(default)]
    pub homer_config: Configuration,

    #[serde(default)]
    pub service_grouping: GroupingConfig,

    #[serde(default)]
    pub validation_level: ValidationPolicy,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingress_selector: Option<LabelSelector>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_selector: Option<LabelSelector>,

    /// Host suffixes allowed for discovered entries; empty allows all.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub domain_filters: Vec<String>,
}

pub type DashboardResource = Resource<DashboardSpec>;

// ============================================================================
// Ingress Resource
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngressSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingress_class_name: Option<String>,

    #[serde(default)]
    pub rules: Vec<IngressRule>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tls: Vec<IngressTls>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressRule {
    #[serde(default)]
    pub host: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<HttpIngressRuleValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpIngressRuleValue {
    #[serde(default)]
    pub paths: Vec<HttpIngressPath>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpIngressPath {
    #[serde(default)]
    pub path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngressTls {
    #[serde(default)]
    pub hosts: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_name: Option<String>,
}

pub type IngressResource = Resource<IngressSpec>;

// ============================================================================
// HTTPRoute Resource
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpRouteSpec {
    #[serde(default)]
    pub hostnames: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parent_refs: Vec<ParentReference>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentReference {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

pub type HttpRouteResource = Resource<HttpRouteSpec>;

// ============================================================================
// Any Resource (for generic handling)
// ============================================================================

/// A resource that can be any of the supported types.
#[derive(Debug, Clone, PartialEq)]
#[allow(clippy::large_enum_variant)]
pub enum AnyResource {
    Dashboard(DashboardResource),
    Ingress(IngressResource),
    HttpRoute(HttpRouteResource),
}

impl AnyResource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            AnyResource::Dashboard(_) => ResourceKind::Dashboard,
            AnyResource::Ingress(_) => ResourceKind::Ingress,
            AnyResource::HttpRoute(_) => ResourceKind::HttpRoute,
        }
    }

    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            AnyResource::Dashboard(r) => &r.metadata,
            AnyResource::Ingress(r) => &r.metadata,
            AnyResource::HttpRoute(r) => &r.metadata,
        }
    }

    pub fn name(&self) -> &str {
        &self.metadata().name
    }
}

/// Intermediate struct for reading `apiVersion`/`kind` before the full parse.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceHeader {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
}

/// A resource along with its file path.
#[derive(Debug, Clone)]
pub struct ResourceWithPath<T> {
    pub resource: T,
    /// The file path relative to the manifest directory.
    pub path: std::path::PathBuf,
}

impl<T> ResourceWithPath<T> {
    pub fn new(resource: T, path: impl Into<std::path::PathBuf>) -> Self {
        Self {
            resource,
            path: path.into(),
        }
    }
}
