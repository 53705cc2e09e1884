//! Declarative inputs and the reconciliation pipeline.
//!
//! This module provides:
//! - Kubernetes-style manifests (Dashboard, Ingress, HTTPRoute)
//! - A directory loader for multi-document YAML
//! - The reconciler driving the aggregation engine per origin

pub mod error;
pub mod loader;
pub mod reconciler;
pub mod resource;

pub use error::{GitOpsError, Result};
pub use loader::{LoadedManifests, ManifestLoader};
pub use reconciler::{
    collect_batches, BatchReport, OriginReport, Placement, Reconciler, RenderedDashboard,
};
pub use resource::{
    AnyResource, DashboardResource, DashboardSpec, HttpRouteResource, HttpRouteSpec,
    IngressResource, IngressSpec, LabelSelector, ObjectMeta, Resource, ResourceKind,
    ResourceWithPath, DASHBOARD_API_VERSION,
};
