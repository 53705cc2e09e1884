//! Candidates from Gateway API HTTPRoutes.

use std::collections::BTreeSet;

use crate::engine::annotations::ITEM_ANNOTATION_PREFIX;
use crate::gitops::resource::{HttpRouteResource, ObjectMeta, ResourceKind};

use super::{CandidateSource, HostTarget};

/// Plain-HTTP listener port.
const HTTP_PORT: u16 = 80;

impl CandidateSource for HttpRouteResource {
    fn kind(&self) -> ResourceKind {
        ResourceKind::HttpRoute
    }

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn reserved_item_keys(&self) -> &'static [&'static str] {
        &["scheme"]
    }

    /// One target per distinct hostname.
    fn targets(&self) -> Vec<HostTarget> {
        let scheme = route_scheme(self);
        let mut seen = BTreeSet::new();

        self.spec
            .hostnames
            .iter()
            .map(|h| h.trim())
            .filter(|h| !h.is_empty() && !h.starts_with('*'))
            .filter(|h| seen.insert(h.to_string()))
            .map(|host| HostTarget {
                host: host.to_string(),
                url: format!("{}://{}", scheme, host),
            })
            .collect()
    }
}

/// `https` unless the scheme annotation says otherwise or every parent
/// reference pins the plain-HTTP port.
fn route_scheme(route: &HttpRouteResource) -> &'static str {
    let annotation = format!("{}scheme", ITEM_ANNOTATION_PREFIX);
    match route
        .metadata
        .annotations
        .get(&annotation)
        .map(|s| s.trim().to_ascii_lowercase())
        .as_deref()
    {
        Some("http") => return "http",
        Some("https") => return "https",
        Some(other) => log::warn!(
            "HTTPRoute {}/{} has unsupported scheme '{}', using https",
            route.metadata.namespace,
            route.metadata.name,
            other
        ),
        None => {}
    }

    let refs = &route.spec.parent_refs;
    if !refs.is_empty() && refs.iter().all(|r| r.port == Some(HTTP_PORT)) {
        "http"
    } else {
        "https"
    }
}
