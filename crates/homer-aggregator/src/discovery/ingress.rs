//! Candidates from `networking.k8s.io/v1` Ingresses.

use std::collections::BTreeSet;

use crate::gitops::resource::{IngressResource, ObjectMeta, ResourceKind};

use super::{CandidateSource, HostTarget};

impl CandidateSource for IngressResource {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Ingress
    }

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    /// One target per distinct rule host. Hosts listed under `tls` use https;
    /// the first non-root path of the rule is appended.
    fn targets(&self) -> Vec<HostTarget> {
        let tls_hosts: BTreeSet<&str> = self
            .spec
            .tls
            .iter()
            .flat_map(|tls| tls.hosts.iter().map(String::as_str))
            .collect();

        let mut seen = BTreeSet::new();
        let mut targets = Vec::new();
        for rule in &self.spec.rules {
            let host = rule.host.trim();
            if host.is_empty() || !seen.insert(host.to_string()) {
                continue;
            }

            let scheme = if tls_hosts.contains(host) { "https" } else { "http" };
            let path = rule
                .http
                .as_ref()
                .and_then(|http| {
                    http.paths
                        .iter()
                        .map(|p| p.path.trim())
                        .find(|p| !p.is_empty() && *p != "/")
                })
                .unwrap_or("");

            targets.push(HostTarget {
                host: host.to_string(),
                url: format!("{}://{}{}", scheme, host, path),
            });
        }
        targets
    }
}
