//! Builders for test configurations and resources.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use homer_aggregator::discovery::{CandidateBatch, CandidateSource, DiscoveryContext, ResourceFilter};
use homer_aggregator::gitops::resource::{
    HttpRouteResource, HttpRouteSpec, IngressResource, IngressRule, IngressSpec, IngressTls,
    ObjectMeta, Resource, ResourceKind,
};
use homer_aggregator::{
    ConfigStore, Configuration, Entry, Group, GroupingConfig, Reconciler, ValidationPolicy,
};

/// Fixed clock so provenance timestamps are comparable across runs.
pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

pub fn ctx() -> DiscoveryContext {
    DiscoveryContext::new(
        ValidationPolicy::Warn,
        fixed_time(),
        ResourceFilter::new(None, &[]),
    )
}

pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/manifests")
}

/// Foundation tree with two curated groups.
pub fn foundation() -> Configuration {
    Configuration::new("Home Lab")
        .with_group(
            Group::new("home").with_item(
                Entry::new("Router")
                    .with_param("url", "https://router.lan")
                    .with_param("icon", "fas fa-network-wired"),
            ),
        )
        .with_group(
            Group::new("Infrastructure")
                .with_item(Entry::new("Proxmox").with_param("url", "https://pve.lan:8006")),
        )
}

pub fn reconciler() -> Reconciler {
    Reconciler::new(
        Arc::new(ConfigStore::from_foundation(foundation())),
        GroupingConfig::default(),
    )
}

/// Builder for Ingress resources.
pub struct IngressBuilder {
    meta: ObjectMeta,
    spec: IngressSpec,
}

impl IngressBuilder {
    pub fn new(name: &str, namespace: &str) -> Self {
        Self {
            meta: ObjectMeta::new(name, namespace),
            spec: IngressSpec::default(),
        }
    }

    pub fn host(mut self, host: &str) -> Self {
        self.spec.rules.push(IngressRule {
            host: host.to_string(),
            http: None,
        });
        self
    }

    pub fn hosts(self, hosts: &[&str]) -> Self {
        hosts.iter().fold(self, |b, h| b.host(h))
    }

    pub fn tls(mut self, hosts: &[&str]) -> Self {
        self.spec.tls.push(IngressTls {
            hosts: hosts.iter().map(|h| h.to_string()).collect(),
            secret_name: None,
        });
        self
    }

    pub fn annotation(mut self, key: &str, value: &str) -> Self {
        self.meta = self.meta.with_annotation(key, value);
        self
    }

    pub fn label(mut self, key: &str, value: &str) -> Self {
        self.meta = self.meta.with_label(key, value);
        self
    }

    pub fn build(self) -> IngressResource {
        Resource::new(ResourceKind::Ingress, self.meta, self.spec)
    }

    /// Builds the resource and its candidate batch with [`ctx`].
    pub fn batch(self) -> CandidateBatch {
        self.build().build_candidates(&ctx())
    }
}

pub fn route(name: &str, namespace: &str, hostnames: &[&str]) -> HttpRouteResource {
    Resource::new(
        ResourceKind::HttpRoute,
        ObjectMeta::new(name, namespace),
        HttpRouteSpec {
            hostnames: hostnames.iter().map(|h| h.to_string()).collect(),
            parent_refs: Vec::new(),
        },
    )
}

/// Names of every entry in `group`, in tree order.
pub fn entry_names(config: &Configuration, group: &str) -> Vec<String> {
    config
        .group(group)
        .map(|g| g.items.iter().map(|e| e.name().to_string()).collect())
        .unwrap_or_default()
}
