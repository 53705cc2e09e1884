//! Reconciliation: collect → resolve → merge, then validate → render → publish.
//!
//! Each origin is reconciled as one unit under its origin lock: its previous
//! entries are garbage-collected and the fresh batch is merged back in. The
//! tree lock itself is only held per insert/delete call, so unrelated origins
//! interleave freely.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info_span;

use crate::config::repository::{write_atomic, TreeRepository};
use crate::config::schema::{Configuration, Origin};
use crate::config::store::ConfigStore;
use crate::discovery::{CandidateBatch, CandidateSource, DiscoveryContext, ResourceFilter};
use crate::engine::annotations::AnnotationIssue;
use crate::engine::gc::{self, GcReport};
use crate::engine::grouping::{
    self, GroupResolver, GroupingConfig, Resolution, ResolutionReason,
};
use crate::engine::merge::MergeOutcome;
use crate::engine::normalize::validate_and_normalize;
use crate::engine::serializer;
use crate::error::{AggregatorError, StoreError};

use super::loader::LoadedManifests;
use super::resource::DashboardSpec;

/// Where one candidate ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub group: String,
    pub entry: String,
    pub reason: ResolutionReason,
    pub outcome: MergeOutcome,
}

/// Result of reconciling one origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginReport {
    pub origin: Origin,
    pub collected: GcReport,
    pub placements: Vec<Placement>,
    pub issues: Vec<AnnotationIssue>,
}

/// Result of reconciling a set of origins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub origins: Vec<OriginReport>,
    /// Foundation groups that no longer hold foundation entries.
    pub missing_foundation_groups: Vec<String>,
}

/// A validated, normalized and serialized dashboard.
#[derive(Debug, Clone)]
pub struct RenderedDashboard {
    pub config: Configuration,
    pub document: serde_yaml::Value,
    pub yaml: String,
}

/// Drives the engine against a shared [`ConfigStore`].
pub struct Reconciler {
    store: Arc<ConfigStore>,
    resolver: GroupResolver,
}

impl Reconciler {
    pub fn new(store: Arc<ConfigStore>, grouping: GroupingConfig) -> Self {
        Self {
            store,
            resolver: GroupResolver::new(grouping),
        }
    }

    /// Creates a reconciler over a fresh store seeded from the dashboard's foundation.
    pub fn from_dashboard(spec: &DashboardSpec) -> Self {
        let store = Arc::new(ConfigStore::from_foundation(spec.homer_config.clone()));
        Self::new(store, spec.service_grouping.clone())
    }

    pub fn store(&self) -> &Arc<ConfigStore> {
        &self.store
    }

    /// Re-adds discovered entries from a previously persisted tree.
    ///
    /// Foundation content always comes from the current store; only entries
    /// with discovery provenance are carried over. Group settings of the
    /// previous tree are not: they return when their origin is reconciled.
    pub fn restore(&self, previous: &Configuration) -> Result<usize, StoreError> {
        let mut restored = 0;
        for (group, entry) in previous.entries() {
            if entry.provenance.is_discovered() {
                self.store.insert(group.name(), entry.clone(), None)?;
                restored += 1;
            }
        }
        log::debug!("Restored {} discovered entries from previous tree", restored);
        Ok(restored)
    }

    /// Replaces everything `batch.origin` owns with the batch's candidates.
    pub fn reconcile_origin(&self, batch: CandidateBatch) -> Result<OriginReport, StoreError> {
        let CandidateBatch {
            origin,
            candidates,
            issues,
        } = batch;

        let _span = info_span!("reconcile_origin", origin = %origin).entered();
        let origin_lock = self.store.origin_lock(&origin)?;
        let _guard = origin_lock.lock()?;

        let collected = {
            let _step = info_span!("collect").entered();
            self.store.delete_source(&origin)?
        };

        let mut placements = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let _step = info_span!("merge", entry = candidate.entry.name()).entered();

            let resolution = match candidate.group.as_deref().filter(|g| !g.is_empty()) {
                Some(group) => Resolution {
                    group: self
                        .store
                        .read(|tree| grouping::canonical_group_name(tree, group))?,
                    reason: ResolutionReason::Annotation,
                },
                None => self
                    .store
                    .read(|tree| self.resolver.resolve(tree, &candidate.context))?,
            };

            let entry_name = candidate.entry.name().to_string();
            let outcome = self.store.insert(
                &resolution.group,
                candidate.entry,
                candidate.group_template.as_ref(),
            )?;
            log::debug!(
                "{}: '{}' -> group '{}' ({:?}, {:?})",
                origin,
                entry_name,
                resolution.group,
                resolution.reason,
                outcome
            );

            placements.push(Placement {
                group: resolution.group,
                entry: entry_name,
                reason: resolution.reason,
                outcome,
            });
        }

        log::info!(
            "Reconciled {}: {} removed, {} placed, {} changed",
            origin,
            collected.removed.len(),
            placements.len(),
            placements.iter().filter(|p| p.outcome.changed()).count()
        );

        Ok(OriginReport {
            origin,
            collected,
            placements,
            issues,
        })
    }

    /// Reconciles every batch and checks that foundation groups survived.
    pub fn reconcile_batch(&self, batches: Vec<CandidateBatch>) -> Result<BatchReport, StoreError> {
        let _span = info_span!("reconcile_batch", origins = batches.len()).entered();
        let before = self.store.read(gc::foundation_groups)?;

        let mut origins = Vec::with_capacity(batches.len());
        for batch in batches {
            origins.push(self.reconcile_origin(batch)?);
        }

        let missing_foundation_groups = self
            .store
            .read(|tree| gc::check_foundation_consistency(&before, tree))?;

        Ok(BatchReport {
            origins,
            missing_foundation_groups,
        })
    }

    /// Removes the entries of an origin whose resource no longer exists.
    pub fn forget_origin(&self, origin: &Origin) -> Result<GcReport, StoreError> {
        let report = {
            let origin_lock = self.store.origin_lock(origin)?;
            let _guard = origin_lock.lock()?;
            self.store.delete_source(origin)?
        };
        self.store.release_origin(origin)?;
        if !report.is_empty() {
            log::info!("Forgot {}: {} entries removed", origin, report.removed.len());
        }
        Ok(report)
    }

    /// Forgets every discovered origin in the tree that is not in `live`.
    pub fn forget_absent(&self, live: &BTreeSet<Origin>) -> Result<Vec<GcReport>, StoreError> {
        let known: BTreeSet<Origin> = self.store.read(|tree| {
            tree.entries()
                .filter_map(|(_, entry)| entry.provenance.origin())
                .collect()
        })?;

        known
            .difference(live)
            .map(|origin| self.forget_origin(origin))
            .collect()
    }

    /// Validates and serializes the current tree. The stored tree is not modified.
    pub fn render(&self) -> Result<RenderedDashboard, AggregatorError> {
        let _span = info_span!("render").entered();
        let snapshot = self.store.snapshot()?;

        let config = {
            let _step = info_span!("validate").entered();
            validate_and_normalize(&snapshot)?
        };

        let document = serializer::to_document(&config);
        let yaml = serde_yaml::to_string(&document)?;

        Ok(RenderedDashboard {
            config,
            document,
            yaml,
        })
    }

    /// Renders, then persists the tree and writes the document.
    ///
    /// Nothing is written when validation fails, so the previously published
    /// document stays in place.
    pub fn publish(
        &self,
        repo: &dyn TreeRepository,
        output: Option<&Path>,
    ) -> Result<RenderedDashboard, AggregatorError> {
        let rendered = match self.render() {
            Ok(rendered) => rendered,
            Err(e) => {
                log::error!("Not publishing dashboard: {}", e);
                return Err(e);
            }
        };

        repo.persist(&self.store.snapshot()?)?;
        if let Some(path) = output {
            write_atomic(path, rendered.yaml.as_bytes())?;
            log::info!("Published dashboard to {}", path.display());
        }
        Ok(rendered)
    }
}

/// Builds one candidate batch per Ingress and HTTPRoute in `manifests`.
pub fn collect_batches(manifests: &LoadedManifests, now: DateTime<Utc>) -> Vec<CandidateBatch> {
    let spec = &manifests.dashboard.resource.spec;
    let ingress_ctx = DiscoveryContext::new(
        spec.validation_level,
        now,
        ResourceFilter::new(spec.ingress_selector.clone(), &spec.domain_filters),
    );
    let route_ctx = DiscoveryContext::new(
        spec.validation_level,
        now,
        ResourceFilter::new(spec.gateway_selector.clone(), &spec.domain_filters),
    );

    let ingresses = manifests
        .ingresses
        .iter()
        .map(|i| i.resource.build_candidates(&ingress_ctx));
    let routes = manifests
        .routes
        .iter()
        .map(|r| r.resource.build_candidates(&route_ctx));
    ingresses.chain(routes).collect()
}
