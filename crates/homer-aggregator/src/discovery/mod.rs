//! Builds candidate entries from cluster network resources.
//!
//! Every resource kind turns into a list of `(host, url)` targets; the
//! shared code here applies item and service annotations and stamps
//! provenance so the engine can merge and collect the batch.

pub mod filter;
pub mod httproute;
pub mod ingress;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::config::schema::{Entry, Group, Origin, Provenance};
use crate::engine::annotations::{AnnotationIssue, AnnotationParser, ValidationPolicy};
use crate::engine::{Candidate, OriginContext};
use crate::gitops::resource::{ObjectMeta, ResourceKind};

pub use filter::ResourceFilter;

/// Per-call discovery settings.
#[derive(Debug, Clone)]
pub struct DiscoveryContext {
    pub policy: ValidationPolicy,
    /// RFC 3339 timestamp stamped as `lastUpdate`.
    pub now: String,
    pub filter: ResourceFilter,
}

impl DiscoveryContext {
    pub fn new(policy: ValidationPolicy, now: DateTime<Utc>, filter: ResourceFilter) -> Self {
        Self {
            policy,
            now: now.to_rfc3339_opts(SecondsFormat::Secs, true),
            filter,
        }
    }
}

/// One host exposed by a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostTarget {
    pub host: String,
    pub url: String,
}

/// Candidates produced by one origin resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateBatch {
    pub origin: Origin,
    pub candidates: Vec<Candidate>,
    pub issues: Vec<AnnotationIssue>,
}

/// A resource kind that yields candidate entries.
pub trait CandidateSource {
    fn kind(&self) -> ResourceKind;

    fn metadata(&self) -> &ObjectMeta;

    /// Hosts exposed by the resource, in declaration order, without duplicates.
    fn targets(&self) -> Vec<HostTarget>;

    /// Annotation keys consumed by the builder and not copied into entries.
    fn reserved_item_keys(&self) -> &'static [&'static str] {
        &[]
    }

    /// The `(<kind>/<name>, namespace)` identity owning this resource's entries.
    fn origin(&self) -> Origin {
        let meta = self.metadata();
        Origin::new(
            format!("{}/{}", self.kind().source_prefix(), meta.name),
            meta.namespace.clone(),
        )
    }

    /// Builds the candidate batch. Filtered-out resources yield an empty batch.
    fn build_candidates(&self, ctx: &DiscoveryContext) -> CandidateBatch {
        let origin = self.origin();
        let meta = self.metadata();
        let mut batch = CandidateBatch {
            origin: origin.clone(),
            candidates: Vec::new(),
            issues: Vec::new(),
        };

        if !ctx.filter.matches_labels(&meta.labels) {
            log::debug!("{} {} does not match the selector", self.kind(), origin);
            return batch;
        }

        let targets: Vec<HostTarget> = self
            .targets()
            .into_iter()
            .filter(|t| ctx.filter.allows_host(&t.host))
            .collect();
        if targets.is_empty() {
            return batch;
        }

        let item_parser = AnnotationParser::items(ctx.policy);
        let service_parser = AnnotationParser::services(ctx.policy);

        let mut template = Group::new("");
        batch
            .issues
            .extend(service_parser.parse_into(&meta.annotations, &mut template));
        template.parameters.remove("name");
        let template = (!template.parameters.is_empty() || !template.nested_objects.is_empty())
            .then_some(template);

        let context = OriginContext {
            namespace: meta.namespace.clone(),
            labels: meta.labels.clone(),
            annotations: meta.annotations.clone(),
        };

        let mut prototype = Entry::default();
        batch
            .issues
            .extend(item_parser.parse_into(&meta.annotations, &mut prototype));
        for key in self.reserved_item_keys() {
            prototype.parameters.remove(*key);
        }
        let base = prototype
            .param("name")
            .filter(|n| !n.is_empty())
            .unwrap_or(meta.name.as_str())
            .to_string();

        let single = targets.len() == 1;
        for target in targets {
            let mut entry = prototype.clone();
            let name = if single {
                base.clone()
            } else {
                format!("{}-{}", base, target.host)
            };
            entry.set_param("name", name);
            entry
                .parameters
                .entry("url".to_string())
                .or_insert(target.url);
            entry.provenance = Provenance::discovered(&origin, ctx.now.clone());

            let mut candidate = Candidate::new(entry, context.clone());
            if let Some(template) = &template {
                candidate = candidate.with_group_template(template.clone());
            }
            batch.candidates.push(candidate);
        }

        log::debug!(
            "{} {} produced {} candidate(s)",
            self.kind(),
            origin,
            batch.candidates.len()
        );
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::annotations::{ITEM_ANNOTATION_PREFIX, SERVICE_ANNOTATION_PREFIX};
    use chrono::TimeZone;

    struct Static {
        meta: ObjectMeta,
        hosts: Vec<&'static str>,
    }

    impl CandidateSource for Static {
        fn kind(&self) -> ResourceKind {
            ResourceKind::Ingress
        }

        fn metadata(&self) -> &ObjectMeta {
            &self.meta
        }

        fn targets(&self) -> Vec<HostTarget> {
            self.hosts
                .iter()
                .map(|h| HostTarget {
                    host: h.to_string(),
                    url: format!("http://{}", h),
                })
                .collect()
        }
    }

    fn ctx() -> DiscoveryContext {
        DiscoveryContext::new(
            ValidationPolicy::Warn,
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            ResourceFilter::default(),
        )
    }

    #[test]
    fn test_timestamp_format() {
        assert_eq!(ctx().now, "2024-05-01T12:00:00Z");
    }

    #[test]
    fn test_annotated_name_and_url_override() {
        let source = Static {
            meta: ObjectMeta::new("web", "apps")
                .with_annotation(format!("{}name", ITEM_ANNOTATION_PREFIX), "Website")
                .with_annotation(format!("{}url", ITEM_ANNOTATION_PREFIX), "https://web.example.com/home"),
            hosts: vec!["web.example.com"],
        };
        let batch = source.build_candidates(&ctx());
        let entry = &batch.candidates[0].entry;

        assert_eq!(batch.origin, Origin::new("ingress/web", "apps"));
        assert_eq!(entry.name(), "Website");
        assert_eq!(entry.param("url"), Some("https://web.example.com/home"));
        assert_eq!(entry.provenance.last_update, "2024-05-01T12:00:00Z");
    }

    #[test]
    fn test_service_annotations_become_group_template() {
        let source = Static {
            meta: ObjectMeta::new("web", "apps")
                .with_annotation(format!("{}name", SERVICE_ANNOTATION_PREFIX), "Media")
                .with_annotation(format!("{}icon", SERVICE_ANNOTATION_PREFIX), "fas fa-film"),
            hosts: vec!["a.example.com", "b.example.com"],
        };
        let batch = source.build_candidates(&ctx());

        assert_eq!(batch.candidates.len(), 2);
        let template = batch.candidates[0].group_template.as_ref().unwrap();
        assert_eq!(template.parameters.get("icon").unwrap(), "fas fa-film");
        assert!(!template.parameters.contains_key("name"));
    }

    #[test]
    fn test_filtered_resources_yield_empty_batch() {
        let source = Static {
            meta: ObjectMeta::new("web", "apps"),
            hosts: vec!["web.example.org"],
        };
        let mut context = ctx();
        context.filter = ResourceFilter::new(None, &["example.com".to_string()]);

        let batch = source.build_candidates(&context);
        assert!(batch.candidates.is_empty());
        assert_eq!(batch.origin, Origin::new("ingress/web", "apps"));
    }

    #[test]
    fn test_issues_reported_once_per_resource() {
        let source = Static {
            meta: ObjectMeta::new("web", "apps")
                .with_annotation(format!("{}target", ITEM_ANNOTATION_PREFIX), "_new"),
            hosts: vec!["a.example.com", "b.example.com"],
        };
        let mut context = ctx();
        context.policy = ValidationPolicy::Strict;

        let batch = source.build_candidates(&context);
        assert_eq!(batch.issues.len(), 1);
        assert!(batch.candidates.iter().all(|c| c.entry.param("target").is_none()));
    }
}
