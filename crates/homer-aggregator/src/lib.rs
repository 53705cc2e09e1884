pub mod config;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod gitops;
pub mod telemetry;

pub use config::{ConfigStore, Configuration, Entry, Group, Origin, Provenance, TreeRepository};
pub use discovery::{CandidateBatch, CandidateSource, DiscoveryContext, ResourceFilter};
pub use engine::{Candidate, GroupingConfig, GroupingStrategy, OriginContext, ValidationPolicy};
pub use error::{AggregatorError, Result, StoreError, ValidationError};
pub use gitops::{GitOpsError, LoadedManifests, ManifestLoader, Reconciler, RenderedDashboard};
