//! The aggregation engine: pure transformations over a [`Configuration`] tree.
//!
//! [`Configuration`]: crate::config::schema::Configuration

pub mod annotations;
pub mod gc;
pub mod grouping;
pub mod infer;
pub mod merge;
pub mod normalize;
pub mod serializer;

use std::collections::BTreeMap;

use crate::config::schema::{Entry, Group, Origin};

pub use annotations::{AnnotationIssue, AnnotationParser, ValidationPolicy};
pub use gc::GcReport;
pub use grouping::{GroupResolver, GroupingConfig, GroupingStrategy, Resolution};
pub use infer::TypedValue;
pub use merge::MergeOutcome;

/// Metadata of the resource a candidate was built from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OriginContext {
    pub namespace: String,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
}

/// One discovered entry ready to be merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Group chosen by the builder; `None` lets the resolver decide.
    pub group: Option<String>,
    pub entry: Entry,
    /// Group settings parsed from service annotations.
    pub group_template: Option<Group>,
    pub context: OriginContext,
}

impl Candidate {
    pub fn new(entry: Entry, context: OriginContext) -> Self {
        Self {
            group: None,
            entry,
            group_template: None,
            context,
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_group_template(mut self, template: Group) -> Self {
        self.group_template = Some(template);
        self
    }

    /// The origin owning this candidate, if it was discovered.
    pub fn origin(&self) -> Option<Origin> {
        self.entry.provenance.origin()
    }
}
