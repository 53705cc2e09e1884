//! Removal of entries owned by a discovery origin.

use std::collections::BTreeSet;

use crate::config::schema::{Configuration, Origin};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GcReport {
    /// `(group, entry)` names that were removed.
    pub removed: Vec<(String, String)>,
    /// Groups left empty by this collection and pruned.
    pub pruned_groups: Vec<String>,
}

impl GcReport {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.pruned_groups.is_empty()
    }
}

/// Deletes every entry owned by `origin` and prunes groups it emptied.
///
/// Groups that were already empty are left alone. The foundation origin
/// is never collected.
pub fn collect_origin(config: &mut Configuration, origin: &Origin) -> GcReport {
    let mut report = GcReport::default();
    if origin.is_foundation() {
        return report;
    }

    let mut emptied = Vec::new();
    for (index, group) in config.services.iter_mut().enumerate() {
        let before = group.items.len();
        let group_name = group.name().to_string();
        group.items.retain(|entry| {
            let owned = entry.provenance.belongs_to(origin);
            if owned {
                report
                    .removed
                    .push((group_name.clone(), entry.name().to_string()));
            }
            !owned
        });
        if before > 0 && group.items.is_empty() {
            emptied.push(index);
        }
    }

    for index in emptied.into_iter().rev() {
        let group = config.services.remove(index);
        report.pruned_groups.push(group.name().to_string());
    }
    report.pruned_groups.reverse();

    report
}

/// Names of groups currently holding at least one foundation entry.
pub fn foundation_groups(config: &Configuration) -> BTreeSet<String> {
    config
        .services
        .iter()
        .filter(|g| g.has_foundation_entry())
        .map(|g| g.name().to_string())
        .collect()
}

/// Logs and returns foundation groups present in `before` but missing from `after`.
pub fn check_foundation_consistency(before: &BTreeSet<String>, after: &Configuration) -> Vec<String> {
    let current = foundation_groups(after);
    let missing: Vec<String> = before.difference(&current).cloned().collect();
    for group in &missing {
        log::warn!(
            "Foundation group '{}' no longer holds foundation entries after reconciliation",
            group
        );
    }
    missing
}
