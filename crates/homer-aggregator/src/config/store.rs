//! Shared, lock-guarded owner of one configuration tree.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::engine::gc::{self, GcReport};
use crate::engine::merge::{self, GroupTemplates, MergeOutcome};
use crate::error::StoreError;

use super::schema::{Configuration, Entry, Group, Origin};

/// Tree plus the group settings each origin contributed.
#[derive(Debug, Default)]
struct StoreState {
    tree: Configuration,
    templates: GroupTemplates,
}

/// Owns a [`Configuration`] and serializes every mutation of it.
///
/// The tree lock is held for one insert or delete call only, never across a
/// batch. Callers that need delete-then-recreate to be atomic per origin take
/// the origin lock from [`ConfigStore::origin_lock`] for the batch.
///
/// Group templates are kept per origin and only applied to snapshots, so
/// group settings do not depend on which origin arrived first and vanish
/// with the origin that contributed them.
pub struct ConfigStore {
    state: Mutex<StoreState>,
    origin_locks: Mutex<HashMap<Origin, Arc<Mutex<()>>>>,
}

impl ConfigStore {
    pub fn new(config: Configuration) -> Self {
        Self {
            state: Mutex::new(StoreState {
                tree: config,
                templates: GroupTemplates::new(),
            }),
            origin_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a store seeded from curated content, stamping foundation provenance.
    pub fn from_foundation(mut config: Configuration) -> Self {
        config.mark_foundation();
        Self::new(config)
    }

    /// Merge-inserts one entry into `group`.
    ///
    /// `template` is recorded for the entry's origin; entries without a
    /// discovered origin cannot contribute group settings.
    pub fn insert(
        &self,
        group: &str,
        entry: Entry,
        template: Option<&Group>,
    ) -> Result<MergeOutcome, StoreError> {
        let mut state = self.lock_state()?;
        if let (Some(template), Some(origin)) = (template, entry.provenance.origin()) {
            state
                .templates
                .entry(origin)
                .or_default()
                .insert(group.to_string(), template.clone());
        }
        Ok(merge::merge_into(&mut state.tree, group, entry))
    }

    /// Removes every entry and group template owned by `origin`.
    pub fn delete_source(&self, origin: &Origin) -> Result<GcReport, StoreError> {
        let mut state = self.lock_state()?;
        state.templates.remove(origin);
        Ok(gc::collect_origin(&mut state.tree, origin))
    }

    /// Runs `f` against the current tree under the lock. Group templates are
    /// not applied.
    pub fn read<R>(&self, f: impl FnOnce(&Configuration) -> R) -> Result<R, StoreError> {
        let state = self.lock_state()?;
        Ok(f(&state.tree))
    }

    /// Clones the current tree with group templates applied.
    pub fn snapshot(&self) -> Result<Configuration, StoreError> {
        let state = self.lock_state()?;
        let mut tree = state.tree.clone();
        merge::apply_group_templates(&mut tree, &state.templates);
        Ok(tree)
    }

    /// Returns the batch lock for one origin, creating it on first use.
    pub fn origin_lock(&self, origin: &Origin) -> Result<Arc<Mutex<()>>, StoreError> {
        let mut locks = self.origin_locks.lock()?;
        Ok(Arc::clone(locks.entry(origin.clone()).or_default()))
    }

    /// Drops the batch lock of an origin that no longer exists.
    pub fn release_origin(&self, origin: &Origin) -> Result<(), StoreError> {
        self.origin_locks.lock()?.remove(origin);
        Ok(())
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, StoreState>, StoreError> {
        self.state.lock().map_err(|_| StoreError::LockPoisoned)
    }
}
