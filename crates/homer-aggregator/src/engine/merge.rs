//! Integrates candidate entries into the tree.
//!
//! Precedence is decided by provenance flags only, so the result does not
//! depend on which origin arrives first.

use std::collections::BTreeMap;

use crate::config::schema::{
    ArrayObjects, Configuration, Entry, Group, NestedObjects, Origin, ParamMap,
};

/// Result of inserting one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The target group did not exist and was created with the entry.
    GroupCreated,
    /// The entry was appended to an existing group.
    Appended,
    /// The entry merged into a same-named entry.
    Merged { changed: bool },
}

impl MergeOutcome {
    pub fn changed(&self) -> bool {
        match self {
            MergeOutcome::GroupCreated | MergeOutcome::Appended => true,
            MergeOutcome::Merged { changed } => *changed,
        }
    }
}

/// Merges `candidate` into `existing` in place. Returns true if anything changed.
pub fn merge_entry(existing: &mut Entry, candidate: &Entry) -> bool {
    let crd_existing = existing.is_foundation();
    let discovered_new = candidate.provenance.is_discovered();
    let before = existing.clone();

    for (key, value) in &candidate.parameters {
        let current = existing.parameters.get(key).map(String::as_str).unwrap_or("");
        let overwrite = match key.as_str() {
            "name" => !crd_existing,
            "url" | "subtitle" => discovered_new || current.is_empty() || !crd_existing,
            _ => !(crd_existing && !current.is_empty()),
        };
        if overwrite {
            existing.parameters.insert(key.clone(), value.clone());
        }
    }

    merge_nested(&mut existing.nested_objects, &candidate.nested_objects);
    merge_arrays(&mut existing.array_objects, &candidate.array_objects);

    if discovered_new {
        existing.provenance.last_update = candidate.provenance.last_update.clone();
    }
    if !crd_existing {
        existing.provenance.source = candidate.provenance.source.clone();
        existing.provenance.origin_namespace = candidate.provenance.origin_namespace.clone();
    }

    *existing != before
}

fn merge_nested(existing: &mut NestedObjects, candidate: &NestedObjects) {
    for (object, properties) in candidate {
        existing
            .entry(object.clone())
            .or_default()
            .extend(properties.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
}

/// Index-wise merge; longer candidate lists extend the existing one.
fn merge_arrays(existing: &mut ArrayObjects, candidate: &ArrayObjects) {
    for (name, items) in candidate {
        let list = existing.entry(name.clone()).or_default();
        if list.len() < items.len() {
            list.resize_with(items.len(), ParamMap::new);
        }
        for (slot, item) in list.iter_mut().zip(items) {
            slot.extend(item.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
    }
}

/// Fills group parameters and nested objects the group does not already have.
pub fn apply_group_template(group: &mut Group, template: &Group) {
    for (key, value) in &template.parameters {
        if key == "name" || value.is_empty() {
            continue;
        }
        let slot = group.parameters.entry(key.clone()).or_default();
        if slot.is_empty() {
            *slot = value.clone();
        }
    }
    for (object, properties) in &template.nested_objects {
        let target = group.nested_objects.entry(object.clone()).or_default();
        for (key, value) in properties {
            target.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }
}

/// Group settings contributed by each origin, keyed by target group name.
pub type GroupTemplates = BTreeMap<Origin, BTreeMap<String, Group>>;

/// Applies every origin's group templates in origin order.
///
/// Parameters already on a group are kept, so foundation settings are never
/// overridden and the smallest origin wins between discovered templates.
pub fn apply_group_templates(config: &mut Configuration, templates: &GroupTemplates) {
    for per_group in templates.values() {
        for (name, template) in per_group {
            if let Some(group) = config.services.iter_mut().find(|g| g.name() == name) {
                apply_group_template(group, template);
            }
        }
    }
}

/// Inserts `candidate` into the group named exactly `group_name`.
///
/// The group is created if missing; the entry is looked up by exact name and
/// appended if missing.
pub fn merge_into(config: &mut Configuration, group_name: &str, candidate: Entry) -> MergeOutcome {
    let Some(group) = config.services.iter_mut().find(|g| g.name() == group_name) else {
        config
            .services
            .push(Group::new(group_name).with_item(candidate));
        return MergeOutcome::GroupCreated;
    };

    match group.entry_mut(candidate.name()) {
        Some(existing) => MergeOutcome::Merged {
            changed: merge_entry(existing, &candidate),
        },
        None => {
            group.items.push(candidate);
            MergeOutcome::Appended
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::Provenance;

    fn discovered(name: &str) -> Entry {
        Entry::new(name).with_provenance(Provenance::discovered(
            &Origin::new("ingress/web", "apps"),
            "2024-05-01T10:00:00Z",
        ))
    }

    fn foundation(name: &str) -> Entry {
        Entry::new(name).with_provenance(Provenance::foundation())
    }

    #[test]
    fn test_discovered_url_fills_foundation_slot() {
        let mut existing = foundation("A").with_param("url", "");
        let changed = merge_entry(&mut existing, &discovered("A").with_param("url", "http://x"));

        assert!(changed);
        assert_eq!(existing.param("url"), Some("http://x"));
        assert_eq!(existing.name(), "A");
        assert!(existing.is_foundation());
        assert_eq!(existing.provenance.last_update, "2024-05-01T10:00:00Z");
    }

    #[test]
    fn test_foundation_scalars_are_preserved() {
        let mut existing = foundation("A")
            .with_param("icon", "fas fa-home")
            .with_param("subtitle", "Curated");
        let candidate = discovered("A")
            .with_param("icon", "fas fa-globe")
            .with_param("tag", "new")
            .with_param("subtitle", "Discovered");
        merge_entry(&mut existing, &candidate);

        assert_eq!(existing.param("icon"), Some("fas fa-home"));
        assert_eq!(existing.param("tag"), Some("new"));
        assert_eq!(existing.param("subtitle"), Some("Discovered"));
    }

    #[test]
    fn test_non_discovered_candidate_keeps_foundation_url() {
        let mut existing = foundation("A").with_param("url", "https://curated");
        merge_entry(&mut existing, &Entry::new("A").with_param("url", "http://other"));
        assert_eq!(existing.param("url"), Some("https://curated"));
    }

    #[test]
    fn test_discovered_existing_is_overwritten() {
        let mut existing = Entry::new("A")
            .with_param("icon", "old")
            .with_provenance(Provenance::discovered(&Origin::new("httproute/a", "x"), "t0"));
        merge_entry(&mut existing, &discovered("A").with_param("icon", "new"));

        assert_eq!(existing.param("icon"), Some("new"));
        assert_eq!(existing.provenance.source, "ingress/web");
        assert_eq!(existing.provenance.origin_namespace, "apps");
    }

    #[test]
    fn test_nested_and_array_objects_merge_additively() {
        let mut existing = foundation("A");
        existing
            .nested_objects
            .entry("customHeaders".into())
            .or_default()
            .insert("A".into(), "1".into());
        existing.array_objects.insert(
            "quick".into(),
            vec![ParamMap::from([("name".into(), "Old".into())])],
        );

        let mut candidate = discovered("A");
        candidate
            .nested_objects
            .entry("customHeaders".into())
            .or_default()
            .insert("B".into(), "2".into());
        candidate.array_objects.insert(
            "quick".into(),
            vec![
                ParamMap::from([("url".into(), "https://q0".into())]),
                ParamMap::from([("name".into(), "Second".into())]),
            ],
        );
        merge_entry(&mut existing, &candidate);

        assert_eq!(existing.nested_objects["customHeaders"].len(), 2);
        let quick = &existing.array_objects["quick"];
        assert_eq!(quick.len(), 2);
        assert_eq!(quick[0]["name"], "Old");
        assert_eq!(quick[0]["url"], "https://q0");
        assert_eq!(quick[1]["name"], "Second");
    }

    #[test]
    fn test_merge_is_idempotent() {
        let candidate = discovered("A")
            .with_param("url", "http://a")
            .with_param("icon", "x");
        let mut config = Configuration::new("Home");

        merge_into(&mut config, "apps", candidate.clone());
        let once = config.clone();
        let outcome = merge_into(&mut config, "apps", candidate);

        assert_eq!(outcome, MergeOutcome::Merged { changed: false });
        assert!(!outcome.changed());
        assert!(MergeOutcome::Appended.changed());
        assert_eq!(config, once);
    }

    #[test]
    fn test_merge_into_creates_and_appends() {
        let mut config = Configuration::new("Home");
        assert_eq!(
            merge_into(&mut config, "apps", discovered("one")),
            MergeOutcome::GroupCreated
        );
        assert_eq!(
            merge_into(&mut config, "apps", discovered("two")),
            MergeOutcome::Appended
        );
        assert_eq!(config.services.len(), 1);
        assert_eq!(config.services[0].items.len(), 2);
    }

    #[test]
    fn test_group_names_differing_in_case_stay_apart() {
        let mut config = Configuration::new("Home");
        merge_into(&mut config, "Apps", discovered("one"));
        merge_into(&mut config, "apps", discovered("two"));

        let names: Vec<_> = config.services.iter().map(Group::name).collect();
        assert_eq!(names, ["Apps", "apps"]);
    }

    fn template(icon: &str, logo: Option<&str>) -> Group {
        let mut template = Group::new("ignored");
        template.parameters.insert("icon".into(), icon.into());
        if let Some(logo) = logo {
            template.parameters.insert("logo".into(), logo.into());
        }
        template
    }

    #[test]
    fn test_group_templates_never_override_foundation() {
        let mut config = Configuration::new("Home").with_group({
            let mut g = Group::new("Media");
            g.parameters.insert("icon".into(), "fas fa-film".into());
            g
        });
        let templates = GroupTemplates::from([(
            Origin::new("ingress/tv", "media"),
            BTreeMap::from([("Media".to_string(), template("fas fa-tv", Some("media.png")))]),
        )]);

        apply_group_templates(&mut config, &templates);

        let group = config.group("Media").unwrap();
        assert_eq!(group.name(), "Media");
        assert_eq!(group.parameters["icon"], "fas fa-film");
        assert_eq!(group.parameters["logo"], "media.png");
    }

    #[test]
    fn test_smallest_origin_wins_between_templates() {
        let mut config = Configuration::new("Home").with_group(Group::new("media"));
        let templates = GroupTemplates::from([
            (
                Origin::new("ingress/b", "media"),
                BTreeMap::from([("media".to_string(), template("fas fa-tv", Some("b.png")))]),
            ),
            (
                Origin::new("ingress/a", "media"),
                BTreeMap::from([("media".to_string(), template("fas fa-film", None))]),
            ),
        ]);

        apply_group_templates(&mut config, &templates);

        let group = config.group("media").unwrap();
        assert_eq!(group.parameters["icon"], "fas fa-film");
        assert_eq!(group.parameters["logo"], "b.png");
    }
}
