//! Label selector and domain filters for discovered resources.

use std::collections::BTreeMap;

use crate::gitops::resource::LabelSelector;

/// Decides which resources and hosts take part in discovery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceFilter {
    selector: Option<LabelSelector>,
    domains: Vec<String>,
}

impl ResourceFilter {
    pub fn new(selector: Option<LabelSelector>, domains: &[String]) -> Self {
        let domains = domains
            .iter()
            .map(|d| d.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|d| !d.is_empty())
            .collect();
        Self { selector, domains }
    }

    /// Every `matchLabels` pair must be present. No selector matches everything.
    pub fn matches_labels(&self, labels: &BTreeMap<String, String>) -> bool {
        match &self.selector {
            Some(selector) => selector
                .match_labels
                .iter()
                .all(|(k, v)| labels.get(k) == Some(v)),
            None => true,
        }
    }

    /// True if `host` equals or is a subdomain of an allowed domain, or no
    /// domains are configured.
    pub fn allows_host(&self, host: &str) -> bool {
        if self.domains.is_empty() {
            return true;
        }
        let host = host.to_ascii_lowercase();
        self.domains.iter().any(|domain| {
            host == *domain
                || host
                    .strip_suffix(domain.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }
}
