//! Manifest loader for a directory of multi-document YAML files.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use walkdir::WalkDir;

use super::error::{GitOpsError, Result};
use super::resource::{
    AnyResource, DashboardResource, HttpRouteResource, IngressResource, ResourceHeader,
    ResourceKind, ResourceWithPath,
};

/// Everything found in the manifest directory.
#[derive(Debug, Clone)]
pub struct LoadedManifests {
    /// The Dashboard resource (required, exactly one).
    pub dashboard: ResourceWithPath<DashboardResource>,
    /// Ingresses, sorted by namespace and name.
    pub ingresses: Vec<ResourceWithPath<IngressResource>>,
    /// HTTPRoutes, sorted by namespace and name.
    pub routes: Vec<ResourceWithPath<HttpRouteResource>>,
}

impl LoadedManifests {
    /// Returns all resources as a flat list.
    pub fn all_resources(&self) -> Vec<(ResourceKind, &str, &Path)> {
        let mut resources = vec![(
            ResourceKind::Dashboard,
            self.dashboard.resource.name(),
            self.dashboard.path.as_path(),
        )];
        for ingress in &self.ingresses {
            resources.push((
                ResourceKind::Ingress,
                ingress.resource.name(),
                ingress.path.as_path(),
            ));
        }
        for route in &self.routes {
            resources.push((
                ResourceKind::HttpRoute,
                route.resource.name(),
                route.path.as_path(),
            ));
        }
        resources
    }
}

/// Loads manifests from a directory tree.
pub struct ManifestLoader {
    manifest_dir: PathBuf,
}

impl ManifestLoader {
    pub fn new(manifest_dir: impl Into<PathBuf>) -> Self {
        Self {
            manifest_dir: manifest_dir.into(),
        }
    }

    pub fn manifest_dir(&self) -> &Path {
        &self.manifest_dir
    }

    /// Loads every supported resource under the manifest directory.
    pub fn load(&self) -> Result<LoadedManifests> {
        if !self.manifest_dir.exists() {
            return Err(GitOpsError::ManifestDirNotFound(self.manifest_dir.clone()));
        }

        let mut dashboard: Option<ResourceWithPath<DashboardResource>> = None;
        let mut ingresses = Vec::new();
        let mut routes = Vec::new();
        let mut seen: BTreeSet<(ResourceKind, String, String)> = BTreeSet::new();

        for entry in WalkDir::new(&self.manifest_dir)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let relative = path.strip_prefix(&self.manifest_dir).unwrap_or(path);
            let has_hidden_component = relative.components().any(|c| {
                c.as_os_str()
                    .to_str()
                    .map(|s| s.starts_with('.'))
                    .unwrap_or(false)
            });
            if has_hidden_component {
                continue;
            }

            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            if ext != "yaml" && ext != "yml" {
                continue;
            }

            for resource in self.load_file(path)? {
                let meta = resource.metadata();
                let key = (
                    resource.kind(),
                    meta.namespace.clone(),
                    meta.name.clone(),
                );
                if !seen.insert(key) {
                    return Err(GitOpsError::DuplicateName {
                        kind: resource.kind(),
                        namespace: meta.namespace.clone(),
                        name: meta.name.clone(),
                    });
                }

                match resource {
                    AnyResource::Dashboard(r) => {
                        if let Some(first) = &dashboard {
                            return Err(GitOpsError::MultipleDashboards {
                                first: first.resource.name().to_string(),
                                second: r.name().to_string(),
                            });
                        }
                        dashboard = Some(ResourceWithPath::new(r, relative));
                    }
                    AnyResource::Ingress(r) => ingresses.push(ResourceWithPath::new(r, relative)),
                    AnyResource::HttpRoute(r) => routes.push(ResourceWithPath::new(r, relative)),
                }
            }
        }

        let dashboard = dashboard.ok_or(GitOpsError::MissingDashboard)?;

        ingresses.sort_by(|a, b| sort_key(&a.resource).cmp(&sort_key(&b.resource)));
        routes.sort_by(|a, b| sort_key(&a.resource).cmp(&sort_key(&b.resource)));

        log::info!(
            "Loaded dashboard '{}' with {} ingresses and {} routes from {}",
            dashboard.resource.name(),
            ingresses.len(),
            routes.len(),
            self.manifest_dir.display()
        );

        Ok(LoadedManifests {
            dashboard,
            ingresses,
            routes,
        })
    }

    /// Loads every supported resource from one file.
    pub fn load_file(&self, path: &Path) -> Result<Vec<AnyResource>> {
        let content = fs::read_to_string(path).map_err(|e| GitOpsError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;

        self.parse_documents(&content, path)
    }

    /// Parses a multi-document YAML stream. Unknown kinds and empty documents are skipped.
    pub fn parse_documents(&self, content: &str, path: &Path) -> Result<Vec<AnyResource>> {
        let parse_err = |e: serde_yaml::Error| GitOpsError::ParseYaml {
            path: path.to_path_buf(),
            message: e.to_string(),
        };

        let mut resources = Vec::new();
        for document in serde_yaml::Deserializer::from_str(content) {
            let value = serde_yaml::Value::deserialize(document).map_err(parse_err)?;
            if value.is_null() {
                continue;
            }
            if let Some(resource) = self.parse_resource(value, path)? {
                resources.push(resource);
            }
        }
        Ok(resources)
    }

    /// Parses one document, returning `None` for kinds the aggregator does not handle.
    pub fn parse_resource(&self, value: serde_yaml::Value, path: &Path) -> Result<Option<AnyResource>> {
        let parse_err = |e: serde_yaml::Error| GitOpsError::ParseYaml {
            path: path.to_path_buf(),
            message: e.to_string(),
        };

        let header: ResourceHeader = serde_yaml::from_value(value.clone()).map_err(parse_err)?;

        let kind = match header.kind.parse::<ResourceKind>() {
            Ok(kind) => kind,
            Err(_) => {
                log::debug!(
                    "Skipping {} '{}' in {}",
                    if header.kind.is_empty() {
                        "document without kind"
                    } else {
                        header.kind.as_str()
                    },
                    header.metadata.name,
                    path.display()
                );
                return Ok(None);
            }
        };

        if !kind.api_versions().contains(&header.api_version.as_str()) {
            return Err(GitOpsError::InvalidApiVersion {
                path: path.to_path_buf(),
                kind,
                version: header.api_version,
                expected: kind.api_versions().iter().map(|v| v.to_string()).collect(),
            });
        }

        let resource = match kind {
            ResourceKind::Dashboard => AnyResource::Dashboard(from_value(value, path)?),
            ResourceKind::Ingress => AnyResource::Ingress(from_value(value, path)?),
            ResourceKind::HttpRoute => AnyResource::HttpRoute(from_value(value, path)?),
        };
        Ok(Some(resource))
    }
}

fn from_value<T: DeserializeOwned>(value: serde_yaml::Value, path: &Path) -> Result<T> {
    serde_yaml::from_value(value).map_err(|e| GitOpsError::ParseYaml {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn sort_key<T>(resource: &super::resource::Resource<T>) -> (String, String) {
    (
        resource.metadata.namespace.clone(),
        resource.metadata.name.clone(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const DASHBOARD: &str = r#"
apiVersion: homer.rajsingh.info/v1alpha1
kind: Dashboard
metadata:
  name: home
  namespace: homer
spec:
  homerConfig:
    title: Lab
"#;

    const INGRESSES: &str = r#"
apiVersion: networking.k8s.io/v1
kind: Ingress
metadata:
  name: web
  namespace: apps
spec:
  rules:
    - host: web.example.com
---
apiVersion: v1
kind: Service
metadata:
  name: web
---
apiVersion: networking.k8s.io/v1
kind: Ingress
metadata:
  name: api
  namespace: apps
spec:
  rules:
    - host: api.example.com
"#;

    fn setup_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("dashboard.yaml"), DASHBOARD).unwrap();
        fs::create_dir_all(dir.path().join("apps")).unwrap();
        fs::write(dir.path().join("apps/ingresses.yml"), INGRESSES).unwrap();
        dir
    }

    #[test]
    fn test_load_multi_document_files() {
        let dir = setup_dir();
        let loaded = ManifestLoader::new(dir.path()).load().unwrap();

        assert_eq!(loaded.dashboard.resource.name(), "home");
        assert_eq!(loaded.dashboard.path, PathBuf::from("dashboard.yaml"));
        let names: Vec<_> = loaded.ingresses.iter().map(|i| i.resource.name()).collect();
        assert_eq!(names, ["api", "web"]);
        assert!(loaded.routes.is_empty());
        assert_eq!(loaded.all_resources().len(), 3);
    }

    #[test]
    fn test_load_missing_dashboard() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("ingresses.yaml"), INGRESSES).unwrap();
        let result = ManifestLoader::new(dir.path()).load();
        assert!(matches!(result, Err(GitOpsError::MissingDashboard)));
    }

    #[test]
    fn test_load_multiple_dashboards() {
        let dir = setup_dir();
        fs::write(
            dir.path().join("other.yaml"),
            DASHBOARD.replace("name: home", "name: other"),
        )
        .unwrap();
        let result = ManifestLoader::new(dir.path()).load();
        assert!(matches!(result, Err(GitOpsError::MultipleDashboards { .. })));
    }

    #[test]
    fn test_load_nonexistent_directory() {
        let result = ManifestLoader::new("/nonexistent/manifests").load();
        assert!(matches!(result, Err(GitOpsError::ManifestDirNotFound(_))));
    }

    #[test]
    fn test_duplicate_resource_name() {
        let dir = setup_dir();
        fs::write(dir.path().join("copy.yaml"), INGRESSES).unwrap();
        let result = ManifestLoader::new(dir.path()).load();
        assert!(matches!(result, Err(GitOpsError::DuplicateName { .. })));
    }

    #[test]
    fn test_same_name_in_other_namespace_is_allowed() {
        let dir = setup_dir();
        fs::write(
            dir.path().join("staging.yaml"),
            INGRESSES.replace("namespace: apps", "namespace: staging"),
        )
        .unwrap();
        let loaded = ManifestLoader::new(dir.path()).load().unwrap();
        assert_eq!(loaded.ingresses.len(), 4);
    }

    #[test]
    fn test_invalid_api_version() {
        let dir = setup_dir();
        fs::write(
            dir.path().join("old.yaml"),
            INGRESSES.replace("networking.k8s.io/v1", "extensions/v1beta1"),
        )
        .unwrap();
        let result = ManifestLoader::new(dir.path()).load();
        assert!(matches!(result, Err(GitOpsError::InvalidApiVersion { .. })));
    }

    #[test]
    fn test_hidden_files_and_directories_are_skipped() {
        let dir = setup_dir();
        fs::write(dir.path().join(".pre-commit-config.yaml"), "repos: [").unwrap();
        fs::create_dir_all(dir.path().join(".github/workflows")).unwrap();
        fs::write(dir.path().join(".github/workflows/ci.yml"), DASHBOARD).unwrap();
        fs::write(dir.path().join("notes.txt"), "not yaml").unwrap();

        let loaded = ManifestLoader::new(dir.path()).load().unwrap();
        assert_eq!(loaded.dashboard.resource.name(), "home");
    }

    #[test]
    fn test_empty_documents_are_skipped() {
        let loader = ManifestLoader::new(".");
        let resources = loader
            .parse_documents(&format!("---\n{}\n---\n", DASHBOARD), Path::new("x.yaml"))
            .unwrap();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].kind(), ResourceKind::Dashboard);
    }
}
