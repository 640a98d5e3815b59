use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;

/// Loader files registered for a synthetic asset type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoaderPaths {
    pub browser: PathBuf,
    pub node: PathBuf,
}

impl LoaderPaths {
    pub fn same(path: PathBuf) -> Self {
        Self {
            browser: path.clone(),
            node: path,
        }
    }
}

/// The bundler side of a build: URL base, dependency graph and loader registry.
pub trait AssetHost {
    fn public_url(&self) -> &str;

    /// Records `relative_path` (from the asset's directory) as a URL dependency
    /// and returns the path fragment it will be served under.
    fn register_binary_dependency(&mut self, relative_path: &str) -> String;

    fn register_loader(&mut self, type_tag: &str, paths: LoaderPaths);
}

/// In-memory host used by the CLI; serializes to a JSON build manifest.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestHost {
    pub public_url: String,
    pub dependencies: Vec<String>,
    pub loaders: BTreeMap<String, LoaderPaths>,
}

impl ManifestHost {
    pub fn new(public_url: impl Into<String>) -> Self {
        Self {
            public_url: public_url.into(),
            ..Self::default()
        }
    }
}

impl AssetHost for ManifestHost {
    fn public_url(&self) -> &str {
        &self.public_url
    }

    fn register_binary_dependency(&mut self, relative_path: &str) -> String {
        if !self.dependencies.iter().any(|dep| dep == relative_path) {
            self.dependencies.push(relative_path.to_string());
        }
        relative_path.to_string()
    }

    fn register_loader(&mut self, type_tag: &str, paths: LoaderPaths) {
        self.loaders.insert(type_tag.to_string(), paths);
    }
}
