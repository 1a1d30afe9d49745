use std::sync::{Arc, Mutex, PoisonError};
use std::time::SystemTime;

use anyhow::anyhow;
use async_trait::async_trait;

use crate::bundle::inventory::{BundleInventory, BundleView};

/// in-memory bundle, for fixtures and tests
#[derive(Debug, Clone)]
pub struct StaticBundle {
    symbolic_name: String,
    version: String,
    exports_packages: bool,
    is_fragment: bool,
    last_modified: SystemTime,
    /// `None` content simulates an entry that fails to read
    entries: Vec<(String, Option<Vec<u8>>)>,
}

impl StaticBundle {
    pub fn new(symbolic_name: &str, version: &str) -> StaticBundle {
        StaticBundle {
            symbolic_name: symbolic_name.to_string(),
            version: version.to_string(),
            exports_packages: true,
            is_fragment: false,
            last_modified: SystemTime::UNIX_EPOCH,
            entries: Vec::new(),
        }
    }

    pub fn without_exports(mut self) -> StaticBundle {
        self.exports_packages = false;
        self
    }

    pub fn fragment(mut self) -> StaticBundle {
        self.is_fragment = true;
        self
    }

    pub fn last_modified_at(mut self, last_modified: SystemTime) -> StaticBundle {
        self.last_modified = last_modified;
        self
    }

    pub fn with_entry(mut self, path: &str, content: impl Into<Vec<u8>>) -> StaticBundle {
        self.entries.push((path.to_string(), Some(content.into())));
        self
    }

    pub fn with_unreadable_entry(mut self, path: &str) -> StaticBundle {
        self.entries.push((path.to_string(), None));
        self
    }

    pub fn with_pom_properties(self, group_id: &str, artifact_id: &str, version: &str) -> StaticBundle {
        let path = format!("/META-INF/maven/{}/{}/pom.properties", group_id, artifact_id);
        let content = format!("#Generated by Maven\nversion={}\ngroupId={}\nartifactId={}\n", version, group_id, artifact_id);
        self.with_entry(&path, content)
    }
}

impl BundleView for StaticBundle {
    fn symbolic_name(&self) -> &str {
        &self.symbolic_name
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn exports_packages(&self) -> bool {
        self.exports_packages
    }

    fn is_fragment(&self) -> bool {
        self.is_fragment
    }

    fn last_modified(&self) -> SystemTime {
        self.last_modified
    }

    fn entries(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.entries.iter()
            .map(|(path, _)| path.clone())
            .collect())
    }

    fn read_entry(&self, path: &str) -> anyhow::Result<Vec<u8>> {
        match self.entries.iter().find(|(p, _)| p == path) {
            Some((_, Some(content))) => Ok(content.clone()),
            Some((_, None)) => Err(anyhow!("entry {} of bundle {} is not readable", path, self.symbolic_name)),
            None => Err(anyhow!("bundle {} has no entry {}", self.symbolic_name, path)),
        }
    }
}

/// in-memory inventory, neither optimized nor particularly robust - for testing purposes
#[derive(Default)]
pub struct StaticBundleInventory {
    bundles: Mutex<Vec<Arc<dyn BundleView>>>,
}

impl StaticBundleInventory {
    pub fn new(bundles: Vec<StaticBundle>) -> StaticBundleInventory {
        StaticBundleInventory {
            bundles: Mutex::new(bundles.into_iter()
                .map(|b| Arc::new(b) as Arc<dyn BundleView>)
                .collect()),
        }
    }

    pub fn install(&self, bundle: StaticBundle) {
        self.bundles.lock().unwrap_or_else(PoisonError::into_inner).push(Arc::new(bundle));
    }

    pub fn uninstall(&self, symbolic_name: &str) -> bool {
        let mut bundles = self.bundles.lock().unwrap_or_else(PoisonError::into_inner);
        let before = bundles.len();
        bundles.retain(|b| b.symbolic_name() != symbolic_name);
        bundles.len() != before
    }
}

#[async_trait]
impl BundleInventory for StaticBundleInventory {
    async fn list_bundles(&self) -> anyhow::Result<Vec<Arc<dyn BundleView>>> {
        Ok(self.bundles.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }
}
