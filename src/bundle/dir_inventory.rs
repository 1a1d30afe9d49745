use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use tokio::fs::read_dir;
use tracing::{debug, trace};
use zip::ZipArchive;

use crate::bundle::inventory::{BundleInventory, BundleView};

const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";

/// Treats every `*.jar` file in a directory as an installed bundle. Jars without a
///  `Bundle-SymbolicName` are plain libraries, not bundles, and are left out.
///
/// Listing reads only manifests and entry names; entry content is read on demand.
pub struct DirBundleInventory {
    root: PathBuf,
}

impl DirBundleInventory {
    pub fn new(root: impl Into<PathBuf>) -> DirBundleInventory {
        DirBundleInventory {
            root: root.into(),
        }
    }
}

#[async_trait]
impl BundleInventory for DirBundleInventory {
    async fn list_bundles(&self) -> anyhow::Result<Vec<Arc<dyn BundleView>>> {
        trace!("listing bundles in {}", self.root.display());

        let mut jar_paths = Vec::new();
        let mut files = read_dir(&self.root).await
            .with_context(|| format!("reading bundle directory {}", self.root.display()))?;
        while let Some(dir_entry) = files.next_entry().await? {
            let path = dir_entry.path();
            let is_jar = path.extension()
                .map(|ext| ext.eq_ignore_ascii_case("jar"))
                .unwrap_or(false);
            if is_jar && dir_entry.file_type().await?.is_file() {
                jar_paths.push(path);
            }
        }
        // read_dir order is platform dependent
        jar_paths.sort();

        tokio::task::spawn_blocking(move || {
            let mut bundles: Vec<Arc<dyn BundleView>> = Vec::new();
            for path in jar_paths {
                if let Some(bundle) = JarBundle::open(&path)? {
                    bundles.push(Arc::new(bundle));
                }
            }
            Ok::<_, anyhow::Error>(bundles)
        }).await?
    }
}

#[derive(Debug)]
pub struct JarBundle {
    path: PathBuf,
    symbolic_name: String,
    version: String,
    exports_packages: bool,
    is_fragment: bool,
    last_modified: SystemTime,
    entries: Vec<String>,
}

impl JarBundle {
    /// `Ok(None)` if the jar is not an OSGi bundle
    pub fn open(path: &Path) -> anyhow::Result<Option<JarBundle>> {
        let mut archive = open_archive(path)?;

        let mut entries = Vec::with_capacity(archive.len());
        for idx in 0..archive.len() {
            let entry = archive.by_index(idx)
                .with_context(|| format!("reading entry #{} of {}", idx, path.display()))?;
            entries.push(entry.name().to_string());
        }

        let manifest = match archive.by_name(MANIFEST_PATH) {
            Ok(mut entry) => {
                let mut raw = Vec::new();
                entry.read_to_end(&mut raw)
                    .with_context(|| format!("reading manifest of {}", path.display()))?;
                parse_manifest(&String::from_utf8_lossy(&raw))
            }
            Err(zip::result::ZipError::FileNotFound) => HashMap::new(),
            Err(e) => return Err(anyhow!(e).context(format!("reading manifest of {}", path.display()))),
        };

        let symbolic_name = match manifest.get("Bundle-SymbolicName") {
            Some(header) => strip_parameters(header),
            None => {
                debug!("{} has no Bundle-SymbolicName - not a bundle", path.display());
                return Ok(None);
            }
        };

        let last_modified = std::fs::metadata(path)
            .and_then(|m| m.modified())
            .with_context(|| format!("reading modification time of {}", path.display()))?;

        Ok(Some(JarBundle {
            path: path.to_path_buf(),
            symbolic_name,
            version: manifest.get("Bundle-Version")
                .map(|v| v.trim().to_string())
                .unwrap_or_else(|| "0.0.0".to_string()),
            exports_packages: manifest.contains_key("Export-Package"),
            is_fragment: manifest.contains_key("Fragment-Host"),
            last_modified,
            entries,
        }))
    }
}

impl BundleView for JarBundle {
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
        Ok(self.entries.clone())
    }

    fn read_entry(&self, path: &str) -> anyhow::Result<Vec<u8>> {
        let mut archive = open_archive(&self.path)?;
        let mut entry = archive.by_name(path.trim_start_matches('/'))
            .with_context(|| format!("looking up {} in {}", path, self.path.display()))?;

        let mut result = Vec::new();
        entry.read_to_end(&mut result)
            .with_context(|| format!("reading {} from {}", path, self.path.display()))?;
        Ok(result)
    }
}

fn open_archive(path: &Path) -> anyhow::Result<ZipArchive<BufReader<File>>> {
    let file = File::open(path)
        .with_context(|| format!("opening {}", path.display()))?;
    ZipArchive::new(BufReader::new(file))
        .with_context(|| format!("{} is not a valid jar", path.display()))
}

/// Main section headers of a jar manifest. Lines starting with a single space continue the
///  previous header's value.
fn parse_manifest(text: &str) -> HashMap<String, String> {
    let mut headers = HashMap::new();
    let mut current: Option<(String, String)> = None;

    for line in text.lines() {
        if line.is_empty() {
            // end of the main section
            break;
        }
        if let Some(continuation) = line.strip_prefix(' ') {
            if let Some((_, value)) = current.as_mut() {
                value.push_str(continuation);
            }
            continue;
        }

        if let Some((name, value)) = current.take() {
            headers.insert(name, value);
        }
        if let Some((name, value)) = line.split_once(':') {
            current = Some((name.trim().to_string(), value.trim_start().to_string()));
        }
    }
    if let Some((name, value)) = current {
        headers.insert(name, value);
    }
    headers
}

/// `com.example.bundle;singleton:=true` -> `com.example.bundle`
fn strip_parameters(header: &str) -> String {
    header.split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_string()
}
