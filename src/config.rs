use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info};

use crate::maven::mapping::MappingTable;
use crate::maven::pom::PomDefaults;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing config file {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("{name} must be an absolute path like '/bin/maven/repository', was {value:?}")]
    InvalidRoute { name: &'static str, value: String },
}

/// The config file as written by the user. Every key is optional.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawConfig {
    pub listen: String,
    pub bundle_dir: PathBuf,
    pub repository_path: String,
    pub dependencies_path: String,
    /// `<bundleSymbolicName>=<groupId>:<artifactId>:<version>`, artifact id and version optional
    pub dependency_bundle_mapping: Vec<String>,
    /// regular expressions, matched against the full symbolic name
    pub ignore_bundles: Vec<String>,
    pub dependency_output_prefix: String,
    pub default_group_id: String,
    pub default_artifact_id: String,
    pub default_version: String,
    pub scope_provided: bool,
}

impl Default for RawConfig {
    fn default() -> Self {
        let pom_defaults = PomDefaults::default();
        RawConfig {
            listen: "127.0.0.1:4502".to_string(),
            bundle_dir: PathBuf::from("bundles"),
            repository_path: "/bin/maven/repository".to_string(),
            dependencies_path: "/bin/maven/dependencies".to_string(),
            dependency_bundle_mapping: vec![],
            ignore_bundles: vec![],
            dependency_output_prefix: " ".repeat(12),
            default_group_id: pom_defaults.group_id,
            default_artifact_id: pom_defaults.artifact_id,
            default_version: pom_defaults.version,
            scope_provided: true,
        }
    }
}

impl RawConfig {
    pub fn load(path: &Path) -> Result<RawConfig, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        toml::from_str(&text)
            .map_err(|source| ConfigError::Toml { path: path.to_path_buf(), source })
    }

    /// route paths without trailing '/', checked to be absolute
    pub fn routes(&self) -> Result<(String, String), ConfigError> {
        Ok((
            normalize_route("repository_path", &self.repository_path)?,
            normalize_route("dependencies_path", &self.dependencies_path)?,
        ))
    }
}

fn normalize_route(name: &'static str, value: &str) -> Result<String, ConfigError> {
    let trimmed = value.trim().trim_end_matches('/');
    if !trimmed.starts_with('/') || trimmed.contains('*') || trimmed.contains(':') {
        return Err(ConfigError::InvalidRoute { name, value: value.to_string() });
    }
    Ok(trimmed.to_string())
}

/// The part of the configuration that request handling reads. It is immutable once built; a
///  reload builds a new one.
#[derive(Debug, Clone)]
pub struct RepoConfig {
    pub mappings: MappingTable,
    pub ignore_patterns: Vec<Regex>,
    pub dependency_output_prefix: String,
    pub pom_defaults: PomDefaults,
    pub scope_provided: bool,
}

impl RepoConfig {
    /// Invalid mappings and ignore patterns are logged and left out; they never fail the
    ///  configuration as a whole.
    pub fn from_raw(raw: &RawConfig) -> RepoConfig {
        RepoConfig {
            mappings: MappingTable::parse(&raw.dependency_bundle_mapping),
            ignore_patterns: compile_ignore_patterns(&raw.ignore_bundles),
            dependency_output_prefix: raw.dependency_output_prefix.clone(),
            pom_defaults: PomDefaults {
                group_id: raw.default_group_id.clone(),
                artifact_id: raw.default_artifact_id.clone(),
                version: raw.default_version.clone(),
            },
            scope_provided: raw.scope_provided,
        }
    }
}

impl Default for RepoConfig {
    fn default() -> Self {
        RepoConfig::from_raw(&RawConfig::default())
    }
}

fn compile_ignore_patterns(patterns: &[String]) -> Vec<Regex> {
    patterns.iter()
        .filter(|p| !p.trim().is_empty())
        .filter_map(|p| match Regex::new(&format!("^(?:{})$", p)) {
            Ok(regex) => Some(regex),
            Err(e) => {
                error!("ignoring invalid bundle ignore pattern {:?}: {}", p, e);
                None
            }
        })
        .collect()
}

/// Process-wide holder of the current [`RepoConfig`].
///
/// Readers take a snapshot with [`ConfigHandle::current`] and keep it for the whole request, so
///  a concurrent reload never shows them a mix of old and new values.
pub struct ConfigHandle {
    source: Option<PathBuf>,
    current: RwLock<Arc<RepoConfig>>,
}

impl ConfigHandle {
    pub fn new(config: RepoConfig, source: Option<PathBuf>) -> ConfigHandle {
        ConfigHandle {
            source,
            current: RwLock::new(Arc::new(config)),
        }
    }

    pub fn current(&self) -> Arc<RepoConfig> {
        self.current.read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn replace(&self, config: RepoConfig) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(config);
    }

    /// Re-reads the config file. On failure the current configuration stays in place.
    ///
    /// Listen address, bundle directory and routes are bound at start-up and are not affected.
    pub fn reload(&self) -> Result<(), ConfigError> {
        let path = match &self.source {
            Some(path) => path,
            None => {
                info!("no config file given - nothing to reload");
                return Ok(());
            }
        };

        let raw = RawConfig::load(path)?;
        let config = RepoConfig::from_raw(&raw);
        info!(
            "reloaded {}: {} bundle mappings, {} ignore patterns",
            path.display(),
            config.mappings.len(),
            config.ignore_patterns.len(),
        );
        self.replace(config);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use rstest::*;
    use super::*;

    #[test]
    fn test_defaults() {
        let raw: RawConfig = toml::from_str("").unwrap();
        assert_eq!(raw, RawConfig::default());
        assert!(raw.scope_provided);
        assert_eq!(raw.dependency_output_prefix, "            ");

        let config = RepoConfig::from_raw(&raw);
        assert!(config.mappings.is_empty());
        assert!(config.ignore_patterns.is_empty());
        assert_eq!(config.pom_defaults, PomDefaults::default());
    }

    #[test]
    fn test_parse_full() {
        let raw: RawConfig = toml::from_str(r#"
            listen = "0.0.0.0:8080"
            bundle_dir = "/opt/felix/bundles"
            repository_path = "/repo/"
            dependency_bundle_mapping = ["bundle.a=g:a:1.0", "broken", ""]
            ignore_bundles = ['com\.acme\..*', "(unclosed", ""]
            dependency_output_prefix = ""
            default_group_id = "org.mine"
            scope_provided = false
        "#).unwrap();

        assert_eq!(raw.listen, "0.0.0.0:8080");
        assert_eq!(raw.routes().unwrap(), ("/repo".to_string(), "/bin/maven/dependencies".to_string()));

        let config = RepoConfig::from_raw(&raw);
        assert_eq!(config.mappings.len(), 1);
        assert_eq!(config.ignore_patterns.len(), 1);
        assert!(config.ignore_patterns[0].is_match("com.acme.core"));
        assert!(!config.ignore_patterns[0].is_match("org.com.acme.core"));
        assert_eq!(config.pom_defaults.group_id, "org.mine");
        assert_eq!(config.pom_defaults.artifact_id, "base-pom");
        assert!(!config.scope_provided);
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(toml::from_str::<RawConfig>("scope_provide = true").is_err());
    }

    #[rstest]
    #[case::relative("bin/maven")]
    #[case::wildcard("/bin/*rest")]
    #[case::capture("/bin/:name")]
    #[case::root_only("/")]
    fn test_invalid_routes(#[case] route: &str) {
        let raw = RawConfig { repository_path: route.to_string(), ..RawConfig::default() };
        assert!(raw.routes().is_err());
    }

    #[test]
    fn test_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle-vault.toml");
        std::fs::write(&path, "dependency_bundle_mapping = [\"a=g\"]").unwrap();

        let handle = ConfigHandle::new(RepoConfig::from_raw(&RawConfig::load(&path).unwrap()), Some(path.clone()));
        let before = handle.current();
        assert_eq!(before.mappings.len(), 1);

        std::fs::write(&path, "dependency_bundle_mapping = [\"a=g\", \"b=g\"]").unwrap();
        handle.reload().unwrap();
        assert_eq!(handle.current().mappings.len(), 2);
        // snapshots taken before the reload are unaffected
        assert_eq!(before.mappings.len(), 1);

        std::fs::write(&path, "dependency_bundle_mapping = 17").unwrap();
        assert!(handle.reload().is_err());
        assert_eq!(handle.current().mappings.len(), 2);
    }
}
