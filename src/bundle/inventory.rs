use std::fmt::Debug;
use std::sync::Arc;
use std::time::SystemTime;

use anyhow::Context;
use async_trait::async_trait;

/// Read-only view of one installed bundle.
///
/// Implementations read entries lazily, so every method that touches content can fail and may
///  block; callers run them off the async executor.
pub trait BundleView: Debug + Send + Sync {
    fn symbolic_name(&self) -> &str;

    /// the raw `Bundle-Version`, possibly empty
    fn version(&self) -> &str;

    /// true if the manifest has an `Export-Package` header
    fn exports_packages(&self) -> bool;

    /// true if the manifest has a `Fragment-Host` header
    fn is_fragment(&self) -> bool;

    fn last_modified(&self) -> SystemTime;

    /// All entry paths below the bundle root, recursively. Directory entries end in '/'.
    fn entries(&self) -> anyhow::Result<Vec<String>>;

    fn read_entry(&self, path: &str) -> anyhow::Result<Vec<u8>>;

    /// Every `pom.properties` found below `META-INF/`, in entry order. Maven puts one at
    ///  `META-INF/maven/<groupId>/<artifactId>/pom.properties`; bundles that embed other
    ///  artifacts carry several.
    fn pom_properties(&self) -> anyhow::Result<Vec<PomProperties>> {
        let mut result = Vec::new();
        for path in self.entries()? {
            if is_pom_properties_path(&path) {
                let raw = self.read_entry(&path)
                    .with_context(|| format!("reading {} from bundle {}", path, self.symbolic_name()))?;
                result.push(PomProperties::parse(&String::from_utf8_lossy(&raw)));
            }
        }
        Ok(result)
    }
}

/// A snapshot source for the currently installed bundles. Each call returns a fresh snapshot;
///  bundles may come and go between calls.
#[async_trait]
pub trait BundleInventory: Send + Sync {
    async fn list_bundles(&self) -> anyhow::Result<Vec<Arc<dyn BundleView>>>;
}

fn is_pom_properties_path(path: &str) -> bool {
    let path = path.trim_start_matches('/');
    path.starts_with("META-INF/") && (path == "META-INF/pom.properties" || path.ends_with("/pom.properties"))
}

/// The coordinates Maven records in `pom.properties` when it builds a jar
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PomProperties {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}

impl PomProperties {
    /// Parses the subset of the `.properties` format that Maven writes: `key=value` or
    ///  `key: value` lines, `#` and `!` comments, and backslash line continuations. Missing keys
    ///  are left empty.
    pub fn parse(text: &str) -> PomProperties {
        let mut result = PomProperties::default();

        for (key, value) in properties_lines(text) {
            match key.as_str() {
                "groupId" => result.group_id = value,
                "artifactId" => result.artifact_id = value,
                "version" => result.version = value,
                _ => {}
            }
        }
        result
    }
}

fn properties_lines(text: &str) -> Vec<(String, String)> {
    let mut result = Vec::new();
    let mut pending = String::new();

    for line in text.lines() {
        let line = if pending.is_empty() { line.trim() } else { line.trim_start() };
        if pending.is_empty() && (line.is_empty() || line.starts_with('#') || line.starts_with('!')) {
            continue;
        }

        if let Some(continued) = line.strip_suffix('\\') {
            pending.push_str(continued);
            continue;
        }
        pending.push_str(line);

        let logical = std::mem::take(&mut pending);
        if let Some(pair) = split_property(&logical) {
            result.push(pair);
        }
    }
    if !pending.is_empty() {
        if let Some(pair) = split_property(&pending) {
            result.push(pair);
        }
    }
    result
}

fn split_property(line: &str) -> Option<(String, String)> {
    let separator = line.find(|c: char| c == '=' || c == ':' || c.is_whitespace())?;
    let key = line[..separator].trim();
    let rest = line[separator..].trim_start();
    let value = rest.strip_prefix(|c: char| c == '=' || c == ':')
        .unwrap_or(rest)
        .trim();
    if key.is_empty() {
        return None;
    }
    Some((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod test {
    use rstest::*;
    use super::*;

    #[test]
    fn test_parse_maven_generated() {
        let text = "#Generated by Maven\n#Mon Feb 15 10:00:00 CET 2016\nversion=1.2.3\ngroupId=org.example\nartifactId=example-core\n";
        assert_eq!(PomProperties::parse(text), PomProperties {
            group_id: "org.example".to_string(),
            artifact_id: "example-core".to_string(),
            version: "1.2.3".to_string(),
        });
    }

    #[test]
    fn test_parse_alternative_separators() {
        let text = "groupId : org.example\r\nartifactId example\nversion=\\\n  2.0\n";
        assert_eq!(PomProperties::parse(text), PomProperties {
            group_id: "org.example".to_string(),
            artifact_id: "example".to_string(),
            version: "2.0".to_string(),
        });
    }

    #[test]
    fn test_parse_missing_keys() {
        let parsed = PomProperties::parse("! only a comment\nartifactId=x");
        assert_eq!(parsed.group_id, "");
        assert_eq!(parsed.artifact_id, "x");
        assert_eq!(parsed.version, "");
    }

    #[rstest]
    #[case::maven_layout("META-INF/maven/g/a/pom.properties", true)]
    #[case::leading_slash("/META-INF/maven/g/a/pom.properties", true)]
    #[case::directly_below("META-INF/pom.properties", true)]
    #[case::outside_meta_inf("OSGI-INF/pom.properties", false)]
    #[case::other_file("META-INF/maven/g/a/pom.xml", false)]
    #[case::suffix_only("META-INF/maven/my-pom.properties", false)]
    fn test_is_pom_properties_path(#[case] path: &str, #[case] expected: bool) {
        assert_eq!(is_pom_properties_path(path), expected);
    }
}
