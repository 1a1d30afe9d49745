use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::warn;

lazy_static! {
    static ref MAPPING_REGEX: Regex = Regex::new(r"^([^=]+)=([^:]+):?([^:]+)?:?(.*)$").unwrap();
}

/// A configured override from a bundle's symbolic name to Maven coordinates.
///
/// `artifact_id` and `version` may be empty; the resolver then takes them from the bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactMapping {
    pub bundle_symbolic_name: String,
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}

impl ArtifactMapping {
    /// Parses `<bundleSymbolicName>=<groupId>[:<artifactId>[:<version>]]`
    pub fn parse(config_string: &str) -> Option<ArtifactMapping> {
        let captures = MAPPING_REGEX.captures(config_string)?;
        let group = |idx: usize| captures.get(idx)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();

        Some(ArtifactMapping {
            bundle_symbolic_name: group(1),
            group_id: group(2),
            artifact_id: group(3),
            version: group(4),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct MappingTable {
    mappings: HashMap<String, ArtifactMapping>,
}

impl MappingTable {
    /// Blank entries are skipped silently, unparsable ones with a warning. For duplicate symbolic
    ///  names, the last entry wins.
    pub fn parse<S: AsRef<str>>(config_strings: &[S]) -> MappingTable {
        let mut mappings = HashMap::new();

        for config_string in config_strings {
            let config_string = config_string.as_ref().trim();
            if config_string.is_empty() {
                continue;
            }

            match ArtifactMapping::parse(config_string) {
                Some(mapping) => {
                    mappings.insert(mapping.bundle_symbolic_name.clone(), mapping);
                }
                None => {
                    warn!("dependency bundle mapping does not match '<bundleSymbolicName>=<groupId>:<artifactId>:<version>': {:?}", config_string);
                }
            }
        }

        MappingTable { mappings }
    }

    pub fn get(&self, bundle_symbolic_name: &str) -> Option<&ArtifactMapping> {
        self.mappings.get(bundle_symbolic_name)
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

#[cfg(test)]
mod test {
    use rstest::*;
    use super::*;

    #[rstest]
    #[case::full("bundle.a=g:artifact-a:2.0", Some(("bundle.a", "g", "artifact-a", "2.0")))]
    #[case::group_only("bundle.a=com.example", Some(("bundle.a", "com.example", "", "")))]
    #[case::group_and_artifact("bundle.a=com.example:a", Some(("bundle.a", "com.example", "a", "")))]
    #[case::version_with_colon("bundle.a=g:a:1.0:extra", Some(("bundle.a", "g", "a", "1.0:extra")))]
    #[case::no_equals("bundle.a", None)]
    #[case::no_group("bundle.a=", None)]
    #[case::no_name("=g:a:1", None)]
    fn test_parse(#[case] input: &str, #[case] expected: Option<(&str, &str, &str, &str)>) {
        let actual = ArtifactMapping::parse(input);
        let expected = expected.map(|(n, g, a, v)| ArtifactMapping {
            bundle_symbolic_name: n.to_string(),
            group_id: g.to_string(),
            artifact_id: a.to_string(),
            version: v.to_string(),
        });
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_table_skips_invalid_and_blank() {
        let table = MappingTable::parse(&["", "  ", "broken", "bundle.a=g:a:1"]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("bundle.a").unwrap().group_id, "g");
        assert!(table.get("broken").is_none());
    }

    #[test]
    fn test_table_last_wins() {
        let table = MappingTable::parse(&["bundle.a=first", "bundle.a=second:x"]);
        assert_eq!(table.len(), 1);
        let mapping = table.get("bundle.a").unwrap();
        assert_eq!(mapping.group_id, "second");
        assert_eq!(mapping.artifact_id, "x");
    }
}
