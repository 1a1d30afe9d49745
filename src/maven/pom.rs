use std::fmt::Write;

use crate::maven::coordinates::ArtifactCoordinate;

const PARENT_POM_TEMPLATE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:schemaLocation="http://maven.apache.org/POM/4.0.0 http://maven.apache.org/xsd/maven-4.0.0.xsd">
    <modelVersion>4.0.0</modelVersion>
    <groupId>${groupId}</groupId>
    <artifactId>${artifactId}</artifactId>
    <version>${version}</version>
    <packaging>pom</packaging>
    <dependencyManagement>
        <dependencies/>
    </dependencyManagement>
</project>
"#;

const DEPENDENCIES_PLACEHOLDER: &str = "<dependencies/>";

/// Coordinates for the generated parent POM when the request leaves them out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PomDefaults {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}

impl Default for PomDefaults {
    fn default() -> Self {
        PomDefaults {
            group_id: "com.adobe.aem".to_string(),
            artifact_id: "base-pom".to_string(),
            version: "1.0".to_string(),
        }
    }
}

/// Renders the `<dependency>` elements for all coordinates, in iteration order. Every
///  coordinate with a comment gets a comment line first, so placeholders show up only as
///  comments.
pub fn render_dependency_fragment<'a>(
    coordinates: impl IntoIterator<Item = &'a ArtifactCoordinate>,
    scope_provided: bool,
    prefix: &str,
) -> String {
    let mut result = String::new();
    for coordinate in coordinates {
        write_dependency(&mut result, coordinate, scope_provided, prefix);
    }
    result
}

fn write_dependency(out: &mut String, coordinate: &ArtifactCoordinate, scope_provided: bool, prefix: &str) {
    // writing to a String cannot fail
    if !coordinate.comment().is_empty() {
        let _ = writeln!(out, "{}<!-- {} -->", prefix, coordinate.comment());
    }
    if coordinate.is_dependency() {
        let _ = writeln!(out, "{}<dependency>", prefix);
        let _ = writeln!(out, "{}\t<groupId>{}</groupId>", prefix, coordinate.group_id());
        let _ = writeln!(out, "{}\t<artifactId>{}</artifactId>", prefix, coordinate.artifact_id());
        if !coordinate.version().is_empty() {
            let _ = writeln!(out, "{}\t<version>{}</version>", prefix, coordinate.version());
        }
        if scope_provided {
            let _ = writeln!(out, "{}\t<scope>provided</scope>", prefix);
        }
        let _ = writeln!(out, "{}</dependency>", prefix);
    }
}

/// A parent POM that manages all given dependencies. Empty coordinates fall back to `defaults`.
pub fn render_parent_pom<'a>(
    group_id: &str,
    artifact_id: &str,
    version: &str,
    defaults: &PomDefaults,
    coordinates: impl IntoIterator<Item = &'a ArtifactCoordinate>,
    scope_provided: bool,
    prefix: &str,
) -> String {
    let fragment = render_dependency_fragment(coordinates, scope_provided, prefix);
    let values = [
        ("groupId", or_default(group_id, &defaults.group_id)),
        ("artifactId", or_default(artifact_id, &defaults.artifact_id)),
        ("version", or_default(version, &defaults.version)),
    ];

    let (head, tail) = PARENT_POM_TEMPLATE.split_once(DEPENDENCIES_PLACEHOLDER)
        .unwrap_or((PARENT_POM_TEMPLATE, ""));

    let mut result = substitute(head, &values);
    let _ = write!(result, "<dependencies>\n{}        </dependencies>", fragment);
    result.push_str(&substitute(tail, &values));
    result
}

/// Replaces `${name}` placeholders in a single pass. Substituted values are never scanned
///  again, and unknown placeholders stay as they are.
fn substitute(template: &str, values: &[(&str, &str)]) -> String {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("${") {
        let (before, placeholder) = rest.split_at(start);
        result.push_str(before);

        let known = placeholder.find('}').and_then(|end| {
            let name = &placeholder[2..end];
            values.iter()
                .find(|(n, _)| *n == name)
                .map(|(_, value)| (*value, end))
        });
        match known {
            Some((value, end)) => {
                result.push_str(value);
                rest = &placeholder[end + 1..];
            }
            None => {
                result.push_str("${");
                rest = &placeholder[2..];
            }
        }
    }
    result.push_str(rest);
    result
}

fn or_default<'b>(value: &'b str, default: &'b str) -> &'b str {
    if value.is_empty() { default } else { value }
}

/// The POM served for a single artifact from the repository: coordinates only, no dependencies
pub fn render_artifact_pom(coordinate: &ArtifactCoordinate) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <project>\n\
         \t<modelVersion>4.0.0</modelVersion>\n\
         \t<groupId>{}</groupId>\n\
         \t<artifactId>{}</artifactId>\n\
         \t<version>{}</version>\n\
         \t<dependencies/>\n\
         </project>\n",
        coordinate.group_id(),
        coordinate.artifact_id(),
        coordinate.version(),
    )
}

#[cfg(test)]
mod test {
    use super::*;

    fn coordinate(g: &str, a: &str, v: &str, comment: &str) -> ArtifactCoordinate {
        ArtifactCoordinate::new(g, a, v, comment, None).unwrap()
    }

    #[test]
    fn test_fragment_without_version_with_scope() {
        let c = coordinate("com.x", "y", "", "");
        let fragment = render_dependency_fragment([&c], true, "");
        assert_eq!(fragment, "<dependency>\n\t<groupId>com.x</groupId>\n\t<artifactId>y</artifactId>\n\t<scope>provided</scope>\n</dependency>\n");
        assert!(!fragment.contains("<version>"));
    }

    #[test]
    fn test_fragment_with_comment_and_prefix() {
        let c = coordinate("g", "a", "1.0", "bundle.a");
        let fragment = render_dependency_fragment([&c], false, "  ");
        assert_eq!(fragment, "  <!-- bundle.a -->\n  <dependency>\n  \t<groupId>g</groupId>\n  \t<artifactId>a</artifactId>\n  \t<version>1.0</version>\n  </dependency>\n");
    }

    #[test]
    fn test_placeholder_renders_as_comment_only() {
        let c = ArtifactCoordinate::placeholder("bundle.f [skipped because it's a fragment]").unwrap();
        let fragment = render_dependency_fragment([&c], true, "    ");
        assert_eq!(fragment, "    <!-- bundle.f [skipped because it's a fragment] -->\n");
    }

    #[test]
    fn test_partial_coordinate_renders_no_dependency() {
        let c = coordinate("", "a", "1.0", "bundle.a");
        let fragment = render_dependency_fragment([&c], true, "");
        assert_eq!(fragment, "<!-- bundle.a -->\n");
    }

    #[test]
    fn test_parent_pom_defaults() {
        let c = coordinate("g", "a", "1.0", "bundle.a");
        let pom = render_parent_pom("", "my-parent", "", &PomDefaults::default(), [&c], true, "            ");

        assert!(pom.contains("<groupId>com.adobe.aem</groupId>"));
        assert!(pom.contains("<artifactId>my-parent</artifactId>"));
        assert!(pom.contains("    <version>1.0</version>\n"));
        assert!(pom.contains("        <dependencies>\n            <!-- bundle.a -->\n            <dependency>\n"));
        assert!(pom.contains("            </dependency>\n        </dependencies>\n    </dependencyManagement>"));
        assert!(!pom.contains("${"));
        assert!(!pom.contains(DEPENDENCIES_PLACEHOLDER));
    }

    #[test]
    fn test_parent_pom_request_values() {
        let pom = render_parent_pom("org.mine", "parent", "2.5", &PomDefaults::default(), std::iter::empty(), true, "");
        assert!(pom.contains("<groupId>org.mine</groupId>"));
        assert!(pom.contains("<artifactId>parent</artifactId>"));
        assert!(pom.contains("<version>2.5</version>"));
        assert!(pom.contains("<dependencies>\n        </dependencies>"));
    }

    #[test]
    fn test_parent_pom_values_are_not_substituted_again() {
        let pom = render_parent_pom("${version}", "${artifactId}", "", &PomDefaults::default(), std::iter::empty(), true, "");
        assert!(pom.contains("<groupId>${version}</groupId>"));
        assert!(pom.contains("<artifactId>${artifactId}</artifactId>"));
        assert!(pom.contains("<version>1.0</version>"));
    }

    #[test]
    fn test_parent_pom_comments_are_not_substituted() {
        let c = ArtifactCoordinate::placeholder("bundle.${groupId} [skipped because it's a fragment]").unwrap();
        let pom = render_parent_pom("g", "a", "1", &PomDefaults::default(), [&c], true, "");
        assert!(pom.contains("<!-- bundle.${groupId} [skipped because it's a fragment] -->"));
    }

    #[test]
    fn test_substitute() {
        let values = [("a", "${b}"), ("b", "x")];
        assert_eq!(substitute("${a}-${b}-${c}-${", &values), "${b}-x-${c}-${");
    }

    #[test]
    fn test_artifact_pom() {
        let pom = render_artifact_pom(&coordinate("g", "a", "1.0", "ignored"));
        assert_eq!(pom, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<project>\n\t<modelVersion>4.0.0</modelVersion>\n\t<groupId>g</groupId>\n\t<artifactId>a</artifactId>\n\t<version>1.0</version>\n\t<dependencies/>\n</project>\n");
    }
}
