use crate::maven::coordinates::{ArtifactCoordinate, CoordinateError};

/// A file requested from the repository, e.g. `com/example/lib/1.0/lib-1.0.jar`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryRequest {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub file_name: String,
    /// without the leading '.', empty if the file name has none
    pub file_extension: String,
}

impl RepositoryRequest {
    pub fn coordinate(&self) -> Result<ArtifactCoordinate, CoordinateError> {
        ArtifactCoordinate::new(self.group_id.as_str(), self.artifact_id.as_str(), self.version.as_str(), "", None)
    }
}

/// `path` is the relative path inside the repository, i.e. it starts with something like
///  "org/..." or "com/...". The last three segments are artifact id, version and file name,
///  everything before is the group id.
///
/// Only the segment count is checked; the file name is not matched against artifact id and
///  version. Returns `None` for fewer than three segments.
pub fn parse_repository_path(path: &str) -> Option<RepositoryRequest> {
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        return None;
    }

    let segments: Vec<&str> = path.split('/').collect();
    if segments.len() < 3 {
        return None;
    }

    let (group_segments, rest) = segments.split_at(segments.len() - 3);
    let file_name = rest[2];
    let file_extension = match file_name.rfind('.') {
        Some(last_dot) => &file_name[last_dot + 1..],
        None => "",
    };

    Some(RepositoryRequest {
        group_id: group_segments.join("."),
        artifact_id: rest[0].to_string(),
        version: rest[1].to_string(),
        file_name: file_name.to_string(),
        file_extension: file_extension.to_string(),
    })
}

#[cfg(test)]
mod test {
    use rstest::*;
    use super::*;

    #[rstest]
    #[case::jar("com/example/lib/1.0/lib-1.0.jar", Some(("com.example", "lib", "1.0", "lib-1.0.jar", "jar")))]
    #[case::sha1("/org/x/y/2.0/y-2.0.jar.sha1", Some(("org.x", "y", "2.0", "y-2.0.jar.sha1", "sha1")))]
    #[case::metadata("g/a/1/maven-metadata.xml", Some(("g", "a", "1", "maven-metadata.xml", "xml")))]
    #[case::no_group("a/1.0/a-1.0.pom", Some(("", "a", "1.0", "a-1.0.pom", "pom")))]
    #[case::no_extension("g/a/1.0/README", Some(("g", "a", "1.0", "README", "")))]
    #[case::directory_listing("g/a/1.0/", Some(("g", "a", "1.0", "", "")))]
    #[case::too_short("a/a-1.0.jar", None)]
    #[case::single("index.html", None)]
    #[case::empty("", None)]
    #[case::only_slash("/", None)]
    fn test_parse_repository_path(#[case] path: &str, #[case] expected: Option<(&str, &str, &str, &str, &str)>) {
        let expected = expected.map(|(g, a, v, f, e)| RepositoryRequest {
            group_id: g.to_string(),
            artifact_id: a.to_string(),
            version: v.to_string(),
            file_name: f.to_string(),
            file_extension: e.to_string(),
        });
        assert_eq!(parse_repository_path(path), expected);
    }

    #[test]
    fn test_request_coordinate() {
        let request = parse_repository_path("com/example/lib/1.0/lib-1.0.jar").unwrap();
        assert_eq!(request.coordinate().unwrap().identity(), "com.example:lib:1.0");
    }
}
