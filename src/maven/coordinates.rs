use std::cmp::Ordering;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

use thiserror::Error;

use crate::bundle::inventory::BundleView;
use crate::maven::version::VersionValue;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoordinateError {
    #[error("an artifact coordinate needs a group id, an artifact id or a comment")]
    NoIdentity,
}

/// A Maven coordinate derived from an installed bundle, or a placeholder that only carries a
///  comment explaining why a bundle produced no coordinate.
///
/// Equality and ordering are defined on the identity string: `groupId:artifactId:version` for
///  real coordinates, the comment for placeholders. The comment of a real coordinate and the
///  source bundle never take part in comparisons.
#[derive(Clone)]
pub struct ArtifactCoordinate {
    group_id: String,
    artifact_id: String,
    version: String,
    comment: String,
    source: Option<Arc<dyn BundleView>>,
    identity: String,
}

impl ArtifactCoordinate {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
        comment: impl Into<String>,
        source: Option<Arc<dyn BundleView>>,
    ) -> Result<ArtifactCoordinate, CoordinateError> {
        let group_id = group_id.into();
        let artifact_id = artifact_id.into();
        let version = version.into();
        let comment = comment.into();

        let identity = if !(group_id.is_empty() && artifact_id.is_empty()) {
            format!("{}:{}:{}", group_id, artifact_id, version)
        }
        else if !comment.is_empty() {
            comment.clone()
        }
        else {
            return Err(CoordinateError::NoIdentity);
        };

        Ok(ArtifactCoordinate {
            group_id,
            artifact_id,
            version,
            comment,
            source,
            identity,
        })
    }

    /// A record without coordinates, rendered only as a comment line
    pub fn placeholder(comment: impl Into<String>) -> Result<ArtifactCoordinate, CoordinateError> {
        ArtifactCoordinate::new("", "", "", comment, None)
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn artifact_id(&self) -> &str {
        &self.artifact_id
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub fn source(&self) -> Option<&Arc<dyn BundleView>> {
        self.source.as_ref()
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn is_placeholder(&self) -> bool {
        self.group_id.is_empty() && self.artifact_id.is_empty()
    }

    /// true if this can be rendered as a `<dependency>` element
    pub fn is_dependency(&self) -> bool {
        !self.group_id.is_empty() && !self.artifact_id.is_empty()
    }

    pub fn maven_version(&self) -> VersionValue {
        VersionValue::parse(&self.version)
    }

    pub fn has_same_group_and_artifact(&self, other: &ArtifactCoordinate) -> bool {
        self.group_id == other.group_id && self.artifact_id == other.artifact_id
    }
}

impl PartialEq for ArtifactCoordinate {
    fn eq(&self, other: &Self) -> bool {
        self.identity == other.identity
    }
}
impl Eq for ArtifactCoordinate {}

impl PartialOrd for ArtifactCoordinate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for ArtifactCoordinate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.identity.cmp(&other.identity)
    }
}

impl Display for ArtifactCoordinate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.identity)
    }
}

impl Debug for ArtifactCoordinate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactCoordinate")
            .field("group_id", &self.group_id)
            .field("artifact_id", &self.artifact_id)
            .field("version", &self.version)
            .field("comment", &self.comment)
            .field("source", &self.source.as_ref().map(|b| b.symbolic_name().to_string()))
            .finish()
    }
}

#[cfg(test)]
mod test {
    use std::collections::BTreeSet;
    use super::*;

    #[test]
    fn test_equal_ignores_comment() {
        let a = ArtifactCoordinate::new("g", "a", "1", "first", None).unwrap();
        let b = ArtifactCoordinate::new("g", "a", "1", "second", None).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.identity(), "g:a:1");
    }

    #[test]
    fn test_placeholders_compare_by_comment() {
        let x1 = ArtifactCoordinate::placeholder("X").unwrap();
        let x2 = ArtifactCoordinate::placeholder("X").unwrap();
        let y = ArtifactCoordinate::placeholder("Y").unwrap();
        assert_eq!(x1, x2);
        assert_ne!(x1, y);
        assert!(x1 < y);
        assert!(x1.is_placeholder());
        assert!(!x1.is_dependency());
    }

    #[test]
    fn test_version_is_part_of_identity() {
        let a = ArtifactCoordinate::new("g", "a", "1.0", "", None).unwrap();
        let b = ArtifactCoordinate::new("g", "a", "1.2", "", None).unwrap();
        assert_ne!(a, b);
        assert!(a.has_same_group_and_artifact(&b));
    }

    #[test]
    fn test_no_identity_is_rejected() {
        assert_eq!(ArtifactCoordinate::new("", "", "1.0", "", None).unwrap_err(), CoordinateError::NoIdentity);
        assert_eq!(ArtifactCoordinate::placeholder("").unwrap_err(), CoordinateError::NoIdentity);
    }

    #[test]
    fn test_partial_coordinate_uses_gav_identity() {
        // only both parts missing makes a coordinate a placeholder
        let c = ArtifactCoordinate::new("", "a", "1", "comment", None).unwrap();
        assert_eq!(c.identity(), ":a:1");
        assert!(!c.is_placeholder());
        assert!(!c.is_dependency());
    }

    #[test]
    fn test_set_ordering() {
        let set: BTreeSet<_> = vec![
            ArtifactCoordinate::new("org.b", "x", "1", "", None).unwrap(),
            ArtifactCoordinate::new("com.a", "y", "1", "", None).unwrap(),
            ArtifactCoordinate::placeholder("bundle.c [skipped due to no exports]").unwrap(),
            ArtifactCoordinate::new("com.a", "y", "1", "duplicate", None).unwrap(),
        ].into_iter().collect();

        let identities: Vec<_> = set.iter().map(|c| c.identity().to_string()).collect();
        assert_eq!(identities, vec![
            "bundle.c [skipped due to no exports]",
            "com.a:y:1",
            "org.b:x:1",
        ]);
    }
}
