use crate::maven::coordinates::ArtifactCoordinate;

/// Minimal `maven-metadata.xml` for a single artifact version, see
///  https://maven.apache.org/ref/3.9.5/maven-repository-metadata/repository-metadata.html
///
/// There is only ever one version of an artifact in the repository, so there is no
///  `<versioning>` section.
pub fn render_artifact_metadata(coordinate: &ArtifactCoordinate) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <metadata xsi:schemaLocation=\"http://maven.apache.org/METADATA/1.0.0 http://maven.apache.org/xsd/metadata-1.0.0.xsd\" \
         xmlns=\"http://maven.apache.org/METADATA/1.0.0\" xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\">\n\
         <groupId>{}</groupId>\n\
         <artifactId>{}</artifactId>\n\
         <version>{}</version>\n\
         </metadata>",
        coordinate.group_id(),
        coordinate.artifact_id(),
        coordinate.version(),
    )
}
