use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::bundle::archive::{compute_checksum, ensure_resources, ArchiveError};
use crate::bundle::inventory::BundleView;
use crate::maven::metadata_xml::render_artifact_metadata;
use crate::maven::paths::parse_repository_path;
use crate::maven::pom::render_artifact_pom;
use crate::maven::resolver::ResolvedArtifacts;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("not a valid repository path: {0:?}")]
    MalformedRequest(String),
    #[error("artifact {0} is not provided by any installed bundle")]
    ArtifactNotFound(String),
    #[error("unsupported file type: {0:?}")]
    UnknownExtension(String),
    #[error("resolving installed bundles failed: {0:#}")]
    Resolution(anyhow::Error),
    #[error("building the artifact archive failed: {0}")]
    Archive(#[from] ArchiveError),
}

impl RepositoryError {
    /// Errors caused by the request rather than by the server. They are answered with the
    ///  generic index page instead of an error status.
    pub fn is_index_fallback(&self) -> bool {
        matches!(
            self,
            RepositoryError::MalformedRequest(_) | RepositoryError::ArtifactNotFound(_) | RepositoryError::UnknownExtension(_)
        )
    }
}

#[derive(Debug, Clone)]
pub enum RepositoryResponse {
    Pom(String),
    Metadata(String),
    Sha1(String),
    /// the bundle to archive, checked to have resources; the archive itself is built while it
    ///  is sent
    Jar(Arc<dyn BundleView>),
}

/// Answers a repository request from the artifacts resolved for the current bundles.
///
/// The POM and metadata documents are rendered from the requested coordinates, the jar and its
///  checksum from the matching bundle. Computing a checksum reads all bundle entries, so this
///  blocks.
pub fn serve(path: &str, artifacts: &ResolvedArtifacts) -> Result<RepositoryResponse, RepositoryError> {
    let request = parse_repository_path(path)
        .ok_or_else(|| RepositoryError::MalformedRequest(path.to_string()))?;
    let requested = request.coordinate()
        .map_err(|_| RepositoryError::MalformedRequest(path.to_string()))?;

    let artifact = artifacts.find(&requested)
        .ok_or_else(|| RepositoryError::ArtifactNotFound(requested.identity().to_string()))?;

    debug!("serving {} for artifact {}", request.file_name, artifact);

    match request.file_extension.as_str() {
        "pom" => Ok(RepositoryResponse::Pom(render_artifact_pom(&requested))),
        "xml" => Ok(RepositoryResponse::Metadata(render_artifact_metadata(&requested))),
        "sha1" => {
            let bundle = artifact.source()
                .ok_or_else(|| RepositoryError::ArtifactNotFound(requested.identity().to_string()))?;
            Ok(RepositoryResponse::Sha1(compute_checksum(bundle.as_ref())?))
        }
        "jar" => {
            let bundle = artifact.source()
                .ok_or_else(|| RepositoryError::ArtifactNotFound(requested.identity().to_string()))?;
            ensure_resources(bundle.as_ref())?;
            Ok(RepositoryResponse::Jar(bundle.clone()))
        }
        other => Err(RepositoryError::UnknownExtension(other.to_string())),
    }
}
