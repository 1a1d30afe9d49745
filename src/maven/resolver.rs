use std::collections::BTreeSet;
use std::sync::Arc;

use regex::Regex;
use tracing::{debug, trace};

use crate::bundle::inventory::BundleView;
use crate::maven::coordinates::ArtifactCoordinate;
use crate::maven::mapping::MappingTable;
use crate::maven::version::VersionValue;

/// The de-duplicated, identity-ordered result of one resolution pass
#[derive(Debug, Clone, Default)]
pub struct ResolvedArtifacts {
    artifacts: BTreeSet<ArtifactCoordinate>,
}

impl ResolvedArtifacts {
    pub fn iter(&self) -> impl Iterator<Item = &ArtifactCoordinate> {
        self.artifacts.iter()
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// the resolved coordinate equal to `probe`, carrying the source bundle
    pub fn find(&self, probe: &ArtifactCoordinate) -> Option<&ArtifactCoordinate> {
        self.artifacts.get(probe)
    }
}

/// Derives Maven coordinates for a snapshot of installed bundles.
///
/// Bundles matching an ignore pattern produce nothing. Fragments, bundles without embedded
///  `pom.properties` (and no mapping), and bundles without exports produce a placeholder that is
///  rendered as a comment. All others produce one coordinate per embedded `pom.properties`, or
///  one from their mapping. If the same group and artifact is present in several versions, only
///  the highest survives.
///
/// Any failure to read from the inventory fails the whole pass.
pub fn resolve(
    bundles: &[Arc<dyn BundleView>],
    mappings: &MappingTable,
    ignore_patterns: &[Regex],
) -> anyhow::Result<ResolvedArtifacts> {
    let mut artifacts = BTreeSet::new();

    for bundle in bundles {
        for coordinate in coordinates_for_bundle(bundle, mappings, ignore_patterns)? {
            trace!("bundle {} resolved to {}", bundle.symbolic_name(), coordinate);
            artifacts.insert(coordinate);
        }
    }

    filter_duplicate_versions(&mut artifacts);

    Ok(ResolvedArtifacts { artifacts })
}

fn coordinates_for_bundle(
    bundle: &Arc<dyn BundleView>,
    mappings: &MappingTable,
    ignore_patterns: &[Regex],
) -> anyhow::Result<Vec<ArtifactCoordinate>> {
    let symbolic_name = bundle.symbolic_name();

    if let Some(pattern) = ignore_patterns.iter().find(|p| p.is_match(symbolic_name)) {
        debug!("bundle {} is ignored because it matches {}", symbolic_name, pattern.as_str());
        return Ok(vec![]);
    }

    if bundle.is_fragment() {
        return Ok(vec![ArtifactCoordinate::placeholder(
            format!("{} [skipped because it's a fragment]", symbolic_name)
        )?]);
    }

    let pom_properties = bundle.pom_properties()?;
    let mapping = mappings.get(symbolic_name);

    if pom_properties.is_empty() {
        let coordinate = match mapping {
            Some(mapping) => ArtifactCoordinate::new(
                mapping.group_id.as_str(),
                non_empty_or(&mapping.artifact_id, symbolic_name),
                non_empty_or(&mapping.version, bundle.version()),
                symbolic_name,
                Some(bundle.clone()),
            )?,
            None => ArtifactCoordinate::placeholder(
                format!("{} [skipped because of missing pom properties]", symbolic_name)
            )?,
        };
        return Ok(vec![coordinate]);
    }

    if !bundle.exports_packages() {
        return Ok(vec![ArtifactCoordinate::placeholder(
            format!("{} [skipped due to no exports]", symbolic_name)
        )?]);
    }

    let mut result = Vec::with_capacity(pom_properties.len());
    for properties in pom_properties {
        let coordinate = match mapping {
            Some(mapping) => ArtifactCoordinate::new(
                mapping.group_id.as_str(),
                non_empty_or(&mapping.artifact_id, &properties.artifact_id),
                non_empty_or(&mapping.version, &properties.version),
                symbolic_name,
                Some(bundle.clone()),
            )?,
            None if properties.group_id.is_empty() || properties.artifact_id.is_empty() => {
                ArtifactCoordinate::placeholder(
                    format!("{} [skipped because of incomplete pom properties]", symbolic_name)
                )?
            }
            None => ArtifactCoordinate::new(
                properties.group_id,
                properties.artifact_id,
                properties.version,
                symbolic_name,
                Some(bundle.clone()),
            )?,
        };
        result.push(coordinate);
    }
    Ok(result)
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() { fallback } else { value }
}

/// Removes every coordinate for which another one with the same group and artifact has a higher
///  version. Equal versions are all kept.
///
/// NB: this is a pairwise scan, quadratic in the number of resolved artifacts
fn filter_duplicate_versions(artifacts: &mut BTreeSet<ArtifactCoordinate>) {
    let versions: Vec<(&ArtifactCoordinate, VersionValue)> = artifacts.iter()
        .filter(|c| !c.is_placeholder())
        .map(|c| (c, c.maven_version()))
        .collect();

    let superseded: Vec<ArtifactCoordinate> = versions.iter()
        .filter(|(candidate, candidate_version)| versions.iter()
            .any(|(other, other_version)| other.has_same_group_and_artifact(candidate) && other_version > candidate_version))
        .map(|(candidate, _)| (*candidate).clone())
        .collect();

    for coordinate in superseded {
        debug!("removing dependency {} because the same artifact is present with a higher version", coordinate);
        artifacts.remove(&coordinate);
    }
}
