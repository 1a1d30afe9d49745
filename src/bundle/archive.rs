use std::collections::HashSet;
use std::io::Write;
use std::time::SystemTime;

use chrono::{Datelike, Timelike, Utc};
use sha1::{Digest, Sha1};
use thiserror::Error;
use tracing::{trace, warn};
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::bundle::inventory::BundleView;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("no bundle resource found in {0}")]
    NoResources(String),
    #[error(transparent)]
    Inventory(anyhow::Error),
    #[error("writing archive: {0}")]
    Zip(#[from] ZipError),
    #[error("writing archive: {0}")]
    Io(#[from] std::io::Error),
}

/// Fails with [`ArchiveError::NoResources`] if the bundle has nothing to archive. Lets callers
///  reject a bundle before the first archive byte is sent anywhere.
pub fn ensure_resources(bundle: &dyn BundleView) -> Result<(), ArchiveError> {
    let entries = bundle.entries()
        .map_err(ArchiveError::Inventory)?;
    if entries.is_empty() {
        return Err(ArchiveError::NoResources(bundle.symbolic_name().to_string()));
    }
    Ok(())
}

/// Re-packs all entries of a bundle into a jar written straight into `sink`, stamping every
///  entry with the bundle's modification time.
///
/// The sink is written front to back and never seeked, so it can be a network body or a digest.
///  Only one entry's content is held in memory at a time. An entry that cannot be read is logged
///  and left out; the archive is still written.
pub fn build_archive<W: Write>(bundle: &dyn BundleView, sink: W) -> Result<W, ArchiveError> {
    let entries = bundle.entries()
        .map_err(ArchiveError::Inventory)?;
    if entries.is_empty() {
        return Err(ArchiveError::NoResources(bundle.symbolic_name().to_string()));
    }

    trace!("archiving {} entries of bundle {}", entries.len(), bundle.symbolic_name());

    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip_timestamp(bundle.last_modified()));

    let mut writer = ZipWriter::new_stream(sink);
    let mut written = HashSet::new();

    for path in entries {
        let name = path.strip_prefix('/').unwrap_or(&path);
        if name.is_empty() || written.contains(name) {
            continue;
        }

        if name.ends_with('/') {
            writer.add_directory(name, options)?;
        }
        else {
            // read before starting the entry so that a failure leaves no partial entry behind
            let content = match bundle.read_entry(&path) {
                Ok(content) => content,
                Err(e) => {
                    warn!("skipping resource {} of bundle {}: {:#}", path, bundle.symbolic_name(), e);
                    continue;
                }
            };
            writer.start_file(name, options)?;
            writer.write_all(&content)?;
        }
        written.insert(name.to_string());
    }

    Ok(writer.finish()?.into_inner())
}

/// SHA-1 of the bundle's archive as 40 lowercase hex digits. The archive is fed to the digest
///  as it is built, so it is never held in memory.
pub fn compute_checksum(bundle: &dyn BundleView) -> Result<String, ArchiveError> {
    let hasher = build_archive(bundle, Sha1::new())?;
    Ok(hex::encode(hasher.finalize()))
}

/// DOS timestamps start in 1980; anything the format cannot hold becomes 1980-01-01
fn zip_timestamp(time: SystemTime) -> zip::DateTime {
    let utc: chrono::DateTime<Utc> = time.into();
    let year = match u16::try_from(utc.year()) {
        Ok(year) => year,
        Err(_) => return zip::DateTime::default(),
    };
    zip::DateTime::from_date_and_time(
        year,
        utc.month() as u8,
        utc.day() as u8,
        utc.hour() as u8,
        utc.minute() as u8,
        utc.second() as u8,
    ).unwrap_or_default()
}
