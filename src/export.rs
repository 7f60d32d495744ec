//! Export orchestration: materialize, assemble, deliver.
//!
//! An export is one future. Dropping it before it resolves abandons every
//! in-flight materialization and skips delivery; the save target is only
//! called once the archive is complete.

use tracing::{debug, info};

use crate::assemble::assemble;
use crate::deliver::SaveTarget;
use crate::error::ExportError;
use crate::io::HandleResolver;
use crate::materialize::materialize_all;
use crate::record::ExportRequest;
use crate::zip::{Compression, DosDateTime};

/// Materializations allowed in flight at once by default.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Tunables for one export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    /// Upper bound on concurrent materializations (at least 1)
    pub concurrency: usize,
    /// How payloads are stored in the archive
    pub compression: Compression,
    /// Timestamp written on every entry
    pub modified: DosDateTime,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            compression: Compression::Stored,
            modified: DosDateTime::default(),
        }
    }
}

impl ExportOptions {
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_modified(mut self, modified: DosDateTime) -> Self {
        self.modified = modified;
        self
    }
}

/// A complete archive, not yet delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishedArchive {
    /// Suggested file name
    pub name: String,
    /// Entry paths in archive order
    pub entries: Vec<String>,
    pub bytes: Vec<u8>,
}

/// Result of a delivered export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub archive_name: String,
    pub entries: Vec<String>,
    pub archive_size: u64,
}

/// Build the archive for `request` without delivering it.
pub async fn build_archive<R: HandleResolver + ?Sized>(
    resolver: &R,
    request: &ExportRequest,
    options: &ExportOptions,
) -> Result<FinishedArchive, ExportError> {
    if request.is_empty() {
        return Err(ExportError::Empty);
    }

    debug!(
        records = request.records.len(),
        concurrency = options.concurrency,
        "materializing"
    );
    let materialized = materialize_all(resolver, request, options.concurrency).await?;
    let entries = materialized
        .iter()
        .map(|entry| entry.archive_path.clone())
        .collect();

    let bytes = assemble(materialized, options.compression, options.modified)?;

    Ok(FinishedArchive {
        name: request.archive_name.clone(),
        entries,
        bytes,
    })
}

/// Runs exports against a resolver and a save target.
///
/// ```no_run
/// use imgzip::{BaseImage, ExportRequest, Exporter, ImageRecord, MemorySaver, SchemeResolver};
///
/// # async fn run() -> anyhow::Result<()> {
/// let exporter = Exporter::new(SchemeResolver::new(None)?, MemorySaver::new());
/// let request = ExportRequest::new(vec![ImageRecord::watermark(BaseImage::new(
///     "data:image/png;base64,iVBORw0KGgo=",
///     "cat.png",
/// ))])
/// .with_archive_name("out.zip");
///
/// let summary = exporter.export(request).await?;
/// assert_eq!(summary.entries, ["watermark_cat.png"]);
/// # Ok(())
/// # }
/// ```
pub struct Exporter<R, S> {
    resolver: R,
    target: S,
    options: ExportOptions,
}

impl<R: HandleResolver, S: SaveTarget> Exporter<R, S> {
    pub fn new(resolver: R, target: S) -> Self {
        Self {
            resolver,
            target,
            options: ExportOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ExportOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    pub fn target(&self) -> &S {
        &self.target
    }

    /// Export every record of `request` as one archive and deliver it.
    ///
    /// # Errors
    ///
    /// Fails without delivering anything if the request is empty, any
    /// record fails to materialize, or assembly fails. Fails with
    /// [`ExportError::Delivery`] if the save target rejects the archive.
    pub async fn export(&self, request: ExportRequest) -> Result<ExportSummary, ExportError> {
        let archive = build_archive(&self.resolver, &request, &self.options).await?;
        let archive_size = archive.bytes.len() as u64;

        self.target
            .save(&archive.name, archive.bytes)
            .await
            .map_err(|e| ExportError::Delivery {
                archive: archive.name.clone(),
                source: e.into(),
            })?;

        info!(
            archive = %archive.name,
            entries = archive.entries.len(),
            bytes = archive_size,
            "export delivered"
        );

        Ok(ExportSummary {
            archive_name: archive.name,
            entries: archive.entries,
            archive_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deliver::MemorySaver;
    use crate::io::DataUrlResolver;

    #[test]
    fn concurrency_never_drops_to_zero() {
        assert_eq!(ExportOptions::default().with_concurrency(0).concurrency, 1);
        assert_eq!(ExportOptions::default().concurrency, DEFAULT_CONCURRENCY);
    }

    #[test]
    fn exporter_keeps_the_options_it_was_given() {
        let options = ExportOptions::default()
            .with_concurrency(2)
            .with_compression(Compression::Deflate(9));
        let exporter =
            Exporter::new(DataUrlResolver, MemorySaver::new()).with_options(options.clone());

        assert_eq!(exporter.options(), &options);
        assert_eq!(
            Exporter::new(DataUrlResolver, MemorySaver::new()).options(),
            &ExportOptions::default()
        );
    }
}
