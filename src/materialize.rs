//! Payload materialization: resolving every record of a request into the
//! bytes that go into the archive.
//!
//! Records are resolved concurrently on the caller's task, at most
//! `concurrency` at a time. The join is all-or-nothing: the first failure
//! drops every materialization still in flight and is returned as the
//! error of the whole request. Results land in a slot per input index, so
//! the returned entries are always in input order no matter which record
//! finished first.

use futures::stream::{self, StreamExt};
use tracing::debug;

use crate::error::ExportError;
use crate::io::HandleResolver;
use crate::record::{ExportRequest, ImageRecord};

/// One resolved payload and the path it is stored under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedEntry {
    pub archive_path: String,
    pub bytes: Vec<u8>,
}

/// Resolve a single record.
///
/// # Errors
///
/// Returns [`ExportError::Materialization`] when the handle is empty, the
/// resolver fails, or the payload is empty.
pub async fn materialize<R: HandleResolver + ?Sized>(
    resolver: &R,
    index: usize,
    record: &ImageRecord,
    archive_path: String,
) -> Result<MaterializedEntry, ExportError> {
    let fail = |source: anyhow::Error| ExportError::Materialization {
        index,
        name: record.name().to_string(),
        source: source.into(),
    };

    if record.source().trim().is_empty() {
        return Err(fail(anyhow::anyhow!("source handle is empty")));
    }

    let bytes = resolver.resolve(record.source()).await.map_err(fail)?;
    if bytes.is_empty() {
        return Err(fail(anyhow::anyhow!("handle resolved to an empty payload")));
    }

    debug!(index, path = %archive_path, bytes = bytes.len(), "materialized");
    Ok(MaterializedEntry {
        archive_path,
        bytes,
    })
}

/// Resolve every record of the request, returning entries in input order.
pub async fn materialize_all<R: HandleResolver + ?Sized>(
    resolver: &R,
    request: &ExportRequest,
    concurrency: usize,
) -> Result<Vec<MaterializedEntry>, ExportError> {
    let paths = request.archive_paths();
    let mut slots: Vec<Option<MaterializedEntry>> = vec![None; request.records.len()];

    let jobs = request
        .records
        .iter()
        .zip(paths)
        .enumerate()
        .map(|(index, (record, path))| async move {
            materialize(resolver, index, record, path)
                .await
                .map(|entry| (index, entry))
        });

    let mut in_flight = stream::iter(jobs).buffer_unordered(concurrency.max(1));
    while let Some(result) = in_flight.next().await {
        let (index, entry) = result?;
        slots[index] = Some(entry);
    }

    Ok(slots.into_iter().flatten().collect())
}
