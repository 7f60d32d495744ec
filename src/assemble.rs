//! Archive assembly from materialized entries.

use tracing::debug;

use crate::error::AssemblyError;
use crate::materialize::MaterializedEntry;
use crate::zip::{ArchiveWriter, Compression, DosDateTime};

/// Write `entries` into a new archive, in the order given.
///
/// Each payload is dropped as soon as it has been copied into the archive,
/// so peak memory is roughly the payloads plus one archive.
pub fn assemble(
    entries: Vec<MaterializedEntry>,
    compression: Compression,
    modified: DosDateTime,
) -> Result<Vec<u8>, AssemblyError> {
    let mut writer = ArchiveWriter::new(compression, modified);

    for entry in entries {
        writer.add_entry(&entry.archive_path, &entry.bytes)?;
        debug!(path = %entry.archive_path, bytes = entry.bytes.len(), "archived");
    }

    writer.finish()
}
