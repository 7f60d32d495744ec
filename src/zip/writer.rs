//! In-memory ZIP archive writer.
//!
//! Entries are appended one at a time: each call writes the local file
//! header and payload straight into the output buffer, so the caller can
//! drop a payload as soon as it has been added. The central directory and
//! EOCD are written by [`ArchiveWriter::finish`], which is the only way to
//! obtain the archive bytes.

use flate2::Crc;
use flate2::write::DeflateEncoder;
use std::collections::HashSet;
use std::io::Write;

use crate::error::AssemblyError;

use super::structures::*;

/// How entry payloads are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    /// Payloads are copied verbatim.
    #[default]
    Stored,
    /// Payloads are deflated at the given level (0-9). Entries that do not
    /// shrink are stored instead.
    Deflate(u32),
}

/// Streaming writer for a single archive.
pub struct ArchiveWriter {
    buf: Vec<u8>,
    entries: Vec<EntryHeader>,
    names: HashSet<String>,
    compression: Compression,
    modified: DosDateTime,
}

impl ArchiveWriter {
    pub fn new(compression: Compression, modified: DosDateTime) -> Self {
        Self {
            buf: Vec::new(),
            entries: Vec::new(),
            names: HashSet::new(),
            compression,
            modified,
        }
    }

    /// Number of entries written so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append one entry.
    ///
    /// # Errors
    ///
    /// Fails on an empty, overlong or duplicate path, when the entry or the
    /// archive would need ZIP64, or when deflate fails.
    pub fn add_entry(&mut self, path: &str, data: &[u8]) -> Result<(), AssemblyError> {
        if path.is_empty() {
            return Err(AssemblyError::EmptyPath);
        }
        if path.len() > u16::MAX as usize {
            return Err(AssemblyError::NameTooLong(path.to_string()));
        }
        if self.names.contains(path) {
            return Err(AssemblyError::DuplicatePath(path.to_string()));
        }
        if self.entries.len() >= MAX_ENTRIES {
            return Err(AssemblyError::TooManyEntries { limit: MAX_ENTRIES });
        }
        if data.len() as u64 > MAX_SIZE {
            return Err(AssemblyError::EntryTooLarge {
                path: path.to_string(),
            });
        }

        let mut crc = Crc::new();
        crc.update(data);

        let deflated = match self.compression {
            Compression::Stored => None,
            Compression::Deflate(level) => {
                let mut encoder =
                    DeflateEncoder::new(Vec::new(), flate2::Compression::new(level.min(9)));
                encoder.write_all(data)?;
                let compressed = encoder.finish()?;
                (compressed.len() < data.len()).then_some(compressed)
            }
        };

        let (method, payload) = match &deflated {
            Some(compressed) => (CompressionMethod::Deflate, compressed.as_slice()),
            None => (CompressionMethod::Stored, data),
        };

        let offset = self.buf.len() as u64;
        let header = EntryHeader {
            file_name: path.to_string(),
            compression_method: method,
            modified: self.modified,
            crc32: crc.sum(),
            compressed_size: payload.len() as u32,
            uncompressed_size: data.len() as u32,
            lfh_offset: offset as u32,
        };

        // The next local header and the central directory both need
        // 32-bit offsets.
        if offset + header.local_len() + payload.len() as u64 > MAX_SIZE {
            return Err(AssemblyError::ArchiveTooLarge);
        }

        header.write_local(&mut self.buf)?;
        self.buf.extend_from_slice(payload);

        self.names.insert(header.file_name.clone());
        self.entries.push(header);
        Ok(())
    }

    /// Write the central directory and EOCD and return the archive.
    pub fn finish(mut self) -> Result<Vec<u8>, AssemblyError> {
        let cd_offset = self.buf.len() as u64;
        for header in &self.entries {
            header.write_central(&mut self.buf)?;
        }
        let cd_size = self.buf.len() as u64 - cd_offset;

        if cd_offset + cd_size > MAX_SIZE {
            return Err(AssemblyError::ArchiveTooLarge);
        }

        EndOfCentralDirectory::new(self.entries.len() as u16, cd_size as u32, cd_offset as u32)
            .write_to(&mut self.buf)?;

        Ok(self.buf)
    }
}
