//! ZIP archive reader for finished in-memory archives.
//!
//! Used to verify exported archives and to list their contents.
//!
//! ## Parsing Strategy
//!
//! ZIP files are designed to be read from the end:
//! 1. Find the End of Central Directory (EOCD) at the buffer's end
//! 2. Read the Central Directory to get metadata for all files
//! 3. For extraction, read each file's Local File Header and data
//!
//! ZIP64 archives are rejected; the writer never produces them.

use byteorder::{LittleEndian, ReadBytesExt};
use flate2::Crc;
use flate2::read::DeflateDecoder;
use std::io::{Cursor, Read};

use anyhow::{Context, Result, bail};

use super::structures::*;

/// Maximum ZIP comment size allowed by the format (65535 bytes).
///
/// This limits the search area when looking for EOCD with a comment.
const MAX_COMMENT_SIZE: usize = 65535;

/// Read-only view over a complete archive held in memory.
///
/// ## Example
///
/// ```ignore
/// let archive = ZipArchive::new(&bytes);
/// for entry in archive.list_files()? {
///     let data = archive.extract(&entry)?;
/// }
/// ```
pub struct ZipArchive<'a> {
    data: &'a [u8],
}

impl<'a> ZipArchive<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Find and parse the End of Central Directory record.
    ///
    /// Tries the no-comment case first, then searches backwards through
    /// the last 64 KiB for a signature whose comment length matches.
    ///
    /// # Returns
    ///
    /// A tuple of (EOCD record, offset of EOCD in the buffer).
    pub fn find_eocd(&self) -> Result<(EndOfCentralDirectory, usize)> {
        let size = self.data.len();
        if size < EndOfCentralDirectory::SIZE {
            bail!("Not a valid ZIP file");
        }

        let offset = size - EndOfCentralDirectory::SIZE;
        let tail = &self.data[offset..];
        if &tail[0..4] == EndOfCentralDirectory::SIGNATURE && &tail[20..22] == b"\x00\x00" {
            return Ok((EndOfCentralDirectory::from_bytes(tail)?, offset));
        }

        let search_start = size.saturating_sub(MAX_COMMENT_SIZE + EndOfCentralDirectory::SIZE);
        let window = &self.data[search_start..];

        for i in (0..=window.len() - EndOfCentralDirectory::SIZE).rev() {
            if &window[i..i + 4] == EndOfCentralDirectory::SIGNATURE {
                let comment_len = u16::from_le_bytes([window[i + 20], window[i + 21]]) as usize;
                if comment_len == window.len() - i - EndOfCentralDirectory::SIZE {
                    let eocd = EndOfCentralDirectory::from_bytes(
                        &window[i..i + EndOfCentralDirectory::SIZE],
                    )?;
                    return Ok((eocd, search_start + i));
                }
            }
        }

        bail!("Not a valid ZIP file")
    }

    /// List all entries in central directory order.
    pub fn list_files(&self) -> Result<Vec<ZipFileEntry>> {
        let (eocd, eocd_offset) = self.find_eocd()?;
        if eocd.is_zip64() {
            bail!("ZIP64 archives are not supported");
        }

        let cd_offset = eocd.cd_offset as usize;
        let cd_end = cd_offset + eocd.cd_size as usize;
        if cd_end > eocd_offset {
            bail!("Central Directory extends past the End of Central Directory");
        }

        let mut cursor = Cursor::new(&self.data[cd_offset..cd_end]);
        let mut entries = Vec::with_capacity(eocd.total_entries as usize);
        for _ in 0..eocd.total_entries {
            entries.push(Self::parse_cdfh(&mut cursor)?);
        }

        Ok(entries)
    }

    /// Parse a Central Directory File Header from a cursor.
    fn parse_cdfh(cursor: &mut Cursor<&[u8]>) -> Result<ZipFileEntry> {
        let mut sig = [0u8; 4];
        cursor.read_exact(&mut sig)?;
        if sig != CDFH_SIGNATURE {
            bail!("Invalid Central Directory File Header");
        }

        let _version_made_by = cursor.read_u16::<LittleEndian>()?;
        let _version_needed = cursor.read_u16::<LittleEndian>()?;
        let _flags = cursor.read_u16::<LittleEndian>()?;
        let compression_method = cursor.read_u16::<LittleEndian>()?;
        let last_mod_time = cursor.read_u16::<LittleEndian>()?;
        let last_mod_date = cursor.read_u16::<LittleEndian>()?;
        let crc32 = cursor.read_u32::<LittleEndian>()?;
        let compressed_size = cursor.read_u32::<LittleEndian>()? as u64;
        let uncompressed_size = cursor.read_u32::<LittleEndian>()? as u64;
        let file_name_length = cursor.read_u16::<LittleEndian>()?;
        let extra_field_length = cursor.read_u16::<LittleEndian>()?;
        let file_comment_length = cursor.read_u16::<LittleEndian>()?;
        let _disk_number_start = cursor.read_u16::<LittleEndian>()?;
        let _internal_attrs = cursor.read_u16::<LittleEndian>()?;
        let _external_attrs = cursor.read_u32::<LittleEndian>()?;
        let lfh_offset = cursor.read_u32::<LittleEndian>()? as u64;

        let mut file_name_bytes = vec![0u8; file_name_length as usize];
        cursor.read_exact(&mut file_name_bytes)?;
        let file_name = String::from_utf8_lossy(&file_name_bytes).to_string();
        let is_directory = file_name.ends_with('/');

        // Extra field and comment are not used
        let skip = extra_field_length as u64 + file_comment_length as u64;
        cursor.set_position(cursor.position() + skip);

        Ok(ZipFileEntry {
            file_name,
            compression_method: CompressionMethod::from_u16(compression_method),
            compressed_size,
            uncompressed_size,
            crc32,
            lfh_offset,
            last_mod_time,
            last_mod_date,
            is_directory,
        })
    }

    /// Offset where an entry's payload begins, after its Local File Header.
    pub fn data_offset(&self, entry: &ZipFileEntry) -> Result<usize> {
        let start = entry.lfh_offset as usize;
        let lfh = self
            .data
            .get(start..start + LFH_SIZE)
            .context("Local File Header out of bounds")?;

        if &lfh[0..4] != LFH_SIGNATURE {
            bail!("Invalid Local File Header");
        }

        let mut cursor = Cursor::new(lfh);
        cursor.set_position(26); // Offset to filename length field
        let file_name_length = cursor.read_u16::<LittleEndian>()? as usize;
        let extra_field_length = cursor.read_u16::<LittleEndian>()? as usize;

        Ok(start + LFH_SIZE + file_name_length + extra_field_length)
    }

    /// Extract and CRC-check one entry's payload.
    pub fn extract(&self, entry: &ZipFileEntry) -> Result<Vec<u8>> {
        let start = self.data_offset(entry)?;
        let raw = self
            .data
            .get(start..start + entry.compressed_size as usize)
            .with_context(|| format!("Data for {} out of bounds", entry.file_name))?;

        let data = match entry.compression_method {
            CompressionMethod::Stored => raw.to_vec(),
            CompressionMethod::Deflate => {
                let mut out = Vec::with_capacity(entry.uncompressed_size as usize);
                DeflateDecoder::new(raw).read_to_end(&mut out)?;
                out
            }
            CompressionMethod::Unknown(method) => {
                bail!("Unsupported compression method: {}", method)
            }
        };

        if data.len() as u64 != entry.uncompressed_size {
            bail!("Size mismatch for {}", entry.file_name);
        }

        let mut crc = Crc::new();
        crc.update(&data);
        if crc.sum() != entry.crc32 {
            bail!("CRC mismatch for {}", entry.file_name);
        }

        Ok(data)
    }

    /// Extract every entry in central directory order.
    /// Extract every file entry; directory entries are skipped.
    pub fn extract_all(&self) -> Result<Vec<(String, Vec<u8>)>> {
        self.list_files()?
            .into_iter()
            .filter(|entry| !entry.is_directory)
            .map(|entry| {
                let data = self.extract(&entry)?;
                Ok((entry.file_name, data))
            })
            .collect()
    }
}
