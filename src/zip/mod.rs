//! ZIP archive writing and reading.
//!
//! ## Architecture
//!
//! - [`structures`]: Data structures representing ZIP format elements (EOCD, file headers, etc.)
//! - [`writer`]: Appends entries into an in-memory archive and finalizes it
//! - [`reader`]: Parses a finished archive back for verification and listing
//!
//! ## ZIP Format Overview
//!
//! A ZIP file consists of:
//! 1. Local file headers and compressed data for each file
//! 2. Central Directory with metadata for all files
//! 3. End of Central Directory (EOCD) record at the end
//!
//! ## Supported Features
//!
//! - Standard ZIP format (PKZIP APPNOTE 6.3.x compatible)
//! - STORED (no compression) method
//! - DEFLATE compression method
//! - UTF-8 file names
//!
//! ## Limitations
//!
//! - No ZIP64: at most 65534 entries, sizes and offsets below 4 GiB
//! - No encryption support
//! - No multi-disk archive support

mod reader;
mod structures;
mod writer;

pub use reader::ZipArchive;
pub use structures::*;
pub use writer::{ArchiveWriter, Compression};
