//! # imgzip
//!
//! Batch export of already-transformed images into a single ZIP archive.
//!
//! Image tools (watermark, resize, converter) hand over records whose
//! payloads are in-memory handles, usually data URLs. An export resolves
//! every handle concurrently, writes the payloads into one archive in
//! input order, and delivers the archive exactly once.
//!
//! ## Features
//!
//! - Pluggable handle resolution: data URLs, local files, HTTP(S)
//! - Bounded, fail-fast concurrent materialization
//! - Deterministic entry names and order (`watermark_cat.jpg`, ...)
//! - Stored or deflated entries, reproducible timestamps
//! - Atomic delivery: nothing is saved unless the whole archive succeeded
//!
//! ## Example
//!
//! ```no_run
//! use imgzip::{BaseImage, DataUrlResolver, DirectorySaver, ExportRequest, Exporter, ImageRecord};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let exporter = Exporter::new(DataUrlResolver, DirectorySaver::new("."));
//!
//!     let request = ExportRequest::new(vec![
//!         ImageRecord::watermark(BaseImage::new("data:image/jpeg;base64,/9j/4AAQ", "cat.jpg")),
//!         ImageRecord::convert(BaseImage::new("data:image/webp;base64,UklGRg==", "dog"), "webp"),
//!     ])
//!     .with_archive_name("out.zip");
//!
//!     let summary = exporter.export(request).await?;
//!     for entry in &summary.entries {
//!         println!("{}", entry);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod assemble;
pub mod cli;
pub mod deliver;
pub mod error;
pub mod export;
pub mod io;
pub mod materialize;
pub mod record;
pub mod zip;

pub use cli::Cli;
pub use deliver::{DirectorySaver, MemorySaver, SaveTarget, SavedArchive, StdoutSaver};
pub use error::{AssemblyError, ErrorKind, ExportError};
pub use export::{ExportOptions, ExportSummary, Exporter, FinishedArchive, build_archive};
pub use io::{DataUrlResolver, HandleResolver, HttpResolver, LocalFileResolver, SchemeResolver};
pub use materialize::MaterializedEntry;
pub use record::{BaseImage, ExportRequest, ImageRecord, Variant};
pub use zip::{Compression, DosDateTime, ZipArchive};
