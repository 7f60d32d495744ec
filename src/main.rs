//! Main entry point for the imgzip CLI application.
//!
//! Reads a JSON manifest of image records, exports them as one archive,
//! and writes the archive to a directory or stdout.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use tracing_subscriber::EnvFilter;

use imgzip::{
    Cli, DirectorySaver, ExportRequest, ExportSummary, Exporter, ImageRecord, SchemeResolver,
    StdoutSaver, ZipArchive,
};

/// Application entry point.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let (records, root) = read_manifest(&cli).await?;
    let request = ExportRequest::new(records).with_archive_name(cli.output.clone());
    let resolver = SchemeResolver::new(root)?;

    if cli.pipe {
        let exporter = Exporter::new(resolver, StdoutSaver).with_options(cli.export_options());
        exporter.export(request).await?;
        return Ok(());
    }

    let dir = cli.output_dir.clone().unwrap_or_else(|| ".".to_string());
    let exporter =
        Exporter::new(resolver, DirectorySaver::new(&dir)).with_options(cli.export_options());
    let summary = exporter.export(request).await?;
    let path = exporter.target().path_for(&summary.archive_name)?;

    if !cli.is_quiet() {
        report(&summary, &path);

        let transferred = exporter.resolver().http().transferred_bytes();
        if transferred > 0 {
            eprintln!("Total bytes transferred: {}", format_size(transferred));
        }
    }

    if cli.list {
        list_archive(&path).await?;
    }

    Ok(())
}

/// Install the stderr log subscriber. `RUST_LOG` overrides `-v`.
fn init_tracing(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("imgzip={}", cli.log_level())));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Load the record manifest.
///
/// Relative file handles in a manifest resolve against the manifest's
/// directory; for stdin they resolve against the working directory.
async fn read_manifest(cli: &Cli) -> Result<(Vec<ImageRecord>, Option<PathBuf>)> {
    let (json, root) = if cli.is_stdin() {
        let mut json = String::new();
        tokio::io::stdin()
            .read_to_string(&mut json)
            .await
            .context("failed to read manifest from stdin")?;
        (json, None)
    } else {
        let path = Path::new(&cli.manifest);
        let json = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read manifest {}", path.display()))?;
        (json, path.parent().map(Path::to_path_buf))
    };

    let records = serde_json::from_str(&json).context("invalid manifest")?;
    Ok((records, root))
}

fn report(summary: &ExportSummary, path: &Path) {
    for entry in &summary.entries {
        println!("  adding: {}", entry);
    }
    println!(
        "Wrote {} ({} files, {})",
        path.display(),
        summary.entries.len(),
        format_size(summary.archive_size)
    );
}

/// Read the written archive back and print a table of its entries.
async fn list_archive(path: &Path) -> Result<()> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let archive = ZipArchive::new(&bytes);
    let entries = archive.list_files()?;

    println!(
        "{:>10}  {:>10}  {:>5}  {:>10}  {:>5}  Name",
        "Length", "Size", "Cmpr", "Date", "Time"
    );
    println!("{}", "-".repeat(70));

    let mut total_uncompressed = 0u64;
    let mut total_compressed = 0u64;
    let mut file_count = 0;

    for entry in &entries {
        if entry.is_directory {
            continue;
        }
        // CRC-check every entry while listing
        archive.extract(entry)?;

        let (year, month, day) = entry.mod_date();
        let (hour, minute, _second) = entry.mod_time();
        println!(
            "{:>10}  {:>10}  {}  {:04}-{:02}-{:02}  {:02}:{:02}  {}",
            entry.uncompressed_size,
            entry.compressed_size,
            ratio(entry.compressed_size, entry.uncompressed_size),
            year,
            month,
            day,
            hour,
            minute,
            entry.file_name
        );

        total_uncompressed += entry.uncompressed_size;
        total_compressed += entry.compressed_size;
        file_count += 1;
    }

    println!("{}", "-".repeat(70));
    println!(
        "{:>10}  {:>10}  {}  {:>21}  {} files",
        total_uncompressed,
        total_compressed,
        ratio(total_compressed, total_uncompressed),
        "",
        file_count
    );

    Ok(())
}

/// Compression ratio as percentage saved.
fn ratio(compressed: u64, uncompressed: u64) -> String {
    if uncompressed > 0 {
        format!("{:>4}%", 100 - (compressed * 100 / uncompressed))
    } else {
        "  0%".to_string()
    }
}

/// Format a byte size into a human-readable string.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(format_size(500), "500 bytes");
/// assert_eq!(format_size(1536), "1.50 KB");
/// ```
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}
