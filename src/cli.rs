use clap::Parser;

use crate::export::{DEFAULT_CONCURRENCY, ExportOptions};
use crate::record::DEFAULT_ARCHIVE_NAME;
use crate::zip::Compression;

#[derive(Parser, Debug)]
#[command(name = "imgzip")]
#[command(version)]
#[command(about = "Bundle exported images into a single ZIP archive", long_about = None)]
#[command(after_help = "Examples:\n  \
  imgzip images.json                 write images.zip from a record manifest\n  \
  imgzip images.json -o out.zip -d dist -l   write dist/out.zip and list it\n  \
  imgzip -p - < images.json > out.zip        read the manifest from stdin, archive to stdout")]
pub struct Cli {
    /// JSON manifest of image records, or `-` for stdin
    #[arg(value_name = "MANIFEST")]
    pub manifest: String,

    /// Archive file name
    #[arg(short = 'o', value_name = "NAME", default_value = DEFAULT_ARCHIVE_NAME)]
    pub output: String,

    /// Write the archive into DIR
    #[arg(short = 'd', value_name = "DIR")]
    pub output_dir: Option<String>,

    /// Write the archive to stdout, no messages
    #[arg(short = 'p')]
    pub pipe: bool,

    /// Images resolved at the same time
    #[arg(short = 'j', value_name = "N", default_value_t = DEFAULT_CONCURRENCY)]
    pub jobs: usize,

    /// Deflate entries (default: store)
    #[arg(short = 'z')]
    pub deflate: bool,

    /// Deflate level, 0-9
    #[arg(long, value_name = "LEVEL", default_value_t = 6, value_parser = clap::value_parser!(u32).range(0..=9))]
    pub level: u32,

    /// List the written archive
    #[arg(short = 'l', conflicts_with = "pipe")]
    pub list: bool,

    /// Quiet mode
    #[arg(short = 'q', action = clap::ArgAction::Count)]
    pub quiet: u8,

    /// More log output (-vv => debug)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn is_stdin(&self) -> bool {
        self.manifest == "-"
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet > 0 || self.pipe
    }

    pub fn export_options(&self) -> ExportOptions {
        let compression = if self.deflate {
            Compression::Deflate(self.level)
        } else {
            Compression::Stored
        };

        ExportOptions::default()
            .with_concurrency(self.jobs)
            .with_compression(compression)
    }

    /// Default log filter for the requested verbosity.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_export_defaults() {
        let cli = Cli::try_parse_from(["imgzip", "images.json"]).unwrap();
        assert_eq!(cli.output, "images.zip");
        assert_eq!(cli.export_options(), ExportOptions::default());
        assert!(!cli.is_quiet());
        assert_eq!(cli.log_level(), "warn");
    }

    #[test]
    fn maps_flags_onto_options() {
        let cli = Cli::try_parse_from([
            "imgzip", "-", "-o", "out.zip", "-j", "2", "-z", "--level", "9", "-p", "-vv",
        ])
        .unwrap();
        assert!(cli.is_stdin());
        assert!(cli.is_quiet());
        assert_eq!(cli.log_level(), "debug");

        let options = cli.export_options();
        assert_eq!(options.concurrency, 2);
        assert_eq!(options.compression, Compression::Deflate(9));
    }

    #[test]
    fn list_conflicts_with_pipe() {
        assert!(Cli::try_parse_from(["imgzip", "a.json", "-l", "-p"]).is_err());
        assert!(Cli::try_parse_from(["imgzip", "a.json", "--level", "10"]).is_err());
    }
}
