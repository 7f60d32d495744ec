//! Image records handed over by the transformation tools, and the
//! archive naming policy applied to them.
//!
//! ## Naming
//!
//! Every entry is named `<prefix>_<name>`, where the prefix identifies
//! the tool that produced the image:
//! - `watermark_cat.jpg`
//! - `resize_cat.jpg`
//! - `convert_cat.jpg.webp` (converter records append the target format)
//!
//! Paths already taken earlier in the same request get ` (n)` inserted
//! before the extension: `watermark_cat (1).jpg`.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Archive name used when the caller does not supply one.
pub const DEFAULT_ARCHIVE_NAME: &str = "images.zip";

/// Fields every tool's image carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseImage {
    /// Handle to the full-resolution image (usually a data URL)
    pub original: String,
    /// Handle to the preview image; never read by export
    #[serde(default)]
    pub thumbnail: String,
    /// Display file name
    pub name: String,
}

impl BaseImage {
    pub fn new(original: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            original: original.into(),
            thumbnail: String::new(),
            name: name.into(),
        }
    }

    pub fn with_thumbnail(mut self, thumbnail: impl Into<String>) -> Self {
        self.thumbnail = thumbnail.into();
        self
    }
}

/// Which tool produced an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "lowercase")]
pub enum Variant {
    Watermark,
    /// Dimensions are informational; tools may report fractional sizes
    Resize {
        width: f64,
        height: f64,
    },
    Convert {
        /// Target format, e.g. `webp` or `image/webp`
        #[serde(rename = "type")]
        format: String,
    },
}

impl Variant {
    /// Prefix that keeps entries from different tools apart.
    pub fn prefix(&self) -> &'static str {
        match self {
            Variant::Watermark => "watermark",
            Variant::Resize { .. } => "resize",
            Variant::Convert { .. } => "convert",
        }
    }

    /// Extension appended to the entry name. Only converter records have one.
    pub fn extension(&self) -> Option<String> {
        match self {
            Variant::Convert { format } => normalize_extension(format),
            _ => None,
        }
    }
}

/// One image ready for export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    #[serde(flatten)]
    pub base: BaseImage,
    #[serde(flatten)]
    pub variant: Variant,
}

impl ImageRecord {
    pub fn watermark(base: BaseImage) -> Self {
        Self {
            base,
            variant: Variant::Watermark,
        }
    }

    pub fn resize(base: BaseImage, width: impl Into<f64>, height: impl Into<f64>) -> Self {
        Self {
            base,
            variant: Variant::Resize {
                width: width.into(),
                height: height.into(),
            },
        }
    }

    pub fn convert(base: BaseImage, format: impl Into<String>) -> Self {
        Self {
            base,
            variant: Variant::Convert {
                format: format.into(),
            },
        }
    }

    /// Handle the payload is materialized from.
    pub fn source(&self) -> &str {
        &self.base.original
    }

    pub fn name(&self) -> &str {
        &self.base.name
    }

    /// Entry name before duplicate disambiguation.
    pub fn archive_path(&self) -> String {
        let name = sanitize_name(&self.base.name);
        match self.variant.extension() {
            Some(ext) => format!("{}_{}.{}", self.variant.prefix(), name, ext),
            None => format!("{}_{}", self.variant.prefix(), name),
        }
    }
}

/// Unit of work: one request yields one archive or one error.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRequest {
    pub records: Vec<ImageRecord>,
    pub archive_name: String,
}

impl ExportRequest {
    pub fn new(records: Vec<ImageRecord>) -> Self {
        Self {
            records,
            archive_name: DEFAULT_ARCHIVE_NAME.to_string(),
        }
    }

    pub fn with_archive_name(mut self, archive_name: impl Into<String>) -> Self {
        self.archive_name = archive_name.into();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Unique archive paths, one per record, in input order.
    pub fn archive_paths(&self) -> Vec<String> {
        let mut taken = HashSet::with_capacity(self.records.len());
        self.records
            .iter()
            .map(|record| {
                let path = disambiguate(record.archive_path(), &taken);
                taken.insert(path.clone());
                path
            })
            .collect()
    }
}

/// Keep every entry at the archive root.
fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect();

    if cleaned.trim().is_empty() {
        "image".to_string()
    } else {
        cleaned
    }
}

/// `"image/webp"`, `".WEBP"` and `"webp"` all become `webp`.
fn normalize_extension(format: &str) -> Option<String> {
    let format = format.trim();
    let format = format.strip_prefix("image/").unwrap_or(format);
    let format = format.trim_start_matches('.');
    let ext: String = format
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | '\0'))
        .collect::<String>()
        .to_ascii_lowercase();

    (!ext.is_empty()).then_some(ext)
}

fn disambiguate(path: String, taken: &HashSet<String>) -> String {
    if !taken.contains(&path) {
        return path;
    }

    // split on the last dot, ignoring a leading one
    let (stem, ext) = match path.rfind('.') {
        Some(dot) if dot > 0 => path.split_at(dot),
        _ => (path.as_str(), ""),
    };

    let mut n = 1;
    loop {
        let candidate = format!("{} ({}){}", stem, n, ext);
        if !taken.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(name: &str) -> BaseImage {
        BaseImage::new("data:,x", name)
    }

    #[test]
    fn prefixes_by_variant() {
        assert_eq!(
            ImageRecord::watermark(base("cat.jpg")).archive_path(),
            "watermark_cat.jpg"
        );
        assert_eq!(
            ImageRecord::resize(base("cat.jpg"), 640, 480).archive_path(),
            "resize_cat.jpg"
        );
        assert_eq!(
            ImageRecord::convert(base("cat.jpg"), "webp").archive_path(),
            "convert_cat.jpg.webp"
        );
    }

    #[test]
    fn normalizes_converter_format() {
        assert_eq!(
            ImageRecord::convert(base("a"), "image/PNG").archive_path(),
            "convert_a.png"
        );
        assert_eq!(
            ImageRecord::convert(base("a"), ".jpeg").archive_path(),
            "convert_a.jpeg"
        );
        assert_eq!(
            ImageRecord::convert(base("a"), "  ").archive_path(),
            "convert_a"
        );
    }

    #[test]
    fn sanitizes_names() {
        assert_eq!(
            ImageRecord::watermark(base("../../etc/passwd")).archive_path(),
            "watermark_.._.._etc_passwd"
        );
        assert_eq!(
            ImageRecord::watermark(base("")).archive_path(),
            "watermark_image"
        );
    }

    #[test]
    fn cross_variant_names_do_not_collide() {
        let request = ExportRequest::new(vec![
            ImageRecord::watermark(base("a.png")),
            ImageRecord::convert(base("a.png"), "png"),
            ImageRecord::resize(base("a.png"), 1, 1),
        ]);
        assert_eq!(
            request.archive_paths(),
            ["watermark_a.png", "convert_a.png.png", "resize_a.png"]
        );
    }

    #[test]
    fn same_variant_duplicates_are_numbered_in_order() {
        let request = ExportRequest::new(vec![
            ImageRecord::watermark(base("a.png")),
            ImageRecord::watermark(base("a.png")),
            ImageRecord::watermark(base("a.png")),
            ImageRecord::watermark(base("noext")),
            ImageRecord::watermark(base("noext")),
        ]);
        assert_eq!(
            request.archive_paths(),
            [
                "watermark_a.png",
                "watermark_a (1).png",
                "watermark_a (2).png",
                "watermark_noext",
                "watermark_noext (1)",
            ]
        );
    }

    #[test]
    fn numbered_name_already_present_is_skipped() {
        let request = ExportRequest::new(vec![
            ImageRecord::watermark(base("a (1).png")),
            ImageRecord::watermark(base("a.png")),
            ImageRecord::watermark(base("a.png")),
        ]);
        assert_eq!(
            request.archive_paths(),
            ["watermark_a (1).png", "watermark_a.png", "watermark_a (2).png"]
        );
    }

    #[test]
    fn default_archive_name() {
        assert_eq!(ExportRequest::new(vec![]).archive_name, "images.zip");
        assert_eq!(
            ExportRequest::new(vec![])
                .with_archive_name("out.zip")
                .archive_name,
            "out.zip"
        );
    }

    #[test]
    fn deserializes_tool_records() {
        let json = r#"[
            {"variant": "watermark", "original": "data:,a", "thumbnail": "data:,t", "name": "a.jpg"},
            {"variant": "resize", "original": "data:,b", "name": "b.jpg", "width": 100, "height": 50},
            {"variant": "convert", "original": "data:,c", "name": "c", "type": "webp"}
        ]"#;
        let records: Vec<ImageRecord> = serde_json::from_str(json).unwrap();

        assert_eq!(records[0].variant, Variant::Watermark);
        assert_eq!(records[0].base.thumbnail, "data:,t");
        assert_eq!(
            records[1].variant,
            Variant::Resize {
                width: 100.0,
                height: 50.0
            }
        );
        assert_eq!(records[1].base.thumbnail, "");
        assert_eq!(records[2].archive_path(), "convert_c.webp");
    }

    #[test]
    fn accepts_fractional_resize_dimensions() {
        let json = r#"[{"variant": "resize", "original": "data:,b", "name": "b.jpg", "width": 640.5, "height": 359.75}]"#;
        let records: Vec<ImageRecord> = serde_json::from_str(json).unwrap();

        assert_eq!(
            records[0].variant,
            Variant::Resize {
                width: 640.5,
                height: 359.75
            }
        );
        assert_eq!(records[0].archive_path(), "resize_b.jpg");
    }
}
