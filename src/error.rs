//! Error types for the export pipeline
//!
//! Every failure of one export surfaces as a single [`ExportError`]:
//! - a record whose handle could not be resolved to bytes
//! - a request with no records
//! - archive encoding failures
//! - a save target that rejected the finished archive

/// Boxed error carried as the source of resolver and delivery failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Export failure, returned by [`Exporter::export`](crate::Exporter::export)
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// One record could not be materialized; the whole export is aborted
    #[error("failed to materialize {name}: {source}")]
    Materialization {
        /// Position of the record in the request
        index: usize,
        /// Display name of the offending record
        name: String,
        #[source]
        source: BoxError,
    },

    /// The request contained no records
    #[error("export request contains no images")]
    Empty,

    /// Archive encoding failed after every record was materialized
    #[error("failed to assemble archive: {0}")]
    Assembly(#[from] AssemblyError),

    /// The save target rejected the finished archive
    #[error("failed to deliver {archive}: {source}")]
    Delivery {
        /// Suggested archive file name
        archive: String,
        #[source]
        source: BoxError,
    },
}

/// Coarse classification of an [`ExportError`] for host messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Materialization,
    Empty,
    Assembly,
    Delivery,
}

impl ExportError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Materialization { .. } => ErrorKind::Materialization,
            Self::Empty => ErrorKind::Empty,
            Self::Assembly(_) => ErrorKind::Assembly,
            Self::Delivery { .. } => ErrorKind::Delivery,
        }
    }

    /// Display name of the record that failed, if a record was at fault
    #[must_use]
    pub fn failed_record(&self) -> Option<&str> {
        match self {
            Self::Materialization { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// Archive encoding failure
#[derive(Debug, thiserror::Error)]
pub enum AssemblyError {
    #[error("archive entry path is empty")]
    EmptyPath,

    #[error("duplicate archive entry: {0}")]
    DuplicatePath(String),

    #[error("archive entry name is too long: {0}")]
    NameTooLong(String),

    #[error("too many archive entries (limit {limit})")]
    TooManyEntries { limit: usize },

    #[error("archive entry {path} exceeds 4 GiB")]
    EntryTooLarge { path: String },

    #[error("archive exceeds 4 GiB")]
    ArchiveTooLarge,

    #[error("archive encoding failed: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn materialization_error_names_the_record() {
        let err = ExportError::Materialization {
            index: 2,
            name: "dog.png".to_string(),
            source: anyhow::anyhow!("invalid base64 payload").into(),
        };
        assert_eq!(err.kind(), ErrorKind::Materialization);
        assert_eq!(err.failed_record(), Some("dog.png"));
        assert_eq!(
            err.to_string(),
            "failed to materialize dog.png: invalid base64 payload"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn assembly_error_converts() {
        let err: ExportError = AssemblyError::ArchiveTooLarge.into();
        assert_eq!(err.kind(), ErrorKind::Assembly);
        assert_eq!(err.failed_record(), None);
    }
}
