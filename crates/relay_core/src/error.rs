use thiserror::Error;

/// Extraction failures. Every variant is raised instead of returning a
/// truncated or out-of-range slice of the document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("container marker must not be empty")]
    EmptyMarker,
    #[error("opening marker {marker:?} not found in document")]
    MissingOpenMarker { marker: String },
    #[error("closing marker {marker:?} not found after byte {after}")]
    MissingCloseMarker { marker: String, after: usize },
    #[error("<{tag}> opened on line {line} is never closed")]
    UnclosedCell { tag: String, line: u64 },
    #[error("table has {found} header columns but rows are {expected} cells wide")]
    ColumnCountMismatch { expected: usize, found: usize },
    #[error("row width must be at least 1")]
    InvalidRowWidth,
}
