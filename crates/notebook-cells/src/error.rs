use std::path::PathBuf;

/// Errors raised at the file boundary of a conversion.
///
/// Malformed flat text is never an error; unmatched regions are skipped.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// The notebook is missing, not JSON, or not a supported nbformat version.
    #[error("Failed to read notebook {path:?}: {reason}")]
    Read { path: PathBuf, reason: String },

    /// The notebook could not be serialized or the destination is unwritable.
    #[error("Failed to write notebook {path:?}: {reason}")]
    Write { path: PathBuf, reason: String },
}
