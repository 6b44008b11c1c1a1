use std::path::PathBuf;

/// Top-level error type. `extract_thumbnail` and the CLI report this.
#[derive(Debug, thiserror::Error)]
pub enum ThumbError {
    #[error("Invalid archive {}: {detail}", .path.display())]
    InvalidArchive { path: PathBuf, detail: String },

    #[error("No cover image found in {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("Could not decode cover image '{entry}': {source}")]
    Decode {
        entry: String,
        #[source]
        source: image::ImageError,
    },

    #[error("Could not encode thumbnail for '{entry}': {source}")]
    Encode {
        entry: String,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ThumbError {
    /// Name of the failure kind, as shown to the user.
    pub fn kind(&self) -> &'static str {
        match self {
            ThumbError::InvalidArchive { .. } => "InvalidArchiveError",
            ThumbError::NotFound { .. } => "NotFoundError",
            ThumbError::Decode { .. } => "DecodeError",
            ThumbError::Encode { .. } | ThumbError::Io { .. } => "IOError",
        }
    }

    pub(crate) fn invalid_archive(path: impl Into<PathBuf>, err: ArchiveError) -> Self {
        ThumbError::InvalidArchive {
            path: path.into(),
            detail: err.to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("Invalid ZIP archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Missing required file: {0}")]
    MissingEntry(String),

    #[error("Malformed {file}: {detail}")]
    Malformed { file: String, detail: String },

    #[error(transparent)]
    Security(#[from] SecurityError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum SecurityError {
    #[error("Path traversal detected in archive entry: {path}")]
    PathTraversal { path: String },

    #[error("Archive contains {count} files, exceeding limit of {limit}")]
    TooManyFiles { count: u64, limit: u64 },

    #[error("Resource {name} is {size_mb}MB, exceeding limit of {limit_mb}MB")]
    OversizedResource {
        name: String,
        size_mb: u64,
        limit_mb: u64,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
