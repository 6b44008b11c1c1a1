//! Archive hardening: path traversal guards and resource limits applied while
//! reading EPUB entries.

use std::path::{Component, Path};

use crate::error::SecurityError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityLimits {
    /// Maximum number of entries allowed in an archive.
    pub max_file_count: u64,
    /// Maximum decompressed size of a single entry in bytes.
    pub max_resource_size_bytes: u64,
}

impl Default for SecurityLimits {
    fn default() -> Self {
        Self {
            max_file_count: 10_000,
            max_resource_size_bytes: 200 * 1024 * 1024, // 200 MB
        }
    }
}

/// Reject absolute entry names and names with `..` components.
pub fn check_path_traversal(entry_path: &str) -> Result<(), SecurityError> {
    let traversal = || SecurityError::PathTraversal {
        path: entry_path.to_string(),
    };

    if entry_path.starts_with('/') || entry_path.starts_with('\\') {
        return Err(traversal());
    }

    // C:\ and friends
    if entry_path.len() >= 2 && entry_path.as_bytes()[1] == b':' {
        return Err(traversal());
    }

    if Path::new(entry_path)
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(traversal());
    }

    Ok(())
}

pub fn check_file_count(count: u64, limits: &SecurityLimits) -> Result<(), SecurityError> {
    if count > limits.max_file_count {
        return Err(SecurityError::TooManyFiles {
            count,
            limit: limits.max_file_count,
        });
    }
    Ok(())
}

pub fn check_resource_size(
    name: &str,
    size_bytes: u64,
    limits: &SecurityLimits,
) -> Result<(), SecurityError> {
    if size_bytes > limits.max_resource_size_bytes {
        return Err(SecurityError::OversizedResource {
            name: name.to_string(),
            size_mb: size_bytes / (1024 * 1024),
            limit_mb: limits.max_resource_size_bytes / (1024 * 1024),
        });
    }
    Ok(())
}
