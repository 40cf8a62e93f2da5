//! Document key sanitization.
//!
//! Client-supplied file names are used as keys under the storage root. They
//! are never allowed to escape it: names with path separators, NUL bytes, or
//! traversal components are rejected before any filesystem access.

use crate::errors::ServiceError;

/// The only file extension accepted for uploads, compared case-insensitively.
pub const ALLOWED_EXTENSION: &str = "json";

/// Validate a client-supplied document name and return it as a safe key.
pub fn sanitize(name: &str) -> Result<&str, ServiceError> {
    if name.is_empty() {
        return Err(ServiceError::InvalidName("empty file name".into()));
    }
    if name.contains(['/', '\\', '\0']) {
        return Err(ServiceError::InvalidName(format!(
            "file name {:?} contains a path separator",
            name
        )));
    }
    if name == "." || name == ".." {
        return Err(ServiceError::InvalidName(format!(
            "file name {:?} is a traversal component",
            name
        )));
    }
    // Quotes would corrupt the Content-Disposition filename parameter.
    if name.contains('"') {
        return Err(ServiceError::InvalidName(format!(
            "file name {:?} contains a quote",
            name
        )));
    }
    Ok(name)
}

/// Whether the name carries the accepted `.json` extension (case-insensitive).
pub fn has_allowed_extension(name: &str) -> bool {
    match name.rsplit_once('.') {
        Some((_, ext)) => ext.eq_ignore_ascii_case(ALLOWED_EXTENSION),
        None => false,
    }
}
