//! Repository path validation.
//!
//! Repository paths are always `/`-separated regardless of the host platform,
//! so this works on strings rather than [`std::path::Path`].

use crate::error::{ErrorKind, Result};

/// Validates a repository-relative path for security and correctness.
/// Ensures that paths don't escape the repository root (no `..` traversal).
///
/// > **Note:** This does **not** normalize backslashes or Unicode. Null bytes
/// >           are explicitly rejected.
///
/// # Returns
/// Returns the normalized path if valid, or [`InvalidPath`](crate::error::ErrorKind::InvalidPath)
/// if invalid.
///
/// # Examples
///
/// ```
/// use bookshelf_storage::validate_path;
/// // Valid paths
/// assert!(validate_path("Alpha/01.png").is_ok());
/// assert!(validate_path("a/b/c/page.webp").is_ok());
/// assert!(validate_path("a/../page.png").is_ok()); // (never leaves repository root)
/// // Invalid paths
/// assert!(validate_path("../secrets").is_err());
/// assert!(validate_path("a/../../b").is_err()); // (leaves repository root)
/// assert!(validate_path("a\0b").is_err());
/// // Paths get resolved
/// assert_eq!(
///     validate_path("wrong/../still-wrong/.././correct//./page.png/").unwrap(),
///     "correct/page.png"
/// );
/// ```
pub fn validate(path: impl AsRef<str>) -> Result<String> {
    let path = path.as_ref();
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {},
            ".." => {
                if segments.pop().is_none() {
                    exn::bail!(ErrorKind::InvalidPath(path.to_string()));
                }
            },
            // Null bytes survive a round trip through the Hub but break
            // anything C-based on the other side.
            s if s.contains('\0') => exn::bail!(ErrorKind::InvalidPath(path.to_string())),
            s => segments.push(s),
        }
    }
    match segments.is_empty() {
        true => exn::bail!(ErrorKind::InvalidPath(path.to_string())),
        false => Ok(segments.join("/")),
    }
}

/// Validates that `name` is usable as exactly one path segment.
///
/// ```
/// use bookshelf_storage::validate_segment;
/// assert!(validate_segment("My_Book").is_ok());
/// assert!(validate_segment("a/b").is_err());
/// assert!(validate_segment("..").is_err());
/// ```
pub fn validate_segment(name: impl AsRef<str>) -> Result<String> {
    let name = name.as_ref();
    let valid = validate(name)?;
    // Anything that normalized differently ("a/", "./a") or still has a
    // separator in it is not a single segment.
    if valid != name || valid.contains('/') {
        exn::bail!(ErrorKind::InvalidPath(name.to_string()));
    }
    Ok(valid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_paths() {
        assert_eq!(validate("Alpha/01.png").unwrap(), "Alpha/01.png");
        assert_eq!(validate("a/b/c/page.webp").unwrap(), "a/b/c/page.webp");
        assert_eq!(validate("loose.png").unwrap(), "loose.png");
        assert_eq!(validate("漫画/表紙.jpg").unwrap(), "漫画/表紙.jpg");
    }

    #[test]
    fn test_path_normalization() {
        // Double slashes are normalized
        assert_eq!(validate("a//b//c").unwrap(), "a/b/c");
        // Current directory references removed
        assert_eq!(validate("a/./b/./c").unwrap(), "a/b/c");
        // Leading slash is not part of a repository path
        assert_eq!(validate("/a/b").unwrap(), "a/b");
    }

    #[test]
    fn test_traversal_attempts() {
        assert!(validate("../etc/passwd").is_err());
        assert!(validate("a/../../b").is_err());
        assert!(validate("..").is_err());
        assert!(validate("../..").is_err());
    }

    #[test]
    fn test_reverse_attempts() {
        // Traversal remains within repository root
        assert_eq!(validate("a/b/..").unwrap(), "a");
    }

    #[test]
    fn test_invalid_characters() {
        assert!(validate("a\0b").is_err());
        assert!(validate("\0").is_err());
    }

    #[test]
    fn test_empty_paths() {
        assert!(validate("").is_err());
        assert!(validate(".").is_err());
        assert!(validate("./").is_err());
        assert!(validate("./.").is_err());
        assert!(validate("//").is_err());
    }

    #[test]
    fn test_trailing_slashes() {
        assert_eq!(validate("Alpha/").unwrap(), "Alpha");
        assert_eq!(validate("Alpha///").unwrap(), "Alpha");
    }

    #[test]
    fn test_segments() {
        assert_eq!(validate_segment("My_Book__2025").unwrap(), "My_Book__2025");
        assert!(validate_segment("a/b").is_err());
        assert!(validate_segment("a/").is_err());
        assert!(validate_segment(".").is_err());
        assert!(validate_segment("").is_err());
    }
}
