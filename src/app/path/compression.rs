//! Match resolved paths against the compression state of files on disk

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::constants::templates::COMPRESSION_SUFFIXES;
use crate::errors::{PathError, PathResult};

fn has_glob_chars(path: &str) -> bool {
    path.contains(['*', '?', '['])
}

/// Whether a path, possibly containing wildcards, matches anything on disk
pub fn path_exists(path: &str) -> PathResult<bool> {
    if has_glob_chars(path) {
        Ok(glob::glob(path)?.filter_map(Result::ok).next().is_some())
    } else {
        Ok(Path::new(path).exists())
    }
}

/// Strip a recognized compression suffix
pub fn strip_compression(path: &str) -> Option<&str> {
    COMPRESSION_SUFFIXES
        .iter()
        .find_map(|suffix| path.strip_suffix(suffix))
}

/// Adjust the extension of a resolved path to what exists on disk
///
/// Preference order: the path itself, its decompressed form when it carries a
/// compression suffix, then the single compressed variant of an uncompressed
/// path. When nothing exists the path is returned unchanged.
pub fn adjust_compression(path: &str) -> PathResult<String> {
    if path_exists(path)? {
        return Ok(path.to_string());
    }

    if let Some(stripped) = strip_compression(path) {
        if path_exists(stripped)? {
            debug!("Using uncompressed variant {}", stripped);
            return Ok(stripped.to_string());
        }
        return Ok(path.to_string());
    }

    let mut variants = Vec::new();
    for suffix in COMPRESSION_SUFFIXES {
        let candidate = format!("{}{}", path, suffix);
        if path_exists(&candidate)? {
            variants.push(candidate);
        }
    }

    match variants.len() {
        0 => Ok(path.to_string()),
        1 => {
            debug!("Using compressed variant {}", variants[0]);
            Ok(variants.remove(0))
        }
        _ => Err(PathError::AmbiguousCompression {
            path: PathBuf::from(path),
            variants: variants.into_iter().map(PathBuf::from).collect(),
        }),
    }
}
