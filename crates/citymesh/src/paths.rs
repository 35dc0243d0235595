//! Sibling-file naming for multi-file outputs.

use std::path::{Path, PathBuf};

/// Swap the extension of `path` for `ext` (given without the dot). A name
/// without an extension gets `ext` appended.
#[inline]
pub fn replace_extension<P: AsRef<Path>>(path: P, ext: &str) -> PathBuf {
    path.as_ref().with_extension(ext)
}

/// Final path component, used for relative references between sibling files.
pub fn file_name_only<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    path.file_name()
        .unwrap_or(path.as_os_str())
        .to_string_lossy()
        .into_owned()
}
