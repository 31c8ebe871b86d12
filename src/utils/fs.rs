//! Lexical path helpers.
//!
//! Nothing in this module touches the filesystem; see
//! [`path_validation`](super::path_validation) for the checks that do.

use std::path::{Component, Path, PathBuf};

/// Normalizes a path by collapsing `.` and `..` components.
///
/// `..` never climbs above the root or a drive prefix of an absolute path, so
/// `/a/../../b` normalizes to `/b` rather than escaping to a relative path.
/// For relative paths a leading `..` that cannot be collapsed is kept.
///
/// # Examples
///
/// ```rust
/// use codebase_mcp::utils::fs::normalize_path;
/// use std::path::{Path, PathBuf};
///
/// assert_eq!(normalize_path(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
/// assert_eq!(normalize_path(Path::new("/../etc")), PathBuf::from("/etc"));
/// ```
#[must_use]
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut components: Vec<Component<'_>> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match components.last() {
                Some(Component::Normal(_)) => {
                    components.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => components.push(component),
            },
            c => components.push(c),
        }
    }

    components.iter().collect()
}

/// Segment-aware containment check between two already-normalized paths.
///
/// Unlike a string prefix test, `/srv/root-other` is not inside `/srv/root`.
/// The root itself counts as inside.
#[must_use]
pub fn is_within(path: &Path, root: &Path) -> bool {
    path.starts_with(root)
}
