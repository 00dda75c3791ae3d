//! Virtual path utilities.
//!
//! Virtual paths are UTF-8, `/`-separated, and absolute once normalized.
//! Directory paths carry a trailing slash; file paths do not. Everything
//! here is a pure function over `&str`.

use crate::error::{VfsError, VfsResult};

/// Collapse `.`, `..`, and repeated separators, producing an absolute
/// path rooted at `/`.
///
/// A trailing slash survives exactly when the input's final meaningful
/// token was a directory marker or a collapsing `..`. Relative input is
/// anchored at the root; the empty string normalizes to `"/"`. A `..`
/// that would walk above the root is reported as
/// [`VfsError::PathEscapesRoot`], never folded into a valid path.
pub fn normalize(path: &str) -> VfsResult<String> {
    let mut parts: Vec<&str> = Vec::new();
    for seg in path.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                if parts.pop().is_none() {
                    return Err(VfsError::path_escapes_root(path));
                }
            }
            seg => parts.push(seg),
        }
    }

    let mut out = String::with_capacity(path.len() + 1);
    out.push('/');
    out.push_str(&parts.join("/"));
    if path.ends_with('/') && !parts.is_empty() {
        out.push('/');
    }
    Ok(out)
}

/// Map backslash separators to forward slashes.
pub fn to_unix_style(path: &str) -> String {
    path.replace('\\', "/")
}

/// Unix-style path with a guaranteed trailing slash (empty stays empty).
pub fn convert_dir_path(path: &str) -> String {
    let mut out = to_unix_style(path);
    if !out.is_empty() && !out.ends_with('/') {
        out.push('/');
    }
    out
}

/// Text before the first `/`, or the whole string if there is none.
pub fn first_segment(path: &str) -> &str {
    match path.find('/') {
        Some(i) => &path[..i],
        None => path,
    }
}

/// Prefix up to and including the last `/` — the containing directory in
/// backend-local coordinates. Empty when the path has no separator.
pub fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(i) => &path[..=i],
        None => "",
    }
}

/// Validate and normalize a mount point into directory form.
pub(crate) fn mount_point_path(raw: &str) -> VfsResult<String> {
    if raw.is_empty() {
        return Err(VfsError::invalid_path("empty mount point"));
    }
    normalize(&convert_dir_path(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_dot_dot_segments() {
        assert_eq!(
            normalize("aaa/bbb/ccc/../e/../../test.txt").unwrap(),
            "/aaa/test.txt"
        );
    }

    #[test]
    fn escape_above_root_is_an_error() {
        assert!(matches!(
            normalize("/a/b/c/d/e/../../../../../../"),
            Err(VfsError::PathEscapesRoot(_))
        ));
        assert!(matches!(normalize(".."), Err(VfsError::PathEscapesRoot(_))));
        assert!(matches!(
            normalize("a/../.."),
            Err(VfsError::PathEscapesRoot(_))
        ));
    }

    #[test]
    fn is_idempotent() {
        for p in [
            "aaa/bbb/ccc/../e/../../test.txt",
            "/a/b/",
            "a//b///c",
            "/",
            "",
            "./x/./y/",
            "/a/b/../",
        ] {
            let once = normalize(p).unwrap();
            assert_eq!(normalize(&once).unwrap(), once, "input {p:?}");
        }
    }

    #[test]
    fn root_forms() {
        assert_eq!(normalize("/").unwrap(), "/");
        assert_eq!(normalize("").unwrap(), "/");
        assert_eq!(normalize(".").unwrap(), "/");
        // A pop that lands exactly on the root is the root, not an escape.
        assert_eq!(normalize("/a/..").unwrap(), "/");
        assert_eq!(normalize("/a/../").unwrap(), "/");
    }

    #[test]
    fn trailing_slash_semantics() {
        assert_eq!(normalize("aaa/bbb/").unwrap(), "/aaa/bbb/");
        assert_eq!(normalize("aaa/bbb").unwrap(), "/aaa/bbb");
        // Collapsing `..` with a trailing marker keeps the directory form.
        assert_eq!(normalize("/a/b/../").unwrap(), "/a/");
        assert_eq!(normalize("/a/b/..").unwrap(), "/a");
        assert_eq!(normalize("a//").unwrap(), "/a/");
    }

    #[test]
    fn repeated_and_relative_separators() {
        assert_eq!(normalize("a//b///c").unwrap(), "/a/b/c");
        assert_eq!(normalize("relative/path").unwrap(), "/relative/path");
        assert_eq!(normalize("./x/y").unwrap(), "/x/y");
    }

    #[test]
    fn unix_style_conversion() {
        assert_eq!(to_unix_style(r"res\ui\icon.png"), "res/ui/icon.png");
        assert_eq!(convert_dir_path(r"res\ui"), "res/ui/");
        assert_eq!(convert_dir_path("res/ui/"), "res/ui/");
        assert_eq!(convert_dir_path(""), "");
    }

    #[test]
    fn structural_pieces() {
        assert_eq!(first_segment("a/b/c"), "a");
        assert_eq!(first_segment("solo"), "solo");
        assert_eq!(parent_dir("a/b/c.txt"), "a/b/");
        assert_eq!(parent_dir("c.txt"), "");
        assert_eq!(parent_dir("a/"), "a/");
    }

    #[test]
    fn mount_point_form() {
        assert_eq!(mount_point_path("/res").unwrap(), "/res/");
        assert_eq!(mount_point_path("res/gui").unwrap(), "/res/gui/");
        assert_eq!(mount_point_path("/").unwrap(), "/");
        assert!(mount_point_path("").is_err());
    }
}
