//! Request path resolution
//!
//! Maps a URL path onto the serving root. Resolution is purely lexical; the
//! caller still canonicalizes the result to catch symlinks that leave the root.

use crate::error::PathError;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::path::{Component, Path, PathBuf};

/// Characters left unescaped when a decoded path is turned back into a URL
const URL_PATH_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/');

/// A request path mapped onto the filesystem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTarget {
    /// Candidate path, lexically inside the root
    pub fs_path: PathBuf,
    /// Decoded, normalized URL path (always starts with `/`)
    pub url_path: String,
    /// Whether the request path ended with `/`
    pub trailing_slash: bool,
}

/// Resolve `uri_path` (as received, percent-encoded, without query) against `root`
pub fn resolve(root: &Path, uri_path: &str) -> Result<RequestTarget, PathError> {
    let decoded = percent_decode_str(uri_path)
        .decode_utf8()
        .map_err(|_| PathError::InvalidEncoding)?;

    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(PathError::Traversal);
                }
            }
            s => {
                check_segment(s)?;
                segments.push(s);
            }
        }
    }

    let mut fs_path = root.to_path_buf();
    fs_path.extend(&segments);

    let trailing_slash = decoded.ends_with('/');
    let mut url_path = format!("/{}", segments.join("/"));
    if trailing_slash && !segments.is_empty() {
        url_path.push('/');
    }

    Ok(RequestTarget {
        fs_path,
        url_path,
        trailing_slash,
    })
}

/// Percent-encode a decoded path for use in `href` or `Location`
pub fn encode_url_path(path: &str) -> String {
    utf8_percent_encode(path, URL_PATH_SET).to_string()
}

/// A segment must name exactly one normal path component on this platform
fn check_segment(segment: &str) -> Result<(), PathError> {
    if segment.contains(['\0', '\\']) {
        return Err(PathError::ForbiddenCharacter);
    }
    let mut components = Path::new(segment).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(PathError::ForbiddenCharacter),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> PathBuf {
        PathBuf::from("/srv/www")
    }

    #[test]
    fn test_root_path() {
        let target = resolve(&root(), "/").unwrap();
        assert_eq!(target.fs_path, root());
        assert_eq!(target.url_path, "/");
        assert!(target.trailing_slash);
    }

    #[test]
    fn test_nested_file() {
        let target = resolve(&root(), "/css/site.css").unwrap();
        assert_eq!(target.fs_path, root().join("css").join("site.css"));
        assert_eq!(target.url_path, "/css/site.css");
        assert!(!target.trailing_slash);
    }

    #[test]
    fn test_dot_segments_are_normalized() {
        let target = resolve(&root(), "/a/./b/../c.txt").unwrap();
        assert_eq!(target.fs_path, root().join("a").join("c.txt"));
        assert_eq!(target.url_path, "/a/c.txt");

        let target = resolve(&root(), "//docs//").unwrap();
        assert_eq!(target.fs_path, root().join("docs"));
        assert_eq!(target.url_path, "/docs/");
        assert!(target.trailing_slash);
    }

    #[test]
    fn test_traversal_is_rejected() {
        assert_eq!(resolve(&root(), "/../secret"), Err(PathError::Traversal));
        assert_eq!(
            resolve(&root(), "/../../etc/passwd"),
            Err(PathError::Traversal)
        );
        assert_eq!(resolve(&root(), "/a/../../b"), Err(PathError::Traversal));
        assert_eq!(resolve(&root(), "/%2e%2e/secret"), Err(PathError::Traversal));
        assert_eq!(resolve(&root(), "/a%2F..%2F..%2Fx"), Err(PathError::Traversal));
    }

    #[test]
    fn test_percent_decoding() {
        let target = resolve(&root(), "/my%20file.txt").unwrap();
        assert_eq!(target.fs_path, root().join("my file.txt"));

        let target = resolve(&root(), "/caf%C3%A9").unwrap();
        assert_eq!(target.fs_path, root().join("café"));
    }

    #[test]
    fn test_invalid_utf8_is_rejected() {
        assert_eq!(resolve(&root(), "/%ff"), Err(PathError::InvalidEncoding));
    }

    #[test]
    fn test_forbidden_characters() {
        assert_eq!(
            resolve(&root(), "/a%00b"),
            Err(PathError::ForbiddenCharacter)
        );
        assert_eq!(
            resolve(&root(), "/a%5C..%5Cb"),
            Err(PathError::ForbiddenCharacter)
        );
    }

    #[test]
    fn test_encode_url_path() {
        assert_eq!(encode_url_path("/docs/my file.txt"), "/docs/my%20file.txt");
        assert_eq!(encode_url_path("/a-b_c.~d/"), "/a-b_c.~d/");
        assert_eq!(encode_url_path("/?#"), "/%3F%23");
    }

    #[test]
    fn test_result_stays_under_root() {
        for path in ["/", "/a", "/a/b/../c", "/./x/", "/%2e/y", "/.../z"] {
            let target = resolve(&root(), path).unwrap();
            assert!(target.fs_path.starts_with(root()), "{path}");
        }
    }
}
