//! Archive extension inference
//!
//! Artifacts travel as single archive files. The extension of a staged file is
//! a pure function of the object key suffix.

/// Recognized archive suffixes, most specific first
pub const ARCHIVE_EXTENSIONS: [&str; 4] = [".tar.gz", ".zip", ".tar", ".tgz"];

/// Returns the archive extension the key ends with, or `""` when unknown
///
/// Longer suffixes are tried first so `.tar.gz` is never taken for `.gz` or `.tar`.
pub fn archive_extension(key: &str) -> &'static str {
    ARCHIVE_EXTENSIONS
        .iter()
        .copied()
        .find(|ext| key.ends_with(ext))
        .unwrap_or("")
}

pub fn has_archive_extension(path: &str) -> bool {
    !archive_extension(path).is_empty()
}

/// Strips a recognized archive extension, leaving unknown suffixes alone
pub fn strip_archive_extension(name: &str) -> &str {
    let ext = archive_extension(name);
    &name[..name.len() - ext.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_extensions() {
        assert_eq!(archive_extension("p/src/abc.zip"), ".zip");
        assert_eq!(archive_extension("p/src/abc.tar"), ".tar");
        assert_eq!(archive_extension("p/src/abc.tar.gz"), ".tar.gz");
        assert_eq!(archive_extension("p/src/abc.tgz"), ".tgz");
    }

    #[test]
    fn test_unknown_extension_is_empty() {
        assert_eq!(archive_extension("p/src/Xyz12ab"), "");
        assert_eq!(archive_extension("p/src/file.gz"), "");
        assert_eq!(archive_extension("p/src/file.ZIP"), "");
        assert!(!has_archive_extension("dist/app.jar"));
    }

    #[test]
    fn test_strip_then_reappend_keeps_suffix_class() {
        for key in [
            "a/b/app.zip",
            "a/b/app.tar",
            "a/b/app.tar.gz",
            "a/b/app.tgz",
            "a/b/app.bin",
        ] {
            let ext = archive_extension(key);
            let rebuilt = format!("{}{}", strip_archive_extension(key), ext);
            assert_eq!(rebuilt, key);
            assert_eq!(archive_extension(&rebuilt), ext);
        }
    }

    #[test]
    fn test_strip_archive_extension() {
        assert_eq!(strip_archive_extension("web.tar.gz"), "web");
        assert_eq!(strip_archive_extension("web.tgz"), "web");
        assert_eq!(strip_archive_extension("web.jar"), "web.jar");
    }
}
