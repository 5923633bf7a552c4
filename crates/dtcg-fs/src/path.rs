//! Normalized path handling for token files
//!
//! Token files reference each other by relative paths written in JSON, so
//! paths are kept as forward-slash strings internally and only converted to
//! platform-native form at I/O boundaries.

use std::path::{Path, PathBuf};

/// A token-file path stored with forward slashes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NormalizedPath {
    inner: String,
}

impl NormalizedPath {
    /// Backslashes become forward slashes; nothing else is rewritten.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            inner: path.as_ref().to_string_lossy().replace('\\', "/"),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Platform-native form for I/O.
    pub fn to_native(&self) -> PathBuf {
        PathBuf::from(&self.inner)
    }

    /// Append a segment. An empty or `.` base yields the segment unchanged,
    /// so references from files at the project root stay relative.
    pub fn join(&self, segment: &str) -> Self {
        let segment = segment.replace('\\', "/");
        let inner = match self.inner.as_str() {
            "" | "." => segment,
            base if base.ends_with('/') => format!("{base}{segment}"),
            base => format!("{base}/{segment}"),
        };
        Self { inner }
    }

    /// Containing directory; `None` for a bare file name.
    pub fn parent(&self) -> Option<Self> {
        let trimmed = self.inner.trim_end_matches('/');
        let (dir, _) = trimmed.rsplit_once('/')?;
        let inner = if dir.is_empty() { "/" } else { dir };
        Some(Self {
            inner: inner.to_string(),
        })
    }

    pub fn file_name(&self) -> Option<&str> {
        let trimmed = self.inner.trim_end_matches('/');
        trimmed.rsplit('/').next().filter(|name| !name.is_empty())
    }

    /// Extension of the file name; dotfiles have none.
    pub fn extension(&self) -> Option<&str> {
        match self.file_name()?.rsplit_once('.')? {
            ("", _) => None,
            (_, extension) => Some(extension),
        }
    }

    /// Whether the path is absolute (leading `/` or a drive letter).
    pub fn is_absolute(&self) -> bool {
        self.inner.starts_with('/')
            || (self.inner.len() >= 2 && self.inner.as_bytes()[1] == b':')
    }

    /// Lexically resolve `.` and `..` segments.
    ///
    /// Leading `..` segments of a relative path are kept, since there is
    /// nothing to pop them against.
    pub fn normalize(&self) -> Self {
        let absolute = self.inner.starts_with('/');
        let mut parts: Vec<&str> = Vec::new();
        for segment in self.inner.split('/') {
            match segment {
                "" | "." => {}
                ".." => match parts.last() {
                    Some(&last) if last != ".." => {
                        parts.pop();
                    }
                    _ if absolute => {}
                    _ => parts.push(".."),
                },
                other => parts.push(other),
            }
        }
        let joined = parts.join("/");
        let inner = if absolute {
            format!("/{joined}")
        } else {
            joined
        };
        Self { inner }
    }

    /// Resolve `reference` relative to the directory containing this file.
    ///
    /// Absolute references are returned normalized and unchanged otherwise.
    pub fn resolve_sibling(&self, reference: &str) -> Self {
        let reference = Self::new(reference);
        if reference.is_absolute() {
            return reference.normalize();
        }
        match self.parent() {
            Some(dir) => dir.join(reference.as_str()).normalize(),
            None => reference.normalize(),
        }
    }
}

impl AsRef<Path> for NormalizedPath {
    fn as_ref(&self) -> &Path {
        Path::new(&self.inner)
    }
}

impl std::fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_dot_segments() {
        let path = NormalizedPath::new("tokens/./themes/../base.json");
        assert_eq!(path.normalize().as_str(), "tokens/base.json");
    }

    #[test]
    fn normalize_keeps_leading_parent_segments() {
        let path = NormalizedPath::new("../shared/colors.json");
        assert_eq!(path.normalize().as_str(), "../shared/colors.json");
    }

    #[test]
    fn resolve_sibling_uses_containing_directory() {
        let file = NormalizedPath::new("themes/dark.json");
        assert_eq!(
            file.resolve_sibling("../base.json").as_str(),
            "base.json"
        );
        assert_eq!(
            file.resolve_sibling("palette.json").as_str(),
            "themes/palette.json"
        );
    }

    #[test]
    fn resolve_sibling_at_root_stays_relative() {
        let file = NormalizedPath::new("base.json");
        assert_eq!(file.resolve_sibling("dark.json").as_str(), "dark.json");
    }

    #[test]
    fn backslashes_are_normalized() {
        let path = NormalizedPath::new("themes\\dark.json");
        assert_eq!(path.as_str(), "themes/dark.json");
        assert_eq!(path.extension(), Some("json"));
        assert_eq!(path.file_name(), Some("dark.json"));
    }
}
