//! Mapping request paths onto files under the static root.

use std::path::{Component, Path, PathBuf};

use percent_encoding::percent_decode_str;

use crate::routing::AssetLookup;

/// A document root. The full request path is appended to it, so
/// `/image/1.png` resolves to `<root>/image/1.png`.
#[derive(Debug, Clone)]
pub struct StaticRoot {
    root: PathBuf,
}

impl StaticRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve `path` to a regular file inside the root.
    ///
    /// Returns `None` for anything that is missing, is not a regular file,
    /// or would escape the root (including through symlinks).
    pub fn resolve(&self, path: &str) -> Option<PathBuf> {
        let relative = sanitize(path)?;

        let root = match self.root.canonicalize() {
            Ok(root) => root,
            Err(e) => {
                tracing::debug!(root = %self.root.display(), error = %e, "Static root unavailable");
                return None;
            }
        };

        let candidate = root.join(relative).canonicalize().ok()?;
        if !candidate.starts_with(&root) {
            tracing::warn!(path, resolved = %candidate.display(), "Path traversal attempt blocked");
            return None;
        }

        let metadata = std::fs::metadata(&candidate).ok()?;
        metadata.is_file().then_some(candidate)
    }
}

impl AssetLookup for StaticRoot {
    fn lookup(&self, path: &str) -> Option<PathBuf> {
        self.resolve(path)
    }
}

/// Turn a URI path into a relative filesystem path made only of normal segments.
///
/// The path is percent-decoded first, so encoded traversal such as
/// `%2e%2e` is refused like its literal form.
fn sanitize(path: &str) -> Option<PathBuf> {
    let path = percent_decode_str(path).decode_utf8().ok()?;
    if path.contains('\0') || path.contains('\\') {
        return None;
    }

    let trimmed = path.trim_start_matches('/');
    if trimmed.is_empty() || trimmed.ends_with('/') {
        return None;
    }

    let mut relative = PathBuf::new();
    for component in Path::new(trimmed).components() {
        match component {
            Component::Normal(segment) => relative.push(segment),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    (!relative.as_os_str().is_empty()).then_some(relative)
}
