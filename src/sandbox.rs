//! Confines user-supplied paths to the served root directory.

use crate::error::{Error, Result};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

/// The directory boundary for every listing and tail request.
#[derive(Debug, Clone)]
pub struct Sandbox {
    root: PathBuf,
}

impl Sandbox {
    /// Canonicalizes `root`, which must be an existing directory.
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let requested = root.as_ref();
        let root = requested.canonicalize().map_err(|e| Error::InvalidPath {
            message: format!("root {}: {}", requested.display(), e),
        })?;
        if !root.is_dir() {
            return Err(Error::InvalidPath {
                message: format!("root {} is not a directory", root.display()),
            });
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a root-relative request to an absolute path inside the root.
    ///
    /// Leading slashes and `.` segments are ignored. `..` may not climb above
    /// the root, and symlinks may not lead out of it.
    pub fn resolve(&self, requested: &str) -> Result<PathBuf> {
        let relative = clean(requested).ok_or_else(|| Error::OutsideRoot {
            path: requested.to_string(),
            root: self.root.display().to_string(),
        })?;

        let joined = self.root.join(&relative);
        let resolved = joined.canonicalize().map_err(|e| match e.kind() {
            ErrorKind::NotFound => Error::FileNotFound {
                path: requested.to_string(),
            },
            _ => Error::Io(e),
        })?;

        if !resolved.starts_with(&self.root) {
            return Err(Error::OutsideRoot {
                path: resolved.display().to_string(),
                root: self.root.display().to_string(),
            });
        }
        Ok(resolved)
    }

    /// Like [`Sandbox::resolve`], but only accepts regular files.
    pub fn resolve_file(&self, requested: &str) -> Result<PathBuf> {
        let resolved = self.resolve(requested)?;
        if !resolved.is_file() {
            return Err(Error::NotRegularFile {
                path: requested.to_string(),
            });
        }
        Ok(resolved)
    }

    /// The root-relative, `/`-separated form of a resolved path.
    pub fn relative(&self, resolved: &Path) -> String {
        let relative = resolved.strip_prefix(&self.root).unwrap_or(Path::new(""));
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        format!("/{}", parts.join("/"))
    }
}

/// Lexically normalizes a request. `None` if `..` would leave the root.
fn clean(requested: &str) -> Option<PathBuf> {
    let mut parts: Vec<&str> = Vec::new();
    for component in Path::new(requested).components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            Component::ParentDir => {
                parts.pop()?;
            }
            Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
        }
    }
    Some(parts.iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::TempLogFile;
    use tokio_test::{assert_err, assert_ok};

    fn sandbox(temp: &TempLogFile) -> Sandbox {
        Sandbox::new(temp.dir()).unwrap()
    }

    #[test]
    fn test_clean() {
        assert_eq!(clean("app.log"), Some(PathBuf::from("app.log")));
        assert_eq!(clean("/app.log"), Some(PathBuf::from("app.log")));
        assert_eq!(clean("./a/./b/../c"), Some(PathBuf::from("a/c")));
        assert_eq!(clean(""), Some(PathBuf::new()));
        assert_eq!(clean("/"), Some(PathBuf::new()));
        assert_eq!(clean(".."), None);
        assert_eq!(clean("a/../../etc/passwd"), None);
    }

    #[test]
    fn test_resolve_file_inside_root() {
        let temp = TempLogFile::new().unwrap();
        let sandbox = sandbox(&temp);

        let resolved = assert_ok!(sandbox.resolve_file("/app.log"));
        assert_eq!(resolved, temp.path().canonicalize().unwrap());
        assert_eq!(sandbox.relative(&resolved), "/app.log");
    }

    #[test]
    fn test_root_itself() {
        let temp = TempLogFile::new().unwrap();
        let sandbox = sandbox(&temp);

        let resolved = assert_ok!(sandbox.resolve("/"));
        assert_eq!(resolved, sandbox.root());
        assert_eq!(sandbox.relative(&resolved), "/");
    }

    #[test]
    fn test_parent_escape_is_rejected() {
        let temp = TempLogFile::new().unwrap();
        let sandbox = sandbox(&temp);

        let err = assert_err!(sandbox.resolve_file("../app.log"));
        assert!(matches!(err, Error::OutsideRoot { .. }));
    }

    #[test]
    fn test_missing_file() {
        let temp = TempLogFile::new().unwrap();
        let err = assert_err!(sandbox(&temp).resolve_file("missing.log"));
        assert!(matches!(err, Error::FileNotFound { .. }));
    }

    #[test]
    fn test_directory_is_not_a_regular_file() {
        let temp = TempLogFile::new().unwrap();
        std::fs::create_dir(temp.dir().join("sub")).unwrap();
        let sandbox = sandbox(&temp);

        assert_ok!(sandbox.resolve("sub"));
        let err = assert_err!(sandbox.resolve_file("sub"));
        assert!(matches!(err, Error::NotRegularFile { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_out_of_root_is_rejected() {
        let outside = TempLogFile::with_content("secret").unwrap();
        let temp = TempLogFile::new().unwrap();
        std::os::unix::fs::symlink(outside.path(), temp.dir().join("link.log")).unwrap();

        let err = assert_err!(sandbox(&temp).resolve_file("link.log"));
        assert!(matches!(err, Error::OutsideRoot { .. }));
    }

    #[test]
    fn test_root_must_be_a_directory() {
        let temp = TempLogFile::new().unwrap();
        assert!(matches!(
            Sandbox::new(temp.path()),
            Err(Error::InvalidPath { .. })
        ));
        assert!(matches!(
            Sandbox::new(temp.dir().join("nope")),
            Err(Error::InvalidPath { .. })
        ));
    }
}
