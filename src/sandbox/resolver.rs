//! Path resolution against the sandbox root

use crate::error::{Error, Result};
use std::path::{Component, Path, PathBuf};

/// The single directory all filesystem access is confined to.
///
/// Constructed once at process start and injected into every component that
/// touches the filesystem. Caller-supplied path strings must pass through
/// [`Sandbox::resolve_file`] or [`Sandbox::resolve_dir`] before any file is
/// opened; the returned paths are absolute and proven to lie within the
/// root.
#[derive(Debug, Clone)]
pub struct Sandbox {
    root: PathBuf,
}

impl Sandbox {
    /// Create a sandbox rooted at `root`. The root must exist and be a
    /// directory; it is canonicalized up front so every later containment
    /// check compares fully resolved paths.
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let display = root.as_ref().display().to_string();
        let root = std::fs::canonicalize(root.as_ref()).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound { path: display.clone() }
            } else {
                Error::Io(e)
            }
        })?;

        if !root.is_dir() {
            return Err(Error::NotADirectory { path: display });
        }

        Ok(Self { root })
    }

    /// The canonicalized sandbox root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an untrusted path string to an absolute path inside the
    /// sandbox.
    ///
    /// Relative inputs are joined onto the root; absolute inputs are only
    /// accepted when they already fall under it. `.` and `..` components are
    /// resolved lexically before the containment check, so a traversal
    /// escape fails with [`Error::PathViolation`] even when the target does
    /// not exist. Paths that stay in-bounds but point at nothing fail with
    /// [`Error::NotFound`], keeping the two cases distinguishable for
    /// callers. Symlinks are resolved and the containment check repeated on
    /// the real path, so a link pointing outside the sandbox is a violation
    /// too.
    pub fn resolve(&self, input: &str) -> Result<PathBuf> {
        if input.is_empty() {
            return Err(Error::PathViolation {
                path: input.to_string(),
            });
        }

        let candidate = Path::new(input);
        let joined = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.root.join(candidate)
        };

        // Component-wise containment, not string prefix: "/work-evil" must
        // not pass for root "/work".
        let normalized = normalize(&joined);
        if !normalized.starts_with(&self.root) {
            return Err(Error::PathViolation {
                path: input.to_string(),
            });
        }

        match std::fs::canonicalize(&normalized) {
            Ok(real) => {
                if real.starts_with(&self.root) {
                    Ok(real)
                } else {
                    Err(Error::PathViolation {
                        path: input.to_string(),
                    })
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::NotFound {
                path: input.to_string(),
            }),
            Err(e) => Err(Error::Io(e)),
        }
    }

    /// Resolve `input` and require the result to be a regular file.
    pub fn resolve_file(&self, input: &str) -> Result<PathBuf> {
        let path = self.resolve(input)?;
        if !path.is_file() {
            return Err(Error::NotAFile {
                path: input.to_string(),
            });
        }
        Ok(path)
    }

    /// Resolve `input` and require the result to be a directory.
    pub fn resolve_dir(&self, input: &str) -> Result<PathBuf> {
        let path = self.resolve(input)?;
        if !path.is_dir() {
            return Err(Error::NotADirectory {
                path: input.to_string(),
            });
        }
        Ok(path)
    }

    /// Whether an already-discovered filesystem path (e.g. a symlink target
    /// found during a directory walk) still lies within the sandbox.
    /// Unresolvable paths are treated as outside.
    pub fn contains(&self, path: &Path) -> bool {
        std::fs::canonicalize(path)
            .map(|real| real.starts_with(&self.root))
            .unwrap_or(false)
    }
}

/// Resolve `.` and `..` components lexically, without touching the
/// filesystem. Popping past the filesystem root leaves the path there, which
/// the caller's containment check then rejects.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs;

    fn sandbox_with_files(files: &[&str]) -> (tempfile::TempDir, Sandbox) {
        let dir = tempfile::tempdir().unwrap();
        for file in files {
            let path = dir.path().join(file);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(&path, b"%PDF-1.4 test").unwrap();
        }
        let sandbox = Sandbox::new(dir.path()).unwrap();
        (dir, sandbox)
    }

    #[test]
    fn test_resolve_file_in_root() {
        let (_dir, sandbox) = sandbox_with_files(&["a.pdf"]);
        let resolved = sandbox.resolve_file("a.pdf").unwrap();
        assert_eq!(resolved, sandbox.root().join("a.pdf"));
    }

    #[test]
    fn test_resolve_nested_file() {
        let (_dir, sandbox) = sandbox_with_files(&["papers/x.pdf"]);
        let resolved = sandbox.resolve_file("papers/x.pdf").unwrap();
        assert_eq!(resolved, sandbox.root().join("papers").join("x.pdf"));
    }

    #[test]
    fn test_resolve_normalizes_dot_segments() {
        let (_dir, sandbox) = sandbox_with_files(&["papers/x.pdf"]);
        let resolved = sandbox.resolve_file("./papers/../papers/x.pdf").unwrap();
        assert_eq!(resolved, sandbox.root().join("papers").join("x.pdf"));
    }

    #[rstest]
    #[case("../etc/passwd")]
    #[case("../../etc/passwd")]
    #[case("papers/../../outside.pdf")]
    #[case("..")]
    fn test_traversal_escape_rejected(#[case] input: &str) {
        let (_dir, sandbox) = sandbox_with_files(&["papers/x.pdf"]);
        let result = sandbox.resolve(input);
        assert!(matches!(result, Err(Error::PathViolation { .. })));
    }

    #[test]
    fn test_escape_rejected_even_when_target_exists() {
        let outer = tempfile::tempdir().unwrap();
        let inner = outer.path().join("inner");
        fs::create_dir(&inner).unwrap();
        fs::write(outer.path().join("secret.txt"), b"secret").unwrap();

        let sandbox = Sandbox::new(&inner).unwrap();
        let result = sandbox.resolve("../secret.txt");
        assert!(matches!(result, Err(Error::PathViolation { .. })));
    }

    #[test]
    fn test_absolute_path_outside_rejected() {
        let (_dir, sandbox) = sandbox_with_files(&["a.pdf"]);
        let result = sandbox.resolve("/etc/passwd");
        assert!(matches!(result, Err(Error::PathViolation { .. })));
    }

    #[test]
    fn test_absolute_path_under_root_accepted() {
        let (_dir, sandbox) = sandbox_with_files(&["a.pdf"]);
        let absolute = sandbox.root().join("a.pdf");
        let resolved = sandbox.resolve_file(&absolute.to_string_lossy()).unwrap();
        assert_eq!(resolved, absolute);
    }

    #[test]
    fn test_empty_string_rejected() {
        let (_dir, sandbox) = sandbox_with_files(&[]);
        let result = sandbox.resolve("");
        assert!(matches!(result, Err(Error::PathViolation { .. })));
    }

    #[test]
    fn test_missing_path_is_not_found_not_violation() {
        let (_dir, sandbox) = sandbox_with_files(&[]);
        let result = sandbox.resolve("missing.pdf");
        assert!(matches!(result, Err(Error::NotFound { .. })));
    }

    #[test]
    fn test_directory_when_file_expected() {
        let (_dir, sandbox) = sandbox_with_files(&["papers/x.pdf"]);
        let result = sandbox.resolve_file("papers");
        assert!(matches!(result, Err(Error::NotAFile { .. })));
    }

    #[test]
    fn test_file_when_directory_expected() {
        let (_dir, sandbox) = sandbox_with_files(&["a.pdf"]);
        let result = sandbox.resolve_dir("a.pdf");
        assert!(matches!(result, Err(Error::NotADirectory { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_escaping_sandbox_rejected() {
        let outer = tempfile::tempdir().unwrap();
        let inner = outer.path().join("inner");
        fs::create_dir(&inner).unwrap();
        fs::write(outer.path().join("secret.pdf"), b"%PDF-1.4").unwrap();
        std::os::unix::fs::symlink(outer.path().join("secret.pdf"), inner.join("link.pdf"))
            .unwrap();

        let sandbox = Sandbox::new(&inner).unwrap();
        let result = sandbox.resolve("link.pdf");
        assert!(matches!(result, Err(Error::PathViolation { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_inside_sandbox_accepted() {
        let (_dir, sandbox) = sandbox_with_files(&["real.pdf"]);
        std::os::unix::fs::symlink(
            sandbox.root().join("real.pdf"),
            sandbox.root().join("link.pdf"),
        )
        .unwrap();

        let resolved = sandbox.resolve_file("link.pdf").unwrap();
        assert_eq!(resolved, sandbox.root().join("real.pdf"));
    }

    #[test]
    fn test_contains_rejects_outside_path() {
        let outer = tempfile::tempdir().unwrap();
        let inner = outer.path().join("inner");
        fs::create_dir(&inner).unwrap();
        fs::write(outer.path().join("secret.txt"), b"secret").unwrap();

        let sandbox = Sandbox::new(&inner).unwrap();
        assert!(!sandbox.contains(&outer.path().join("secret.txt")));
        assert!(sandbox.contains(sandbox.root()));
    }

    #[test]
    fn test_new_with_missing_root() {
        let result = Sandbox::new("/nonexistent/sandbox/root");
        assert!(matches!(result, Err(Error::NotFound { .. })));
    }

    #[test]
    fn test_new_with_file_root() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.pdf");
        fs::write(&file, b"%PDF-1.4").unwrap();
        let result = Sandbox::new(&file);
        assert!(matches!(result, Err(Error::NotADirectory { .. })));
    }

    #[test]
    fn test_normalize_is_lexical() {
        assert_eq!(
            normalize(Path::new("/work/a/../b/./c.pdf")),
            PathBuf::from("/work/b/c.pdf")
        );
        assert_eq!(normalize(Path::new("/work/../../etc")), PathBuf::from("/etc"));
    }
}
