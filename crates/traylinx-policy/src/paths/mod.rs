//! Filesystem path confinement.
//!
//! [`PathValidator`] answers one question: may a caller touch this path?
//! A path is permitted only if it resolves inside the workdir (or an extra
//! allowed root) and is neither a sensitive path, inside one, nor a parent
//! of one.
//!
//! Paths are always resolved before they are checked. Callers that need the
//! resolved path for I/O should take it from [`PathValidator::get_safe_path`]
//! rather than resolving it again themselves.

mod resolve;

use std::path::{Path, PathBuf};

use path_clean::PathClean;

use crate::error::{PathError, PathViolation};

/// Paths no agent operation may touch. `~` is the user's home directory.
pub const SENSITIVE_PATHS: &[&str] = &[
    // System files
    "/etc/passwd",
    "/etc/shadow",
    "/etc/sudoers",
    "/etc/ssh",
    // User secrets
    "~/.ssh",
    "~/.gnupg",
    "~/.aws",
    "~/.config/gcloud",
    "~/.kube",
    // Docker socket
    "/var/run/docker.sock",
    // Kernel interfaces
    "/proc",
    "/sys",
    "/dev",
    // System binaries
    "/bin",
    "/sbin",
    "/usr/bin",
    "/usr/sbin",
];

/// Validates file paths against a sandbox root and a sensitive-path denylist.
///
/// All state is fixed at construction.
#[derive(Clone, Debug)]
pub struct PathValidator {
    workdir: PathBuf,
    allowed_paths: Vec<PathBuf>,
    sensitive_paths: Vec<PathBuf>,
    home: Option<PathBuf>,
}

impl PathValidator {
    /// Create a validator rooted at `workdir`, expanding `~` to the current user's home.
    pub fn new(workdir: impl AsRef<Path>, allowed_paths: &[PathBuf]) -> Self {
        Self::with_home_dir(workdir, allowed_paths, dirs::home_dir())
    }

    /// Create a validator with an explicit home directory.
    ///
    /// With no home directory, `~` entries are left out of the sensitive set
    /// and any path starting with `~` fails to resolve.
    pub fn with_home_dir(
        workdir: impl AsRef<Path>,
        allowed_paths: &[PathBuf],
        home: Option<PathBuf>,
    ) -> Self {
        let workdir = resolve_root(workdir.as_ref());
        let allowed_paths = allowed_paths
            .iter()
            .filter_map(|p| match resolve::expand_tilde(p, home.as_deref()) {
                Ok(p) => Some(resolve_root(&resolve::absolutize(&p, &workdir))),
                Err(e) => {
                    tracing::warn!(path = %p.display(), error = %e, "ignoring allowed path");
                    None
                }
            })
            .collect();
        let sensitive_paths = expand_sensitive_paths(home.as_deref());

        Self {
            workdir,
            allowed_paths,
            sensitive_paths,
            home,
        }
    }

    /// The resolved sandbox root.
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// The resolved extra roots.
    pub fn allowed_paths(&self) -> &[PathBuf] {
        &self.allowed_paths
    }

    /// The expanded sensitive paths, literal and resolved forms.
    pub fn sensitive_paths(&self) -> &[PathBuf] {
        &self.sensitive_paths
    }

    /// Returns true if `path` resolves to a permitted location.
    ///
    /// Any resolution failure makes the path unsafe.
    pub fn is_safe(&self, path: impl AsRef<Path>) -> bool {
        self.resolve(path.as_ref())
            .is_ok_and(|resolved| self.is_permitted(&resolved))
    }

    /// Validate a path, returning the resolved path or the specific violation.
    pub fn validate(&self, path: impl AsRef<Path>) -> Result<PathBuf, PathViolation> {
        let path = path.as_ref();
        let raw = path.to_string_lossy();

        if raw.contains("..") && !self.is_safe(path) {
            return Err(PathViolation::Traversal);
        }

        // Checked before resolution: NUL bytes corrupt OS path APIs.
        if raw.contains('\0') {
            return Err(PathViolation::NulByte);
        }

        let resolved = self.resolve(path)?;
        if let Some(sensitive) = self
            .sensitive_paths
            .iter()
            .find(|sensitive| resolved.starts_with(sensitive))
        {
            return Err(PathViolation::Sensitive(sensitive.clone()));
        }

        if !self.is_permitted(&resolved) {
            return Err(PathViolation::Outside(raw.into_owned()));
        }

        Ok(resolved)
    }

    /// The resolved path if it is safe, None otherwise.
    pub fn get_safe_path(&self, path: impl AsRef<Path>) -> Option<PathBuf> {
        self.resolve(path.as_ref())
            .ok()
            .filter(|resolved| self.is_permitted(resolved))
    }

    fn resolve(&self, path: &Path) -> Result<PathBuf, PathError> {
        let expanded = resolve::expand_tilde(path, self.home.as_deref())?;
        resolve::resolve(&resolve::absolutize(&expanded, &self.workdir))
    }

    fn is_permitted(&self, resolved: &Path) -> bool {
        let inside = resolved.starts_with(&self.workdir)
            || self
                .allowed_paths
                .iter()
                .any(|allowed| resolved.starts_with(allowed));
        if !inside {
            return false;
        }

        // Both directions: a parent of `~/.ssh` is as dangerous as `~/.ssh`
        // itself for recursive operations.
        !self
            .sensitive_paths
            .iter()
            .any(|sensitive| resolved.starts_with(sensitive) || sensitive.starts_with(resolved))
    }
}

/// Validate `path` with a one-off validator rooted at `workdir`.
pub fn validate_path(
    path: impl AsRef<Path>,
    workdir: impl AsRef<Path>,
) -> Result<PathBuf, PathViolation> {
    PathValidator::new(workdir, &[]).validate(path)
}

/// Check `path` with a one-off validator rooted at `workdir`.
pub fn is_path_safe(path: impl AsRef<Path>, workdir: impl AsRef<Path>) -> bool {
    PathValidator::new(workdir, &[]).is_safe(path)
}

/// Resolve a trusted root (workdir, allowed path) to an absolute path.
///
/// Falls back to lexical normalization if the path cannot be resolved.
pub(crate) fn resolve_root(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %PathError::CurrentDir(e),
                    "using relative root as given"
                );
                path.to_path_buf()
            }
        }
    };

    resolve::resolve(&absolute).unwrap_or_else(|e| {
        tracing::warn!(
            path = %absolute.display(),
            error = %e,
            "could not resolve root; using lexical form"
        );
        absolute.clean()
    })
}

fn expand_sensitive_paths(home: Option<&Path>) -> Vec<PathBuf> {
    let mut expanded: Vec<PathBuf> = Vec::new();
    for entry in SENSITIVE_PATHS {
        let literal = match resolve::expand_tilde(Path::new(entry), home) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(path = %entry, error = %e, "sensitive path not expanded");
                continue;
            }
        };

        // Register the resolved form too, so `/var/run` -> `/run` style
        // platform symlinks do not hide a sensitive path.
        let resolved = resolve::resolve(&literal).ok();
        for path in std::iter::once(literal).chain(resolved) {
            if !expanded.contains(&path) {
                expanded.push(path);
            }
        }
    }
    expanded
}
