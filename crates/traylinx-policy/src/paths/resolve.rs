//! Path resolution that tolerates paths which do not exist yet.
//!
//! Existing components have their symlinks followed; once a component is
//! missing the remainder is normalized lexically. This mirrors
//! `realpath -m` and lets callers check paths they are about to create.

use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use crate::error::PathError;

/// Matches the usual `MAXSYMLINKS` of POSIX systems.
const MAX_SYMLINK_HOPS: usize = 40;

/// Replace a leading `~` component with `home`.
pub(crate) fn expand_tilde(path: &Path, home: Option<&Path>) -> Result<PathBuf, PathError> {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(first)) if first == "~" => {
            let home = home.ok_or(PathError::NoHomeDir)?;
            let rest = components.as_path();
            if rest.as_os_str().is_empty() {
                Ok(home.to_path_buf())
            } else {
                Ok(home.join(rest))
            }
        }
        _ => Ok(path.to_path_buf()),
    }
}

/// Join a relative path onto `base`, or return an absolute path unchanged.
pub(crate) fn absolutize(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Resolve an absolute path, following symlinks of the components that exist.
pub(crate) fn resolve(path: &Path) -> Result<PathBuf, PathError> {
    if path.as_os_str().as_encoded_bytes().contains(&0) {
        return Err(PathError::NulByte);
    }

    let (root, parts) = split_root(path);
    let mut resolved = root;
    let mut pending = parts;
    pending.reverse();
    let mut hops = 0;

    while let Some(part) = pending.pop() {
        if part == "." {
            continue;
        }
        if part == ".." {
            resolved.pop();
            continue;
        }

        let candidate = resolved.join(&part);
        match fs::symlink_metadata(&candidate) {
            Ok(meta) if meta.file_type().is_symlink() => {
                hops += 1;
                if hops > MAX_SYMLINK_HOPS {
                    return Err(PathError::SymlinkLoop(path.to_path_buf()));
                }
                let target = fs::read_link(&candidate).map_err(|source| PathError::Io {
                    path: candidate.clone(),
                    source,
                })?;
                let (target_root, target_parts) = split_root(&target);
                if target.is_absolute() {
                    resolved = target_root;
                }
                pending.extend(target_parts.into_iter().rev());
            }
            Ok(_) => resolved = candidate,
            Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => {
                resolved = candidate;
            }
            Err(source) => {
                return Err(PathError::Io {
                    path: candidate,
                    source,
                });
            }
        }
    }

    Ok(resolved)
}

fn split_root(path: &Path) -> (PathBuf, Vec<OsString>) {
    let mut root = PathBuf::new();
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => root.push(component.as_os_str()),
            Component::CurDir => parts.push(OsString::from(".")),
            Component::ParentDir => parts.push(OsString::from("..")),
            Component::Normal(name) => parts.push(name.to_os_string()),
        }
    }
    (root, parts)
}
