//! core::fsops
//!
//! Filesystem primitives shared by every edit operation.
//!
//! # Features
//!
//! - JSON info-file reading and writing, including exclusive-create writes
//!   that fail loudly when a path already exists (a lost race is an error,
//!   never a silent overwrite)
//! - Exclusive directory-tree copy
//! - Orphan-folder pruning after deletes and renames
//! - Recursive short-name discovery by info-file basename
//! - SHA-256 content hashing for optimistic-concurrency checks

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors from filesystem primitives.
#[derive(Debug, Error)]
pub enum FsError {
    /// The exclusive-create target already exists.
    ///
    /// Surfaced as a name collision: another editor created the same
    /// entity between the name allocation and the write.
    #[error("destination already exists: {path}")]
    AlreadyExists {
        /// The path that already exists.
        path: String,
    },

    /// An info file is not valid JSON.
    #[error("invalid JSON in {path}: {source}")]
    Json {
        /// The file that failed to parse.
        path: String,
        /// The underlying parse error.
        source: serde_json::Error,
    },

    /// I/O failure with the path that was being touched.
    #[error("{context}: {source}")]
    Io {
        /// What was being attempted, including the path.
        context: String,
        /// The underlying I/O error.
        source: io::Error,
    },
}

fn io_err(context: impl Into<String>) -> impl FnOnce(io::Error) -> FsError {
    let context = context.into();
    move |source| FsError::Io { context, source }
}

/// Read and parse a JSON file.
pub fn read_json(path: &Path) -> Result<Value, FsError> {
    let bytes = fs::read(path).map_err(io_err(format!("reading {}", path.display())))?;
    serde_json::from_slice(&bytes).map_err(|source| FsError::Json {
        path: path.display().to_string(),
        source,
    })
}

/// Serialize `value` to `path`, overwriting any existing file.
///
/// Output is pretty-printed with a trailing newline, matching how info
/// files are kept in course repositories.
pub fn write_json(path: &Path, value: &Value) -> Result<(), FsError> {
    let mut text = serde_json::to_string_pretty(value)
        .map_err(|source| FsError::Json {
            path: path.display().to_string(),
            source,
        })?;
    text.push('\n');
    fs::write(path, text).map_err(io_err(format!("writing {}", path.display())))
}

/// Serialize `value` to `path` with an exclusive-create flag.
///
/// Parent directories are created as needed. Fails with
/// [`FsError::AlreadyExists`] if the file is already present, which
/// detects a racing editor instead of silently overwriting its work.
pub fn write_json_new(path: &Path, value: &Value) -> Result<(), FsError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(io_err(format!("creating {}", parent.display())))?;
    }
    let mut text = serde_json::to_string_pretty(value)
        .map_err(|source| FsError::Json {
            path: path.display().to_string(),
            source,
        })?;
    text.push('\n');
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|source| {
            if source.kind() == io::ErrorKind::AlreadyExists {
                FsError::AlreadyExists {
                    path: path.display().to_string(),
                }
            } else {
                FsError::Io {
                    context: format!("creating {}", path.display()),
                    source,
                }
            }
        })?;
    file.write_all(text.as_bytes())
        .map_err(io_err(format!("writing {}", path.display())))
}

/// Copy a directory tree from `src` to `dst`.
///
/// Fails with [`FsError::AlreadyExists`] if `dst` is already present.
/// Parent directories of `dst` are created as needed.
pub fn copy_tree_exclusive(src: &Path, dst: &Path) -> Result<(), FsError> {
    if dst.exists() {
        return Err(FsError::AlreadyExists {
            path: dst.display().to_string(),
        });
    }
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)
            .map_err(io_err(format!("creating {}", parent.display())))?;
    }
    copy_tree_inner(src, dst)
}

fn copy_tree_inner(src: &Path, dst: &Path) -> Result<(), FsError> {
    fs::create_dir(dst).map_err(io_err(format!("creating {}", dst.display())))?;
    let entries =
        fs::read_dir(src).map_err(io_err(format!("reading {}", src.display())))?;
    for entry in entries {
        let entry = entry.map_err(io_err(format!("reading {}", src.display())))?;
        let from = entry.path();
        let to = dst.join(entry.file_name());
        let file_type = entry
            .file_type()
            .map_err(io_err(format!("reading {}", from.display())))?;
        if file_type.is_dir() {
            copy_tree_inner(&from, &to)?;
        } else {
            fs::copy(&from, &to)
                .map_err(io_err(format!("copying {}", from.display())))?;
        }
    }
    Ok(())
}

/// Remove a directory tree.
pub fn remove_tree(path: &Path) -> Result<(), FsError> {
    fs::remove_dir_all(path).map_err(io_err(format!("removing {}", path.display())))
}

/// Move a directory tree.
pub fn move_tree(from: &Path, to: &Path) -> Result<(), FsError> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)
            .map_err(io_err(format!("creating {}", parent.display())))?;
    }
    fs::rename(from, to).map_err(io_err(format!(
        "moving {} to {}",
        from.display(),
        to.display()
    )))
}

/// Delete now-empty ancestors of a removed or moved entity.
///
/// Walks the ancestor chain from the entity's immediate parent upward
/// toward `root`, deleting each empty directory, and stops at the first
/// nonempty ancestor or upon reaching `root` (which is never deleted).
///
/// `relative` is the entity's slash-separated path relative to `root`.
pub fn prune_empty_ancestors(root: &Path, relative: &str) -> Result<(), FsError> {
    let segments: Vec<&str> = relative.split('/').filter(|s| !s.is_empty()).collect();
    // Ancestors of the entity, deepest first, excluding the root itself.
    for depth in (1..segments.len()).rev() {
        let dir = segments[..depth]
            .iter()
            .fold(root.to_path_buf(), |p, seg| p.join(seg));
        if !dir.exists() {
            continue;
        }
        let mut entries = fs::read_dir(&dir)
            .map_err(io_err(format!("reading {}", dir.display())))?;
        if entries.next().is_some() {
            break;
        }
        fs::remove_dir(&dir).map_err(io_err(format!("removing {}", dir.display())))?;
    }
    Ok(())
}

/// Recursively enumerate entity short names under `root`.
///
/// A directory directly containing `info_basename` is a leaf entity: its
/// slash-separated path relative to `root` is collected and recursion does
/// not descend further. A directory lacking the file is recursed into.
/// A missing `root` yields an empty result, the common case for a course
/// with no entities of that kind yet.
pub fn discover_short_names(root: &Path, info_basename: &str) -> Result<Vec<String>, FsError> {
    let mut names = Vec::new();
    if !root.exists() {
        return Ok(names);
    }
    discover_inner(root, info_basename, String::new(), &mut names)?;
    names.sort();
    Ok(names)
}

fn discover_inner(
    dir: &Path,
    info_basename: &str,
    prefix: String,
    names: &mut Vec<String>,
) -> Result<(), FsError> {
    let entries = fs::read_dir(dir).map_err(io_err(format!("reading {}", dir.display())))?;
    for entry in entries {
        let entry = entry.map_err(io_err(format!("reading {}", dir.display())))?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let relative = if prefix.is_empty() {
            name
        } else {
            format!("{prefix}/{name}")
        };
        if path.join(info_basename).is_file() {
            names.push(relative);
        } else {
            discover_inner(&path, info_basename, relative, names)?;
        }
    }
    Ok(())
}

/// Hex-encoded SHA-256 of a byte string.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Read a file, returning `None` when it does not exist.
pub fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, FsError> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(FsError::Io {
            context: format!("reading {}", path.display()),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn json_write_and_read_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("info.json");
        let value = json!({"uuid": "abc", "title": "Q"});
        write_json(&path, &value).unwrap();
        assert_eq!(read_json(&path).unwrap(), value);
    }

    #[test]
    fn exclusive_write_detects_existing_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a").join("info.json");
        write_json_new(&path, &json!({})).unwrap();
        let err = write_json_new(&path, &json!({})).unwrap_err();
        assert!(matches!(err, FsError::AlreadyExists { .. }));
    }

    #[test]
    fn copy_tree_copies_nested_content() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        fs::create_dir_all(src.join("inner")).unwrap();
        fs::write(src.join("a.txt"), "a").unwrap();
        fs::write(src.join("inner").join("b.txt"), "b").unwrap();

        let dst = temp.path().join("dst");
        copy_tree_exclusive(&src, &dst).unwrap();
        assert_eq!(fs::read_to_string(dst.join("a.txt")).unwrap(), "a");
        assert_eq!(
            fs::read_to_string(dst.join("inner").join("b.txt")).unwrap(),
            "b"
        );
    }

    #[test]
    fn copy_tree_refuses_existing_destination() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        let dst = temp.path().join("dst");
        fs::create_dir_all(&src).unwrap();
        fs::create_dir_all(&dst).unwrap();
        let err = copy_tree_exclusive(&src, &dst).unwrap_err();
        assert!(matches!(err, FsError::AlreadyExists { .. }));
    }

    #[test]
    fn prune_removes_empty_chain_and_stops_at_nonempty() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("a/b/c")).unwrap();
        fs::write(root.join("a/keep.txt"), "x").unwrap();

        // Entity at a/b/c was removed; prune from its parent upward.
        fs::remove_dir(root.join("a/b/c")).unwrap();
        prune_empty_ancestors(root, "a/b/c").unwrap();

        assert!(!root.join("a/b").exists());
        // a is nonempty (keep.txt), so it survives.
        assert!(root.join("a").exists());
    }

    #[test]
    fn prune_never_removes_the_root() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("course");
        fs::create_dir_all(root.join("q1")).unwrap();
        fs::remove_dir(root.join("q1")).unwrap();
        prune_empty_ancestors(&root, "q1").unwrap();
        assert!(root.exists());
    }

    #[test]
    fn discovery_collects_leaves_without_descending() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("q1")).unwrap();
        fs::write(root.join("q1/info.json"), "{}").unwrap();
        fs::create_dir_all(root.join("unit1/q2")).unwrap();
        fs::write(root.join("unit1/q2/info.json"), "{}").unwrap();
        // A leaf with a nested directory that also has an info file:
        // recursion must not descend past the leaf.
        fs::create_dir_all(root.join("q1/nested")).unwrap();
        fs::write(root.join("q1/nested/info.json"), "{}").unwrap();

        let names = discover_short_names(root, "info.json").unwrap();
        assert_eq!(names, vec!["q1".to_string(), "unit1/q2".to_string()]);
    }

    #[test]
    fn discovery_of_missing_root_is_empty() {
        let temp = TempDir::new().unwrap();
        let names = discover_short_names(&temp.path().join("questions"), "info.json").unwrap();
        assert!(names.is_empty());
    }

    #[test]
    fn sha256_is_stable() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(sha256_hex(b"abc"), sha256_hex(b"abc"));
        assert_ne!(sha256_hex(b"abc"), sha256_hex(b"abd"));
    }

    #[test]
    fn read_optional_distinguishes_missing() {
        let temp = TempDir::new().unwrap();
        assert!(read_optional(&temp.path().join("nope")).unwrap().is_none());
        fs::write(temp.path().join("yes"), "data").unwrap();
        assert_eq!(
            read_optional(&temp.path().join("yes")).unwrap().unwrap(),
            b"data"
        );
    }
}
