//! Deterministic tree walking over any [`FsBackend`].
//!
//! The walk is depth-first and pre-order: an entry is visited before its children, and the
//! children of a directory are visited in byte-wise sorted order of their names. Every
//! backend failure is handed to the visitor, which alone decides whether the walk goes on.
//! Symbolic links are never followed on backends that model them.

use std::ffi::OsString;
use std::path::Path;

use tracing::{debug, trace};

use crate::core::{FsBackend, Metadata, Result, SymlinkPolicy};
use crate::error::WalkError;

/// What the visitor wants the walker to do next.
#[derive(Debug)]
pub enum WalkDecision {
    /// Keep walking; descend if the entry is a directory.
    Continue,
    /// Do not descend into this directory, but keep walking its siblings.
    /// Only valid for a directory visited without an error.
    SkipSubtree,
    /// Stop the whole walk; `walk` returns this error unchanged.
    Abort(anyhow::Error),
}

/// Opens `dir`, reads every entry name and returns the names sorted byte-wise.
/// The directory handle is released before returning, on success and on failure alike.
pub fn read_dir_names<F>(fs: &F, dir: &Path) -> std::result::Result<Vec<OsString>, WalkError>
where
    F: FsBackend + ?Sized,
{
    let mut handle = fs.open_dir(dir).map_err(|cause| WalkError::Open {
        path: dir.to_path_buf(),
        cause,
    })?;
    let names = handle.read_names();
    drop(handle);

    let mut names = names.map_err(|cause| WalkError::Read {
        path: dir.to_path_buf(),
        cause,
    })?;
    names.sort();
    Ok(names)
}

/// Resolves metadata the way the backend asks for: link-aware on backends that model
/// symbolic links, plain `stat()` everywhere else.
pub fn resolve_metadata<F>(fs: &F, path: &Path) -> std::result::Result<Metadata, WalkError>
where
    F: FsBackend + ?Sized,
{
    let result = match fs.symlink_policy() {
        SymlinkPolicy::NoFollow => fs.lstat(path),
        SymlinkPolicy::Follow => fs.stat(path),
    };
    result.map_err(|cause| WalkError::Stat {
        path: path.to_path_buf(),
        cause,
    })
}

/// Walks the tree rooted at `root`, calling `visitor` for every entry including `root`.
///
/// The visitor receives the entry path, its metadata (absent when it could not be resolved)
/// and the error met while resolving or listing the entry, if any. A directory whose listing
/// fails is visited twice: once normally, then again with the listing error.
///
/// Returns `Ok(())` unless the visitor aborts, in which case the visitor's error is returned.
///
/// # Example
/// ```
/// use std::path::PathBuf;
/// use vfs_walk::{walk, FsBackend, MapFS, WalkDecision};
///
/// let mut fs = MapFS::new();
/// fs.mkfile("/root/a/b", None).unwrap();
/// fs.mkfile("/root/c", None).unwrap();
///
/// let mut visited = Vec::new();
/// walk(&fs, "/root", |path, _, _| {
///     visited.push(path.to_path_buf());
///     WalkDecision::Continue
/// })
/// .unwrap();
///
/// let expected: Vec<PathBuf> = ["/root", "/root/a", "/root/a/b", "/root/c"]
///     .iter()
///     .map(PathBuf::from)
///     .collect();
/// assert_eq!(visited, expected);
/// ```
pub fn walk<F, P, V>(fs: &F, root: P, mut visitor: V) -> Result<()>
where
    F: FsBackend + ?Sized,
    P: AsRef<Path>,
    V: FnMut(&Path, Option<&Metadata>, Option<WalkError>) -> WalkDecision,
{
    let root = root.as_ref();
    match resolve_metadata(fs, root) {
        Ok(meta) => walk_entry(fs, root, &meta, &mut visitor),
        Err(err) => {
            debug!(path = %root.display(), error = %err, "cannot resolve walk root");
            match visitor(root, None, Some(err)) {
                WalkDecision::Continue => Ok(()),
                WalkDecision::SkipSubtree => Err(WalkError::InvalidSkip {
                    path: root.to_path_buf(),
                }
                .into()),
                WalkDecision::Abort(err) => Err(err),
            }
        }
    }
}

fn walk_entry<F, V>(fs: &F, path: &Path, meta: &Metadata, visitor: &mut V) -> Result<()>
where
    F: FsBackend + ?Sized,
    V: FnMut(&Path, Option<&Metadata>, Option<WalkError>) -> WalkDecision,
{
    match visitor(path, Some(meta), None) {
        WalkDecision::Continue => {}
        WalkDecision::SkipSubtree if meta.is_dir() => {
            trace!(path = %path.display(), "subtree skipped");
            return Ok(());
        }
        WalkDecision::SkipSubtree => {
            return Err(WalkError::InvalidSkip {
                path: path.to_path_buf(),
            }
            .into());
        }
        WalkDecision::Abort(err) => return Err(err),
    }

    if !meta.is_dir() {
        return Ok(());
    }

    let names = match read_dir_names(fs, path) {
        Ok(names) => names,
        Err(err) => {
            debug!(path = %path.display(), error = %err, "cannot list directory");
            return match visitor(path, Some(meta), Some(err)) {
                WalkDecision::Continue | WalkDecision::SkipSubtree => Ok(()),
                WalkDecision::Abort(err) => Err(err),
            };
        }
    };

    for name in names {
        let child = path.join(&name);
        match resolve_metadata(fs, &child) {
            Ok(child_meta) => walk_entry(fs, &child, &child_meta, visitor)?,
            Err(err) => {
                debug!(path = %child.display(), error = %err, "cannot resolve entry");
                if let WalkDecision::Abort(err) = visitor(&child, None, Some(err)) {
                    return Err(err);
                }
            }
        }
    }

    Ok(())
}
