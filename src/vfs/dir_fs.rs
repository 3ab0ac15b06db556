//! This module provides a virtual filesystem (VFS) implementation that maps to a real directory
//! on the host system. Listing and metadata queries go straight to the host, so the VFS sees
//! everything under its root, including entries it did not create itself.
//!
//! ### Key Features:
//! - **Isolated root**: All operations are confined to a designated root directory (self.root).
//! - **Path normalization**: Automatically resolves . and .. components and removes trailing slashes.
//! - **Link-aware**: `lstat()` reports symbolic links as themselves, and the backend declares
//!   `SymlinkPolicy::NoFollow` so walks never descend through a link.
//! - **Auto‑cleanup**: Optionally removes created artifacts on Drop (when is_auto_clean = true).

use std::collections::BTreeSet;
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::anyhow;
use tracing::{debug, warn};

use crate::core::{DirHandle, FsBackend, Metadata, Result, SymlinkPolicy, utils};

/// A virtual filesystem (VFS) implementation that maps to a real directory on the host system.
///
/// `DirFS` provides an isolated, path‑normalized view of a portion of the filesystem, rooted at a
/// designated absolute path (`root`). Inner paths are absolute (`/docs/note.txt`) and are mapped
/// onto the host below `root`.
///
/// ### Usage notes:
/// - `DirFS` does not follow symlinks: `lstat()` and `rm()` act on the link, not the target.
/// - Permissions are not automatically adjusted; ensure `root` is writable.
/// - Not thread‑safe in current version (wrap in `Mutex` if needed).
/// - Errors are returned via `anyhow::Result` with descriptive messages.
///
/// ### Example:
/// ```
/// use vfs_walk::{DirFS, FsBackend, WalkDecision};
///
/// let root = std::env::temp_dir().join("vfs_walk_doc");
///
/// let mut fs = DirFS::new(root).unwrap();
/// fs.mkfile("/docs/note.txt", Some(b"Hello")).unwrap();
///
/// let mut files = Vec::new();
/// fs.walk("/docs", |path, meta, _| {
///     if meta.is_some_and(|m| m.is_file()) {
///         files.push(path.to_path_buf());
///     }
///     WalkDecision::Continue
/// })
/// .unwrap();
/// assert_eq!(files, vec![std::path::PathBuf::from("/docs/note.txt")]);
/// ```
pub struct DirFS {
    root: PathBuf,                      // host-related absolute normalized path
    cwd: PathBuf,                       // inner absolute normalized path
    created: BTreeSet<PathBuf>,         // inner absolute normalized paths
    created_root_parents: Vec<PathBuf>, // host-related absolute normalized paths
    is_auto_clean: bool,
}

impl DirFS {
    /// Creates a new DirFS instance with the root directory at `path`.
    /// Checks permissions to create and write into `path`.
    /// * `path` is an absolute host path. If path not exists it will be created.
    ///
    /// If `path` is not absolute or path is not a directory, error returns.
    /// By default, the `is_auto_clean` flag is set to `true`.
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();

        if root.as_os_str().is_empty() {
            return Err(anyhow!("invalid root path: empty"));
        }
        if root.is_relative() {
            return Err(anyhow!("the root path must be absolute"));
        }
        if root.exists() && !root.is_dir() {
            return Err(anyhow!("{:?} is not a directory", root));
        }

        let root = utils::normalize(root);

        let mut created_root_parents = Vec::new();
        if !std::fs::exists(&root)? {
            created_root_parents.extend(Self::mkdir_all(&root)?);
        }

        if !Self::check_permissions(&root) {
            return Err(anyhow!("Access denied: {:?}", root));
        }

        Ok(Self {
            root,
            cwd: PathBuf::from("/"),
            created: BTreeSet::new(),
            created_root_parents,
            is_auto_clean: true,
        })
    }

    /// Changes auto-clean flag.
    /// If auto-clean flag is true all artifacts created through this VFS
    /// will be removed on drop.
    pub fn set_auto_clean(&mut self, clean: bool) {
        self.is_auto_clean = clean;
    }

    /// Returns the path on the host system that matches the specified inner path.
    pub fn to_host<P: AsRef<Path>>(&self, inner_path: P) -> PathBuf {
        let inner = self.to_inner(inner_path);
        match inner.strip_prefix("/") {
            Ok(relative) => self.root.join(relative),
            Err(_) => self.root.join(inner),
        }
    }

    fn to_inner<P: AsRef<Path>>(&self, inner_path: P) -> PathBuf {
        utils::normalize(self.cwd.join(inner_path))
    }

    /// Make directories recursively.
    /// * `path` is an absolute host path.
    ///
    /// Returns vector of created directories.
    fn mkdir_all<P: AsRef<Path>>(path: P) -> Result<Vec<PathBuf>> {
        let mut created = Vec::new();
        let mut built = PathBuf::new();
        for component in path.as_ref().components() {
            built.push(component);
            if !std::fs::exists(&built)? {
                std::fs::create_dir(&built)?;
                created.push(built.clone());
            }
        }
        Ok(created)
    }

    fn check_permissions<P: AsRef<Path>>(path: P) -> bool {
        let filename = path.as_ref().join(".access");
        std::fs::write(&filename, b"check").is_ok() && std::fs::remove_file(filename).is_ok()
    }

    /// Removes all artifacts (dirs and files) created through this VFS, deepest first.
    /// Directories that still hold foreign entries are left in place.
    /// Returns `false` if something could not be removed.
    fn cleanup(&mut self) -> bool {
        let mut is_ok = true;
        let mut remaining = BTreeSet::new();

        for inner in self.created.iter().rev() {
            let host = self.to_host(inner);
            let result = match std::fs::symlink_metadata(&host) {
                Ok(meta) if meta.is_dir() => std::fs::remove_dir(&host),
                Ok(_) => std::fs::remove_file(&host),
                Err(_) => Ok(()),
            };
            if let Err(err) = result {
                is_ok = false;
                warn!(path = %host.display(), error = %err, "unable to remove artifact");
                remaining.insert(inner.clone());
            }
        }

        self.created = remaining;
        is_ok
    }
}

/// Open host directory; the underlying descriptor is closed on drop.
struct HostDir {
    read_dir: std::fs::ReadDir,
}

impl DirHandle for HostDir {
    fn read_names(&mut self) -> Result<Vec<OsString>> {
        let mut names = Vec::new();
        for entry in self.read_dir.by_ref() {
            names.push(entry?.file_name());
        }
        Ok(names)
    }
}

impl FsBackend for DirFS {
    /// Returns root path related to the host file system.
    fn root(&self) -> &Path {
        self.root.as_path()
    }

    /// Returns current working directory related to the vfs root.
    fn cwd(&self) -> &Path {
        self.cwd.as_path()
    }

    /// Changes the current working directory.
    /// * `path` can be in relative or absolute form, but in both cases it must be an existing
    ///   directory.
    fn cd<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let target = self.to_inner(path);
        if !self.is_dir(&target)? {
            return Err(anyhow!("{} not a directory", target.display()));
        }
        self.cwd = target;
        Ok(())
    }

    /// Checks if a `path` exists. A dangling symbolic link exists.
    fn exists<P: AsRef<Path>>(&self, path: P) -> bool {
        std::fs::symlink_metadata(self.to_host(path)).is_ok()
    }

    /// Creates directory and all it parents (if needed).
    /// * `path` - inner vfs path.
    fn mkdir<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        if path.as_ref().as_os_str().is_empty() {
            return Err(anyhow!("invalid path: empty"));
        }

        let inner_path = self.to_inner(path);

        if self.exists(&inner_path) {
            return Err(anyhow!("path already exists: {}", inner_path.display()));
        }

        let mut built = PathBuf::new();
        for component in inner_path.components() {
            built.push(component);
            let host = self.to_host(&built);
            if !std::fs::exists(&host)? {
                std::fs::create_dir(&host)?;
                self.created.insert(built.clone());
            } else if !host.is_dir() {
                return Err(anyhow!("{} is not a directory", built.display()));
            }
        }

        Ok(())
    }

    /// Creates new file in VFS.
    /// * `file_path` must be inner VFS path. It must contain the name of the file,
    ///   optionally preceded by parent directory.
    ///
    /// If the parent directory does not exist, it will be created.
    fn mkfile<P: AsRef<Path>>(&mut self, file_path: P, content: Option<&[u8]>) -> Result<()> {
        let file_path = self.to_inner(file_path);
        if self.exists(&file_path) {
            return Err(anyhow!("{} already exist", file_path.display()));
        }
        if let Some(parent) = file_path.parent() {
            if !self.exists(parent) {
                self.mkdir(parent)?;
            }
        }
        let host = self.to_host(&file_path);
        let mut fd = std::fs::File::create(&host)?;
        self.created.insert(file_path);
        if let Some(content) = content {
            fd.write_all(content)?;
        }
        Ok(())
    }

    /// Removes a file, symlink or directory at the specified path.
    /// If the path is a directory, all its contents are removed recursively.
    fn rm<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        if path.as_ref().as_os_str().is_empty() {
            return Err(anyhow!("invalid path: empty"));
        }

        let inner_path = self.to_inner(path);
        if utils::is_virtual_root(&inner_path) {
            return Err(anyhow!("invalid path: the root cannot be removed"));
        }
        if !self.exists(&inner_path) {
            return Err(anyhow!("{} does not exist", inner_path.display()));
        }

        utils::rm_on_host(self.to_host(&inner_path))?;
        self.created.retain(|p| !p.starts_with(&inner_path));

        Ok(())
    }

    fn open_dir<P: AsRef<Path>>(&self, path: P) -> Result<Box<dyn DirHandle + '_>> {
        let host = self.to_host(path);
        let read_dir = std::fs::read_dir(&host)?;
        debug!(path = %host.display(), "opened host directory");
        Ok(Box::new(HostDir { read_dir }))
    }

    fn stat<P: AsRef<Path>>(&self, path: P) -> Result<Metadata> {
        let inner = self.to_inner(path);
        let meta = std::fs::metadata(self.to_host(&inner))?;
        Ok(Metadata::new(
            utils::entry_name(&inner),
            meta.file_type().into(),
            meta.len(),
        ))
    }

    fn lstat<P: AsRef<Path>>(&self, path: P) -> Result<Metadata> {
        let inner = self.to_inner(path);
        let meta = std::fs::symlink_metadata(self.to_host(&inner))?;
        Ok(Metadata::new(
            utils::entry_name(&inner),
            meta.file_type().into(),
            meta.len(),
        ))
    }

    fn symlink_policy(&self) -> SymlinkPolicy {
        SymlinkPolicy::NoFollow
    }
}

impl Drop for DirFS {
    fn drop(&mut self) {
        if !self.is_auto_clean {
            return;
        }

        if !self.cleanup() {
            warn!(
                root = %self.root.display(),
                left = self.created.len(),
                "auto-clean incomplete, keeping root parents"
            );
            return;
        }

        for parent in self.created_root_parents.iter().rev() {
            if let Err(err) = std::fs::remove_dir(parent) {
                warn!(path = %parent.display(), error = %err, "failed to remove root parent");
            }
        }
        self.created_root_parents.clear();
    }
}
