//! This module provides a virtual filesystem (VFS) implementation that maps to a memory storage.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::anyhow;

use crate::core::{DirHandle, FsBackend, Metadata, Result, SymlinkPolicy, utils};
use crate::{Entry, EntryType};

/// A virtual file system (VFS) implementation that stores file and directory entries in memory
/// using an ordered map keyed by path.
///
/// ### Internal state
///
/// * `root` - An absolute, normalized host-like path. It has no effect on VFS operation and is
///   only reported back through `root()`.
/// * `cwd` - Current Working Directory, an **inner absolute normalized path** used to resolve
///   relative paths. Defaults to `/`.
/// * `entries` - All files and directories, keyed by inner absolute normalized paths.
///
/// ### Invariants
///
/// 1. **Root existence**: The path `/` is always present in `entries` and has type `Directory`.
/// 2. **Path normalization**: All keys in `entries`, as well as `cwd`, are normalized.
/// 3. **Parent consistency**: For any entry at `/a/b/c`, there is an entry `/a/b` of type
///    `Directory`.
///
/// `MapFS` does not model symbolic links, so its `stat()` and `lstat()` agree.
///
/// ### Thread Safety
///
/// Not thread-safe by itself; wrap it in `Mutex`/`RwLock` if it must be shared.
///
/// ### Example
///
/// ```
/// use vfs_walk::{FsBackend, MapFS, WalkDecision};
///
/// let mut fs = MapFS::new();
/// fs.mkfile("/docs/note.txt", Some(b"Hello")).unwrap();
///
/// let mut visited = Vec::new();
/// fs.walk("/", |path, _, _| {
///     visited.push(path.to_path_buf());
///     WalkDecision::Continue
/// })
/// .unwrap();
/// assert_eq!(visited.len(), 3);
/// ```
pub struct MapFS {
    root: PathBuf,                     // host-related absolute normalized path
    cwd: PathBuf,                      // inner absolute normalized path
    entries: BTreeMap<PathBuf, Entry>, // inner absolute normalized paths
}

impl MapFS {
    /// Creates new MapFS instance.
    /// By default, the root directory and current working directory are set to `/`.
    pub fn new() -> Self {
        let inner_root = PathBuf::from("/");
        let mut entries = BTreeMap::new();
        entries.insert(inner_root.clone(), Entry::new(EntryType::Directory));

        Self {
            root: inner_root.clone(),
            cwd: inner_root,
            entries,
        }
    }

    /// Changes root path.
    /// * `path` must be absolute, otherwise an error is returned.
    pub fn set_root<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.is_absolute() {
            return Err(anyhow!("root path must be an absolute"));
        }
        self.root = utils::normalize(path);
        Ok(())
    }

    fn to_inner<P: AsRef<Path>>(&self, inner_path: P) -> PathBuf {
        utils::normalize(self.cwd.join(inner_path))
    }

    /// Immediate children of the directory `dir` (an inner normalized path).
    fn child_names(&self, dir: &Path) -> Vec<OsString> {
        let depth = dir.components().count() + 1;
        self.entries
            .range(dir.to_path_buf()..)
            .skip(1)
            .take_while(|(path, _)| path.starts_with(dir))
            .filter(|(path, _)| path.components().count() == depth)
            .filter_map(|(path, _)| path.file_name().map(|name| name.to_os_string()))
            .collect()
    }
}

impl Default for MapFS {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of a directory's children taken at open time.
struct MapDir {
    names: Vec<OsString>,
}

impl DirHandle for MapDir {
    fn read_names(&mut self) -> Result<Vec<OsString>> {
        Ok(std::mem::take(&mut self.names))
    }
}

impl FsBackend for MapFS {
    /// Returns root path.
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

    /// Checks if a `path` exists in the VFS.
    /// The `path` can be in relative or absolute form.
    fn exists<P: AsRef<Path>>(&self, path: P) -> bool {
        let inner = self.to_inner(path);
        self.entries.contains_key(&inner)
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
            match self.entries.get(&built) {
                Some(entry) if !entry.is_dir() => {
                    return Err(anyhow!("{} is not a directory", built.display()));
                }
                Some(_) => {}
                None => {
                    self.entries
                        .insert(built.clone(), Entry::new(EntryType::Directory));
                }
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
            } else if !self.entries[parent].is_dir() {
                return Err(anyhow!("{} is not a directory", parent.display()));
            }
        }

        let mut entry = Entry::new(EntryType::File);
        if let Some(content) = content {
            entry.set_content(content);
        }
        self.entries.insert(file_path, entry);

        Ok(())
    }

    /// Removes a file or directory at the specified path.
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

        self.entries.retain(|pb, _| !pb.starts_with(&inner_path));
        Ok(())
    }

    /// Opens a directory for listing. Children are captured when the handle is opened.
    fn open_dir<P: AsRef<Path>>(&self, path: P) -> Result<Box<dyn DirHandle + '_>> {
        let inner = self.to_inner(path);
        match self.entries.get(&inner) {
            None => Err(anyhow!("{} does not exist", inner.display())),
            Some(entry) if !entry.is_dir() => {
                Err(anyhow!("{} is not a directory", inner.display()))
            }
            Some(_) => Ok(Box::new(MapDir {
                names: self.child_names(&inner),
            })),
        }
    }

    fn stat<P: AsRef<Path>>(&self, path: P) -> Result<Metadata> {
        let inner = self.to_inner(path);
        let entry = self
            .entries
            .get(&inner)
            .ok_or_else(|| anyhow!("{} does not exist", inner.display()))?;
        Ok(Metadata::new(
            utils::entry_name(&inner),
            entry.entry_type(),
            entry.len(),
        ))
    }

    fn symlink_policy(&self) -> SymlinkPolicy {
        SymlinkPolicy::Follow
    }
}
