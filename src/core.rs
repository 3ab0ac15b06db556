use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use crate::error::WalkError;
use crate::walk::{self, WalkDecision};
use crate::EntryType;

pub type Result<T> = std::result::Result<T, anyhow::Error>;

/// How a backend resolves metadata for paths that may be symbolic links.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SymlinkPolicy {
    /// Stat follows links (or the backend has no links at all).
    Follow,
    /// The backend models real links and the walker must see the link itself.
    NoFollow,
}

/// Metadata of a single entry, as reported by `FsBackend::stat()` or `FsBackend::lstat()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    name: OsString,
    entry_type: EntryType,
    len: u64,
}

impl Metadata {
    pub fn new<N: Into<OsString>>(name: N, entry_type: EntryType, len: u64) -> Self {
        Self {
            name: name.into(),
            entry_type,
            len,
        }
    }

    /// Final path component; `/` for the virtual root.
    pub fn name(&self) -> &OsStr {
        &self.name
    }

    pub fn entry_type(&self) -> EntryType {
        self.entry_type
    }

    /// Size in bytes (content length for files).
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_dir(&self) -> bool {
        self.entry_type == EntryType::Directory
    }

    pub fn is_file(&self) -> bool {
        self.entry_type == EntryType::File
    }

    pub fn is_symlink(&self) -> bool {
        self.entry_type == EntryType::Symlink
    }
}

/// An open directory. The handle is released when dropped.
pub trait DirHandle {
    /// Reads the names of all entries in the directory, in no particular order.
    fn read_names(&mut self) -> Result<Vec<OsString>>;
}

pub trait FsBackend {
    fn root(&self) -> &Path;
    fn cwd(&self) -> &Path;
    fn cd<P: AsRef<Path>>(&mut self, path: P) -> Result<()>;
    fn exists<P: AsRef<Path>>(&self, path: P) -> bool;
    fn mkdir<P: AsRef<Path>>(&mut self, path: P) -> Result<()>;
    fn mkfile<P: AsRef<Path>>(&mut self, file_path: P, content: Option<&[u8]>) -> Result<()>;
    fn rm<P: AsRef<Path>>(&mut self, path: P) -> Result<()>;

    /// Opens the directory at `path` for listing.
    fn open_dir<P: AsRef<Path>>(&self, path: P) -> Result<Box<dyn DirHandle + '_>>;

    /// Returns metadata of `path`, following a trailing symbolic link.
    fn stat<P: AsRef<Path>>(&self, path: P) -> Result<Metadata>;

    /// Returns metadata of `path` without following a trailing symbolic link.
    fn lstat<P: AsRef<Path>>(&self, path: P) -> Result<Metadata> {
        self.stat(path)
    }

    /// States which stat flavour the walker must use on this backend.
    fn symlink_policy(&self) -> SymlinkPolicy;

    fn is_dir<P: AsRef<Path>>(&self, path: P) -> Result<bool> {
        Ok(self.stat(path)?.is_dir())
    }

    fn is_file<P: AsRef<Path>>(&self, path: P) -> Result<bool> {
        Ok(self.stat(path)?.is_file())
    }

    /// Walks the tree rooted at `root`, see [`walk::walk`].
    fn walk<P, V>(&self, root: P, visitor: V) -> Result<()>
    where
        Self: Sized,
        P: AsRef<Path>,
        V: FnMut(&Path, Option<&Metadata>, Option<WalkError>) -> WalkDecision,
    {
        walk::walk(self, root, visitor)
    }
}

pub(crate) mod utils {
    use super::*;
    use std::path::Component;

    /// Resolves `.` and `..` components and drops trailing separators.
    /// `..` never climbs above the root.
    pub fn normalize<P: AsRef<Path>>(path: P) -> PathBuf {
        let mut result = PathBuf::new();
        for component in path.as_ref().components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    if result.parent().is_some() {
                        result.pop();
                    }
                }
                _ => result.push(component),
            }
        }
        result
    }

    pub fn is_virtual_root<P: AsRef<Path>>(path: P) -> bool {
        let mut components = path.as_ref().components();
        matches!(
            (components.next(), components.next()),
            (Some(Component::RootDir), None)
        )
    }

    /// Entry name used in `Metadata`: the last component, or `/` for the root.
    pub fn entry_name<P: AsRef<Path>>(path: P) -> OsString {
        path.as_ref()
            .file_name()
            .map(OsStr::to_os_string)
            .unwrap_or_else(|| OsString::from("/"))
    }

    /// Removes a host file, symlink or directory tree.
    pub fn rm_on_host<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        let meta = std::fs::symlink_metadata(path)?;
        if meta.is_dir() {
            std::fs::remove_dir_all(path)?;
        } else {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

}
