//! A filtering backend: regular files whose name does not match a regular expression are
//! invisible. Directories are always visible so the tree stays navigable.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::anyhow;
use regex::Regex;

use crate::core::{DirHandle, FsBackend, Metadata, Result, SymlinkPolicy};
use crate::walk::resolve_metadata;

/// Wraps another backend and hides every non-directory entry whose file name fails `regex`.
///
/// Hidden entries behave as if they did not exist: `stat()` reports them missing, listings
/// omit them, and `mkfile()` refuses to create them. The wrapper keeps the symlink policy of
/// the backend it wraps.
///
/// ### Example
/// ```
/// use vfs_walk::{FsBackend, MapFS, RegexFS};
///
/// let mut inner = MapFS::new();
/// inner.mkfile("/src/lib.rs", None).unwrap();
/// inner.mkfile("/src/notes.txt", None).unwrap();
///
/// let fs = RegexFS::new(inner, r"\.rs$").unwrap();
/// assert!(fs.exists("/src/lib.rs"));
/// assert!(!fs.exists("/src/notes.txt"));
/// assert!(fs.exists("/src"));
/// ```
pub struct RegexFS<F: FsBackend> {
    inner: F,
    regex: Regex,
}

impl<F: FsBackend> RegexFS<F> {
    /// Compiles `pattern` and wraps `inner`. Fails if the pattern is not a valid regex.
    pub fn new(inner: F, pattern: &str) -> Result<Self> {
        Ok(Self::with_regex(inner, Regex::new(pattern)?))
    }

    pub fn with_regex(inner: F, regex: Regex) -> Self {
        Self { inner, regex }
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    pub fn inner(&self) -> &F {
        &self.inner
    }

    pub fn into_inner(self) -> F {
        self.inner
    }

    fn name_matches(&self, path: &Path) -> bool {
        match path.file_name() {
            Some(name) => self.regex.is_match(&name.to_string_lossy()),
            None => true,
        }
    }

    fn filter(&self, path: &Path, meta: Metadata) -> Result<Metadata> {
        if meta.is_dir() || self.name_matches(path) {
            Ok(meta)
        } else {
            Err(anyhow!("{} does not exist", path.display()))
        }
    }

    /// Non-matching entries are listed only when they resolve to a directory under the inner
    /// backend's symlink policy, the same lookup the walker uses.
    fn is_listed(&self, path: &Path) -> bool {
        self.name_matches(path)
            || resolve_metadata(&self.inner, path).is_ok_and(|meta| meta.is_dir())
    }
}

struct FilteredDir<'a, F: FsBackend> {
    fs: &'a RegexFS<F>,
    dir: PathBuf,
    handle: Box<dyn DirHandle + 'a>,
}

impl<F: FsBackend> DirHandle for FilteredDir<'_, F> {
    fn read_names(&mut self) -> Result<Vec<OsString>> {
        let names = self.handle.read_names()?;
        Ok(names
            .into_iter()
            .filter(|name| self.fs.is_listed(&self.dir.join(name)))
            .collect())
    }
}

impl<F: FsBackend> FsBackend for RegexFS<F> {
    fn root(&self) -> &Path {
        self.inner.root()
    }

    fn cwd(&self) -> &Path {
        self.inner.cwd()
    }

    fn cd<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        if !self.is_dir(path)? {
            return Err(anyhow!("{} not a directory", path.display()));
        }
        self.inner.cd(path)
    }

    fn exists<P: AsRef<Path>>(&self, path: P) -> bool {
        self.lstat(path).is_ok()
    }

    fn mkdir<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.inner.mkdir(path)
    }

    fn mkfile<P: AsRef<Path>>(&mut self, file_path: P, content: Option<&[u8]>) -> Result<()> {
        let file_path = file_path.as_ref();
        if !self.name_matches(file_path) {
            return Err(anyhow!(
                "{} is filtered out by {}",
                file_path.display(),
                self.regex
            ));
        }
        self.inner.mkfile(file_path, content)
    }

    fn rm<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        if !self.exists(path) {
            return Err(anyhow!("{} does not exist", path.display()));
        }
        self.inner.rm(path)
    }

    fn open_dir<P: AsRef<Path>>(&self, path: P) -> Result<Box<dyn DirHandle + '_>> {
        let dir = path.as_ref();
        let handle = self.inner.open_dir(dir)?;
        Ok(Box::new(FilteredDir {
            fs: self,
            dir: dir.to_path_buf(),
            handle,
        }))
    }

    fn stat<P: AsRef<Path>>(&self, path: P) -> Result<Metadata> {
        let path = path.as_ref();
        let meta = self.inner.stat(path)?;
        self.filter(path, meta)
    }

    fn lstat<P: AsRef<Path>>(&self, path: P) -> Result<Metadata> {
        let path = path.as_ref();
        let meta = self.inner.lstat(path)?;
        self.filter(path, meta)
    }

    fn symlink_policy(&self) -> SymlinkPolicy {
        self.inner.symlink_policy()
    }
}
