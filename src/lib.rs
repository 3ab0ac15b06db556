//! Deterministic directory tree walking over virtual file systems (VFS).
//!
//! ### Overview
//!
//! `vfs-walk` walks a tree of entries exposed by any `FsBackend` and guarantees the same
//! traversal contract whatever storage sits behind it: a real directory (`DirFS`), a purely
//! in-memory tree (`MapFS`) or a filtering view over another backend (`RegexFS`).
//!
//! **Key ideas**:
//! - **Deterministic**: Depth-first, pre-order, children in byte-wise sorted name order.
//! - **Visitor decides**: Every open, list or stat failure is handed to the visitor, which
//!   returns `WalkDecision::Continue`, `SkipSubtree` or `Abort(err)`.
//! - **No link following**: Backends declare a `SymlinkPolicy`; link-aware backends are
//!   walked with `lstat()` so links are reported as themselves.
//! - **Extensibility**: Plug in your own storage by implementing `FsBackend`.
//!
//! ### Example
//!
//! ```
//! use vfs_walk::{FsBackend, MapFS, WalkDecision};
//!
//! let mut fs = MapFS::new();
//! fs.mkfile("/b.txt", None).unwrap();
//! fs.mkfile("/a/inner.txt", None).unwrap();
//!
//! let mut seen = Vec::new();
//! fs.walk("/", |path, _meta, err| {
//!     if let Some(err) = err {
//!         return WalkDecision::Abort(err.into());
//!     }
//!     seen.push(path.display().to_string());
//!     WalkDecision::Continue
//! })
//! .unwrap();
//!
//! assert_eq!(seen, ["/", "/a", "/a/inner.txt", "/b.txt"]);
//! ```

mod core;
mod error;
mod vfs;
mod walk;

pub use crate::core::{DirHandle, FsBackend, Metadata, Result, SymlinkPolicy};
pub use error::WalkError;
pub use vfs::{DirFS, Entry, EntryType, MapFS, RegexFS};
pub use walk::{WalkDecision, read_dir_names, resolve_metadata, walk};
