mod dir_fs;
mod entry;
mod map_fs;
mod regex_fs;

pub use dir_fs::DirFS;
pub use entry::{Entry, EntryType};
pub use map_fs::MapFS;
pub use regex_fs::RegexFS;
