//! Filesystem metadata collection.
//!
//! Directory listings and tree walks are lazy iterators that swallow every
//! error: a missing or unreadable directory yields nothing, an unreadable
//! entry is skipped. `stat` is the one call that reports failure, since the
//! persistence aggregator needs to know when a derived path does not exist.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::debug;
use walkdir::WalkDir;

use crate::models::FileTimes;

/// One entry produced by a listing or walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Entry name for a listing, path relative to the walk root for a walk.
    pub path: PathBuf,
    pub times: FileTimes,
    pub is_dir: bool,
}

impl FileEntry {
    pub fn display_name(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }
}

pub type EntryIter<'a> = Box<dyn Iterator<Item = FileEntry> + 'a>;

/// Join a Windows-style relative path (`\` or `/` separated) onto `root`.
pub fn resolve_under(root: &Path, relative: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    for segment in relative
        .split(|c: char| c == '\\' || c == '/')
        .filter(|s| !s.is_empty())
    {
        path.push(segment);
    }
    path
}

/// Read-only view of a filesystem.
pub trait FileSystemProvider {
    /// Created/accessed/modified times of `path`.
    fn stat(&self, path: &Path) -> io::Result<FileTimes>;

    /// Immediate entries of `path`, files and directories alike.
    fn list_directory<'a>(&'a self, path: &Path) -> EntryIter<'a>;

    /// Regular files below `path`, depth-first. Directories are descended
    /// into but not yielded.
    fn walk_tree<'a>(&'a self, path: &Path) -> EntryIter<'a>;
}

/// The filesystem of the running host.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    pub fn new() -> Self {
        LocalFileSystem
    }
}

#[cfg(target_os = "windows")]
fn file_times(metadata: &fs::Metadata) -> FileTimes {
    use std::os::windows::fs::MetadataExt;

    use crate::utils::time::filetime_to_utc;

    FileTimes {
        created: Some(filetime_to_utc(metadata.creation_time())),
        accessed: Some(filetime_to_utc(metadata.last_access_time())),
        modified: Some(filetime_to_utc(metadata.last_write_time())),
    }
}

// Creation time is not recorded by every filesystem, so each field is optional.
#[cfg(not(target_os = "windows"))]
fn file_times(metadata: &fs::Metadata) -> FileTimes {
    use crate::utils::time::system_time_to_utc;

    FileTimes {
        created: metadata.created().ok().map(system_time_to_utc),
        accessed: metadata.accessed().ok().map(system_time_to_utc),
        modified: metadata.modified().ok().map(system_time_to_utc),
    }
}

impl FileSystemProvider for LocalFileSystem {
    fn stat(&self, path: &Path) -> io::Result<FileTimes> {
        fs::metadata(path).map(|metadata| file_times(&metadata))
    }

    fn list_directory<'a>(&'a self, path: &Path) -> EntryIter<'a> {
        let entries = match fs::read_dir(path) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Cannot list {}: {}", path.display(), e);
                return Box::new(std::iter::empty());
            }
        };

        Box::new(entries.filter_map(|entry| {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("Skipping unreadable directory entry: {}", e);
                    return None;
                }
            };
            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(e) => {
                    debug!("Cannot access metadata for {}: {}", entry.path().display(), e);
                    return None;
                }
            };
            Some(FileEntry {
                path: PathBuf::from(entry.file_name()),
                times: file_times(&metadata),
                is_dir: metadata.is_dir(),
            })
        }))
    }

    fn walk_tree<'a>(&'a self, path: &Path) -> EntryIter<'a> {
        let root = path.to_path_buf();
        let walker = WalkDir::new(&root).follow_links(false).into_iter();

        Box::new(walker.filter_map(move |entry| {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("Walk error under {}: {}", root.display(), e);
                    return None;
                }
            };
            if !entry.file_type().is_file() {
                return None;
            }
            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(e) => {
                    debug!("Cannot access metadata for {}: {}", entry.path().display(), e);
                    return None;
                }
            };
            let relative = entry
                .path()
                .strip_prefix(&root)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| entry.path().to_path_buf());
            Some(FileEntry {
                path: relative,
                times: file_times(&metadata),
                is_dir: false,
            })
        }))
    }
}
