//! Test utilities shared by the unit tests.
//!
//! Builders for binary registry payloads and an in-memory filesystem that
//! accepts Windows paths on any host.

#![cfg(test)]

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};

use crate::filesystem::{EntryIter, FileEntry, FileSystemProvider};
use crate::models::FileTimes;
use crate::shimcache::{HeaderVariant, SHIM_SIGNATURE};
use crate::utils::time::FILETIME_EPOCH;

/// Midnight UTC on the given day.
pub fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
}

/// FILETIME of an instant (microsecond precision).
pub fn filetime_of(instant: DateTime<Utc>) -> u64 {
    let micros = (instant - *FILETIME_EPOCH).num_microseconds().unwrap();
    (micros as u64) * 10
}

/// 72-byte UserAssist `Count` value with the last-run time at offset 60.
pub fn user_assist_data(filetime: u64) -> Vec<u8> {
    let mut data = vec![0u8; 72];
    data[4..8].copy_from_slice(&3u32.to_le_bytes());
    data[60..68].copy_from_slice(&filetime.to_le_bytes());
    data
}

fn utf16(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(|unit| unit.to_le_bytes()).collect()
}

/// One Windows 10 AppCompatCache record.
pub struct ShimRecord {
    path: String,
    filetime: u64,
    data: Vec<u8>,
}

impl ShimRecord {
    pub fn new(path: &str, filetime: u64) -> Self {
        ShimRecord {
            path: path.to_string(),
            filetime,
            data: Vec::new(),
        }
    }

    pub fn with_data(mut self, data: Vec<u8>) -> Self {
        self.data = data;
        self
    }

    fn encode(&self) -> Vec<u8> {
        let path = utf16(&self.path);
        let mut entry = Vec::new();
        entry.extend_from_slice(&(path.len() as u16).to_le_bytes());
        entry.extend_from_slice(&path);
        entry.extend_from_slice(&self.filetime.to_le_bytes());
        entry.extend_from_slice(&(self.data.len() as u32).to_le_bytes());
        entry.extend_from_slice(&self.data);

        let mut record = Vec::new();
        record.extend_from_slice(SHIM_SIGNATURE);
        record.extend_from_slice(&0u32.to_le_bytes());
        record.extend_from_slice(&(entry.len() as u32).to_le_bytes());
        record.extend_from_slice(&entry);
        record
    }
}

/// Zeroed header of the given variant followed by the encoded records.
pub fn shimcache_blob(variant: HeaderVariant, records: &[ShimRecord]) -> Vec<u8> {
    let mut blob = vec![0u8; variant.header_len()];
    blob[0..4].copy_from_slice(&(variant.header_len() as u32).to_le_bytes());
    for record in records {
        blob.extend_from_slice(&record.encode());
    }
    blob
}

fn normalize(path: &Path) -> String {
    path.to_string_lossy()
        .split(|c: char| c == '\\' || c == '/')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\\")
        .to_lowercase()
}

/// Filesystem holding only the files added to it. Directories exist
/// implicitly as the parents of those files. Paths compare
/// case-insensitively with either separator.
#[derive(Default)]
pub struct FakeFileSystem {
    files: Vec<(String, String, FileTimes)>,
}

impl FakeFileSystem {
    pub fn new() -> Self {
        FakeFileSystem::default()
    }

    pub fn add_file(&mut self, path: &str, times: FileTimes) -> &mut Self {
        let original = path
            .split(|c: char| c == '\\' || c == '/')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\\");
        self.files.push((original.to_lowercase(), original, times));
        self
    }

    /// Files under `dir` as (path relative to `dir`, times).
    fn below(&self, dir: &Path) -> Vec<(String, FileTimes)> {
        let prefix = format!("{}\\", normalize(dir));
        self.files
            .iter()
            .filter(|(key, _, _)| key.starts_with(&prefix))
            .map(|(_, original, times)| (original[prefix.len()..].to_string(), *times))
            .collect()
    }
}

impl FileSystemProvider for FakeFileSystem {
    fn stat(&self, path: &Path) -> io::Result<FileTimes> {
        let key = normalize(path);
        self.files
            .iter()
            .find(|(candidate, _, _)| *candidate == key)
            .map(|(_, _, times)| *times)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, key))
    }

    fn list_directory<'a>(&'a self, path: &Path) -> EntryIter<'a> {
        let mut entries: Vec<FileEntry> = Vec::new();
        for (relative, times) in self.below(path) {
            match relative.split_once('\\') {
                None => entries.push(FileEntry {
                    path: PathBuf::from(relative),
                    times,
                    is_dir: false,
                }),
                Some((dir, _)) => {
                    let seen = entries
                        .iter()
                        .any(|e| e.is_dir && e.display_name().eq_ignore_ascii_case(dir));
                    if !seen {
                        entries.push(FileEntry {
                            path: PathBuf::from(dir),
                            times: FileTimes::default(),
                            is_dir: true,
                        });
                    }
                }
            }
        }
        Box::new(entries.into_iter())
    }

    fn walk_tree<'a>(&'a self, path: &Path) -> EntryIter<'a> {
        Box::new(self.below(path).into_iter().map(|(relative, times)| FileEntry {
            path: PathBuf::from(relative),
            times,
            is_dir: false,
        }))
    }
}
