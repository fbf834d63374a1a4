//! Random-access reader for the game's zip-structured `Data.p4k` container.
//!
//! Only what the extractor needs: open, scan a directory for a file name, read one entry.
//! Entries are stored, deflated, or zstd under either zip's method id or the game's (100).
//! Every data problem (missing file, bad central directory, corrupt stream, CRC mismatch)
//! surfaces as `false` / `None` / an empty list, never as a panic.

use std::{
    io::Read,
    path::{Path, PathBuf},
    sync::Arc,
};

use zip::{CompressionMethod, ZipArchive};

use crate::fs::{FileSystem, ReadSeek};
use crate::util::text::decode_text;

/// Upper bound for the up-front buffer reservation; declared sizes are untrusted.
const MAX_PREALLOC: u64 = 16 * 1024 * 1024;

/// Compression method id the game container uses for zstd streams (zip's own id is 93).
pub const P4K_ZSTD_METHOD: u16 = 100;

/// One file inside the container, as seen by a directory scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Position in the central directory; reads seek straight to it.
    pub index: usize,
    /// Container-relative path, forward slashes.
    pub path: String,
    /// Byte offset of the entry's data within the container.
    pub offset: u64,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub is_compressed: bool,
}

impl ArchiveEntry {
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

pub struct P4kArchive {
    fs: Arc<dyn FileSystem>,
    archive: Option<ZipArchive<Box<dyn ReadSeek>>>,
    path: Option<PathBuf>,
}

impl P4kArchive {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            archive: None,
            path: None,
        }
    }

    /// Open `path` for random access. Any previously open container is closed first.
    /// Returns `false` for a missing/unreadable file or a malformed container; the stream is
    /// dropped before returning in every failure case.
    pub fn open(&mut self, path: &Path) -> bool {
        self.close();
        if !self.fs.file_exists(path) {
            return false;
        }
        let Ok(reader) = self.fs.open_read(path) else {
            return false;
        };
        match ZipArchive::new(reader) {
            Ok(archive) => {
                self.archive = Some(archive);
                self.path = Some(path.to_path_buf());
                true
            }
            Err(_) => false,
        }
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.archive.is_some()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Number of entries in the central directory (0 when closed).
    pub fn len(&self) -> usize {
        self.archive.as_ref().map_or(0, |a| a.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries under `directory_prefix` whose file name equals `filename` (both case-insensitive).
    /// `"Data/Libs/Config"` and `"Libs/Config"` address the same location.
    pub fn scan_directory(&mut self, directory_prefix: &str, filename: &str) -> Vec<ArchiveEntry> {
        self.scan(directory_prefix, Some(filename))
    }

    /// Every file entry under `directory_prefix`.
    pub fn list_directory(&mut self, directory_prefix: &str) -> Vec<ArchiveEntry> {
        self.scan(directory_prefix, None)
    }

    fn scan(&mut self, directory_prefix: &str, filename: Option<&str>) -> Vec<ArchiveEntry> {
        let Some(archive) = self.archive.as_mut() else {
            return Vec::new();
        };
        let prefix = logical_dir(directory_prefix);
        let wanted = filename.map(|f| f.trim().to_lowercase());

        let mut out = Vec::new();
        for index in 0..archive.len() {
            let Ok(file) = archive.by_index_raw(index) else {
                continue;
            };
            if file.is_dir() {
                continue;
            }
            let path = normalize_entry_path(file.name());
            let (dir, name) = match path.rfind('/') {
                Some(i) => (&path[..i], &path[i + 1..]),
                None => ("", path.as_str()),
            };
            if let Some(w) = wanted.as_deref() {
                if name.to_lowercase() != w {
                    continue;
                }
            }
            if !dir_has_prefix(&logical_dir(dir), &prefix) {
                continue;
            }
            out.push(ArchiveEntry {
                index,
                offset: file.data_start(),
                compressed_size: file.compressed_size(),
                uncompressed_size: file.size(),
                is_compressed: file.compression() != CompressionMethod::Stored,
                path,
            });
        }
        out
    }

    /// Entry bytes, decompressed. `None` if the entry can't be located or fails to decode.
    pub fn read_bytes(&mut self, entry: &ArchiveEntry) -> Option<Vec<u8>> {
        let archive = self.archive.as_mut()?;
        let index = locate(archive, entry)?;
        let method = archive.by_index_raw(index).ok()?.compression();
        if is_p4k_zstd(method) {
            return read_p4k_zstd(archive, index);
        }

        let mut file = archive.by_index(index).ok()?;
        let expected = file.size();
        let mut buf = Vec::with_capacity(expected.min(MAX_PREALLOC) as usize);
        file.read_to_end(&mut buf).ok()?;
        if buf.len() as u64 != expected {
            return None;
        }
        Some(buf)
    }

    /// Entry decoded as text (BOM / UTF-16 aware, lossy on invalid UTF-8).
    pub fn read_text(&mut self, entry: &ArchiveEntry) -> Option<String> {
        self.read_bytes(entry).map(|b| decode_text(&b))
    }

    /// Idempotent; safe when never opened.
    pub fn close(&mut self) {
        self.archive = None;
        self.path = None;
    }
}

impl Drop for P4kArchive {
    fn drop(&mut self) {
        self.close();
    }
}

/// Entry index for `entry`, checking the recorded index still points at the same path
/// (entries from another container or a reopened one fall back to a path search).
fn locate(archive: &mut ZipArchive<Box<dyn ReadSeek>>, entry: &ArchiveEntry) -> Option<usize> {
    if let Ok(file) = archive.by_index_raw(entry.index) {
        if normalize_entry_path(file.name()) == entry.path {
            return Some(entry.index);
        }
    }
    (0..archive.len()).find(|&i| {
        archive
            .by_index_raw(i)
            .is_ok_and(|f| normalize_entry_path(f.name()) == entry.path)
    })
}

#[allow(deprecated)]
fn is_p4k_zstd(method: CompressionMethod) -> bool {
    method == CompressionMethod::Unsupported(P4K_ZSTD_METHOD)
}

/// The zip reader refuses method 100, so decode the raw stream here. Output is capped one byte
/// past the declared size; anything other than exactly that size is corrupt.
fn read_p4k_zstd(archive: &mut ZipArchive<Box<dyn ReadSeek>>, index: usize) -> Option<Vec<u8>> {
    let raw = archive.by_index_raw(index).ok()?;
    let expected = raw.size();
    let decoder = zstd::stream::read::Decoder::new(raw).ok()?;

    let mut buf = Vec::with_capacity(expected.min(MAX_PREALLOC) as usize);
    decoder.take(expected.saturating_add(1)).read_to_end(&mut buf).ok()?;
    if buf.len() as u64 != expected {
        return None;
    }
    Some(buf)
}

/// Forward slashes, no leading `./` or separators.
pub fn normalize_entry_path(raw: &str) -> String {
    let s = raw.replace('\\', "/");
    let s = s.trim_start_matches("./");
    s.trim_start_matches('/').to_string()
}

/// Lowercased directory with separators trimmed and an optional leading `data` segment removed.
fn logical_dir(dir: &str) -> String {
    let lower = dir.replace('\\', "/").to_lowercase();
    let trimmed = lower.trim_matches('/');
    if trimmed == "data" {
        return String::new();
    }
    trimmed
        .strip_prefix("data/")
        .unwrap_or(trimmed)
        .trim_matches('/')
        .to_string()
}

fn dir_has_prefix(dir: &str, prefix: &str) -> bool {
    prefix.is_empty()
        || dir == prefix
        || (dir.starts_with(prefix) && dir.as_bytes().get(prefix.len()) == Some(&b'/'))
}
