//! File-system seam used by the archive reader, the metadata service and the output writer.
//!
//! `RealFileSystem` talks to disk; `MemoryFileSystem` is an in-memory double with explicit
//! timestamps so fingerprint decisions can be exercised without sleeping on real mtimes.

use std::{
    collections::HashMap,
    fs,
    io::{self, Cursor, Read, Seek},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::util::text::decode_text;

/// Anything we can hand to the zip reader.
pub trait ReadSeek: Read + Seek + Send {}
impl<T: Read + Seek + Send> ReadSeek for T {}

/// Size + last write time of a file; the only thing fingerprints compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStamp {
    pub size: u64,
    pub last_write: DateTime<Utc>,
}

pub trait FileSystem: Send + Sync {
    fn file_exists(&self, path: &Path) -> bool;

    /// Whole file as text (BOM/UTF-16 tolerant, lossy on invalid UTF-8).
    fn read_all_text(&self, path: &Path) -> io::Result<String>;

    fn read_all_lines(&self, path: &Path) -> io::Result<Vec<String>> {
        Ok(self
            .read_all_text(path)?
            .lines()
            .map(str::to_string)
            .collect())
    }

    fn open_read(&self, path: &Path) -> io::Result<Box<dyn ReadSeek>>;

    /// `None` when the file does not exist or its metadata can't be read.
    fn stamp(&self, path: &Path) -> Option<FileStamp>;

    /// Replace `path` with `bytes` so readers never observe a half-written file.
    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;
}

/// Disk-backed implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn file_exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read_all_text(&self, path: &Path) -> io::Result<String> {
        let bytes = fs::read(path)?;
        Ok(decode_text(&bytes))
    }

    fn open_read(&self, path: &Path) -> io::Result<Box<dyn ReadSeek>> {
        let file = fs::File::open(path)?;
        Ok(Box::new(io::BufReader::new(file)))
    }

    fn stamp(&self, path: &Path) -> Option<FileStamp> {
        let meta = fs::metadata(path).ok()?;
        if !meta.is_file() {
            return None;
        }
        let modified = meta.modified().ok()?;
        Some(FileStamp {
            size: meta.len(),
            last_write: DateTime::<Utc>::from(modified),
        })
    }

    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = temp_sibling(path);
        fs::write(&tmp, bytes)?;
        if let Err(e) = fs::rename(&tmp, path) {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
        Ok(())
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[derive(Debug, Clone)]
struct MemFile {
    bytes: Vec<u8>,
    last_write: DateTime<Utc>,
}

/// In-memory file system keyed by exact path.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: RwLock<HashMap<PathBuf, MemFile>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &self,
        path: impl Into<PathBuf>,
        bytes: impl Into<Vec<u8>>,
        last_write: DateTime<Utc>,
    ) {
        self.files.write().insert(
            path.into(),
            MemFile {
                bytes: bytes.into(),
                last_write,
            },
        );
    }

    pub fn remove(&self, path: &Path) -> bool {
        self.files.write().remove(path).is_some()
    }

    /// Change a file's timestamp without touching its bytes.
    pub fn touch(&self, path: &Path, last_write: DateTime<Utc>) -> bool {
        match self.files.write().get_mut(path) {
            Some(f) => {
                f.last_write = last_write;
                true
            }
            None => false,
        }
    }

    pub fn bytes(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.read().get(path).map(|f| f.bytes.clone())
    }
}

impl FileSystem for MemoryFileSystem {
    fn file_exists(&self, path: &Path) -> bool {
        self.files.read().contains_key(path)
    }

    fn read_all_text(&self, path: &Path) -> io::Result<String> {
        let files = self.files.read();
        let f = files.get(path).ok_or_else(|| not_found(path))?;
        Ok(decode_text(&f.bytes))
    }

    fn open_read(&self, path: &Path) -> io::Result<Box<dyn ReadSeek>> {
        let files = self.files.read();
        let f = files.get(path).ok_or_else(|| not_found(path))?;
        Ok(Box::new(Cursor::new(f.bytes.clone())))
    }

    fn stamp(&self, path: &Path) -> Option<FileStamp> {
        self.files.read().get(path).map(|f| FileStamp {
            size: f.bytes.len() as u64,
            last_write: f.last_write,
        })
    }

    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        self.insert(path, bytes.to_vec(), Utc::now());
        Ok(())
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("{} not found", path.display()),
    )
}
