//! File-backed key-value namespaces.
//!
//! Each namespace (the catalog, or one table) is a hash map of byte keys to
//! byte values kept in `<dir>/<name>.db`. A [Store] is loaded when opened and
//! written back when closed, through a temporary file renamed over the old
//! one so a crash never leaves a half-written namespace.
//!
//! One process, one writer: nothing here locks the files.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use bytes::{Buf, BufMut};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{Result, StorageError};

const MAGIC: &[u8; 4] = b"RKV1";
const EXTENSION: &str = "db";

/// Whether opening may create a namespace that is not on disk yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Create,
    Existing,
}

/// Root directory holding every namespace.
#[derive(Debug, Clone)]
pub struct Storage {
    dir: PathBuf,
}

impl Storage {
    /// Uses `dir` as the root, creating it if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{EXTENSION}"))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path_for(name).is_file()
    }

    /// Opens a namespace. Prefer [Storage::with_store], which always closes.
    pub fn open_store(&self, name: &str, mode: OpenMode) -> Result<Store> {
        let path = self.path_for(name);
        if !path.is_file() {
            if mode == OpenMode::Existing {
                return Err(StorageError::MissingNamespace(name.to_string()).into());
            }
            debug!(namespace = name, "creating store");
            return Ok(Store {
                name: name.to_string(),
                path,
                entries: HashMap::new(),
                dirty: true,
            });
        }

        let bytes = fs::read(&path)?;
        let entries = decode_entries(&bytes).map_err(|reason| StorageError::Corrupted {
            namespace: name.to_string(),
            reason,
        })?;
        Ok(Store {
            name: name.to_string(),
            path,
            entries,
            dirty: false,
        })
    }

    /// Runs `f` inside an open/close bracket.
    ///
    /// The store is closed whether `f` succeeds or fails, so changes made
    /// before a failure are persisted. The closure's error wins over a close
    /// error.
    pub fn with_store<T, F>(&self, name: &str, mode: OpenMode, f: F) -> Result<T>
    where
        F: FnOnce(&mut Store) -> Result<T>,
    {
        let mut store = self.open_store(name, mode)?;
        let result = f(&mut store);
        let closed = store.close();
        let value = result?;
        closed?;
        Ok(value)
    }

    /// Deletes a namespace file.
    pub fn remove(&self, name: &str) -> Result<()> {
        let path = self.path_for(name);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::MissingNamespace(name.to_string()).into())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// An open namespace.
#[derive(Debug)]
pub struct Store {
    name: String,
    path: PathBuf,
    entries: HashMap<Vec<u8>, Vec<u8>>,
    dirty: bool,
}

impl Store {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.entries.insert(key, value);
        self.dirty = true;
    }

    /// Returns `true` when the key was present.
    pub fn delete(&mut self, key: &[u8]) -> bool {
        let removed = self.entries.remove(key).is_some();
        self.dirty |= removed;
        removed
    }

    pub fn exists(&self, key: &[u8]) -> bool {
        self.entries.contains_key(key)
    }

    /// Iterates every entry in hash order. Each call starts a fresh pass.
    pub fn scan(&self) -> impl Iterator<Item = (&[u8], &[u8])> {
        self.entries
            .iter()
            .map(|(k, v)| (k.as_slice(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Writes the namespace back if anything changed.
    pub fn close(self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&encode_entries(&self.entries))?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| StorageError::Io(e.error))?;
        debug!(namespace = %self.name, entries = self.entries.len(), "store persisted");
        Ok(())
    }
}

fn encode_entries(entries: &HashMap<Vec<u8>, Vec<u8>>) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.put_slice(MAGIC);
    buf.put_u32(entries.len() as u32);
    for (key, value) in entries {
        buf.put_u32(key.len() as u32);
        buf.put_slice(key);
        buf.put_u32(value.len() as u32);
        buf.put_slice(value);
    }
    buf
}

fn decode_entries(mut buf: &[u8]) -> std::result::Result<HashMap<Vec<u8>, Vec<u8>>, String> {
    if buf.remaining() < MAGIC.len() + 4 || &buf[..MAGIC.len()] != MAGIC {
        return Err("missing store header".into());
    }
    buf.advance(MAGIC.len());
    let count = buf.get_u32();

    // The header count is untrusted; entries grow as they are read.
    let mut entries = HashMap::new();
    for _ in 0..count {
        let key = take(&mut buf)?;
        let value = take(&mut buf)?;
        entries.insert(key, value);
    }
    if buf.has_remaining() {
        return Err(format!("{} trailing bytes", buf.remaining()));
    }
    Ok(entries)
}

fn take(buf: &mut &[u8]) -> std::result::Result<Vec<u8>, String> {
    if buf.remaining() < 4 {
        return Err("truncated length".into());
    }
    let len = buf.get_u32() as usize;
    if buf.remaining() < len {
        return Err("truncated entry".into());
    }
    let out = buf[..len].to_vec();
    buf.advance(len);
    Ok(out)
}
