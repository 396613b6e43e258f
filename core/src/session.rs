//! Client-side credential storage.
//!
//! The request pipeline only ever reads from a `SessionStore`. Writing the
//! token (after login) and clearing it (on logout) is the owning
//! application's business, which is why the concrete stores expose `set`
//! and `remove` as inherent methods rather than on the trait.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

/// Key under which the bearer credential is stored.
pub const TOKEN_KEY: &str = "token";

/// Read access to persisted client session values.
pub trait SessionStore {
    fn get(&self, key: &str) -> Option<String>;
}

impl<S: SessionStore + ?Sized> SessionStore for &S {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }
}

impl<S: SessionStore + ?Sized> SessionStore for Arc<S> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }
}

/// In-memory store shared for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, key: &str, value: impl Into<String>) {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value.into());
    }

    pub fn remove(&self, key: &str) -> Option<String> {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        values.remove(key)
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Option<String> {
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
        values.get(key).cloned()
    }
}

/// Store persisted as a flat JSON object of strings on disk.
///
/// The file is re-read on every `get`, so a value written by another
/// component (or process) is picked up by the next request. A missing or
/// unparsable file reads as empty. Writes go to a sibling temporary file
/// that is renamed over the store, so readers never see a partial file;
/// `set` and `remove` refuse to rewrite a file they cannot parse.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn set(&self, key: &str, value: impl Into<String>) -> io::Result<()> {
        let mut values = self.load_for_update()?;
        values.insert(key.to_string(), value.into());
        self.save(&values)
    }

    pub fn remove(&self, key: &str) -> io::Result<Option<String>> {
        let mut values = self.load_for_update()?;
        let removed = values.remove(key);
        if removed.is_some() {
            self.save(&values)?;
        }
        Ok(removed)
    }

    fn load(&self) -> HashMap<String, String> {
        fs::read_to_string(&self.path)
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default()
    }

    fn load_for_update(&self) -> io::Result<HashMap<String, String>> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e),
        }
    }

    fn save(&self, values: &HashMap<String, String>) -> io::Result<()> {
        let raw = serde_json::to_string_pretty(values)?;
        let tmp = self.temp_path();
        fs::write(&tmp, raw)?;
        fs::rename(&tmp, &self.path).inspect_err(|_| {
            let _ = fs::remove_file(&tmp);
        })
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(format!(".{}.tmp", std::process::id()));
        self.path.with_file_name(name)
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.load().remove(key)
    }
}
