//! Durable storage for the last applied endpoint.
//!
//! The file format is two text lines: host, then port. Whatever is read
//! back is replayed through the same validation as interactive input, so
//! a damaged file only means "no endpoint".

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::info;

use crate::endpoint::Endpoint;
use crate::error::FaderError;

/// Raw field text as read from storage, not yet validated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredEndpoint {
    pub host: Option<String>,
    pub port: Option<String>,
}

impl StoredEndpoint {
    fn parse(contents: &str) -> Self {
        let mut lines = contents.lines();
        let mut field = || {
            lines
                .next()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(String::from)
        };
        let host = field();
        let port = field();
        Self { host, port }
    }
}

impl From<&Endpoint> for StoredEndpoint {
    fn from(endpoint: &Endpoint) -> Self {
        Self {
            host: Some(endpoint.host().to_string()),
            port: Some(endpoint.port().to_string()),
        }
    }
}

/// Where the connection manager keeps its last good endpoint.
pub trait EndpointStore: Send {
    /// `Ok(None)` when nothing has been stored yet.
    fn load(&self) -> Result<Option<StoredEndpoint>, FaderError>;

    fn save(&mut self, endpoint: &Endpoint) -> Result<(), FaderError>;
}

// ── FileEndpointStore ────────────────────────────────────────────

/// Two-line text file store.
#[derive(Debug, Clone)]
pub struct FileEndpointStore {
    path: PathBuf,
}

impl FileEndpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EndpointStore for FileEndpointStore {
    fn load(&self) -> Result<Option<StoredEndpoint>, FaderError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(StoredEndpoint::parse(&contents))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("no saved endpoint at {}", self.path.display());
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn save(&mut self, endpoint: &Endpoint) -> Result<(), FaderError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(
            &self.path,
            format!("{}\n{}\n", endpoint.host(), endpoint.port()),
        )?;
        Ok(())
    }
}

// ── MemoryEndpointStore ──────────────────────────────────────────

/// In-memory store for ephemeral sessions. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryEndpointStore {
    slot: Arc<Mutex<Option<StoredEndpoint>>>,
}

impl MemoryEndpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate with raw text, as if read from a file.
    pub fn with_contents(host: &str, port: &str) -> Self {
        let store = Self::default();
        store.put(StoredEndpoint {
            host: Some(host.to_string()),
            port: Some(port.to_string()),
        });
        store
    }

    pub fn get(&self) -> Option<StoredEndpoint> {
        self.slot.lock().map(|s| s.clone()).unwrap_or_default()
    }

    fn put(&self, stored: StoredEndpoint) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some(stored);
        }
    }
}

impl EndpointStore for MemoryEndpointStore {
    fn load(&self) -> Result<Option<StoredEndpoint>, FaderError> {
        Ok(self.get())
    }

    fn save(&mut self, endpoint: &Endpoint) -> Result<(), FaderError> {
        self.put(endpoint.into());
        Ok(())
    }
}
