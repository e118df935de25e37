//! Credential storage shared by every block in a session.
//!
//! One well-known slot ([`CREDENTIAL_KEY`]) holds the generation service key.
//! Last writer wins. The store is injected into each controller rather than
//! reached through a global.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use fude_types::CREDENTIAL_KEY;
use parking_lot::RwLock;

use crate::{BlockError, Result};

/// Key-value string store.
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// The generation service key, or empty if none is stored.
    fn api_key(&self) -> Result<String> {
        Ok(self.get(CREDENTIAL_KEY)?.unwrap_or_default())
    }
}

/// Session-lifetime store.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    values: RwLock<BTreeMap<String, String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values.write().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Store persisted as a JSON object in a file.
///
/// The file is read once on open and rewritten on every `set`, so values
/// survive restarts.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    values: RwLock<BTreeMap<String, String>>,
}

impl FileCredentialStore {
    /// `<local data dir>/fude/credentials.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_local_dir().map(|dir| dir.join("fude").join("credentials.json"))
    }

    /// Open (or start) a store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
                BlockError::Credential(format!("{} is not a JSON object: {e}", path.display()))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(BlockError::credential(e)),
        };
        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(BlockError::credential)?;
        }
        let json = serde_json::to_string_pretty(values).map_err(BlockError::credential)?;
        std::fs::write(&self.path, json).map_err(BlockError::credential)
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.values.write();
        values.insert(key.to_string(), value.to_string());
        self.persist(&values)
    }
}
