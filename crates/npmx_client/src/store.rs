use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::StoreError;
use crate::gateway::Session;

/// A saved session plus the base address it was issued against, so a later
/// process can tell whether the token still points at the same upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSession {
    pub base_url: Url,
    #[serde(flatten)]
    pub session: Session,
}

impl PersistedSession {
    pub fn matches_base(&self, base_url: &Url) -> bool {
        &self.base_url == base_url
    }
}

/// Where sessions live between processes.
pub trait SessionStore {
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backing storage cannot be read.
    fn load(&self) -> Result<Option<PersistedSession>, StoreError>;

    /// # Errors
    ///
    /// Returns [`StoreError`] when the session cannot be written.
    fn save(&mut self, session: &PersistedSession) -> Result<(), StoreError>;

    /// # Errors
    ///
    /// Returns [`StoreError`] when the stored session cannot be removed.
    fn clear(&mut self) -> Result<(), StoreError>;
}

/// Session storage in a JSON file, by default under `~/.npmx/`.
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
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<PersistedSession>, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        // A file we cannot parse is treated as no session at all; the next
        // save overwrites it.
        match serde_json::from_str(&raw) {
            Ok(session) => Ok(Some(session)),
            Err(err) => {
                debug!(
                    "Ignoring unreadable session file {path}: {err}",
                    path = self.path.display()
                );
                Ok(None)
            }
        }
    }

    fn save(&mut self, session: &PersistedSession) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(session)?;
        fs::write(&self.path, raw)?;
        debug!("Saved session to {path}", path = self.path.display());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// In-process session storage, for tests and embedders that manage their
/// own persistence.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    session: Option<PersistedSession>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<PersistedSession>, StoreError> {
        Ok(self.session.clone())
    }

    fn save(&mut self, session: &PersistedSession) -> Result<(), StoreError> {
        self.session = Some(session.clone());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.session = None;
        Ok(())
    }
}
