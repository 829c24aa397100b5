use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, StoreError};

/// Last session number per participant, kept in a small JSON object file.
#[derive(Debug, Clone)]
pub struct LocalSessionCounter {
    path: PathBuf,
}

impl LocalSessionCounter {
    pub const FILE_NAME: &'static str = "sessions.json";

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(Self::FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, u32>> {
        match fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(text) => serde_json::from_str(&text).map_err(|source| StoreError::Json {
                path: self.path.clone(),
                source,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(StoreError::io(&self.path, e)),
        }
    }

    fn save(&self, sessions: &BTreeMap<String, u32>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
            }
        }
        let text = serde_json::to_string_pretty(sessions)?;
        fs::write(&self.path, text).map_err(|e| StoreError::io(&self.path, e))
    }

    /// 0 when the participant has no recorded session.
    pub fn last(&self, participant_id: &str) -> Result<u32> {
        Ok(self.load()?.get(participant_id).copied().unwrap_or(0))
    }

    /// Increments and stores the participant's counter, returning the new value.
    pub fn next(&self, participant_id: &str) -> Result<u32> {
        let mut sessions = self.load()?;
        let last = sessions.get(participant_id).copied().unwrap_or(0);
        let next = last
            .checked_add(1)
            .ok_or(StoreError::SessionOverflow(u64::from(last)))?;
        sessions.insert(participant_id.to_string(), next);
        self.save(&sessions)?;
        Ok(next)
    }

    pub fn set(&self, participant_id: &str, session: u32) -> Result<()> {
        let mut sessions = self.load()?;
        sessions.insert(participant_id.to_string(), session);
        self.save(&sessions)
    }
}
