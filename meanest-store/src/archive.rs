use std::fs;
use std::path::{Path, PathBuf};

use meanest_core::{ResultSink, SessionRecord};
use tracing::{info, warn};

use crate::counter::LocalSessionCounter;
use crate::error::{Result, StoreError};
use crate::remote::RemoteStore;

/// Picks the session number for a participant.
///
/// The server's answer wins when it is reachable and usable; otherwise the
/// local counter is advanced and used.
pub fn resolve_session_number(
    remote: Option<&RemoteStore>,
    counter: &LocalSessionCounter,
    participant_id: &str,
) -> Result<u32> {
    if let Some(remote) = remote {
        match remote.lookup(participant_id).and_then(|l| l.next_session()) {
            Ok(session) => return Ok(session),
            Err(e) => warn!(error = %e, "session lookup failed, using local counter"),
        }
    }
    counter.next(participant_id)
}

/// Writes finished sessions to the data directory and, when configured,
/// uploads them.
#[derive(Debug, Clone)]
pub struct SessionArchive {
    data_dir: PathBuf,
    counter: LocalSessionCounter,
    remote: Option<RemoteStore>,
}

impl SessionArchive {
    pub fn new(data_dir: impl Into<PathBuf>, remote: Option<RemoteStore>) -> Self {
        let data_dir = data_dir.into();
        Self {
            counter: LocalSessionCounter::in_dir(&data_dir),
            data_dir,
            remote,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn counter(&self) -> &LocalSessionCounter {
        &self.counter
    }

    pub fn remote(&self) -> Option<&RemoteStore> {
        self.remote.as_ref()
    }

    pub fn path_for(&self, record: &SessionRecord) -> PathBuf {
        self.data_dir.join(record.config().result_file_name())
    }

    /// The local file is required; the counter and upload are best effort.
    pub fn store(&self, record: &SessionRecord) -> Result<PathBuf> {
        fs::create_dir_all(&self.data_dir).map_err(|e| StoreError::io(&self.data_dir, e))?;
        let path = self.path_for(record);
        let text = serde_json::to_string_pretty(record)?;
        fs::write(&path, text).map_err(|e| StoreError::io(&path, e))?;
        info!(path = %path.display(), blocks = record.blocks.len(), "session saved");

        let config = record.config();
        if let Err(e) = self
            .counter
            .set(&config.participant_id, config.session_number)
        {
            warn!(error = %e, "could not update local session counter");
        }
        if let Some(remote) = &self.remote {
            if let Err(e) = remote.submit(record) {
                warn!(error = %e, "upload failed, results kept locally");
            }
        }
        Ok(path)
    }
}

impl ResultSink for SessionArchive {
    fn deliver(&mut self, record: &SessionRecord) -> meanest_core::Result<()> {
        self.store(record)?;
        Ok(())
    }
}
