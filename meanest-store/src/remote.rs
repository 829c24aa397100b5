use std::time::Duration;

use meanest_core::SessionRecord;
use reqwest::blocking::Client;
use serde::{Deserialize, Deserializer};
use tracing::{debug, info};

use crate::error::{Result, StoreError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Reply of the session lookup endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SessionLookup {
    #[serde(default)]
    pub exists: bool,
    /// `None` when the server sent something other than a whole,
    /// non-negative number.
    #[serde(
        rename = "lastSession",
        default,
        deserialize_with = "whole_number"
    )]
    pub last_session: Option<u64>,
}

impl SessionLookup {
    /// One past the server's last session, or 1 when it has no usable
    /// record of the participant.
    pub fn next_session(&self) -> Result<u32> {
        match (self.exists, self.last_session) {
            (true, Some(last)) => u32::try_from(last)
                .ok()
                .and_then(|n| n.checked_add(1))
                .ok_or(StoreError::SessionOverflow(last)),
            _ => Ok(1),
        }
    }
}

fn whole_number<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f <= u64::MAX as f64)
                .map(|f| f as u64)
        }),
        _ => None,
    })
}

/// Client for the lab's collection server.
#[derive(Debug, Clone)]
pub struct RemoteStore {
    client: Client,
    base_url: String,
}

impl RemoteStore {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(StoreError::InvalidUrl(base_url));
        }
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn lookup(&self, participant_id: &str) -> Result<SessionLookup> {
        let url = format!("{}/api/getSession", self.base_url);
        let lookup: SessionLookup = self
            .client
            .get(&url)
            .query(&[("subjID", participant_id)])
            .send()?
            .error_for_status()?
            .json()?;
        debug!(participant = participant_id, ?lookup, "session lookup");
        Ok(lookup)
    }

    pub fn submit(&self, record: &SessionRecord) -> Result<()> {
        let url = format!("{}/saveData", self.base_url);
        self.client
            .post(&url)
            .json(record)
            .send()?
            .error_for_status()?;
        info!(url = %url, "session uploaded");
        Ok(())
    }
}
