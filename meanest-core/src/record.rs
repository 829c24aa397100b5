use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::block::BlockRecord;
use crate::config::ExperimentConfig;
use crate::error::{ExperimentError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMeta {
    #[serde(flatten)]
    pub config: ExperimentConfig,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_time_sec: Option<f64>,
}

/// The `{meta, data}` document written at the end of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub meta: SessionMeta,
    #[serde(rename = "data")]
    pub blocks: Vec<BlockRecord>,
}

impl SessionRecord {
    pub fn start(config: ExperimentConfig, start_time: DateTime<Utc>) -> Self {
        Self {
            meta: SessionMeta {
                config,
                start_time,
                end_time: None,
                total_time_sec: None,
            },
            blocks: Vec::new(),
        }
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.meta.config
    }

    pub fn is_finalized(&self) -> bool {
        self.meta.end_time.is_some()
    }

    pub fn push_block(&mut self, block: BlockRecord) -> Result<()> {
        if self.is_finalized() {
            return Err(ExperimentError::AlreadyFinalized);
        }
        self.blocks.push(block);
        Ok(())
    }

    /// Stamps the end time and elapsed seconds. A second call is an error.
    pub fn finalize(&mut self, end_time: DateTime<Utc>) -> Result<()> {
        if self.is_finalized() {
            return Err(ExperimentError::AlreadyFinalized);
        }
        let elapsed = end_time - self.meta.start_time;
        let secs = elapsed
            .num_microseconds()
            .map(|us| us as f64 / 1e6)
            .unwrap_or_else(|| elapsed.num_milliseconds() as f64 / 1e3);
        self.meta.end_time = Some(end_time);
        self.meta.total_time_sec = Some(secs.max(0.0));
        Ok(())
    }
}

/// Receives the finished session record exactly once.
pub trait ResultSink {
    fn deliver(&mut self, record: &SessionRecord) -> Result<()>;
}

impl ResultSink for Vec<SessionRecord> {
    fn deliver(&mut self, record: &SessionRecord) -> Result<()> {
        self.push(record.clone());
        Ok(())
    }
}

impl<S: ResultSink + ?Sized> ResultSink for &mut S {
    fn deliver(&mut self, record: &SessionRecord) -> Result<()> {
        (**self).deliver(record)
    }
}
