use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Step label held by a freshly started hub.
pub const IDLE_STEP: &str = "idle";

/// The latest known progress of whatever stage is running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressState {
    pub step: String,
    pub percent: u8,
}

impl ProgressState {
    pub fn new(step: impl Into<String>, percent: u8) -> Self {
        Self {
            step: step.into(),
            percent: percent.min(100),
        }
    }

    /// Encode as one server-sent event: `data: {json}\n\n`.
    pub fn to_event_frame(&self) -> serde_json::Result<Bytes> {
        let json = serde_json::to_string(self)?;
        Ok(Bytes::from(format!("data: {}\n\n", json)))
    }
}

impl Default for ProgressState {
    fn default() -> Self {
        Self::new(IDLE_STEP, 0)
    }
}
