//! UV check flow: fetch a reading, classify it, record it once.

use sunalert_uv::{Location, RiskLevel, UvError, UvProvider, UvReading};
use thiserror::Error;

use crate::coordinator::HistoryCoordinator;
use crate::error::HistoryError;
use crate::mirror::RemoteMirror;
use crate::record::NewHistoryRecord;
use crate::store::HistoryStore;

/// Errors from a full check. UV failures mean "no reading", never zero.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("UV reading unavailable: {0}")]
    Uv(#[from] UvError),

    #[error(transparent)]
    History(#[from] HistoryError),
}

/// Result of one check.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckOutcome {
    /// A new history record was stored
    Recorded { id: i64, reading: UvReading },
    /// Same UV value as the last recorded check; nothing stored
    Unchanged(UvReading),
}

/// Build the history record for a reading taken at `timestamp_ms`.
pub fn build_record(
    location: Location,
    address: &str,
    reading: &UvReading,
    timestamp_ms: i64,
) -> NewHistoryRecord {
    let level = RiskLevel::from_uv(reading.uv);
    NewHistoryRecord {
        timestamp: timestamp_ms,
        latitude: location.latitude,
        longitude: location.longitude,
        address: address.to_string(),
        uv_index: reading.uv,
        risk_category: level.label().to_string(),
        advice: level.advice().to_string(),
        photo_ref: String::new(),
        note: None,
    }
}

/// Per-screen check state.
///
/// Remembers the last recorded UV value so re-renders with the same reading
/// don't store duplicates.
#[derive(Debug, Default)]
pub struct CheckSession {
    last_recorded_uv: Option<f64>,
}

impl CheckSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Turn a reading into a record unless it repeats the last one.
    pub fn prepare(
        &mut self,
        location: Location,
        address: &str,
        reading: &UvReading,
    ) -> Option<NewHistoryRecord> {
        if self.last_recorded_uv == Some(reading.uv) {
            return None;
        }
        let now = chrono::Utc::now().timestamp_millis();
        Some(build_record(location, address, reading, now))
    }

    /// Fetch the UV index for a location and record it.
    pub async fn run<S, M>(
        &mut self,
        provider: &UvProvider,
        coordinator: &HistoryCoordinator<S, M>,
        location: Location,
        address: &str,
    ) -> Result<CheckOutcome, CheckError>
    where
        S: HistoryStore + 'static,
        M: RemoteMirror,
    {
        let reading = provider.fetch_uv(location).await?;

        let Some(record) = self.prepare(location, address, &reading) else {
            tracing::debug!("UV {:.1} unchanged since last check", reading.uv);
            return Ok(CheckOutcome::Unchanged(reading));
        };

        let id = coordinator.record_check(record).await?;
        // Only remember the value once it is durably stored
        self.last_recorded_uv = Some(reading.uv);
        Ok(CheckOutcome::Recorded { id, reading })
    }
}
