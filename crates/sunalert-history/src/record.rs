//! History record types shared by the store, the mirror and the coordinator.

use serde::{Deserialize, Serialize};

/// One UV check as stored locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: i64,
    /// Capture time, epoch milliseconds
    pub timestamp: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
    pub uv_index: f64,
    pub risk_category: String,
    pub advice: String,
    /// Local file path or `file://` URI; empty when no photo is attached
    pub photo_ref: String,
    pub note: Option<String>,
    pub synced: bool,
}

impl HistoryRecord {
    pub fn has_photo(&self) -> bool {
        !self.photo_ref.trim().is_empty()
    }

    /// Strip the store-assigned fields, leaving what the caller supplied.
    #[cfg(test)]
    pub(crate) fn to_new(&self) -> NewHistoryRecord {
        NewHistoryRecord {
            timestamp: self.timestamp,
            latitude: self.latitude,
            longitude: self.longitude,
            address: self.address.clone(),
            uv_index: self.uv_index,
            risk_category: self.risk_category.clone(),
            advice: self.advice.clone(),
            photo_ref: self.photo_ref.clone(),
            note: self.note.clone(),
        }
    }
}

/// A record before insertion. The store assigns `id`; `synced` starts false.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewHistoryRecord {
    pub timestamp: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
    pub uv_index: f64,
    pub risk_category: String,
    pub advice: String,
    #[serde(default)]
    pub photo_ref: String,
    #[serde(default)]
    pub note: Option<String>,
}

impl NewHistoryRecord {
    pub fn into_record(self, id: i64) -> HistoryRecord {
        HistoryRecord {
            id,
            timestamp: self.timestamp,
            latitude: self.latitude,
            longitude: self.longitude,
            address: self.address,
            uv_index: self.uv_index,
            risk_category: self.risk_category,
            advice: self.advice,
            photo_ref: self.photo_ref,
            note: self.note,
            synced: false,
        }
    }
}

/// Change notifications published after every local mutation.
///
/// Subscribers re-pull the list instead of patching their copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryChange {
    Inserted(i64),
    PhotoAttached(i64),
    Synced(i64),
    Deleted(i64),
    Cleared,
}
