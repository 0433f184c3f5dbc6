//! UV check history: local SQLite store, remote mirror and the coordinator
//! that keeps them eventually consistent.

pub mod check;
pub mod coordinator;
pub mod error;
pub mod mirror;
pub mod record;
pub mod store;

pub use check::{build_record, CheckError, CheckOutcome, CheckSession};
pub use coordinator::{HistoryCoordinator, SyncReport};
pub use error::{HistoryError, HistoryResult, MirrorError, MirrorResult, StoreError, StoreResult};
pub use mirror::{MirrorDocument, RemoteMirror, RestMirrorClient};
pub use record::{HistoryChange, HistoryRecord, NewHistoryRecord};
pub use store::{HistoryStore, SqliteHistoryStore};
