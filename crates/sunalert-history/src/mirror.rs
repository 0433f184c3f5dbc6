//! Remote mirror for history records.
//!
//! The mirror keeps a derived copy of each record: the attached photo goes to
//! an object path derived from `(id, timestamp)` and the metadata to a
//! document keyed by `id`. Both writes are PUTs to deterministic paths, so a
//! repeated publish overwrites instead of duplicating.

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{MirrorError, MirrorResult};
use crate::record::HistoryRecord;

/// Collection holding history documents and photo objects.
pub const HISTORY_COLLECTION: &str = "history";

/// Object path for a record's photo: `history/{id}_{timestamp}.jpg`.
pub fn photo_object_path(id: i64, timestamp: i64) -> String {
    format!("{}/{}_{}.jpg", HISTORY_COLLECTION, id, timestamp)
}

/// Document path for a record's metadata: `history/{id}`.
pub fn document_path(id: i64) -> String {
    format!("{}/{}", HISTORY_COLLECTION, id)
}

/// Metadata document stored remotely for one record.
///
/// Carries every record field except the local photo reference, which is
/// replaced by the uploaded object's URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MirrorDocument {
    pub timestamp: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
    pub uv_index: f64,
    pub risk_category: String,
    pub advice: String,
    pub photo_url: String,
    pub note: Option<String>,
}

impl MirrorDocument {
    pub fn from_record(record: &HistoryRecord, photo_url: impl Into<String>) -> Self {
        Self {
            timestamp: record.timestamp,
            latitude: record.latitude,
            longitude: record.longitude,
            address: record.address.clone(),
            uv_index: record.uv_index,
            risk_category: record.risk_category.clone(),
            advice: record.advice.clone(),
            photo_url: photo_url.into(),
            note: record.note.clone(),
        }
    }
}

/// Trait for remote mirror backends.
///
/// Every failure is treated as transient and non-fatal by the coordinator.
pub trait RemoteMirror: Send + Sync + 'static {
    /// Upload the record's photo (if any) and write its metadata document.
    fn publish(&self, record: &HistoryRecord) -> impl Future<Output = MirrorResult<()>> + Send;

    /// Remove the metadata document. A missing document is not an error.
    fn delete(&self, id: i64) -> impl Future<Output = MirrorResult<()>> + Send;
}

#[derive(Debug, Deserialize)]
struct ObjectUploadResponse {
    #[serde(default)]
    url: Option<String>,
}

/// Mirror backed by a REST document/object service.
///
/// Objects live under `{base}/objects/{path}`, documents under
/// `{base}/documents/{path}`.
#[derive(Debug, Clone)]
pub struct RestMirrorClient {
    client: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
}

impl RestMirrorClient {
    pub fn new(base_url: &str, api_token: Option<String>, timeout: Duration) -> MirrorResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MirrorError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: api_token.filter(|t| !t.is_empty()),
        })
    }

    fn object_url(&self, object_path: &str) -> String {
        format!("{}/objects/{}", self.base_url, object_path)
    }

    fn document_url(&self, id: i64) -> String {
        format!("{}/documents/{}", self.base_url, document_path(id))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn check_status(response: reqwest::Response) -> MirrorResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(MirrorError::Rejected {
            status: status.as_u16(),
            message,
        })
    }

    /// Upload the photo and return the URL the document should reference.
    #[instrument(skip(self, record), fields(id = record.id), level = "debug")]
    async fn upload_photo(&self, record: &HistoryRecord) -> MirrorResult<String> {
        let local_path = local_photo_path(&record.photo_ref);
        let bytes = tokio::fs::read(local_path)
            .await
            .map_err(|source| MirrorError::Photo {
                path: local_path.to_string(),
                source,
            })?;

        let object_url = self.object_url(&photo_object_path(record.id, record.timestamp));
        let response = self
            .authorize(self.client.put(&object_url))
            .header(reqwest::header::CONTENT_TYPE, "image/jpeg")
            .body(bytes)
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        // Older services answer with an empty body; fall back to the object URL
        let body = response.text().await?;
        let resolved = serde_json::from_str::<ObjectUploadResponse>(&body)
            .ok()
            .and_then(|r| r.url)
            .filter(|u| !u.is_empty())
            .unwrap_or(object_url);

        tracing::debug!("Uploaded photo for record {} to {}", record.id, resolved);
        Ok(resolved)
    }
}

impl RemoteMirror for RestMirrorClient {
    #[instrument(skip(self, record), fields(id = record.id), level = "info")]
    async fn publish(&self, record: &HistoryRecord) -> MirrorResult<()> {
        let photo_url = if record.has_photo() {
            self.upload_photo(record).await?
        } else {
            String::new()
        };

        let document = MirrorDocument::from_record(record, photo_url);
        let response = self
            .authorize(self.client.put(self.document_url(record.id)))
            .json(&document)
            .send()
            .await?;
        Self::check_status(response).await?;

        tracing::info!("Mirrored history record {}", record.id);
        Ok(())
    }

    #[instrument(skip(self), level = "info")]
    async fn delete(&self, id: i64) -> MirrorResult<()> {
        let response = self
            .authorize(self.client.delete(self.document_url(id)))
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            tracing::debug!("Mirror document {} already absent", id);
            return Ok(());
        }
        Self::check_status(response).await?;
        Ok(())
    }
}

/// Turn a stored photo reference into a filesystem path.
fn local_photo_path(photo_ref: &str) -> &str {
    let trimmed = photo_ref.trim();
    trimmed.strip_prefix("file://").unwrap_or(trimmed)
}

/// Whether the referenced photo currently exists on disk.
pub fn photo_exists(record: &HistoryRecord) -> bool {
    record.has_photo() && Path::new(local_photo_path(&record.photo_ref)).is_file()
}
