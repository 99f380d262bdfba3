//! Multipart uploads with progress reporting
//!
//! File contents are handed to the transport as a chunked stream. Each chunk
//! advances a shared [`ProgressTracker`], so progress reflects what the
//! transport has actually pulled from the body.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use futures::stream::{self, Stream};
use reqwest::Method;
use tracing::debug;

use super::client::ApiClient;
use super::http::{HttpClient, MultipartBody, TransportError};
use super::request::ApiRequest;
use super::response::ApiResponse;

/// Size of the chunks file contents are streamed in
const CHUNK_SIZE: usize = 64 * 1024;

/// Callback receiving upload progress as a percentage in `0.0..=100.0`
pub type ProgressCallback = Arc<dyn Fn(f64) + Send + Sync>;

/// A file attached to an [`UploadForm`]
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub field: String,
    pub file_name: String,
    pub mime: String,
    pub content: Bytes,
}

/// Multipart form description
///
/// Cheap to clone: file contents are reference-counted, which lets the client
/// rebuild the body when a request is retried after a token refresh.
#[derive(Debug, Clone, Default)]
pub struct UploadForm {
    fields: Vec<(String, String)>,
    files: Vec<UploadFile>,
}

impl UploadForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a text field
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// Adds a file part
    pub fn file(
        mut self,
        field: impl Into<String>,
        file_name: impl Into<String>,
        mime: impl Into<String>,
        content: impl Into<Bytes>,
    ) -> Self {
        self.files.push(UploadFile {
            field: field.into(),
            file_name: file_name.into(),
            mime: mime.into(),
            content: content.into(),
        });
        self
    }

    /// Total number of file bytes in the form
    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.content.len() as u64).sum()
    }

    /// Builds a transport body whose file streams report into `tracker`
    pub(crate) fn to_body(&self, tracker: Option<&ProgressTracker>) -> MultipartBody {
        let mut offset = 0u64;
        let files = self
            .files
            .iter()
            .map(|file| {
                let part = FilePart {
                    field: file.field.clone(),
                    file_name: file.file_name.clone(),
                    mime: file.mime.clone(),
                    content: file.content.clone(),
                    offset,
                    tracker: tracker.cloned(),
                };
                offset += file.content.len() as u64;
                part
            })
            .collect();

        MultipartBody {
            fields: self.fields.clone(),
            files,
        }
    }
}

/// Tracks bytes handed to the transport and reports percentages
///
/// Reported values never decrease, even when a body is streamed a second time
/// after a token refresh.
#[derive(Clone)]
pub struct ProgressTracker {
    inner: Arc<TrackerInner>,
}

struct TrackerInner {
    total: u64,
    high_water: AtomicU64,
    completed: AtomicBool,
    callback: ProgressCallback,
}

impl fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("total", &self.inner.total)
            .field("sent", &self.inner.high_water.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl ProgressTracker {
    pub fn new(total: u64, callback: ProgressCallback) -> Self {
        Self {
            inner: Arc::new(TrackerInner {
                total,
                high_water: AtomicU64::new(0),
                completed: AtomicBool::new(false),
                callback,
            }),
        }
    }

    fn percent(&self, sent: u64) -> f64 {
        if self.inner.total == 0 {
            return 100.0;
        }
        (sent.min(self.inner.total) as f64 / self.inner.total as f64) * 100.0
    }

    /// Records that `sent` bytes of the current attempt have been streamed
    pub fn advance(&self, sent: u64) {
        let sent = sent.min(self.inner.total);
        let previous = self.inner.high_water.fetch_max(sent, Ordering::SeqCst);
        if sent <= previous {
            return;
        }
        if sent == self.inner.total && self.inner.completed.swap(true, Ordering::SeqCst) {
            return;
        }
        (self.inner.callback)(self.percent(sent));
    }

    /// Emits the final 100% if it has not been reported yet
    pub fn finish(&self) {
        self.inner.high_water.store(self.inner.total, Ordering::SeqCst);
        if !self.inner.completed.swap(true, Ordering::SeqCst) {
            (self.inner.callback)(100.0);
        }
    }
}

/// A file part ready to be streamed by a transport
#[derive(Debug)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub mime: String,
    content: Bytes,
    offset: u64,
    tracker: Option<ProgressTracker>,
}

impl FilePart {
    pub fn len(&self) -> u64 {
        self.content.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Consumes the part into a chunk stream that reports progress as polled
    pub fn into_stream(self) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send + Sync + 'static {
        let Self {
            content,
            offset,
            tracker,
            ..
        } = self;

        let chunks: Vec<Bytes> = (0..content.len())
            .step_by(CHUNK_SIZE)
            .map(|start| content.slice(start..(start + CHUNK_SIZE).min(content.len())))
            .collect();

        let mut sent = offset;
        stream::iter(chunks.into_iter().map(move |chunk| {
            sent += chunk.len() as u64;
            if let Some(ref tracker) = tracker {
                tracker.advance(sent);
            }
            Ok(chunk)
        }))
    }

    /// Converts the part into a reqwest multipart part
    pub(crate) fn into_part(self) -> Result<reqwest::multipart::Part, TransportError> {
        let length = self.len();
        let file_name = self.file_name.clone();
        let mime = self.mime.clone();
        let body = reqwest::Body::wrap_stream(self.into_stream());

        reqwest::multipart::Part::stream_with_length(body, length)
            .file_name(file_name)
            .mime_str(&mime)
            .map_err(|e| TransportError(format!("Invalid mime type '{mime}': {e}")))
    }
}

// Upload-related methods
impl<H: HttpClient> ApiClient<H> {
    /// Uploads a multipart form to `path`
    ///
    /// `on_progress` receives non-decreasing percentages and a final 100 when
    /// the upload succeeds. The 401 contract is the same as for
    /// [`request`](Self::request).
    pub async fn upload(
        &self,
        path: &str,
        form: UploadForm,
        on_progress: Option<ProgressCallback>,
    ) -> ApiResponse {
        let tracker = on_progress.map(|f| ProgressTracker::new(form.total_bytes(), f));
        debug!(path = %path, bytes = form.total_bytes(), "Starting upload");

        let request = ApiRequest::new(Method::POST, path).with_timeout(self.upload_timeout());
        let response = self
            .execute(&request, Some(&form), tracker.as_ref())
            .await;

        if response.success {
            if let Some(ref tracker) = tracker {
                tracker.finish();
            }
        }

        response
    }
}
