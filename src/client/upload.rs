//! File-upload widget: validates a file, fetches one-shot CDN credentials,
//! streams the bytes straight to the CDN and reports progress to a parent.
//!
//! Callbacks are delivered through a gate shared with [`UploadWidget::cancel`].
//! Once `cancel` returns, the cancelled upload delivers no further progress,
//! success or error callbacks; `on_upload_end` still fires. Observers must not
//! call `cancel` or `clear` from inside a callback.

use std::sync::{
    atomic::{AtomicU64, AtomicU8, Ordering},
    Arc, Mutex, MutexGuard, PoisonError,
};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::services::upload_auth::UploadAuthResponse;

pub const MAX_UPLOAD_BYTES: u64 = 100 * 1024 * 1024;
pub const UPLOAD_FAILED_MESSAGE: &str = "Upload failed. Please try again.";
pub const IMAGEKIT_UPLOAD_BASE: &str = "https://upload.imagekit.io";

const CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("{0}")]
    Validation(String),

    #[error("An upload is already in progress")]
    Busy,

    #[error("Failed to obtain upload credentials: {0}")]
    Credentials(String),

    #[error("Upload transport error: {0}")]
    Transport(String),

    #[error("Upload cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Image,
    Video,
}

impl FileKind {
    fn accepts(&self, mime_type: &str) -> bool {
        let expected = match self {
            FileKind::Image => mime::IMAGE,
            FileKind::Video => mime::VIDEO,
        };
        mime_type
            .parse::<mime::Mime>()
            .map(|parsed| parsed.type_() == expected)
            .unwrap_or(false)
    }

    fn rejection_message(&self) -> &'static str {
        match self {
            FileKind::Image => "Please upload a valid image file",
            FileKind::Video => "Please upload a valid video file",
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadOptions {
    pub file_kind: Option<FileKind>,
    pub max_bytes: u64,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            file_kind: None,
            max_bytes: MAX_UPLOAD_BYTES,
        }
    }
}

impl UploadOptions {
    pub fn video() -> Self {
        Self {
            file_kind: Some(FileKind::Video),
            ..Self::default()
        }
    }

    pub fn validate(&self, file: &UploadFile) -> Result<(), UploadError> {
        if let Some(kind) = self.file_kind {
            if !kind.accepts(&file.mime_type) {
                return Err(UploadError::Validation(kind.rejection_message().to_string()));
            }
        }

        if file.size() > self.max_bytes {
            return Err(UploadError::Validation(format!(
                "File must be less than {} MB",
                self.max_bytes / (1024 * 1024)
            )));
        }

        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub mime_type: String,
    pub data: Bytes,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Reads a file from disk, guessing its MIME type from the extension.
    pub async fn from_path(path: impl AsRef<std::path::Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .to_string();

        Ok(Self::new(name, mime_type, data))
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Credential set presented to the CDN for a single upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadCredentials {
    pub token: String,
    pub expire: i64,
    pub signature: String,
    pub public_key: String,
}

impl From<UploadAuthResponse> for UploadCredentials {
    fn from(response: UploadAuthResponse) -> Self {
        let params = response.authentication_parameters;
        Self {
            token: params.token,
            expire: params.expire,
            signature: params.signature,
            public_key: response.public_key,
        }
    }
}

/// What the CDN reports for a stored file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    pub url: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub file_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub file_type: Option<String>,
}

pub trait UploadObserver: Send + Sync {
    fn on_upload_start(&self) {}

    fn on_progress(&self, _percent: u8) {}

    fn on_success(&self, result: &UploadResult);

    fn on_error(&self, _message: &str) {}

    fn on_upload_end(&self) {}
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn credentials(&self) -> Result<UploadCredentials, UploadError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CdnTransport: Send + Sync {
    /// Sends `file` and calls `progress.advance` as bytes leave the client.
    async fn send(
        &self,
        file: &UploadFile,
        credentials: &UploadCredentials,
        progress: Arc<ProgressReporter>,
    ) -> Result<UploadResult, UploadError>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct WidgetState {
    uploading: bool,
    progress: u8,
    error: Option<String>,
    current: Option<InFlight>,
}

#[derive(Debug, Clone)]
struct InFlight {
    token: CancellationToken,
    gate: Arc<Gate>,
}

#[derive(Debug)]
struct Gate {
    open: Mutex<bool>,
}

impl Gate {
    fn new() -> Self {
        Self {
            open: Mutex::new(true),
        }
    }

    fn close(&self) {
        *lock(&self.open) = false;
    }
}

#[derive(Clone)]
struct Emitter {
    observer: Arc<dyn UploadObserver>,
    gate: Arc<Gate>,
    state: Arc<Mutex<WidgetState>>,
}

impl Emitter {
    /// Applies `update` to the widget state and then notifies the observer,
    /// both only while the gate is open. Returns whether it was delivered.
    fn emit(
        &self,
        update: impl FnOnce(&mut WidgetState),
        notify: impl FnOnce(&dyn UploadObserver),
    ) -> bool {
        let open = lock(&self.gate.open);
        if !*open {
            return false;
        }
        update(&mut *lock(&self.state));
        notify(self.observer.as_ref());
        true
    }
}

/// Turns bytes-sent counts into rounded, strictly increasing percentages.
pub struct ProgressReporter {
    total: u64,
    sent: AtomicU64,
    last: AtomicU8,
    emitter: Option<Emitter>,
}

impl ProgressReporter {
    fn new(total: u64, emitter: Option<Emitter>) -> Self {
        Self {
            total,
            sent: AtomicU64::new(0),
            last: AtomicU8::new(0),
            emitter,
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn bytes_sent(&self) -> u64 {
        self.sent.load(Ordering::SeqCst)
    }

    /// Last percentage reported.
    pub fn percent(&self) -> u8 {
        self.last.load(Ordering::SeqCst)
    }

    pub fn advance(&self, bytes: u64) {
        if self.total == 0 {
            return;
        }
        let sent = self.sent.fetch_add(bytes, Ordering::SeqCst) + bytes;
        let percent = percent_of(sent, self.total);

        match &self.emitter {
            Some(emitter) => {
                emitter.emit(
                    |state| {
                        state.progress = state.progress.max(percent);
                    },
                    |observer| {
                        if self.last.fetch_max(percent, Ordering::SeqCst) < percent {
                            observer.on_progress(percent);
                        }
                    },
                );
            }
            None => {
                self.last.fetch_max(percent, Ordering::SeqCst);
            }
        }
    }
}

fn percent_of(sent: u64, total: u64) -> u8 {
    let ratio = sent.min(total) as f64 / total as f64;
    (ratio * 100.0).round() as u8
}

/// Resets the widget and signals upload-end however the upload future exits,
/// including when the caller drops it.
struct FinishGuard {
    state: Arc<Mutex<WidgetState>>,
    observer: Arc<dyn UploadObserver>,
}

impl Drop for FinishGuard {
    fn drop(&mut self) {
        {
            let mut state = lock(&self.state);
            state.uploading = false;
            state.current = None;
        }
        self.observer.on_upload_end();
    }
}

pub struct UploadWidget {
    options: UploadOptions,
    credentials: Arc<dyn CredentialProvider>,
    transport: Arc<dyn CdnTransport>,
    state: Arc<Mutex<WidgetState>>,
}

impl UploadWidget {
    pub fn new(
        options: UploadOptions,
        credentials: Arc<dyn CredentialProvider>,
        transport: Arc<dyn CdnTransport>,
    ) -> Self {
        Self {
            options,
            credentials,
            transport,
            state: Arc::new(Mutex::new(WidgetState::default())),
        }
    }

    pub fn options(&self) -> &UploadOptions {
        &self.options
    }

    /// True while a transfer is in flight; the file input is disabled.
    pub fn is_uploading(&self) -> bool {
        lock(&self.state).uploading
    }

    pub fn progress(&self) -> u8 {
        lock(&self.state).progress
    }

    pub fn error(&self) -> Option<String> {
        lock(&self.state).error.clone()
    }

    /// Aborts the in-flight upload, if any.
    pub fn cancel(&self) {
        let in_flight = lock(&self.state).current.clone();
        if let Some(in_flight) = in_flight {
            in_flight.gate.close();
            in_flight.token.cancel();
        }
    }

    /// Cancels any in-flight upload and resets error and progress.
    pub fn clear(&self) {
        self.cancel();
        let mut state = lock(&self.state);
        state.error = None;
        state.progress = 0;
    }

    pub async fn upload(
        &self,
        file: UploadFile,
        observer: Arc<dyn UploadObserver>,
    ) -> Result<UploadResult, UploadError> {
        let in_flight = {
            let mut state = lock(&self.state);
            if state.uploading {
                return Err(UploadError::Busy);
            }

            if let Err(e) = self.options.validate(&file) {
                let message = e.to_string();
                state.error = Some(message.clone());
                drop(state);
                tracing::debug!(file = %file.name, "Rejected upload: {}", message);
                observer.on_error(&message);
                return Err(e);
            }

            let in_flight = InFlight {
                token: CancellationToken::new(),
                gate: Arc::new(Gate::new()),
            };
            state.uploading = true;
            state.error = None;
            state.progress = 0;
            state.current = Some(in_flight.clone());
            in_flight
        };

        let _finish = FinishGuard {
            state: self.state.clone(),
            observer: observer.clone(),
        };
        let emitter = Emitter {
            observer,
            gate: in_flight.gate.clone(),
            state: self.state.clone(),
        };

        emitter.emit(|_| {}, |o| o.on_upload_start());

        let reporter = Arc::new(ProgressReporter::new(file.size(), Some(emitter.clone())));
        let transfer = async {
            let credentials = self.credentials.credentials().await?;
            self.transport
                .send(&file, &credentials, reporter.clone())
                .await
        };

        let outcome = tokio::select! {
            biased;
            _ = in_flight.token.cancelled() => Err(UploadError::Cancelled),
            result = transfer => result,
        };

        match outcome {
            Ok(result) => {
                if emitter.emit(|_| {}, |o| o.on_success(&result)) {
                    tracing::info!(file = %file.name, url = %result.url, "Upload complete");
                    Ok(result)
                } else {
                    Err(UploadError::Cancelled)
                }
            }
            Err(UploadError::Cancelled) => {
                tracing::info!(file = %file.name, "Upload cancelled");
                Err(UploadError::Cancelled)
            }
            Err(e) => {
                let delivered = emitter.emit(
                    |state| state.error = Some(UPLOAD_FAILED_MESSAGE.to_string()),
                    |o| o.on_error(UPLOAD_FAILED_MESSAGE),
                );
                if delivered {
                    tracing::error!(file = %file.name, "Upload failed: {}", e);
                    Err(e)
                } else {
                    Err(UploadError::Cancelled)
                }
            }
        }
    }
}

/// Streams files to an ImageKit-compatible upload endpoint.
#[derive(Debug, Clone)]
pub struct ImageKitTransport {
    client: reqwest::Client,
    upload_url: String,
}

impl Default for ImageKitTransport {
    fn default() -> Self {
        Self::new(IMAGEKIT_UPLOAD_BASE)
    }
}

impl ImageKitTransport {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            upload_url: format!("{}/api/v1/files/upload", base_url.trim_end_matches('/')),
        }
    }

    pub fn upload_url(&self) -> &str {
        &self.upload_url
    }
}

#[async_trait]
impl CdnTransport for ImageKitTransport {
    async fn send(
        &self,
        file: &UploadFile,
        credentials: &UploadCredentials,
        progress: Arc<ProgressReporter>,
    ) -> Result<UploadResult, UploadError> {
        let data = file.data.clone();
        let chunks: Vec<Bytes> = (0..data.len())
            .step_by(CHUNK_SIZE)
            .map(|start| data.slice(start..(start + CHUNK_SIZE).min(data.len())))
            .collect();

        let body = stream::iter(chunks).map(move |chunk| {
            progress.advance(chunk.len() as u64);
            Ok::<Bytes, std::io::Error>(chunk)
        });

        let part = Part::stream_with_length(reqwest::Body::wrap_stream(body), file.size())
            .file_name(file.name.clone())
            .mime_str(&file.mime_type)
            .map_err(|e| UploadError::Transport(format!("Invalid MIME type: {}", e)))?;

        let form = Form::new()
            .part("file", part)
            .text("fileName", file.name.clone())
            .text("publicKey", credentials.public_key.clone())
            .text("signature", credentials.signature.clone())
            .text("expire", credentials.expire.to_string())
            .text("token", credentials.token.clone())
            .text("useUniqueFileName", "true");

        let response = self
            .client
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| UploadError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(UploadError::Transport(format!("CDN responded {}: {}", status, text)));
        }

        response
            .json::<UploadResult>()
            .await
            .map_err(|e| UploadError::Transport(format!("Invalid CDN response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Start,
        Progress(u8),
        Success(String),
        Error(String),
        End,
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<Event>>,
    }

    impl Recorder {
        fn events(&self) -> Vec<Event> {
            self.events.lock().unwrap().clone()
        }
    }

    impl UploadObserver for Recorder {
        fn on_upload_start(&self) {
            self.events.lock().unwrap().push(Event::Start);
        }

        fn on_progress(&self, percent: u8) {
            self.events.lock().unwrap().push(Event::Progress(percent));
        }

        fn on_success(&self, result: &UploadResult) {
            self.events.lock().unwrap().push(Event::Success(result.url.clone()));
        }

        fn on_error(&self, message: &str) {
            self.events.lock().unwrap().push(Event::Error(message.to_string()));
        }

        fn on_upload_end(&self) {
            self.events.lock().unwrap().push(Event::End);
        }
    }

    fn credentials() -> UploadCredentials {
        UploadCredentials {
            token: "token".into(),
            expire: 1_900_000_000,
            signature: "sig".into(),
            public_key: "public".into(),
        }
    }

    fn result() -> UploadResult {
        UploadResult {
            url: "https://cdn.example.com/clip.mp4".into(),
            thumbnail_url: Some("https://cdn.example.com/clip.mp4/ik-thumbnail.jpg".into()),
            file_id: None,
            name: None,
            file_path: None,
            size: None,
            file_type: None,
        }
    }

    fn video_file(size: usize) -> UploadFile {
        UploadFile::new("clip.mp4", "video/mp4", vec![0u8; size])
    }

    fn ok_credentials() -> MockCredentialProvider {
        let mut provider = MockCredentialProvider::new();
        provider.expect_credentials().returning(|| Ok(credentials()));
        provider
    }

    /// Transport that reports progress in four steps and then succeeds.
    struct SteppedTransport;

    #[async_trait]
    impl CdnTransport for SteppedTransport {
        async fn send(
            &self,
            file: &UploadFile,
            _credentials: &UploadCredentials,
            progress: Arc<ProgressReporter>,
        ) -> Result<UploadResult, UploadError> {
            let quarter = file.size() / 4;
            for _ in 0..4 {
                progress.advance(quarter);
            }
            Ok(result())
        }
    }

    /// Transport that reports some progress and then never finishes.
    struct StalledTransport;

    #[async_trait]
    impl CdnTransport for StalledTransport {
        async fn send(
            &self,
            file: &UploadFile,
            _credentials: &UploadCredentials,
            progress: Arc<ProgressReporter>,
        ) -> Result<UploadResult, UploadError> {
            progress.advance(file.size() / 2);
            std::future::pending::<()>().await;
            unreachable!()
        }
    }

    #[tokio::test]
    async fn test_rejects_before_any_network_call() {
        let mut provider = MockCredentialProvider::new();
        provider.expect_credentials().never();
        let mut transport = MockCdnTransport::new();
        transport.expect_send().never();

        let widget = UploadWidget::new(UploadOptions::video(), Arc::new(provider), Arc::new(transport));
        let recorder = Arc::new(Recorder::default());

        let wrong_type = UploadFile::new("notes.txt", "text/plain", b"hello".to_vec());
        let err = widget.upload(wrong_type, recorder.clone()).await.unwrap_err();
        assert!(matches!(err, UploadError::Validation(ref m) if m == "Please upload a valid video file"));

        let too_big = video_file(MAX_UPLOAD_BYTES as usize + 1);
        let err = widget.upload(too_big, recorder.clone()).await.unwrap_err();
        assert!(matches!(err, UploadError::Validation(ref m) if m == "File must be less than 100 MB"));

        assert_eq!(
            recorder.events(),
            vec![
                Event::Error("Please upload a valid video file".into()),
                Event::Error("File must be less than 100 MB".into()),
            ]
        );
        assert_eq!(widget.error().as_deref(), Some("File must be less than 100 MB"));
        assert!(!widget.is_uploading());
    }

    #[test]
    fn test_any_type_accepted_without_kind() {
        let options = UploadOptions::default();
        let file = UploadFile::new("notes.txt", "text/plain", b"hello".to_vec());
        assert!(options.validate(&file).is_ok());
        assert!(UploadOptions::video().validate(&video_file(10)).is_ok());
    }

    #[tokio::test]
    async fn test_successful_upload_event_order() {
        let widget = UploadWidget::new(
            UploadOptions::video(),
            Arc::new(ok_credentials()),
            Arc::new(SteppedTransport),
        );
        let recorder = Arc::new(Recorder::default());

        let uploaded = widget.upload(video_file(400), recorder.clone()).await.unwrap();

        assert_eq!(uploaded, result());
        assert_eq!(
            recorder.events(),
            vec![
                Event::Start,
                Event::Progress(25),
                Event::Progress(50),
                Event::Progress(75),
                Event::Progress(100),
                Event::Success(result().url),
                Event::End,
            ]
        );
        assert_eq!(widget.progress(), 100);
        assert!(!widget.is_uploading());
        assert!(widget.error().is_none());
    }

    #[tokio::test]
    async fn test_transport_failure_reports_generic_error() {
        let mut transport = MockCdnTransport::new();
        transport
            .expect_send()
            .times(1)
            .returning(|_, _, _| Err(UploadError::Transport("connection reset".into())));

        let widget = UploadWidget::new(
            UploadOptions::video(),
            Arc::new(ok_credentials()),
            Arc::new(transport),
        );
        let recorder = Arc::new(Recorder::default());

        let err = widget.upload(video_file(10), recorder.clone()).await.unwrap_err();
        assert!(matches!(err, UploadError::Transport(_)));
        assert_eq!(
            recorder.events(),
            vec![Event::Start, Event::Error(UPLOAD_FAILED_MESSAGE.into()), Event::End]
        );
        assert_eq!(widget.error().as_deref(), Some(UPLOAD_FAILED_MESSAGE));
    }

    #[tokio::test]
    async fn test_credential_failure_skips_transport() {
        let mut provider = MockCredentialProvider::new();
        provider
            .expect_credentials()
            .returning(|| Err(UploadError::Credentials("500".into())));
        let mut transport = MockCdnTransport::new();
        transport.expect_send().never();

        let widget = UploadWidget::new(UploadOptions::video(), Arc::new(provider), Arc::new(transport));
        let recorder = Arc::new(Recorder::default());

        let err = widget.upload(video_file(10), recorder.clone()).await.unwrap_err();
        assert!(matches!(err, UploadError::Credentials(_)));
        assert_eq!(
            recorder.events(),
            vec![Event::Start, Event::Error(UPLOAD_FAILED_MESSAGE.into()), Event::End]
        );
    }

    #[tokio::test]
    async fn test_cancel_suppresses_later_callbacks() {
        let widget = Arc::new(UploadWidget::new(
            UploadOptions::video(),
            Arc::new(ok_credentials()),
            Arc::new(StalledTransport),
        ));
        let recorder = Arc::new(Recorder::default());

        let task = {
            let widget = widget.clone();
            let recorder = recorder.clone();
            tokio::spawn(async move { widget.upload(video_file(100), recorder).await })
        };

        while recorder.events().len() < 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(widget.is_uploading());

        widget.cancel();
        let outcome = task.await.unwrap();

        assert!(matches!(outcome, Err(UploadError::Cancelled)));
        assert_eq!(
            recorder.events(),
            vec![Event::Start, Event::Progress(50), Event::End]
        );
        assert!(!widget.is_uploading());
        assert!(widget.error().is_none());
    }

    /// Hands the reporter to a detached task that keeps advancing it, then
    /// never finishes. The reporter outlives the cancelled transfer.
    #[derive(Default)]
    struct RunawayTransport {
        reporter: Mutex<Option<Arc<ProgressReporter>>>,
    }

    impl RunawayTransport {
        fn reporter(&self) -> Option<Arc<ProgressReporter>> {
            self.reporter.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CdnTransport for RunawayTransport {
        async fn send(
            &self,
            _file: &UploadFile,
            _credentials: &UploadCredentials,
            progress: Arc<ProgressReporter>,
        ) -> Result<UploadResult, UploadError> {
            *self.reporter.lock().unwrap() = Some(progress.clone());
            tokio::spawn(async move {
                for _ in 0..200 {
                    progress.advance(1);
                    tokio::time::sleep(Duration::from_millis(1)).await;
                }
            });
            std::future::pending::<()>().await;
            unreachable!()
        }
    }

    /// Cancels its own widget mid-transfer, then completes with `outcome`.
    struct SelfCancellingTransport {
        widget: std::sync::OnceLock<std::sync::Weak<UploadWidget>>,
        outcome: fn() -> Result<UploadResult, UploadError>,
    }

    #[async_trait]
    impl CdnTransport for SelfCancellingTransport {
        async fn send(
            &self,
            file: &UploadFile,
            _credentials: &UploadCredentials,
            progress: Arc<ProgressReporter>,
        ) -> Result<UploadResult, UploadError> {
            progress.advance(file.size() / 2);
            if let Some(widget) = self.widget.get().and_then(|w| w.upgrade()) {
                widget.cancel();
            }
            progress.advance(file.size() / 2);
            (self.outcome)()
        }
    }

    #[tokio::test]
    async fn test_progress_after_cancel_is_gated() {
        let transport = Arc::new(RunawayTransport::default());
        let widget = Arc::new(UploadWidget::new(
            UploadOptions::video(),
            Arc::new(ok_credentials()),
            transport.clone(),
        ));
        let recorder = Arc::new(Recorder::default());

        let task = {
            let widget = widget.clone();
            let recorder = recorder.clone();
            tokio::spawn(async move { widget.upload(video_file(200), recorder).await })
        };

        while !recorder
            .events()
            .iter()
            .any(|e| matches!(e, Event::Progress(_)))
        {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        widget.cancel();
        let at_cancel = recorder.events();
        let reporter = transport.reporter().unwrap();
        let sent_at_cancel = reporter.bytes_sent();

        assert!(matches!(task.await.unwrap(), Err(UploadError::Cancelled)));

        // The detached task keeps pushing bytes through the same reporter.
        while reporter.bytes_sent() < sent_at_cancel + 20 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        let mut expected = at_cancel;
        expected.push(Event::End);
        assert_eq!(recorder.events(), expected);
        assert!(widget.progress() < 100);
    }

    async fn upload_with_self_cancel(
        outcome: fn() -> Result<UploadResult, UploadError>,
    ) -> (Arc<UploadWidget>, Arc<Recorder>, Result<UploadResult, UploadError>) {
        let transport = Arc::new(SelfCancellingTransport {
            widget: std::sync::OnceLock::new(),
            outcome,
        });
        let widget = Arc::new(UploadWidget::new(
            UploadOptions::video(),
            Arc::new(ok_credentials()),
            transport.clone(),
        ));
        transport.widget.set(Arc::downgrade(&widget)).unwrap();

        let recorder = Arc::new(Recorder::default());
        let outcome = widget.upload(video_file(100), recorder.clone()).await;
        (widget, recorder, outcome)
    }

    #[tokio::test]
    async fn test_success_after_cancel_is_suppressed() {
        let (widget, recorder, outcome) = upload_with_self_cancel(|| Ok(result())).await;

        assert!(matches!(outcome, Err(UploadError::Cancelled)));
        assert_eq!(
            recorder.events(),
            vec![Event::Start, Event::Progress(50), Event::End]
        );
        assert_eq!(widget.progress(), 50);
    }

    #[tokio::test]
    async fn test_error_after_cancel_is_suppressed() {
        let (widget, recorder, outcome) =
            upload_with_self_cancel(|| Err(UploadError::Transport("connection reset".into()))).await;

        assert!(matches!(outcome, Err(UploadError::Cancelled)));
        assert_eq!(
            recorder.events(),
            vec![Event::Start, Event::Progress(50), Event::End]
        );
        assert!(widget.error().is_none());
    }

    #[tokio::test]
    async fn test_second_upload_refused_while_in_flight() {
        let widget = Arc::new(UploadWidget::new(
            UploadOptions::video(),
            Arc::new(ok_credentials()),
            Arc::new(StalledTransport),
        ));
        let first = Arc::new(Recorder::default());

        let task = {
            let widget = widget.clone();
            let first = first.clone();
            tokio::spawn(async move { widget.upload(video_file(100), first).await })
        };
        while !widget.is_uploading() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let second = Arc::new(Recorder::default());
        let err = widget.upload(video_file(100), second.clone()).await.unwrap_err();
        assert!(matches!(err, UploadError::Busy));
        assert!(second.events().is_empty());

        widget.clear();
        assert!(matches!(task.await.unwrap(), Err(UploadError::Cancelled)));
        assert_eq!(widget.progress(), 0);
    }

    #[tokio::test]
    async fn test_dropped_upload_future_still_resets_widget() {
        let widget = UploadWidget::new(
            UploadOptions::video(),
            Arc::new(ok_credentials()),
            Arc::new(StalledTransport),
        );
        let recorder = Arc::new(Recorder::default());

        let timed_out = tokio::time::timeout(
            Duration::from_millis(50),
            widget.upload(video_file(100), recorder.clone()),
        )
        .await;

        assert!(timed_out.is_err());
        assert!(!widget.is_uploading());
        assert_eq!(recorder.events().last(), Some(&Event::End));
    }

    #[test]
    fn test_progress_is_rounded_and_monotonic() {
        let reporter = ProgressReporter::new(3, None);
        reporter.advance(1);
        assert_eq!(reporter.percent(), 33);
        reporter.advance(1);
        assert_eq!(reporter.percent(), 67);
        reporter.advance(5);
        assert_eq!(reporter.percent(), 100);
        assert_eq!(reporter.bytes_sent(), 7);

        assert_eq!(percent_of(1, 200), 1);
        assert_eq!(percent_of(0, 10), 0);
    }

    #[tokio::test]
    async fn test_from_path_guesses_mime_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("holiday.mp4");
        tokio::fs::write(&path, b"not really a video").await.unwrap();

        let file = UploadFile::from_path(&path).await.unwrap();
        assert_eq!(file.name, "holiday.mp4");
        assert_eq!(file.mime_type, "video/mp4");
        assert_eq!(file.size(), 18);
    }

    #[test]
    fn test_upload_result_requires_url_only() {
        let parsed: UploadResult =
            serde_json::from_str(r#"{"url":"https://cdn.example.com/a.mp4","fileId":"abc"}"#).unwrap();
        assert_eq!(parsed.url, "https://cdn.example.com/a.mp4");
        assert_eq!(parsed.file_id.as_deref(), Some("abc"));
        assert!(parsed.thumbnail_url.is_none());

        assert!(serde_json::from_str::<UploadResult>(r#"{"thumbnailUrl":"x"}"#).is_err());
    }
}
