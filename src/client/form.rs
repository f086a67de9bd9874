use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use super::upload::{UploadObserver, UploadResult};
use crate::models::{NewVideo, Transformation};

pub const SUBMIT_FAILED_MESSAGE: &str = "Failed to create video. Please try again.";
pub const SUBMIT_SUCCEEDED_MESSAGE: &str = "Video uploaded successfully";

#[derive(Debug, Clone, PartialEq)]
pub enum FormState {
    Idle,
    Uploading,
    Uploaded(UploadResult),
    Submitting(UploadResult),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
}

/// A transient toast. Taking it clears it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("Please upload a video first")]
    NoUpload,

    #[error("An upload is already in progress")]
    UploadInProgress,

    #[error("Title is required")]
    MissingTitle,

    #[error("The video is already being saved")]
    AlreadySubmitting,

    #[error("Failed to create video. Please try again.")]
    SubmitFailed,
}

/// State of the "new video" modal: the uploaded file plus the title and
/// description typed by the user.
#[derive(Debug)]
pub struct VideoForm {
    state: FormState,
    title: String,
    description: String,
    upload_progress: u8,
    modal_open: bool,
    notification: Option<Notification>,
}

impl Default for VideoForm {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoForm {
    pub fn new() -> Self {
        Self {
            state: FormState::Idle,
            title: String::new(),
            description: String::new(),
            upload_progress: 0,
            modal_open: false,
            notification: None,
        }
    }

    pub fn state(&self) -> &FormState {
        &self.state
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn upload_progress(&self) -> u8 {
        self.upload_progress
    }

    pub fn is_open(&self) -> bool {
        self.modal_open
    }

    pub fn open(&mut self) {
        self.modal_open = true;
    }

    pub fn close(&mut self) {
        self.modal_open = false;
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn take_notification(&mut self) -> Option<Notification> {
        self.notification.take()
    }

    fn notify(&mut self, kind: NotificationKind, message: impl Into<String>) {
        self.notification = Some(Notification {
            kind,
            message: message.into(),
        });
    }

    pub fn upload_started(&mut self) -> Result<(), FormError> {
        match self.state {
            FormState::Idle | FormState::Uploaded(_) => {
                self.state = FormState::Uploading;
                self.upload_progress = 0;
                Ok(())
            }
            FormState::Uploading => Err(FormError::UploadInProgress),
            FormState::Submitting(_) => Err(FormError::AlreadySubmitting),
        }
    }

    pub fn upload_progressed(&mut self, percent: u8) {
        if self.state == FormState::Uploading {
            self.upload_progress = self.upload_progress.max(percent);
        }
    }

    pub fn upload_succeeded(&mut self, result: UploadResult) -> Result<(), FormError> {
        match self.state {
            FormState::Uploading => {
                self.state = FormState::Uploaded(result);
                Ok(())
            }
            FormState::Submitting(_) => Err(FormError::AlreadySubmitting),
            _ => Err(FormError::NoUpload),
        }
    }

    /// Upload errors always surface as a toast; an in-flight upload returns
    /// the form to `Idle`.
    pub fn upload_failed(&mut self, message: &str) {
        if self.state == FormState::Uploading {
            self.state = FormState::Idle;
            self.upload_progress = 0;
        }
        self.notify(NotificationKind::Error, message);
    }

    /// Called when the widget signals the end of a transfer. An upload that
    /// ended without a result was cancelled.
    pub fn upload_ended(&mut self) {
        if self.state == FormState::Uploading {
            self.state = FormState::Idle;
            self.upload_progress = 0;
        }
    }

    /// Moves to `Submitting` and builds the record to create.
    pub fn begin_submit(&mut self) -> Result<NewVideo, FormError> {
        let upload = match &self.state {
            FormState::Uploaded(upload) => upload.clone(),
            FormState::Uploading => return Err(FormError::UploadInProgress),
            FormState::Submitting(_) => return Err(FormError::AlreadySubmitting),
            FormState::Idle => return Err(FormError::NoUpload),
        };

        let title = self.title.trim();
        if title.is_empty() {
            return Err(FormError::MissingTitle);
        }

        let thumbnail_url = upload
            .thumbnail_url
            .clone()
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| format!("{}/ik-thumbnail.jpg", upload.url));

        let video = NewVideo {
            title: title.to_string(),
            description: self.description.trim().to_string(),
            video_url: upload.url.clone(),
            thumbnail_url,
            control: true,
            transformation: Transformation::default(),
        };

        self.state = FormState::Submitting(upload);
        Ok(video)
    }

    pub fn submit_succeeded(&mut self) {
        self.state = FormState::Idle;
        self.title.clear();
        self.description.clear();
        self.upload_progress = 0;
        self.modal_open = false;
        self.notify(NotificationKind::Success, SUBMIT_SUCCEEDED_MESSAGE);
    }

    /// Keeps the uploaded file so the user can retry without re-uploading.
    pub fn submit_failed(&mut self) {
        if let FormState::Submitting(upload) = &self.state {
            self.state = FormState::Uploaded(upload.clone());
        }
        self.notify(NotificationKind::Error, SUBMIT_FAILED_MESSAGE);
    }
}

pub(crate) fn lock_form(form: &Mutex<VideoForm>) -> MutexGuard<'_, VideoForm> {
    form.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Feeds upload widget callbacks into a shared [`VideoForm`].
pub struct FormUploadObserver {
    form: Arc<Mutex<VideoForm>>,
}

impl FormUploadObserver {
    pub fn new(form: Arc<Mutex<VideoForm>>) -> Self {
        Self { form }
    }
}

impl UploadObserver for FormUploadObserver {
    fn on_upload_start(&self) {
        if let Err(e) = lock_form(&self.form).upload_started() {
            tracing::warn!("Ignoring upload start: {}", e);
        }
    }

    fn on_progress(&self, percent: u8) {
        lock_form(&self.form).upload_progressed(percent);
    }

    fn on_success(&self, result: &UploadResult) {
        if let Err(e) = lock_form(&self.form).upload_succeeded(result.clone()) {
            tracing::warn!("Ignoring upload result: {}", e);
        }
    }

    fn on_error(&self, message: &str) {
        lock_form(&self.form).upload_failed(message);
    }

    fn on_upload_end(&self) {
        lock_form(&self.form).upload_ended();
    }
}
