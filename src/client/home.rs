use std::sync::{Arc, Mutex};

use super::{
    browser::VideoBrowser,
    form::{lock_form, FormError, FormUploadObserver, VideoForm},
    VideoApi,
};
use crate::models::Video;

/// The home screen: the video list and the create-video modal.
pub struct HomePage<A: VideoApi> {
    api: A,
    form: Arc<Mutex<VideoForm>>,
    browser: VideoBrowser,
}

impl<A: VideoApi> HomePage<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            form: Arc::new(Mutex::new(VideoForm::new())),
            browser: VideoBrowser::new(),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn form(&self) -> Arc<Mutex<VideoForm>> {
        self.form.clone()
    }

    pub fn browser(&self) -> &VideoBrowser {
        &self.browser
    }

    pub fn browser_mut(&mut self) -> &mut VideoBrowser {
        &mut self.browser
    }

    /// Observer to hand to the upload widget for this page's form.
    pub fn upload_observer(&self) -> Arc<FormUploadObserver> {
        Arc::new(FormUploadObserver::new(self.form.clone()))
    }

    pub async fn load(&mut self) {
        self.browser.refresh(&self.api).await;
    }

    /// Persists the uploaded video, then refreshes the list.
    pub async fn submit(&mut self) -> Result<Video, FormError> {
        let new_video = lock_form(&self.form).begin_submit()?;

        match self.api.create_video(&new_video).await {
            Ok(video) => {
                lock_form(&self.form).submit_succeeded();
                self.browser.refresh(&self.api).await;
                Ok(video)
            }
            Err(e) => {
                tracing::error!("Error creating video: {:#}", e);
                lock_form(&self.form).submit_failed();
                Err(FormError::SubmitFailed)
            }
        }
    }
}
