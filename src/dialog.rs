//! Upload dialog controller
//!
//! Drives the pure state machine in [`crate::session`] against real
//! collaborators: an [`UploadTransport`] that hosts the image, a
//! [`Composer`] that receives the hosted URL, and a [`SettingsStore`]
//! holding the sticky source-type default. Uploads run as spawned tasks
//! that report back through a channel; cancelling aborts the task, and
//! anything that slips through anyway is discarded by the machine's
//! request-id check.

use crate::session::{Effect, Event, RequestId, State, UploadSession, UploadSource};
use crate::upload::{UploadError, UploadTransport};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Receives the result of a successful upload.
pub trait Composer: Send {
    /// A hosted image URL, with the user's thumbnail preference.
    fn image_uploaded(&mut self, url: &str, use_thumbnail: bool);
    /// A hosted HTML5 video URL.
    fn video_uploaded(&mut self, url: &str);
}

/// Process-wide dialog preferences.
pub trait SettingsStore: Send {
    /// The last-chosen upload source type.
    fn upload_source_is_url(&self) -> bool;
    /// Remember the source type the user just uploaded with.
    fn remember_upload_source(&mut self, is_url: bool);
}

/// In-memory [`SettingsStore`], defaulting to URL mode.
#[derive(Debug, Clone, Copy)]
pub struct MemorySettings {
    source_is_url: bool,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            source_is_url: true,
        }
    }
}

impl SettingsStore for MemorySettings {
    fn upload_source_is_url(&self) -> bool {
        self.source_is_url
    }

    fn remember_upload_source(&mut self, is_url: bool) {
        self.source_is_url = is_url;
    }
}

/// One open upload dialog, driving a session until it closes.
pub struct UploadDialog<T, C, S> {
    session: UploadSession,
    transport: Arc<T>,
    composer: C,
    settings: S,
    tx: mpsc::UnboundedSender<Event>,
    rx: mpsc::UnboundedReceiver<Event>,
    tasks: HashMap<RequestId, JoinHandle<()>>,
    status: Option<String>,
    advisory: Option<String>,
}

impl<T, C, S> UploadDialog<T, C, S>
where
    T: UploadTransport + 'static,
    C: Composer,
    S: SettingsStore,
{
    /// Open a dialog, seeding the source type from settings and doing
    /// the initial credits check.
    #[must_use]
    pub fn new(transport: Arc<T>, composer: C, settings: S) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = UploadSession::new(settings.upload_source_is_url());
        let mut dialog = Self {
            session,
            transport,
            composer,
            settings,
            tx,
            rx,
            tasks: HashMap::new(),
            status: None,
            advisory: None,
        };
        dialog.run_effect(Effect::RefreshCredits);
        dialog
    }

    /// Feed a user or transport event through the state machine and
    /// execute the resulting effects.
    pub fn handle(&mut self, event: Event) {
        for effect in self.session.handle(event) {
            self.run_effect(effect);
        }
    }

    /// Wait for the next in-flight upload to complete and process it.
    ///
    /// Returns `false` when the dialog can no longer produce events.
    /// Callers should only wait while a request is actually outstanding.
    pub async fn next_completion(&mut self) -> bool {
        match self.rx.recv().await {
            Some(event) => {
                self.handle(event);
                true
            }
            None => false,
        }
    }

    /// Close the dialog, cancelling any outstanding upload.
    pub fn dismiss(&mut self) {
        self.handle(Event::Dismissed);
        self.abort_all();
    }

    #[must_use]
    pub const fn state(&self) -> State {
        self.session.state()
    }

    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.session.is_closed()
    }

    /// Current status line, if any has been shown.
    #[must_use]
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Current URL advisory, if one is showing.
    #[must_use]
    pub fn advisory(&self) -> Option<&str> {
        self.advisory.as_deref()
    }

    fn run_effect(&mut self, effect: Effect) {
        match effect {
            Effect::ShowStatus(message) => {
                debug!("upload status: {message}");
                self.status = Some(message);
            }
            Effect::ShowAdvisory(message) => self.advisory = message,
            Effect::CancelRequest(request) => {
                if let Some(task) = self.tasks.remove(&request) {
                    debug!("cancelling upload request");
                    task.abort();
                }
            }
            Effect::StartUpload { request, source } => self.start_upload(request, source),
            Effect::PersistSourceType { is_url } => {
                self.settings.remember_upload_source(is_url);
            }
            Effect::InsertImage { url, use_thumbnail } => {
                self.composer.image_uploaded(&url, use_thumbnail);
            }
            Effect::InsertVideo { url } => self.composer.video_uploaded(&url),
            Effect::RefreshCredits => {
                let remaining = self.transport.remaining_credits();
                self.handle(Event::CreditsChanged { remaining });
            }
            Effect::CloseDialog => self.abort_all(),
        }
    }

    fn start_upload(&mut self, request: RequestId, source: UploadSource) {
        let transport = Arc::clone(&self.transport);
        let tx = self.tx.clone();
        let task = tokio::spawn(async move {
            let result = match source {
                UploadSource::Url(url) => transport.upload_url(&url).await,
                UploadSource::File(path) => {
                    let name = path
                        .file_name()
                        .and_then(|name| name.to_str())
                        .map(ToString::to_string);
                    match tokio::fs::read(&path).await {
                        Ok(bytes) => transport.upload_bytes(bytes, name).await,
                        Err(_) => Err(UploadError::Unreadable),
                    }
                }
            };
            let event = match result {
                Ok(response) => Event::UploadSucceeded { request, response },
                Err(error) => Event::UploadFailed { request, error },
            };
            // the dialog may already be gone; nothing to do then
            let _ = tx.send(event);
        });
        self.tasks.insert(request, task);
    }

    fn abort_all(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
    }
}

impl<T, C, S> Drop for UploadDialog<T, C, S> {
    fn drop(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
    }
}
