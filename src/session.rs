//! Upload dialog state machine
//!
//! An explicit state + pure transition function for the image-upload
//! dialog: [`UploadSession::handle`] maps an [`Event`] to a list of
//! [`Effect`]s for the surrounding controller to execute. Keeping the
//! transitions pure means the absorbing no-credits state and the
//! stale-callback rules are testable without any UI or network.

use crate::upload::{UploadData, UploadError, UploadResponse};
use std::path::PathBuf;
use tracing::debug;
use url::Url;

/// Upload size ceiling imposed by the image host.
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

const GENERIC_NO_FILE: &str = "couldn't open the selected image file";

/// Where the dialog currently is in the upload flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Picking an upload source; nothing chosen yet.
    Choosing,
    /// A source is set and the upload can be confirmed.
    ReadyToUpload,
    /// A request is in flight.
    Uploading,
    /// The host reports zero remaining upload credits. Absorbing: the
    /// session stays here until it is recreated.
    NoUploadCredits,
}

/// Identifies one issued upload request within a session.
///
/// Completion events carry the id they were issued under; the session
/// discards callbacks from any request other than the latest one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(u64);

/// The source an upload request reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadSource {
    Url(String),
    File(PathBuf),
}

/// Everything that can happen to an upload session.
#[derive(Debug, Clone)]
pub enum Event {
    /// The user flipped the URL / file source selector.
    SourceTypeChanged { is_url: bool },
    /// The user picked a file; name and size are best-effort.
    FilePicked {
        path: PathBuf,
        name: Option<String>,
        size: Option<u64>,
    },
    /// The URL field changed.
    UrlChanged(String),
    /// The "insert GIFs as HTML5 video" option was toggled.
    VideoOptionChanged(bool),
    /// The "insert as thumbnail" option was toggled.
    ThumbnailOptionChanged(bool),
    /// The user confirmed the upload.
    ConfirmUpload,
    /// The transport delivered a parsed response.
    UploadSucceeded {
        request: RequestId,
        response: UploadResponse,
    },
    /// The transport failed.
    UploadFailed {
        request: RequestId,
        error: UploadError,
    },
    /// A fresh remaining-credits reading arrived.
    CreditsChanged { remaining: Option<u32> },
    /// The dialog is closing, by any path.
    Dismissed,
}

/// Side effects the controller must carry out after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Show status text to the user.
    ShowStatus(String),
    /// Show (or clear, with `None`) the non-blocking URL advisory.
    ShowAdvisory(Option<String>),
    /// Best-effort cancel of a previously issued request.
    CancelRequest(RequestId),
    /// Issue exactly one upload request for this source.
    StartUpload {
        request: RequestId,
        source: UploadSource,
    },
    /// Persist the chosen source type as the sticky default.
    PersistSourceType { is_url: bool },
    /// Hand a hosted image URL to the composer.
    InsertImage { url: String, use_thumbnail: bool },
    /// Hand a hosted video URL to the composer.
    InsertVideo { url: String },
    /// Re-read the remaining upload credits.
    RefreshCredits,
    /// Terminal success: close the dialog.
    CloseDialog,
}

/// State for one open upload dialog.
///
/// Created when the dialog opens and dropped when it closes; at most one
/// upload request is outstanding at a time.
#[derive(Debug)]
#[allow(clippy::struct_excessive_bools)]
pub struct UploadSession {
    state: State,
    source_is_url: bool,
    url_text: String,
    image_file: Option<PathBuf>,
    file_name: Option<String>,
    file_size: Option<u64>,
    gifs_as_video: bool,
    use_thumbnail: bool,
    /// The request whose callbacks are currently accepted. Kept across a
    /// failure so a retry can cancel it first.
    outstanding: Option<RequestId>,
    next_request: u64,
    closed: bool,
}

impl UploadSession {
    #[must_use]
    pub const fn new(source_is_url: bool) -> Self {
        Self {
            state: State::Choosing,
            source_is_url,
            url_text: String::new(),
            image_file: None,
            file_name: None,
            file_size: None,
            gifs_as_video: false,
            use_thumbnail: false,
            outstanding: None,
            next_request: 0,
            closed: false,
        }
    }

    #[must_use]
    pub const fn state(&self) -> State {
        self.state
    }

    #[must_use]
    pub const fn source_is_url(&self) -> bool {
        self.source_is_url
    }

    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Best-effort name of the picked file, if one was readable.
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// Best-effort size of the picked file, if one was readable.
    #[must_use]
    pub const fn file_size(&self) -> Option<u64> {
        self.file_size
    }

    /// Apply one event, returning the effects to execute.
    ///
    /// A closed session ignores everything, which is what discards late
    /// callbacks after dismissal.
    pub fn handle(&mut self, event: Event) -> Vec<Effect> {
        if self.closed {
            debug!("ignoring event on closed upload session");
            return Vec::new();
        }
        match event {
            Event::SourceTypeChanged { is_url } => self.on_source_type(is_url),
            Event::FilePicked { path, name, size } => self.on_file_picked(path, name, size),
            Event::UrlChanged(text) => self.on_url_changed(text),
            Event::VideoOptionChanged(enabled) => {
                self.gifs_as_video = enabled;
                Vec::new()
            }
            Event::ThumbnailOptionChanged(enabled) => {
                self.use_thumbnail = enabled;
                Vec::new()
            }
            Event::ConfirmUpload => self.on_confirm(),
            Event::UploadSucceeded { request, response } => self.on_success(request, response),
            Event::UploadFailed { request, error } => self.on_failure(request, &error),
            Event::CreditsChanged { remaining } => self.on_credits(remaining),
            Event::Dismissed => self.on_dismissed(),
        }
    }

    fn on_source_type(&mut self, is_url: bool) -> Vec<Effect> {
        self.source_is_url = is_url;
        let has_source = if is_url {
            !self.url_text.is_empty()
        } else {
            self.image_file.is_some()
        };
        let mut effects = Vec::new();
        let next = if has_source {
            State::ReadyToUpload
        } else {
            State::Choosing
        };
        self.set_state(next, &mut effects);
        effects
    }

    fn on_file_picked(
        &mut self,
        path: PathBuf,
        name: Option<String>,
        size: Option<u64>,
    ) -> Vec<Effect> {
        let mut effects = Vec::new();
        if let Some(bytes) = size {
            if bytes > MAX_UPLOAD_BYTES {
                // oversize files are rejected without a state change
                effects.push(Effect::ShowStatus(format!(
                    "{} ({})",
                    UploadError::TooLarge,
                    human_size(bytes)
                )));
                return effects;
            }
        }
        self.image_file = Some(path);
        self.file_name = name;
        self.file_size = size;
        self.set_state(State::ReadyToUpload, &mut effects);
        effects
    }

    fn on_url_changed(&mut self, text: String) -> Vec<Effect> {
        self.url_text = text;
        let mut effects = Vec::new();

        // only transition when the text no longer matches the state, to
        // avoid redundant churn while typing
        if self.url_text.is_empty() {
            if self.state == State::ReadyToUpload {
                self.set_state(State::Choosing, &mut effects);
            }
            effects.push(Effect::ShowAdvisory(None));
            return effects;
        }
        if self.state == State::Choosing {
            self.set_state(State::ReadyToUpload, &mut effects);
        }
        effects.push(Effect::ShowAdvisory(url_advisory(&self.url_text)));
        effects
    }

    fn on_confirm(&mut self) -> Vec<Effect> {
        if self.state != State::ReadyToUpload {
            return Vec::new();
        }
        let mut effects = Vec::new();
        if let Some(previous) = self.outstanding {
            effects.push(Effect::CancelRequest(previous));
        }
        effects.push(Effect::PersistSourceType {
            is_url: self.source_is_url,
        });

        let source = if self.source_is_url {
            UploadSource::Url(self.url_text.clone())
        } else if let Some(path) = &self.image_file {
            UploadSource::File(path.clone())
        } else {
            effects.push(Effect::ShowStatus(GENERIC_NO_FILE.to_string()));
            return effects;
        };

        self.set_state(State::Uploading, &mut effects);
        let request = RequestId(self.next_request);
        self.next_request += 1;
        self.outstanding = Some(request);
        effects.push(Effect::StartUpload { request, source });
        effects
    }

    fn on_success(&mut self, request: RequestId, response: UploadResponse) -> Vec<Effect> {
        if self.outstanding != Some(request) {
            debug!("discarding stale upload success callback");
            return Vec::new();
        }
        self.outstanding = None;
        let mut effects = Vec::new();

        if response.success {
            let link = response
                .data
                .as_ref()
                .and_then(|data| data.link.as_deref())
                .filter(|link| !link.trim().is_empty());
            if let Some(link) = link {
                let video = response.data.as_ref().and_then(UploadData::video_url);
                match video {
                    Some(video) if self.gifs_as_video => {
                        effects.push(Effect::InsertVideo {
                            url: video.to_string(),
                        });
                    }
                    _ => {
                        effects.push(Effect::InsertImage {
                            url: link.to_string(),
                            use_thumbnail: self.use_thumbnail,
                        });
                    }
                }
                self.closed = true;
                effects.push(Effect::CloseDialog);
                return effects;
            }
            // success flag set but no usable link
            self.fail(UploadError::BadResponse.to_string(), &mut effects);
            return effects;
        }

        self.fail(response.error_message(), &mut effects);
        effects
    }

    fn on_failure(&mut self, request: RequestId, error: &UploadError) -> Vec<Effect> {
        if self.outstanding != Some(request) {
            debug!("discarding stale upload error callback");
            return Vec::new();
        }
        let mut effects = Vec::new();
        self.fail(error.to_string(), &mut effects);
        effects
    }

    fn on_credits(&mut self, remaining: Option<u32>) -> Vec<Effect> {
        let mut effects = Vec::new();
        if remaining == Some(0) {
            self.set_state(State::NoUploadCredits, &mut effects);
        }
        effects
    }

    fn on_dismissed(&mut self) -> Vec<Effect> {
        self.closed = true;
        let mut effects = Vec::new();
        if let Some(request) = self.outstanding.take() {
            effects.push(Effect::CancelRequest(request));
        }
        effects
    }

    /// Revert to the pre-upload state with an error message, then
    /// re-check credits (which may itself shut the session down).
    fn fail(&mut self, message: String, effects: &mut Vec<Effect>) {
        self.set_state(State::ReadyToUpload, effects);
        effects.push(Effect::ShowStatus(message));
        effects.push(Effect::RefreshCredits);
    }

    fn set_state(&mut self, next: State, effects: &mut Vec<Effect>) {
        // no moving out of NoUploadCredits for the session's lifetime
        if self.state == State::NoUploadCredits {
            return;
        }
        self.state = next;
        effects.push(Effect::ShowStatus(self.status_line().to_string()));
    }

    const fn status_line(&self) -> &'static str {
        match self.state {
            State::Choosing => {
                if self.source_is_url {
                    "enter the URL of an image to upload"
                } else {
                    "choose an image file to upload"
                }
            }
            State::ReadyToUpload => "ready to upload",
            State::Uploading => "uploading...",
            State::NoUploadCredits => "no upload credits remaining",
        }
    }
}

/// Advisory text for a non-empty URL, or `None` if it looks fine.
///
/// Non-blocking: a bad-looking URL can still be submitted.
fn url_advisory(text: &str) -> Option<String> {
    let url = text.trim().to_lowercase();
    if !url.starts_with("http://") && !url.starts_with("https://") {
        Some("image URLs need an http:// or https:// prefix".to_string())
    } else if Url::parse(&url).is_err() {
        Some("that doesn't look like a valid URL".to_string())
    } else {
        None
    }
}

/// Rough human-readable byte count for status messages.
#[allow(clippy::cast_precision_loss)]
fn human_size(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    let b = bytes as f64;
    if b >= KIB * KIB {
        format!("{:.1} MB", b / (KIB * KIB))
    } else if b >= KIB {
        format!("{:.1} KB", b / KIB)
    } else {
        format!("{bytes} B")
    }
}
