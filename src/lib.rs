//! Something Awful forums client library
//!
//! Covers the two client-side subsystems of the forum app that don't
//! touch a screen: scraping the private-message pages into structured
//! records, and the state machine behind the Imgur image-upload dialog
//! used when composing a reply.
//!
//! The extractors are pure functions over a parsed [`scraper::Html`]
//! document; [`AwfulClient`] fetches the pages and runs them. The
//! upload flow is an explicit [`UploadSession`] state machine driven by
//! [`UploadDialog`] against an [`UploadTransport`] such as
//! [`ImgurClient`].

mod client;
mod config;
mod dialog;
mod error;
mod message;
mod scrape;
mod session;
mod upload;

pub use client::{AwfulClient, MessageStore};
pub use config::ForumConfig;
pub use dialog::{Composer, MemorySettings, SettingsStore, UploadDialog};
pub use error::{Error, Result};
pub use message::{
    DraftKind, MessageBody, MessageListEntry, ReplyDraft, UnreadState, wrap_post_html,
};
pub use scrape::{extract_message_body, extract_message_list, extract_reply_draft};
pub use session::{Effect, Event, MAX_UPLOAD_BYTES, RequestId, State, UploadSession, UploadSource};
pub use upload::{
    ImgurClient, UploadCredits, UploadData, UploadError, UploadResponse, UploadTransport,
};
