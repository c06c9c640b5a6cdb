//! Private message record types
//!
//! Plain data produced by the extractors in [`crate::scrape`]. These are
//! what a storage layer persists and what the UI renders; nothing here
//! touches the network or the HTML parser.

use serde::Serialize;

/// Read status of a message in the PM list.
///
/// Derived from the status-icon filename on the list page. The forum only
/// exposes this through icon art, so anything unrecognised counts as
/// [`UnreadState::Read`] — a new site icon would be misfiled as read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnreadState {
    /// Not yet opened (`newpm.gif`).
    Unread,
    /// Opened at least once (the fallback).
    Read,
    /// A reply was sent (`pmreplied.gif`).
    Replied,
}

impl UnreadState {
    /// Classify a status-icon `src` attribute by its filename suffix.
    #[must_use]
    pub fn from_icon_src(src: &str) -> Self {
        if src.ends_with("newpm.gif") {
            Self::Unread
        } else if src.ends_with("pmreplied.gif") {
            Self::Replied
        } else {
            Self::Read
        }
    }
}

/// One row of the private-message list page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageListEntry {
    /// Message id, pulled from the subject link's href.
    pub id: u64,
    /// Subject line.
    pub title: String,
    /// Sender's username.
    pub author: String,
    /// Date column text, verbatim.
    pub date_text: String,
    /// Post-icon image URL, empty when the row has no icon.
    pub icon_url: String,
    /// Read status derived from the status icon.
    pub unread: UnreadState,
    /// Folder the list page was fetched for.
    pub folder: u32,
}

/// A single opened private message.
///
/// All three scraped fields are mandatory; a page missing any of them
/// fails extraction outright rather than producing a partial record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageBody {
    pub id: u64,
    pub author: String,
    /// Inner HTML of the post body, kept as markup for later rendering.
    pub content_html: String,
    pub date_text: String,
}

/// What kind of draft a reply form belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftKind {
    PrivateMessage,
    NewReply,
    Quote,
    Edit,
}

impl DraftKind {
    /// Stable numeric code, matching what the message store records.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::PrivateMessage => 1,
            Self::NewReply => 2,
            Self::Quote => 3,
            Self::Edit => 4,
        }
    }
}

/// Prefill data scraped from a PM reply form.
///
/// Every field besides `id` and `kind` is optional; the extractor fills
/// in whatever the form happened to contain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplyDraft {
    pub id: u64,
    pub kind: DraftKind,
    /// Quoted message text, entity-decoded, CR/FF stripped.
    pub quoted_content: Option<String>,
    /// Prefilled subject, entity-decoded.
    pub quoted_title: Option<String>,
    /// Prefilled recipient username, entity-decoded.
    pub recipient: Option<String>,
}

/// Wrap already-safe post HTML in the standard post template.
///
/// No escaping is performed; the content is trusted to be the forum's
/// own markup.
#[must_use]
pub fn wrap_post_html(content: Option<&str>) -> String {
    format!(
        "<article class='post'><section class='postcontent'>{}</section></article>",
        content.unwrap_or("")
    )
}
