//! HTML extraction for private-message pages
//!
//! Pure functions from a parsed [`Html`] document to the record types in
//! [`crate::message`]. The forum exposes no API for private messages, so
//! everything here is screen-scraping of a specific table layout — it
//! will break if the site changes its display structure.

use crate::error::{Error, Result};
use crate::message::{DraftKind, MessageBody, MessageListEntry, ReplyDraft, UnreadState};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

/// Parse a CSS selector, reporting failures as parse errors.
fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| Error::Parse(format!("bad selector '{css}': {e}")))
}

/// Concatenated text of an element's descendants, trimmed.
fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Parse a message id out of a link href by keeping only its digits.
fn id_from_href(href: &str) -> Result<u64> {
    let digits: String = href.chars().filter(char::is_ascii_digit).collect();
    digits
        .parse()
        .map_err(|_| Error::Parse(format!("no message id in link href '{href}'")))
}

/// Extract the rows of a PM list page into [`MessageListEntry`] records.
///
/// The list lives in the page's form-tagged container; each data row has
/// five cells: status icon, post icon, subject link, author, date. The
/// header row and any row with fewer than five cells (the "no messages"
/// filler, mostly) are skipped.
///
/// # Errors
///
/// Returns [`Error::Parse`] when the form container is missing from the
/// document, or when a subject link's href carries no digits to use as
/// the message id.
pub fn extract_message_list(document: &Html, folder: u32) -> Result<Vec<MessageListEntry>> {
    let form = selector("[name=\"form\"]")?;
    let tr = selector("tr")?;
    let td = selector("td")?;
    let a = selector("a")?;
    let img = selector("img")?;

    let container = document
        .select(&form)
        .next()
        .ok_or_else(|| Error::Parse("missing message container".to_string()))?;

    let mut entries = Vec::new();
    for row in container.select(&tr).skip(1) {
        let cells: Vec<ElementRef<'_>> = row.select(&td).collect();
        if cells.len() < 5 {
            continue;
        }

        // cells: [status icon, post icon, subject link, author, date]
        let Some(link) = cells[2].select(&a).next() else {
            warn!("skipping PM row with no subject link");
            continue;
        };
        let href = link.value().attr("href").unwrap_or("");
        let id = id_from_href(href)?;

        let icon_url = cells[1]
            .select(&img)
            .next()
            .and_then(|icon| icon.value().attr("src"))
            .unwrap_or("")
            .to_string();

        let unread = cells[0]
            .select(&img)
            .next()
            .and_then(|status| status.value().attr("src"))
            .map_or(UnreadState::Read, UnreadState::from_icon_src);

        entries.push(MessageListEntry {
            id,
            title: element_text(link),
            author: element_text(cells[3]),
            date_text: element_text(cells[4]),
            icon_url,
            unread,
            folder,
        });
    }

    debug!("extracted {} PM list entries", entries.len());
    Ok(entries)
}

/// Extract a single opened message into a [`MessageBody`].
///
/// # Errors
///
/// Returns [`Error::Parse`] naming the missing field when the page lacks
/// an `author`, `postbody`, or `postdate` element. No partial record is
/// produced.
pub fn extract_message_body(document: &Html, id: u64) -> Result<MessageBody> {
    let author = document
        .select(&selector(".author")?)
        .next()
        .ok_or_else(|| Error::Parse("missing author".to_string()))?;
    let body = document
        .select(&selector(".postbody")?)
        .next()
        .ok_or_else(|| Error::Parse("missing postbody".to_string()))?;
    let date = document
        .select(&selector(".postdate")?)
        .next()
        .ok_or_else(|| Error::Parse("missing postdate".to_string()))?;

    Ok(MessageBody {
        id,
        author: element_text(author),
        // inner HTML, not text: the markup is re-rendered later
        content_html: body.inner_html(),
        date_text: element_text(date).replace('"', "").trim().to_string(),
    })
}

/// Decode HTML entities a second time.
///
/// The parser already decoded once; the forum double-encodes the values
/// it puts into reply forms, so prefill text needs another pass.
fn decode_entities(text: &str) -> String {
    html_escape::decode_html_entities(text).into_owned()
}

/// Extract reply-form prefill data into a [`ReplyDraft`].
///
/// Never fails: each field is looked up independently by form-field name
/// and simply omitted when absent.
#[must_use]
pub fn extract_reply_draft(document: &Html, id: u64) -> ReplyDraft {
    let field = |name: &str| {
        Selector::parse(&format!("[name=\"{name}\"]"))
            .ok()
            .and_then(|sel| document.select(&sel).next())
    };

    let quoted_content = field("message").map(|message| {
        let text: String = message.text().collect();
        decode_entities(&text).replace(['\r', '\u{0C}'], "")
    });
    let quoted_title = field("title")
        .and_then(|title| title.value().attr("value").map(decode_entities));
    let recipient = field("touser")
        .and_then(|user| user.value().attr("value").map(decode_entities));

    ReplyDraft {
        id,
        kind: DraftKind::PrivateMessage,
        quoted_content,
        quoted_title,
        recipient,
    }
}
