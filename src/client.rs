//! Forum private-message client
//!
//! Fetches the private-message pages over HTTP and runs the extractors
//! in [`crate::scrape`] on the result. Pages are fetched with the
//! forum's cookie-based login; request queuing and retries are left to
//! the HTTP client.

use crate::config::ForumConfig;
use crate::error::Result;
use crate::message::{MessageBody, MessageListEntry, ReplyDraft};
use crate::scrape;
use reqwest::header::{COOKIE, HeaderMap, HeaderValue, USER_AGENT};
use scraper::Html;
use tracing::{debug, info};

const PM_PATH: &str = "/private.php";

/// Receives extracted list entries for bulk insertion, keyed by id.
pub trait MessageStore {
    /// Store a batch of list entries, replacing any with the same id.
    ///
    /// # Errors
    ///
    /// Implementations report their own storage failures.
    fn store_messages(&mut self, entries: &[MessageListEntry]) -> Result<()>;
}

/// HTTP client for the forum's private-message pages.
pub struct AwfulClient {
    http: reqwest::Client,
    config: ForumConfig,
}

impl AwfulClient {
    /// Build a client that sends the forum's login cookies.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built,
    /// for instance when the credentials aren't valid header values.
    pub fn new(config: ForumConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let cookie = format!(
            "bbuserid={}; bbpassword={}",
            config.user_id, config.password_hash
        );
        let cookie = HeaderValue::from_str(&cookie)
            .map_err(|e| crate::Error::Config(format!("invalid login cookie: {e}")))?;
        headers.insert(COOKIE, cookie);
        headers.insert(USER_AGENT, HeaderValue::from_static("awful-client"));

        let http = reqwest::Client::builder().default_headers(headers).build()?;
        Ok(Self { http, config })
    }

    /// Fetch and extract the PM list page for a folder.
    ///
    /// # Errors
    ///
    /// Returns an error if the page cannot be fetched or if the message
    /// container is missing from it.
    pub async fn fetch_message_list(&self, folder: u32) -> Result<Vec<MessageListEntry>> {
        let page = self
            .get_page(&[("folderid", folder.to_string())])
            .await?;
        let document = Html::parse_document(&page);
        let entries = scrape::extract_message_list(&document, folder)?;
        info!("fetched {} messages from folder {}", entries.len(), folder);
        Ok(entries)
    }

    /// Fetch a folder's PM list and hand the entries to a store.
    ///
    /// # Errors
    ///
    /// Returns an error if fetching, extraction, or storage fails.
    pub async fn sync_folder(&self, folder: u32, store: &mut impl MessageStore) -> Result<usize> {
        let entries = self.fetch_message_list(folder).await?;
        store.store_messages(&entries)?;
        Ok(entries.len())
    }

    /// Fetch and extract a single message.
    ///
    /// # Errors
    ///
    /// Returns an error if the page cannot be fetched or lacks any of
    /// the author, body, or date elements.
    pub async fn fetch_message(&self, id: u64) -> Result<MessageBody> {
        let page = self
            .get_page(&[
                ("action", "show".to_string()),
                ("privatemessageid", id.to_string()),
            ])
            .await?;
        let document = Html::parse_document(&page);
        scrape::extract_message_body(&document, id)
    }

    /// Fetch the reply form for a message and extract its prefill data.
    ///
    /// # Errors
    ///
    /// Returns an error only if the page cannot be fetched; extraction
    /// itself never fails.
    pub async fn fetch_reply_draft(&self, id: u64) -> Result<ReplyDraft> {
        let page = self
            .get_page(&[
                ("action", "newmessage".to_string()),
                ("privatemessageid", id.to_string()),
            ])
            .await?;
        let document = Html::parse_document(&page);
        Ok(scrape::extract_reply_draft(&document, id))
    }

    async fn get_page(&self, query: &[(&str, String)]) -> Result<String> {
        let url = format!("{}{}", self.config.base_url, PM_PATH);
        debug!("fetching {url}");
        let response = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.text().await?)
    }
}
