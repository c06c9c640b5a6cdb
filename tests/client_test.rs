//! Integration tests for `AwfulClient` using the fake HTTP server.
//!
//! Each test starts a `FakeHttpServer` with a canned forum page on a
//! random port, points an `AwfulClient` at it, and exercises one of the
//! client's public methods.

mod fake_http;

use awful_client::{AwfulClient, ForumConfig, MessageListEntry, MessageStore, Result, UnreadState};
use fake_http::{CannedResponse, FakeHttpServer};

const LIST_PAGE: &str = r#"<html><body>
<form name="form" action="private.php" method="post">
<table>
<tr><th></th><th>Icon</th><th>Title</th><th>Sender</th><th>Date</th></tr>
<tr>
  <td><img src="images/newpm.gif"></td>
  <td></td>
  <td><a href="private.php?action=show&amp;privatemessageid=201">hello</a></td>
  <td>lowtax</td>
  <td>Feb 1, 2017 10:00</td>
</tr>
<tr>
  <td><img src="images/pm.gif"></td>
  <td></td>
  <td><a href="private.php?action=show&amp;privatemessageid=202">world</a></td>
  <td>geekner</td>
  <td>Feb 2, 2017 11:00</td>
</tr>
</table>
</form>
</body></html>"#;

const MESSAGE_PAGE: &str = r#"<html><body>
<div class="author">lowtax</div>
<div class="postdate">"Feb 1, 2017 10:00"</div>
<div class="postbody">pay up</div>
</body></html>"#;

const REPLY_PAGE: &str = r#"<html><body>
<form name="vbform">
<input name="title" value="Re: hello">
<input name="touser" value="lowtax">
<textarea name="message">quoted text</textarea>
</form>
</body></html>"#;

fn client_for(server: &FakeHttpServer) -> AwfulClient {
    let config = ForumConfig {
        base_url: server.url(),
        user_id: "12345".to_string(),
        password_hash: "deadbeef".to_string(),
        imgur_client_id: None,
    };
    AwfulClient::new(config).unwrap()
}

/// Store that collects everything it is given.
#[derive(Default)]
struct VecStore {
    entries: Vec<MessageListEntry>,
}

impl MessageStore for VecStore {
    fn store_messages(&mut self, entries: &[MessageListEntry]) -> Result<()> {
        self.entries.extend_from_slice(entries);
        Ok(())
    }
}

// ── Tests ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_fetch_message_list() {
    let server = FakeHttpServer::start(vec![(
        "GET",
        "/private.php",
        CannedResponse::ok(LIST_PAGE),
    )])
    .await;
    let client = client_for(&server);

    let entries = client.fetch_message_list(0).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].id, 201);
    assert_eq!(entries[0].unread, UnreadState::Unread);
    assert_eq!(entries[1].id, 202);
    assert_eq!(entries[1].unread, UnreadState::Read);

    // the folder id went out as a query parameter
    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].target.contains("folderid=0"));
}

#[tokio::test]
async fn test_sync_folder_hands_entries_to_the_store() {
    let server = FakeHttpServer::start(vec![(
        "GET",
        "/private.php",
        CannedResponse::ok(LIST_PAGE),
    )])
    .await;
    let client = client_for(&server);

    let mut store = VecStore::default();
    let count = client.sync_folder(3, &mut store).await.unwrap();

    assert_eq!(count, 2);
    assert_eq!(store.entries.len(), 2);
    assert!(store.entries.iter().all(|entry| entry.folder == 3));
}

#[tokio::test]
async fn test_fetch_message() {
    let server = FakeHttpServer::start(vec![(
        "GET",
        "/private.php",
        CannedResponse::ok(MESSAGE_PAGE),
    )])
    .await;
    let client = client_for(&server);

    let message = client.fetch_message(201).await.unwrap();
    assert_eq!(message.id, 201);
    assert_eq!(message.author, "lowtax");
    assert_eq!(message.date_text, "Feb 1, 2017 10:00");
    assert_eq!(message.content_html, "pay up");

    let requests = server.requests();
    assert!(requests[0].target.contains("action=show"));
    assert!(requests[0].target.contains("privatemessageid=201"));
}

#[tokio::test]
async fn test_fetch_message_fails_on_broken_page() {
    let server = FakeHttpServer::start(vec![(
        "GET",
        "/private.php",
        CannedResponse::ok("<html><body>maintenance</body></html>"),
    )])
    .await;
    let client = client_for(&server);

    let err = client.fetch_message(201).await.unwrap_err();
    assert!(err.to_string().contains("author"));
}

#[tokio::test]
async fn test_fetch_reply_draft() {
    let server = FakeHttpServer::start(vec![(
        "GET",
        "/private.php",
        CannedResponse::ok(REPLY_PAGE),
    )])
    .await;
    let client = client_for(&server);

    let draft = client.fetch_reply_draft(201).await.unwrap();
    assert_eq!(draft.quoted_title.as_deref(), Some("Re: hello"));
    assert_eq!(draft.recipient.as_deref(), Some("lowtax"));
    assert_eq!(draft.quoted_content.as_deref(), Some("quoted text"));

    let requests = server.requests();
    assert!(requests[0].target.contains("action=newmessage"));
}

#[tokio::test]
async fn test_http_error_propagates() {
    let server = FakeHttpServer::start(vec![(
        "GET",
        "/private.php",
        CannedResponse::ok("gone").with_status(503),
    )])
    .await;
    let client = client_for(&server);

    assert!(client.fetch_message_list(0).await.is_err());
}
