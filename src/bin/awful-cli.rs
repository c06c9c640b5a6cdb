#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! CLI for browsing Something Awful private messages and uploading
//! images to Imgur

use awful_client::{
    AwfulClient, Composer, Event, ForumConfig, ImgurClient, MemorySettings, MessageListEntry,
    State, UploadDialog,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "awful-cli")]
#[command(about = "Private messages and image uploads for the Something Awful forums")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// List private messages in a folder
    Messages {
        /// Folder id (0 is the inbox)
        #[arg(long, default_value = "0")]
        folder: u32,
    },

    /// Show a single private message
    Show {
        /// Private message id
        id: u64,
    },

    /// Show the reply-form prefill for a message
    Draft {
        /// Private message id
        id: u64,
    },

    /// Upload an image to Imgur and print the hosted URL
    Upload {
        /// An image URL, or a file path with --file
        source: String,

        /// Treat the source as a local file instead of a URL
        #[arg(long)]
        file: bool,

        /// Ask the composer to insert a thumbnail
        #[arg(long)]
        thumbnail: bool,

        /// Prefer the video variant for animated uploads
        #[arg(long)]
        gifs_as_video: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = ForumConfig::from_env()?;

    match &args.command {
        Command::Messages { folder } => {
            cmd_messages(&config, &args, *folder).await?;
        }
        Command::Show { id } => {
            cmd_show(&config, &args, *id).await?;
        }
        Command::Draft { id } => {
            cmd_draft(&config, &args, *id).await?;
        }
        Command::Upload {
            source,
            file,
            thumbnail,
            gifs_as_video,
        } => {
            cmd_upload(&config, source, *file, *thumbnail, *gifs_as_video).await?;
        }
    }

    Ok(())
}

async fn cmd_messages(config: &ForumConfig, args: &Args, folder: u32) -> anyhow::Result<()> {
    let client = AwfulClient::new(config.clone())?;
    let entries = client.fetch_message_list(folder).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        print_message_table(&entries);
    }

    Ok(())
}

async fn cmd_show(config: &ForumConfig, args: &Args, id: u64) -> anyhow::Result<()> {
    let client = AwfulClient::new(config.clone())?;
    let message = client.fetch_message(id).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&message)?);
    } else {
        println!("From: {}", message.author);
        println!("Date: {}", message.date_text);
        println!("\n{}", awful_client::wrap_post_html(Some(&message.content_html)));
    }

    Ok(())
}

async fn cmd_draft(config: &ForumConfig, args: &Args, id: u64) -> anyhow::Result<()> {
    let client = AwfulClient::new(config.clone())?;
    let draft = client.fetch_reply_draft(id).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&draft)?);
    } else {
        println!("To:      {}", draft.recipient.as_deref().unwrap_or("-"));
        println!("Title:   {}", draft.quoted_title.as_deref().unwrap_or("-"));
        println!("\n{}", draft.quoted_content.as_deref().unwrap_or(""));
    }

    Ok(())
}

/// Composer that just prints whatever gets inserted.
struct PrintComposer;

impl Composer for PrintComposer {
    fn image_uploaded(&mut self, url: &str, use_thumbnail: bool) {
        if use_thumbnail {
            println!("{url} (as thumbnail)");
        } else {
            println!("{url}");
        }
    }

    fn video_uploaded(&mut self, url: &str) {
        println!("{url} (video)");
    }
}

async fn cmd_upload(
    config: &ForumConfig,
    source: &str,
    is_file: bool,
    thumbnail: bool,
    gifs_as_video: bool,
) -> anyhow::Result<()> {
    let client_id = config
        .imgur_client_id
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("IMGUR_CLIENT_ID not set"))?;
    let transport = Arc::new(ImgurClient::new(client_id)?);
    let mut dialog = UploadDialog::new(transport, PrintComposer, MemorySettings::default());

    dialog.handle(Event::ThumbnailOptionChanged(thumbnail));
    dialog.handle(Event::VideoOptionChanged(gifs_as_video));

    if is_file {
        let path = PathBuf::from(source);
        let metadata = std::fs::metadata(&path).ok();
        dialog.handle(Event::SourceTypeChanged { is_url: false });
        dialog.handle(Event::FilePicked {
            name: path
                .file_name()
                .and_then(|name| name.to_str())
                .map(ToString::to_string),
            size: metadata.map(|m| m.len()),
            path,
        });
    } else {
        dialog.handle(Event::SourceTypeChanged { is_url: true });
        dialog.handle(Event::UrlChanged(source.to_string()));
        if let Some(advisory) = dialog.advisory() {
            eprintln!("warning: {advisory}");
        }
    }

    if dialog.state() != State::ReadyToUpload {
        anyhow::bail!(
            "{}",
            dialog.status().unwrap_or("nothing to upload")
        );
    }

    dialog.handle(Event::ConfirmUpload);
    while dialog.state() == State::Uploading && !dialog.is_closed() {
        if !dialog.next_completion().await {
            break;
        }
    }

    if dialog.is_closed() {
        return Ok(());
    }
    anyhow::bail!("{}", dialog.status().unwrap_or("upload failed"))
}

fn print_message_table(entries: &[MessageListEntry]) {
    if entries.is_empty() {
        println!("No messages found.");
        return;
    }

    let header = format!("{:<10} {:<8} {:<20} {:<20} {}", "ID", "Status", "Date", "From", "Title");
    println!("{header}");
    println!("{}", "-".repeat(90));

    for entry in entries {
        println!(
            "{:<10} {:<8} {:<20} {:<20} {}",
            entry.id,
            format!("{:?}", entry.unread).to_lowercase(),
            truncate(&entry.date_text, 18),
            truncate(&entry.author, 18),
            truncate(&entry.title, 40),
        );
    }

    println!("\n{} message(s)", entries.len());
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}
