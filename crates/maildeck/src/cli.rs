//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use maildeck_core::{MessageId, MessageSelector};

/// Conversation-view mailbox inspector.
#[derive(Parser, Debug)]
#[command(name = "maildeck", version, about = "Inspect and mutate a maildeck mailbox")]
pub struct Cli {
    /// Path to the mailbox database. Defaults to the platform data
    /// directory.
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    /// Print raw JSON envelopes instead of formatted text.
    #[arg(long, global = true, default_value_t = false)]
    pub json: bool,

    /// Requested operation.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level operations.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage mailbox accounts.
    Accounts {
        /// Registry operation.
        #[command(subcommand)]
        action: AccountCommand,
    },
    /// Ingest a JSON batch of messages for an account.
    Ingest {
        /// Account the batch belongs to.
        account: i64,
        /// Path to a JSON array of messages, `-` for stdin.
        file: PathBuf,
    },
    /// Seed a small demo mailbox for an account.
    Seed {
        /// Account to seed.
        account: i64,
    },
    /// List a folder's conversations.
    Conversations {
        /// Account to list.
        account: i64,
        /// Folder to list: inbox, sent, spam, trash, or archive.
        #[arg(long, default_value = "inbox")]
        folder: String,
        /// Sort order: recent, unread, or sender.
        #[arg(long, default_value = "recent")]
        sort: String,
        /// Only conversations with unread messages.
        #[arg(long, default_value_t = false)]
        unread: bool,
        /// Only conversations with flagged messages.
        #[arg(long, default_value_t = false)]
        flagged: bool,
        /// Sender address contains this text.
        #[arg(long)]
        sender: Option<String>,
        /// Subject contains this text.
        #[arg(long)]
        subject: Option<String>,
        /// Page size.
        #[arg(long, default_value_t = 20)]
        limit: usize,
        /// Resume after this cursor.
        #[arg(long)]
        cursor: Option<i64>,
    },
    /// List one conversation's messages, newest first.
    Messages {
        /// Account to read.
        account: i64,
        /// Counterpart address of the conversation.
        counterpart: String,
        /// Folder the conversation is opened from.
        #[arg(long, default_value = "inbox")]
        folder: String,
        /// Page size.
        #[arg(long, default_value_t = 20)]
        limit: usize,
        /// Resume after this cursor.
        #[arg(long)]
        cursor: Option<i64>,
    },
    /// Read one conversation as sender-grouped threads.
    Thread {
        /// Account to read.
        account: i64,
        /// Counterpart address of the conversation.
        counterpart: String,
        /// Folder the conversation is opened from.
        #[arg(long, default_value = "inbox")]
        folder: String,
        /// Page size.
        #[arg(long, default_value_t = 20)]
        limit: usize,
        /// Resume after this cursor.
        #[arg(long)]
        cursor: Option<i64>,
    },
    /// Search the mailbox.
    Search {
        /// Account to search.
        account: i64,
        /// Query text, two characters minimum.
        query: String,
        /// Restrict matches: all, unread, or with-attachments.
        #[arg(long, default_value = "all")]
        filter: String,
        /// Page size.
        #[arg(long, default_value_t = 20)]
        limit: usize,
        /// Resume after this cursor.
        #[arg(long)]
        cursor: Option<i64>,
    },
    /// Print mailbox counts.
    Stats {
        /// Account to summarize.
        account: i64,
    },
    /// Mark messages read, or unread with --unread.
    MarkRead {
        /// Account the messages belong to.
        account: i64,
        /// Message ids to update.
        #[arg(required = true)]
        ids: Vec<i64>,
        /// Mark unread instead.
        #[arg(long, default_value_t = false)]
        unread: bool,
    },
    /// Flag a message, or clear the flag with --clear.
    Flag {
        /// Account the message belongs to.
        account: i64,
        /// Message id.
        id: i64,
        /// Clear the flag instead.
        #[arg(long, default_value_t = false)]
        clear: bool,
    },
    /// Move inbox messages to the archive.
    Archive(SelectorArgs),
    /// Move messages to the trash.
    Trash(SelectorArgs),
    /// Bring trashed or archived messages back to the inbox.
    Restore(SelectorArgs),
    /// Permanently delete messages. Irreversible.
    Delete(SelectorArgs),
}

/// Account registry operations.
#[derive(Subcommand, Debug)]
pub enum AccountCommand {
    /// Register an account.
    Add {
        /// Owner address of the mailbox.
        email: String,
        /// Display name.
        #[arg(long)]
        name: Option<String>,
    },
    /// List registered accounts.
    List,
    /// Remove an account.
    Remove {
        /// Account to remove.
        id: i64,
    },
}

/// Target of a folder or delete mutation: one message or one whole
/// conversation.
#[derive(Args, Debug)]
pub struct SelectorArgs {
    /// Account the target belongs to.
    pub account: i64,
    /// Single message id.
    #[arg(long, conflicts_with = "conversation", required_unless_present = "conversation")]
    pub id: Option<i64>,
    /// Whole conversation by counterpart address.
    #[arg(long)]
    pub conversation: Option<String>,
}

impl SelectorArgs {
    /// The selector these arguments name.
    pub fn selector(&self) -> MessageSelector {
        self.id.map_or_else(
            || MessageSelector::conversation(self.conversation.clone().unwrap_or_default()),
            |id| MessageSelector::Id(MessageId::new(id)),
        )
    }
}
