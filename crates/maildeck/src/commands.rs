//! Command dispatch against the mailbox service.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use maildeck_core::{
    AccountId, Attachment, ConversationSort, Cursor, Folder, MailAccount, MailboxService,
    MessageFilter, MessageId, NewMessage, PageRequest, SearchFilter, SearchQuery,
};
use tracing::info;

use crate::cli::{AccountCommand, Cli, Commands};
use crate::render;

/// Open the service and run the requested command.
pub async fn run(cli: Cli) -> Result<()> {
    let database = resolve_database(cli.database.as_deref())?;
    let service = MailboxService::open(&database)
        .await
        .with_context(|| format!("cannot open mailbox database at {database}"))?;
    dispatch(&service, cli).await
}

async fn dispatch(service: &MailboxService, cli: Cli) -> Result<()> {
    let json = cli.json;
    match cli.command {
        Commands::Accounts { action } => accounts(service, action, json).await,
        Commands::Ingest { account, file } => ingest(service, account, &file).await,
        Commands::Seed { account } => seed(service, account).await,
        Commands::Conversations {
            account,
            folder,
            sort,
            unread,
            flagged,
            sender,
            subject,
            limit,
            cursor,
        } => {
            let filter = MessageFilter {
                is_read: unread.then_some(false),
                is_flagged: flagged.then_some(true),
                sender_contains: sender,
                subject_contains: subject,
                ..MessageFilter::default()
            };
            let response = service
                .list_conversations(
                    AccountId::new(account),
                    parse_folder(&folder)?,
                    &filter,
                    ConversationSort::parse(&sort),
                    page(cursor, limit),
                )
                .await;
            render::conversations(&response, json)
        }
        Commands::Messages {
            account,
            counterpart,
            folder,
            limit,
            cursor,
        } => {
            let response = service
                .list_messages(
                    AccountId::new(account),
                    &counterpart,
                    parse_folder(&folder)?,
                    page(cursor, limit),
                )
                .await;
            render::messages(&response, json)
        }
        Commands::Thread {
            account,
            counterpart,
            folder,
            limit,
            cursor,
        } => {
            let response = service
                .thread_view(
                    AccountId::new(account),
                    &counterpart,
                    parse_folder(&folder)?,
                    page(cursor, limit),
                )
                .await;
            render::thread(&response, json)
        }
        Commands::Search {
            account,
            query,
            filter,
            limit,
            cursor,
        } => {
            let query = SearchQuery::new(query).with_filter(SearchFilter::parse(&filter));
            let response = service
                .search(AccountId::new(account), &query, page(cursor, limit))
                .await;
            render::search(&response, json)
        }
        Commands::Stats { account } => {
            let response = service.stats(AccountId::new(account)).await;
            render::stats(&response, json)
        }
        Commands::MarkRead {
            account,
            ids,
            unread,
        } => {
            let ids: Vec<MessageId> = ids.into_iter().map(MessageId::new).collect();
            let response = service
                .bulk_mark_read(AccountId::new(account), &ids, !unread)
                .await;
            render::mutation(&response, json)
        }
        Commands::Flag { account, id, clear } => {
            let response = service
                .set_flag(AccountId::new(account), MessageId::new(id), !clear)
                .await;
            render::mutation(&response, json)
        }
        Commands::Archive(args) => {
            let response = service
                .archive(AccountId::new(args.account), &args.selector())
                .await;
            render::mutation(&response, json)
        }
        Commands::Trash(args) => {
            let response = service
                .trash(AccountId::new(args.account), &args.selector())
                .await;
            render::mutation(&response, json)
        }
        Commands::Restore(args) => {
            let response = service
                .restore(AccountId::new(args.account), &args.selector())
                .await;
            render::mutation(&response, json)
        }
        Commands::Delete(args) => {
            let response = service
                .permanent_delete(AccountId::new(args.account), &args.selector())
                .await;
            render::mutation(&response, json)
        }
    }
}

async fn accounts(service: &MailboxService, action: AccountCommand, json: bool) -> Result<()> {
    match action {
        AccountCommand::Add { email, name } => {
            let mut account = MailAccount::with_email(&email);
            account.display_name = name.unwrap_or_default();
            service.directory().save(&mut account).await?;
            match account.id {
                Some(id) => println!("registered account {id} for {}", account.email),
                None => println!("registered {}", account.email),
            }
            Ok(())
        }
        AccountCommand::List => {
            let accounts = service.directory().list().await?;
            render::accounts(&accounts, json)
        }
        AccountCommand::Remove { id } => {
            service.directory().delete(AccountId::new(id)).await?;
            println!("removed account {id}");
            Ok(())
        }
    }
}

async fn ingest(service: &MailboxService, account: i64, file: &Path) -> Result<()> {
    let raw = if file == Path::new("-") {
        std::io::read_to_string(std::io::stdin())?
    } else {
        std::fs::read_to_string(file)
            .with_context(|| format!("cannot read {}", file.display()))?
    };
    let batch: Vec<NewMessage> =
        serde_json::from_str(&raw).context("message batch is not valid JSON")?;

    let ids = service.ingest(AccountId::new(account), &batch).await?;
    info!("Ingested {} messages for account {account}", ids.len());
    println!("ingested {} messages", ids.len());
    Ok(())
}

/// Seed a handful of demo conversations: an exchange with replies and
/// a quoted tail, an attachment, a spam item, and an unknown sender.
async fn seed(service: &MailboxService, account: i64) -> Result<()> {
    let account_id = AccountId::new(account);
    let owner = service.directory().require(account_id).await?;
    let now = Utc::now();

    let mut intro =
        NewMessage::received("demo-1", "dana@customer.example", now - Duration::hours(30));
    intro.subject = "Question about the quarterly invoice".to_string();
    intro.body_html =
        "<p>Hello,</p><p>Could you check line 4 of the March invoice? The total looks off.</p>"
            .to_string();

    let mut reply = NewMessage::sent("demo-2", "dana@customer.example", now - Duration::hours(26));
    reply.from_address = owner.email.clone();
    reply.subject = "Re: Question about the quarterly invoice".to_string();
    reply.body_html = "<p>Good catch, corrected copy attached.</p>".to_string();
    reply.attachments.push(Attachment {
        filename: "invoice-march.pdf".to_string(),
        mime_type: "application/pdf".to_string(),
        size_bytes: 48_213,
        locator: "demo/invoice-march.pdf".to_string(),
    });

    let mut thanks =
        NewMessage::received("demo-3", "dana@customer.example", now - Duration::hours(2));
    thanks.subject = "Re: Question about the quarterly invoice".to_string();
    thanks.body_html = "<p>Perfect, thank you!</p>\
         <blockquote><p>Good catch, corrected copy attached.</p></blockquote>"
        .to_string();

    let mut newsletter =
        NewMessage::received("demo-4", "news@updates.example", now - Duration::hours(50));
    newsletter.subject = "Your weekly product digest".to_string();
    newsletter.body_html = "<h1>This week</h1><ul><li>Faster search</li><li>Bug fixes</li></ul>"
        .to_string();
    newsletter.is_read = true;

    let mut spam =
        NewMessage::received("demo-5", "winner@lottery.example", now - Duration::hours(8));
    spam.subject = "You have WON!!!".to_string();
    spam.body_html = "<p>Claim your prize now.</p>".to_string();
    spam.folder = Folder::Spam;

    let mut unknown = NewMessage::received("demo-6", "   ", now - Duration::hours(70));
    unknown.subject = "(no sender)".to_string();
    unknown.body_html = "<p>A malformed envelope.</p>".to_string();

    let batch = vec![intro, reply, thanks, newsletter, spam, unknown];
    let ids = service.ingest(account_id, &batch).await?;
    println!("seeded {} demo messages for {}", ids.len(), owner.email);
    Ok(())
}

fn page(cursor: Option<i64>, limit: usize) -> PageRequest {
    PageRequest {
        cursor: cursor.map(Cursor::new),
        limit,
    }
}

fn parse_folder(name: &str) -> Result<Folder> {
    Folder::from_name(name).with_context(|| format!("unknown folder: {name}"))
}

fn resolve_database(flag: Option<&Path>) -> Result<String> {
    let path: PathBuf = match flag {
        Some(path) => path.to_path_buf(),
        None => dirs::data_dir()
            .context("no data directory on this platform; pass --database")?
            .join("maildeck")
            .join("maildeck.db"),
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("cannot create {}", parent.display()))?;
    }
    Ok(path.display().to_string())
}
