//! Message storage.

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite};
use tracing::{debug, warn};

use super::filter::MessageFilter;
use super::model::{
    Attachment, Direction, Folder, MailboxStats, Message, MessageId, NewMessage, format_timestamp,
    parse_timestamp,
};
use crate::account::{AccountId, MailAccount};
use crate::page::{Cursor, Page, PageRequest};
use crate::{Error, Result};

/// Longest stored snippet, in characters.
const SNIPPET_MAX_CHARS: usize = 120;

/// Column list shared by every message SELECT.
const MESSAGE_COLUMNS: &str = "id, account_id, external_ref, counterpart, direction, folder, \
     from_address, to_addresses, cc_addresses, subject, body_html, body_text, snippet, \
     is_read, is_flagged, has_attachment, attachments_json, country, lead_status, sent_at";

/// Where a paged query resumes.
pub(crate) enum Anchor {
    /// First page.
    Start,
    /// Resume strictly after this `(sent_at, id)` sort key.
    After(String, i64),
    /// The cursor's message no longer exists.
    Missing,
}

/// Repository for message storage and retrieval.
///
/// Rows are keyed by SQLite rowid, which doubles as the pagination
/// cursor: ascending IDs never reorder, so keyset predicates stay
/// stable while rows mutate underneath.
pub struct MessageStore {
    pool: SqlitePool,
}

impl MessageStore {
    /// Create a new store with the given database path.
    ///
    /// Creates the database and tables if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn new(database_path: &str) -> Result<Self> {
        let url = format!("sqlite:{database_path}?mode=rwc");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let store = Self { pool };
        store.initialize().await?;
        Ok(store)
    }

    /// Create an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let store = Self { pool };
        store.initialize().await?;
        Ok(store)
    }

    /// Initialize database schema.
    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                account_id INTEGER NOT NULL,
                external_ref TEXT NOT NULL,
                counterpart TEXT NOT NULL,
                direction TEXT NOT NULL,
                folder TEXT NOT NULL,
                from_address TEXT NOT NULL DEFAULT '',
                to_addresses TEXT NOT NULL DEFAULT '[]',
                cc_addresses TEXT NOT NULL DEFAULT '[]',
                subject TEXT NOT NULL DEFAULT '',
                body_html TEXT NOT NULL DEFAULT '',
                body_text TEXT NOT NULL DEFAULT '',
                snippet TEXT NOT NULL DEFAULT '',
                is_read INTEGER NOT NULL DEFAULT 0,
                is_flagged INTEGER NOT NULL DEFAULT 0,
                has_attachment INTEGER NOT NULL DEFAULT 0,
                attachments_json TEXT,
                country TEXT,
                lead_status TEXT,
                sent_at TEXT NOT NULL,
                ingested_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(account_id, external_ref)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_messages_account_folder_sent
            ON messages(account_id, folder, sent_at, id)
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_messages_counterpart
            ON messages(account_id, counterpart, folder)
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Shared connection pool for sibling components.
    pub(crate) const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Ingest a batch of messages for `account`.
    ///
    /// Derived columns (counterpart, body text, snippet) are computed
    /// here. Rows are upserted by `(account, external_ref)`: fetching
    /// the same message twice refreshes its content but leaves local
    /// read, flag, and folder state alone, and never duplicates the
    /// conversation it belongs to.
    ///
    /// Returns the stored IDs in batch order.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the account has not been saved,
    /// or an error if a database query fails.
    pub async fn ingest(
        &self,
        account: &MailAccount,
        batch: &[NewMessage],
    ) -> Result<Vec<MessageId>> {
        let account_id = account
            .id
            .ok_or_else(|| Error::validation("account", "account has not been saved"))?;

        let mut ids = Vec::with_capacity(batch.len());
        for msg in batch {
            let counterpart = msg.counterpart(&account.email);
            let body_text = maildeck_html::html_to_text(&msg.body_html);
            let snippet = maildeck_html::snippet(&body_text, SNIPPET_MAX_CHARS);

            sqlx::query(
                r"
                INSERT INTO messages (
                    account_id, external_ref, counterpart, direction, folder,
                    from_address, to_addresses, cc_addresses, subject,
                    body_html, body_text, snippet,
                    is_read, is_flagged, has_attachment, attachments_json,
                    country, lead_status, sent_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(account_id, external_ref) DO UPDATE SET
                    counterpart = excluded.counterpart,
                    direction = excluded.direction,
                    from_address = excluded.from_address,
                    to_addresses = excluded.to_addresses,
                    cc_addresses = excluded.cc_addresses,
                    subject = excluded.subject,
                    body_html = excluded.body_html,
                    body_text = excluded.body_text,
                    snippet = excluded.snippet,
                    has_attachment = excluded.has_attachment,
                    attachments_json = excluded.attachments_json,
                    country = excluded.country,
                    lead_status = excluded.lead_status,
                    sent_at = excluded.sent_at
                ",
            )
            .bind(account_id.0)
            .bind(&msg.external_ref)
            .bind(&counterpart)
            .bind(msg.direction.as_str())
            .bind(msg.folder.as_str())
            .bind(&msg.from_address)
            .bind(serde_json::to_string(&msg.to_addresses)?)
            .bind(serde_json::to_string(&msg.cc_addresses)?)
            .bind(&msg.subject)
            .bind(&msg.body_html)
            .bind(&body_text)
            .bind(&snippet)
            .bind(i64::from(msg.is_read))
            .bind(i64::from(msg.is_flagged))
            .bind(i64::from(!msg.attachments.is_empty()))
            .bind(serde_json::to_string(&msg.attachments)?)
            .bind(msg.country.as_deref())
            .bind(msg.lead_status.as_deref())
            .bind(format_timestamp(msg.sent_at))
            .execute(&self.pool)
            .await?;

            let row = sqlx::query(
                r"
                SELECT id FROM messages WHERE account_id = ? AND external_ref = ?
                ",
            )
            .bind(account_id.0)
            .bind(&msg.external_ref)
            .fetch_one(&self.pool)
            .await?;

            ids.push(MessageId::new(row.get("id")));
        }

        debug!("Ingested {} messages for account {account_id}", ids.len());
        Ok(ids)
    }

    /// Get a message by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get(&self, account: AccountId, id: MessageId) -> Result<Option<Message>> {
        let sql = format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE account_id = ? AND id = ?");
        let row = sqlx::query(&sql)
            .bind(account.0)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(row_to_message))
    }

    /// Page matching messages, newest first.
    ///
    /// Ordering is `(sent_at, id)` descending; the cursor resumes
    /// strictly after the row it names. A cursor whose message has
    /// been deleted yields an empty final page.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_messages(
        &self,
        account: AccountId,
        filter: &MessageFilter,
        page: PageRequest,
    ) -> Result<Page<Message>> {
        let anchor = self.message_anchor(account, page.cursor).await?;

        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE account_id = "
        ));
        qb.push_bind(account.0);
        filter.apply(&mut qb);
        match anchor {
            Anchor::Missing => return Ok(Page::empty()),
            Anchor::Start => {}
            Anchor::After(sent_at, id) => {
                qb.push(" AND (sent_at, id) < (");
                qb.push_bind(sent_at);
                qb.push(", ");
                qb.push_bind(id);
                qb.push(")");
            }
        }
        qb.push(" ORDER BY sent_at DESC, id DESC LIMIT ");
        qb.push_bind(overfetch(page.limit));

        let rows = qb.build().fetch_all(&self.pool).await?;
        let messages: Vec<Message> = rows.iter().map(row_to_message).collect();
        Ok(Page::from_rows(messages, page.limit, |m| Cursor::new(m.id.0)))
    }

    /// Count matching messages.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    #[allow(clippy::cast_sign_loss)]
    pub async fn count_messages(&self, account: AccountId, filter: &MessageFilter) -> Result<u64> {
        let mut qb: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) AS n FROM messages WHERE account_id = ");
        qb.push_bind(account.0);
        filter.apply(&mut qb);

        let row = qb.build().fetch_one(&self.pool).await?;
        Ok(row.get::<i64, _>("n") as u64)
    }

    /// Mailbox rollup counts for one account.
    ///
    /// Counts skip the trash; `spam` tallies the spam folder on its
    /// own.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    #[allow(clippy::cast_sign_loss)]
    pub async fn stats(&self, account: AccountId) -> Result<MailboxStats> {
        let row = sqlx::query(
            r"
            SELECT
                COALESCE(SUM(CASE WHEN folder != 'trash' THEN 1 ELSE 0 END), 0) AS total,
                COALESCE(SUM(CASE WHEN folder != 'trash' AND is_read = 0 THEN 1 ELSE 0 END), 0) AS unread,
                COALESCE(SUM(CASE WHEN folder = 'spam' THEN 1 ELSE 0 END), 0) AS spam,
                COALESCE(SUM(CASE WHEN folder != 'trash' AND has_attachment = 1 THEN 1 ELSE 0 END), 0) AS with_attachments
            FROM messages
            WHERE account_id = ?
            ",
        )
        .bind(account.0)
        .fetch_one(&self.pool)
        .await?;

        Ok(MailboxStats {
            total: row.get::<i64, _>("total") as u64,
            unread: row.get::<i64, _>("unread") as u64,
            spam: row.get::<i64, _>("spam") as u64,
            with_attachments: row.get::<i64, _>("with_attachments") as u64,
        })
    }

    /// Resolve a cursor to the `(sent_at, id)` key it stands for.
    pub(crate) async fn message_anchor(
        &self,
        account: AccountId,
        cursor: Option<Cursor>,
    ) -> Result<Anchor> {
        let Some(cursor) = cursor else {
            return Ok(Anchor::Start);
        };
        let row = sqlx::query("SELECT sent_at FROM messages WHERE id = ? AND account_id = ?")
            .bind(cursor.0)
            .bind(account.0)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map_or(Anchor::Missing, |r| Anchor::After(r.get("sent_at"), cursor.0)))
    }
}

/// LIMIT value for the `limit + 1` overfetch protocol.
pub(crate) fn overfetch(limit: usize) -> i64 {
    i64::try_from(limit).map_or(i64::MAX, |l| l.saturating_add(1))
}

/// Convert a database row to a message.
fn row_to_message(row: &SqliteRow) -> Message {
    Message {
        id: MessageId::new(row.get("id")),
        account_id: AccountId::new(row.get("account_id")),
        external_ref: row.get("external_ref"),
        counterpart: row.get("counterpart"),
        direction: Direction::parse(row.get::<String, _>("direction").as_str()),
        folder: Folder::parse(row.get::<String, _>("folder").as_str()),
        from_address: row.get("from_address"),
        to_addresses: decode_addresses(row.get("to_addresses")),
        cc_addresses: decode_addresses(row.get("cc_addresses")),
        subject: row.get("subject"),
        body_html: row.get("body_html"),
        body_text: row.get("body_text"),
        snippet: row.get("snippet"),
        is_read: row.get::<i64, _>("is_read") != 0,
        is_flagged: row.get::<i64, _>("is_flagged") != 0,
        attachments: decode_attachments(row.get("attachments_json")),
        country: row.get("country"),
        lead_status: row.get("lead_status"),
        sent_at: parse_timestamp(row.get::<String, _>("sent_at").as_str()),
    }
}

/// Decode a JSON address list column, tolerating legacy plain text.
fn decode_addresses(raw: String) -> Vec<String> {
    serde_json::from_str(&raw).unwrap_or_else(|_| {
        if raw.is_empty() {
            Vec::new()
        } else {
            vec![raw]
        }
    })
}

/// Decode attachment metadata, dropping malformed entries.
fn decode_attachments(raw: Option<String>) -> Vec<Attachment> {
    match raw {
        Some(json) if !json.is_empty() => serde_json::from_str(&json).unwrap_or_else(|e| {
            warn!("Malformed attachment metadata in store: {e}");
            Vec::new()
        }),
        _ => Vec::new(),
    }
}
