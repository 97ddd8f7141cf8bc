//! Search execution against the message store.

use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite};

use super::model::{SearchFilter, SearchHit, SearchQuery};
use crate::Result;
use crate::account::AccountId;
use crate::message::{
    Anchor, Folder, MessageId, MessageStore, like_contains, overfetch, parse_timestamp,
};
use crate::page::{Page, PageRequest};

/// Runs substring search over one account's mailbox.
///
/// Matches are case-insensitive substrings of the subject, sender
/// address, or derived body text. Results collapse to one hit per
/// conversation, represented by the newest matching message, with the
/// total number of matches alongside. The trash never matches.
pub struct SearchEngine<'a> {
    store: &'a MessageStore,
}

impl<'a> SearchEngine<'a> {
    /// Create an engine over `store`.
    #[must_use]
    pub const fn new(store: &'a MessageStore) -> Self {
        Self { store }
    }

    /// Page search hits, newest match first.
    ///
    /// Queries shorter than [`super::MIN_QUERY_CHARS`] after trimming
    /// return an empty page without querying the store. Wildcard
    /// characters in the query match literally.
    ///
    /// # Errors
    ///
    /// Returns an error if a database query fails.
    pub async fn search(
        &self,
        account: AccountId,
        query: &SearchQuery,
        page: PageRequest,
    ) -> Result<Page<SearchHit>> {
        if !query.is_searchable() {
            return Ok(Page::empty());
        }
        let anchor = self.store.message_anchor(account, page.cursor).await?;
        if matches!(anchor, Anchor::Missing) {
            return Ok(Page::empty());
        }

        let pattern = like_contains(query.trimmed());
        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(
            "WITH hits AS ( \
               SELECT id, counterpart, folder, subject, snippet, sent_at \
               FROM messages WHERE account_id = ",
        );
        qb.push_bind(account.0);
        qb.push(" AND folder != 'trash' AND (subject LIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" ESCAPE '\\' OR from_address LIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" ESCAPE '\\' OR body_text LIKE ");
        qb.push_bind(pattern);
        qb.push(" ESCAPE '\\')");
        match query.filter {
            SearchFilter::All => {}
            SearchFilter::Unread => {
                qb.push(" AND is_read = 0");
            }
            SearchFilter::WithAttachments => {
                qb.push(" AND has_attachment = 1");
            }
        }
        qb.push(
            "), top AS ( \
               SELECT counterpart, COUNT(*) AS match_count, \
                      (SELECT h.id FROM hits h WHERE h.counterpart = hits.counterpart \
                        ORDER BY h.sent_at DESC, h.id DESC LIMIT 1) AS top_id \
               FROM hits GROUP BY counterpart) \
             SELECT t.counterpart, t.match_count, h.id, h.folder, h.subject, h.snippet, h.sent_at \
             FROM top t JOIN hits h ON h.id = t.top_id",
        );
        if let Anchor::After(sent_at, id) = anchor {
            qb.push(" WHERE (h.sent_at, h.id) < (");
            qb.push_bind(sent_at);
            qb.push(", ");
            qb.push_bind(id);
            qb.push(")");
        }
        qb.push(" ORDER BY h.sent_at DESC, h.id DESC LIMIT ");
        qb.push_bind(overfetch(page.limit));

        let rows = qb.build().fetch_all(self.store.pool()).await?;
        let hits: Vec<SearchHit> = rows.iter().map(row_to_hit).collect();
        Ok(Page::from_rows(hits, page.limit, SearchHit::cursor))
    }
}

/// Convert a joined top-hit row to a search hit.
#[allow(clippy::cast_sign_loss)]
fn row_to_hit(row: &SqliteRow) -> SearchHit {
    SearchHit {
        counterpart: row.get("counterpart"),
        matched_message_id: MessageId::new(row.get("id")),
        folder: Folder::parse(row.get::<String, _>("folder").as_str()),
        subject: row.get("subject"),
        snippet: row.get("snippet"),
        matched_at: parse_timestamp(row.get::<String, _>("sent_at").as_str()),
        match_count: row.get::<i64, _>("match_count") as u64,
    }
}
