//! Conversation aggregation queries.

use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite};

use super::model::{Conversation, ConversationSort};
use crate::Result;
use crate::account::AccountId;
use crate::message::{Folder, MessageFilter, MessageId, MessageStore, overfetch, parse_timestamp};
use crate::page::{Cursor, Page, PageRequest};

/// Derives the conversation list from the message store.
///
/// Groups are computed per read in a single aggregate query, so
/// mutations are visible on the next page fetch without any cache to
/// invalidate.
pub struct ConversationAggregator<'a> {
    store: &'a MessageStore,
}

/// Sort key a page resumes after, recomputed from the cursor message.
enum SortAnchor {
    Start,
    Recent { sent_at: String, id: i64 },
    Unread { unread: i64, sent_at: String, id: i64 },
    Sender { counterpart: String },
    Missing,
}

impl<'a> ConversationAggregator<'a> {
    /// Create an aggregator over `store`.
    #[must_use]
    pub const fn new(store: &'a MessageStore) -> Self {
        Self { store }
    }

    /// Page one folder's conversations.
    ///
    /// A conversation is listed when at least one member matches
    /// `filter`; its counts always cover the whole `(account,
    /// counterpart, folder)` group, so an unread or date filter never
    /// distorts the displayed totals. Ordering follows `sort` with
    /// the newest member's ID as the final tiebreak, and the cursor
    /// resumes strictly after the position the previous page ended
    /// at, even when rows mutated in between. A cursor whose message
    /// has been deleted yields an empty final page.
    ///
    /// # Errors
    ///
    /// Returns an error if a database query fails.
    pub async fn list(
        &self,
        account: AccountId,
        folder: Folder,
        filter: &MessageFilter,
        sort: ConversationSort,
        page: PageRequest,
    ) -> Result<Page<Conversation>> {
        let anchor = self.anchor(account, folder, sort, page.cursor).await?;
        if matches!(anchor, SortAnchor::Missing) {
            return Ok(Page::empty());
        }

        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(
            "WITH grouped AS ( \
               SELECT counterpart, \
                      COUNT(*) AS message_count, \
                      SUM(CASE WHEN is_read = 0 THEN 1 ELSE 0 END) AS unread_count, \
                      MAX(has_attachment) AS has_attachment, \
                      MAX(sent_at) AS last_message_at, \
                      (SELECT n.id FROM messages n \
                        WHERE n.account_id = ",
        );
        qb.push_bind(account.0);
        qb.push(" AND n.folder = ");
        qb.push_bind(folder.as_str());
        qb.push(
            " AND n.counterpart = messages.counterpart \
              ORDER BY n.sent_at DESC, n.id DESC LIMIT 1) AS last_message_id \
              FROM messages WHERE account_id = ",
        );
        qb.push_bind(account.0);
        qb.push(" AND folder = ");
        qb.push_bind(folder.as_str());
        qb.push(" AND counterpart IN (SELECT counterpart FROM messages WHERE account_id = ");
        qb.push_bind(account.0);
        qb.push(" AND folder = ");
        qb.push_bind(folder.as_str());
        filter.apply(&mut qb);
        qb.push(
            ") GROUP BY counterpart) \
             SELECT g.counterpart, g.message_count, g.unread_count, g.has_attachment, \
                    g.last_message_at, g.last_message_id, m.subject, m.snippet \
             FROM grouped g JOIN messages m ON m.id = g.last_message_id",
        );

        match &anchor {
            SortAnchor::Start | SortAnchor::Missing => {}
            SortAnchor::Recent { sent_at, id } => {
                qb.push(" WHERE (g.last_message_at, g.last_message_id) < (");
                qb.push_bind(sent_at.clone());
                qb.push(", ");
                qb.push_bind(*id);
                qb.push(")");
            }
            SortAnchor::Unread {
                unread,
                sent_at,
                id,
            } => {
                qb.push(" WHERE (g.unread_count, g.last_message_at, g.last_message_id) < (");
                qb.push_bind(*unread);
                qb.push(", ");
                qb.push_bind(sent_at.clone());
                qb.push(", ");
                qb.push_bind(*id);
                qb.push(")");
            }
            SortAnchor::Sender { counterpart } => {
                qb.push(" WHERE g.counterpart > ");
                qb.push_bind(counterpart.clone());
            }
        }

        qb.push(match sort {
            ConversationSort::Recent => " ORDER BY g.last_message_at DESC, g.last_message_id DESC",
            ConversationSort::Unread => {
                " ORDER BY g.unread_count DESC, g.last_message_at DESC, g.last_message_id DESC"
            }
            ConversationSort::Sender => " ORDER BY g.counterpart ASC",
        });
        qb.push(" LIMIT ");
        qb.push_bind(overfetch(page.limit));

        let rows = qb.build().fetch_all(self.store.pool()).await?;
        let conversations: Vec<Conversation> = rows
            .iter()
            .map(|row| row_to_conversation(account, folder, row))
            .collect();
        Ok(Page::from_rows(conversations, page.limit, Conversation::cursor))
    }

    /// Resolve a cursor to the sort key served alongside it.
    ///
    /// The anchor comes from the cursor message's own row, so it
    /// survives the conversation gaining or losing members; only
    /// deleting the message itself invalidates the cursor.
    async fn anchor(
        &self,
        account: AccountId,
        folder: Folder,
        sort: ConversationSort,
        cursor: Option<Cursor>,
    ) -> Result<SortAnchor> {
        let Some(cursor) = cursor else {
            return Ok(SortAnchor::Start);
        };

        let row = sqlx::query(
            r"
            SELECT counterpart, sent_at FROM messages WHERE id = ? AND account_id = ?
            ",
        )
        .bind(cursor.0)
        .bind(account.0)
        .fetch_optional(self.store.pool())
        .await?;

        let Some(row) = row else {
            return Ok(SortAnchor::Missing);
        };
        let counterpart: String = row.get("counterpart");
        let sent_at: String = row.get("sent_at");

        Ok(match sort {
            ConversationSort::Recent => SortAnchor::Recent {
                sent_at,
                id: cursor.0,
            },
            ConversationSort::Sender => SortAnchor::Sender { counterpart },
            ConversationSort::Unread => {
                let row = sqlx::query(
                    r"
                    SELECT COALESCE(SUM(CASE WHEN is_read = 0 THEN 1 ELSE 0 END), 0) AS unread
                    FROM messages
                    WHERE account_id = ? AND folder = ? AND counterpart = ?
                    ",
                )
                .bind(account.0)
                .bind(folder.as_str())
                .bind(&counterpart)
                .fetch_one(self.store.pool())
                .await?;

                SortAnchor::Unread {
                    unread: row.get("unread"),
                    sent_at,
                    id: cursor.0,
                }
            }
        })
    }
}

/// Convert an aggregate row to a conversation.
#[allow(clippy::cast_sign_loss)]
fn row_to_conversation(account: AccountId, folder: Folder, row: &SqliteRow) -> Conversation {
    Conversation {
        account_id: account,
        counterpart: row.get("counterpart"),
        folder,
        subject: row.get("subject"),
        last_body_preview: row.get("snippet"),
        last_message_at: parse_timestamp(row.get::<String, _>("last_message_at").as_str()),
        last_message_id: MessageId::new(row.get("last_message_id")),
        message_count: row.get::<i64, _>("message_count") as u64,
        unread_count: row.get::<i64, _>("unread_count") as u64,
        has_attachment: row.get::<i64, _>("has_attachment") != 0,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::account::MailAccount;
    use crate::message::NewMessage;
    use chrono::{DateTime, TimeZone, Utc};

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().unwrap()
    }

    fn owner() -> MailAccount {
        MailAccount {
            id: Some(AccountId::new(1)),
            email: "me@example.com".to_string(),
            display_name: String::new(),
        }
    }

    fn received(external_ref: &str, from: &str, secs: i64) -> NewMessage {
        let mut msg = NewMessage::received(external_ref, from, ts(secs));
        msg.to_addresses.push("me@example.com".to_string());
        msg.subject = format!("subject {external_ref}");
        msg.body_html = format!("<p>body {external_ref}</p>");
        msg
    }

    async fn seed_two_counterparts(store: &MessageStore) {
        let account = owner();
        let mut alice_read = received("a3", "alice@example.com", 300);
        alice_read.is_read = true;

        let mut to_bob = NewMessage::sent("b1", "bob@example.com", ts(150));
        to_bob.from_address = "me@example.com".to_string();
        to_bob.subject = "subject b1".to_string();

        let mut from_bob = received("b2", "bob@example.com", 250);
        from_bob.is_read = true;

        store
            .ingest(
                &account,
                &[
                    received("a1", "alice@example.com", 100),
                    received("a2", "alice@example.com", 200),
                    alice_read,
                    to_bob,
                    from_bob,
                ],
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn groups_by_counterpart_with_exact_counts() {
        let store = MessageStore::in_memory().await.unwrap();
        seed_two_counterparts(&store).await;
        let aggregator = ConversationAggregator::new(&store);

        let page = aggregator
            .list(
                AccountId::new(1),
                Folder::Inbox,
                &MessageFilter::default(),
                ConversationSort::Recent,
                PageRequest::first(2),
            )
            .await
            .unwrap();

        assert_eq!(page.items.len(), 2);
        assert!(!page.has_more);

        let alice = &page.items[0];
        assert_eq!(alice.counterpart, "alice@example.com");
        assert_eq!(alice.message_count, 3);
        assert_eq!(alice.unread_count, 2);
        assert_eq!(alice.subject, "subject a3");

        // The sent message lives in the sent folder, so the inbox view
        // of bob's exchange only counts the received message.
        let bob = &page.items[1];
        assert_eq!(bob.counterpart, "bob@example.com");
        assert_eq!(bob.message_count, 1);
        assert_eq!(bob.unread_count, 0);
    }

    #[tokio::test]
    async fn recent_sort_follows_newest_member() {
        let store = MessageStore::in_memory().await.unwrap();
        seed_two_counterparts(&store).await;
        let aggregator = ConversationAggregator::new(&store);

        let page = aggregator
            .list(
                AccountId::new(1),
                Folder::Inbox,
                &MessageFilter::default(),
                ConversationSort::Recent,
                PageRequest::first(10),
            )
            .await
            .unwrap();

        let order: Vec<&str> = page.items.iter().map(|c| c.counterpart.as_str()).collect();
        assert_eq!(order, vec!["alice@example.com", "bob@example.com"]);
        assert_eq!(page.items[0].last_message_at, ts(300));
    }

    #[tokio::test]
    async fn unread_sort_puts_most_unread_first() {
        let store = MessageStore::in_memory().await.unwrap();
        let account = owner();
        let mut carol_read = received("c1", "carol@example.com", 400);
        carol_read.is_read = true;
        store
            .ingest(
                &account,
                &[
                    received("a1", "alice@example.com", 100),
                    received("a2", "alice@example.com", 200),
                    received("b1", "bob@example.com", 300),
                    carol_read,
                ],
            )
            .await
            .unwrap();
        let aggregator = ConversationAggregator::new(&store);

        let page = aggregator
            .list(
                AccountId::new(1),
                Folder::Inbox,
                &MessageFilter::default(),
                ConversationSort::Unread,
                PageRequest::first(10),
            )
            .await
            .unwrap();

        let order: Vec<&str> = page.items.iter().map(|c| c.counterpart.as_str()).collect();
        assert_eq!(
            order,
            vec![
                "alice@example.com",
                "bob@example.com",
                "carol@example.com"
            ]
        );
    }

    #[tokio::test]
    async fn sender_sort_is_alphabetical() {
        let store = MessageStore::in_memory().await.unwrap();
        let account = owner();
        store
            .ingest(
                &account,
                &[
                    received("z1", "zoe@example.com", 300),
                    received("a1", "amy@example.com", 100),
                    received("m1", "mia@example.com", 200),
                ],
            )
            .await
            .unwrap();
        let aggregator = ConversationAggregator::new(&store);

        let page = aggregator
            .list(
                AccountId::new(1),
                Folder::Inbox,
                &MessageFilter::default(),
                ConversationSort::Sender,
                PageRequest::first(10),
            )
            .await
            .unwrap();

        let order: Vec<&str> = page.items.iter().map(|c| c.counterpart.as_str()).collect();
        assert_eq!(
            order,
            vec!["amy@example.com", "mia@example.com", "zoe@example.com"]
        );
    }

    #[tokio::test]
    async fn member_filter_lists_conversation_but_counts_whole_group() {
        let store = MessageStore::in_memory().await.unwrap();
        let account = owner();
        let mut alice_read = received("a2", "alice@example.com", 200);
        alice_read.is_read = true;
        let mut bob_read = received("b1", "bob@example.com", 300);
        bob_read.is_read = true;
        store
            .ingest(
                &account,
                &[received("a1", "alice@example.com", 100), alice_read, bob_read],
            )
            .await
            .unwrap();
        let aggregator = ConversationAggregator::new(&store);

        let unread_only = MessageFilter {
            is_read: Some(false),
            ..MessageFilter::default()
        };
        let page = aggregator
            .list(
                AccountId::new(1),
                Folder::Inbox,
                &unread_only,
                ConversationSort::Recent,
                PageRequest::first(10),
            )
            .await
            .unwrap();

        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].counterpart, "alice@example.com");
        assert_eq!(page.items[0].message_count, 2);
        assert_eq!(page.items[0].unread_count, 1);
    }

    #[tokio::test]
    async fn pagination_walk_sees_every_conversation_once() {
        let store = MessageStore::in_memory().await.unwrap();
        let account = owner();
        let batch: Vec<NewMessage> = (1..=5)
            .map(|i| received(&format!("r{i}"), &format!("sender{i}@example.com"), 100 * i))
            .collect();
        store.ingest(&account, &batch).await.unwrap();
        let aggregator = ConversationAggregator::new(&store);

        let mut seen = Vec::new();
        let mut cursor = None;
        let mut pages = 0;
        loop {
            let page = aggregator
                .list(
                    AccountId::new(1),
                    Folder::Inbox,
                    &MessageFilter::default(),
                    ConversationSort::Recent,
                    PageRequest { cursor, limit: 2 },
                )
                .await
                .unwrap();
            pages += 1;
            seen.extend(page.items.iter().map(|c| c.counterpart.clone()));
            if !page.has_more {
                break;
            }
            cursor = page.next_cursor;
        }

        assert_eq!(pages, 3);
        assert_eq!(seen.len(), 5);
        let mut unique = seen.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 5);
    }

    #[tokio::test]
    async fn mutation_mid_walk_does_not_shift_recent_pages() {
        let store = MessageStore::in_memory().await.unwrap();
        let account = owner();
        let batch: Vec<NewMessage> = (1..=4)
            .map(|i| received(&format!("r{i}"), &format!("sender{i}@example.com"), 100 * i))
            .collect();
        store.ingest(&account, &batch).await.unwrap();
        let aggregator = ConversationAggregator::new(&store);

        let first = aggregator
            .list(
                AccountId::new(1),
                Folder::Inbox,
                &MessageFilter::default(),
                ConversationSort::Recent,
                PageRequest::first(2),
            )
            .await
            .unwrap();
        assert!(first.has_more);

        sqlx::query("UPDATE messages SET is_read = 1 WHERE account_id = 1")
            .execute(store.pool())
            .await
            .unwrap();

        let second = aggregator
            .list(
                AccountId::new(1),
                Folder::Inbox,
                &MessageFilter::default(),
                ConversationSort::Recent,
                PageRequest {
                    cursor: first.next_cursor,
                    limit: 2,
                },
            )
            .await
            .unwrap();

        let mut seen: Vec<String> = first
            .items
            .iter()
            .chain(second.items.iter())
            .map(|c| c.counterpart.clone())
            .collect();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 4);
        assert!(!second.has_more);
    }

    #[tokio::test]
    async fn walk_continues_after_a_conversation_leaves_the_folder() {
        let store = MessageStore::in_memory().await.unwrap();
        let account = owner();
        store
            .ingest(
                &account,
                &[
                    received("r1", "first@example.com", 100),
                    received("r2", "second@example.com", 200),
                    received("r3", "third@example.com", 300),
                ],
            )
            .await
            .unwrap();
        let aggregator = ConversationAggregator::new(&store);

        let first = aggregator
            .list(
                AccountId::new(1),
                Folder::Inbox,
                &MessageFilter::default(),
                ConversationSort::Recent,
                PageRequest::first(1),
            )
            .await
            .unwrap();
        assert_eq!(first.items[0].counterpart, "third@example.com");

        sqlx::query("UPDATE messages SET folder = 'archive' WHERE counterpart = 'third@example.com'")
            .execute(store.pool())
            .await
            .unwrap();

        let second = aggregator
            .list(
                AccountId::new(1),
                Folder::Inbox,
                &MessageFilter::default(),
                ConversationSort::Recent,
                PageRequest {
                    cursor: first.next_cursor,
                    limit: 1,
                },
            )
            .await
            .unwrap();
        assert_eq!(second.items[0].counterpart, "second@example.com");
    }

    #[tokio::test]
    async fn counterpart_grouping_ignores_address_case() {
        let store = MessageStore::in_memory().await.unwrap();
        let account = owner();
        store
            .ingest(
                &account,
                &[
                    received("r1", "Alice@Example.com", 100),
                    received("r2", "alice@example.com", 200),
                ],
            )
            .await
            .unwrap();
        let aggregator = ConversationAggregator::new(&store);

        let page = aggregator
            .list(
                AccountId::new(1),
                Folder::Inbox,
                &MessageFilter::default(),
                ConversationSort::Recent,
                PageRequest::first(10),
            )
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].message_count, 2);
    }

    #[tokio::test]
    async fn empty_folder_lists_nothing() {
        let store = MessageStore::in_memory().await.unwrap();
        let aggregator = ConversationAggregator::new(&store);

        let page = aggregator
            .list(
                AccountId::new(1),
                Folder::Inbox,
                &MessageFilter::default(),
                ConversationSort::Recent,
                PageRequest::first(10),
            )
            .await
            .unwrap();
        assert!(page.items.is_empty());
        assert!(!page.has_more);
    }
}
