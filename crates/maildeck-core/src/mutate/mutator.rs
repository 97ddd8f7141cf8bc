//! Bulk state transitions against the message store.

use std::collections::HashSet;

use sqlx::{QueryBuilder, Row, Sqlite};
use tracing::{debug, warn};

use super::model::{BulkOutcome, MessageSelector};
use crate::Result;
use crate::account::AccountId;
use crate::error::Error;
use crate::message::{Folder, MessageId, MessageStore};

/// Applies read, flag, folder, and delete transitions.
///
/// Every bulk operation is a single bounded statement per batch, so a
/// cancelled call is either not applied or fully applied; partial
/// success is reported through [`BulkOutcome`], never as an error.
pub struct StateMutator<'a> {
    store: &'a MessageStore,
}

impl<'a> StateMutator<'a> {
    /// Create a mutator over `store`.
    #[must_use]
    pub const fn new(store: &'a MessageStore) -> Self {
        Self { store }
    }

    /// Set the read state of a batch of messages.
    ///
    /// Idempotent: repeating the call reports the same count. Unknown
    /// ids land in the outcome's `failed_ids` and never abort the
    /// batch. An empty batch succeeds without touching the store.
    ///
    /// # Errors
    ///
    /// Returns an error if a database query fails.
    pub async fn mark_read(
        &self,
        account: AccountId,
        ids: &[MessageId],
        is_read: bool,
    ) -> Result<BulkOutcome> {
        if ids.is_empty() {
            return Ok(BulkOutcome::default());
        }

        let mut qb: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new("SELECT id FROM messages WHERE account_id = ");
        qb.push_bind(account.0);
        qb.push(" AND id IN (");
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(id.0);
        }
        qb.push(")");
        let rows = qb.build().fetch_all(self.store.pool()).await?;
        let existing: HashSet<i64> = rows.iter().map(|row| row.get("id")).collect();

        let mut outcome = BulkOutcome::default();
        let mut seen = HashSet::new();
        for id in ids {
            if !seen.insert(id.0) {
                continue;
            }
            if existing.contains(&id.0) {
                outcome.updated_count += 1;
            } else {
                outcome.failed_ids.push(*id);
            }
        }

        if !existing.is_empty() {
            let mut qb: QueryBuilder<'_, Sqlite> =
                QueryBuilder::new("UPDATE messages SET is_read = ");
            qb.push_bind(i64::from(is_read));
            qb.push(" WHERE account_id = ");
            qb.push_bind(account.0);
            qb.push(" AND id IN (");
            let mut separated = qb.separated(", ");
            for id in &existing {
                separated.push_bind(*id);
            }
            qb.push(")");
            qb.build().execute(self.store.pool()).await?;
        }

        if outcome.is_complete() {
            debug!("Marked {} messages read={is_read}", outcome.updated_count);
        } else {
            warn!(
                "mark_read matched {} of {} ids",
                outcome.updated_count,
                outcome.updated_count + outcome.failed_ids.len()
            );
        }
        Ok(outcome)
    }

    /// Set the flag state of a single message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MessageNotFound`] for an unknown id, or an
    /// error if the database query fails.
    pub async fn set_flag(&self, account: AccountId, id: MessageId, flagged: bool) -> Result<()> {
        let result = sqlx::query(
            r"
            UPDATE messages SET is_flagged = ? WHERE account_id = ? AND id = ?
            ",
        )
        .bind(i64::from(flagged))
        .bind(account.0)
        .bind(id.0)
        .execute(self.store.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::MessageNotFound(id));
        }
        Ok(())
    }

    /// Move the selected messages from one folder to another.
    ///
    /// For a single id, a message already in `to` counts as moved, so
    /// the call is an idempotent no-op success; a message in any other
    /// folder lands in `failed_ids`. For a conversation, every member
    /// currently in `from` moves in one statement; no members there is
    /// a no-op success.
    ///
    /// # Errors
    ///
    /// Returns an error if a database query fails.
    pub async fn move_folder(
        &self,
        account: AccountId,
        selector: &MessageSelector,
        from: Folder,
        to: Folder,
    ) -> Result<BulkOutcome> {
        self.shift(account, selector, &[from], to).await
    }

    /// Move the selected inbox messages to the archive.
    ///
    /// # Errors
    ///
    /// Returns an error if a database query fails.
    pub async fn archive(
        &self,
        account: AccountId,
        selector: &MessageSelector,
    ) -> Result<BulkOutcome> {
        self.shift(account, selector, &[Folder::Inbox], Folder::Archive)
            .await
    }

    /// Move the selected messages to the trash.
    ///
    /// Reaches every folder except the trash itself; recoverable with
    /// [`Self::restore`] until permanently deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if a database query fails.
    pub async fn trash(
        &self,
        account: AccountId,
        selector: &MessageSelector,
    ) -> Result<BulkOutcome> {
        self.shift(
            account,
            selector,
            &[Folder::Inbox, Folder::Sent, Folder::Spam, Folder::Archive],
            Folder::Trash,
        )
        .await
    }

    /// Bring trashed or archived messages back to the inbox.
    ///
    /// # Errors
    ///
    /// Returns an error if a database query fails.
    pub async fn restore(
        &self,
        account: AccountId,
        selector: &MessageSelector,
    ) -> Result<BulkOutcome> {
        self.shift(
            account,
            selector,
            &[Folder::Trash, Folder::Archive],
            Folder::Inbox,
        )
        .await
    }

    /// Irreversibly delete the selected messages.
    ///
    /// A single id is deleted regardless of folder. A conversation
    /// selector only deletes members already in the trash, so emptying
    /// a conversation's trash never reaches its live messages.
    ///
    /// # Errors
    ///
    /// Returns an error if a database query fails.
    #[allow(clippy::cast_possible_truncation)]
    pub async fn permanent_delete(
        &self,
        account: AccountId,
        selector: &MessageSelector,
    ) -> Result<BulkOutcome> {
        match selector {
            MessageSelector::Id(id) => {
                let result = sqlx::query("DELETE FROM messages WHERE account_id = ? AND id = ?")
                    .bind(account.0)
                    .bind(id.0)
                    .execute(self.store.pool())
                    .await?;
                if result.rows_affected() == 0 {
                    warn!("permanent_delete missed message {id}");
                    return Ok(BulkOutcome::missed(*id));
                }
                debug!("Deleted message {id}");
                Ok(BulkOutcome::complete(1))
            }
            MessageSelector::Conversation(counterpart) => {
                let result = sqlx::query(
                    r"
                    DELETE FROM messages
                    WHERE account_id = ? AND counterpart = ? AND folder = 'trash'
                    ",
                )
                .bind(account.0)
                .bind(counterpart.to_lowercase())
                .execute(self.store.pool())
                .await?;
                debug!(
                    "Deleted {} trashed messages for {counterpart}",
                    result.rows_affected()
                );
                Ok(BulkOutcome::complete(result.rows_affected() as usize))
            }
        }
    }

    /// One bounded folder transition from any of `from` into `to`.
    #[allow(clippy::cast_possible_truncation)]
    async fn shift(
        &self,
        account: AccountId,
        selector: &MessageSelector,
        from: &[Folder],
        to: Folder,
    ) -> Result<BulkOutcome> {
        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new("UPDATE messages SET folder = ");
        qb.push_bind(to.as_str());
        qb.push(" WHERE account_id = ");
        qb.push_bind(account.0);
        match selector {
            MessageSelector::Id(id) => {
                qb.push(" AND id = ");
                qb.push_bind(id.0);
                qb.push(" AND folder IN (");
                let mut separated = qb.separated(", ");
                for folder in from {
                    separated.push_bind(folder.as_str());
                }
                separated.push_bind(to.as_str());
                qb.push(")");
            }
            MessageSelector::Conversation(counterpart) => {
                qb.push(" AND counterpart = ");
                qb.push_bind(counterpart.to_lowercase());
                qb.push(" AND folder IN (");
                let mut separated = qb.separated(", ");
                for folder in from {
                    separated.push_bind(folder.as_str());
                }
                qb.push(")");
            }
        }

        let result = qb.build().execute(self.store.pool()).await?;
        let moved = result.rows_affected() as usize;

        match selector {
            MessageSelector::Id(id) if moved == 0 => {
                warn!("Folder move missed message {id}");
                Ok(BulkOutcome::missed(*id))
            }
            _ => {
                debug!("Moved {moved} messages to {}", to.as_str());
                Ok(BulkOutcome::complete(moved))
            }
        }
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
        msg
    }

    async fn folder_of(store: &MessageStore, id: MessageId) -> Folder {
        store
            .get(AccountId::new(1), id)
            .await
            .unwrap()
            .unwrap()
            .folder
    }

    #[tokio::test]
    async fn mark_read_reports_partial_failure() {
        let store = MessageStore::in_memory().await.unwrap();
        let account = owner();
        let ids = store
            .ingest(
                &account,
                &[
                    received("r1", "alice@example.com", 100),
                    received("r2", "alice@example.com", 200),
                ],
            )
            .await
            .unwrap();
        let mutator = StateMutator::new(&store);

        let request = vec![ids[0], ids[1], MessageId::new(9999)];
        let outcome = mutator
            .mark_read(AccountId::new(1), &request, true)
            .await
            .unwrap();
        assert_eq!(outcome.updated_count, 2);
        assert_eq!(outcome.failed_ids, vec![MessageId::new(9999)]);

        for id in &ids {
            let stored = store.get(AccountId::new(1), *id).await.unwrap().unwrap();
            assert!(stored.is_read);
        }
    }

    #[tokio::test]
    async fn mark_read_repeat_reports_the_same_count() {
        let store = MessageStore::in_memory().await.unwrap();
        let account = owner();
        let ids = store
            .ingest(
                &account,
                &[
                    received("r1", "alice@example.com", 100),
                    received("r2", "alice@example.com", 200),
                ],
            )
            .await
            .unwrap();
        let mutator = StateMutator::new(&store);

        let first = mutator.mark_read(AccountId::new(1), &ids, true).await.unwrap();
        let second = mutator.mark_read(AccountId::new(1), &ids, true).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(second.updated_count, 2);
    }

    #[tokio::test]
    async fn mark_read_flips_back_to_unread() {
        let store = MessageStore::in_memory().await.unwrap();
        let account = owner();
        let ids = store
            .ingest(&account, &[received("r1", "alice@example.com", 100)])
            .await
            .unwrap();
        let mutator = StateMutator::new(&store);

        mutator.mark_read(AccountId::new(1), &ids, true).await.unwrap();
        mutator.mark_read(AccountId::new(1), &ids, false).await.unwrap();

        let stored = store.get(AccountId::new(1), ids[0]).await.unwrap().unwrap();
        assert!(!stored.is_read);
    }

    #[tokio::test]
    async fn mark_read_with_empty_batch_is_a_no_op() {
        let store = MessageStore::in_memory().await.unwrap();
        let mutator = StateMutator::new(&store);

        let outcome = mutator.mark_read(AccountId::new(1), &[], true).await.unwrap();
        assert_eq!(outcome, BulkOutcome::default());
    }

    #[tokio::test]
    async fn set_flag_rejects_unknown_id() {
        let store = MessageStore::in_memory().await.unwrap();
        let account = owner();
        let ids = store
            .ingest(&account, &[received("r1", "alice@example.com", 100)])
            .await
            .unwrap();
        let mutator = StateMutator::new(&store);

        mutator.set_flag(AccountId::new(1), ids[0], true).await.unwrap();
        let stored = store.get(AccountId::new(1), ids[0]).await.unwrap().unwrap();
        assert!(stored.is_flagged);

        let err = mutator
            .set_flag(AccountId::new(1), MessageId::new(9999), true)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MessageNotFound(MessageId(9999))));
    }

    #[tokio::test]
    async fn archive_and_restore_roundtrip() {
        let store = MessageStore::in_memory().await.unwrap();
        let account = owner();
        let ids = store
            .ingest(&account, &[received("r1", "alice@example.com", 100)])
            .await
            .unwrap();
        let mutator = StateMutator::new(&store);
        let selector = MessageSelector::Id(ids[0]);

        let outcome = mutator.archive(AccountId::new(1), &selector).await.unwrap();
        assert_eq!(outcome, BulkOutcome::complete(1));
        assert_eq!(folder_of(&store, ids[0]).await, Folder::Archive);

        // Archiving an archived message is a no-op success.
        let again = mutator.archive(AccountId::new(1), &selector).await.unwrap();
        assert_eq!(again, BulkOutcome::complete(1));

        let outcome = mutator.restore(AccountId::new(1), &selector).await.unwrap();
        assert_eq!(outcome, BulkOutcome::complete(1));
        assert_eq!(folder_of(&store, ids[0]).await, Folder::Inbox);
    }

    #[tokio::test]
    async fn moving_from_the_wrong_folder_fails_the_id() {
        let store = MessageStore::in_memory().await.unwrap();
        let account = owner();
        let mut spam = received("s1", "spammer@junk.com", 100);
        spam.folder = Folder::Spam;
        let ids = store.ingest(&account, &[spam]).await.unwrap();
        let mutator = StateMutator::new(&store);

        let outcome = mutator
            .archive(AccountId::new(1), &MessageSelector::Id(ids[0]))
            .await
            .unwrap();
        assert_eq!(outcome, BulkOutcome::missed(ids[0]));
        assert_eq!(folder_of(&store, ids[0]).await, Folder::Spam);
    }

    #[tokio::test]
    async fn conversation_trash_moves_every_member() {
        let store = MessageStore::in_memory().await.unwrap();
        let account = owner();
        let mut from_me = NewMessage::sent("s1", "alice@example.com", ts(150));
        from_me.from_address = "me@example.com".to_string();
        let ids = store
            .ingest(
                &account,
                &[
                    received("r1", "alice@example.com", 100),
                    from_me,
                    received("b1", "bob@example.com", 200),
                ],
            )
            .await
            .unwrap();
        let mutator = StateMutator::new(&store);

        let selector = MessageSelector::conversation("Alice@Example.com");
        let outcome = mutator.trash(AccountId::new(1), &selector).await.unwrap();
        assert_eq!(outcome, BulkOutcome::complete(2));
        assert_eq!(folder_of(&store, ids[0]).await, Folder::Trash);
        assert_eq!(folder_of(&store, ids[1]).await, Folder::Trash);
        assert_eq!(folder_of(&store, ids[2]).await, Folder::Inbox);

        // A conversation with no members in scope is a no-op success.
        let empty = mutator.trash(AccountId::new(1), &selector).await.unwrap();
        assert_eq!(empty, BulkOutcome::complete(0));
    }

    #[tokio::test]
    async fn permanent_delete_removes_the_message() {
        let store = MessageStore::in_memory().await.unwrap();
        let account = owner();
        let ids = store
            .ingest(&account, &[received("r1", "alice@example.com", 100)])
            .await
            .unwrap();
        let mutator = StateMutator::new(&store);

        let outcome = mutator
            .permanent_delete(AccountId::new(1), &MessageSelector::Id(ids[0]))
            .await
            .unwrap();
        assert_eq!(outcome, BulkOutcome::complete(1));
        assert!(store.get(AccountId::new(1), ids[0]).await.unwrap().is_none());

        let missed = mutator
            .permanent_delete(AccountId::new(1), &MessageSelector::Id(ids[0]))
            .await
            .unwrap();
        assert_eq!(missed, BulkOutcome::missed(ids[0]));
    }

    #[tokio::test]
    async fn conversation_delete_only_reaches_the_trash() {
        let store = MessageStore::in_memory().await.unwrap();
        let account = owner();
        let mut trashed = received("r1", "alice@example.com", 100);
        trashed.folder = Folder::Trash;
        let ids = store
            .ingest(
                &account,
                &[trashed, received("r2", "alice@example.com", 200)],
            )
            .await
            .unwrap();
        let mutator = StateMutator::new(&store);

        let outcome = mutator
            .permanent_delete(
                AccountId::new(1),
                &MessageSelector::conversation("alice@example.com"),
            )
            .await
            .unwrap();
        assert_eq!(outcome, BulkOutcome::complete(1));
        assert!(store.get(AccountId::new(1), ids[0]).await.unwrap().is_none());
        assert!(store.get(AccountId::new(1), ids[1]).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn mutations_respect_the_account_boundary() {
        let store = MessageStore::in_memory().await.unwrap();
        let account = owner();
        let ids = store
            .ingest(&account, &[received("r1", "alice@example.com", 100)])
            .await
            .unwrap();
        let mutator = StateMutator::new(&store);

        let outcome = mutator
            .mark_read(AccountId::new(2), &ids, true)
            .await
            .unwrap();
        assert_eq!(outcome.updated_count, 0);
        assert_eq!(outcome.failed_ids, ids);

        let stored = store.get(AccountId::new(1), ids[0]).await.unwrap().unwrap();
        assert!(!stored.is_read);
    }
}
