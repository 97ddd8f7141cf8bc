//! The mailbox service facade.

use tracing::debug;

use super::response::{ListResponse, MutationResponse, StatsResponse};
use crate::Result;
use crate::account::{AccountDirectory, AccountId};
use crate::conversation::{
    Conversation, ConversationAggregator, ConversationSort, exchange_folders,
};
use crate::message::{Folder, Message, MessageFilter, MessageId, MessageStore, NewMessage};
use crate::mutate::{BulkOutcome, MessageSelector, StateMutator};
use crate::page::{Page, PageRequest};
use crate::search::{SearchEngine, SearchHit, SearchQuery};
use crate::thread::{ThreadGroup, group_by_sender};

/// Server-side limits, explicit on every service instance.
#[derive(Debug, Clone, Copy)]
pub struct ServiceConfig {
    /// Largest conversation page a client can request.
    pub conversation_page_cap: usize,
    /// Largest message page a client can request.
    pub message_page_cap: usize,
    /// Largest search page a client can request.
    pub search_page_cap: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            conversation_page_cap: 100,
            message_page_cap: 100,
            search_page_cap: 50,
        }
    }
}

/// Protocol-agnostic entry point over one mailbox database.
///
/// Every method takes the account explicitly and validates it against
/// the [`AccountDirectory`] before touching messages. List and
/// mutation methods return serialization-ready envelopes; errors
/// become `success: false` responses instead of surfacing.
pub struct MailboxService {
    directory: AccountDirectory,
    store: MessageStore,
    config: ServiceConfig,
}

impl MailboxService {
    /// Open the service over a database file, creating it on first
    /// use.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn open(database_path: &str) -> Result<Self> {
        Ok(Self {
            directory: AccountDirectory::new(database_path).await?,
            store: MessageStore::new(database_path).await?,
            config: ServiceConfig::default(),
        })
    }

    /// Create an in-memory service for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn in_memory() -> Result<Self> {
        Ok(Self {
            directory: AccountDirectory::in_memory().await?,
            store: MessageStore::in_memory().await?,
            config: ServiceConfig::default(),
        })
    }

    /// Replace the limit configuration.
    #[must_use]
    pub const fn with_config(mut self, config: ServiceConfig) -> Self {
        self.config = config;
        self
    }

    /// The account directory behind this service.
    #[must_use]
    pub const fn directory(&self) -> &AccountDirectory {
        &self.directory
    }

    /// The message store behind this service.
    #[must_use]
    pub const fn store(&self) -> &MessageStore {
        &self.store
    }

    /// Ingest a batch of messages for `account`.
    ///
    /// Returns the stored ids in batch order. This is the
    /// ingestion-side entry point, not a client endpoint, so it
    /// reports errors directly instead of through an envelope.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::AccountNotFound`] for an unknown
    /// account, or an error if a database query fails.
    pub async fn ingest(&self, account: AccountId, batch: &[NewMessage]) -> Result<Vec<MessageId>> {
        let owner = self.directory.require(account).await?;
        self.store.ingest(&owner, batch).await
    }

    /// Page one folder's conversations.
    pub async fn list_conversations(
        &self,
        account: AccountId,
        folder: Folder,
        filter: &MessageFilter,
        sort: ConversationSort,
        page: PageRequest,
    ) -> ListResponse<Conversation> {
        let result = async {
            self.directory.require(account).await?;
            let page = page.clamped(self.config.conversation_page_cap)?;
            ConversationAggregator::new(&self.store)
                .list(account, folder, filter, sort, page)
                .await
        };
        ListResponse::from_result(result.await)
    }

    /// Page one conversation's messages, newest first.
    ///
    /// The scope is the conversation's whole exchange as seen from
    /// `folder`: an inbox conversation interleaves sent replies and
    /// archived members, while trash stays isolated.
    pub async fn list_messages(
        &self,
        account: AccountId,
        counterpart: &str,
        folder: Folder,
        page: PageRequest,
    ) -> ListResponse<Message> {
        ListResponse::from_result(self.messages(account, counterpart, folder, page).await)
    }

    /// Page one conversation's messages regrouped for the reading
    /// pane.
    ///
    /// The fetched page is reordered oldest-first, quoted tails are
    /// folded, and consecutive same-sender runs collapse into
    /// [`ThreadGroup`]s. Continuation state still follows the
    /// newest-first message pages.
    pub async fn thread_view(
        &self,
        account: AccountId,
        counterpart: &str,
        folder: Folder,
        page: PageRequest,
    ) -> ListResponse<ThreadGroup> {
        let result = self.messages(account, counterpart, folder, page).await;
        ListResponse::from_result(result.map(|page| {
            let Page {
                mut items,
                next_cursor,
                has_more,
            } = page;
            items.reverse();
            for message in &mut items {
                message.body_html = maildeck_html::fold_quoted(&message.body_html);
            }
            Page {
                items: group_by_sender(items),
                next_cursor,
                has_more,
            }
        }))
    }

    /// Page search hits across the account's mailbox.
    pub async fn search(
        &self,
        account: AccountId,
        query: &SearchQuery,
        page: PageRequest,
    ) -> ListResponse<SearchHit> {
        let result = async {
            self.directory.require(account).await?;
            let page = page.clamped(self.config.search_page_cap)?;
            SearchEngine::new(&self.store).search(account, query, page).await
        };
        ListResponse::from_result(result.await)
    }

    /// Mailbox rollup counts.
    pub async fn stats(&self, account: AccountId) -> StatsResponse {
        let result = async {
            self.directory.require(account).await?;
            self.store.stats(account).await
        };
        StatsResponse::from_result(result.await)
    }

    /// Set the read state of a batch of messages.
    pub async fn bulk_mark_read(
        &self,
        account: AccountId,
        ids: &[MessageId],
        is_read: bool,
    ) -> MutationResponse {
        let result = async {
            self.directory.require(account).await?;
            StateMutator::new(&self.store).mark_read(account, ids, is_read).await
        };
        MutationResponse::from_result(result.await)
    }

    /// Set the flag state of a single message.
    pub async fn set_flag(
        &self,
        account: AccountId,
        id: MessageId,
        flagged: bool,
    ) -> MutationResponse {
        let result = async {
            self.directory.require(account).await?;
            StateMutator::new(&self.store).set_flag(account, id, flagged).await?;
            Ok(BulkOutcome::complete(1))
        };
        MutationResponse::from_result(result.await)
    }

    /// Move the selected inbox messages to the archive.
    pub async fn archive(
        &self,
        account: AccountId,
        selector: &MessageSelector,
    ) -> MutationResponse {
        let result = async {
            self.directory.require(account).await?;
            StateMutator::new(&self.store).archive(account, selector).await
        };
        MutationResponse::from_result(result.await)
    }

    /// Move the selected messages to the trash.
    pub async fn trash(&self, account: AccountId, selector: &MessageSelector) -> MutationResponse {
        let result = async {
            self.directory.require(account).await?;
            StateMutator::new(&self.store).trash(account, selector).await
        };
        MutationResponse::from_result(result.await)
    }

    /// Bring trashed or archived messages back to the inbox.
    pub async fn restore(
        &self,
        account: AccountId,
        selector: &MessageSelector,
    ) -> MutationResponse {
        let result = async {
            self.directory.require(account).await?;
            StateMutator::new(&self.store).restore(account, selector).await
        };
        MutationResponse::from_result(result.await)
    }

    /// Irreversibly delete the selected messages.
    pub async fn permanent_delete(
        &self,
        account: AccountId,
        selector: &MessageSelector,
    ) -> MutationResponse {
        let result = async {
            self.directory.require(account).await?;
            StateMutator::new(&self.store).permanent_delete(account, selector).await
        };
        MutationResponse::from_result(result.await)
    }

    /// Shared fetch for message list and thread view.
    async fn messages(
        &self,
        account: AccountId,
        counterpart: &str,
        folder: Folder,
        page: PageRequest,
    ) -> Result<Page<Message>> {
        self.directory.require(account).await?;
        let page = page.clamped(self.config.message_page_cap)?;
        let filter = MessageFilter {
            counterpart: Some(counterpart.to_string()),
            folders: exchange_folders(folder).to_vec(),
            ..MessageFilter::default()
        };
        debug!("Listing messages with {counterpart} as seen from {}", folder.as_str());
        self.store.find_messages(account, &filter, page).await
    }
}
