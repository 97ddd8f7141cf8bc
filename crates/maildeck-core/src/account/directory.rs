//! Account storage and lookup.

use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::debug;

use super::model::{AccountId, MailAccount};
use crate::{Error, Result};

/// Repository for account storage and lookup.
pub struct AccountDirectory {
    pool: SqlitePool,
}

impl AccountDirectory {
    /// Create a new directory with the given database path.
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

        let directory = Self { pool };
        directory.initialize().await?;
        Ok(directory)
    }

    /// Create an in-memory directory for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let directory = Self { pool };
        directory.initialize().await?;
        Ok(directory)
    }

    /// Initialize database schema.
    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS accounts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL UNIQUE,
                display_name TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Save an account (insert or update).
    ///
    /// Sets the ID on newly inserted accounts. The owner address is
    /// stored lowercase.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails, including when the
    /// address is already registered.
    pub async fn save(&self, account: &mut MailAccount) -> Result<()> {
        let email = account.email.to_lowercase();

        if let Some(id) = account.id {
            sqlx::query(
                r"
                UPDATE accounts SET email = ?, display_name = ?
                WHERE id = ?
                ",
            )
            .bind(&email)
            .bind(&account.display_name)
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        } else {
            let result = sqlx::query(
                r"
                INSERT INTO accounts (email, display_name) VALUES (?, ?)
                ",
            )
            .bind(&email)
            .bind(&account.display_name)
            .execute(&self.pool)
            .await?;

            account.id = Some(AccountId::new(result.last_insert_rowid()));
            debug!("Registered account {email}");
        }

        account.email = email;
        Ok(())
    }

    /// Get account by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get(&self, id: AccountId) -> Result<Option<MailAccount>> {
        let row = sqlx::query(
            r"
            SELECT id, email, display_name FROM accounts WHERE id = ?
            ",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(row_to_account))
    }

    /// Get an account, failing when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AccountNotFound`] for unknown IDs, or an error
    /// if the database query fails.
    pub async fn require(&self, id: AccountId) -> Result<MailAccount> {
        self.get(id).await?.ok_or(Error::AccountNotFound(id))
    }

    /// Find an account by its owner address.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<MailAccount>> {
        let row = sqlx::query(
            r"
            SELECT id, email, display_name FROM accounts WHERE email = ?
            ",
        )
        .bind(email.to_lowercase())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(row_to_account))
    }

    /// Get all accounts ordered by address.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self) -> Result<Vec<MailAccount>> {
        let rows = sqlx::query(
            r"
            SELECT id, email, display_name FROM accounts ORDER BY email ASC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_account).collect())
    }

    /// Delete an account.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn delete(&self, id: AccountId) -> Result<()> {
        sqlx::query("DELETE FROM accounts WHERE id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

/// Convert a database row to an account.
fn row_to_account(row: &sqlx::sqlite::SqliteRow) -> MailAccount {
    MailAccount {
        id: Some(AccountId::new(row.get("id"))),
        email: row.get("email"),
        display_name: row.get("display_name"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_and_retrieve_account() {
        let directory = AccountDirectory::in_memory().await.unwrap();

        let mut account = MailAccount::with_email("me@example.com");
        account.display_name = "Me".to_string();
        directory.save(&mut account).await.unwrap();
        assert!(account.id.is_some());

        let retrieved = directory.get(account.id.unwrap()).await.unwrap().unwrap();
        assert_eq!(retrieved.email, "me@example.com");
        assert_eq!(retrieved.display_name, "Me");
    }

    #[tokio::test]
    async fn save_normalizes_address_case() {
        let directory = AccountDirectory::in_memory().await.unwrap();

        let mut account = MailAccount::with_email("Owner@Example.com");
        directory.save(&mut account).await.unwrap();

        let found = directory.find_by_email("OWNER@example.COM").await.unwrap();
        assert_eq!(found.unwrap().id, account.id);
    }

    #[tokio::test]
    async fn require_fails_for_unknown_account() {
        let directory = AccountDirectory::in_memory().await.unwrap();

        let err = directory.require(AccountId::new(999)).await.unwrap_err();
        assert!(matches!(err, Error::AccountNotFound(AccountId(999))));
    }

    #[tokio::test]
    async fn list_orders_by_address() {
        let directory = AccountDirectory::in_memory().await.unwrap();

        let mut b = MailAccount::with_email("b@example.com");
        directory.save(&mut b).await.unwrap();
        let mut a = MailAccount::with_email("a@example.com");
        directory.save(&mut a).await.unwrap();

        let accounts = directory.list().await.unwrap();
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].email, "a@example.com");
    }
}
