//! User repository.

use super::DbError;
use parley_proto::User;
use sqlx::SqlitePool;

/// Repository for user records.
pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a user. The store assigns the id.
    pub async fn create(&self, username: &str) -> Result<User, DbError> {
        if self.get_by_username(username).await?.is_some() {
            return Err(DbError::UsernameTaken(username.to_string()));
        }

        let result = sqlx::query("INSERT INTO users (username, online) VALUES (?, 0)")
            .bind(username)
            .execute(self.pool)
            .await?;

        Ok(User {
            id: result.last_insert_rowid(),
            username: username.to_string(),
            online: false,
        })
    }

    /// Fetch a user by id.
    pub async fn get(&self, id: i64) -> Result<Option<User>, DbError> {
        let row: Option<(i64, String, bool)> =
            sqlx::query_as("SELECT id, username, online FROM users WHERE id = ?")
                .bind(id)
                .fetch_optional(self.pool)
                .await?;

        Ok(row.map(|(id, username, online)| User {
            id,
            username,
            online,
        }))
    }

    /// Fetch a user by username.
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>, DbError> {
        let row: Option<(i64, String, bool)> =
            sqlx::query_as("SELECT id, username, online FROM users WHERE username = ?")
                .bind(username)
                .fetch_optional(self.pool)
                .await?;

        Ok(row.map(|(id, username, online)| User {
            id,
            username,
            online,
        }))
    }

    /// Update the cached online flag for one user.
    pub async fn set_online(&self, id: i64, online: bool) -> Result<(), DbError> {
        sqlx::query("UPDATE users SET online = ? WHERE id = ?")
            .bind(online)
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Clear every online flag. Run at boot: presence is rebuilt from live
    /// connections, so flags from a previous process must not survive.
    pub async fn set_all_offline(&self) -> Result<(), DbError> {
        sqlx::query("UPDATE users SET online = 0 WHERE online != 0")
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// List all users, ordered by id.
    pub async fn list(&self) -> Result<Vec<User>, DbError> {
        let rows: Vec<(i64, String, bool)> =
            sqlx::query_as("SELECT id, username, online FROM users ORDER BY id")
                .fetch_all(self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .map(|(id, username, online)| User {
                id,
                username,
                online,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use crate::db::{Database, DbError};

    #[tokio::test]
    async fn create_and_fetch() {
        let db = Database::new(":memory:").await.unwrap();

        let alice = db.users().create("alice").await.unwrap();
        assert_eq!(alice.username, "alice");
        assert!(!alice.online);

        let fetched = db.users().get(alice.id).await.unwrap().unwrap();
        assert_eq!(fetched, alice);

        let by_name = db.users().get_by_username("alice").await.unwrap().unwrap();
        assert_eq!(by_name.id, alice.id);

        assert!(db.users().get(9999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_username_rejected() {
        let db = Database::new(":memory:").await.unwrap();
        db.users().create("alice").await.unwrap();

        let err = db.users().create("alice").await.unwrap_err();
        assert!(matches!(err, DbError::UsernameTaken(name) if name == "alice"));
    }

    #[tokio::test]
    async fn online_flags() {
        let db = Database::new(":memory:").await.unwrap();
        let alice = db.users().create("alice").await.unwrap();
        let bob = db.users().create("bob").await.unwrap();

        db.users().set_online(alice.id, true).await.unwrap();
        db.users().set_online(bob.id, true).await.unwrap();
        assert!(db.users().get(alice.id).await.unwrap().unwrap().online);

        db.users().set_all_offline().await.unwrap();
        let users = db.users().list().await.unwrap();
        assert_eq!(users.len(), 2);
        assert!(users.iter().all(|u| !u.online));
    }
}
