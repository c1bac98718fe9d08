//! Direct-message repository.
//!
//! History is ordered by `(sent_at, id)` so same-millisecond messages keep
//! their insertion order.

use super::DbError;
use parley_proto::DirectMessage;
use sqlx::SqlitePool;

type MessageRow = (i64, i64, i64, String, i64, bool, bool);

fn row_to_message(row: MessageRow) -> DirectMessage {
    let (id, sender_id, receiver_id, content, sent_at, delivered, read) = row;
    DirectMessage {
        id,
        sender_id,
        receiver_id,
        content,
        sent_at,
        delivered,
        read,
    }
}

/// Repository for direct messages.
pub struct MessageRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> MessageRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Persist a new message. Starts life undelivered and unread.
    pub async fn create(
        &self,
        sender_id: i64,
        receiver_id: i64,
        content: &str,
    ) -> Result<DirectMessage, DbError> {
        let sent_at = chrono::Utc::now().timestamp_millis();

        let result = sqlx::query(
            r#"
            INSERT INTO messages (sender_id, receiver_id, content, sent_at, delivered, read)
            VALUES (?, ?, ?, ?, 0, 0)
            "#,
        )
        .bind(sender_id)
        .bind(receiver_id)
        .bind(content)
        .bind(sent_at)
        .execute(self.pool)
        .await?;

        Ok(DirectMessage {
            id: result.last_insert_rowid(),
            sender_id,
            receiver_id,
            content: content.to_string(),
            sent_at,
            delivered: false,
            read: false,
        })
    }

    /// Fetch a single message by id.
    #[allow(dead_code)] // no relay call sites; tests lean on it
    pub async fn get(&self, id: i64) -> Result<Option<DirectMessage>, DbError> {
        let row: Option<MessageRow> = sqlx::query_as(
            r#"
            SELECT id, sender_id, receiver_id, content, sent_at, delivered, read
            FROM messages
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(row_to_message))
    }

    /// Full conversation between two users, both directions, chronological.
    pub async fn between(&self, a: i64, b: i64) -> Result<Vec<DirectMessage>, DbError> {
        let rows: Vec<MessageRow> = sqlx::query_as(
            r#"
            SELECT id, sender_id, receiver_id, content, sent_at, delivered, read
            FROM messages
            WHERE (sender_id = ? AND receiver_id = ?)
               OR (sender_id = ? AND receiver_id = ?)
            ORDER BY sent_at ASC, id ASC
            "#,
        )
        .bind(a)
        .bind(b)
        .bind(b)
        .bind(a)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(row_to_message).collect())
    }

    /// Mark everything addressed to `receiver_id` as delivered.
    pub async fn mark_delivered(&self, receiver_id: i64) -> Result<(), DbError> {
        sqlx::query("UPDATE messages SET delivered = 1 WHERE receiver_id = ? AND delivered = 0")
            .bind(receiver_id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Mark everything from `sender_id` to `receiver_id` as read.
    /// Idempotent; never touches the delivered flag.
    pub async fn mark_read(&self, sender_id: i64, receiver_id: i64) -> Result<(), DbError> {
        sqlx::query(
            "UPDATE messages SET read = 1 WHERE sender_id = ? AND receiver_id = ? AND read = 0",
        )
        .bind(sender_id)
        .bind(receiver_id)
        .execute(self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::db::Database;

    async fn seed() -> (Database, i64, i64) {
        let db = Database::new(":memory:").await.unwrap();
        let alice = db.users().create("alice").await.unwrap().id;
        let bob = db.users().create("bob").await.unwrap().id;
        (db, alice, bob)
    }

    #[tokio::test]
    async fn new_messages_start_unsent() {
        let (db, alice, bob) = seed().await;

        let msg = db.messages().create(alice, bob, "hi").await.unwrap();
        assert!(!msg.delivered);
        assert!(!msg.read);

        let stored = db.messages().get(msg.id).await.unwrap().unwrap();
        assert_eq!(stored, msg);
    }

    #[tokio::test]
    async fn history_is_chronological_and_symmetric() {
        let (db, alice, bob) = seed().await;

        db.messages().create(alice, bob, "one").await.unwrap();
        db.messages().create(bob, alice, "two").await.unwrap();
        db.messages().create(alice, bob, "three").await.unwrap();

        let ab = db.messages().between(alice, bob).await.unwrap();
        let ba = db.messages().between(bob, alice).await.unwrap();
        assert_eq!(ab, ba);
        assert_eq!(
            ab.iter().map(|m| m.content.as_str()).collect::<Vec<_>>(),
            vec!["one", "two", "three"]
        );
        assert!(ab.windows(2).all(|w| w[0].sent_at <= w[1].sent_at));
    }

    #[tokio::test]
    async fn mark_delivered_is_per_receiver() {
        let (db, alice, bob) = seed().await;

        let to_bob = db.messages().create(alice, bob, "for bob").await.unwrap();
        let to_alice = db.messages().create(bob, alice, "for alice").await.unwrap();

        db.messages().mark_delivered(bob).await.unwrap();

        assert!(db.messages().get(to_bob.id).await.unwrap().unwrap().delivered);
        assert!(!db.messages().get(to_alice.id).await.unwrap().unwrap().delivered);
    }

    #[tokio::test]
    async fn mark_read_leaves_delivered_alone() {
        let (db, alice, bob) = seed().await;

        let msg = db.messages().create(alice, bob, "unseen").await.unwrap();

        db.messages().mark_read(alice, bob).await.unwrap();
        db.messages().mark_read(alice, bob).await.unwrap();

        let stored = db.messages().get(msg.id).await.unwrap().unwrap();
        assert!(stored.read);
        // Read does not imply delivered here; the flags move independently.
        assert!(!stored.delivered);

        // The opposite direction is untouched.
        let reply = db.messages().create(bob, alice, "reply").await.unwrap();
        db.messages().mark_read(alice, bob).await.unwrap();
        assert!(!db.messages().get(reply.id).await.unwrap().unwrap().read);
    }
}
