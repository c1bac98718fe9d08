//! Group repository: groups, memberships and group messages.

use super::DbError;
use parley_proto::{Group, GroupMessage};
use sqlx::SqlitePool;

type GroupRow = (i64, String, String, i64, i64);
type GroupMessageRow = (i64, i64, i64, String, i64);

fn row_to_group(row: GroupRow) -> Group {
    let (id, name, address, admin_id, created_at) = row;
    Group {
        id,
        name,
        address,
        admin_id,
        created_at,
    }
}

fn row_to_group_message(row: GroupMessageRow) -> GroupMessage {
    let (id, group_id, sender_id, content, sent_at) = row;
    GroupMessage {
        id,
        group_id,
        sender_id,
        content,
        sent_at,
    }
}

/// Repository for group records.
pub struct GroupRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> GroupRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a group. The address must be unique; the creator becomes the
    /// admin and gets an implicit membership row.
    pub async fn create(&self, name: &str, address: &str, admin_id: i64) -> Result<Group, DbError> {
        if self.find_by_address(address).await?.is_some() {
            return Err(DbError::AddressTaken(address.to_string()));
        }

        let now = chrono::Utc::now().timestamp_millis();

        let result = sqlx::query(
            "INSERT INTO groups (name, address, admin_id, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(name)
        .bind(address)
        .bind(admin_id)
        .bind(now)
        .execute(self.pool)
        .await?;

        let group_id = result.last_insert_rowid();

        sqlx::query("INSERT INTO group_members (group_id, user_id, joined_at) VALUES (?, ?, ?)")
            .bind(group_id)
            .bind(admin_id)
            .bind(now)
            .execute(self.pool)
            .await?;

        Ok(Group {
            id: group_id,
            name: name.to_string(),
            address: address.to_string(),
            admin_id,
            created_at: now,
        })
    }

    /// Find a group by its address.
    pub async fn find_by_address(&self, address: &str) -> Result<Option<Group>, DbError> {
        let row: Option<GroupRow> = sqlx::query_as(
            "SELECT id, name, address, admin_id, created_at FROM groups WHERE address = ?",
        )
        .bind(address)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(row_to_group))
    }

    /// Find a group by id.
    #[allow(dead_code)] // no relay call sites yet
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Group>, DbError> {
        let row: Option<GroupRow> = sqlx::query_as(
            "SELECT id, name, address, admin_id, created_at FROM groups WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(row_to_group))
    }

    /// Add a membership row. Callers are expected to check `is_member`
    /// first; this insert is unconditional.
    pub async fn add_member(&self, group_id: i64, user_id: i64) -> Result<(), DbError> {
        let now = chrono::Utc::now().timestamp_millis();
        sqlx::query("INSERT INTO group_members (group_id, user_id, joined_at) VALUES (?, ?, ?)")
            .bind(group_id)
            .bind(user_id)
            .bind(now)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Remove a user's membership rows for a group.
    #[allow(dead_code)] // no relay call sites yet
    pub async fn remove_member(&self, group_id: i64, user_id: i64) -> Result<(), DbError> {
        sqlx::query("DELETE FROM group_members WHERE group_id = ? AND user_id = ?")
            .bind(group_id)
            .bind(user_id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Member user ids for a group.
    #[allow(dead_code)] // fan-out reads the subscription table instead
    pub async fn list_members(&self, group_id: i64) -> Result<Vec<i64>, DbError> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            "SELECT user_id FROM group_members WHERE group_id = ? ORDER BY joined_at, id",
        )
        .bind(group_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Count of durable members in a group.
    pub async fn member_count(&self, group_id: i64) -> Result<i64, DbError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM group_members WHERE group_id = ?")
                .bind(group_id)
                .fetch_one(self.pool)
                .await?;
        Ok(count)
    }

    /// Whether `user_id` holds a membership row in `group_id`.
    pub async fn is_member(&self, group_id: i64, user_id: i64) -> Result<bool, DbError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM group_members WHERE group_id = ? AND user_id = ?",
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;
        Ok(count > 0)
    }

    /// Whether `user_id` is the group's admin.
    #[allow(dead_code)] // no relay call sites yet
    pub async fn is_admin(&self, group_id: i64, user_id: i64) -> Result<bool, DbError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM groups WHERE id = ? AND admin_id = ?")
                .bind(group_id)
                .bind(user_id)
                .fetch_one(self.pool)
                .await?;
        Ok(count > 0)
    }

    /// All groups `user_id` belongs to.
    pub async fn groups_for(&self, user_id: i64) -> Result<Vec<Group>, DbError> {
        let rows: Vec<GroupRow> = sqlx::query_as(
            r#"
            SELECT g.id, g.name, g.address, g.admin_id, g.created_at
            FROM groups g
            JOIN group_members m ON m.group_id = g.id
            WHERE m.user_id = ?
            ORDER BY g.id
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(row_to_group).collect())
    }

    /// Persist a group message.
    pub async fn create_message(
        &self,
        group_id: i64,
        sender_id: i64,
        content: &str,
    ) -> Result<GroupMessage, DbError> {
        let sent_at = chrono::Utc::now().timestamp_millis();

        let result = sqlx::query(
            "INSERT INTO group_messages (group_id, sender_id, content, sent_at) VALUES (?, ?, ?, ?)",
        )
        .bind(group_id)
        .bind(sender_id)
        .bind(content)
        .bind(sent_at)
        .execute(self.pool)
        .await?;

        Ok(GroupMessage {
            id: result.last_insert_rowid(),
            group_id,
            sender_id,
            content: content.to_string(),
            sent_at,
        })
    }

    /// Full message history for a group, chronological.
    pub async fn list_messages(&self, group_id: i64) -> Result<Vec<GroupMessage>, DbError> {
        let rows: Vec<GroupMessageRow> = sqlx::query_as(
            r#"
            SELECT id, group_id, sender_id, content, sent_at
            FROM group_messages
            WHERE group_id = ?
            ORDER BY sent_at ASC, id ASC
            "#,
        )
        .bind(group_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(row_to_group_message).collect())
    }
}

#[cfg(test)]
mod tests {
    use crate::db::{Database, DbError};

    async fn seed() -> (Database, i64, i64) {
        let db = Database::new(":memory:").await.unwrap();
        let carol = db.users().create("carol").await.unwrap().id;
        let alice = db.users().create("alice").await.unwrap().id;
        (db, carol, alice)
    }

    #[tokio::test]
    async fn create_grants_admin_membership() {
        let (db, carol, _) = seed().await;

        let group = db.groups().create("Rustaceans", "rustaceans", carol).await.unwrap();
        assert_eq!(group.admin_id, carol);

        assert!(db.groups().is_member(group.id, carol).await.unwrap());
        assert!(db.groups().is_admin(group.id, carol).await.unwrap());
        assert_eq!(db.groups().member_count(group.id).await.unwrap(), 1);

        let found = db.groups().find_by_address("rustaceans").await.unwrap().unwrap();
        assert_eq!(found, group);
        assert_eq!(db.groups().find_by_id(group.id).await.unwrap().unwrap(), group);
    }

    #[tokio::test]
    async fn address_is_unique() {
        let (db, carol, alice) = seed().await;
        db.groups().create("First", "the-spot", carol).await.unwrap();

        let err = db.groups().create("Second", "the-spot", alice).await.unwrap_err();
        assert!(matches!(err, DbError::AddressTaken(addr) if addr == "the-spot"));
    }

    #[tokio::test]
    async fn membership_roundtrip() {
        let (db, carol, alice) = seed().await;
        let group = db.groups().create("Rustaceans", "rustaceans", carol).await.unwrap();

        db.groups().add_member(group.id, alice).await.unwrap();
        assert!(db.groups().is_member(group.id, alice).await.unwrap());
        assert!(!db.groups().is_admin(group.id, alice).await.unwrap());
        assert_eq!(db.groups().list_members(group.id).await.unwrap(), vec![carol, alice]);
        assert_eq!(db.groups().groups_for(alice).await.unwrap(), vec![group.clone()]);

        db.groups().remove_member(group.id, alice).await.unwrap();
        assert!(!db.groups().is_member(group.id, alice).await.unwrap());
        assert_eq!(db.groups().member_count(group.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn group_messages_are_chronological() {
        let (db, carol, alice) = seed().await;
        let group = db.groups().create("Rustaceans", "rustaceans", carol).await.unwrap();
        db.groups().add_member(group.id, alice).await.unwrap();

        db.groups().create_message(group.id, carol, "first").await.unwrap();
        db.groups().create_message(group.id, alice, "second").await.unwrap();

        let history = db.groups().list_messages(group.id).await.unwrap();
        assert_eq!(
            history.iter().map(|m| m.content.as_str()).collect::<Vec<_>>(),
            vec!["first", "second"]
        );
        assert!(history.windows(2).all(|w| w[0].sent_at <= w[1].sent_at));
    }
}
