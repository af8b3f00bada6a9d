use anyhow::Result;
use chrono::Utc;
use rusqlite::types::ToSql;
use rusqlite::{OptionalExtension, Row};

use crate::Database;
use crate::models::{
    ClaimRow, IncomingClaimRow, ItemRow, MessageRow, NotificationRow, ThreadMessageRow, UserRow,
};

fn now() -> String {
    Utc::now().to_rfc3339()
}

// -- Users --

impl Database {
    pub fn create_user(
        &self,
        id: &str,
        name: &str,
        username: &str,
        password_hash: &str,
        role: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, name, username, password, role, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![id, name, username, password_hash, role, now()],
            )?;
            Ok(())
        })
    }

    pub fn user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let row = conn
                .prepare(
                    "SELECT id, name, username, password, role, created_at
                     FROM users WHERE username = ?1",
                )?
                .query_row([username], map_user_row)
                .optional()?;
            Ok(row)
        })
    }

    pub fn user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let row = conn
                .prepare(
                    "SELECT id, name, username, password, role, created_at
                     FROM users WHERE id = ?1",
                )?
                .query_row([id], map_user_row)
                .optional()?;
            Ok(row)
        })
    }

    /// Returns false when no user has that username.
    pub fn set_user_role(&self, username: &str, role: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET role = ?1 WHERE username = ?2",
                rusqlite::params![role, username],
            )?;
            Ok(changed > 0)
        })
    }
}

fn map_user_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        name: row.get(1)?,
        username: row.get(2)?,
        password: row.get(3)?,
        role: row.get(4)?,
        created_at: row.get(5)?,
    })
}

// -- Items --

/// Equality filters over the declared item fields, substring search and a
/// sort spec for the item listing. Values bind as parameters; sort fields
/// are a closed whitelist, so no caller-controlled text reaches the SQL.
#[derive(Debug, Default)]
pub struct ItemFilter {
    pub category: Option<String>,
    pub kind: Option<String>,
    pub status: Option<String>,
    pub location: Option<String>,
    pub posted_by: Option<String>,
    pub search: Option<String>,
    pub sort: Vec<SortKey>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    CreatedAt,
    Title,
    Category,
    Status,
}

impl SortField {
    fn column(self) -> &'static str {
        match self {
            SortField::CreatedAt => "i.created_at",
            SortField::Title => "i.title",
            SortField::Category => "i.category",
            SortField::Status => "i.status",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub field: SortField,
    pub descending: bool,
}

impl SortKey {
    /// Parses one segment of a sort spec, e.g. `-created_at` or `title`.
    pub fn parse(spec: &str) -> Option<Self> {
        let (descending, name) = match spec.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, spec),
        };
        let field = match name {
            "created_at" => SortField::CreatedAt,
            "title" => SortField::Title,
            "category" => SortField::Category,
            "status" => SortField::Status,
            _ => return None,
        };
        Some(SortKey { field, descending })
    }
}

const ITEM_COLUMNS: &str = "i.id, i.title, i.description, i.category, i.location, i.kind, \
     i.status, i.images, i.posted_by, u.name, u.username, i.created_at";

impl Database {
    #[allow(clippy::too_many_arguments)]
    pub fn insert_item(
        &self,
        id: &str,
        title: &str,
        description: &str,
        category: &str,
        location: &str,
        kind: &str,
        images_json: &str,
        posted_by: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO items (id, title, description, category, location, kind, status, images, posted_by, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'active', ?7, ?8, ?9)",
                rusqlite::params![id, title, description, category, location, kind, images_json, posted_by, now()],
            )?;
            Ok(())
        })
    }

    pub fn item_by_id(&self, id: &str) -> Result<Option<ItemRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {ITEM_COLUMNS} FROM items i JOIN users u ON i.posted_by = u.id WHERE i.id = ?1"
            );
            let row = conn.prepare(&sql)?.query_row([id], map_item_row).optional()?;
            Ok(row)
        })
    }

    pub fn list_items(&self, filter: &ItemFilter) -> Result<Vec<ItemRow>> {
        self.with_conn(|conn| {
            let mut sql = format!(
                "SELECT {ITEM_COLUMNS} FROM items i JOIN users u ON i.posted_by = u.id"
            );

            let mut clauses: Vec<String> = Vec::new();
            let mut args: Vec<String> = Vec::new();

            if let Some(category) = &filter.category {
                clauses.push(format!("i.category = ?{}", args.len() + 1));
                args.push(category.clone());
            }
            if let Some(kind) = &filter.kind {
                clauses.push(format!("i.kind = ?{}", args.len() + 1));
                args.push(kind.clone());
            }
            if let Some(status) = &filter.status {
                clauses.push(format!("i.status = ?{}", args.len() + 1));
                args.push(status.clone());
            }
            if let Some(location) = &filter.location {
                clauses.push(format!("i.location = ?{}", args.len() + 1));
                args.push(location.clone());
            }
            if let Some(posted_by) = &filter.posted_by {
                clauses.push(format!("i.posted_by = ?{}", args.len() + 1));
                args.push(posted_by.clone());
            }
            if let Some(search) = &filter.search {
                // LIKE is case-insensitive for ASCII in SQLite
                let pattern = format!("%{}%", search);
                clauses.push(format!(
                    "(i.title LIKE ?{} OR i.description LIKE ?{})",
                    args.len() + 1,
                    args.len() + 2
                ));
                args.push(pattern.clone());
                args.push(pattern);
            }

            if !clauses.is_empty() {
                sql.push_str(" WHERE ");
                sql.push_str(&clauses.join(" AND "));
            }

            if filter.sort.is_empty() {
                sql.push_str(" ORDER BY i.created_at DESC, i.rowid DESC");
            } else {
                let keys: Vec<String> = filter
                    .sort
                    .iter()
                    .map(|k| {
                        format!(
                            "{} {}",
                            k.field.column(),
                            if k.descending { "DESC" } else { "ASC" }
                        )
                    })
                    .collect();
                sql.push_str(" ORDER BY ");
                sql.push_str(&keys.join(", "));
            }

            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn ToSql> = args.iter().map(|a| a as &dyn ToSql).collect();
            let rows = stmt
                .query_map(params.as_slice(), map_item_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn items_by_poster(&self, user_id: &str) -> Result<Vec<ItemRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {ITEM_COLUMNS} FROM items i JOIN users u ON i.posted_by = u.id
                 WHERE i.posted_by = ?1 ORDER BY i.created_at DESC, i.rowid DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], map_item_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn update_item(
        &self,
        id: &str,
        title: &str,
        description: &str,
        category: &str,
        location: &str,
        kind: &str,
        status: &str,
        images_json: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE items SET title = ?1, description = ?2, category = ?3, location = ?4,
                 kind = ?5, status = ?6, images = ?7 WHERE id = ?8",
                rusqlite::params![title, description, category, location, kind, status, images_json, id],
            )?;
            Ok(())
        })
    }

    pub fn set_item_status(&self, id: &str, status: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE items SET status = ?1 WHERE id = ?2",
                rusqlite::params![status, id],
            )?;
            Ok(())
        })
    }

    pub fn delete_item(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM items WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }
}

fn map_item_row(row: &Row<'_>) -> rusqlite::Result<ItemRow> {
    Ok(ItemRow {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        location: row.get(4)?,
        kind: row.get(5)?,
        status: row.get(6)?,
        images: row.get(7)?,
        posted_by: row.get(8)?,
        poster_name: row.get(9)?,
        poster_username: row.get(10)?,
        created_at: row.get(11)?,
    })
}

// -- Claims --

impl Database {
    pub fn insert_claim(
        &self,
        id: &str,
        item_id: &str,
        claimant_id: &str,
        description: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO claims (id, item_id, claimant_id, description, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, 'pending', ?5)",
                rusqlite::params![id, item_id, claimant_id, description, now()],
            )?;
            Ok(())
        })
    }

    pub fn claim_by_id(&self, id: &str) -> Result<Option<ClaimRow>> {
        self.with_conn(|conn| {
            let row = conn
                .prepare(
                    "SELECT id, item_id, claimant_id, description, status, owner_message, created_at
                     FROM claims WHERE id = ?1",
                )?
                .query_row([id], map_claim_row)
                .optional()?;
            Ok(row)
        })
    }

    /// Claims against items posted by `owner_id`, newest first, joined with
    /// claimant identity and item title/kind.
    pub fn claims_for_owner(&self, owner_id: &str) -> Result<Vec<IncomingClaimRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id, c.description, c.status, c.owner_message,
                        u.id, u.name, u.username,
                        i.id, i.title, i.kind, c.created_at
                 FROM claims c
                 JOIN items i ON c.item_id = i.id
                 JOIN users u ON c.claimant_id = u.id
                 WHERE i.posted_by = ?1
                 ORDER BY c.created_at DESC, c.rowid DESC",
            )?;
            let rows = stmt
                .query_map([owner_id], |row| {
                    Ok(IncomingClaimRow {
                        id: row.get(0)?,
                        description: row.get(1)?,
                        status: row.get(2)?,
                        owner_message: row.get(3)?,
                        claimant_id: row.get(4)?,
                        claimant_name: row.get(5)?,
                        claimant_username: row.get(6)?,
                        item_id: row.get(7)?,
                        item_title: row.get(8)?,
                        item_kind: row.get(9)?,
                        created_at: row.get(10)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn set_claim_status(
        &self,
        id: &str,
        status: &str,
        owner_message: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE claims SET status = ?1, owner_message = ?2 WHERE id = ?3",
                rusqlite::params![status, owner_message, id],
            )?;
            Ok(())
        })
    }

    pub fn delete_claim(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM claims WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }
}

fn map_claim_row(row: &Row<'_>) -> rusqlite::Result<ClaimRow> {
    Ok(ClaimRow {
        id: row.get(0)?,
        item_id: row.get(1)?,
        claimant_id: row.get(2)?,
        description: row.get(3)?,
        status: row.get(4)?,
        owner_message: row.get(5)?,
        created_at: row.get(6)?,
    })
}

// -- Messages --

impl Database {
    pub fn insert_message(
        &self,
        id: &str,
        item_id: &str,
        sender_id: &str,
        receiver_id: &str,
        text: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, item_id, sender_id, receiver_id, text, read, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
                rusqlite::params![id, item_id, sender_id, receiver_id, text, now()],
            )?;
            Ok(())
        })
    }

    pub fn message_by_id(&self, id: &str) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| {
            let row = conn
                .prepare(
                    "SELECT id, item_id, sender_id, receiver_id, text, read, created_at
                     FROM messages WHERE id = ?1",
                )?
                .query_row([id], map_message_row)
                .optional()?;
            Ok(row)
        })
    }

    /// Both directions of the (item, pair) conversation, oldest first.
    pub fn conversation(
        &self,
        item_id: &str,
        user_a: &str,
        user_b: &str,
    ) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, item_id, sender_id, receiver_id, text, read, created_at
                 FROM messages
                 WHERE item_id = ?1
                   AND ((sender_id = ?2 AND receiver_id = ?3)
                     OR (sender_id = ?3 AND receiver_id = ?2))
                 ORDER BY created_at ASC, rowid ASC",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![item_id, user_a, user_b], map_message_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Flips `read` on every unread message of the conversation addressed to
    /// `receiver_id`. Field-level conditional update, so it races harmlessly
    /// with a concurrent insert from the same sender.
    pub fn mark_conversation_read(
        &self,
        item_id: &str,
        sender_id: &str,
        receiver_id: &str,
    ) -> Result<usize> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE messages SET read = 1
                 WHERE item_id = ?1 AND sender_id = ?2 AND receiver_id = ?3 AND read = 0",
                rusqlite::params![item_id, sender_id, receiver_id],
            )?;
            Ok(changed)
        })
    }

    /// Every message the user sent or received, newest first, joined with
    /// both participants and the item. Inner joins drop rows whose item or
    /// user reference dangles.
    pub fn messages_touching(&self, user_id: &str) -> Result<Vec<ThreadMessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.id, m.item_id, i.title,
                        s.id, s.name, s.username,
                        r.id, r.name, r.username,
                        m.text, m.read, m.created_at
                 FROM messages m
                 JOIN items i ON m.item_id = i.id
                 JOIN users s ON m.sender_id = s.id
                 JOIN users r ON m.receiver_id = r.id
                 WHERE m.sender_id = ?1 OR m.receiver_id = ?1
                 ORDER BY m.created_at DESC, m.rowid DESC",
            )?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(ThreadMessageRow {
                        id: row.get(0)?,
                        item_id: row.get(1)?,
                        item_title: row.get(2)?,
                        sender_id: row.get(3)?,
                        sender_name: row.get(4)?,
                        sender_username: row.get(5)?,
                        receiver_id: row.get(6)?,
                        receiver_name: row.get(7)?,
                        receiver_username: row.get(8)?,
                        text: row.get(9)?,
                        read: row.get(10)?,
                        created_at: row.get(11)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn map_message_row(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        item_id: row.get(1)?,
        sender_id: row.get(2)?,
        receiver_id: row.get(3)?,
        text: row.get(4)?,
        read: row.get(5)?,
        created_at: row.get(6)?,
    })
}

// -- Notifications --

impl Database {
    pub fn insert_notification(
        &self,
        id: &str,
        recipient_id: &str,
        message: &str,
        related_item_id: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO notifications (id, recipient_id, message, related_item_id, is_read, created_at)
                 VALUES (?1, ?2, ?3, ?4, 0, ?5)",
                rusqlite::params![id, recipient_id, message, related_item_id, now()],
            )?;
            Ok(())
        })
    }

    pub fn notifications_for(&self, recipient_id: &str) -> Result<Vec<NotificationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, recipient_id, message, related_item_id, is_read, created_at
                 FROM notifications
                 WHERE recipient_id = ?1
                 ORDER BY created_at DESC, rowid DESC",
            )?;
            let rows = stmt
                .query_map([recipient_id], |row| {
                    Ok(NotificationRow {
                        id: row.get(0)?,
                        recipient_id: row.get(1)?,
                        message: row.get(2)?,
                        related_item_id: row.get(3)?,
                        is_read: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Returns false when the id does not resolve.
    pub fn mark_notification_read(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE notifications SET is_read = 1 WHERE id = ?1",
                [id],
            )?;
            Ok(changed > 0)
        })
    }
}
