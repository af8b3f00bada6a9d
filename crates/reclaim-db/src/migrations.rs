use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL,
            username    TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            role        TEXT NOT NULL DEFAULT 'user',
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS items (
            id          TEXT PRIMARY KEY,
            title       TEXT NOT NULL,
            description TEXT NOT NULL,
            category    TEXT NOT NULL,
            location    TEXT NOT NULL,
            kind        TEXT NOT NULL,
            status      TEXT NOT NULL DEFAULT 'active',
            images      TEXT NOT NULL DEFAULT '[]',
            posted_by   TEXT NOT NULL REFERENCES users(id),
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_items_status
            ON items(status, created_at);
        CREATE INDEX IF NOT EXISTS idx_items_poster
            ON items(posted_by);

        -- item_id is deliberately not a foreign key: deleting an item leaves
        -- its claims behind as dangling references, which the claim workflow
        -- surfaces as an integrity error.
        CREATE TABLE IF NOT EXISTS claims (
            id            TEXT PRIMARY KEY,
            item_id       TEXT NOT NULL,
            claimant_id   TEXT NOT NULL REFERENCES users(id),
            description   TEXT NOT NULL,
            status        TEXT NOT NULL DEFAULT 'pending',
            owner_message TEXT,
            created_at    TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_claims_item
            ON claims(item_id);

        -- Same unenforced item_id: threads skip messages whose item is gone.
        CREATE TABLE IF NOT EXISTS messages (
            id          TEXT PRIMARY KEY,
            item_id     TEXT NOT NULL,
            sender_id   TEXT NOT NULL REFERENCES users(id),
            receiver_id TEXT NOT NULL REFERENCES users(id),
            text        TEXT NOT NULL,
            read        INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_messages_item
            ON messages(item_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_messages_receiver
            ON messages(receiver_id);

        CREATE TABLE IF NOT EXISTS notifications (
            id              TEXT PRIMARY KEY,
            recipient_id    TEXT NOT NULL REFERENCES users(id),
            message         TEXT NOT NULL,
            related_item_id TEXT NOT NULL,
            is_read         INTEGER NOT NULL DEFAULT 0,
            created_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_notifications_recipient
            ON notifications(recipient_id, created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
