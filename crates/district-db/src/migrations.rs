use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (accounts, campaigns, edit history)");
        conn.execute_batch(
            "
            CREATE TABLE accounts (
                id              TEXT PRIMARY KEY,
                username        TEXT NOT NULL UNIQUE,
                email           TEXT NOT NULL UNIQUE,
                first_name      TEXT NOT NULL,
                last_name       TEXT NOT NULL DEFAULT '',
                password_hash   TEXT NOT NULL,
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            );

            -- creator_id is checked by the ownership guard, not by a foreign key:
            -- accounts may live in another service's database.
            CREATE TABLE campaigns (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                creator_id      TEXT NOT NULL,
                name            TEXT NOT NULL,
                description     TEXT NOT NULL DEFAULT '',
                goal            INTEGER NOT NULL CHECK (goal > 0),
                current_amount  INTEGER NOT NULL DEFAULT 0 CHECK (current_amount >= 0),
                deadline        TEXT NOT NULL,
                archived        INTEGER NOT NULL DEFAULT 0,
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            );

            CREATE TABLE campaign_edit_history (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                campaign_id     INTEGER NOT NULL REFERENCES campaigns(id),
                description     TEXT NOT NULL,
                goal            INTEGER NOT NULL,
                current_amount  INTEGER NOT NULL,
                deadline        TEXT NOT NULL,
                modified_at     TEXT NOT NULL
            );

            CREATE INDEX idx_history_campaign
                ON campaign_edit_history(campaign_id, id);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    if version < 2 {
        info!("Running migration v2 (campaign donations)");
        conn.execute_batch(
            "
            CREATE TABLE campaign_donations (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                campaign_id     INTEGER NOT NULL REFERENCES campaigns(id),
                account_id      TEXT NOT NULL,
                amount          INTEGER NOT NULL CHECK (amount > 0),
                donated_at      TEXT NOT NULL
            );

            CREATE INDEX idx_donations_campaign
                ON campaign_donations(campaign_id);

            INSERT INTO schema_version (version) VALUES (2);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
