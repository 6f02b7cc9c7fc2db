//! SQL migration definitions for the collegecms database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a batch of SQL statements.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: institutions, scraped_records",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version   INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Canonical institutions; the full record lives in `document` as JSON.
-- (name, location) is the natural key and is compared case-sensitively.
CREATE TABLE IF NOT EXISTS institutions (
    id         INTEGER PRIMARY KEY,
    name       TEXT NOT NULL,
    location   TEXT NOT NULL,
    document   TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(name, location)
);

-- Staging collection for scraped documents awaiting migration
CREATE TABLE IF NOT EXISTS scraped_records (
    id         TEXT PRIMARY KEY,
    source_url TEXT,
    status     TEXT NOT NULL DEFAULT 'draft',
    document   TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_scraped_records_status ON scraped_records(status);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
