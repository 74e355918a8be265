//! Canonical SQLite schema for the house store.
//!
//! - `people` is the roster; `id` order is rotation order
//! - `expenses` is the append-only expense log
//! - `debts` holds at most one directed edge per pair of people
//! - `house_meta` tracks the applied schema version

/// Migration v1: roster, expense log, debt edges, and metadata.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS people (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE CHECK (length(trim(name)) > 0),
    chat_ref TEXT,
    identity TEXT UNIQUE,
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS expenses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    payer TEXT NOT NULL,
    amount REAL NOT NULL CHECK (amount > 0),
    description TEXT NOT NULL DEFAULT '',
    spent_on TEXT NOT NULL,
    participants INTEGER NOT NULL CHECK (participants > 0)
);

CREATE TABLE IF NOT EXISTS debts (
    debtor TEXT NOT NULL,
    creditor TEXT NOT NULL,
    amount REAL NOT NULL CHECK (amount > 0),
    PRIMARY KEY (debtor, creditor),
    CHECK (debtor <> creditor)
);

CREATE TABLE IF NOT EXISTS house_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    schema_version INTEGER NOT NULL,
    created_at_us INTEGER NOT NULL DEFAULT 0
);

INSERT OR IGNORE INTO house_meta (id, schema_version, created_at_us)
VALUES (1, 1, CAST(strftime('%s', 'now') AS INTEGER) * 1000000);
";

/// Migration v2: read-path indexes for balances and the expense log.
pub const MIGRATION_V2_SQL: &str = r"
CREATE INDEX IF NOT EXISTS idx_debts_creditor
    ON debts(creditor, debtor);

CREATE INDEX IF NOT EXISTS idx_expenses_spent_on
    ON expenses(spent_on DESC, id DESC);

CREATE INDEX IF NOT EXISTS idx_expenses_payer
    ON expenses(payer);

UPDATE house_meta
SET schema_version = 2
WHERE id = 1;
";

/// Indexes expected by balance and expense query paths.
pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_debts_creditor",
    "idx_expenses_spent_on",
    "idx_expenses_payer",
];
