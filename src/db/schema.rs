use rusqlite::Connection;

/// Initialize the database schema.
pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        -- Staff users; permissions is a JSON array of tags
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            permissions TEXT NOT NULL DEFAULT '[]',
            created_at INTEGER NOT NULL
        );

        -- Bearer tokens (hash only, plaintext shown once at creation)
        CREATE TABLE IF NOT EXISTS api_tokens (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            token_prefix TEXT NOT NULL,
            token_hash TEXT NOT NULL UNIQUE,
            created_at INTEGER NOT NULL,
            last_used_at INTEGER,
            revoked_at INTEGER
        );
        CREATE INDEX IF NOT EXISTS idx_api_tokens_user ON api_tokens(user_id);

        -- Contribution records; batch_date is always the first of the month
        -- and amounts are integer centavos
        CREATE TABLE IF NOT EXISTS contributions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            batch_date TEXT NOT NULL,
            sss_no TEXT NOT NULL,
            name TEXT NOT NULL,
            ss INTEGER NOT NULL,
            ec INTEGER NOT NULL,
            total INTEGER NOT NULL,
            sbr_no TEXT,
            sbr_date TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_contributions_batch ON contributions(batch_date);
        CREATE INDEX IF NOT EXISTS idx_contributions_sss ON contributions(sss_no);

        -- Report signatories (single row, id = 1)
        CREATE TABLE IF NOT EXISTS signatories (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            payroll_incharge TEXT NOT NULL DEFAULT '',
            vp_finance TEXT NOT NULL DEFAULT '',
            updated_at INTEGER NOT NULL
        );
        "#,
    )
}
