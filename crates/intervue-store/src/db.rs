use rusqlite::Connection;

use crate::error::Result;

/// Open a connection to the given SQLite path (`:memory:` for tests) with
/// foreign keys enforced and WAL enabled, so the orchestrator and a
/// dispatched agent process can share one database file.
pub fn open(url: &str) -> Result<Connection> {
    let conn = if url == ":memory:" {
        Connection::open_in_memory()?
    } else {
        if let Some(parent) = std::path::Path::new(url).parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        Connection::open(url)?
    };
    conn.pragma_update(None, "foreign_keys", "ON")?;
    if url != ":memory:" {
        let _ = conn.pragma_update(None, "journal_mode", "WAL");
    }
    conn.busy_timeout(std::time::Duration::from_secs(5))?;
    init_db(&conn)?;
    Ok(conn)
}

/// Initialise the schema.
///
/// Safe to call on every startup — uses `IF NOT EXISTS` throughout. The
/// CHECK constraints are a backstop; range validation also happens in Rust
/// before any write.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS sessions (
            id              TEXT PRIMARY KEY,
            job_title       TEXT NOT NULL,
            seniority       TEXT NOT NULL,
            language        TEXT NOT NULL,
            mode            TEXT NOT NULL,
            num_questions   INTEGER NOT NULL CHECK (num_questions >= 1),
            status          TEXT NOT NULL DEFAULT 'active',
            overall_score   INTEGER CHECK (overall_score BETWEEN 0 AND 100),
            summary         TEXT,
            transcript      TEXT,
            questions_asked INTEGER NOT NULL DEFAULT 0,
            created_at      TEXT NOT NULL,
            completed_at    TEXT
        );
        CREATE TABLE IF NOT EXISTS questions (
            id         TEXT PRIMARY KEY,
            session_id TEXT NOT NULL REFERENCES sessions(id),
            idx        INTEGER NOT NULL,
            kind       TEXT NOT NULL,
            competency TEXT NOT NULL,
            text       TEXT NOT NULL,
            UNIQUE(session_id, idx)
        );
        CREATE TABLE IF NOT EXISTS answers (
            id            TEXT PRIMARY KEY,
            question_id   TEXT NOT NULL UNIQUE REFERENCES questions(id),
            text          TEXT NOT NULL,
            relevance     INTEGER CHECK (relevance BETWEEN 0 AND 100),
            clarity       INTEGER CHECK (clarity BETWEEN 0 AND 100),
            structure     INTEGER CHECK (structure BETWEEN 0 AND 100),
            impact        INTEGER CHECK (impact BETWEEN 0 AND 100),
            overall_score INTEGER NOT NULL CHECK (overall_score BETWEEN 0 AND 100),
            coach_notes   TEXT NOT NULL,
            created_at    TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_questions_session
            ON questions(session_id, idx);",
    )?;
    Ok(())
}
