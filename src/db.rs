use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;

/// How long a writer waits on a locked database before giving up
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

/// Open a database file shared by several workers and make sure the schema
/// exists.
///
/// Every worker holds its own connection. WAL mode lets readers proceed while
/// one writer commits; the busy timeout queues concurrent writers.
pub fn open(path: &Path) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get::<_, String>(0))?;
    init_schema(&conn)?;
    Ok(conn)
}

/// Private in-memory database (one connection only)
pub fn open_in_memory() -> rusqlite::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    init_schema(&conn)?;
    Ok(conn)
}

/// Initialize database schema
fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS source_file (
            hash TEXT PRIMARY KEY,
            source BLOB NOT NULL,
            added_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS source_path (
            path TEXT PRIMARY KEY,
            hash TEXT NOT NULL,
            FOREIGN KEY (hash) REFERENCES source_file(hash)
        );

        CREATE TABLE IF NOT EXISTS parsed_source (
            hash TEXT PRIMARY KEY,
            tokens TEXT NOT NULL,
            ast TEXT NOT NULL,
            parsed_at TEXT NOT NULL,
            FOREIGN KEY (hash) REFERENCES source_file(hash)
        );

        CREATE TABLE IF NOT EXISTS failure (
            hash TEXT PRIMARY KEY,
            failed_at TEXT NOT NULL,
            FOREIGN KEY (hash) REFERENCES source_file(hash)
        );

        CREATE TABLE IF NOT EXISTS source_summary (
            hash TEXT PRIMARY KEY,
            sloc INTEGER NOT NULL,
            n_tokens INTEGER NOT NULL,
            FOREIGN KEY (hash) REFERENCES source_file(hash)
        );

        CREATE TABLE IF NOT EXISTS codepoint_count (
            label TEXT PRIMARY KEY,
            count INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS profiled_source (
            hash TEXT PRIMARY KEY,
            profiled_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS queue_item (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            queue TEXT NOT NULL,
            item TEXT NOT NULL,
            state TEXT NOT NULL DEFAULT 'pending',
            claimed_by TEXT,
            enqueued_at TEXT NOT NULL,
            claimed_at TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_source_path_hash ON source_path(hash);
        CREATE INDEX IF NOT EXISTS idx_queue_item_state ON queue_item(queue, state, id);
        "#,
    )
}
