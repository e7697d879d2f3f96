use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{AggregateStore, CorpusStore, Inserted, ParseStatus, StoreError};
use crate::content::ContentId;
use crate::db;
use crate::lexeme::{SourceSummary, Token};
use crate::profile::CodepointCounts;
use crate::tokenizer::Parsed;

/// Corpus of source files and parse results in SQLite
pub struct SqliteCorpus {
    conn: Connection,
}

impl SqliteCorpus {
    /// Open (or create) the corpus database at `path`
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Ok(Self {
            conn: db::open(path)?,
        })
    }

    /// Create a new in-memory corpus
    pub fn new_in_memory() -> Result<Self, StoreError> {
        Ok(Self {
            conn: db::open_in_memory()?,
        })
    }

    /// Remember a path at which this content was found.
    ///
    /// A path maps to a single content id; the same content may live at many
    /// paths.
    pub fn insert_source_path(&self, path: &str, id: &ContentId) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO source_path (path, hash) VALUES (?1, ?2)
             ON CONFLICT(path) DO UPDATE SET hash = excluded.hash",
            params![path, id.as_str()],
        )?;
        Ok(())
    }

    /// Paths recorded for a content id
    pub fn source_paths(&self, id: &ContentId) -> Result<Vec<String>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT path FROM source_path WHERE hash = ?1 ORDER BY path")?;
        let paths = stmt
            .query_map(params![id.as_str()], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(paths)
    }

    /// Read back a recorded parse result
    pub fn get_parsed(&self, id: &ContentId) -> Result<Option<Parsed>, StoreError> {
        let row: Option<(String, String)> = self
            .conn
            .query_row(
                "SELECT tokens, ast FROM parsed_source WHERE hash = ?1",
                params![id.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match row {
            Some((tokens, ast)) => Ok(Some(Parsed {
                tokens: serde_json::from_str(&tokens)?,
                ast: serde_json::from_str(&ast)?,
            })),
            None => Ok(None),
        }
    }

    pub fn get_source_summary(&self, id: &ContentId) -> Result<Option<SourceSummary>, StoreError> {
        let summary = self
            .conn
            .query_row(
                "SELECT sloc, n_tokens FROM source_summary WHERE hash = ?1",
                params![id.as_str()],
                |row| Ok(SourceSummary::new(row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        Ok(summary)
    }

    /// Get statistics
    pub fn stats(&self) -> Result<CorpusStats, StoreError> {
        let count = |table: &str| -> Result<u32, StoreError> {
            let sql = format!("SELECT COUNT(*) FROM {}", table);
            Ok(self.conn.query_row(&sql, [], |row| row.get(0))?)
        };

        Ok(CorpusStats {
            source_count: count("source_file")?,
            path_count: count("source_path")?,
            parsed_count: count("parsed_source")?,
            failed_count: count("failure")?,
        })
    }
}

impl CorpusStore for SqliteCorpus {
    fn insert_source(&self, source: &[u8]) -> Result<Inserted, StoreError> {
        let id = ContentId::of(source);
        let inserted = self.conn.execute(
            "INSERT INTO source_file (hash, source, added_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(hash) DO NOTHING",
            params![id.as_str(), source, Utc::now().to_rfc3339()],
        )?;
        Ok(Inserted {
            id,
            is_new: inserted > 0,
        })
    }

    fn get_source(&self, id: &ContentId) -> Result<Vec<u8>, StoreError> {
        self.conn
            .query_row(
                "SELECT source FROM source_file WHERE hash = ?1",
                params![id.as_str()],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| StoreError::MissingSource(id.clone()))
    }

    fn record_parse_success(
        &self,
        id: &ContentId,
        tokens: &[Token],
        ast: &serde_json::Value,
    ) -> Result<(), StoreError> {
        let tokens = serde_json::to_string(tokens)?;
        let ast = serde_json::to_string(ast)?;

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO parsed_source (hash, tokens, ast, parsed_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(hash) DO UPDATE SET tokens = excluded.tokens, ast = excluded.ast",
            params![id.as_str(), tokens, ast, Utc::now().to_rfc3339()],
        )?;
        tx.execute("DELETE FROM failure WHERE hash = ?1", params![id.as_str()])?;
        tx.commit()?;
        Ok(())
    }

    fn record_parse_failure(&self, id: &ContentId) -> Result<(), StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO failure (hash, failed_at) VALUES (?1, ?2)
             ON CONFLICT(hash) DO NOTHING",
            params![id.as_str(), Utc::now().to_rfc3339()],
        )?;
        tx.execute("DELETE FROM parsed_source WHERE hash = ?1", params![id.as_str()])?;
        tx.execute("DELETE FROM source_summary WHERE hash = ?1", params![id.as_str()])?;
        tx.commit()?;
        Ok(())
    }

    fn record_source_summary(
        &self,
        id: &ContentId,
        summary: SourceSummary,
    ) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO source_summary (hash, sloc, n_tokens) VALUES (?1, ?2, ?3)",
            params![id.as_str(), summary.sloc, summary.n_tokens],
        )?;
        Ok(())
    }

    fn parse_status(&self, id: &ContentId) -> Result<ParseStatus, StoreError> {
        let parsed: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM parsed_source WHERE hash = ?1)",
            params![id.as_str()],
            |row| row.get(0),
        )?;
        if parsed {
            return Ok(ParseStatus::Parsed);
        }

        let failed: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM failure WHERE hash = ?1)",
            params![id.as_str()],
            |row| row.get(0),
        )?;
        Ok(if failed {
            ParseStatus::Failed
        } else {
            ParseStatus::Unparsed
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusStats {
    pub source_count: u32,
    pub path_count: u32,
    pub parsed_count: u32,
    pub failed_count: u32,
}

/// Codepoint frequencies in SQLite.
///
/// Each increment is a single upsert, so concurrent workers on separate
/// connections never lose an update.
pub struct SqliteAggregate {
    conn: Connection,
}

impl SqliteAggregate {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Ok(Self {
            conn: db::open(path)?,
        })
    }

    pub fn new_in_memory() -> Result<Self, StoreError> {
        Ok(Self {
            conn: db::open_in_memory()?,
        })
    }
}

const INCREMENT_SQL: &str = "INSERT INTO codepoint_count (label, count) VALUES (?1, ?2)
     ON CONFLICT(label) DO UPDATE SET count = count + excluded.count
     RETURNING count";

/// Apply one increment inside `tx`.
///
/// SQLite turns an overflowing integer sum into a REAL, which then fails to
/// read back as `i64`; the caller's transaction rolls back with it.
fn apply_increment(tx: &Transaction<'_>, label: &str, by: u64) -> Result<u64, StoreError> {
    let delta = i64::try_from(by).map_err(|_| StoreError::CountOutOfRange(by))?;
    let mut stmt = tx.prepare_cached(INCREMENT_SQL)?;
    let count: i64 = stmt
        .query_row(params![label, delta], |row| row.get(0))
        .map_err(|err| match err {
            rusqlite::Error::InvalidColumnType(..) => StoreError::CountOutOfRange(by),
            err => err.into(),
        })?;
    u64::try_from(count).map_err(|_| StoreError::CountOutOfRange(by))
}

fn read_count(column: usize, count: i64) -> rusqlite::Result<u64> {
    u64::try_from(count).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(column, count))
}

impl AggregateStore for SqliteAggregate {
    fn increment(&self, label: &str, by: u64) -> Result<u64, StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        let count = apply_increment(&tx, label, by)?;
        tx.commit()?;
        Ok(count)
    }

    fn score(&self, label: &str) -> Result<Option<u64>, StoreError> {
        let count: Option<i64> = self
            .conn
            .query_row(
                "SELECT count FROM codepoint_count WHERE label = ?1",
                params![label],
                |row| row.get(0),
            )
            .optional()?;
        Ok(count.map(|count| read_count(0, count)).transpose()?)
    }

    /// All labels in one transaction
    fn merge(&self, counts: &CodepointCounts) -> Result<(), StoreError> {
        if counts.is_empty() {
            return Ok(());
        }

        let tx = self.conn.unchecked_transaction()?;
        for (label, count) in counts.iter() {
            apply_increment(&tx, label, count)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// The marker row and the increments commit together
    fn record_profile(
        &self,
        id: &ContentId,
        counts: &CodepointCounts,
    ) -> Result<bool, StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        let marked = tx.execute(
            "INSERT INTO profiled_source (hash, profiled_at) VALUES (?1, ?2)
             ON CONFLICT(hash) DO NOTHING",
            params![id.as_str(), Utc::now().to_rfc3339()],
        )?;
        if marked == 0 {
            return Ok(false);
        }

        for (label, count) in counts.iter() {
            apply_increment(&tx, label, count)?;
        }
        tx.commit()?;
        Ok(true)
    }

    fn top(&self, limit: usize) -> Result<Vec<(String, u64)>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT label, count FROM codepoint_count
             ORDER BY count DESC, label LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![i64::try_from(limit).unwrap_or(i64::MAX)], |row| {
                Ok((row.get::<_, String>(0)?, read_count(1, row.get(1)?)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
