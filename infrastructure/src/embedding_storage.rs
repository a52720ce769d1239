use anyhow::anyhow;
use domain::models::IndexedDocument;
use rusqlite::{params, Connection, Result as SqlResult};
use shared::types::Result;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite-backed store of embedded chunks and per-source fingerprints.
pub struct EmbeddingStorage {
    conn: Mutex<Connection>,
}

impl EmbeddingStorage {
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        if let Some(parent) = db_path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(db_path)?;
        Self::setup_db(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::setup_db(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn setup_db(conn: &Connection) -> SqlResult<()> {
        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            PRAGMA cache_size=-64000;
            PRAGMA temp_store=MEMORY;
            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                vector BLOB NOT NULL,
                content TEXT NOT NULL,
                source TEXT NOT NULL DEFAULT ''
            );
            CREATE INDEX IF NOT EXISTS idx_documents_source ON documents(source);
            CREATE TABLE IF NOT EXISTS source_meta (
                source TEXT PRIMARY KEY,
                hash TEXT NOT NULL
            );
        ",
        )
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("embedding storage lock poisoned"))
    }

    pub fn insert_documents(&self, documents: &[IndexedDocument]) -> Result<()> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO documents (id, vector, content, source) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for document in documents {
                let vector_bytes = serde_json::to_vec(&document.vector)?;
                stmt.execute(params![
                    document.id,
                    vector_bytes,
                    document.content,
                    document.source
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// All stored documents in insertion order.
    pub fn get_all_documents(&self) -> Result<Vec<IndexedDocument>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT id, vector, content, source FROM documents ORDER BY rowid")?;
        let mut rows = stmt.query([])?;
        let mut documents = Vec::new();
        while let Some(row) = rows.next()? {
            let vector_bytes: Vec<u8> = row.get(1)?;
            documents.push(IndexedDocument {
                id: row.get(0)?,
                vector: serde_json::from_slice(&vector_bytes)?,
                content: row.get(2)?,
                source: row.get(3)?,
            });
        }
        Ok(documents)
    }

    pub fn get_source_hash(&self, source: &str) -> Result<Option<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT hash FROM source_meta WHERE source = ?1")?;
        let mut rows = stmt.query([source])?;
        if let Some(row) = rows.next()? {
            let hash: String = row.get(0)?;
            return Ok(Some(hash));
        }
        Ok(None)
    }

    pub fn upsert_source_hash(&self, source: &str, hash: &str) -> Result<()> {
        self.lock()?.execute(
            "INSERT OR REPLACE INTO source_meta (source, hash) VALUES (?1, ?2)",
            params![source, hash],
        )?;
        Ok(())
    }

    pub fn delete_documents_for_source(&self, source: &str) -> Result<()> {
        self.lock()?
            .execute("DELETE FROM documents WHERE source = ?1", params![source])?;
        Ok(())
    }

    /// Drop every document and fingerprint.
    pub fn clear(&self) -> Result<()> {
        self.lock()?
            .execute_batch("DELETE FROM documents; DELETE FROM source_meta;")?;
        Ok(())
    }

    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .lock()?
            .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}
