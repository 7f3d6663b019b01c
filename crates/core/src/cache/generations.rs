//! Generation and entry operations on the SQLite cache.

use super::connection::CacheDb;
use super::snapshots::Snapshot;
use super::store::CacheStore;
use crate::Error;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

impl CacheDb {
    /// Create a generation if it does not already exist.
    pub async fn open_generation(&self, generation: &str) -> Result<(), Error> {
        let generation = generation.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO generations (name, created_at) VALUES (?1, ?2)",
                    params![generation, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or replace an entry in a generation.
    pub async fn upsert_entry(&self, generation: &str, snapshot: &Snapshot) -> Result<(), Error> {
        self.upsert_entries(generation, std::slice::from_ref(snapshot)).await
    }

    /// Insert or replace several entries in one transaction.
    ///
    /// Creates the generation row first, so storing into a generation that
    /// was pruned concurrently recreates it rather than failing. Either every
    /// snapshot is stored or none is.
    pub async fn upsert_entries(&self, generation: &str, snapshots: &[Snapshot]) -> Result<(), Error> {
        let generation = generation.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        let rows = snapshots
            .iter()
            .map(|s| {
                serde_json::to_string(&s.headers)
                    .map(|headers_json| (s.clone(), headers_json))
                    .map_err(|e| Error::CorruptSnapshot(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO generations (name, created_at) VALUES (?1, ?2)",
                    params![generation, now],
                )?;
                for (snapshot, headers_json) in &rows {
                    tx.execute(
                        "INSERT INTO entries (
                        generation, key_hash, method, url, status_code, headers_json, body, stored_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    ON CONFLICT(generation, key_hash) DO UPDATE SET
                        method = excluded.method,
                        url = excluded.url,
                        status_code = excluded.status_code,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                        params![
                            &generation,
                            &snapshot.hash,
                            &snapshot.method,
                            &snapshot.url,
                            snapshot.status_code,
                            headers_json,
                            &snapshot.body,
                            &snapshot.stored_at,
                        ],
                    )?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Get an entry by key hash within a generation.
    ///
    /// Returns None if either the generation or the entry is missing.
    pub async fn get_entry(&self, generation: &str, key_hash: &str) -> Result<Option<Snapshot>, Error> {
        let generation = generation.to_string();
        let key_hash = key_hash.to_string();
        self.conn
            .call(move |conn| -> Result<Option<Snapshot>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT key_hash, method, url, status_code, headers_json, body, stored_at
                FROM entries WHERE generation = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![generation, key_hash], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, u16>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, Vec<u8>>(5)?,
                        row.get::<_, String>(6)?,
                    ))
                });

                match result {
                    Ok((hash, method, url, status_code, headers_json, body, stored_at)) => {
                        let headers = serde_json::from_str(&headers_json)
                            .map_err(|e| Error::CorruptSnapshot(format!("{url}: {e}")))?;
                        Ok(Some(Snapshot { hash, method, url, status_code, headers, body, stored_at }))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a generation; its entries cascade.
    pub async fn delete_generation(&self, generation: &str) -> Result<bool, Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM generations WHERE name = ?1", params![generation])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// List generation names in creation order.
    pub async fn generation_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM generations ORDER BY rowid ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries stored in a generation.
    pub async fn entry_count(&self, generation: &str) -> Result<u64, Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE generation = ?1", params![generation], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[async_trait::async_trait]
impl CacheStore for CacheDb {
    async fn open(&self, generation: &str) -> Result<(), Error> {
        self.open_generation(generation).await
    }

    async fn lookup(&self, generation: &str, key: &str) -> Result<Option<Snapshot>, Error> {
        self.get_entry(generation, key).await
    }

    async fn put(&self, generation: &str, snapshot: &Snapshot) -> Result<(), Error> {
        self.upsert_entry(generation, snapshot).await
    }

    async fn put_all(&self, generation: &str, snapshots: &[Snapshot]) -> Result<(), Error> {
        self.upsert_entries(generation, snapshots).await
    }

    async fn delete(&self, generation: &str) -> Result<bool, Error> {
        self.delete_generation(generation).await
    }

    async fn names(&self) -> Result<Vec<String>, Error> {
        self.generation_names().await
    }
}
