//! Cache partition operations.
//!
//! A partition is a named map from request identity to stored response,
//! mirroring the browser Cache API (`caches.open`, `cache.put`,
//! `cache.match`, `caches.keys`, `caches.delete`). Storage rules:
//!
//! - only GET requests are stored
//! - only 2xx responses are stored
//! - within a set of sibling partitions (one version's static and dynamic
//!   caches) a request identity lives in at most one; a put moves it.
//!   Partitions outside the set are never touched.

use super::connection::CacheDb;
use super::hash::compute_request_key;
use crate::{Error, Request, Response};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, OptionalExtension};

/// A stored response together with where and when it was stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedEntry {
    pub partition: String,
    pub method: String,
    pub url: String,
    pub response: Response,
    pub stored_at: String,
}

/// One insert prepared for the entries table.
struct EntryRow {
    key_hash: String,
    method: String,
    url: String,
    status: i64,
    status_text: String,
    headers_json: String,
    body: Bytes,
}

impl EntryRow {
    fn build(request: &Request, response: &Response) -> Result<Self, Error> {
        if !request.is_get() {
            return Err(Error::UnsupportedMethod(request.method.clone()));
        }
        if !response.is_success() {
            return Err(Error::InvalidInput(format!(
                "refusing to cache status {} for {}",
                response.status, request.url
            )));
        }

        let mut url = request.url.clone();
        url.set_fragment(None);

        Ok(Self {
            key_hash: compute_request_key("GET", &url),
            method: "GET".into(),
            url: url.to_string(),
            status: i64::from(response.status),
            status_text: response.status_text.clone(),
            headers_json: serde_json::to_string(&response.headers)?,
            body: response.body.clone(),
        })
    }

    /// Write the row, evicting the same identity from the sibling partitions.
    fn write(
        &self, conn: &rusqlite::Connection, partition: &str, siblings: &[String], stored_at: &str,
    ) -> Result<(), Error> {
        for sibling in siblings.iter().filter(|s| s.as_str() != partition) {
            conn.execute(
                "DELETE FROM entries WHERE key_hash = ?1 AND partition = ?2",
                params![&self.key_hash, sibling],
            )?;
        }
        conn.execute(
            "INSERT INTO entries (
                partition, key_hash, method, url, status, status_text, headers_json, body, stored_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(partition, key_hash) DO UPDATE SET
                method = excluded.method,
                url = excluded.url,
                status = excluded.status,
                status_text = excluded.status_text,
                headers_json = excluded.headers_json,
                body = excluded.body,
                stored_at = excluded.stored_at",
            params![
                partition,
                &self.key_hash,
                &self.method,
                &self.url,
                self.status,
                &self.status_text,
                &self.headers_json,
                &self.body[..],
                stored_at,
            ],
        )?;
        Ok(())
    }
}

fn partition_exists(conn: &rusqlite::Connection, name: &str) -> Result<bool, Error> {
    let exists: bool =
        conn.query_row("SELECT EXISTS(SELECT 1 FROM partitions WHERE name = ?1)", params![name], |row| row.get(0))?;
    Ok(exists)
}

fn create_partition(conn: &rusqlite::Connection, name: &str) -> Result<(), Error> {
    conn.execute(
        "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)",
        params![name, chrono::Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

fn read_entry(conn: &rusqlite::Connection, partition: &str, key_hash: &str) -> Result<Option<CachedEntry>, Error> {
    let row = conn
        .query_row(
            "SELECT method, url, status, status_text, headers_json, body, stored_at
             FROM entries WHERE partition = ?1 AND key_hash = ?2",
            params![partition, key_hash],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, Vec<u8>>(5)?,
                    row.get::<_, String>(6)?,
                ))
            },
        )
        .optional()?;

    let Some((method, url, status, status_text, headers_json, body, stored_at)) = row else {
        return Ok(None);
    };

    let status = u16::try_from(status).map_err(|_| Error::Serialization(format!("stored status out of range: {status}")))?;
    let response = Response { status, status_text, headers: serde_json::from_str(&headers_json)?, body: Bytes::from(body) };

    Ok(Some(CachedEntry { partition: partition.to_string(), method, url, response, stored_at }))
}

impl CacheDb {
    /// Create the partition if it does not exist yet (`caches.open`).
    pub async fn open_partition(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> { create_partition(conn, &name) })
            .await
            .map_err(Error::from)
    }

    /// Whether a partition with this name exists (`caches.has`).
    pub async fn has_partition(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> { partition_exists(conn, &name) })
            .await
            .map_err(Error::from)
    }

    /// All partition names in creation order (`caches.keys`).
    pub async fn partition_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM partitions ORDER BY created_at ASC, name ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a partition and every entry in it (`caches.delete`).
    ///
    /// Returns false if the partition did not exist.
    pub async fn delete_partition(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM partitions WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Store a response under the request identity (`cache.put`).
    ///
    /// The partition must already be open. Any copy of the same identity in
    /// one of `siblings` is removed in the same transaction; pass an empty
    /// slice for a plain put.
    pub async fn put_entry(
        &self, partition: &str, siblings: &[String], request: &Request, response: &Response,
    ) -> Result<(), Error> {
        let row = EntryRow::build(request, response)?;
        let partition = partition.to_string();
        let siblings = siblings.to_vec();
        let stored_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                if !partition_exists(&tx, &partition)? {
                    return Err(Error::PartitionNotFound(partition));
                }
                row.write(&tx, &partition, &siblings, &stored_at)?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look a request up in one partition (`cache.match`).
    pub async fn match_entry(&self, partition: &str, request: &Request) -> Result<Option<Response>, Error> {
        let entry = self.match_in(&[partition.to_string()], request).await?;
        Ok(entry.map(|e| e.response))
    }

    /// Look a request up in the given partitions, first hit wins.
    ///
    /// Non-GET requests never match.
    pub async fn match_in(&self, partitions: &[String], request: &Request) -> Result<Option<CachedEntry>, Error> {
        if !request.is_get() || partitions.is_empty() {
            return Ok(None);
        }

        let key_hash = compute_request_key("GET", &request.url);
        let partitions = partitions.to_vec();
        self.conn
            .call(move |conn| -> Result<Option<CachedEntry>, Error> {
                for partition in &partitions {
                    if let Some(entry) = read_entry(conn, partition, &key_hash)? {
                        return Ok(Some(entry));
                    }
                }
                Ok(None)
            })
            .await
            .map_err(Error::from)
    }

    /// Remove one entry (`cache.delete`). Returns false if it was absent.
    pub async fn delete_entry(&self, partition: &str, request: &Request) -> Result<bool, Error> {
        let key_hash = compute_request_key(&request.method, &request.url);
        let partition = partition.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute(
                    "DELETE FROM entries WHERE partition = ?1 AND key_hash = ?2",
                    params![partition, key_hash],
                )?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// URLs stored in a partition, oldest first (`cache.keys`).
    pub async fn entry_urls(&self, partition: &str) -> Result<Vec<String>, Error> {
        let partition = partition.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt =
                    conn.prepare("SELECT url FROM entries WHERE partition = ?1 ORDER BY stored_at ASC, url ASC")?;
                let urls = stmt
                    .query_map(params![partition], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(urls)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in a partition.
    pub async fn entry_count(&self, partition: &str) -> Result<u64, Error> {
        let partition = partition.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE partition = ?1", params![partition], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Create and fill several partitions in a single transaction.
    ///
    /// Either every partition and entry is written or nothing is: an invalid
    /// pair (non-GET, non-2xx) aborts the whole batch before commit. The
    /// batch partitions are siblings of each other for the one-owner rule.
    /// Returns the number of entries written.
    pub async fn populate_partitions(&self, batches: Vec<(String, Vec<(Request, Response)>)>) -> Result<u64, Error> {
        let mut prepared = Vec::with_capacity(batches.len());
        for (partition, pairs) in batches {
            let rows = pairs
                .iter()
                .map(|(request, response)| EntryRow::build(request, response))
                .collect::<Result<Vec<_>, _>>()?;
            prepared.push((partition, rows));
        }

        let siblings: Vec<String> = prepared.iter().map(|(partition, _)| partition.clone()).collect();
        let stored_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let tx = conn.transaction()?;
                let mut written = 0u64;
                for (partition, rows) in &prepared {
                    create_partition(&tx, partition)?;
                    for row in rows {
                        row.write(&tx, partition, &siblings, &stored_at)?;
                        written += 1;
                    }
                }
                tx.commit()?;
                Ok(written)
            })
            .await
            .map_err(Error::from)
    }
}
