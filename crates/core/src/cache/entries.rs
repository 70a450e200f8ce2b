//! Cache entry operations.
//!
//! Entries are upserted per (generation, request identity); a second put to
//! the same key replaces the first. Lookups either compare the full identity
//! or the identity with its query string removed.

use super::connection::CacheDb;
use super::key::{MatchMode, RequestKey};
use crate::{CachedResponse, Error, ResponseKind};
use bytes::Bytes;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::OptionalExtension;
use url::Url;

/// An entry as listed from a generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    pub request_key: String,
    pub stored_at: String,
    pub response: CachedResponse,
}

/// Column values as read from SQLite, before decoding.
struct EntryRow {
    request_key: String,
    url: String,
    status_code: i64,
    status_text: String,
    kind: String,
    headers_json: String,
    body: Vec<u8>,
    stored_at: String,
}

impl EntryRow {
    const COLUMNS: &'static str =
        "request_key, url, status_code, status_text, kind, headers_json, body, stored_at";

    fn from_row(row: &tokio_rusqlite::rusqlite::Row<'_>) -> tokio_rusqlite::rusqlite::Result<Self> {
        Ok(Self {
            request_key: row.get(0)?,
            url: row.get(1)?,
            status_code: row.get(2)?,
            status_text: row.get(3)?,
            kind: row.get(4)?,
            headers_json: row.get(5)?,
            body: row.get(6)?,
            stored_at: row.get(7)?,
        })
    }

    fn decode(self) -> Result<StoredEntry, Error> {
        let url = Url::parse(&self.url).map_err(|e| Error::CorruptEntry(format!("{}: {e}", self.url)))?;
        let status = u16::try_from(self.status_code)
            .map_err(|_| Error::CorruptEntry(format!("{}: status {}", self.url, self.status_code)))?;
        let kind: ResponseKind = self.kind.parse().map_err(Error::CorruptEntry)?;
        let headers: Vec<(String, String)> = serde_json::from_str(&self.headers_json)
            .map_err(|e| Error::CorruptEntry(format!("{}: headers: {e}", self.url)))?;

        Ok(StoredEntry {
            request_key: self.request_key,
            stored_at: self.stored_at,
            response: CachedResponse {
                url,
                status,
                status_text: self.status_text,
                headers,
                body: Bytes::from(self.body),
                kind,
            },
        })
    }
}

impl CacheDb {
    /// Store a response under a request identity.
    ///
    /// Overwrites any previous entry for the same identity in the same
    /// generation.
    ///
    /// # Errors
    ///
    /// Returns `Error::GenerationMissing` if the generation has not been
    /// opened (or was deleted concurrently).
    pub async fn put_entry(&self, generation: &str, key: &RequestKey, response: &CachedResponse) -> Result<(), Error> {
        let generation = generation.to_string();
        let request_key = key.full().to_string();
        let search_key = key.without_search().to_string();
        let url = response.url.to_string();
        let status = i64::from(response.status);
        let status_text = response.status_text.clone();
        let kind = response.kind.as_str();
        let headers_json = serde_json::to_string(&response.headers)
            .map_err(|e| Error::InvalidInput(format!("failed to encode headers: {e}")))?;
        let body = response.body.clone();
        let stored_at = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                let exists: bool = tx.query_row(
                    "SELECT EXISTS(SELECT 1 FROM generations WHERE name = ?1)",
                    params![generation],
                    |row| row.get(0),
                )?;
                if !exists {
                    return Err(Error::GenerationMissing(generation));
                }

                tx.execute(
                    "INSERT INTO entries (
                        generation, request_key, search_key, url, status_code,
                        status_text, kind, headers_json, body, stored_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                    ON CONFLICT(generation, request_key) DO UPDATE SET
                        search_key = excluded.search_key,
                        url = excluded.url,
                        status_code = excluded.status_code,
                        status_text = excluded.status_text,
                        kind = excluded.kind,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                    params![
                        generation,
                        request_key,
                        search_key,
                        url,
                        status,
                        status_text,
                        kind,
                        headers_json,
                        body.as_ref(),
                        stored_at,
                    ],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up a stored response.
    ///
    /// Under `MatchMode::IgnoreSearch` several stored identities can share
    /// the same query-less form; the earliest stored one wins.
    pub async fn match_entry(
        &self, generation: &str, key: &RequestKey, mode: MatchMode,
    ) -> Result<Option<CachedResponse>, Error> {
        let generation = generation.to_string();
        let lookup = key.lookup(mode).to_string();
        let sql = match mode {
            MatchMode::Exact => format!(
                "SELECT {} FROM entries WHERE generation = ?1 AND request_key = ?2",
                EntryRow::COLUMNS
            ),
            MatchMode::IgnoreSearch => format!(
                "SELECT {} FROM entries WHERE generation = ?1 AND search_key = ?2 ORDER BY rowid LIMIT 1",
                EntryRow::COLUMNS
            ),
        };

        let row = self
            .conn
            .call(move |conn| -> Result<Option<EntryRow>, Error> {
                let row = conn
                    .query_row(&sql, params![generation, lookup], EntryRow::from_row)
                    .optional()?;
                Ok(row)
            })
            .await
            .map_err(Error::from)?;

        row.map(|r| r.decode().map(|entry| entry.response)).transpose()
    }

    /// Number of entries in a generation.
    pub async fn entry_count(&self, generation: &str) -> Result<u64, Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM entries WHERE generation = ?1",
                    params![generation],
                    |row| row.get(0),
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// All entries of a generation in storage order.
    pub async fn list_entries(&self, generation: &str) -> Result<Vec<StoredEntry>, Error> {
        let generation = generation.to_string();
        let rows = self
            .conn
            .call(move |conn| -> Result<Vec<EntryRow>, Error> {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM entries WHERE generation = ?1 ORDER BY rowid",
                    EntryRow::COLUMNS
                ))?;
                let rows = stmt
                    .query_map(params![generation], EntryRow::from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)?;

        rows.into_iter().map(EntryRow::decode).collect()
    }
}
