//! Entry operations on a single store.
//!
//! Provides lookup, overwrite and batch writes of response snapshots keyed
//! by request.

use super::connection::CacheDb;
use super::hash::compute_request_key;
use crate::Error;
use crate::http::{Request, Response, ResponseType};
use bytes::Bytes;
use tokio_rusqlite::{params, rusqlite};
use url::Url;

/// Handle to one named store.
#[derive(Clone, Debug)]
pub struct Store {
    db: CacheDb,
    name: String,
}

/// Row data before decoding into a [`Response`].
struct RawEntry {
    status: i64,
    status_text: String,
    headers_json: String,
    body: Vec<u8>,
    response_type: String,
    response_url: Option<String>,
}

impl RawEntry {
    fn decode(self) -> Result<Response, Error> {
        let status =
            u16::try_from(self.status).map_err(|_| Error::Corrupt(format!("status out of range: {}", self.status)))?;
        let headers: Vec<(String, String)> = serde_json::from_str(&self.headers_json)?;
        let response_type: ResponseType = self.response_type.parse().map_err(Error::Corrupt)?;
        let url = self
            .response_url
            .map(|u| Url::parse(&u).map_err(|e| Error::Corrupt(e.to_string())))
            .transpose()?;

        Ok(Response {
            status,
            status_text: self.status_text,
            headers,
            body: Bytes::from(self.body),
            response_type,
            url,
        })
    }
}

/// Insert or overwrite one entry; the store row is created if missing.
fn write_entry(
    conn: &rusqlite::Connection, store: &str, request: &Request, response: &Response, now: &str,
) -> Result<(), Error> {
    let key = compute_request_key(request.method(), request.url().as_str());
    let headers_json = serde_json::to_string(&response.headers)?;

    conn.execute("INSERT OR IGNORE INTO stores (name, created_at) VALUES (?1, ?2)", params![store, now])?;
    conn.execute(
        "INSERT INTO entries (
            store_name, request_key, method, url, status, status_text,
            headers_json, body, response_type, response_url, stored_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        ON CONFLICT(store_name, request_key) DO UPDATE SET
            method = excluded.method,
            url = excluded.url,
            status = excluded.status,
            status_text = excluded.status_text,
            headers_json = excluded.headers_json,
            body = excluded.body,
            response_type = excluded.response_type,
            response_url = excluded.response_url,
            stored_at = excluded.stored_at",
        params![
            store,
            key,
            request.method(),
            request.url().as_str(),
            response.status as i64,
            &response.status_text,
            headers_json,
            &response.body[..],
            response.response_type.as_str(),
            response.url.as_ref().map(|u| u.as_str()),
            now,
        ],
    )?;
    Ok(())
}

fn ensure_get(request: &Request) -> Result<(), Error> {
    if request.is_get() { Ok(()) } else { Err(Error::UnsupportedMethod(request.method().to_string())) }
}

impl Store {
    pub(crate) fn new(db: CacheDb, name: &str) -> Self {
        Self { db, name: name.to_string() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up the stored response for a request.
    ///
    /// Non-GET requests never match.
    pub async fn match_request(&self, request: &Request) -> Result<Option<Response>, Error> {
        if !request.is_get() {
            return Ok(None);
        }

        let store = self.name.clone();
        let key = compute_request_key(request.method(), request.url().as_str());
        self.db
            .conn
            .call(move |conn| -> Result<Option<Response>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT status, status_text, headers_json, body, response_type, response_url
                    FROM entries WHERE store_name = ?1 AND request_key = ?2",
                )?;

                let result = stmt.query_row(params![store, key], |row| {
                    Ok(RawEntry {
                        status: row.get(0)?,
                        status_text: row.get(1)?,
                        headers_json: row.get(2)?,
                        body: row.get(3)?,
                        response_type: row.get(4)?,
                        response_url: row.get(5)?,
                    })
                });

                match result {
                    Ok(raw) => raw.decode().map(Some),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Store a response for a request, overwriting any previous entry.
    pub async fn put(&self, request: &Request, response: &Response) -> Result<(), Error> {
        ensure_get(request)?;

        let store = self.name.clone();
        let request = request.clone();
        let response = response.clone();
        let now = chrono::Utc::now().to_rfc3339();
        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                write_entry(&tx, &store, &request, &response, &now)?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Store every pair in one transaction: either all entries land or none do.
    ///
    /// Returns the number of entries written.
    pub async fn put_all(&self, pairs: Vec<(Request, Response)>) -> Result<usize, Error> {
        for (request, _) in &pairs {
            ensure_get(request)?;
        }

        let store = self.name.clone();
        let now = chrono::Utc::now().to_rfc3339();
        self.db
            .conn
            .call(move |conn| -> Result<usize, Error> {
                let tx = conn.transaction()?;
                for (request, response) in &pairs {
                    write_entry(&tx, &store, request, response, &now)?;
                }
                tx.commit()?;
                Ok(pairs.len())
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in the store.
    pub async fn len(&self) -> Result<usize, Error> {
        let store = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<usize, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE store_name = ?1", params![store], |row| {
                        row.get(0)
                    })?;
                Ok(count as usize)
            })
            .await
            .map_err(Error::from)
    }

    pub async fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.len().await? == 0)
    }
}
