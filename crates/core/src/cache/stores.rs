//! Store-level operations: open, enumerate, delete.

use super::connection::CacheDb;
use super::entries::Store;
use crate::Error;
use tokio_rusqlite::params;

impl CacheDb {
    /// Open the named store, creating it if absent.
    pub async fn open_store(&self, name: &str) -> Result<Store, Error> {
        let owned = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO stores (name, created_at) VALUES (?1, ?2)",
                    params![owned, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        Ok(self.store(name))
    }

    /// Handle to the named store without creating it.
    ///
    /// Reads through the handle miss until something is written; the first
    /// write creates the store.
    pub fn store(&self, name: &str) -> Store {
        Store::new(self.clone(), name)
    }

    /// Whether a store with this name exists.
    pub async fn has_store(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn
                    .query_row("SELECT EXISTS(SELECT 1 FROM stores WHERE name = ?1)", params![name], |row| {
                        row.get(0)
                    })
                    .map_err(Error::from)?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// Names of every store, in creation order.
    pub async fn store_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM stores ORDER BY rowid")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a store and all of its entries.
    ///
    /// Returns false if no such store existed.
    pub async fn delete_store(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM entries WHERE store_name = ?1", params![name])?;
                let deleted = tx.execute("DELETE FROM stores WHERE name = ?1", params![name])?;
                tx.commit()?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_store_creates_once() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_store("v1").await.unwrap();
        db.open_store("v1").await.unwrap();

        assert_eq!(db.store_names().await.unwrap(), vec!["v1".to_string()]);
        assert!(db.has_store("v1").await.unwrap());
    }

    #[tokio::test]
    async fn test_store_handle_is_lazy() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let _store = db.store("v1");
        assert!(!db.has_store("v1").await.unwrap());
        assert!(db.store_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_names_in_creation_order() {
        let db = CacheDb::open_in_memory().await.unwrap();
        for name in ["b", "a", "c"] {
            db.open_store(name).await.unwrap();
        }
        assert_eq!(db.store_names().await.unwrap(), vec!["b", "a", "c"]);
    }

    #[tokio::test]
    async fn test_delete_store() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_store("v1").await.unwrap();
        db.open_store("v2").await.unwrap();

        assert!(db.delete_store("v1").await.unwrap());
        assert!(!db.delete_store("v1").await.unwrap());
        assert_eq!(db.store_names().await.unwrap(), vec!["v2".to_string()]);
    }
}
