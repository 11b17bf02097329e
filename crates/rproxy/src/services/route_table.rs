//! Route Table: the persisted host -> backend bindings the proxy engine
//! looks up on every request.
//!
//! The production adapter is backed by SQLite (`rusqlite`, bundled), one
//! `routes` table keyed by host. A [`RouteTable`] trait abstracts the store
//! so the engine's tests run against an in-memory implementation without
//! touching the file system.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;

use crate::models::route::Route;

/// Storage interface for host -> backend bindings.
///
/// Implementors must be safe to share behind an `Arc` across the listener
/// tasks that read it on every request and the supervisor that reloads it
/// on SIGHUP.
pub trait RouteTable: Send + Sync {
    fn get(&self, host: &str) -> Option<Route>;
    fn upsert(&self, route: Route) -> Result<(), String>;
    fn remove(&self, host: &str) -> Result<(), String>;
    fn all(&self) -> Vec<Route>;
}

/// SQLite-backed [`RouteTable`], the production implementation.
pub struct SqliteRouteTable {
    conn: Mutex<Connection>,
}

impl SqliteRouteTable {
    /// Opens (creating if necessary) the route database at `path` and
    /// ensures its schema exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, String> {
        let conn = Connection::open(path).map_err(|e| format!("cannot open route db: {}", e))?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS routes (
                host TEXT PRIMARY KEY,
                backend TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| format!("cannot create routes table: {}", e))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens an in-memory SQLite database with the routes schema, for tests
    /// that want to exercise the real SQL path without a file on disk.
    pub fn open_in_memory() -> Result<Self, String> {
        Self::open(":memory:")
    }
}

impl RouteTable for SqliteRouteTable {
    fn get(&self, host: &str) -> Option<Route> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT host, backend FROM routes WHERE host = ?1",
            [host],
            |row| {
                Ok(Route {
                    host: row.get(0)?,
                    backend: row.get(1)?,
                })
            },
        )
        .ok()
    }

    fn upsert(&self, route: Route) -> Result<(), String> {
        let conn = self.conn.lock().unwrap();
        let now = chrono::Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO routes (host, backend, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)
             ON CONFLICT(host) DO UPDATE SET backend = excluded.backend, updated_at = excluded.updated_at",
            rusqlite::params![route.host, route.backend, now],
        )
        .map_err(|e| format!("cannot upsert route: {}", e))?;
        Ok(())
    }

    fn remove(&self, host: &str) -> Result<(), String> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM routes WHERE host = ?1", [host])
            .map_err(|e| format!("cannot remove route: {}", e))?;
        Ok(())
    }

    fn all(&self) -> Vec<Route> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = match conn.prepare("SELECT host, backend FROM routes") {
            Ok(stmt) => stmt,
            Err(_) => return Vec::new(),
        };
        let rows = stmt.query_map([], |row| {
            Ok(Route {
                host: row.get(0)?,
                backend: row.get(1)?,
            })
        });
        match rows {
            Ok(rows) => rows.filter_map(Result::ok).collect(),
            Err(_) => Vec::new(),
        }
    }
}

/// In-memory [`RouteTable`] used by unit and integration tests.
#[derive(Default)]
pub struct InMemoryRouteTable {
    routes: Mutex<HashMap<String, Route>>,
}

impl InMemoryRouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_routes(routes: impl IntoIterator<Item = Route>) -> Self {
        let table = Self::new();
        for route in routes {
            table.routes.lock().unwrap().insert(route.host.clone(), route);
        }
        table
    }
}

impl RouteTable for InMemoryRouteTable {
    fn get(&self, host: &str) -> Option<Route> {
        self.routes.lock().unwrap().get(host).cloned()
    }

    fn upsert(&self, route: Route) -> Result<(), String> {
        self.routes.lock().unwrap().insert(route.host.clone(), route);
        Ok(())
    }

    fn remove(&self, host: &str) -> Result<(), String> {
        self.routes.lock().unwrap().remove(host);
        Ok(())
    }

    fn all(&self) -> Vec<Route> {
        self.routes.lock().unwrap().values().cloned().collect()
    }
}

/// Computes the backends added and removed between two route snapshots, used
/// by the Listener Supervisor's reload to diff which backends need a health
/// checker started or stopped.
pub fn diff_backends(before: &[Route], after: &[Route]) -> (Vec<String>, Vec<String>) {
    let before_set: std::collections::HashSet<&str> =
        before.iter().map(|r| r.backend.as_str()).collect();
    let after_set: std::collections::HashSet<&str> =
        after.iter().map(|r| r.backend.as_str()).collect();

    let added = after_set
        .difference(&before_set)
        .map(|s| s.to_string())
        .collect();
    let removed = before_set
        .difference(&after_set)
        .map(|s| s.to_string())
        .collect();
    (added, removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_round_trip() {
        let table = InMemoryRouteTable::new();
        table
            .upsert(Route::new("a.test", "http://127.0.0.1:9001"))
            .unwrap();
        assert_eq!(
            table.get("a.test").unwrap().backend,
            "http://127.0.0.1:9001"
        );
        table.remove("a.test").unwrap();
        assert!(table.get("a.test").is_none());
    }

    #[test]
    fn sqlite_round_trip() {
        let table = SqliteRouteTable::open_in_memory().unwrap();
        table
            .upsert(Route::new("b.test", "http://127.0.0.1:9002"))
            .unwrap();
        assert_eq!(
            table.get("b.test").unwrap().backend,
            "http://127.0.0.1:9002"
        );
        assert_eq!(table.all().len(), 1);
    }

    #[test]
    fn sqlite_upsert_is_last_writer_wins() {
        let table = SqliteRouteTable::open_in_memory().unwrap();
        table.upsert(Route::new("c.test", "http://backend-1")).unwrap();
        table.upsert(Route::new("c.test", "http://backend-2")).unwrap();
        assert_eq!(table.get("c.test").unwrap().backend, "http://backend-2");
        assert_eq!(table.all().len(), 1);
    }

    #[test]
    fn diff_backends_reports_added_and_removed() {
        let before = vec![Route::new("a.test", "http://b1"), Route::new("b.test", "http://b2")];
        let after = vec![Route::new("a.test", "http://b1"), Route::new("c.test", "http://b3")];
        let (added, removed) = diff_backends(&before, &after);
        assert_eq!(added, vec!["http://b3".to_string()]);
        assert_eq!(removed, vec!["http://b2".to_string()]);
    }
}
