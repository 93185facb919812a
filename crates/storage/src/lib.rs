//! Embedded SQLite persistence for the crawl graph.
//!
//! Two tables (`nodes`, `edges`) plus a small `metadata` key-value table.
//! `nodes.normalized_url` is the dedup key; `edges.target_url` is stored
//! *normalized* too (not the raw extracted string), so back-fill resolves
//! against the same key space node dedup uses -- two pages linking to the
//! same logical resource with different surface forms still converge.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use voidcrawler_core::{Edge, Node};

/// Fields needed to persist a freshly crawled node. `id` is assigned by
/// the store, not supplied by the caller.
#[derive(Debug, Clone)]
pub struct NewNode {
    pub url: String,
    pub normalized_url: String,
    pub domain: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub favicon: Option<String>,
    pub thumbnail: Option<Vec<u8>>,
    pub position_x: f64,
    pub position_y: f64,
    pub position_z: f64,
    pub status_code: Option<u16>,
    pub is_alive: bool,
    pub depth: u32,
}

#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    /// Open (or create) the SQLite database at `path`. WAL mode lets
    /// concurrent `processUrl` tasks read while another is writing.
    pub async fn open(path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(16)
            .connect_with(options)
            .await
            .context("failed to open crawl database")?;

        tracing::info!(path, "connected to sqlite");
        let storage = Self { pool };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// An in-memory store, used by tests and by callers that don't need
    /// the graph to survive the process.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let storage = Self { pool };
        storage.run_migrations().await?;
        Ok(storage)
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::raw_sql(include_str!("../migrations/001_init.sql"))
            .execute(&self.pool)
            .await
            .context("failed to run storage migrations")?;
        tracing::info!("migrations complete");

        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO metadata (key, value) VALUES ('version', '1')
             ON CONFLICT(key) DO NOTHING",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "INSERT INTO metadata (key, value) VALUES ('created_at', ?)
             ON CONFLICT(key) DO NOTHING",
        )
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert a node, assigning it a fresh id. Two concurrent callers
    /// racing on the same `normalized_url` converge on a single id: the
    /// loser's `INSERT ... ON CONFLICT DO NOTHING` affects no rows, and
    /// it falls back to looking up the winner's id instead of erroring.
    pub async fn insert_node(&self, node: NewNode) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            "INSERT INTO nodes (
                id, url, normalized_url, domain, title, description, favicon, thumbnail,
                position_x, position_y, position_z, status_code, is_alive, depth,
                crawled_at, last_visited, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(normalized_url) DO NOTHING",
        )
        .bind(&id)
        .bind(&node.url)
        .bind(&node.normalized_url)
        .bind(&node.domain)
        .bind(&node.title)
        .bind(&node.description)
        .bind(&node.favicon)
        .bind(&node.thumbnail)
        .bind(node.position_x)
        .bind(node.position_y)
        .bind(node.position_z)
        .bind(node.status_code.map(|s| s as i64))
        .bind(node.is_alive)
        .bind(node.depth as i64)
        .bind(&now)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(id);
        }

        let existing: (String,) =
            sqlx::query_as("SELECT id FROM nodes WHERE normalized_url = ?")
                .bind(&node.normalized_url)
                .fetch_one(&self.pool)
                .await
                .context("insert raced but no existing row was found")?;
        Ok(existing.0)
    }

    pub async fn has_url(&self, normalized_url: &str) -> Result<bool> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM nodes WHERE normalized_url = ?")
            .bind(normalized_url)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0 > 0)
    }

    /// Append-only: multiple edges with identical `(source_id,
    /// target_url, target_id)` triples are permitted, since the page
    /// graph is a multigraph by construction (a page can link to the
    /// same URL more than once).
    pub async fn insert_edge(
        &self,
        source_id: &str,
        target_url: &str,
        target_id: Option<&str>,
    ) -> Result<i64> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "INSERT INTO edges (source_id, target_url, target_id, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(source_id)
        .bind(target_url)
        .bind(target_id)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Resolve every forward-reference to `target_url` (normalized) now
    /// that it has been crawled: set `target_id` on every matching edge
    /// that doesn't already have one.
    pub async fn update_edge_targets(&self, target_url: &str, target_id: &str) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE edges SET target_id = ? WHERE target_url = ? AND target_id IS NULL",
        )
        .bind(target_id)
        .bind(target_url)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn get_node(&self, id: &str) -> Result<Option<Node>> {
        let row = sqlx::query("SELECT * FROM nodes WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| row_to_node(&r)))
    }

    pub async fn get_node_by_url(&self, url: &str) -> Result<Option<Node>> {
        let row = sqlx::query("SELECT * FROM nodes WHERE url = ?")
            .bind(url)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| row_to_node(&r)))
    }

    pub async fn get_node_by_normalized_url(&self, normalized_url: &str) -> Result<Option<Node>> {
        let row = sqlx::query("SELECT * FROM nodes WHERE normalized_url = ?")
            .bind(normalized_url)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| row_to_node(&r)))
    }

    pub async fn get_all_nodes(&self) -> Result<Vec<Node>> {
        let rows = sqlx::query("SELECT * FROM nodes ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(row_to_node).collect())
    }

    pub async fn get_nodes_by_domain(&self, domain: &str) -> Result<Vec<Node>> {
        let rows = sqlx::query("SELECT * FROM nodes WHERE domain = ? ORDER BY created_at")
            .bind(domain)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(row_to_node).collect())
    }

    pub async fn get_outbound_edges(&self, node_id: &str) -> Result<Vec<Edge>> {
        let rows = sqlx::query("SELECT * FROM edges WHERE source_id = ? ORDER BY id")
            .bind(node_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(row_to_edge).collect())
    }

    pub async fn get_inbound_edges(&self, node_id: &str) -> Result<Vec<Edge>> {
        let rows = sqlx::query("SELECT * FROM edges WHERE target_id = ? ORDER BY id")
            .bind(node_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(row_to_edge).collect())
    }

    pub async fn get_all_edges(&self) -> Result<Vec<Edge>> {
        let rows = sqlx::query("SELECT * FROM edges ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(row_to_edge).collect())
    }

    pub async fn node_count(&self) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM nodes")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }

    pub async fn edge_count(&self) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM edges")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }

    /// Update a node's layout position. Written by an external layout
    /// process after the crawl; the crawler itself only writes the
    /// random initial position at insert time.
    pub async fn update_position(&self, id: &str, x: f64, y: f64, z: f64) -> Result<()> {
        sqlx::query("UPDATE nodes SET position_x = ?, position_y = ?, position_z = ? WHERE id = ?")
            .bind(x)
            .bind(y)
            .bind(z)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn touch_last_visited(&self, id: &str, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE nodes SET last_visited = ? WHERE id = ?")
            .bind(at.to_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM metadata WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(v,)| v))
    }

    pub async fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO metadata (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn row_to_node(row: &sqlx::sqlite::SqliteRow) -> Node {
    let parse_ts = |s: String| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    };

    Node {
        id: row.get("id"),
        url: row.get("url"),
        normalized_url: row.get("normalized_url"),
        domain: row.get("domain"),
        title: row.get("title"),
        description: row.get("description"),
        favicon: row.get("favicon"),
        thumbnail: row.get("thumbnail"),
        position_x: row.get("position_x"),
        position_y: row.get("position_y"),
        position_z: row.get("position_z"),
        status_code: row.get::<Option<i64>, _>("status_code").map(|s| s as u16),
        is_alive: row.get("is_alive"),
        depth: row.get::<i64, _>("depth") as u32,
        crawled_at: parse_ts(row.get("crawled_at")),
        last_visited: parse_ts(row.get("last_visited")),
        created_at: parse_ts(row.get("created_at")),
    }
}

fn row_to_edge(row: &sqlx::sqlite::SqliteRow) -> Edge {
    Edge {
        id: row.get("id"),
        source_id: row.get("source_id"),
        target_url: row.get("target_url"),
        target_id: row.get("target_id"),
    }
}
