//! Persistent page/edge graph store.
//!
//! SQLite with WAL journaling; pages are upserted by `(project_id, url)` and
//! edges by `(project_id, source, target)`. The write path runs after the
//! crawl loop has finished, so there is never a writer/crawler race on the
//! in-memory graph.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use futures::StreamExt;
use futures::stream;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::{Row, SqlitePool};

use crate::crawl::types::{DiscoveredPage, PageEdge};
use crate::fetcher::PageKind;
use crate::links::{LinkLocation, RevealedBy};

/// SQL schema for the discovery graph.
const SCHEMA_SQL: &str = r#"
-- Discovered pages, unique per project by canonical URL
CREATE TABLE IF NOT EXISTS pages (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL,
    url TEXT NOT NULL,
    title TEXT NOT NULL DEFAULT '',
    page_type TEXT NOT NULL DEFAULT 'content',
    requires_auth INTEGER NOT NULL DEFAULT 0,
    depth INTEGER NOT NULL DEFAULT 0,
    is_accessible INTEGER NOT NULL DEFAULT 1,
    thumbnail BLOB,
    selected INTEGER NOT NULL DEFAULT 0,
    discovered_at INTEGER NOT NULL,
    UNIQUE(project_id, url)
);

CREATE INDEX IF NOT EXISTS idx_pages_project ON pages(project_id);

-- Hyperlink edges between discovered pages
CREATE TABLE IF NOT EXISTS edges (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id TEXT NOT NULL,
    source_page_id TEXT NOT NULL,
    target_page_id TEXT NOT NULL,
    link_text TEXT NOT NULL DEFAULT '',
    link_type TEXT NOT NULL DEFAULT 'content',
    menu_level INTEGER NOT NULL DEFAULT 0,
    revealed_by TEXT NOT NULL DEFAULT 'none',
    parent_menu_text TEXT,
    UNIQUE(project_id, source_page_id, target_page_id)
);

CREATE INDEX IF NOT EXISTS idx_edges_project ON edges(project_id);
CREATE INDEX IF NOT EXISTS idx_edges_source ON edges(source_page_id);
"#;

/// SQLite caps bind variables around 999; stay well under it.
const LOOKUP_CHUNK: usize = 500;

/// Edge upsert concurrency.
const EDGE_BATCH: usize = 20;

/// Persisted page row. Thumbnails travel base64-encoded on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRecord {
    pub id: String,
    pub url: String,
    pub title: String,
    pub page_type: PageKind,
    pub requires_auth: bool,
    pub depth: u8,
    pub is_accessible: bool,
    pub selected: bool,
    #[serde(with = "b64_thumbnail", skip_serializing_if = "Option::is_none", default)]
    pub thumbnail: Option<Vec<u8>>,
}

/// JSON clients get thumbnails as base64 strings, not byte arrays.
mod b64_thumbnail {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        bytes: &Option<Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        encoded
            .map(|s| STANDARD.decode(s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

/// Persisted edge row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub source_page_id: String,
    pub target_page_id: String,
    pub link_text: String,
    pub link_type: LinkLocation,
    pub menu_level: u8,
    pub revealed_by: RevealedBy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_menu_text: Option<String>,
}

/// Read-only graph view for the request surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphView {
    pub nodes: Vec<PageRecord>,
    pub edges: Vec<EdgeRecord>,
}

/// Counters from one persistence pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistStats {
    pub pages_created: usize,
    pub pages_updated: usize,
    pub edges_written: usize,
    pub edges_skipped: usize,
}

#[derive(Clone)]
pub struct GraphStore {
    pool: SqlitePool,
}

impl GraphStore {
    /// Open (or create) the store at `path`.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("failed to create store directory")?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .context("failed to open graph database")?;

        sqlx::query(SCHEMA_SQL)
            .execute(&pool)
            .await
            .context("failed to initialize graph schema")?;

        Ok(Self { pool })
    }

    /// Persist a crawl's pages and edges for `project_id`.
    ///
    /// Pages first (existing rows keep their title/thumbnail when the new
    /// value is empty, and keep the smaller depth), then edges resolved
    /// through the url→id map. Duplicate edge upserts are no-ops.
    pub async fn persist_crawl(
        &self,
        project_id: &str,
        pages: &[DiscoveredPage],
        edges: &[PageEdge],
    ) -> Result<PersistStats> {
        let mut stats = PersistStats::default();

        let urls: Vec<String> = pages.iter().map(|p| p.url.clone()).collect();
        let existing = self.lookup_page_ids(project_id, &urls).await?;

        let mut url_to_id: HashMap<String, String> = existing.clone();

        let (to_update, to_create): (Vec<_>, Vec<_>) =
            pages.iter().partition(|p| existing.contains_key(&p.url));

        // Batch-insert new rows inside one transaction.
        if !to_create.is_empty() {
            let now = chrono::Utc::now().timestamp();
            let mut tx = self.pool.begin().await.context("failed to begin insert tx")?;
            for page in &to_create {
                let id = uuid::Uuid::new_v4().to_string();
                sqlx::query(
                    r"
                    INSERT OR IGNORE INTO pages
                        (id, project_id, url, title, page_type, requires_auth,
                         depth, is_accessible, thumbnail, discovered_at)
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                    ",
                )
                .bind(&id)
                .bind(project_id)
                .bind(&page.url)
                .bind(&page.title)
                .bind(page.kind.as_str())
                .bind(page.requires_auth)
                .bind(i64::from(page.depth))
                .bind(page.accessible)
                .bind(page.thumbnail.as_deref())
                .bind(now)
                .execute(&mut *tx)
                .await
                .context("failed to insert page")?;
                url_to_id.insert(page.url.clone(), id);
            }
            tx.commit().await.context("failed to commit page inserts")?;
            stats.pages_created = to_create.len();
        }

        // Parallel individual updates for existing rows.
        let updates = stream::iter(to_update.iter().map(|page| {
            let pool = self.pool.clone();
            let id = existing.get(&page.url).cloned().unwrap_or_default();
            async move {
                sqlx::query(
                    r"
                    UPDATE pages SET
                        title = CASE WHEN ? = '' THEN title ELSE ? END,
                        page_type = ?,
                        requires_auth = ?,
                        depth = CASE WHEN ? < depth THEN ? ELSE depth END,
                        is_accessible = ?,
                        thumbnail = COALESCE(?, thumbnail)
                    WHERE id = ?
                    ",
                )
                .bind(&page.title)
                .bind(&page.title)
                .bind(page.kind.as_str())
                .bind(page.requires_auth)
                .bind(i64::from(page.depth))
                .bind(i64::from(page.depth))
                .bind(page.accessible)
                .bind(page.thumbnail.as_deref())
                .bind(&id)
                .execute(&pool)
                .await
            }
        }))
        .buffer_unordered(8)
        .collect::<Vec<_>>()
        .await;

        for result in updates {
            match result {
                Ok(_) => stats.pages_updated += 1,
                Err(e) => warn!(target: "sitescout::store", "page update failed: {e}"),
            }
        }

        // Edge upserts: endpoints must resolve, self-loops are dropped.
        let mut valid_edges = Vec::new();
        for edge in edges {
            let (Some(source_id), Some(target_id)) = (
                url_to_id.get(&edge.source_url),
                url_to_id.get(&edge.target_url),
            ) else {
                stats.edges_skipped += 1;
                continue;
            };
            if source_id == target_id {
                stats.edges_skipped += 1;
                continue;
            }
            valid_edges.push((source_id.clone(), target_id.clone(), edge));
        }

        let written = stream::iter(valid_edges.into_iter().map(|(source_id, target_id, edge)| {
            let pool = self.pool.clone();
            let project_id = project_id.to_string();
            async move {
                sqlx::query(
                    r"
                    INSERT INTO edges
                        (project_id, source_page_id, target_page_id, link_text,
                         link_type, menu_level, revealed_by, parent_menu_text)
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                    ON CONFLICT(project_id, source_page_id, target_page_id) DO NOTHING
                    ",
                )
                .bind(&project_id)
                .bind(&source_id)
                .bind(&target_id)
                .bind(&edge.text)
                .bind(edge.location.as_str())
                .bind(i64::from(edge.menu_level))
                .bind(edge.revealed_by.as_str())
                .bind(edge.parent_menu_text.as_deref())
                .execute(&pool)
                .await
            }
        }))
        .buffer_unordered(EDGE_BATCH)
        .collect::<Vec<_>>()
        .await;

        for result in written {
            match result {
                Ok(_) => stats.edges_written += 1,
                Err(e) => {
                    warn!(target: "sitescout::store", "edge upsert failed: {e}");
                    stats.edges_skipped += 1;
                }
            }
        }

        info!(
            target: "sitescout::store",
            "persisted crawl for {project_id}: {} created, {} updated, {} edges",
            stats.pages_created, stats.pages_updated, stats.edges_written
        );
        Ok(stats)
    }

    /// Resolve existing `(project, url)` rows to ids, chunked under the
    /// SQLite bind-variable limit.
    async fn lookup_page_ids(
        &self,
        project_id: &str,
        urls: &[String],
    ) -> Result<HashMap<String, String>> {
        let mut map = HashMap::new();
        if urls.is_empty() {
            return Ok(map);
        }

        for chunk in urls.chunks(LOOKUP_CHUNK) {
            let placeholders: Vec<&str> = chunk.iter().map(|_| "?").collect();
            let query_str = format!(
                "SELECT id, url FROM pages WHERE project_id = ? AND url IN ({})",
                placeholders.join(", ")
            );

            let mut query = sqlx::query(&query_str).bind(project_id);
            for url in chunk {
                query = query.bind(url);
            }

            let rows = query
                .fetch_all(&self.pool)
                .await
                .context("failed to look up existing pages")?;
            for row in rows {
                map.insert(row.get("url"), row.get("id"));
            }
        }

        debug!(
            target: "sitescout::store",
            "{} of {} pages already exist",
            map.len(),
            urls.len()
        );
        Ok(map)
    }

    /// Read-only graph view for a project.
    pub async fn graph(&self, project_id: &str) -> Result<GraphView> {
        let page_rows = sqlx::query(
            r"
            SELECT id, url, title, page_type, requires_auth, depth,
                   is_accessible, selected, thumbnail
            FROM pages WHERE project_id = ? ORDER BY depth, url
            ",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .context("failed to read pages")?;

        let nodes = page_rows.into_iter().map(|row| page_from_row(&row)).collect();

        let edge_rows = sqlx::query(
            r"
            SELECT source_page_id, target_page_id, link_text, link_type,
                   menu_level, revealed_by, parent_menu_text
            FROM edges WHERE project_id = ?
            ",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .context("failed to read edges")?;

        let edges = edge_rows
            .into_iter()
            .map(|row| EdgeRecord {
                source_page_id: row.get("source_page_id"),
                target_page_id: row.get("target_page_id"),
                link_text: row.get("link_text"),
                link_type: LinkLocation::parse(row.get::<String, _>("link_type").as_str()),
                menu_level: row.get::<i64, _>("menu_level") as u8,
                revealed_by: RevealedBy::parse(row.get::<String, _>("revealed_by").as_str()),
                parent_menu_text: row.get("parent_menu_text"),
            })
            .collect();

        Ok(GraphView { nodes, edges })
    }

    /// Mark pages selected for downstream analysis; returns the rows that
    /// actually matched.
    pub async fn select_pages(
        &self,
        project_id: &str,
        page_ids: &[String],
    ) -> Result<Vec<PageRecord>> {
        if page_ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids: HashSet<&String> = page_ids.iter().collect();
        let mut selected = Vec::new();

        for chunk in page_ids.chunks(LOOKUP_CHUNK) {
            let placeholders: Vec<&str> = chunk.iter().map(|_| "?").collect();
            let update = format!(
                "UPDATE pages SET selected = 1 WHERE project_id = ? AND id IN ({})",
                placeholders.join(", ")
            );
            let mut query = sqlx::query(&update).bind(project_id);
            for id in chunk {
                query = query.bind(id);
            }
            query
                .execute(&self.pool)
                .await
                .context("failed to mark pages selected")?;
        }

        let graph = self.graph(project_id).await?;
        for node in graph.nodes {
            if ids.contains(&node.id) {
                selected.push(node);
            }
        }
        Ok(selected)
    }

    pub async fn page_count(&self, project_id: &str) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM pages WHERE project_id = ?")
            .bind(project_id)
            .fetch_one(&self.pool)
            .await
            .context("failed to count pages")?;
        Ok(row.0)
    }

    pub async fn edge_count(&self, project_id: &str) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM edges WHERE project_id = ?")
            .bind(project_id)
            .fetch_one(&self.pool)
            .await
            .context("failed to count edges")?;
        Ok(row.0)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn page_from_row(row: &sqlx::sqlite::SqliteRow) -> PageRecord {
    PageRecord {
        id: row.get("id"),
        url: row.get("url"),
        title: row.get("title"),
        page_type: PageKind::parse(row.get::<String, _>("page_type").as_str()),
        requires_auth: row.get("requires_auth"),
        depth: row.get::<i64, _>("depth") as u8,
        is_accessible: row.get("is_accessible"),
        selected: row.get("selected"),
        thumbnail: row.get("thumbnail"),
    }
}
