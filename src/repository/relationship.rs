//! Directed relationships between documents with deferred target resolution.
//!
//! Edges are recorded as soon as a document's relation tabs are parsed,
//! even when the referenced document has never been crawled. The backfill
//! pass later fills in target references as targets arrive, in whatever
//! session happens to crawl them. Resolution is at-least-once and
//! idempotent; edges whose target still does not exist simply wait for
//! the next pass.

use std::path::{Path, PathBuf};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{parse_datetime, parse_datetime_opt, RepositoryError, Result};
use crate::models::{normalize_relation_type, Relationship};

/// SQLite-backed repository for document relationships.
#[derive(Clone)]
pub struct RelationshipRepository {
    db_path: PathBuf,
}

impl RelationshipRepository {
    /// Create a new relationship repository.
    pub fn new(db_path: &Path) -> Result<Self> {
        let repo = Self {
            db_path: db_path.to_path_buf(),
        };
        repo.init_schema()?;
        Ok(repo)
    }

    pub(crate) fn connect(&self) -> Result<Connection> {
        super::connect(&self.db_path)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.connect()?;
        conn.execute_batch(
            r#"
            -- One row per directed edge between documents
            CREATE TABLE IF NOT EXISTS relationships (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                source_doc_id INTEGER NOT NULL REFERENCES document_versions(id),
                target_doc_url TEXT NOT NULL,
                target_doc_id INTEGER REFERENCES document_versions(id),
                relationship_type TEXT NOT NULL,
                target_title TEXT,
                created_at TEXT NOT NULL,
                resolved_at TEXT,

                UNIQUE(source_doc_id, target_doc_url, relationship_type)
            );

            CREATE INDEX IF NOT EXISTS idx_relationships_unresolved
                ON relationships(target_doc_url) WHERE target_doc_id IS NULL;
            CREATE INDEX IF NOT EXISTS idx_relationships_source
                ON relationships(source_doc_id);
        "#,
        )?;
        Ok(())
    }

    /// Record a directed edge from a document version to a target URL.
    ///
    /// Duplicate (source, target URL, type) triples are silently ignored.
    /// When the target already has a current version, the edge is recorded
    /// resolved immediately. Returns whether a new edge was written.
    pub fn record_edge(
        &self,
        source_doc_id: i64,
        target_url: &str,
        relationship_type: &str,
        target_title: Option<&str>,
    ) -> Result<bool> {
        if target_url.trim().is_empty() {
            return Err(RepositoryError::Validation(
                "empty target URL".to_string(),
            ));
        }
        let relation = normalize_relation_type(relationship_type);
        if relation.is_empty() {
            return Err(RepositoryError::Validation(
                "empty relationship type".to_string(),
            ));
        }

        let conn = self.connect()?;
        let target_doc_id = current_version_id(&conn, target_url)?;
        let resolved_at = target_doc_id.map(|_| Utc::now().to_rfc3339());

        let rows = conn.execute(
            r#"
            INSERT OR IGNORE INTO relationships
                (source_doc_id, target_doc_url, target_doc_id, relationship_type, target_title, created_at, resolved_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                source_doc_id,
                target_url,
                target_doc_id,
                relation,
                target_title,
                Utc::now().to_rfc3339(),
                resolved_at,
            ],
        )?;

        Ok(rows > 0)
    }

    /// Resolve target references for edges whose target has since arrived.
    ///
    /// Scans unresolved edges and fills `target_doc_id` where the target
    /// URL now has a current document version. Edges resolve independently
    /// and at most once; re-running over resolved edges is a no-op.
    /// Returns how many edges were updated.
    pub fn backfill_unresolved(&self) -> Result<u64> {
        let conn = self.connect()?;

        let pending: Vec<(i64, String)> = {
            let mut stmt = conn.prepare(
                "SELECT id, target_doc_url FROM relationships WHERE target_doc_id IS NULL",
            )?;
            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        };

        let mut updated = 0u64;
        for (edge_id, target_url) in pending {
            let Some(version_id) = current_version_id(&conn, &target_url)? else {
                continue;
            };
            let rows = conn.execute(
                r#"
                UPDATE relationships
                SET target_doc_id = ?1, resolved_at = ?2
                WHERE id = ?3 AND target_doc_id IS NULL
                "#,
                params![version_id, Utc::now().to_rfc3339(), edge_id],
            )?;
            updated += rows as u64;
        }

        Ok(updated)
    }

    /// Count edges still waiting for their target.
    pub fn unresolved_count(&self) -> Result<u64> {
        let conn = self.connect()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM relationships WHERE target_doc_id IS NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Count all recorded edges.
    pub fn edge_count(&self) -> Result<u64> {
        let conn = self.connect()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM relationships", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Get all edges originating from a document version.
    pub fn edges_for_source(&self, source_doc_id: i64) -> Result<Vec<Relationship>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM relationships WHERE source_doc_id = ? ORDER BY id ASC",
        )?;
        let edges = stmt
            .query_map(params![source_doc_id], row_to_relationship)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(edges)
    }
}

/// Look up the current version ID for a document URL, if one exists.
fn current_version_id(conn: &Connection, url: &str) -> Result<Option<i64>> {
    let id = conn
        .query_row(
            r#"
            SELECT dv.id FROM document_versions dv
            JOIN crawl_urls cu ON dv.doc_url_id = cu.id
            WHERE cu.url = ?
            ORDER BY dv.version DESC
            LIMIT 1
            "#,
            params![url],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

fn row_to_relationship(row: &Row) -> rusqlite::Result<Relationship> {
    Ok(Relationship {
        id: row.get("id")?,
        source_doc_id: row.get("source_doc_id")?,
        target_doc_url: row.get("target_doc_url")?,
        target_doc_id: row.get("target_doc_id")?,
        relationship_type: row.get("relationship_type")?,
        target_title: row.get("target_title")?,
        created_at: parse_datetime(&row.get::<_, String>("created_at")?),
        resolved_at: parse_datetime_opt(row.get("resolved_at")?),
    })
}
