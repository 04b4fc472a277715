//! Versioned document metadata store.
//!
//! Each document's extracted metadata lives as an append-only version
//! chain keyed by its crawl URL. A version is inserted only when the
//! content fingerprint differs from the current one, so the chain records
//! every observed change and nothing else. Version rows are never updated
//! or deleted; the full history stays available for audit.

use std::path::{Path, PathBuf};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::{Map, Value};

use super::crawl::CrawlRepository;
use super::{parse_datetime, RepositoryError, Result};
use crate::fingerprint::fingerprint;
use crate::models::{compute_diff, DocumentVersion, VersionDiff};

/// Result of a versioned upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertOutcome {
    /// Whether a new version row was written.
    pub created: bool,
    /// The current version number after the call.
    pub version: i64,
}

/// SQLite-backed store for document version chains.
#[derive(Clone)]
pub struct DocumentRepository {
    db_path: PathBuf,
}

impl DocumentRepository {
    /// Create a new document repository.
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
            -- One row per observed change in a document's metadata
            CREATE TABLE IF NOT EXISTS document_versions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                doc_url_id INTEGER NOT NULL REFERENCES crawl_urls(id),
                version INTEGER NOT NULL,
                content_hash TEXT NOT NULL,
                extra_data TEXT NOT NULL,
                diff_summary TEXT,
                session_id INTEGER,
                created_at TEXT NOT NULL,

                UNIQUE(doc_url_id, version)
            );

            CREATE INDEX IF NOT EXISTS idx_document_versions_chain
                ON document_versions(doc_url_id, version DESC);
            CREATE INDEX IF NOT EXISTS idx_document_versions_hash
                ON document_versions(content_hash);
        "#,
        )?;
        Ok(())
    }

    /// Append a new version if the document's fields changed.
    ///
    /// Resolves (or creates) the owning crawl URL row, compares the
    /// fingerprint of `fields` against the current version, and inserts
    /// `version + 1` only on change. The whole read-modify-write runs in
    /// one immediate transaction, so concurrent upserts for the same URL
    /// serialize: one writes, the other observes the new state and no-ops.
    pub fn upsert(
        &self,
        url: &str,
        fields: &Map<String, Value>,
        session_id: Option<i64>,
    ) -> Result<UpsertOutcome> {
        if url.trim().is_empty() {
            return Err(RepositoryError::Validation("empty URL".to_string()));
        }

        let new_hash = fingerprint(fields);
        let payload = serde_json::to_string(&Value::Object(fields.clone()))?;

        let conn = self.connect()?;
        conn.execute("BEGIN IMMEDIATE", [])?;

        let result: Result<UpsertOutcome> = (|| {
            let url_id = CrawlRepository::get_or_create_url_id(&conn, url)?;

            let current: Option<(i64, String, String)> = conn
                .query_row(
                    r#"
                    SELECT version, content_hash, extra_data
                    FROM document_versions
                    WHERE doc_url_id = ?
                    ORDER BY version DESC
                    LIMIT 1
                    "#,
                    params![url_id],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .optional()?;

            if let Some((version, ref hash, _)) = current {
                if *hash == new_hash {
                    return Ok(UpsertOutcome {
                        created: false,
                        version,
                    });
                }
            }

            let (next_version, diff) = match current {
                Some((version, _, old_payload)) => {
                    let old_fields = parse_fields(&old_payload);
                    (version + 1, compute_diff(&old_fields, fields))
                }
                None => (1, None),
            };
            let diff_json = diff
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?;

            conn.execute(
                r#"
                INSERT INTO document_versions
                    (doc_url_id, version, content_hash, extra_data, diff_summary, session_id, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    url_id,
                    next_version,
                    new_hash,
                    payload,
                    diff_json,
                    session_id,
                    Utc::now().to_rfc3339(),
                ],
            )?;

            Ok(UpsertOutcome {
                created: true,
                version: next_version,
            })
        })();

        if result.is_ok() {
            conn.execute("COMMIT", [])?;
        } else {
            let _ = conn.execute("ROLLBACK", []);
        }

        result
    }

    /// Get the current (maximum-version) snapshot for a URL.
    pub fn current_version(&self, url: &str) -> Result<Option<DocumentVersion>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT dv.* FROM document_versions dv
            JOIN crawl_urls cu ON dv.doc_url_id = cu.id
            WHERE cu.url = ?
            ORDER BY dv.version DESC
            LIMIT 1
            "#,
        )?;
        Ok(stmt.query_row(params![url], row_to_version).optional()?)
    }

    /// Get the full version chain for a URL, oldest first.
    pub fn versions(&self, url: &str) -> Result<Vec<DocumentVersion>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT dv.* FROM document_versions dv
            JOIN crawl_urls cu ON dv.doc_url_id = cu.id
            WHERE cu.url = ?
            ORDER BY dv.version ASC
            "#,
        )?;
        let versions = stmt
            .query_map(params![url], row_to_version)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(versions)
    }

    /// Count distinct documents with at least one version.
    pub fn document_count(&self) -> Result<u64> {
        let conn = self.connect()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(DISTINCT doc_url_id) FROM document_versions",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Count stored version rows.
    pub fn version_count(&self) -> Result<u64> {
        let conn = self.connect()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM document_versions", [], |row| {
                row.get(0)
            })?;
        Ok(count as u64)
    }
}

fn parse_fields(payload: &str) -> Map<String, Value> {
    serde_json::from_str::<Value>(payload)
        .ok()
        .and_then(|v| v.as_object().cloned())
        .unwrap_or_default()
}

fn row_to_version(row: &Row) -> rusqlite::Result<DocumentVersion> {
    let diff_summary: Option<VersionDiff> = row
        .get::<_, Option<String>>("diff_summary")?
        .and_then(|s| serde_json::from_str(&s).ok());

    Ok(DocumentVersion {
        id: row.get("id")?,
        doc_url_id: row.get("doc_url_id")?,
        version: row.get("version")?,
        content_hash: row.get("content_hash")?,
        extra_data: parse_fields(&row.get::<_, String>("extra_data")?),
        diff_summary,
        session_id: row.get("session_id")?,
        created_at: parse_datetime(&row.get::<_, String>("created_at")?),
    })
}
