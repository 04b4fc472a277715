//! Glossary term catalog with duplicate repair utilities.
//!
//! The `url` column is intended unique but the schema deliberately does
//! not enforce it: historic crawls wrote duplicates before the guarded
//! upsert existed, and the repair utilities below operate on exactly that
//! data. New writes go through `save_term`, which upserts by URL inside
//! an immediate transaction, so the catalog cannot regrow duplicates.

use std::path::{Path, PathBuf};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{parse_datetime, RepositoryError, Result};
use crate::models::Term;

/// A set of catalog entries sharing one URL.
#[derive(Debug, Clone)]
pub struct DuplicateGroup {
    pub url: String,
    /// Entries ordered by `created_at` ascending, earliest first.
    pub entries: Vec<Term>,
}

impl DuplicateGroup {
    /// Entries that the keep-earliest policy would delete.
    pub fn excess(&self) -> usize {
        self.entries.len().saturating_sub(1)
    }
}

/// SQLite-backed repository for glossary terms.
#[derive(Clone)]
pub struct TermRepository {
    db_path: PathBuf,
}

impl TermRepository {
    /// Create a new term repository.
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
            -- One row per glossary term, keyed by source URL
            CREATE TABLE IF NOT EXISTS terms (
                term_id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                definition TEXT NOT NULL DEFAULT '',
                url TEXT NOT NULL,
                source_crawl TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_terms_url ON terms(url);
        "#,
        )?;
        Ok(())
    }

    /// Insert or refresh a term by URL. Returns whether the term was new.
    ///
    /// The lookup targets the earliest row for the URL so that, against
    /// legacy duplicate data, refreshes touch the row the dedup policy
    /// would keep.
    pub fn save_term(&self, term: &Term) -> Result<bool> {
        if term.url.trim().is_empty() {
            return Err(RepositoryError::Validation("empty term URL".to_string()));
        }

        let conn = self.connect()?;
        conn.execute("BEGIN IMMEDIATE", [])?;

        let result: Result<bool> = (|| {
            let existing: Option<i64> = conn
                .query_row(
                    "SELECT term_id FROM terms WHERE url = ? ORDER BY created_at ASC, term_id ASC LIMIT 1",
                    params![term.url],
                    |row| row.get(0),
                )
                .optional()?;

            match existing {
                Some(term_id) => {
                    conn.execute(
                        r#"
                        UPDATE terms SET
                            name = ?1,
                            definition = ?2,
                            source_crawl = ?3,
                            updated_at = ?4
                        WHERE term_id = ?5
                        "#,
                        params![
                            term.name,
                            term.definition,
                            term.source_crawl,
                            Utc::now().to_rfc3339(),
                            term_id,
                        ],
                    )?;
                    Ok(false)
                }
                None => {
                    let now = Utc::now().to_rfc3339();
                    conn.execute(
                        r#"
                        INSERT INTO terms (name, definition, url, source_crawl, created_at, updated_at)
                        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                        "#,
                        params![
                            term.name,
                            term.definition,
                            term.url,
                            term.source_crawl,
                            now,
                            now,
                        ],
                    )?;
                    Ok(true)
                }
            }
        })();

        if result.is_ok() {
            conn.execute("COMMIT", [])?;
        } else {
            let _ = conn.execute("ROLLBACK", []);
        }

        result
    }

    /// Group catalog entries by URL, returning only groups with duplicates.
    pub fn find_duplicate_urls(&self) -> Result<Vec<DuplicateGroup>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM terms ORDER BY url ASC, created_at ASC, term_id ASC",
        )?;
        let terms = stmt
            .query_map([], row_to_term)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut groups: Vec<DuplicateGroup> = Vec::new();
        for term in terms {
            match groups.last_mut() {
                Some(group) if group.url == term.url => group.entries.push(term),
                _ => groups.push(DuplicateGroup {
                    url: term.url.clone(),
                    entries: vec![term],
                }),
            }
        }

        Ok(groups
            .into_iter()
            .filter(|g| g.entries.len() > 1)
            .collect())
    }

    /// Delete duplicate rows, keeping the earliest entry per URL.
    ///
    /// Each group is resolved in its own transaction: either all excess
    /// rows of the group go, or none do. Returns how many rows were
    /// deleted.
    pub fn resolve_duplicates(&self) -> Result<u64> {
        let groups = self.find_duplicate_urls()?;
        let conn = self.connect()?;

        let mut deleted = 0u64;
        for group in groups {
            conn.execute("BEGIN IMMEDIATE", [])?;

            let result: Result<u64> = (|| {
                let mut removed = 0u64;
                // Entries are ordered earliest-first; the head row stays.
                for term in &group.entries[1..] {
                    removed += conn.execute(
                        "DELETE FROM terms WHERE term_id = ?",
                        params![term.term_id],
                    )? as u64;
                }
                Ok(removed)
            })();

            match result {
                Ok(removed) => {
                    conn.execute("COMMIT", [])?;
                    deleted += removed;
                }
                Err(e) => {
                    let _ = conn.execute("ROLLBACK", []);
                    return Err(e);
                }
            }
        }

        Ok(deleted)
    }

    /// Renumber `term_id` values into a contiguous 1..N sequence.
    ///
    /// Rows keep their relative order; the AUTOINCREMENT sequence is reset
    /// so the next insert continues from N. Returns how many rows moved.
    pub fn compact_ids(&self) -> Result<u64> {
        let conn = self.connect()?;
        conn.execute("BEGIN IMMEDIATE", [])?;

        let result: Result<u64> = (|| {
            let ids: Vec<i64> = {
                let mut stmt = conn.prepare("SELECT term_id FROM terms ORDER BY term_id ASC")?;
                let rows = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            };

            let mut moved = 0u64;
            // Ascending order guarantees the new ID is always free: it is
            // at most the old ID and below every remaining row.
            for (index, old_id) in ids.iter().enumerate() {
                let new_id = index as i64 + 1;
                if *old_id != new_id {
                    conn.execute(
                        "UPDATE terms SET term_id = ?1 WHERE term_id = ?2",
                        params![new_id, old_id],
                    )?;
                    moved += 1;
                }
            }

            conn.execute(
                "UPDATE sqlite_sequence SET seq = ?1 WHERE name = 'terms'",
                params![ids.len() as i64],
            )?;

            Ok(moved)
        })();

        match result {
            Ok(moved) => {
                conn.execute("COMMIT", [])?;
                Ok(moved)
            }
            Err(e) => {
                let _ = conn.execute("ROLLBACK", []);
                Err(e)
            }
        }
    }

    /// Count all catalog entries.
    pub fn count(&self) -> Result<u64> {
        let conn = self.connect()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM terms", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Get every entry stored for a URL, earliest first.
    pub fn get_by_url(&self, url: &str) -> Result<Vec<Term>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM terms WHERE url = ? ORDER BY created_at ASC, term_id ASC",
        )?;
        let terms = stmt
            .query_map(params![url], row_to_term)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(terms)
    }
}

fn row_to_term(row: &Row) -> rusqlite::Result<Term> {
    Ok(Term {
        term_id: row.get("term_id")?,
        name: row.get("name")?,
        definition: row.get("definition")?,
        url: row.get("url")?,
        source_crawl: row.get("source_crawl")?,
        created_at: parse_datetime(&row.get::<_, String>("created_at")?),
        updated_at: parse_datetime(&row.get::<_, String>("updated_at")?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn repo() -> (TempDir, TermRepository) {
        let dir = TempDir::new().unwrap();
        let repo = TermRepository::new(&dir.path().join("lexacquire.db")).unwrap();
        (dir, repo)
    }

    /// Insert a raw row bypassing the upsert guard, as historic crawls did.
    fn insert_raw(repo: &TermRepository, name: &str, url: &str, created_at: &str) {
        let conn = repo.connect().unwrap();
        conn.execute(
            "INSERT INTO terms (name, definition, url, created_at, updated_at) VALUES (?1, '', ?2, ?3, ?3)",
            params![name, url, created_at],
        )
        .unwrap();
    }

    #[test]
    fn test_save_term_insert_then_update() {
        let (_dir, repo) = repo();
        let term = Term::new("Án lệ", "first definition", "https://example.vn/tnpl/1", None);

        assert!(repo.save_term(&term).unwrap());
        let updated = Term::new("Án lệ", "better definition", "https://example.vn/tnpl/1", None);
        assert!(!repo.save_term(&updated).unwrap());

        let stored = repo.get_by_url("https://example.vn/tnpl/1").unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].definition, "better definition");
    }

    #[test]
    fn test_save_term_rejects_empty_url() {
        let (_dir, repo) = repo();
        let term = Term::new("x", "y", "", None);
        assert!(matches!(
            repo.save_term(&term),
            Err(RepositoryError::Validation(_))
        ));
    }

    #[test]
    fn test_find_duplicate_urls() {
        let (_dir, repo) = repo();
        insert_raw(&repo, "A", "https://example.vn/tnpl/a", "2024-01-01T00:00:00+00:00");
        insert_raw(&repo, "A", "https://example.vn/tnpl/a", "2024-06-01T00:00:00+00:00");
        insert_raw(&repo, "B", "https://example.vn/tnpl/b", "2024-03-01T00:00:00+00:00");

        let groups = repo.find_duplicate_urls().unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].url, "https://example.vn/tnpl/a");
        assert_eq!(groups[0].entries.len(), 2);
        assert_eq!(groups[0].excess(), 1);
        // Earliest first.
        assert!(groups[0].entries[0].created_at < groups[0].entries[1].created_at);
    }

    #[test]
    fn test_resolve_duplicates_keeps_earliest() {
        let (_dir, repo) = repo();
        insert_raw(&repo, "A v1", "https://example.vn/tnpl/a", "2024-01-01T00:00:00+00:00");
        insert_raw(&repo, "A v2", "https://example.vn/tnpl/a", "2024-06-01T00:00:00+00:00");
        insert_raw(&repo, "A v3", "https://example.vn/tnpl/a", "2024-08-01T00:00:00+00:00");
        insert_raw(&repo, "B", "https://example.vn/tnpl/b", "2024-03-01T00:00:00+00:00");

        assert_eq!(repo.resolve_duplicates().unwrap(), 2);

        let a = repo.get_by_url("https://example.vn/tnpl/a").unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].name, "A v1");

        let b = repo.get_by_url("https://example.vn/tnpl/b").unwrap();
        assert_eq!(b.len(), 1);

        // Already clean; second pass deletes nothing.
        assert_eq!(repo.resolve_duplicates().unwrap(), 0);
    }

    #[test]
    fn test_compact_ids_renumbers_contiguously() {
        let (_dir, repo) = repo();
        for i in 1..=4 {
            insert_raw(
                &repo,
                &format!("T{i}"),
                &format!("https://example.vn/tnpl/{i}"),
                "2024-01-01T00:00:00+00:00",
            );
        }
        // Punch holes in the sequence.
        {
            let conn = repo.connect().unwrap();
            conn.execute("DELETE FROM terms WHERE term_id IN (1, 3)", [])
                .unwrap();
        }

        let moved = repo.compact_ids().unwrap();
        assert_eq!(moved, 2);

        let conn = repo.connect().unwrap();
        let ids: Vec<i64> = conn
            .prepare("SELECT term_id FROM terms ORDER BY term_id")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(ids, vec![1, 2]);

        // Relative order preserved: T2 before T4.
        let names: Vec<String> = conn
            .prepare("SELECT name FROM terms ORDER BY term_id")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(names, vec!["T2", "T4"]);
    }

    #[test]
    fn test_save_term_updates_earliest_duplicate() {
        let (_dir, repo) = repo();
        insert_raw(&repo, "old", "https://example.vn/tnpl/a", "2024-01-01T00:00:00+00:00");
        insert_raw(&repo, "newer", "https://example.vn/tnpl/a", "2024-06-01T00:00:00+00:00");

        let term = Term::new("refreshed", "def", "https://example.vn/tnpl/a", None);
        assert!(!repo.save_term(&term).unwrap());

        let stored = repo.get_by_url("https://example.vn/tnpl/a").unwrap();
        assert_eq!(stored[0].name, "refreshed");
        assert_eq!(stored[1].name, "newer");
    }
}
