//! Repository CRUD operations.

use super::parse_timestamp;
use crate::database::Database;
use crate::error::{DbError, DbResult};
use repowiki_core::{RecordId, RepositoryRecord};
use rusqlite::{params, Connection};

const REPOSITORY_COLUMNS: &str =
    "id, url, owner, repo, language, description, default_branch, stars, forks, created_at";

impl Database {
    /// Insert a repository with its topics.
    ///
    /// Returns `None` without touching storage when a repository with the same
    /// URL or `owner/repo` already exists.
    pub fn insert_repository(&self, repository: &RepositoryRecord) -> DbResult<Option<RepositoryRecord>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let rows = tx.execute(
            r#"
            INSERT INTO repositories (id, url, owner, repo, language, description, default_branch, stars, forks, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT DO NOTHING
            "#,
            params![
                repository.id,
                repository.url,
                repository.owner,
                repository.repo,
                repository.language,
                repository.description,
                repository.default_branch,
                repository.stars,
                repository.forks,
                repository.created_at.to_rfc3339(),
            ],
        )?;

        if rows == 0 {
            return Ok(None);
        }

        for topic in &repository.topics {
            tx.execute(
                "INSERT OR IGNORE INTO repository_topics (repository_id, topic) VALUES (?1, ?2)",
                params![repository.id, topic],
            )?;
        }

        tx.commit()?;
        Ok(Some(repository.clone()))
    }

    /// Find a repository by owner and name (case-insensitive).
    pub fn get_repository(&self, owner: &str, repo: &str) -> DbResult<Option<RepositoryRecord>> {
        let conn = self.conn()?;
        let result = conn.query_row(
            &format!(
                "SELECT {} FROM repositories WHERE owner = ?1 AND repo = ?2",
                REPOSITORY_COLUMNS
            ),
            params![owner, repo],
            row_to_repository,
        );

        match result {
            Ok(mut repository) => {
                repository.topics = load_topics(&conn, &repository.id)?;
                Ok(Some(repository))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(DbError::from(e)),
        }
    }

    /// Whether a repository is already stored.
    pub fn repository_exists(&self, owner: &str, repo: &str) -> DbResult<bool> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM repositories WHERE owner = ?1 AND repo = ?2",
            params![owner, repo],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// List all repositories, most recently ingested first.
    pub fn list_repositories(&self) -> DbResult<Vec<RepositoryRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM repositories ORDER BY created_at DESC",
            REPOSITORY_COLUMNS
        ))?;
        let rows = stmt.query_map([], row_to_repository)?;
        let mut repositories = rows.collect::<Result<Vec<_>, _>>()?;

        for repository in &mut repositories {
            repository.topics = load_topics(&conn, &repository.id)?;
        }

        Ok(repositories)
    }

    /// Delete a repository and, through cascading keys, everything under it.
    pub fn delete_repository(&self, id: &RecordId) -> DbResult<()> {
        let conn = self.conn()?;
        let rows = conn.execute("DELETE FROM repositories WHERE id = ?1", params![id])?;

        if rows == 0 {
            return Err(DbError::NotFound(format!("Repository not found: {}", id)));
        }

        Ok(())
    }
}

fn load_topics(conn: &Connection, repository_id: &str) -> DbResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT topic FROM repository_topics WHERE repository_id = ?1 ORDER BY topic",
    )?;
    let rows = stmt.query_map(params![repository_id], |row| row.get(0))?;
    Ok(rows.collect::<Result<Vec<String>, _>>()?)
}

fn row_to_repository(row: &rusqlite::Row) -> rusqlite::Result<RepositoryRecord> {
    let created_at_str: String = row.get(9)?;

    Ok(RepositoryRecord {
        id: row.get(0)?,
        url: row.get(1)?,
        owner: row.get(2)?,
        repo: row.get(3)?,
        language: row.get(4)?,
        description: row.get(5)?,
        default_branch: row.get(6)?,
        stars: row.get(7)?,
        forks: row.get(8)?,
        topics: vec![],
        created_at: parse_timestamp(&created_at_str),
    })
}
