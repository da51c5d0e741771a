//! Branch snapshot operations.

use super::parse_timestamp;
use crate::database::Database;
use crate::error::{DbError, DbResult};
use repowiki_core::BranchRecord;
use rusqlite::params;

const BRANCH_COLUMNS: &str = "id, repository_id, name, last_commit_sha, commit_at, created_at";

impl Database {
    /// Insert a branch snapshot.
    ///
    /// A snapshot of the same commit already stored for the repository is
    /// returned instead of inserting a second row.
    pub fn insert_branch(&self, branch: &BranchRecord) -> DbResult<BranchRecord> {
        let conn = self.conn()?;

        conn.execute(
            r#"
            INSERT INTO branches (id, repository_id, name, last_commit_sha, commit_at, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT (repository_id, last_commit_sha) DO NOTHING
            "#,
            params![
                branch.id,
                branch.repository_id,
                branch.name,
                branch.last_commit_sha,
                branch.commit_at.to_rfc3339(),
                branch.created_at.to_rfc3339(),
            ],
        )?;

        conn.query_row(
            &format!(
                "SELECT {} FROM branches WHERE repository_id = ?1 AND last_commit_sha = ?2",
                BRANCH_COLUMNS
            ),
            params![branch.repository_id, branch.last_commit_sha],
            row_to_branch,
        )
        .map_err(DbError::from)
    }

    /// Most recently documented branch snapshot of a repository.
    pub fn get_latest_branch(&self, repository_id: &str) -> DbResult<Option<BranchRecord>> {
        let conn = self.conn()?;
        let result = conn.query_row(
            &format!(
                "SELECT {} FROM branches WHERE repository_id = ?1 ORDER BY created_at DESC LIMIT 1",
                BRANCH_COLUMNS
            ),
            params![repository_id],
            row_to_branch,
        );

        match result {
            Ok(branch) => Ok(Some(branch)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(DbError::from(e)),
        }
    }
}

fn row_to_branch(row: &rusqlite::Row) -> rusqlite::Result<BranchRecord> {
    let commit_at_str: String = row.get(4)?;
    let created_at_str: String = row.get(5)?;

    Ok(BranchRecord {
        id: row.get(0)?,
        repository_id: row.get(1)?,
        name: row.get(2)?,
        last_commit_sha: row.get(3)?,
        commit_at: parse_timestamp(&commit_at_str),
        created_at: parse_timestamp(&created_at_str),
    })
}
