//! Folder operations.
//!
//! A folder row is inserted before its subtree is ingested so children can
//! reference it, and only receives its summary once the subtree is done.
//! Rows without a summary are never returned by listing reads.

use super::parse_timestamp;
use crate::database::Database;
use crate::error::{DbError, DbResult};
use repowiki_core::FolderRecord;
use rusqlite::params;

const FOLDER_COLUMNS: &str =
    "id, branch_id, parent_folder_id, name, path, summary, usage, created_at";

impl Database {
    /// Insert a folder row (typically without a summary yet).
    pub fn insert_folder(&self, folder: &FolderRecord) -> DbResult<()> {
        let conn = self.conn()?;

        conn.execute(
            r#"
            INSERT INTO folders (id, branch_id, parent_folder_id, name, path, summary, usage, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                folder.id,
                folder.branch_id,
                folder.parent_folder_id,
                folder.name,
                folder.path,
                folder.summary,
                folder.usage,
                folder.created_at.to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    /// Store the generated summary of a folder.
    pub fn update_folder_summary(&self, id: &str, summary: &str, usage: &str) -> DbResult<()> {
        let conn = self.conn()?;
        let rows = conn.execute(
            "UPDATE folders SET summary = ?1, usage = ?2 WHERE id = ?3",
            params![summary, usage, id],
        )?;

        if rows == 0 {
            return Err(DbError::NotFound(format!("Folder not found: {}", id)));
        }

        Ok(())
    }

    /// Delete a folder together with its files and descendant folders.
    ///
    /// Returns whether a row was removed; deleting a missing folder is not an error.
    pub fn delete_folder(&self, id: &str) -> DbResult<bool> {
        let conn = self.conn()?;
        let rows = conn.execute("DELETE FROM folders WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    /// Get a summarized folder by ID.
    pub fn get_folder(&self, id: &str) -> DbResult<Option<FolderRecord>> {
        let conn = self.conn()?;
        let result = conn.query_row(
            &format!(
                "SELECT {} FROM folders WHERE id = ?1 AND summary IS NOT NULL",
                FOLDER_COLUMNS
            ),
            params![id],
            row_to_folder,
        );

        match result {
            Ok(folder) => Ok(Some(folder)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(DbError::from(e)),
        }
    }

    /// Summarized root folder of a branch snapshot.
    pub fn get_root_folder(&self, branch_id: &str) -> DbResult<Option<FolderRecord>> {
        let conn = self.conn()?;
        let result = conn.query_row(
            &format!(
                "SELECT {} FROM folders
                 WHERE branch_id = ?1 AND parent_folder_id IS NULL AND summary IS NOT NULL",
                FOLDER_COLUMNS
            ),
            params![branch_id],
            row_to_folder,
        );

        match result {
            Ok(folder) => Ok(Some(folder)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(DbError::from(e)),
        }
    }

    /// All summarized folders of a branch snapshot, ordered by path.
    pub fn list_folders(&self, branch_id: &str) -> DbResult<Vec<FolderRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM folders WHERE branch_id = ?1 AND summary IS NOT NULL ORDER BY path",
            FOLDER_COLUMNS
        ))?;
        let rows = stmt.query_map(params![branch_id], row_to_folder)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Summarized direct children of a folder, ordered by path.
    pub fn list_child_folders(&self, parent_folder_id: &str) -> DbResult<Vec<FolderRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM folders WHERE parent_folder_id = ?1 AND summary IS NOT NULL ORDER BY path",
            FOLDER_COLUMNS
        ))?;
        let rows = stmt.query_map(params![parent_folder_id], row_to_folder)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Count every folder row of a branch, including ones still awaiting a summary.
    pub fn count_folders(&self, branch_id: &str) -> DbResult<i64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM folders WHERE branch_id = ?1",
            params![branch_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn row_to_folder(row: &rusqlite::Row) -> rusqlite::Result<FolderRecord> {
    let created_at_str: String = row.get(7)?;

    Ok(FolderRecord {
        id: row.get(0)?,
        branch_id: row.get(1)?,
        parent_folder_id: row.get(2)?,
        name: row.get(3)?,
        path: row.get(4)?,
        summary: row.get(5)?,
        usage: row.get(6)?,
        created_at: parse_timestamp(&created_at_str),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::fixtures::seeded;

    #[test]
    fn test_pending_folder_is_hidden_until_summarized() {
        let (db, branch) = seeded();

        let root = FolderRecord::new(branch.id.clone(), "");
        db.insert_folder(&root).unwrap();

        assert!(db.get_root_folder(&branch.id).unwrap().is_none());
        assert!(db.list_folders(&branch.id).unwrap().is_empty());
        assert_eq!(db.count_folders(&branch.id).unwrap(), 1);

        db.update_folder_summary(&root.id, "Root summary", "Usage").unwrap();

        let fetched = db.get_root_folder(&branch.id).unwrap().unwrap();
        assert_eq!(fetched.summary.as_deref(), Some("Root summary"));
        assert_eq!(db.list_folders(&branch.id).unwrap().len(), 1);
    }

    #[test]
    fn test_delete_folder_cascades_to_children() {
        let (db, branch) = seeded();

        let root = FolderRecord::new(branch.id.clone(), "");
        db.insert_folder(&root).unwrap();
        let child = FolderRecord::new(branch.id.clone(), "src").with_parent(Some(root.id.clone()));
        db.insert_folder(&child).unwrap();
        db.update_folder_summary(&child.id, "Sources", "Build").unwrap();

        assert_eq!(db.list_child_folders(&root.id).unwrap().len(), 1);

        assert!(db.delete_folder(&root.id).unwrap());
        assert_eq!(db.count_folders(&branch.id).unwrap(), 0);

        // Idempotent
        assert!(!db.delete_folder(&root.id).unwrap());
    }

    #[test]
    fn test_update_missing_folder() {
        let (db, _) = seeded();
        let result = db.update_folder_summary("missing", "s", "u");
        assert!(matches!(result, Err(DbError::NotFound(_))));
    }
}
