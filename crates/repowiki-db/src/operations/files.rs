//! File operations.

use super::parse_timestamp;
use crate::database::Database;
use crate::error::DbResult;
use repowiki_core::FileRecord;
use rusqlite::params;

impl Database {
    /// Insert a summarized file.
    pub fn insert_file(&self, file: &FileRecord) -> DbResult<()> {
        let conn = self.conn()?;

        conn.execute(
            r#"
            INSERT INTO files (id, folder_id, name, path, content, summary, usage, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                file.id,
                file.folder_id,
                file.name,
                file.path,
                file.content,
                file.summary,
                file.usage,
                file.created_at.to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    /// Files stored directly in a folder, ordered by path.
    pub fn list_files(&self, folder_id: &str) -> DbResult<Vec<FileRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, folder_id, name, path, content, summary, usage, created_at
            FROM files WHERE folder_id = ?1 ORDER BY path
            "#,
        )?;
        let rows = stmt.query_map(params![folder_id], row_to_file)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Count the files of a branch snapshot.
    pub fn count_files(&self, branch_id: &str) -> DbResult<i64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            r#"
            SELECT COUNT(*) FROM files f
            JOIN folders d ON d.id = f.folder_id
            WHERE d.branch_id = ?1
            "#,
            params![branch_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn row_to_file(row: &rusqlite::Row) -> rusqlite::Result<FileRecord> {
    let created_at_str: String = row.get(7)?;

    Ok(FileRecord {
        id: row.get(0)?,
        folder_id: row.get(1)?,
        name: row.get(2)?,
        path: row.get(3)?,
        content: row.get(4)?,
        summary: row.get(5)?,
        usage: row.get(6)?,
        created_at: parse_timestamp(&created_at_str),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::fixtures::seeded;
    use repowiki_core::FolderRecord;

    #[test]
    fn test_file_crud() {
        let (db, branch) = seeded();
        let folder = FolderRecord::new(branch.id.clone(), "src");
        db.insert_folder(&folder).unwrap();

        let b = FileRecord::new(folder.id.clone(), "src/b.rs", "fn b() {}", "B", "Call b");
        let a = FileRecord::new(folder.id.clone(), "src/a.rs", "fn a() {}", "A", "Call a");
        db.insert_file(&b).unwrap();
        db.insert_file(&a).unwrap();

        let files = db.list_files(&folder.id).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].name, "a.rs");
        assert_eq!(files[1].content, "fn b() {}");
        assert_eq!(db.count_files(&branch.id).unwrap(), 2);

        // Removing the folder removes its files
        db.delete_folder(&folder.id).unwrap();
        assert_eq!(db.count_files(&branch.id).unwrap(), 0);
    }

    #[test]
    fn test_file_requires_folder() {
        let (db, _) = seeded();
        let orphan = FileRecord::new("missing".into(), "x.rs", "", "s", "u");
        assert!(db.insert_file(&orphan).is_err());
    }
}
