//! Database statistics operations.

use crate::database::Database;
use crate::error::DbResult;
use repowiki_core::DatabaseStats;

impl Database {
    /// Get database statistics.
    ///
    /// `database_size_bytes` is left at zero; callers that know the file path
    /// fill it in with [`Database::file_size`].
    pub fn get_stats(&self) -> DbResult<DatabaseStats> {
        let conn = self.conn()?;

        let count = |sql: &str| -> DbResult<i64> { Ok(conn.query_row(sql, [], |row| row.get(0))?) };

        Ok(DatabaseStats {
            total_repositories: count("SELECT COUNT(*) FROM repositories")?,
            total_branches: count("SELECT COUNT(*) FROM branches")?,
            total_folders: count("SELECT COUNT(*) FROM folders WHERE summary IS NOT NULL")?,
            pending_folders: count("SELECT COUNT(*) FROM folders WHERE summary IS NULL")?,
            total_files: count("SELECT COUNT(*) FROM files")?,
            database_size_bytes: 0,
        })
    }
}
