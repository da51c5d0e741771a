//! Database migrations and schema management.

use crate::error::{DbError, DbResult};
use rusqlite::Connection;
use tracing::info;

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema.
pub fn initialize_schema(conn: &Connection) -> DbResult<()> {
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        info!("Creating initial database schema...");
        create_initial_schema(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if current_version > SCHEMA_VERSION {
        return Err(DbError::Migration(format!(
            "database schema version {} is newer than supported version {}",
            current_version, SCHEMA_VERSION
        )));
    }

    Ok(())
}

fn get_schema_version(conn: &Connection) -> DbResult<i32> {
    let version: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    Ok(version)
}

fn set_schema_version(conn: &Connection, version: i32) -> DbResult<()> {
    conn.pragma_update(None, "user_version", version)?;
    Ok(())
}

fn create_initial_schema(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        r#"
        -- Ingested repositories
        CREATE TABLE IF NOT EXISTS repositories (
            id TEXT PRIMARY KEY,
            url TEXT NOT NULL UNIQUE,
            owner TEXT NOT NULL COLLATE NOCASE,
            repo TEXT NOT NULL COLLATE NOCASE,
            language TEXT,
            description TEXT,
            default_branch TEXT NOT NULL,
            stars INTEGER DEFAULT 0,
            forks INTEGER DEFAULT 0,
            created_at TEXT NOT NULL,
            UNIQUE (owner, repo)
        );

        CREATE TABLE IF NOT EXISTS repository_topics (
            repository_id TEXT NOT NULL REFERENCES repositories(id) ON DELETE CASCADE,
            topic TEXT NOT NULL,
            PRIMARY KEY (repository_id, topic)
        );

        -- One row per documented commit
        CREATE TABLE IF NOT EXISTS branches (
            id TEXT PRIMARY KEY,
            repository_id TEXT NOT NULL REFERENCES repositories(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            last_commit_sha TEXT NOT NULL,
            commit_at TEXT NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE (repository_id, last_commit_sha)
        );

        CREATE INDEX IF NOT EXISTS idx_branches_repository ON branches(repository_id);

        -- Documentation tree
        CREATE TABLE IF NOT EXISTS folders (
            id TEXT PRIMARY KEY,
            branch_id TEXT NOT NULL REFERENCES branches(id) ON DELETE CASCADE,
            parent_folder_id TEXT REFERENCES folders(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            path TEXT NOT NULL,
            summary TEXT,
            usage TEXT,
            created_at TEXT NOT NULL,
            UNIQUE (branch_id, path)
        );

        CREATE INDEX IF NOT EXISTS idx_folders_branch ON folders(branch_id);
        CREATE INDEX IF NOT EXISTS idx_folders_parent ON folders(parent_folder_id);

        CREATE TABLE IF NOT EXISTS files (
            id TEXT PRIMARY KEY,
            folder_id TEXT NOT NULL REFERENCES folders(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            path TEXT NOT NULL,
            content TEXT NOT NULL,
            summary TEXT NOT NULL,
            usage TEXT NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE (folder_id, path)
        );

        CREATE INDEX IF NOT EXISTS idx_files_folder ON files(folder_id);
        "#,
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_version_set() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);

        // Re-running is a no-op
        initialize_schema(&conn).unwrap();
    }

    #[test]
    fn test_newer_schema_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        set_schema_version(&conn, SCHEMA_VERSION + 1).unwrap();
        assert!(matches!(
            initialize_schema(&conn),
            Err(DbError::Migration(_))
        ));
    }
}
