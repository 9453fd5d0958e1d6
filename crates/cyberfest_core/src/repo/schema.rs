//! Schema readiness checks shared by SQLite repositories.

use crate::db::migrations::latest_version;
use crate::repo::{RepoError, RepoResult};
use rusqlite::Connection;

/// Rejects connections that are not migrated to the latest schema or lack
/// the given tables/columns.
pub(crate) fn ensure_connection_ready(
    conn: &Connection,
    required: &[(&'static str, &[&'static str])],
) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for &(table, columns) in required {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
        for &column in columns {
            if !table_has_column(conn, table, column)? {
                return Err(RepoError::MissingRequiredColumn { table, column });
            }
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}

pub(crate) const TEAMS_COLUMNS: &[&str] = &[
    "team_key",
    "display_name",
    "password_salt",
    "password_hash",
    "selected_problem_statement_id",
    "selected_problem_statement_title",
    "created_at",
    "updated_at",
];

pub(crate) const PROBLEM_STATEMENTS_COLUMNS: &[&str] = &[
    "id",
    "title",
    "description",
    "category",
    "capacity",
    "claim_count",
    "created_at",
    "updated_at",
];

pub(crate) const CLAIMS_COLUMNS: &[&str] = &["problem_statement_id", "team_key", "claimed_at"];
