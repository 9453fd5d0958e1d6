//! Change-driven ledger snapshots.
//!
//! `LedgerWatch` re-reads problem statement summaries only when another
//! connection has committed since the previous poll. Change detection uses
//! `PRAGMA data_version`, which is per-connection: writes made through the
//! watch's own connection are not reported.

use crate::model::problem_statement::{ProblemStatement, ProblemStatementSummary};
use crate::repo::problem_statement_repo::{
    ProblemStatementRepository, SqliteProblemStatementRepository,
};
use crate::repo::RepoResult;
use log::debug;
use rusqlite::Connection;

pub struct LedgerWatch<'conn> {
    conn: &'conn Connection,
    statements: SqliteProblemStatementRepository<'conn>,
    last_data_version: Option<i64>,
}

impl<'conn> LedgerWatch<'conn> {
    /// Creates a watch on a dedicated, migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        Ok(Self {
            conn,
            statements: SqliteProblemStatementRepository::try_new(conn)?,
            last_data_version: None,
        })
    }

    /// Returns a fresh snapshot on the first call and after any external
    /// commit, else `None`.
    pub fn poll(&mut self) -> RepoResult<Option<Vec<ProblemStatementSummary>>> {
        let data_version: i64 = self
            .conn
            .query_row("PRAGMA data_version;", [], |row| row.get(0))?;
        if self.last_data_version == Some(data_version) {
            return Ok(None);
        }

        let snapshot = self
            .statements
            .list_problem_statements()?
            .iter()
            .map(ProblemStatement::summary)
            .collect::<Vec<_>>();
        self.last_data_version = Some(data_version);
        debug!(
            "event=ledger_watch module=ledger status=changed data_version={} problem_statements={}",
            data_version,
            snapshot.len()
        );
        Ok(Some(snapshot))
    }
}
