//! Problem statement repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide admin CRUD over `problem_statements`.
//! - Load problem statements together with their ordered claimant keys.
//!
//! # Invariants
//! - Capacity may never drop below the current `claim_count`.
//! - A problem statement with claims cannot be deleted.
//! - A title change is mirrored into `teams.selected_problem_statement_title`
//!   in the same transaction.
//! - Read paths reject rows whose `claim_count` disagrees with claim rows.

use crate::model::problem_statement::{NewProblemStatement, ProblemStatement, ProblemStatementId};
use crate::model::team::TeamKey;
use crate::model::ValidationError;
use crate::repo::schema::{
    ensure_connection_ready, CLAIMS_COLUMNS, PROBLEM_STATEMENTS_COLUMNS, TEAMS_COLUMNS,
};
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};

const PROBLEM_STATEMENT_SELECT_SQL: &str = "SELECT
    id,
    title,
    description,
    category,
    capacity,
    claim_count,
    created_at,
    updated_at
FROM problem_statements";

/// Partial update for one problem statement. `None` leaves a field as is;
/// `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProblemStatementUpdate {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub category: Option<Option<String>>,
    pub capacity: Option<u32>,
}

impl ProblemStatementUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.capacity.is_none()
    }
}

/// Repository interface for problem statement administration and reads.
pub trait ProblemStatementRepository {
    /// Inserts a problem statement with zero claims.
    fn create_problem_statement(&self, input: &NewProblemStatement)
        -> RepoResult<ProblemStatement>;
    /// Applies a partial update and returns the updated record.
    fn update_problem_statement(
        &self,
        id: &ProblemStatementId,
        update: &ProblemStatementUpdate,
    ) -> RepoResult<ProblemStatement>;
    /// Deletes a problem statement that has no claims.
    fn delete_problem_statement(&self, id: &ProblemStatementId) -> RepoResult<()>;
    /// Loads one problem statement by id.
    fn get_problem_statement(&self, id: &ProblemStatementId)
        -> RepoResult<Option<ProblemStatement>>;
    /// Lists all problem statements ordered by id.
    fn list_problem_statements(&self) -> RepoResult<Vec<ProblemStatement>>;
}

/// SQLite-backed problem statement repository.
pub struct SqliteProblemStatementRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProblemStatementRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(
            conn,
            &[
                ("teams", TEAMS_COLUMNS),
                ("problem_statements", PROBLEM_STATEMENTS_COLUMNS),
                ("problem_statement_claims", CLAIMS_COLUMNS),
            ],
        )?;
        Ok(Self { conn })
    }
}

impl ProblemStatementRepository for SqliteProblemStatementRepository<'_> {
    fn create_problem_statement(
        &self,
        input: &NewProblemStatement,
    ) -> RepoResult<ProblemStatement> {
        input.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if load_problem_statement(&tx, &input.id)?.is_some() {
            return Err(RepoError::ProblemStatementIdTaken(input.id.clone()));
        }

        tx.execute(
            "INSERT INTO problem_statements (
                id,
                title,
                description,
                category,
                capacity,
                claim_count
            ) VALUES (?1, ?2, ?3, ?4, ?5, 0);",
            params![
                input.id.as_str(),
                input.title.trim(),
                normalize_optional_text(input.description.as_deref()),
                normalize_optional_text(input.category.as_deref()),
                input.capacity,
            ],
        )?;

        let created = load_required(&tx, &input.id)?;
        tx.commit()?;
        Ok(created)
    }

    fn update_problem_statement(
        &self,
        id: &ProblemStatementId,
        update: &ProblemStatementUpdate,
    ) -> RepoResult<ProblemStatement> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let current = load_required(&tx, id)?;

        let title = match update.title.as_deref() {
            Some(value) if value.trim().is_empty() => {
                return Err(ValidationError::EmptyTitle.into())
            }
            Some(value) => value.trim().to_string(),
            None => current.title.clone(),
        };
        let capacity = match update.capacity {
            Some(0) => return Err(ValidationError::ZeroCapacity.into()),
            Some(value) if value < current.claim_count => {
                return Err(RepoError::CapacityBelowClaims {
                    id: id.clone(),
                    capacity: value,
                    claim_count: current.claim_count,
                });
            }
            Some(value) => value,
            None => current.capacity,
        };
        let description = match &update.description {
            Some(value) => normalize_optional_text(value.as_deref()),
            None => current.description.clone(),
        };
        let category = match &update.category {
            Some(value) => normalize_optional_text(value.as_deref()),
            None => current.category.clone(),
        };

        tx.execute(
            "UPDATE problem_statements
             SET
                title = ?2,
                description = ?3,
                category = ?4,
                capacity = ?5,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![id.as_str(), title, description, category, capacity],
        )?;

        if title != current.title {
            tx.execute(
                "UPDATE teams
                 SET
                    selected_problem_statement_title = ?2,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE selected_problem_statement_id = ?1;",
                params![id.as_str(), title],
            )?;
        }

        let updated = load_required(&tx, id)?;
        tx.commit()?;
        Ok(updated)
    }

    fn delete_problem_statement(&self, id: &ProblemStatementId) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let current = load_required(&tx, id)?;
        if current.claim_count > 0 {
            return Err(RepoError::HasClaims(id.clone()));
        }

        tx.execute(
            "DELETE FROM problem_statements WHERE id = ?1;",
            [id.as_str()],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn get_problem_statement(
        &self,
        id: &ProblemStatementId,
    ) -> RepoResult<Option<ProblemStatement>> {
        // Row and claimant reads must see one snapshot.
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Deferred)?;
        let statement = load_problem_statement(&tx, id)?;
        tx.commit()?;
        Ok(statement)
    }

    fn list_problem_statements(&self) -> RepoResult<Vec<ProblemStatement>> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Deferred)?;
        let statements = {
            let mut stmt = tx.prepare(&format!("{PROBLEM_STATEMENT_SELECT_SQL} ORDER BY id ASC;"))?;
            let mut rows = stmt.query([])?;
            let mut statements = Vec::new();
            while let Some(row) = rows.next()? {
                let mut statement = parse_problem_statement_row(row)?;
                statement.claimants = load_claimants(&tx, &statement.id)?;
                check_loaded(&statement)?;
                statements.push(statement);
            }
            statements
        };
        tx.commit()?;
        Ok(statements)
    }
}

/// Loads one problem statement with claimants. Callers run it inside a
/// transaction so the row and its claim rows come from one snapshot.
pub(crate) fn load_problem_statement(
    conn: &Connection,
    id: &ProblemStatementId,
) -> RepoResult<Option<ProblemStatement>> {
    let row = conn
        .query_row(
            &format!("{PROBLEM_STATEMENT_SELECT_SQL} WHERE id = ?1;"),
            [id.as_str()],
            |row| Ok(parse_problem_statement_row(row)),
        )
        .optional()?;

    let Some(statement) = row.transpose()? else {
        return Ok(None);
    };
    let mut statement = statement;
    statement.claimants = load_claimants(conn, &statement.id)?;
    check_loaded(&statement)?;
    Ok(Some(statement))
}

fn load_required(conn: &Connection, id: &ProblemStatementId) -> RepoResult<ProblemStatement> {
    load_problem_statement(conn, id)?
        .ok_or_else(|| RepoError::ProblemStatementNotFound(id.clone()))
}

fn load_claimants(conn: &Connection, id: &ProblemStatementId) -> RepoResult<Vec<TeamKey>> {
    let mut stmt = conn.prepare(
        "SELECT team_key
         FROM problem_statement_claims
         WHERE problem_statement_id = ?1
         ORDER BY claimed_at ASC, rowid ASC;",
    )?;
    let mut rows = stmt.query([id.as_str()])?;
    let mut claimants = Vec::new();
    while let Some(row) = rows.next()? {
        let value: String = row.get(0)?;
        let key = TeamKey::parse(&value).map_err(|_| {
            RepoError::InvalidData(format!(
                "invalid team key `{value}` in problem_statement_claims.team_key"
            ))
        })?;
        claimants.push(key);
    }
    Ok(claimants)
}

fn parse_problem_statement_row(row: &Row<'_>) -> RepoResult<ProblemStatement> {
    let id_text: String = row.get("id")?;
    let id = ProblemStatementId::parse(&id_text).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid problem statement id `{id_text}` in problem_statements.id"
        ))
    })?;

    Ok(ProblemStatement {
        id,
        title: row.get("title")?,
        description: row.get("description")?,
        category: row.get("category")?,
        capacity: row.get("capacity")?,
        claim_count: row.get("claim_count")?,
        claimants: Vec::new(),
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn check_loaded(statement: &ProblemStatement) -> RepoResult<()> {
    statement.validate().map_err(|err| {
        RepoError::InvalidData(format!("problem statement `{}`: {err}", statement.id))
    })?;
    if statement.claimants.len() != statement.claim_count as usize {
        return Err(RepoError::InvalidData(format!(
            "problem statement `{}` claim_count {} disagrees with {} claim rows",
            statement.id,
            statement.claim_count,
            statement.claimants.len()
        )));
    }
    Ok(())
}

fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}
