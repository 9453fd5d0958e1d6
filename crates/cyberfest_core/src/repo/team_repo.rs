//! Team repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist issued team credentials.
//! - Load full team records for authentication and summaries.
//!
//! # Invariants
//! - `team_key` is unique; inserting a taken key fails with `TeamKeyTaken`
//!   and never overwrites the existing credential.
//! - Read paths reject persisted rows with malformed keys or ids.

use crate::model::problem_statement::ProblemStatementId;
use crate::model::team::{NewTeam, Team, TeamKey};
use crate::model::ValidationError;
use crate::repo::schema::{ensure_connection_ready, TEAMS_COLUMNS};
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};

const TEAM_SELECT_SQL: &str = "SELECT
    team_key,
    display_name,
    password_salt,
    password_hash,
    selected_problem_statement_id,
    selected_problem_statement_title,
    created_at,
    updated_at
FROM teams";

/// Repository interface for team records.
pub trait TeamRepository {
    /// Inserts a new team and returns the persisted record.
    fn create_team(&self, team: &NewTeam) -> RepoResult<Team>;
    /// Loads one team by key.
    fn get_team(&self, key: &TeamKey) -> RepoResult<Option<Team>>;
    /// Lists all teams ordered by key.
    fn list_teams(&self) -> RepoResult<Vec<Team>>;
}

/// SQLite-backed team repository.
pub struct SqliteTeamRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTeamRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &[("teams", TEAMS_COLUMNS)])?;
        Ok(Self { conn })
    }
}

impl TeamRepository for SqliteTeamRepository<'_> {
    fn create_team(&self, team: &NewTeam) -> RepoResult<Team> {
        if team.display_name.trim().is_empty() {
            return Err(ValidationError::EmptyDisplayName.into());
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if load_team(&tx, &team.key)?.is_some() {
            return Err(RepoError::TeamKeyTaken(team.key.clone()));
        }

        tx.execute(
            "INSERT INTO teams (
                team_key,
                display_name,
                password_salt,
                password_hash
            ) VALUES (?1, ?2, ?3, ?4);",
            params![
                team.key.as_str(),
                team.display_name.trim(),
                team.password_salt.as_str(),
                team.password_hash.as_str(),
            ],
        )?;

        let created = load_team(&tx, &team.key)?.ok_or_else(|| {
            RepoError::InvalidData(format!("team `{}` missing after insert", team.key))
        })?;
        tx.commit()?;
        Ok(created)
    }

    fn get_team(&self, key: &TeamKey) -> RepoResult<Option<Team>> {
        load_team(self.conn, key)
    }

    fn list_teams(&self) -> RepoResult<Vec<Team>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TEAM_SELECT_SQL} ORDER BY team_key ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut teams = Vec::new();
        while let Some(row) = rows.next()? {
            teams.push(parse_team_row(row)?);
        }
        Ok(teams)
    }
}

/// Loads one team on any connection or open transaction.
pub(crate) fn load_team(conn: &Connection, key: &TeamKey) -> RepoResult<Option<Team>> {
    let row = conn
        .query_row(
            &format!("{TEAM_SELECT_SQL} WHERE team_key = ?1;"),
            [key.as_str()],
            |row| Ok(parse_team_row(row)),
        )
        .optional()?;
    row.transpose()
}

fn parse_team_row(row: &Row<'_>) -> RepoResult<Team> {
    let key_text: String = row.get("team_key")?;
    let key = TeamKey::parse(&key_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid team key `{key_text}` in teams.team_key"))
    })?;

    let selected_problem_statement_id =
        match row.get::<_, Option<String>>("selected_problem_statement_id")? {
            Some(value) => Some(ProblemStatementId::parse(&value).map_err(|_| {
                RepoError::InvalidData(format!(
                    "invalid problem statement id `{value}` in teams.selected_problem_statement_id"
                ))
            })?),
            None => None,
        };

    Ok(Team {
        key,
        display_name: row.get("display_name")?,
        password_salt: row.get("password_salt")?,
        password_hash: row.get("password_hash")?,
        selected_problem_statement_id,
        selected_problem_statement_title: row.get("selected_problem_statement_title")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
