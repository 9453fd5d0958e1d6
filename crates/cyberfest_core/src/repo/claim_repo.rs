//! Claim repository: transactional claim, reset and release.
//!
//! # Responsibility
//! - Run each claim as one read-validate-write unit inside an `IMMEDIATE`
//!   SQLite transaction.
//! - Keep `problem_statement_claims`, `problem_statements.claim_count` and
//!   `teams.selected_*` in agreement.
//!
//! # Invariants
//! - `claim_count <= capacity` after every commit.
//! - A team appears in at most one claim set and its `selected_*` columns
//!   mirror that membership.
//! - A rejected claim rolls back without any write.

use crate::model::problem_statement::{ProblemStatement, ProblemStatementId};
use crate::model::team::TeamKey;
use crate::repo::problem_statement_repo::load_problem_statement;
use crate::repo::schema::{
    ensure_connection_ready, CLAIMS_COLUMNS, PROBLEM_STATEMENTS_COLUMNS, TEAMS_COLUMNS,
};
use crate::repo::team_repo::load_team;
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};

/// Result of a successful claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimOutcome {
    pub team_key: TeamKey,
    pub problem_statement_id: ProblemStatementId,
    pub title: String,
    /// Claim count after commit.
    pub claim_count: u32,
    pub capacity: u32,
    /// `false` when the team already held this problem statement.
    pub newly_claimed: bool,
}

/// Result of clearing one problem statement's claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetOutcome {
    pub problem_statement_id: ProblemStatementId,
    /// Teams removed from the claim set, in claim order (insertion order
    /// breaks ties within one `claimed_at` second).
    pub released_teams: Vec<TeamKey>,
}

/// Result of clearing one team's selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseOutcome {
    pub team_key: TeamKey,
    /// Problem statement the team was released from, if it held one.
    pub released_from: Option<ProblemStatementId>,
}

/// Repository interface for claim mutations.
///
/// Every method is a single transaction. Lock contention surfaces as a
/// `RepoError` whose `is_conflict()` is true; callers decide whether to retry.
pub trait ClaimRepository {
    /// Associates `team_key` with problem statement `id`.
    fn claim(&self, team_key: &TeamKey, id: &ProblemStatementId) -> RepoResult<ClaimOutcome>;
    /// Removes every claim on `id` and clears the matching team selections.
    fn reset_claims(&self, id: &ProblemStatementId) -> RepoResult<ResetOutcome>;
    /// Clears one team's selection and its claim row.
    fn release_team(&self, team_key: &TeamKey) -> RepoResult<ReleaseOutcome>;
}

/// SQLite-backed claim repository.
pub struct SqliteClaimRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteClaimRepository<'conn> {
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

impl ClaimRepository for SqliteClaimRepository<'_> {
    fn claim(&self, team_key: &TeamKey, id: &ProblemStatementId) -> RepoResult<ClaimOutcome> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let team = load_team(&tx, team_key)?;
        let statement = load_problem_statement(&tx, id)?;
        let Some(team) = team else {
            return Err(RepoError::TeamNotFound(team_key.clone()));
        };
        let Some(statement) = statement else {
            return Err(RepoError::ProblemStatementNotFound(id.clone()));
        };

        if let Some(held) = team.selected_problem_statement_id.as_ref() {
            if held != id {
                return Err(RepoError::AlreadyClaimedElsewhere {
                    team_key: team_key.clone(),
                    held: held.clone(),
                });
            }
        }

        let newly_claimed = if statement.is_claimed_by(team_key) {
            false
        } else {
            ensure_slot_available(&statement)?;
            tx.execute(
                "INSERT INTO problem_statement_claims (problem_statement_id, team_key)
                 VALUES (?1, ?2);",
                params![id.as_str(), team_key.as_str()],
            )?;
            true
        };

        let claim_count = recount_claims(&tx, id)?;
        tx.execute(
            "UPDATE teams
             SET
                selected_problem_statement_id = ?2,
                selected_problem_statement_title = ?3,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE team_key = ?1;",
            params![team_key.as_str(), id.as_str(), statement.title.as_str()],
        )?;
        tx.commit()?;

        Ok(ClaimOutcome {
            team_key: team_key.clone(),
            problem_statement_id: id.clone(),
            title: statement.title,
            claim_count,
            capacity: statement.capacity,
            newly_claimed,
        })
    }

    fn reset_claims(&self, id: &ProblemStatementId) -> RepoResult<ResetOutcome> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let statement = load_problem_statement(&tx, id)?
            .ok_or_else(|| RepoError::ProblemStatementNotFound(id.clone()))?;

        tx.execute(
            "DELETE FROM problem_statement_claims WHERE problem_statement_id = ?1;",
            [id.as_str()],
        )?;
        recount_claims(&tx, id)?;

        for team_key in &statement.claimants {
            tx.execute(
                "UPDATE teams
                 SET
                    selected_problem_statement_id = NULL,
                    selected_problem_statement_title = NULL,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE team_key = ?1
                   AND selected_problem_statement_id = ?2;",
                params![team_key.as_str(), id.as_str()],
            )?;
        }
        tx.commit()?;

        Ok(ResetOutcome {
            problem_statement_id: id.clone(),
            released_teams: statement.claimants,
        })
    }

    fn release_team(&self, team_key: &TeamKey) -> RepoResult<ReleaseOutcome> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let team = load_team(&tx, team_key)?
            .ok_or_else(|| RepoError::TeamNotFound(team_key.clone()))?;

        let claimed_in = claimed_problem_statement(&tx, team_key)?;
        if let Some(claimed_id) = claimed_in.as_ref() {
            tx.execute(
                "DELETE FROM problem_statement_claims WHERE team_key = ?1;",
                [team_key.as_str()],
            )?;
            recount_claims(&tx, claimed_id)?;
        }

        if team.has_selection() {
            tx.execute(
                "UPDATE teams
                 SET
                    selected_problem_statement_id = NULL,
                    selected_problem_statement_title = NULL,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE team_key = ?1;",
                [team_key.as_str()],
            )?;
        }
        tx.commit()?;

        Ok(ReleaseOutcome {
            team_key: team_key.clone(),
            released_from: claimed_in.or(team.selected_problem_statement_id),
        })
    }
}

fn ensure_slot_available(statement: &ProblemStatement) -> RepoResult<()> {
    if statement.has_availability() {
        Ok(())
    } else {
        Err(RepoError::ProblemStatementFull {
            id: statement.id.clone(),
            capacity: statement.capacity,
        })
    }
}

/// Rewrites the denormalized `claim_count` from claim rows and returns it.
fn recount_claims(tx: &Transaction<'_>, id: &ProblemStatementId) -> RepoResult<u32> {
    tx.execute(
        "UPDATE problem_statements
         SET
            claim_count = (
                SELECT COUNT(*)
                FROM problem_statement_claims
                WHERE problem_statement_id = ?1
            ),
            updated_at = (strftime('%s', 'now') * 1000)
         WHERE id = ?1;",
        [id.as_str()],
    )?;
    let claim_count: u32 = tx.query_row(
        "SELECT claim_count FROM problem_statements WHERE id = ?1;",
        [id.as_str()],
        |row| row.get(0),
    )?;
    Ok(claim_count)
}

fn claimed_problem_statement(
    tx: &Transaction<'_>,
    team_key: &TeamKey,
) -> RepoResult<Option<ProblemStatementId>> {
    let value: Option<String> = tx
        .query_row(
            "SELECT problem_statement_id
             FROM problem_statement_claims
             WHERE team_key = ?1;",
            [team_key.as_str()],
            |row| row.get(0),
        )
        .optional()?;

    value
        .map(|text| {
            ProblemStatementId::parse(&text).map_err(|_| {
                RepoError::InvalidData(format!(
                    "invalid problem statement id `{text}` in problem_statement_claims"
                ))
            })
        })
        .transpose()
}
