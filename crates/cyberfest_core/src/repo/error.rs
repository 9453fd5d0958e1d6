use crate::db::DbError;
use crate::model::problem_statement::ProblemStatementId;
use crate::model::team::TeamKey;
use crate::model::ValidationError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for ledger persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    TeamNotFound(TeamKey),
    TeamKeyTaken(TeamKey),
    ProblemStatementNotFound(ProblemStatementId),
    ProblemStatementIdTaken(ProblemStatementId),
    /// Team already holds a different problem statement.
    AlreadyClaimedElsewhere {
        team_key: TeamKey,
        held: ProblemStatementId,
    },
    /// Problem statement has no free slot.
    ProblemStatementFull {
        id: ProblemStatementId,
        capacity: u32,
    },
    /// Capacity update would drop below current claims.
    CapacityBelowClaims {
        id: ProblemStatementId,
        capacity: u32,
        claim_count: u32,
    },
    /// Problem statement still has claimants.
    HasClaims(ProblemStatementId),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    InvalidData(String),
}

impl RepoError {
    /// Returns whether the failure came from a competing writer holding the
    /// database lock, so the whole transaction may be retried.
    pub fn is_conflict(&self) -> bool {
        match self {
            Self::Db(err) => err.is_lock_contention(),
            _ => false,
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::TeamNotFound(key) => write!(f, "team not found: {key}"),
            Self::TeamKeyTaken(key) => write!(f, "team key already registered: {key}"),
            Self::ProblemStatementNotFound(id) => write!(f, "problem statement not found: {id}"),
            Self::ProblemStatementIdTaken(id) => {
                write!(f, "problem statement id already exists: {id}")
            }
            Self::AlreadyClaimedElsewhere { team_key, held } => {
                write!(f, "team {team_key} already holds problem statement {held}")
            }
            Self::ProblemStatementFull { id, capacity } => {
                write!(f, "problem statement {id} is full (capacity {capacity})")
            }
            Self::CapacityBelowClaims {
                id,
                capacity,
                claim_count,
            } => write!(
                f,
                "capacity {capacity} for problem statement {id} is below its {claim_count} claims"
            ),
            Self::HasClaims(id) => write!(f, "problem statement {id} still has claims"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "ledger repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "ledger repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "ledger repository requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted ledger data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
