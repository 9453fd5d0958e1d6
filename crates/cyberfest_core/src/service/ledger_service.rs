//! Claim ledger read side and problem statement administration.
//!
//! # Responsibility
//! - Expose credential-free summaries of teams and problem statements.
//! - Provide admin create/update/delete for problem statements.
//! - Derive filtered views (search, availability) without storing them.
//!
//! # Invariants
//! - Team summaries never carry salt or hash material.
//! - Listings are ordered by id / key.

use crate::model::problem_statement::{
    NewProblemStatement, ProblemStatement, ProblemStatementId, ProblemStatementSummary,
};
use crate::model::team::{TeamKey, TeamSummary};
use crate::model::ValidationError;
use crate::repo::problem_statement_repo::{ProblemStatementRepository, ProblemStatementUpdate};
use crate::repo::team_repo::TeamRepository;
use crate::repo::RepoError;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for ledger reads and problem statement admin.
#[derive(Debug)]
pub enum LedgerServiceError {
    /// Input failed model validation.
    Validation(ValidationError),
    ProblemStatementNotFound(ProblemStatementId),
    ProblemStatementIdTaken(ProblemStatementId),
    /// Requested capacity is below the current number of claims.
    CapacityBelowClaims {
        id: ProblemStatementId,
        capacity: u32,
        claim_count: u32,
    },
    /// Problem statement still has claimants and cannot be deleted.
    HasClaims(ProblemStatementId),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for LedgerServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::ProblemStatementNotFound(id) => write!(f, "problem statement not found: {id}"),
            Self::ProblemStatementIdTaken(id) => {
                write!(f, "problem statement id already exists: {id}")
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
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for LedgerServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for LedgerServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::ProblemStatementNotFound(id) => Self::ProblemStatementNotFound(id),
            RepoError::ProblemStatementIdTaken(id) => Self::ProblemStatementIdTaken(id),
            RepoError::CapacityBelowClaims {
                id,
                capacity,
                claim_count,
            } => Self::CapacityBelowClaims {
                id,
                capacity,
                claim_count,
            },
            RepoError::HasClaims(id) => Self::HasClaims(id),
            other => Self::Repo(other),
        }
    }
}

impl From<ValidationError> for LedgerServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Admin request for a new problem statement. `capacity: None` applies the
/// configured default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProblemStatementRequest {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub capacity: Option<u32>,
}

/// Derived listing filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProblemStatementFilter {
    /// Case-insensitive substring over id, title and category.
    pub query: Option<String>,
    /// Keep only problem statements with a free slot.
    pub only_available: bool,
}

impl ProblemStatementFilter {
    pub fn matches(&self, summary: &ProblemStatementSummary) -> bool {
        if self.only_available && !summary.has_availability {
            return false;
        }
        let Some(needle) = self
            .query
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
        else {
            return true;
        };
        let needle = needle.to_lowercase();
        summary.id.as_str().to_lowercase().contains(&needle)
            || summary.title.to_lowercase().contains(&needle)
            || summary
                .category
                .as_deref()
                .is_some_and(|category| category.to_lowercase().contains(&needle))
    }
}

/// Ledger facade over problem statement and team repositories.
pub struct LedgerService<P: ProblemStatementRepository, T: TeamRepository> {
    statements: P,
    teams: T,
    default_capacity: u32,
}

impl<P: ProblemStatementRepository, T: TeamRepository> LedgerService<P, T> {
    pub fn new(statements: P, teams: T, default_capacity: u32) -> Self {
        Self {
            statements,
            teams,
            default_capacity,
        }
    }

    pub fn create_problem_statement(
        &self,
        request: &ProblemStatementRequest,
    ) -> Result<ProblemStatement, LedgerServiceError> {
        let input = NewProblemStatement {
            id: ProblemStatementId::parse(&request.id)?,
            title: request.title.clone(),
            description: request.description.clone(),
            category: request.category.clone(),
            capacity: request.capacity.unwrap_or(self.default_capacity),
        };
        let created = self.statements.create_problem_statement(&input)?;
        info!(
            "event=problem_statement_create module=ledger status=ok problem_statement_id={} capacity={}",
            created.id, created.capacity
        );
        Ok(created)
    }

    /// Applies a partial update. An empty update returns the current record.
    pub fn update_problem_statement(
        &self,
        id: &ProblemStatementId,
        update: &ProblemStatementUpdate,
    ) -> Result<ProblemStatement, LedgerServiceError> {
        if update.is_empty() {
            return self.get_problem_statement(id);
        }
        let updated = self.statements.update_problem_statement(id, update)?;
        info!(
            "event=problem_statement_update module=ledger status=ok problem_statement_id={} capacity={} claim_count={}",
            updated.id, updated.capacity, updated.claim_count
        );
        Ok(updated)
    }

    pub fn delete_problem_statement(
        &self,
        id: &ProblemStatementId,
    ) -> Result<(), LedgerServiceError> {
        self.statements.delete_problem_statement(id)?;
        info!("event=problem_statement_delete module=ledger status=ok problem_statement_id={id}");
        Ok(())
    }

    pub fn get_problem_statement(
        &self,
        id: &ProblemStatementId,
    ) -> Result<ProblemStatement, LedgerServiceError> {
        self.statements
            .get_problem_statement(id)?
            .ok_or_else(|| LedgerServiceError::ProblemStatementNotFound(id.clone()))
    }

    /// Lists summaries ordered by id.
    pub fn list_problem_statements(
        &self,
    ) -> Result<Vec<ProblemStatementSummary>, LedgerServiceError> {
        Ok(self
            .statements
            .list_problem_statements()?
            .iter()
            .map(ProblemStatement::summary)
            .collect())
    }

    pub fn search_problem_statements(
        &self,
        filter: &ProblemStatementFilter,
    ) -> Result<Vec<ProblemStatementSummary>, LedgerServiceError> {
        let mut summaries = self.list_problem_statements()?;
        summaries.retain(|summary| filter.matches(summary));
        Ok(summaries)
    }

    /// Lists team summaries ordered by key.
    pub fn list_teams(&self) -> Result<Vec<TeamSummary>, LedgerServiceError> {
        Ok(self
            .teams
            .list_teams()?
            .iter()
            .map(|team| team.summary())
            .collect())
    }

    pub fn get_team(&self, key: &TeamKey) -> Result<Option<TeamSummary>, LedgerServiceError> {
        Ok(self.teams.get_team(key)?.map(|team| team.summary()))
    }
}
