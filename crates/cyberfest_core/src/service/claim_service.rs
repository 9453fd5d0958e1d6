//! Claim coordinator use-case service.
//!
//! # Responsibility
//! - Run claim, reset and release through the claim repository.
//! - Retry whole transactions on lock contention, up to a bounded count.
//! - Map every failure to one `ClaimError` kind with a fixed user message.
//!
//! # Invariants
//! - A claim resolves to exactly one outcome: committed or typed error.
//! - Only lock contention is retried; rejections return on first sight.
//! - Storage error text never leaks through `ClaimError::user_message`.

use crate::config::ClaimConfig;
use crate::model::problem_statement::ProblemStatementId;
use crate::model::team::TeamKey;
use crate::repo::claim_repo::{ClaimOutcome, ClaimRepository, ReleaseOutcome, ResetOutcome};
use crate::repo::team_repo::TeamRepository;
use crate::repo::{RepoError, RepoResult};
use crate::service::team_service::{TeamService, TeamServiceError};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Claim failure taxonomy.
#[derive(Debug)]
pub enum ClaimError {
    /// Team key does not reference a registered team.
    TeamNotFound(TeamKey),
    /// Problem statement id does not exist.
    ProblemStatementNotFound(ProblemStatementId),
    /// Team already holds a different problem statement.
    AlreadyClaimedElsewhere {
        team_key: TeamKey,
        held: ProblemStatementId,
    },
    /// Problem statement reached its capacity.
    ProblemStatementFull {
        id: ProblemStatementId,
        capacity: u32,
    },
    /// Lock contention persisted through every attempt.
    TransactionConflict { attempts: u32 },
    /// Password mismatch or unreadable stored credential.
    CredentialInvalid,
    /// Any other storage failure.
    Storage(RepoError),
}

impl ClaimError {
    /// Short message safe to show to a team.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::TeamNotFound(_) => "Team not found. Check the team name and try again.",
            Self::ProblemStatementNotFound(_) => "That problem statement does not exist.",
            Self::AlreadyClaimedElsewhere { .. } => {
                "Your team has already selected a different problem statement."
            }
            Self::ProblemStatementFull { .. } => {
                "This problem statement is full. Please choose another one."
            }
            Self::TransactionConflict { .. } => {
                "Many teams are selecting right now. Please try again."
            }
            Self::CredentialInvalid => "Invalid team name or password.",
            Self::Storage(_) => "Your selection could not be saved. Please try again later.",
        }
    }

    /// Stable machine-readable kind used in logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::TeamNotFound(_) => "team_not_found",
            Self::ProblemStatementNotFound(_) => "problem_statement_not_found",
            Self::AlreadyClaimedElsewhere { .. } => "already_claimed_elsewhere",
            Self::ProblemStatementFull { .. } => "problem_statement_full",
            Self::TransactionConflict { .. } => "transaction_conflict",
            Self::CredentialInvalid => "credential_invalid",
            Self::Storage(_) => "storage",
        }
    }

    /// Whether the caller should ask the user to simply try again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransactionConflict { .. })
    }
}

impl Display for ClaimError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TeamNotFound(key) => write!(f, "team not found: {key}"),
            Self::ProblemStatementNotFound(id) => write!(f, "problem statement not found: {id}"),
            Self::AlreadyClaimedElsewhere { team_key, held } => {
                write!(f, "team {team_key} already holds problem statement {held}")
            }
            Self::ProblemStatementFull { id, capacity } => {
                write!(f, "problem statement {id} is full (capacity {capacity})")
            }
            Self::TransactionConflict { attempts } => {
                write!(f, "transaction conflict persisted after {attempts} attempt(s)")
            }
            Self::CredentialInvalid => write!(f, "invalid team credentials"),
            Self::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ClaimError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ClaimError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::TeamNotFound(key) => Self::TeamNotFound(key),
            RepoError::ProblemStatementNotFound(id) => Self::ProblemStatementNotFound(id),
            RepoError::AlreadyClaimedElsewhere { team_key, held } => {
                Self::AlreadyClaimedElsewhere { team_key, held }
            }
            RepoError::ProblemStatementFull { id, capacity } => {
                Self::ProblemStatementFull { id, capacity }
            }
            other => Self::Storage(other),
        }
    }
}

impl From<TeamServiceError> for ClaimError {
    fn from(value: TeamServiceError) -> Self {
        match value {
            TeamServiceError::TeamNotFound(key) => Self::TeamNotFound(key),
            TeamServiceError::Repo(err) => Self::Storage(err),
            TeamServiceError::InvalidName(_)
            | TeamServiceError::CredentialInvalid
            | TeamServiceError::Credential(_)
            | TeamServiceError::TeamKeyTaken(_) => Self::CredentialInvalid,
        }
    }
}

/// Claim coordinator facade.
pub struct ClaimService<R: ClaimRepository> {
    repo: R,
    config: ClaimConfig,
}

impl<R: ClaimRepository> ClaimService<R> {
    /// Creates service from repository implementation and retry policy.
    pub fn new(repo: R, config: ClaimConfig) -> Self {
        Self { repo, config }
    }

    pub fn config(&self) -> &ClaimConfig {
        &self.config
    }

    /// Claims problem statement `id` for an already authenticated team.
    ///
    /// # Contract
    /// - Re-claiming the held problem statement succeeds with
    ///   `newly_claimed == false` and changes no membership.
    /// - Lock contention retries the whole transaction; exhaustion returns
    ///   `TransactionConflict`.
    pub fn claim(
        &self,
        team_key: &TeamKey,
        id: &ProblemStatementId,
    ) -> Result<ClaimOutcome, ClaimError> {
        let started_at = Instant::now();
        let result = self.with_retry("claim", || self.repo.claim(team_key, id));
        match &result {
            Ok(outcome) => info!(
                "event=claim module=claim status=ok team_key={} problem_statement_id={} newly_claimed={} claim_count={} capacity={} duration_ms={}",
                team_key,
                id,
                outcome.newly_claimed,
                outcome.claim_count,
                outcome.capacity,
                started_at.elapsed().as_millis()
            ),
            Err(err) => log_failure("claim", team_key.as_str(), id.as_str(), err, started_at),
        }
        result
    }

    /// Authenticates with name + password, then claims.
    pub fn claim_as<T: TeamRepository>(
        &self,
        teams: &TeamService<T>,
        name_or_key: &str,
        password: &str,
        id: &ProblemStatementId,
    ) -> Result<ClaimOutcome, ClaimError> {
        let team = teams.authenticate(name_or_key, password)?;
        self.claim(&team.key, id)
    }

    /// Clears every claim on `id` and the matching team selections.
    pub fn reset_claims(&self, id: &ProblemStatementId) -> Result<ResetOutcome, ClaimError> {
        let started_at = Instant::now();
        let result = self.with_retry("claim_reset", || self.repo.reset_claims(id));
        match &result {
            Ok(outcome) => info!(
                "event=claim_reset module=claim status=ok problem_statement_id={} released={} duration_ms={}",
                id,
                outcome.released_teams.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => log_failure("claim_reset", "-", id.as_str(), err, started_at),
        }
        result
    }

    /// Clears one team's selection so it can claim again.
    pub fn release_team(&self, team_key: &TeamKey) -> Result<ReleaseOutcome, ClaimError> {
        let started_at = Instant::now();
        let result = self.with_retry("claim_release", || self.repo.release_team(team_key));
        match &result {
            Ok(outcome) => info!(
                "event=claim_release module=claim status=ok team_key={} released_from={} duration_ms={}",
                team_key,
                outcome
                    .released_from
                    .as_ref()
                    .map_or("-", ProblemStatementId::as_str),
                started_at.elapsed().as_millis()
            ),
            Err(err) => log_failure("claim_release", team_key.as_str(), "-", err, started_at),
        }
        result
    }

    fn with_retry<T, F>(&self, event: &'static str, mut attempt_once: F) -> Result<T, ClaimError>
    where
        F: FnMut() -> RepoResult<T>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match attempt_once() {
                Ok(value) => return Ok(value),
                Err(err) if err.is_conflict() => {
                    if attempt >= max_attempts {
                        return Err(ClaimError::TransactionConflict { attempts: attempt });
                    }
                    warn!(
                        "event={event} module=claim status=retry attempt={attempt} max_attempts={max_attempts}"
                    );
                    std::thread::sleep(self.config.backoff_for(attempt));
                    attempt += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

fn log_failure(
    event: &str,
    team_key: &str,
    problem_statement_id: &str,
    err: &ClaimError,
    started_at: Instant,
) {
    match err {
        ClaimError::Storage(_) | ClaimError::TransactionConflict { .. } => error!(
            "event={} module=claim status=error team_key={} problem_statement_id={} error_code={} duration_ms={} error={}",
            event,
            team_key,
            problem_statement_id,
            err.code(),
            started_at.elapsed().as_millis(),
            err
        ),
        _ => info!(
            "event={} module=claim status=rejected team_key={} problem_statement_id={} error_code={} duration_ms={}",
            event,
            team_key,
            problem_statement_id,
            err.code(),
            started_at.elapsed().as_millis()
        ),
    }
}
