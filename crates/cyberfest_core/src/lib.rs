//! Core domain logic for the CyberFest problem statement claim desk.
//! This crate is the single source of truth for claim invariants.

pub mod auth;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use auth::credential::{
    hash_password, issue_credential, verify_password, Credential, CredentialError,
};
pub use config::{AppConfig, ClaimConfig, ConfigError};
pub use db::{DbError, RecordStore};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::problem_statement::{
    NewProblemStatement, ProblemStatement, ProblemStatementId, ProblemStatementSummary,
    DEFAULT_CAPACITY,
};
pub use model::team::{Team, TeamKey, TeamSummary};
pub use model::ValidationError;
pub use repo::claim_repo::{
    ClaimOutcome, ClaimRepository, ReleaseOutcome, ResetOutcome, SqliteClaimRepository,
};
pub use repo::problem_statement_repo::{
    ProblemStatementRepository, ProblemStatementUpdate, SqliteProblemStatementRepository,
};
pub use repo::team_repo::{SqliteTeamRepository, TeamRepository};
pub use repo::{RepoError, RepoResult};
pub use service::claim_service::{ClaimError, ClaimService};
pub use service::ledger_service::{
    LedgerService, LedgerServiceError, ProblemStatementFilter, ProblemStatementRequest,
};
pub use service::ledger_watch::LedgerWatch;
pub use service::team_service::{TeamService, TeamServiceError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
        assert_eq!(core_version(), env!("CARGO_PKG_VERSION"));
    }
}
