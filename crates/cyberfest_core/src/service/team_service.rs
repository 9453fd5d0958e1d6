//! Team credential use-case service.
//!
//! # Responsibility
//! - Issue team credentials (key derivation + salted hash).
//! - Authenticate a team by name or key and password.
//!
//! # Invariants
//! - Colliding display names are rejected, never overwritten.
//! - Plaintext passwords, salts and hashes never reach the log.

use crate::auth::credential::{issue_credential, verify_password, CredentialError};
use crate::logging::sanitize_message;
use crate::model::team::{NewTeam, TeamKey, TeamSummary};
use crate::model::ValidationError;
use crate::repo::team_repo::TeamRepository;
use crate::repo::RepoError;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

const MAX_LOGGED_NAME_CHARS: usize = 64;

/// Errors from team credential operations.
#[derive(Debug)]
pub enum TeamServiceError {
    /// Display name is blank or has no usable key characters.
    InvalidName(ValidationError),
    /// Another team already normalizes to the same key.
    TeamKeyTaken(TeamKey),
    /// No team is registered under the key.
    TeamNotFound(TeamKey),
    /// Password mismatch, or stored credential material is unreadable.
    CredentialInvalid,
    /// Credential could not be issued (empty password, RNG failure).
    Credential(CredentialError),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for TeamServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName(err) => write!(f, "{err}"),
            Self::TeamKeyTaken(key) => write!(f, "team key already registered: {key}"),
            Self::TeamNotFound(key) => write!(f, "team not found: {key}"),
            Self::CredentialInvalid => write!(f, "invalid team credentials"),
            Self::Credential(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TeamServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidName(err) => Some(err),
            Self::Credential(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for TeamServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::TeamKeyTaken(key) => Self::TeamKeyTaken(key),
            RepoError::TeamNotFound(key) => Self::TeamNotFound(key),
            RepoError::Validation(err) => Self::InvalidName(err),
            other => Self::Repo(other),
        }
    }
}

/// Team credential service facade.
pub struct TeamService<R: TeamRepository> {
    repo: R,
}

impl<R: TeamRepository> TeamService<R> {
    /// Creates service from repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Issues credentials for a new team and persists them.
    ///
    /// # Contract
    /// - Key is derived with `TeamKey::from_display_name`.
    /// - A fresh 16-byte salt is generated per team.
    /// - Returns the credential-free summary of the new team.
    pub fn issue_credentials(
        &self,
        display_name: &str,
        password: &str,
    ) -> Result<TeamSummary, TeamServiceError> {
        let key = TeamKey::from_display_name(display_name).map_err(TeamServiceError::InvalidName)?;
        let credential = issue_credential(password).map_err(TeamServiceError::Credential)?;

        let new_team = NewTeam {
            key: key.clone(),
            display_name: display_name.trim().to_string(),
            password_salt: credential.salt,
            password_hash: credential.hash,
        };
        match self.repo.create_team(&new_team) {
            Ok(team) => {
                info!(
                    "event=team_issue module=team status=ok team_key={} display_name={}",
                    team.key,
                    sanitize_message(&team.display_name, MAX_LOGGED_NAME_CHARS)
                );
                Ok(team.summary())
            }
            Err(err) => {
                warn!(
                    "event=team_issue module=team status=error team_key={} error={}",
                    key, err
                );
                Err(err.into())
            }
        }
    }

    /// Authenticates a team by display name (or key) and password.
    ///
    /// # Contract
    /// - Unknown team returns `TeamNotFound`.
    /// - Wrong password or malformed stored salt returns `CredentialInvalid`.
    pub fn authenticate(
        &self,
        name_or_key: &str,
        password: &str,
    ) -> Result<TeamSummary, TeamServiceError> {
        let key = TeamKey::from_display_name(name_or_key).map_err(TeamServiceError::InvalidName)?;
        let team = self
            .repo
            .get_team(&key)?
            .ok_or_else(|| TeamServiceError::TeamNotFound(key.clone()))?;

        match verify_password(password, &team.password_salt, &team.password_hash) {
            Ok(true) => {
                info!("event=team_auth module=team status=ok team_key={key}");
                Ok(team.summary())
            }
            Ok(false) => {
                info!(
                    "event=team_auth module=team status=rejected team_key={key} error_code=password_mismatch"
                );
                Err(TeamServiceError::CredentialInvalid)
            }
            Err(err) => {
                warn!(
                    "event=team_auth module=team status=error team_key={key} error_code=stored_credential_unreadable error={err}"
                );
                Err(TeamServiceError::CredentialInvalid)
            }
        }
    }
}
