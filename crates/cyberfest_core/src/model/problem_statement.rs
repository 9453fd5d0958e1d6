//! Problem statement (claimable item) domain model.
//!
//! # Invariants
//! - `claim_count == claimants.len()` for records read from storage.
//! - `claim_count <= capacity`.

use crate::model::team::TeamKey;
use crate::model::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Teams allowed per problem statement unless configured otherwise.
pub const DEFAULT_CAPACITY: u32 = 3;

/// Maximum length of a problem statement id.
pub const PROBLEM_STATEMENT_ID_MAX_CHARS: usize = 64;

/// Stable problem statement identifier, e.g. `ps-7`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProblemStatementId(String);

impl ProblemStatementId {
    /// Trims and validates a caller-supplied id.
    ///
    /// Allowed characters are ASCII alphanumerics plus `.`, `_` and `-`.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let trimmed = value.trim();
        let valid_chars = trimmed
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-'));
        if trimmed.is_empty()
            || trimmed.chars().count() > PROBLEM_STATEMENT_ID_MAX_CHARS
            || !valid_chars
        {
            return Err(ValidationError::InvalidProblemStatementId(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ProblemStatementId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ProblemStatementId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ProblemStatementId> for String {
    fn from(value: ProblemStatementId) -> Self {
        value.0
    }
}

/// Full persisted problem statement with its current claimants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProblemStatement {
    pub id: ProblemStatementId,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    /// Maximum simultaneous teams.
    pub capacity: u32,
    /// Denormalized number of claimants.
    pub claim_count: u32,
    /// Claimant keys in claim order.
    pub claimants: Vec<TeamKey>,
    /// Epoch ms creation timestamp.
    pub created_at: i64,
    /// Epoch ms update timestamp.
    pub updated_at: i64,
}

impl ProblemStatement {
    /// Checks record-level invariants.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        if self.capacity == 0 {
            return Err(ValidationError::ZeroCapacity);
        }
        if self.claim_count > self.capacity {
            return Err(ValidationError::ClaimCountExceedsCapacity {
                claim_count: self.claim_count,
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    pub fn has_availability(&self) -> bool {
        self.claim_count < self.capacity
    }

    pub fn remaining_slots(&self) -> u32 {
        self.capacity.saturating_sub(self.claim_count)
    }

    pub fn is_claimed_by(&self, team_key: &TeamKey) -> bool {
        self.claimants.contains(team_key)
    }

    pub fn summary(&self) -> ProblemStatementSummary {
        ProblemStatementSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            category: self.category.clone(),
            capacity: self.capacity,
            claim_count: self.claim_count,
            has_availability: self.has_availability(),
        }
    }
}

/// Input for creating a problem statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProblemStatement {
    pub id: ProblemStatementId,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub capacity: u32,
}

impl NewProblemStatement {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        if self.capacity == 0 {
            return Err(ValidationError::ZeroCapacity);
        }
        Ok(())
    }
}

/// Read-side summary exposed by the ledger listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemStatementSummary {
    pub id: ProblemStatementId,
    pub title: String,
    pub category: Option<String>,
    pub capacity: u32,
    pub claim_count: u32,
    pub has_availability: bool,
}
