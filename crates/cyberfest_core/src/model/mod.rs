//! Claim ledger domain model.
//!
//! # Responsibility
//! - Define teams (claimants) and problem statements (claimable items).
//! - Own identifier normalization and record validation rules.
//!
//! # Invariants
//! - A `TeamKey` is always in normalized form.
//! - A problem statement never reports more claims than its capacity.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod problem_statement;
pub mod team;

/// Validation failure for ledger identifiers and records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Display name is blank after trim.
    EmptyDisplayName,
    /// Display name normalizes to an empty team key.
    UnusableTeamName(String),
    /// Persisted or supplied key is not in normalized form.
    InvalidTeamKey(String),
    /// Problem statement id is blank, too long, or uses disallowed characters.
    InvalidProblemStatementId(String),
    /// Problem statement title is blank after trim.
    EmptyTitle,
    /// Capacity must allow at least one team.
    ZeroCapacity,
    /// More claims recorded than capacity allows.
    ClaimCountExceedsCapacity { claim_count: u32, capacity: u32 },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyDisplayName => write!(f, "display name must not be blank"),
            Self::UnusableTeamName(name) => {
                write!(f, "team name `{name}` has no usable characters for a key")
            }
            Self::InvalidTeamKey(key) => write!(f, "invalid team key `{key}`"),
            Self::InvalidProblemStatementId(id) => {
                write!(f, "invalid problem statement id `{id}`")
            }
            Self::EmptyTitle => write!(f, "problem statement title must not be blank"),
            Self::ZeroCapacity => write!(f, "capacity must be at least 1"),
            Self::ClaimCountExceedsCapacity {
                claim_count,
                capacity,
            } => write!(f, "claim count {claim_count} exceeds capacity {capacity}"),
        }
    }
}

impl Error for ValidationError {}
