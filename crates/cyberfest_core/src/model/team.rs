//! Team (claimant) domain model.
//!
//! # Responsibility
//! - Derive stable team keys from display names.
//! - Define the full team record and its credential-free summary.
//!
//! # Invariants
//! - `TeamKey` values only contain `[a-z0-9-]`, never start or end with `-`,
//!   and are at most `TEAM_KEY_MAX_CHARS` long.
//! - Credential material never appears in `Debug` output or summaries.

use crate::model::problem_statement::ProblemStatementId;
use crate::model::ValidationError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};

/// Maximum length of a normalized team key.
pub const TEAM_KEY_MAX_CHARS: usize = 64;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));
static DISALLOWED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9-]").expect("valid key charset regex"));
static DASH_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"-{2,}").expect("valid dash regex"));

/// Stable team identifier derived from a display name.
///
/// Two display names that differ only in stripped characters map to the same
/// key; credential issuance rejects the second one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TeamKey(String);

impl TeamKey {
    /// Derives a key from a display name (or an already-normalized key).
    pub fn from_display_name(display_name: &str) -> Result<Self, ValidationError> {
        if display_name.trim().is_empty() {
            return Err(ValidationError::EmptyDisplayName);
        }
        normalize_team_key(display_name)
            .map(Self)
            .ok_or_else(|| ValidationError::UnusableTeamName(display_name.trim().to_string()))
    }

    /// Accepts a value only if it is already in normalized form.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        match normalize_team_key(value) {
            Some(normalized) if normalized == value => Ok(Self(normalized)),
            _ => Err(ValidationError::InvalidTeamKey(value.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for TeamKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TeamKey {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TeamKey> for String {
    fn from(value: TeamKey) -> Self {
        value.0
    }
}

/// Normalizes a display name into key form.
///
/// Rules, applied in order:
/// - trim and lowercase;
/// - each whitespace run becomes one `-`;
/// - characters outside `[a-z0-9-]` are dropped;
/// - repeated `-` collapse and leading/trailing `-` are trimmed;
/// - the result is capped at `TEAM_KEY_MAX_CHARS`.
///
/// Returns `None` when nothing usable remains.
pub fn normalize_team_key(display_name: &str) -> Option<String> {
    let lowered = display_name.trim().to_lowercase();
    let dashed = WHITESPACE_RE.replace_all(&lowered, "-");
    let filtered = DISALLOWED_RE.replace_all(&dashed, "");
    let collapsed = DASH_RUN_RE.replace_all(&filtered, "-");
    let capped: String = collapsed
        .trim_matches('-')
        .chars()
        .take(TEAM_KEY_MAX_CHARS)
        .collect();
    let key = capped.trim_end_matches('-');
    if key.is_empty() {
        None
    } else {
        Some(key.to_string())
    }
}

/// Full persisted team record, including credential material.
#[derive(Clone, PartialEq, Eq)]
pub struct Team {
    pub key: TeamKey,
    pub display_name: String,
    /// Lowercase hex salt.
    pub password_salt: String,
    /// Lowercase hex SHA-256 of `salt || ":" || password`.
    pub password_hash: String,
    /// Problem statement currently held, if any.
    pub selected_problem_statement_id: Option<ProblemStatementId>,
    /// Denormalized title of the held problem statement.
    pub selected_problem_statement_title: Option<String>,
    /// Epoch ms creation timestamp.
    pub created_at: i64,
    /// Epoch ms update timestamp.
    pub updated_at: i64,
}

impl Team {
    pub fn summary(&self) -> TeamSummary {
        TeamSummary {
            key: self.key.clone(),
            display_name: self.display_name.clone(),
            selected_problem_statement_id: self.selected_problem_statement_id.clone(),
            selected_problem_statement_title: self.selected_problem_statement_title.clone(),
        }
    }

    pub fn has_selection(&self) -> bool {
        self.selected_problem_statement_id.is_some()
    }
}

impl Debug for Team {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Team")
            .field("key", &self.key)
            .field("display_name", &self.display_name)
            .field("password_salt", &"<redacted>")
            .field("password_hash", &"<redacted>")
            .field(
                "selected_problem_statement_id",
                &self.selected_problem_statement_id,
            )
            .field(
                "selected_problem_statement_title",
                &self.selected_problem_statement_title,
            )
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Input for inserting a new team.
#[derive(Clone, PartialEq, Eq)]
pub struct NewTeam {
    pub key: TeamKey,
    pub display_name: String,
    pub password_salt: String,
    pub password_hash: String,
}

impl Debug for NewTeam {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewTeam")
            .field("key", &self.key)
            .field("display_name", &self.display_name)
            .finish_non_exhaustive()
    }
}

/// Public read model for a team. Never carries salt or hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamSummary {
    pub key: TeamKey,
    pub display_name: String,
    pub selected_problem_statement_id: Option<ProblemStatementId>,
    pub selected_problem_statement_title: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::{normalize_team_key, Team, TeamKey, TEAM_KEY_MAX_CHARS};
    use crate::model::ValidationError;

    #[test]
    fn normalize_lowercases_and_dashes_whitespace() {
        assert_eq!(
            normalize_team_key("  Null  Pointers\tUnited "),
            Some("null-pointers-united".to_string())
        );
    }

    #[test]
    fn normalize_strips_punctuation_and_collapses_dashes() {
        assert_eq!(
            normalize_team_key("Byte--Me! (2026)"),
            Some("byte-me-2026".to_string())
        );
        assert_eq!(normalize_team_key("-- edge --"), Some("edge".to_string()));
    }

    #[test]
    fn normalize_caps_length_without_trailing_dash() {
        let long_name = format!("{} tail", "a".repeat(TEAM_KEY_MAX_CHARS - 1));
        let key = normalize_team_key(&long_name).expect("key should exist");
        assert!(key.len() <= TEAM_KEY_MAX_CHARS);
        assert!(!key.ends_with('-'));
    }

    #[test]
    fn names_differing_only_in_punctuation_collide() {
        let first = TeamKey::from_display_name("Red Team!").unwrap();
        let second = TeamKey::from_display_name("red team").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn from_display_name_rejects_blank_and_unusable_names() {
        assert_eq!(
            TeamKey::from_display_name("   "),
            Err(ValidationError::EmptyDisplayName)
        );
        assert!(matches!(
            TeamKey::from_display_name("!!!"),
            Err(ValidationError::UnusableTeamName(_))
        ));
    }

    #[test]
    fn parse_only_accepts_normalized_keys() {
        assert!(TeamKey::parse("team-7").is_ok());
        assert!(TeamKey::parse("Team 7").is_err());
        assert!(TeamKey::parse("").is_err());
    }

    #[test]
    fn team_debug_output_redacts_credentials() {
        let team = Team {
            key: TeamKey::parse("alpha").unwrap(),
            display_name: "Alpha".to_string(),
            password_salt: "00ff".to_string(),
            password_hash: "deadbeef".to_string(),
            selected_problem_statement_id: None,
            selected_problem_statement_title: None,
            created_at: 0,
            updated_at: 0,
        };
        let rendered = format!("{team:?}");
        assert!(!rendered.contains("deadbeef"));
        assert!(!rendered.contains("00ff"));
        assert!(rendered.contains("<redacted>"));
    }
}
