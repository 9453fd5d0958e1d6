//! Repository layer abstractions and SQLite implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts for the claim ledger.
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Every multi-row mutation runs inside one `IMMEDIATE` transaction.
//! - Repository APIs return semantic errors (`TeamNotFound`, ...) in addition
//!   to DB transport errors.

mod error;
mod schema;

pub mod claim_repo;
pub mod problem_statement_repo;
pub mod team_repo;

pub use error::{RepoError, RepoResult};
