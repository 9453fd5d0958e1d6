//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Map repository failures to typed, caller-facing errors.
//! - Keep CLI/UI layers decoupled from storage details.

pub mod claim_service;
pub mod ledger_service;
pub mod ledger_watch;
pub mod team_service;
