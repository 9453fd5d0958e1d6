//! Team authentication primitives.
//!
//! # Responsibility
//! - Issue and verify salted SHA-256 team credentials.
//!
//! # Invariants
//! - Verification is a pure function of its inputs.
//! - Plaintext passwords are never logged or persisted.

pub mod credential;
