//! Circulation use-case services.
//!
//! # Responsibility
//! - Wrap repository calls into catalog and lending use-cases.
//! - Emit one structured log event per write.
//!
//! # Invariants
//! - Services never bypass repository validation or normalization.
//! - Services stay storage-agnostic; they only see repository traits.

pub mod catalog_service;
pub mod loan_service;
