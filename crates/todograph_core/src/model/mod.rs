//! Domain model for todo tasks and dependency links.
//!
//! # Responsibility
//! - Define canonical records shared by repository, graph and service layers.
//! - Own input validation that does not require storage access.
//!
//! # Invariants
//! - Every task is identified by a storage-assigned `TodoId`.
//! - Deletion is a hard delete; dependency references may dangle afterwards.

pub mod todo;
