//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Dependency writes run the cycle guard inside the same transaction as
//!   the edge insert.
//! - Repository APIs return semantic errors (`NotFound`, `Validation`) in
//!   addition to DB transport errors.

pub mod todo_repo;
