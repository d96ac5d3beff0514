//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls and graph analysis into use-case APIs.
//! - Keep HTTP/CLI layers decoupled from storage details.

pub mod todo_service;
