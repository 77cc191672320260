//! # dealdesk-core
//!
//! Core domain model for the deal-lifecycle engine: entities and their
//! status machines, roles and principals, history records, notification
//! events, the versioned calculator snapshot, and the shared error type.
//!
//! This crate is I/O-free; persistence and transport live in
//! `dealdesk-store` and `dealdesk-server`.

pub mod error;
pub mod models;
pub mod numwords;

pub use error::{DealdeskError, DealdeskResult, ErrorKind, FieldError};
