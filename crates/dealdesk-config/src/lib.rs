//! # dealdesk-config
//!
//! Configuration schema, environment loading and validation for the
//! dealdesk server and its background schedulers.

pub mod schema;
pub mod validation;

pub use schema::*;
pub use validation::*;
