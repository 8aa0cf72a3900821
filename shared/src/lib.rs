//! Shared types and models for the Food Cost Management Platform
//!
//! This crate contains the domain entities and validation helpers shared
//! between the cost engine and any other components of the system.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
