//! Food Cost Management Platform - cost propagation and versioned-history
//! engine.
//!
//! Tracks purchase costs and derived recipe economics for multi-tenant
//! food-service operations: an append/amend ledger of cost snapshots, a
//! cost propagator over the recipe graph, the mutation pipelines that drive
//! it, and the aggregators that consume it.

pub mod config;
pub mod error;
pub mod events;
pub mod external;
pub mod services;
pub mod store;
