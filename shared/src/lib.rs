//! Shared types and models for the TradeFlow marketplace
//!
//! This crate contains the domain model and the lifecycle rules for
//! requirements, proposals, orders and reviews. It is used by the backend
//! server and compiled to WebAssembly for client-side form checks.

pub mod error;
pub mod models;
pub mod types;
pub mod validation;

pub use error::*;
pub use models::*;
pub use types::*;
pub use validation::*;
