//! Forge Retargetable Backend - Common Types and Utilities
//!
//! This crate contains shared types and error definitions used across
//! all components of the Forge assembly-generation backend.

pub mod error;
pub mod types;

pub use error::BackendError;
pub use types::*;
