//! # jobpool-core
//!
//! Core crate for jobpool. Contains the configuration schemas and the
//! unified error system shared by the entity and worker crates.
//!
//! This crate has **no** internal dependencies on other jobpool crates.

pub mod config;
pub mod error;
pub mod result;

pub use error::AppError;
pub use result::AppResult;
