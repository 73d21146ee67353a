//! # gsad-core
//!
//! Core crate for the Greenbone Security Assistant daemon. Contains the
//! configuration schema and the unified error system used at the process
//! boundary.
//!
//! This crate has **no** internal dependencies on other gsad crates.

pub mod config;
pub mod error;
pub mod result;

pub use config::AppConfig;
pub use error::AppError;
pub use result::AppResult;
