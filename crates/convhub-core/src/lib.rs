//! # convhub-core
//!
//! Core crate for ConvHub. Contains the configuration schema and the
//! unified error system shared by the conversion engine and the HTTP layer.
//!
//! This crate has **no** internal dependencies on other ConvHub crates.

pub mod config;
pub mod error;
pub mod result;

pub use error::AppError;
pub use result::AppResult;
