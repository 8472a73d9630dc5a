//! Data transfer objects for JSON responses.

pub mod response;
