//! Route handlers.

pub mod conversions;
pub mod convert;
pub mod form;
pub mod health;
