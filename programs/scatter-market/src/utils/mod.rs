//! Shared utilities

pub mod keys;
pub mod validation;
pub mod version;
pub mod writers;
