//! Data shapes served by the fetch endpoints and scanned by the validator.
//!
//! # Invariants
//! - JSON field names of typed entities are part of the HTTP contract.
//! - Loosely-typed documents are plain JSON objects; field presence is a key
//!   presence check.

pub mod document;
pub mod entity;
