//! Read-only data-quality scans over document collections.
//!
//! # Invariants
//! - Scans never write to the store.
//! - Each check is independent; they share no mutable state.

pub mod validation;
