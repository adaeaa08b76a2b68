//! Use-case services over the store clients.
//!
//! # Responsibility
//! - Orchestrate store reads and snapshot side effects per entity type.
//! - Keep HTTP and CLI layers decoupled from driver details.

pub mod fetch_service;
