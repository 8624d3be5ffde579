//! Cartline Core - Shared domain types.
//!
//! This crate provides the types shared by the Cartline components:
//! - `server` - HTTP service owning carts, orders and sessions
//! - `cli` - Command-line tools for migrations, seeding and user management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP. Cart lifecycle rules and order pricing live here so that
//! every storage backend applies exactly the same arithmetic and transitions.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, usernames, quantities, statuses and pricing

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
