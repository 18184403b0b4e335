//! Parties directory module: suppliers and clients.
//!
//! The stock core only needs existence lookups and the active flag of these
//! records; everything else about a party lives outside this workspace.

pub mod party;

pub use party::{Client, Supplier};
