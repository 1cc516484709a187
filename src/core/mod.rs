//! In-memory authoritative store and set codec helpers.

/// `;`-delimited set encoding.
pub mod set;
/// Authoritative record store with typed accessors.
pub mod store;
