//! Single-writer async handle and change events.

/// Change notifications emitted by the handle.
pub mod events;
/// Handle and command loop implementation.
pub mod handle;
