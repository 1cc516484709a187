//! Runtime event stream payloads.

/// Events emitted from the single-writer command loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefEvent {
    /// A record was created or its value changed.
    Changed {
        /// Affected key.
        key: String,
    },
    /// A record was deleted.
    Removed {
        /// Deleted key.
        key: String,
    },
    /// An explicit save completed.
    Saved,
}
