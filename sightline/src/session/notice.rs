//! Non-blocking user notices.
//!
//! Failure paths in the core never propagate errors to the UI entry points;
//! they degrade to "nothing changes visually" plus a notice the shell may
//! choose to display.

/// A notice for the UI shell, delivered on the session's notice channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserNotice {
    /// A store operation could not reach the backing connection.
    StoreUnavailable {
        /// Which operation failed, for display ("radius query",
        /// "sighting write").
        operation: &'static str,
    },
}

impl std::fmt::Display for UserNotice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserNotice::StoreUnavailable { operation } => {
                write!(f, "{} failed: store unavailable", operation)
            }
        }
    }
}
