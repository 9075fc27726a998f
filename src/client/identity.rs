//! Connection identities

use std::fmt;

/// Numeric handle assigned to a connection at registration.
///
/// Identities start at 1, grow by one per registration and are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identity(i32);

impl Identity {
    pub const FIRST: Identity = Identity(1);

    pub fn new(raw: i32) -> Self {
        Self(raw)
    }

    pub fn as_i32(&self) -> i32 {
        self.0
    }

    /// The identity after this one, or `None` at `i32::MAX`.
    pub(crate) fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
