//! Pool result types
//!
//! Defines the outcomes of an admission attempt.

/// Result of [`CollectionPool::try_admit`](super::CollectionPool::try_admit)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmitResult {
    /// The value was inserted and credited to the submitter.
    ///
    /// `filled` is true for exactly one admission per pool: the one that
    /// brought the pool to capacity.
    Admitted { filled: bool },
    /// The value was already admitted; nothing changed.
    Duplicate,
    /// The pool was already at capacity; nothing changed.
    Full,
}
