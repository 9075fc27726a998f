//! Response codes
//!
//! Defines the 4-byte codes the collector answers each submission with.

/// Standard response codes
pub const ACCEPTED: i32 = 1;
pub const DUPLICATE: i32 = 0;
pub const COMPLETION: i32 = -1;
pub const ABORT: i32 = -2;
pub const INVALID_SIGNATURE: i32 = -3;

/// Outcome of one submission as seen by the producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseCode {
    /// The value was admitted.
    Accepted,
    /// The value was already in the pool.
    Duplicate,
    /// The signature did not verify against the registered key.
    InvalidSignature,
    /// The value filled the pool; the receiving producer should stop.
    Completion,
    /// Another producer filled the pool; the receiving producer should stop.
    Abort,
}

impl ResponseCode {
    pub fn code(self) -> i32 {
        match self {
            ResponseCode::Accepted => ACCEPTED,
            ResponseCode::Duplicate => DUPLICATE,
            ResponseCode::InvalidSignature => INVALID_SIGNATURE,
            ResponseCode::Completion => COMPLETION,
            ResponseCode::Abort => ABORT,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            ACCEPTED => Some(ResponseCode::Accepted),
            DUPLICATE => Some(ResponseCode::Duplicate),
            INVALID_SIGNATURE => Some(ResponseCode::InvalidSignature),
            COMPLETION => Some(ResponseCode::Completion),
            ABORT => Some(ResponseCode::Abort),
            _ => None,
        }
    }

    /// Completion and Abort end the conversation.
    pub fn is_terminal(self) -> bool {
        matches!(self, ResponseCode::Completion | ResponseCode::Abort)
    }
}
