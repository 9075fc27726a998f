//! Collector wire protocol
//!
//! Handles framing of keys, identities, submissions and response codes.

pub mod codec;
pub mod responses;

pub use codec::{
    Submission, read_identity, read_public_key, read_response, read_submission, write_identity,
    write_response, write_submission,
};
pub use responses::ResponseCode;
