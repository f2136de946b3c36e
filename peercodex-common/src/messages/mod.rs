mod inputs;
mod outputs;

pub use inputs::*;
pub use outputs::*;

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum ErrorType {
    IncorrectlyFormed,
    InvalidMessage,
    OutOfDate,
    InvalidState,
    MissingHeader,
    ConflictWithExisting,

    IncorrectCredential,
    TokenExpired,
    TokenMissing,
    WrongTokenType,

    UserDisallowed,
    PendingAction,
    NotEnoughPoints,

    UserDoesNotExist,
    RequestDoesNotExist,
    ListingDoesNotExist,

    InputTooLarge,
    TooManyRequests,

    InternalError,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ServerErrorResponse {
    pub err_type: ErrorType,
    pub err_message: String,
}

/// Whole seconds since the Unix epoch. Times before the epoch come out as zero.
pub fn unix_secs(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
