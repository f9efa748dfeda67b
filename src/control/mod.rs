//! Control protocol.
//!
//! Page contexts send JSON messages (`BULK_CACHE`, `PAGE_CACHE`, `INFO`,
//! `CLEAR`) and receive exactly one reply each. Messages travel over an
//! mpsc channel carrying a oneshot reply port, so the handler never knows
//! who is asking and callers can give up without affecting the handler.
//!
//! Author: kelexine (<https://github.com/kelexine>)

mod channel;
mod handler;
mod messages;

pub use channel::{ControlHandle, ControlReply, ControlRequest};
pub use handler::ControlHandler;
pub(crate) use handler::fetch_into;
pub use messages::{
    BucketInfo, ControlMessage, ControlResult, FailedUrl, UNKNOWN_PAGE_ID, URLS_NOT_ARRAY,
};
