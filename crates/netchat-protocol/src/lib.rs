//! netchat Protocol - Line-oriented wire text
//!
//! This crate renders everything the server writes to a client and
//! classifies every line a client sends. There is no binary framing:
//! a line is the unit of exchange and EOF is the only logout signal.

pub mod message;
pub mod parse;

pub use message::{
    join_announcement, leave_announcement, ServerLine, DEFAULT_GREETING,
    INVALID_USERNAME_NOTICE, NAME_PROMPT, SERVER_FULL_NOTICE, USERNAME_TAKEN_NOTICE,
};
pub use parse::ClientLine;
