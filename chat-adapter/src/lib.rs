//! Rust adapter for the vault chat endpoint.
//!
//! The endpoint answers a [`ChatRequest`] with a body of newline-delimited
//! `data:` records. [`HttpChatTransport`] opens that body as a byte stream and
//! [`FrameDecoder`] turns the bytes into [`StreamFrame`]s.

pub mod decoder;
pub mod error;
pub mod transport;
pub mod types;

pub use decoder::{FrameDecoder, Record, STREAM_TERMINATOR};
pub use error::ChatError;
pub use transport::{ByteStream, ChatTransport, HttpChatTransport};
pub use types::*;
