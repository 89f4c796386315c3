//! lauepix-io: Backend channel and file I/O for lauepix.
//!
//! This crate provides the WebSocket channel client with its fixed-delay
//! reconnect loop, and the data URL encoding used to upload experiment files.
//!

pub mod client;
pub mod config;
mod error;
pub mod upload;

pub use client::{ChannelClient, ChannelEvent, ChannelHandle};
pub use config::ChannelConfig;
pub use error::{Error, Result};
pub use upload::{encode_file, EncodedFile};
