//! Multipart HTTP transport for chunked uploads.
//!
//! Implements [`chunkup_transfer::Transport`] on top of `reqwest`.

pub mod client;
pub mod headers;

pub use client::HttpTransport;
pub use headers::{HeaderFn, HeaderSource};
