//! HTTP transport for the remote training engine
//!
//! One-shot requests go through `reqwest`; push topics are read as
//! server-sent events through [`SseCodec`].

mod engine;
mod sse;

pub use engine::HttpEngine;
pub use sse::{SseCodec, SseFrame};
