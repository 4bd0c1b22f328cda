//! HTTP control API

pub mod handlers;
pub mod server;
pub mod sse;
