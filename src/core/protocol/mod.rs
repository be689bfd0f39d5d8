// src/core/protocol/mod.rs

pub mod request;
pub mod resp_frame;
pub use request::{Incoming, Request, RequestCodec};
pub use resp_frame::{RespFrame, RespFrameCodec};
