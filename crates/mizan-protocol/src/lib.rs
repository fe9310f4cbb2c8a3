pub mod encoder;
pub mod frames;
pub mod sse;

pub use encoder::FrameEncoder;
pub use frames::{FramePayload, StreamFrame};
