//! Audio Engine Module
//!
//! Control-plane objects of the engine:
//! - Engine context and listener
//! - Static buffers and streaming sessions
//! - Sources and their playback state machine
//! - The mixing backend seam and its software implementation

pub mod attribute;
pub mod backend;
pub mod buffer;
pub mod context;
pub mod format;
pub mod listener;
mod refill;
pub mod software;
pub mod source;
pub mod stream;

pub use attribute::{coerce_boolean, Truthy, Vec3};
pub use backend::{
    AttributeId, Backend, Decoded, DeviceInfo, NativeHandle, NativeState, QueueStatus,
    SubmitOutcome, Transport,
};
pub use buffer::Buffer;
pub use context::{version, Engine};
pub use format::{detect_format, AudioFormat, Pcm, PcmFormat};
pub use listener::Listener;
pub use software::SoftwareBackend;
pub use source::{Source, SourceState, SourceType};
pub use stream::StreamSession;
