//! The mixing backend seam.
//!
//! The engine core owns validation, lifecycle and the playback state machine.
//! Everything that touches real audio (decoding, hardware queues, effect
//! processing) goes through [`Backend`]. Implementations must be usable from
//! the caller thread and from background refill workers at the same time.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::engine::attribute::Vec3;
use crate::engine::format::{AudioFormat, Pcm, PcmFormat};
use crate::error::Result;

/// Opaque identifier of a backend-side object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NativeHandle(pub u32);

impl NativeHandle {
    /// The listener is addressed through a fixed handle
    pub const LISTENER: NativeHandle = NativeHandle(0);
}

impl fmt::Display for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Attributes applied to backend objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttributeId {
    // Sources and listener
    Gain,
    Pitch,
    Position,
    Velocity,
    Relative,
    Looping,
    OrientationAt,
    OrientationUp,

    // Effect slots
    SlotGain,
    SlotAuto,

    // Reverb
    Density,
    Diffusion,
    ReverbGain,
    HfGain,
    DecayTime,
    HfDecayRatio,
    ReflectionsGain,
    ReflectionsDelay,
    LateGain,
    LateDelay,
    AirAbsorptionHfGain,
    RoomRolloffFactor,
    HfDecayLimited,
}

/// Playback state as reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NativeState {
    #[default]
    NotStarted,
    Playing,
    Paused,
    Stopped,
}

/// Transport commands forwarded to a native source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Play,
    Pause,
    Stop,
    Rewind,
}

/// Result of submitting a streamed chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Queued,
    QueueFull,
}

/// Result of decoding one chunk from a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Data(Vec<u8>),
    EndOfData,
}

/// Occupancy of a native source's chunk queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueStatus {
    /// Chunks currently queued, processed or not
    pub queued: usize,
    /// Queued chunks that have finished playing
    pub processed: usize,
}

/// Properties of an opened output device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub name: String,
    /// Auxiliary sends granted per source
    pub max_auxiliary_sends: usize,
}

/// Capabilities the engine core consumes from a mixing backend
pub trait Backend: Send + Sync {
    // ------------------------------------------------------------------
    // Device
    // ------------------------------------------------------------------

    /// Names of the available output devices
    fn devices(&self) -> Vec<String>;

    /// Open a device (the default one for `None`) requesting auxiliary sends
    fn open_device(&self, name: Option<&str>, auxiliary_sends: usize) -> Result<DeviceInfo>;

    /// Release the device and every object created on it
    fn close_device(&self);

    // ------------------------------------------------------------------
    // Object lifecycle
    // ------------------------------------------------------------------

    fn create_source(&self) -> Result<NativeHandle>;
    fn destroy_source(&self, source: NativeHandle);
    fn create_effect_slot(&self) -> Result<NativeHandle>;
    fn destroy_effect_slot(&self, slot: NativeHandle);
    fn create_reverb(&self) -> Result<NativeHandle>;
    fn destroy_reverb(&self, reverb: NativeHandle);

    // ------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------

    fn apply_scalar(&self, handle: NativeHandle, attribute: AttributeId, value: f32) -> Result<()>;
    fn apply_vector3(&self, handle: NativeHandle, attribute: AttributeId, value: Vec3)
        -> Result<()>;

    // ------------------------------------------------------------------
    // Static data
    // ------------------------------------------------------------------

    /// Decode a whole file into memory
    fn load_pcm(&self, path: &Path, format: AudioFormat) -> Result<Pcm>;

    /// Bind (or unbind with `None`) a static payload to a source
    fn bind_pcm(&self, source: NativeHandle, pcm: Option<Arc<Pcm>>) -> Result<()>;

    // ------------------------------------------------------------------
    // Playback
    // ------------------------------------------------------------------

    fn transport(&self, source: NativeHandle, command: Transport) -> Result<()>;
    fn native_playback_state(&self, source: NativeHandle) -> NativeState;

    // ------------------------------------------------------------------
    // Streaming queue
    // ------------------------------------------------------------------

    fn queue_status(&self, source: NativeHandle) -> QueueStatus;

    /// Remove the oldest processed chunk; `false` when none was processed
    fn unqueue_processed(&self, source: NativeHandle) -> Result<bool>;

    /// Drop every queued chunk, processed or not
    fn clear_queue(&self, source: NativeHandle) -> Result<()>;

    fn submit_chunk(
        &self,
        source: NativeHandle,
        format: PcmFormat,
        data: Vec<u8>,
    ) -> Result<SubmitOutcome>;

    // ------------------------------------------------------------------
    // Stream decoders
    // ------------------------------------------------------------------

    fn open_stream(&self, path: &Path, format: AudioFormat) -> Result<(NativeHandle, PcmFormat)>;
    fn decode_chunk(&self, stream: NativeHandle, max_bytes: usize) -> Result<Decoded>;
    fn rewind_stream(&self, stream: NativeHandle) -> Result<()>;
    fn close_stream(&self, stream: NativeHandle);

    // ------------------------------------------------------------------
    // Effect routing
    // ------------------------------------------------------------------

    /// Load (or unload with `None`) an effect into a slot
    fn bind_effect(&self, slot: NativeHandle, reverb: Option<NativeHandle>) -> Result<()>;

    /// Route (or unroute with `None`) a source's auxiliary send
    fn route_send(&self, source: NativeHandle, index: usize, slot: Option<NativeHandle>)
        -> Result<()>;
}

/// Boolean attributes travel as scalars
pub(crate) fn flag(value: bool) -> f32 {
    if value {
        1.0
    } else {
        0.0
    }
}
