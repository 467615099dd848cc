//! Playback sources.
//!
//! A source plays either a static [`Buffer`] or a [`StreamSession`], never
//! both. Its playback state is tracked here and reconciled with the backend,
//! so a source that runs out of data reads as stopped.
//!
//! Streaming sources keep a queue of decoded chunks. While a streaming
//! source plays with `auto` on, a background worker refills that queue
//! without the caller calling [`Source::update`]. Turning `auto` off does not
//! stop a running worker; the change takes effect at the next
//! [`Source::play`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::EngineConfig;
use crate::effects::EffectSlot;
use crate::engine::attribute::{
    coerce_boolean, validate_int_range, validate_vec3, Bounds, Truthy, Vec3,
};
use crate::engine::backend::{flag, AttributeId, Backend, NativeHandle, NativeState, Transport};
use crate::engine::buffer::Buffer;
use crate::engine::refill::{fill_queue, QueuePlan, Refill};
use crate::engine::stream::StreamSession;
use crate::engine::Engine;
use crate::error::{AudioError, Result};

// ============================================================================
// Queue Constants
// ============================================================================

/// Chunk sizes are multiples of this many bytes
pub const CHUNK_QUANTUM: usize = 9216;

/// Smallest accepted chunk size
pub const MIN_CHUNK_SIZE: usize = CHUNK_QUANTUM;

/// Largest accepted chunk size (1820 quanta)
pub const MAX_CHUNK_SIZE: usize = 16_773_120;

pub const DEFAULT_CHUNK_SIZE: usize = 4 * CHUNK_QUANTUM;

pub const MIN_QUEUE_SIZE: usize = 2;
pub const MAX_QUEUE_SIZE: usize = 63;
pub const DEFAULT_QUEUE_SIZE: usize = 3;

const GAIN: Bounds = Bounds::at_least(0.0);
const PITCH: Bounds = Bounds::greater_than(0.0);

/// Check a chunk size and round it down to a multiple of [`CHUNK_QUANTUM`]
///
/// # Example
/// ```
/// use resonar::engine::source::validate_chunk_size;
/// assert_eq!(validate_chunk_size(32768).unwrap(), 27648);
/// assert!(validate_chunk_size(0).is_err());
/// ```
pub fn validate_chunk_size(size: i64) -> Result<usize> {
    let size = validate_int_range("chunk_size", size, MIN_CHUNK_SIZE as i64, MAX_CHUNK_SIZE as i64)?;
    let size = size as usize;
    Ok(size - size % CHUNK_QUANTUM)
}

/// Check a queue size
pub fn validate_queue_size(size: i64) -> Result<usize> {
    let size = validate_int_range("queue_size", size, MIN_QUEUE_SIZE as i64, MAX_QUEUE_SIZE as i64)?;
    Ok(size as usize)
}

// ============================================================================
// State Types
// ============================================================================

/// Playback state of a source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceState {
    /// Never played, rewound, or detached
    #[default]
    Initial,
    Playing,
    Paused,
    /// Stopped explicitly or ran out of data
    Stopped,
}

impl fmt::Display for SourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceState::Initial => write!(f, "Initial"),
            SourceState::Playing => write!(f, "Playing"),
            SourceState::Paused => write!(f, "Paused"),
            SourceState::Stopped => write!(f, "Stopped"),
        }
    }
}

/// What kind of audio data a source is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceType {
    #[default]
    Undetermined,
    Static,
    Streaming,
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceType::Undetermined => write!(f, "Undetermined"),
            SourceType::Static => write!(f, "Static"),
            SourceType::Streaming => write!(f, "Streaming"),
        }
    }
}

enum Attachment {
    None,
    Static(Buffer),
    Streaming(StreamSession),
}

impl Attachment {
    fn source_type(&self) -> SourceType {
        match self {
            Attachment::None => SourceType::Undetermined,
            Attachment::Static(_) => SourceType::Static,
            Attachment::Streaming(_) => SourceType::Streaming,
        }
    }

    fn stream(&self) -> Option<StreamSession> {
        match self {
            Attachment::Streaming(stream) => Some(stream.clone()),
            _ => None,
        }
    }
}

// ============================================================================
// Shared Source Core
// ============================================================================

pub(crate) struct SourceCore {
    state: SourceState,
    attachment: Attachment,
    gain: f32,
    pitch: f32,
    position: Vec3,
    velocity: Vec3,
    relative: bool,
    looping: bool,
    auto: bool,
    queue_size: usize,
    chunk_size: usize,
    sends: BTreeMap<usize, EffectSlot>,
    /// Failure of the last background refill, re-raised to the caller
    fault: Option<AudioError>,
    refill: Option<Refill>,
}

impl SourceCore {
    fn new(config: &EngineConfig) -> Self {
        Self {
            state: SourceState::Initial,
            attachment: Attachment::None,
            gain: 1.0,
            pitch: 1.0,
            position: [0.0; 3],
            velocity: [0.0; 3],
            relative: false,
            looping: false,
            auto: true,
            queue_size: config.default_queue_size,
            chunk_size: config.default_chunk_size,
            sends: BTreeMap::new(),
            fault: None,
            refill: None,
        }
    }

    fn plan(&self) -> QueuePlan {
        QueuePlan {
            queue_size: self.queue_size,
            chunk_size: self.chunk_size,
            looping: self.looping,
        }
    }

    fn refill_running(&self) -> bool {
        self.refill.as_ref().map_or(false, Refill::is_running)
    }

    /// Re-raise a background fault, or refuse a closed stream
    fn check_stream(&mut self) -> Result<()> {
        if let Some(fault) = self.fault.take() {
            return Err(fault);
        }
        if let Attachment::Streaming(stream) = &self.attachment {
            if !stream.is_open() {
                return Err(AudioError::UninitializedStream);
            }
        }
        Ok(())
    }
}

pub(crate) struct SourceShared {
    engine: Engine,
    handle: NativeHandle,
    core: Mutex<SourceCore>,
}

impl SourceShared {
    /// Fold the backend's view into the tracked state
    fn reconcile(&self, core: &mut SourceCore) -> SourceState {
        if core.state == SourceState::Playing {
            if let Ok(backend) = self.engine.active_backend() {
                if backend.native_playback_state(self.handle) == NativeState::Stopped {
                    core.state = SourceState::Stopped;
                    tracing::debug!(source = %self.handle, "source ran out of data");
                }
            }
        }
        core.state
    }

    /// Stop the background worker, if any, and wait for it
    pub(crate) fn halt_refill(&self) {
        let refill = self.core.lock().refill.take();
        if let Some(refill) = refill {
            refill.stop();
        }
    }

    /// One background refill cycle; `false` ends the worker
    pub(crate) fn refill_tick(&self) -> bool {
        let Ok(backend) = self.engine.active_backend() else {
            return false;
        };
        let mut core = self.core.lock();
        if self.reconcile(&mut core) != SourceState::Playing {
            return false;
        }
        let Some(stream) = core.attachment.stream() else {
            return false;
        };

        match fill_queue(backend, self.handle, &stream, core.plan()) {
            Ok(_) => true,
            Err(err) => {
                tracing::warn!(source = %self.handle, error = %err, "background refill failed");
                core.fault = Some(err);
                false
            }
        }
    }

    /// Stop, empty the queue and drop the attachment
    fn detach_locked(&self, backend: &dyn Backend, core: &mut SourceCore) -> Result<()> {
        backend.transport(self.handle, Transport::Stop)?;
        backend.clear_queue(self.handle)?;
        backend.transport(self.handle, Transport::Rewind)?;

        if let Attachment::Static(_) = core.attachment {
            backend.bind_pcm(self.handle, None)?;
        }
        match std::mem::replace(&mut core.attachment, Attachment::None) {
            Attachment::Static(buffer) => buffer.detach(),
            Attachment::Streaming(_) | Attachment::None => {}
        }

        core.state = SourceState::Initial;
        core.fault = None;
        Ok(())
    }
}

// ============================================================================
// Source
// ============================================================================

/// A positioned sound emitter
pub struct Source {
    shared: Arc<SourceShared>,
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.shared.core.lock();
        f.debug_struct("Source")
            .field("handle", &self.shared.handle)
            .field("state", &core.state)
            .field("type", &core.attachment.source_type())
            .finish()
    }
}

impl Drop for Source {
    fn drop(&mut self) {
        self.shared.halt_refill();

        let mut core = self.shared.core.lock();
        if let Attachment::Static(buffer) = std::mem::replace(&mut core.attachment, Attachment::None) {
            buffer.detach();
        }
        core.sends.clear();
        drop(core);

        if let Ok(backend) = self.shared.engine.active_backend() {
            backend.destroy_source(self.shared.handle);
        }
    }
}

impl Source {
    /// Create a source with default attributes
    ///
    /// # Example
    /// ```
    /// use resonar::{Engine, Source, SourceState, SourceType};
    /// let engine = Engine::startup(None).unwrap();
    /// let source = Source::new(&engine).unwrap();
    /// assert_eq!(source.state(), SourceState::Initial);
    /// assert_eq!(source.source_type(), SourceType::Undetermined);
    /// assert!(source.is_auto());
    /// ```
    pub fn new(engine: &Engine) -> Result<Self> {
        let backend = engine.active_backend()?;
        let handle = backend.create_source()?;
        let shared = Arc::new(SourceShared {
            engine: engine.clone(),
            handle,
            core: Mutex::new(SourceCore::new(engine.config())),
        });
        engine.register_source(Arc::downgrade(&shared));
        tracing::debug!(source = %handle, "source created");
        Ok(Self { shared })
    }

    fn backend(&self) -> Result<&dyn Backend> {
        self.shared.engine.active_backend()
    }

    fn handle(&self) -> NativeHandle {
        self.shared.handle
    }

    fn spawn_refill(&self, core: &mut SourceCore) -> Result<()> {
        let interval = self.shared.engine.config().refill_interval();
        core.refill = Some(Refill::spawn(Arc::downgrade(&self.shared), interval)?);
        Ok(())
    }

    // ========================================================================
    // Transport
    // ========================================================================

    /// Start or resume playback.
    ///
    /// - Initial or Paused: starts or resumes
    /// - Stopped: restarts from the beginning
    /// - Playing: no transport change; a changed `auto` flag takes effect
    pub fn play(&self) -> Result<()> {
        let backend = self.backend()?;
        {
            let mut core = self.shared.core.lock();
            core.check_stream()?;
            if self.shared.reconcile(&mut core) == SourceState::Playing {
                let stale = self.sync_auto(&mut core)?;
                drop(core);
                if let Some(stale) = stale {
                    stale.stop();
                }
                return Ok(());
            }
        }

        self.shared.halt_refill();
        let mut core = self.shared.core.lock();
        let previous = self.shared.reconcile(&mut core);

        if let Some(stream) = core.attachment.stream() {
            if previous == SourceState::Stopped {
                backend.clear_queue(self.handle())?;
                stream.rewind()?;
            }
            fill_queue(backend, self.handle(), &stream, core.plan())?;
        }
        backend.transport(self.handle(), Transport::Play)?;
        core.state = SourceState::Playing;

        if core.auto && core.attachment.source_type() == SourceType::Streaming {
            self.spawn_refill(&mut core)?;
        }
        tracing::debug!(source = %self.handle(), from = %previous, "play");
        Ok(())
    }

    /// Bring the worker in line with `auto` while already playing.
    ///
    /// Returns a worker to stop once the lock is released.
    fn sync_auto(&self, core: &mut SourceCore) -> Result<Option<Refill>> {
        let streaming = core.attachment.source_type() == SourceType::Streaming;
        if !core.auto {
            return Ok(core.refill.take());
        }
        if streaming && !core.refill_running() {
            let finished = core.refill.take();
            self.spawn_refill(core)?;
            return Ok(finished);
        }
        Ok(None)
    }

    /// Pause a playing source; no effect in any other state
    pub fn pause(&self) -> Result<()> {
        let backend = self.backend()?;
        self.shared.halt_refill();
        let mut core = self.shared.core.lock();
        if self.shared.reconcile(&mut core) == SourceState::Playing {
            backend.transport(self.handle(), Transport::Pause)?;
            core.state = SourceState::Paused;
            tracing::debug!(source = %self.handle(), "pause");
        }
        Ok(())
    }

    /// Stop a playing or paused source; streams are rewound
    pub fn stop(&self) -> Result<()> {
        let backend = self.backend()?;
        self.shared.core.lock().check_stream()?;
        self.shared.halt_refill();

        let mut core = self.shared.core.lock();
        match self.shared.reconcile(&mut core) {
            SourceState::Playing | SourceState::Paused => {
                backend.transport(self.handle(), Transport::Stop)?;
                if let Some(stream) = core.attachment.stream() {
                    backend.clear_queue(self.handle())?;
                    stream.rewind()?;
                }
                core.state = SourceState::Stopped;
                tracing::debug!(source = %self.handle(), "stop");
            }
            SourceState::Initial | SourceState::Stopped => {}
        }
        Ok(())
    }

    /// Return to the initial state, rewinding the stream if one was in use
    pub fn rewind(&self) -> Result<()> {
        let backend = self.backend()?;
        self.shared.core.lock().check_stream()?;
        self.shared.halt_refill();

        let mut core = self.shared.core.lock();
        let previous = self.shared.reconcile(&mut core);
        if previous != SourceState::Initial {
            if let Some(stream) = core.attachment.stream() {
                backend.transport(self.handle(), Transport::Stop)?;
                backend.clear_queue(self.handle())?;
                stream.rewind()?;
            }
        }
        backend.transport(self.handle(), Transport::Rewind)?;
        core.state = SourceState::Initial;
        tracing::debug!(source = %self.handle(), from = %previous, "rewind");
        Ok(())
    }

    /// Drop the attached buffer or stream and return to the initial state
    pub fn detach(&self) -> Result<()> {
        let backend = self.backend()?;
        self.shared.halt_refill();
        let mut core = self.shared.core.lock();
        self.shared.detach_locked(backend, &mut core)?;
        tracing::debug!(source = %self.handle(), "detached");
        Ok(())
    }

    /// Refill the streaming queue now.
    ///
    /// A no-op for non-streaming sources and while a background worker is
    /// running.
    pub fn update(&self) -> Result<()> {
        let backend = self.backend()?;
        let mut core = self.shared.core.lock();
        core.check_stream()?;
        if core.refill_running() {
            return Ok(());
        }
        let Some(stream) = core.attachment.stream() else {
            return Ok(());
        };
        fill_queue(backend, self.handle(), &stream, core.plan())?;
        Ok(())
    }

    pub fn state(&self) -> SourceState {
        let mut core = self.shared.core.lock();
        self.shared.reconcile(&mut core)
    }

    pub fn source_type(&self) -> SourceType {
        self.shared.core.lock().attachment.source_type()
    }

    // ========================================================================
    // Attachment
    // ========================================================================

    pub fn buffer(&self) -> Option<Buffer> {
        match &self.shared.core.lock().attachment {
            Attachment::Static(buffer) => Some(buffer.clone()),
            _ => None,
        }
    }

    /// Attach a buffer, or clear the current one with `None`.
    ///
    /// Fails on a streaming source, and when replacing audio data on a
    /// playing or paused source.
    pub fn set_buffer(&self, buffer: Option<&Buffer>) -> Result<()> {
        let Some(buffer) = buffer else {
            if self.source_type() == SourceType::Streaming {
                return Ok(());
            }
            return self.detach();
        };

        let backend = self.backend()?;
        let mut core = self.shared.core.lock();
        match &core.attachment {
            Attachment::Streaming(_) => return Err(AudioError::BufferOnStreamingSource),
            Attachment::Static(current) if current.ptr_eq(buffer) => return Ok(()),
            _ => {}
        }
        if matches!(
            self.shared.reconcile(&mut core),
            SourceState::Playing | SourceState::Paused
        ) {
            return Err(AudioError::invalid_operation(
                "cannot change the buffer of a playing or paused source",
            ));
        }

        let pcm = buffer.attach();
        let bound = backend
            .bind_pcm(self.handle(), pcm)
            .and_then(|_| backend.apply_scalar(self.handle(), AttributeId::Looping, flag(core.looping)));
        if let Err(err) = bound {
            buffer.detach();
            return Err(err);
        }

        if let Attachment::Static(previous) =
            std::mem::replace(&mut core.attachment, Attachment::Static(buffer.clone()))
        {
            previous.detach();
        }
        tracing::debug!(source = %self.handle(), bytes = buffer.size(), "buffer attached");
        Ok(())
    }

    pub fn stream(&self) -> Option<StreamSession> {
        self.shared.core.lock().attachment.stream()
    }

    /// Attach a stream, or clear the current one with `None`.
    ///
    /// A different stream may replace the current one in any state provided
    /// its PCM format matches. The queue is primed before the stream is
    /// attached, so a decode failure leaves the source as it was. A source
    /// that is already playing with `auto` on starts refilling at once.
    pub fn set_stream(&self, stream: Option<&StreamSession>) -> Result<()> {
        let Some(stream) = stream else {
            if self.source_type() == SourceType::Static {
                return Ok(());
            }
            return self.detach();
        };

        let backend = self.backend()?;
        let mut core = self.shared.core.lock();
        match &core.attachment {
            Attachment::Static(_) => return Err(AudioError::StreamOnStaticSource),
            Attachment::Streaming(current) if current.ptr_eq(stream) => return Ok(()),
            _ => {}
        }

        let format = stream.format().ok_or(AudioError::UninitializedStream)?;
        if let Attachment::Streaming(current) = &core.attachment {
            if current.format().map_or(false, |current| current != format) {
                return Err(AudioError::StreamFormatMismatch);
            }
        }

        // The stream rewinds itself when looping; native looping would
        // keep queued chunks from ever being processed.
        let replacing = core.attachment.source_type() == SourceType::Streaming;
        backend.apply_scalar(self.handle(), AttributeId::Looping, flag(false))?;
        if !core.refill_running() {
            if let Err(err) = fill_queue(backend, self.handle(), stream, core.plan()) {
                if !replacing {
                    backend.clear_queue(self.handle())?;
                    backend.apply_scalar(self.handle(), AttributeId::Looping, flag(core.looping))?;
                }
                return Err(err);
            }
        }
        core.attachment = Attachment::Streaming(stream.clone());
        core.fault = None;
        tracing::debug!(source = %self.handle(), format = %format, "stream attached");

        // A source already playing starts refilling right away
        let mut finished = None;
        if core.auto && !core.refill_running() && self.shared.reconcile(&mut core) == SourceState::Playing {
            finished = core.refill.take();
            self.spawn_refill(&mut core)?;
        }
        drop(core);
        if let Some(finished) = finished {
            finished.stop();
        }
        Ok(())
    }

    // ========================================================================
    // Attributes
    // ========================================================================

    pub fn gain(&self) -> f32 {
        self.shared.core.lock().gain
    }

    /// Scalar amplitude multiplier, in [0, +inf)
    pub fn set_gain(&self, gain: f32) -> Result<()> {
        let backend = self.backend()?;
        let gain = GAIN.validate("gain", gain)?;
        let mut core = self.shared.core.lock();
        backend.apply_scalar(self.handle(), AttributeId::Gain, gain)?;
        core.gain = gain;
        Ok(())
    }

    pub fn pitch(&self) -> f32 {
        self.shared.core.lock().pitch
    }

    /// Playback rate multiplier, in (0, +inf)
    pub fn set_pitch(&self, pitch: f32) -> Result<()> {
        let backend = self.backend()?;
        let pitch = PITCH.validate("pitch", pitch)?;
        let mut core = self.shared.core.lock();
        backend.apply_scalar(self.handle(), AttributeId::Pitch, pitch)?;
        core.pitch = pitch;
        Ok(())
    }

    pub fn position(&self) -> Vec3 {
        self.shared.core.lock().position
    }

    pub fn set_position(&self, position: Vec3) -> Result<()> {
        let backend = self.backend()?;
        let position = validate_vec3("position", position)?;
        let mut core = self.shared.core.lock();
        backend.apply_vector3(self.handle(), AttributeId::Position, position)?;
        core.position = position;
        Ok(())
    }

    pub fn velocity(&self) -> Vec3 {
        self.shared.core.lock().velocity
    }

    pub fn set_velocity(&self, velocity: Vec3) -> Result<()> {
        let backend = self.backend()?;
        let velocity = validate_vec3("velocity", velocity)?;
        let mut core = self.shared.core.lock();
        backend.apply_vector3(self.handle(), AttributeId::Velocity, velocity)?;
        core.velocity = velocity;
        Ok(())
    }

    pub fn is_relative(&self) -> bool {
        self.shared.core.lock().relative
    }

    /// Interpret the position relative to the listener
    pub fn set_relative<T: Truthy + ?Sized>(&self, relative: &T) -> Result<()> {
        let backend = self.backend()?;
        let relative = coerce_boolean(relative);
        let mut core = self.shared.core.lock();
        backend.apply_scalar(self.handle(), AttributeId::Relative, flag(relative))?;
        core.relative = relative;
        Ok(())
    }

    pub fn is_looping(&self) -> bool {
        self.shared.core.lock().looping
    }

    pub fn set_looping<T: Truthy + ?Sized>(&self, looping: &T) -> Result<()> {
        let backend = self.backend()?;
        let looping = coerce_boolean(looping);
        let mut core = self.shared.core.lock();
        if core.attachment.source_type() != SourceType::Streaming {
            backend.apply_scalar(self.handle(), AttributeId::Looping, flag(looping))?;
        }
        core.looping = looping;
        Ok(())
    }

    pub fn is_auto(&self) -> bool {
        self.shared.core.lock().auto
    }

    /// Enable or disable background refilling.
    ///
    /// Takes effect at the next [`Source::play`]; a worker already running
    /// keeps refilling until then.
    pub fn set_auto<T: Truthy + ?Sized>(&self, auto: &T) -> Result<()> {
        self.shared.engine.ensure_active()?;
        self.shared.core.lock().auto = coerce_boolean(auto);
        Ok(())
    }

    pub fn queue_size(&self) -> usize {
        self.shared.core.lock().queue_size
    }

    /// Number of chunks kept queued, in [2, 63]
    pub fn set_queue_size(&self, size: i64) -> Result<()> {
        self.shared.engine.ensure_active()?;
        let size = validate_queue_size(size)?;
        self.shared.core.lock().queue_size = size;
        Ok(())
    }

    pub fn chunk_size(&self) -> usize {
        self.shared.core.lock().chunk_size
    }

    /// Bytes decoded per chunk, in [9216, 16773120], rounded down to a
    /// multiple of 9216
    pub fn set_chunk_size(&self, size: i64) -> Result<()> {
        self.shared.engine.ensure_active()?;
        let size = validate_chunk_size(size)?;
        self.shared.core.lock().chunk_size = size;
        Ok(())
    }

    // ========================================================================
    // Effect Routing
    // ========================================================================

    /// Route this source into an effect slot through auxiliary send `index`.
    ///
    /// Indices run from 0 to the engine's per-source effect limit
    /// (exclusive). Feeding an index that is already in use replaces it.
    pub fn feed(&self, slot: &EffectSlot, index: usize) -> Result<()> {
        let backend = self.backend()?;
        let limit = self.shared.engine.per_source_effect_limit()?;
        if index >= limit {
            return Err(AudioError::invalid_parameter(
                "index",
                index,
                format!("an auxiliary send index below {}", limit),
            ));
        }

        let mut core = self.shared.core.lock();
        backend.route_send(self.handle(), index, Some(slot.native_handle()))?;
        core.sends.insert(index, slot.clone());
        tracing::debug!(source = %self.handle(), slot = %slot.native_handle(), index, "feeding effect slot");
        Ok(())
    }

    /// Remove the send at `index`; no effect if nothing is routed there
    pub fn unfeed(&self, index: usize) -> Result<()> {
        let backend = self.backend()?;
        let mut core = self.shared.core.lock();
        if core.sends.contains_key(&index) {
            backend.route_send(self.handle(), index, None)?;
            core.sends.remove(&index);
        }
        Ok(())
    }

    /// Routed sends by index
    pub fn feeds(&self) -> Vec<(usize, EffectSlot)> {
        let core = self.shared.core.lock();
        core.sends
            .iter()
            .map(|(index, slot)| (*index, slot.clone()))
            .collect()
    }

    /// Backend handle of this source
    pub fn native_handle(&self) -> NativeHandle {
        self.shared.handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::format::{Pcm, PcmFormat};
    use approx::assert_relative_eq;
    use test_case::test_case;

    fn engine() -> Engine {
        Engine::startup(None).unwrap()
    }

    fn loaded_buffer(engine: &Engine) -> Buffer {
        let buffer = Buffer::new(engine).unwrap();
        buffer
            .load_pcm(Pcm::new(PcmFormat::new(22050, 16, 1), vec![0; 64]))
            .unwrap();
        buffer
    }

    // ------------------------------------------------------------------------
    // Defaults
    // ------------------------------------------------------------------------

    #[test]
    fn test_defaults() {
        let engine = engine();
        let source = Source::new(&engine).unwrap();
        assert_eq!(source.gain(), 1.0);
        assert_eq!(source.pitch(), 1.0);
        assert_eq!(source.position(), [0.0; 3]);
        assert_eq!(source.velocity(), [0.0; 3]);
        assert!(!source.is_relative());
        assert!(!source.is_looping());
        assert!(source.is_auto());
        assert_eq!(source.queue_size(), 3);
        assert_eq!(source.chunk_size(), 36864);
        assert!(source.buffer().is_none());
        assert!(source.stream().is_none());
    }

    // ------------------------------------------------------------------------
    // Chunk and queue sizes
    // ------------------------------------------------------------------------

    #[test_case(9217, 9216)]
    #[test_case(32768, 27648)]
    #[test_case(16_773_119, 16_763_904)]
    #[test_case(16_773_120, 16_773_120)]
    fn test_chunk_size_rounds_down(input: i64, stored: usize) {
        let engine = engine();
        let source = Source::new(&engine).unwrap();
        source.set_chunk_size(input).unwrap();
        assert_eq!(source.chunk_size(), stored);
    }

    #[test_case(0)]
    #[test_case(9215)]
    #[test_case(16_773_121)]
    #[test_case(-9216)]
    fn test_chunk_size_out_of_range(input: i64) {
        let engine = engine();
        let source = Source::new(&engine).unwrap();
        let err = source.set_chunk_size(input).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(source.chunk_size(), DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn test_queue_size_bounds() {
        let engine = engine();
        let source = Source::new(&engine).unwrap();
        for size in [2, 32, 63] {
            source.set_queue_size(size).unwrap();
            assert_eq!(source.queue_size(), size as usize);
        }
        for size in [0, 1, 64, -130] {
            assert!(source.set_queue_size(size).unwrap_err().is_validation());
            assert_eq!(source.queue_size(), 63);
        }
    }

    // ------------------------------------------------------------------------
    // Float and boolean attributes
    // ------------------------------------------------------------------------

    #[test]
    fn test_gain_and_pitch_bounds() {
        let engine = engine();
        let source = Source::new(&engine).unwrap();

        source.set_gain(0.0).unwrap();
        source.set_gain(4.25).unwrap();
        assert_relative_eq!(source.gain(), 4.25);
        assert!(source.set_gain(-0.5).is_err());
        assert_relative_eq!(source.gain(), 4.25);

        assert!(source.set_pitch(0.0).is_err());
        source.set_pitch(0.5).unwrap();
        assert_relative_eq!(source.pitch(), 0.5);
    }

    #[test]
    fn test_nan_position_keeps_previous() {
        let engine = engine();
        let source = Source::new(&engine).unwrap();
        source.set_position([1.0, 2.0, 3.0]).unwrap();
        assert!(source.set_position([f32::NAN, 0.0, 0.0]).is_err());
        assert_eq!(source.position(), [1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_boolean_attributes_coerce() {
        let engine = engine();
        let source = Source::new(&engine).unwrap();
        source.set_relative(&0).unwrap();
        assert!(source.is_relative());
        source.set_looping("yes").unwrap();
        assert!(source.is_looping());
        source.set_auto(&None::<bool>).unwrap();
        assert!(!source.is_auto());
        source.set_relative(&false).unwrap();
        assert!(!source.is_relative());
    }

    // ------------------------------------------------------------------------
    // Transitions without audio data
    // ------------------------------------------------------------------------

    #[test]
    fn test_transitions_without_audio() {
        let engine = engine();
        let source = Source::new(&engine).unwrap();

        source.pause().unwrap();
        assert_eq!(source.state(), SourceState::Initial);
        source.stop().unwrap();
        assert_eq!(source.state(), SourceState::Initial);

        source.play().unwrap();
        assert_eq!(source.state(), SourceState::Playing);
        source.play().unwrap();
        assert_eq!(source.state(), SourceState::Playing);

        source.pause().unwrap();
        assert_eq!(source.state(), SourceState::Paused);
        source.pause().unwrap();
        assert_eq!(source.state(), SourceState::Paused);

        source.stop().unwrap();
        assert_eq!(source.state(), SourceState::Stopped);
        source.stop().unwrap();
        assert_eq!(source.state(), SourceState::Stopped);

        source.play().unwrap();
        source.rewind().unwrap();
        assert_eq!(source.state(), SourceState::Initial);
    }

    // ------------------------------------------------------------------------
    // Buffer attachment
    // ------------------------------------------------------------------------

    #[test]
    fn test_buffer_usage_follows_attachment() {
        let engine = engine();
        let buffer = loaded_buffer(&engine);
        let source = Source::new(&engine).unwrap();

        source.set_buffer(Some(&buffer)).unwrap();
        assert_eq!(source.source_type(), SourceType::Static);
        assert_eq!(buffer.usage_count(), 1);

        // reattaching the same buffer is a no-op
        source.set_buffer(Some(&buffer)).unwrap();
        assert_eq!(buffer.usage_count(), 1);

        source.set_buffer(None).unwrap();
        assert_eq!(source.source_type(), SourceType::Undetermined);
        assert_eq!(buffer.usage_count(), 0);

        source.set_buffer(Some(&buffer)).unwrap();
        drop(source);
        assert_eq!(buffer.usage_count(), 0);
    }

    #[test]
    fn test_buffer_swap_rejected_while_playing() {
        let engine = engine();
        let first = loaded_buffer(&engine);
        let second = loaded_buffer(&engine);
        let source = Source::new(&engine).unwrap();
        source.set_buffer(Some(&first)).unwrap();

        source.play().unwrap();
        assert!(source.set_buffer(Some(&second)).unwrap_err().is_operation());
        source.pause().unwrap();
        assert!(source.set_buffer(Some(&second)).unwrap_err().is_operation());

        source.stop().unwrap();
        source.set_buffer(Some(&second)).unwrap();
        assert_eq!(first.usage_count(), 0);
        assert_eq!(second.usage_count(), 1);
    }

    #[test]
    fn test_clearing_resets_state() {
        let engine = engine();
        let buffer = loaded_buffer(&engine);
        let source = Source::new(&engine).unwrap();
        source.set_buffer(Some(&buffer)).unwrap();
        source.play().unwrap();
        source.set_buffer(None).unwrap();
        assert_eq!(source.state(), SourceState::Initial);
        assert!(source.buffer().is_none());
    }

    // ------------------------------------------------------------------------
    // Effect routing
    // ------------------------------------------------------------------------

    #[test]
    fn test_feed_limit() {
        let engine = engine();
        let limit = engine.per_source_effect_limit().unwrap();
        let source = Source::new(&engine).unwrap();

        for index in 0..limit {
            let slot = EffectSlot::new(&engine).unwrap();
            source.feed(&slot, index).unwrap();
        }
        let extra = EffectSlot::new(&engine).unwrap();
        assert!(source.feed(&extra, limit).unwrap_err().is_validation());
        assert_eq!(source.feeds().len(), limit);

        source.unfeed(0).unwrap();
        source.unfeed(0).unwrap();
        assert_eq!(source.feeds().len(), limit - 1);
    }

    #[test]
    fn test_operations_after_cleanup() {
        let engine = engine();
        let source = Source::new(&engine).unwrap();
        engine.cleanup();
        assert!(matches!(source.play(), Err(AudioError::ContextReleased)));
        assert!(matches!(source.set_gain(0.5), Err(AudioError::ContextReleased)));
        assert_eq!(source.state(), SourceState::Initial);
    }
}
