//! Static audio buffers.
//!
//! A buffer holds a whole decoded payload and can back any number of static
//! sources at once. Sources report attach/detach so the buffer knows when it
//! is in use; an in-use buffer cannot be reloaded.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::engine::format::{resolve_format, AudioFormat, Pcm};
use crate::engine::Engine;
use crate::error::{AudioError, Result};

#[derive(Default)]
struct BufferState {
    pcm: Option<Arc<Pcm>>,
    usage: usize,
}

struct BufferShared {
    engine: Engine,
    state: Mutex<BufferState>,
}

/// Shareable static PCM container
///
/// Clones refer to the same buffer.
#[derive(Clone)]
pub struct Buffer {
    shared: Arc<BufferShared>,
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("Buffer")
            .field("size", &state.pcm.as_ref().map_or(0, |pcm| pcm.size()))
            .field("usage", &state.usage)
            .finish()
    }
}

impl Buffer {
    /// Create an empty buffer
    pub fn new(engine: &Engine) -> Result<Self> {
        engine.ensure_active()?;
        Ok(Self {
            shared: Arc::new(BufferShared {
                engine: engine.clone(),
                state: Mutex::new(BufferState::default()),
            }),
        })
    }

    /// Create a buffer loaded from a file
    ///
    /// `format` is checked against the file's actual container when given.
    pub fn from_file(
        engine: &Engine,
        path: impl AsRef<Path>,
        format: Option<AudioFormat>,
    ) -> Result<Self> {
        let buffer = Self::new(engine)?;
        buffer.load(path, format)?;
        Ok(buffer)
    }

    /// Replace the payload with the contents of a file
    pub fn load(&self, path: impl AsRef<Path>, format: Option<AudioFormat>) -> Result<()> {
        let backend = self.shared.engine.active_backend()?;
        let path = path.as_ref();
        let mut state = self.shared.state.lock();
        Self::ensure_unused(&state)?;

        let format = resolve_format(path, format)?;
        let pcm = backend.load_pcm(path, format)?;
        tracing::debug!(path = %path.display(), format = %pcm.format, bytes = pcm.size(), "buffer loaded");
        state.pcm = Some(Arc::new(pcm));
        Ok(())
    }

    /// Replace the payload with already-decoded PCM
    pub fn load_pcm(&self, pcm: Pcm) -> Result<()> {
        self.shared.engine.ensure_active()?;
        let mut state = self.shared.state.lock();
        Self::ensure_unused(&state)?;
        state.pcm = Some(Arc::new(pcm));
        Ok(())
    }

    fn ensure_unused(state: &BufferState) -> Result<()> {
        if state.usage > 0 {
            return Err(AudioError::invalid_operation(format!(
                "cannot load a buffer in use by {} source(s)",
                state.usage
            )));
        }
        Ok(())
    }

    /// Payload size in bytes
    pub fn size(&self) -> usize {
        self.shared.state.lock().pcm.as_ref().map_or(0, |pcm| pcm.size())
    }

    pub fn frequency(&self) -> u32 {
        self.shared.state.lock().pcm.as_ref().map_or(0, |pcm| pcm.format.frequency)
    }

    pub fn bit_depth(&self) -> u16 {
        self.shared.state.lock().pcm.as_ref().map_or(0, |pcm| pcm.format.bit_depth)
    }

    pub fn channel_count(&self) -> u16 {
        self.shared.state.lock().pcm.as_ref().map_or(0, |pcm| pcm.format.channel_count)
    }

    /// Number of sources currently holding this buffer
    pub fn usage_count(&self) -> usize {
        self.shared.state.lock().usage
    }

    /// Whether two handles refer to the same buffer
    pub fn ptr_eq(&self, other: &Buffer) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// Record a new holder; returns the payload to bind
    pub(crate) fn attach(&self) -> Option<Arc<Pcm>> {
        let mut state = self.shared.state.lock();
        state.usage += 1;
        state.pcm.clone()
    }

    pub(crate) fn detach(&self) {
        let mut state = self.shared.state.lock();
        state.usage = state.usage.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::format::PcmFormat;

    fn pcm(bytes: usize) -> Pcm {
        Pcm::new(PcmFormat::new(44100, 16, 2), vec![0; bytes])
    }

    #[test]
    fn test_empty_buffer_reads_zero() {
        let engine = Engine::startup(None).unwrap();
        let buffer = Buffer::new(&engine).unwrap();
        assert_eq!(buffer.size(), 0);
        assert_eq!(buffer.frequency(), 0);
        assert_eq!(buffer.usage_count(), 0);
    }

    #[test]
    fn test_load_pcm_sets_attributes() {
        let engine = Engine::startup(None).unwrap();
        let buffer = Buffer::new(&engine).unwrap();
        buffer.load_pcm(pcm(64)).unwrap();
        assert_eq!(buffer.size(), 64);
        assert_eq!(buffer.frequency(), 44100);
        assert_eq!(buffer.bit_depth(), 16);
        assert_eq!(buffer.channel_count(), 2);
    }

    #[test]
    fn test_reload_rejected_while_attached() {
        let engine = Engine::startup(None).unwrap();
        let buffer = Buffer::new(&engine).unwrap();
        buffer.attach();
        let err = buffer.load_pcm(pcm(4)).unwrap_err();
        assert!(err.is_operation());
        buffer.detach();
        buffer.load_pcm(pcm(4)).unwrap();
    }

    #[test]
    fn test_missing_file() {
        let engine = Engine::startup(None).unwrap();
        let err = Buffer::from_file(&engine, "/nonexistent/tone.wav", None).unwrap_err();
        assert_eq!(err.error_code(), "FILE_NOT_FOUND");
    }
}
