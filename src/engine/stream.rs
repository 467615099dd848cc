//! Streaming decode sessions.
//!
//! A stream is a decode cursor over a file. Several sources may stream from
//! the same session; they share the cursor, so a rewind is seen by all of
//! them. Closing never fails, even while sources are streaming from it.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::engine::backend::{Decoded, NativeHandle};
use crate::engine::format::{resolve_format, AudioFormat, PcmFormat};
use crate::engine::Engine;
use crate::error::{AudioError, Result};

struct StreamState {
    handle: Option<NativeHandle>,
    format: PcmFormat,
}

struct StreamShared {
    engine: Engine,
    state: Mutex<StreamState>,
}

impl Drop for StreamShared {
    fn drop(&mut self) {
        if let Some(handle) = self.state.get_mut().handle.take() {
            if let Ok(backend) = self.engine.active_backend() {
                backend.close_stream(handle);
            }
        }
    }
}

/// A chunked decode session over an audio file
///
/// Clones share the session and its cursor.
#[derive(Clone)]
pub struct StreamSession {
    shared: Arc<StreamShared>,
}

impl std::fmt::Debug for StreamSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("StreamSession")
            .field("handle", &state.handle)
            .field("format", &state.format)
            .finish()
    }
}

impl StreamSession {
    /// Open a file for streaming
    ///
    /// `format` is checked against the file's actual container when given.
    pub fn open(engine: &Engine, path: impl AsRef<Path>, format: Option<AudioFormat>) -> Result<Self> {
        let backend = engine.active_backend()?;
        let path = path.as_ref();
        let format = resolve_format(path, format)?;
        let (handle, pcm_format) = backend.open_stream(path, format)?;
        tracing::debug!(stream = %handle, path = %path.display(), format = %pcm_format, "stream opened");

        Ok(Self {
            shared: Arc::new(StreamShared {
                engine: engine.clone(),
                state: Mutex::new(StreamState {
                    handle: Some(handle),
                    format: pcm_format,
                }),
            }),
        })
    }

    /// Move the shared cursor back to the start
    pub fn rewind(&self) -> Result<()> {
        let backend = self.shared.engine.active_backend()?;
        let state = self.shared.state.lock();
        let handle = state.handle.ok_or(AudioError::UninitializedStream)?;
        backend.rewind_stream(handle)
    }

    /// Invalidate the session. Idempotent and infallible.
    pub fn close(&self) {
        let handle = self.shared.state.lock().handle.take();
        if let Some(handle) = handle {
            if let Ok(backend) = self.shared.engine.active_backend() {
                backend.close_stream(handle);
            }
            tracing::debug!(stream = %handle, "stream closed");
        }
    }

    pub fn is_open(&self) -> bool {
        self.shared.state.lock().handle.is_some()
    }

    /// PCM layout of the stream; `None` once closed
    pub fn format(&self) -> Option<PcmFormat> {
        let state = self.shared.state.lock();
        state.handle.map(|_| state.format)
    }

    pub fn frequency(&self) -> u32 {
        self.format().map_or(0, |f| f.frequency)
    }

    pub fn bit_depth(&self) -> u16 {
        self.format().map_or(0, |f| f.bit_depth)
    }

    pub fn channel_count(&self) -> u16 {
        self.format().map_or(0, |f| f.channel_count)
    }

    /// Whether two handles refer to the same session
    pub fn ptr_eq(&self, other: &StreamSession) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// Decode the next chunk at the shared cursor
    pub(crate) fn decode_chunk(&self, max_bytes: usize) -> Result<(PcmFormat, Decoded)> {
        let backend = self.shared.engine.active_backend()?;
        let state = self.shared.state.lock();
        let handle = state.handle.ok_or(AudioError::UninitializedStream)?;
        let decoded = backend.decode_chunk(handle, max_bytes)?;
        Ok((state.format, decoded))
    }
}
