//! Built-in software backend.
//!
//! A deterministic, in-process model of a mixing device. WAV files are
//! decoded with `hound`; Ogg Vorbis and MPEG containers are recognized but
//! refused. Playback time does not advance on its own: [`SoftwareBackend::consume`]
//! and [`SoftwareBackend::finish`] drive it, which keeps the state machine
//! observable without a sound card.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::Arc;

use hound::{SampleFormat, WavReader};
use parking_lot::Mutex;

use crate::engine::attribute::Vec3;
use crate::engine::backend::{
    AttributeId, Backend, Decoded, DeviceInfo, NativeHandle, NativeState, QueueStatus,
    SubmitOutcome, Transport,
};
use crate::engine::format::{AudioFormat, Pcm, PcmFormat};
use crate::error::{AudioError, Result};

/// Name of the single device offered by default
pub const DEFAULT_DEVICE: &str = "Resonar Software Mixer";

/// Auxiliary sends the simulated hardware can grant per source
pub const MAX_AUXILIARY_SENDS: usize = 4;

/// Hard cap on chunks queued on one source
const MAX_QUEUED_CHUNKS: usize = 64;

// ============================================================================
// Simulated Objects
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct QueuedChunk {
    bytes: usize,
    processed: bool,
}

#[derive(Debug, Default)]
struct VirtualSource {
    state: NativeState,
    pcm: Option<Arc<Pcm>>,
    queue: VecDeque<QueuedChunk>,
    sends: BTreeMap<usize, NativeHandle>,
}

impl VirtualSource {
    fn mark_all(&mut self, processed: bool) {
        for chunk in &mut self.queue {
            chunk.processed = processed;
        }
    }

    fn pending(&self) -> usize {
        self.queue.iter().filter(|c| !c.processed).count()
    }
}

struct StreamDecoder {
    reader: WavReader<BufReader<File>>,
    format: PcmFormat,
}

#[derive(Default)]
struct MixerState {
    device: Option<DeviceInfo>,
    next_handle: u32,
    sources: HashMap<NativeHandle, VirtualSource>,
    slots: HashMap<NativeHandle, Option<NativeHandle>>,
    reverbs: HashSet<NativeHandle>,
    streams: HashMap<NativeHandle, StreamDecoder>,
    scalars: HashMap<(NativeHandle, AttributeId), f32>,
    vectors: HashMap<(NativeHandle, AttributeId), Vec3>,
}

impl MixerState {
    fn ensure_open(&self) -> Result<()> {
        if self.device.is_none() {
            return Err(AudioError::Device {
                reason: "no device is open".to_string(),
            });
        }
        Ok(())
    }

    fn allocate(&mut self) -> Result<NativeHandle> {
        self.ensure_open()?;
        self.next_handle += 1;
        Ok(NativeHandle(self.next_handle))
    }

    fn knows(&self, handle: NativeHandle) -> bool {
        handle == NativeHandle::LISTENER
            || self.sources.contains_key(&handle)
            || self.slots.contains_key(&handle)
            || self.reverbs.contains(&handle)
    }

    fn source_mut(&mut self, operation: &'static str, handle: NativeHandle) -> Result<&mut VirtualSource> {
        self.sources.get_mut(&handle).ok_or_else(|| unknown(operation, handle))
    }

    fn forget(&mut self, handle: NativeHandle) {
        self.scalars.retain(|(h, _), _| *h != handle);
        self.vectors.retain(|(h, _), _| *h != handle);
    }
}

fn unknown(operation: &'static str, handle: NativeHandle) -> AudioError {
    AudioError::Backend {
        operation,
        reason: format!("unknown handle {}", handle),
    }
}

fn invalid_audio(err: hound::Error) -> AudioError {
    AudioError::InvalidAudio {
        reason: err.to_string(),
        source: Some(Box::new(err)),
    }
}

// ============================================================================
// WAV Decoding
// ============================================================================

/// Output layout for a WAV file: 8-bit stays 8-bit, everything else is 16-bit
fn output_format(spec: &hound::WavSpec) -> PcmFormat {
    let bit_depth = if spec.sample_format == SampleFormat::Int && spec.bits_per_sample == 8 {
        8
    } else {
        16
    };
    PcmFormat::new(spec.sample_rate, bit_depth, spec.channels)
}

/// Decode up to `max_samples` interleaved samples into little-endian PCM
fn decode_samples<R: Read>(reader: &mut WavReader<R>, max_samples: usize) -> Result<Vec<u8>> {
    let spec = reader.spec();
    let mut out = Vec::new();

    match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Int, 8) => {
            for sample in reader.samples::<i8>().take(max_samples) {
                let sample = sample.map_err(invalid_audio)?;
                // 8-bit PCM is unsigned
                out.push((i16::from(sample) + 128) as u8);
            }
        }
        (SampleFormat::Int, 16) => {
            for sample in reader.samples::<i16>().take(max_samples) {
                out.extend_from_slice(&sample.map_err(invalid_audio)?.to_le_bytes());
            }
        }
        (SampleFormat::Int, bits) => {
            let shift = u32::from(bits.saturating_sub(16));
            for sample in reader.samples::<i32>().take(max_samples) {
                let sample = (sample.map_err(invalid_audio)? >> shift) as i16;
                out.extend_from_slice(&sample.to_le_bytes());
            }
        }
        (SampleFormat::Float, _) => {
            for sample in reader.samples::<f32>().take(max_samples) {
                let sample = sample.map_err(invalid_audio)?.clamp(-1.0, 1.0);
                out.extend_from_slice(&((sample * i16::MAX as f32) as i16).to_le_bytes());
            }
        }
    }

    Ok(out)
}

fn open_wav(path: &Path, format: AudioFormat) -> Result<WavReader<BufReader<File>>> {
    match format {
        AudioFormat::Wav => {}
        other => {
            return Err(AudioError::UnsupportedFormat {
                format: format!("{} decoding is not available in the software backend", other),
            })
        }
    }
    if !path.exists() {
        return Err(AudioError::FileNotFound {
            path: path.display().to_string(),
        });
    }
    WavReader::open(path).map_err(invalid_audio)
}

// ============================================================================
// Software Backend
// ============================================================================

/// Deterministic software implementation of [`Backend`]
pub struct SoftwareBackend {
    devices: Vec<String>,
    max_auxiliary_sends: usize,
    state: Mutex<MixerState>,
}

impl Default for SoftwareBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftwareBackend {
    /// Create a backend exposing the default device
    ///
    /// # Example
    /// ```
    /// use resonar::engine::SoftwareBackend;
    /// let backend = SoftwareBackend::new();
    /// assert_eq!(backend.device_names().len(), 1);
    /// ```
    pub fn new() -> Self {
        Self::with_devices(vec![DEFAULT_DEVICE.to_string()])
    }

    /// Create a backend exposing the given devices; the first one is the default
    pub fn with_devices(devices: Vec<String>) -> Self {
        Self {
            devices,
            max_auxiliary_sends: MAX_AUXILIARY_SENDS,
            state: Mutex::new(MixerState::default()),
        }
    }

    /// Limit the auxiliary sends the simulated hardware grants
    pub fn with_max_auxiliary_sends(mut self, max: usize) -> Self {
        self.max_auxiliary_sends = max;
        self
    }

    pub fn device_names(&self) -> &[String] {
        &self.devices
    }

    // ------------------------------------------------------------------
    // Playback simulation
    // ------------------------------------------------------------------

    /// Play through up to `chunks` queued chunks of a streaming source.
    ///
    /// Returns how many chunks were marked processed. A playing source whose
    /// queue runs dry stops, as real hardware does on underrun.
    pub fn consume(&self, source: NativeHandle, chunks: usize) -> usize {
        let mut state = self.state.lock();
        let Some(src) = state.sources.get_mut(&source) else {
            return 0;
        };
        if src.state != NativeState::Playing {
            return 0;
        }

        let mut consumed = 0;
        for chunk in src.queue.iter_mut().filter(|c| !c.processed).take(chunks) {
            chunk.processed = true;
            consumed += 1;
        }
        if !src.queue.is_empty() && src.pending() == 0 {
            src.state = NativeState::Stopped;
            tracing::debug!(source = %source, "software mixer underrun");
        }
        consumed
    }

    /// Play a source to its end.
    ///
    /// A looping static source keeps playing; anything else stops.
    pub fn finish(&self, source: NativeHandle) {
        let looping = self.scalar(source, AttributeId::Looping).unwrap_or(0.0) != 0.0;
        let mut state = self.state.lock();
        let Some(src) = state.sources.get_mut(&source) else {
            return;
        };
        if src.state != NativeState::Playing {
            return;
        }
        if src.pcm.is_some() && looping {
            return;
        }
        src.mark_all(true);
        src.state = NativeState::Stopped;
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    /// Last scalar applied to a handle
    pub fn scalar(&self, handle: NativeHandle, attribute: AttributeId) -> Option<f32> {
        self.state.lock().scalars.get(&(handle, attribute)).copied()
    }

    /// Last vector applied to a handle
    pub fn vector(&self, handle: NativeHandle, attribute: AttributeId) -> Option<Vec3> {
        self.state.lock().vectors.get(&(handle, attribute)).copied()
    }

    /// Slot routed on a source's auxiliary send
    pub fn routed_send(&self, source: NativeHandle, index: usize) -> Option<NativeHandle> {
        let state = self.state.lock();
        state.sources.get(&source)?.sends.get(&index).copied()
    }

    /// Effect loaded into a slot
    pub fn slot_effect(&self, slot: NativeHandle) -> Option<NativeHandle> {
        self.state.lock().slots.get(&slot).copied().flatten()
    }

    /// Size in bytes of the static payload bound to a source
    pub fn bound_pcm_size(&self, source: NativeHandle) -> Option<usize> {
        let state = self.state.lock();
        state.sources.get(&source)?.pcm.as_ref().map(|pcm| pcm.size())
    }

    /// Total bytes currently queued on a source
    pub fn queued_bytes(&self, source: NativeHandle) -> usize {
        let state = self.state.lock();
        state
            .sources
            .get(&source)
            .map_or(0, |src| src.queue.iter().map(|c| c.bytes).sum())
    }

    /// Number of live native objects of every kind
    pub fn live_objects(&self) -> usize {
        let state = self.state.lock();
        state.sources.len() + state.slots.len() + state.reverbs.len() + state.streams.len()
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().device.is_some()
    }
}

impl Backend for SoftwareBackend {
    fn devices(&self) -> Vec<String> {
        self.devices.clone()
    }

    fn open_device(&self, name: Option<&str>, auxiliary_sends: usize) -> Result<DeviceInfo> {
        let mut state = self.state.lock();
        if state.device.is_some() {
            return Err(AudioError::Device {
                reason: "a device is already open".to_string(),
            });
        }

        let name = match name {
            Some(requested) => self
                .devices
                .iter()
                .find(|d| d.as_str() == requested)
                .cloned()
                .ok_or_else(|| AudioError::DeviceNotFound {
                    name: requested.to_string(),
                })?,
            None => self.devices.first().cloned().ok_or_else(|| AudioError::Device {
                reason: "no output device available".to_string(),
            })?,
        };

        let info = DeviceInfo {
            name,
            max_auxiliary_sends: auxiliary_sends.min(self.max_auxiliary_sends),
        };
        tracing::debug!(device = %info.name, sends = info.max_auxiliary_sends, "software mixer opened");
        state.device = Some(info.clone());
        Ok(info)
    }

    fn close_device(&self) {
        let mut state = self.state.lock();
        if state.device.is_some() {
            *state = MixerState::default();
            tracing::debug!("software mixer closed");
        }
    }

    fn create_source(&self) -> Result<NativeHandle> {
        let mut state = self.state.lock();
        let handle = state.allocate()?;
        state.sources.insert(handle, VirtualSource::default());
        Ok(handle)
    }

    fn destroy_source(&self, source: NativeHandle) {
        let mut state = self.state.lock();
        state.sources.remove(&source);
        state.forget(source);
    }

    fn create_effect_slot(&self) -> Result<NativeHandle> {
        let mut state = self.state.lock();
        let handle = state.allocate()?;
        state.slots.insert(handle, None);
        Ok(handle)
    }

    fn destroy_effect_slot(&self, slot: NativeHandle) {
        let mut state = self.state.lock();
        state.slots.remove(&slot);
        for src in state.sources.values_mut() {
            src.sends.retain(|_, routed| *routed != slot);
        }
        state.forget(slot);
    }

    fn create_reverb(&self) -> Result<NativeHandle> {
        let mut state = self.state.lock();
        let handle = state.allocate()?;
        state.reverbs.insert(handle);
        Ok(handle)
    }

    fn destroy_reverb(&self, reverb: NativeHandle) {
        let mut state = self.state.lock();
        state.reverbs.remove(&reverb);
        for effect in state.slots.values_mut() {
            if *effect == Some(reverb) {
                *effect = None;
            }
        }
        state.forget(reverb);
    }

    fn apply_scalar(&self, handle: NativeHandle, attribute: AttributeId, value: f32) -> Result<()> {
        let mut state = self.state.lock();
        state.ensure_open()?;
        if !state.knows(handle) {
            return Err(unknown("apply_scalar", handle));
        }
        state.scalars.insert((handle, attribute), value);
        Ok(())
    }

    fn apply_vector3(&self, handle: NativeHandle, attribute: AttributeId, value: Vec3) -> Result<()> {
        let mut state = self.state.lock();
        state.ensure_open()?;
        if !state.knows(handle) {
            return Err(unknown("apply_vector3", handle));
        }
        state.vectors.insert((handle, attribute), value);
        Ok(())
    }

    fn load_pcm(&self, path: &Path, format: AudioFormat) -> Result<Pcm> {
        self.state.lock().ensure_open()?;
        let mut reader = open_wav(path, format)?;
        let pcm_format = output_format(&reader.spec());
        let data = decode_samples(&mut reader, usize::MAX)?;
        Ok(Pcm::new(pcm_format, data))
    }

    fn bind_pcm(&self, source: NativeHandle, pcm: Option<Arc<Pcm>>) -> Result<()> {
        let mut state = self.state.lock();
        let src = state.source_mut("bind_pcm", source)?;
        src.pcm = pcm;
        Ok(())
    }

    fn transport(&self, source: NativeHandle, command: Transport) -> Result<()> {
        let mut state = self.state.lock();
        let src = state.source_mut("transport", source)?;
        match command {
            Transport::Play => {
                if src.state != NativeState::Paused {
                    src.mark_all(false);
                }
                src.state = NativeState::Playing;
            }
            Transport::Pause => {
                if src.state == NativeState::Playing {
                    src.state = NativeState::Paused;
                }
            }
            Transport::Stop => {
                src.mark_all(true);
                src.state = NativeState::Stopped;
            }
            Transport::Rewind => {
                src.mark_all(false);
                src.state = NativeState::NotStarted;
            }
        }
        Ok(())
    }

    fn native_playback_state(&self, source: NativeHandle) -> NativeState {
        let state = self.state.lock();
        state
            .sources
            .get(&source)
            .map_or(NativeState::NotStarted, |src| src.state)
    }

    fn queue_status(&self, source: NativeHandle) -> QueueStatus {
        let state = self.state.lock();
        state.sources.get(&source).map_or(QueueStatus::default(), |src| QueueStatus {
            queued: src.queue.len(),
            processed: src.queue.iter().filter(|c| c.processed).count(),
        })
    }

    fn unqueue_processed(&self, source: NativeHandle) -> Result<bool> {
        let mut state = self.state.lock();
        let src = state.source_mut("unqueue_processed", source)?;
        match src.queue.iter().position(|c| c.processed) {
            Some(index) => {
                src.queue.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn clear_queue(&self, source: NativeHandle) -> Result<()> {
        let mut state = self.state.lock();
        state.source_mut("clear_queue", source)?.queue.clear();
        Ok(())
    }

    fn submit_chunk(
        &self,
        source: NativeHandle,
        format: PcmFormat,
        data: Vec<u8>,
    ) -> Result<SubmitOutcome> {
        if format.frame_size() == 0 || data.len() % format.frame_size() != 0 {
            return Err(AudioError::Backend {
                operation: "submit_chunk",
                reason: format!("{} bytes is not a whole number of {} frames", data.len(), format),
            });
        }

        let mut state = self.state.lock();
        let src = state.source_mut("submit_chunk", source)?;
        if src.queue.len() >= MAX_QUEUED_CHUNKS {
            return Ok(SubmitOutcome::QueueFull);
        }
        src.queue.push_back(QueuedChunk {
            bytes: data.len(),
            processed: false,
        });
        Ok(SubmitOutcome::Queued)
    }

    fn open_stream(&self, path: &Path, format: AudioFormat) -> Result<(NativeHandle, PcmFormat)> {
        let reader = open_wav(path, format)?;
        let pcm_format = output_format(&reader.spec());

        let mut state = self.state.lock();
        let handle = state.allocate()?;
        state.streams.insert(
            handle,
            StreamDecoder {
                reader,
                format: pcm_format,
            },
        );
        Ok((handle, pcm_format))
    }

    fn decode_chunk(&self, stream: NativeHandle, max_bytes: usize) -> Result<Decoded> {
        let mut state = self.state.lock();
        let decoder = state
            .streams
            .get_mut(&stream)
            .ok_or(AudioError::UninitializedStream)?;

        let frame_size = decoder.format.frame_size().max(1);
        let frames = (max_bytes / frame_size).max(1);
        let samples = frames * usize::from(decoder.format.channel_count);
        let data = decode_samples(&mut decoder.reader, samples)?;

        if data.is_empty() {
            Ok(Decoded::EndOfData)
        } else {
            Ok(Decoded::Data(data))
        }
    }

    fn rewind_stream(&self, stream: NativeHandle) -> Result<()> {
        let mut state = self.state.lock();
        let decoder = state
            .streams
            .get_mut(&stream)
            .ok_or(AudioError::UninitializedStream)?;
        decoder.reader.seek(0)?;
        Ok(())
    }

    fn close_stream(&self, stream: NativeHandle) {
        self.state.lock().streams.remove(&stream);
    }

    fn bind_effect(&self, slot: NativeHandle, reverb: Option<NativeHandle>) -> Result<()> {
        let mut state = self.state.lock();
        if let Some(reverb) = reverb {
            if !state.reverbs.contains(&reverb) {
                return Err(unknown("bind_effect", reverb));
            }
        }
        let effect = state
            .slots
            .get_mut(&slot)
            .ok_or_else(|| unknown("bind_effect", slot))?;
        *effect = reverb;
        Ok(())
    }

    fn route_send(
        &self,
        source: NativeHandle,
        index: usize,
        slot: Option<NativeHandle>,
    ) -> Result<()> {
        let mut state = self.state.lock();
        let limit = state
            .device
            .as_ref()
            .map_or(0, |device| device.max_auxiliary_sends);
        if index >= limit {
            return Err(AudioError::Backend {
                operation: "route_send",
                reason: format!("send {} exceeds the {} granted sends", index, limit),
            });
        }
        if let Some(slot) = slot {
            if !state.slots.contains_key(&slot) {
                return Err(unknown("route_send", slot));
            }
        }
        let src = state.source_mut("route_send", source)?;
        match slot {
            Some(slot) => {
                src.sends.insert(index, slot);
            }
            None => {
                src.sends.remove(&index);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{WavSpec, WavWriter};
    use tempfile::TempDir;

    fn write_wav(dir: &TempDir, name: &str, frames: usize, bits: u16) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let spec = WavSpec {
            channels: 2,
            sample_rate: 22050,
            bits_per_sample: bits,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for i in 0..frames * 2 {
            match bits {
                8 => writer.write_sample((i % 100) as i8).unwrap(),
                _ => writer.write_sample((i % 1000) as i16).unwrap(),
            }
        }
        writer.finalize().unwrap();
        path
    }

    fn opened() -> SoftwareBackend {
        let backend = SoftwareBackend::new();
        backend.open_device(None, 4).unwrap();
        backend
    }

    #[test]
    fn test_open_unknown_device() {
        let backend = SoftwareBackend::new();
        let err = backend.open_device(Some("foo42"), 4).unwrap_err();
        assert!(err.is_device());
        assert!(!backend.is_open());
    }

    #[test]
    fn test_granted_sends_are_capped() {
        let backend = SoftwareBackend::new().with_max_auxiliary_sends(2);
        let info = backend.open_device(None, 4).unwrap();
        assert_eq!(info.max_auxiliary_sends, 2);
        assert_eq!(info.name, DEFAULT_DEVICE);
    }

    #[test]
    fn test_load_pcm_16_bit() {
        let dir = TempDir::new().unwrap();
        let path = write_wav(&dir, "tone.wav", 100, 16);
        let backend = opened();
        let pcm = backend.load_pcm(&path, AudioFormat::Wav).unwrap();
        assert_eq!(pcm.format, PcmFormat::new(22050, 16, 2));
        assert_eq!(pcm.size(), 400);
    }

    #[test]
    fn test_load_pcm_8_bit_stays_unsigned() {
        let dir = TempDir::new().unwrap();
        let path = write_wav(&dir, "tone8.wav", 10, 8);
        let backend = opened();
        let pcm = backend.load_pcm(&path, AudioFormat::Wav).unwrap();
        assert_eq!(pcm.format.bit_depth, 8);
        assert_eq!(pcm.size(), 20);
        assert_eq!(pcm.data[0], 128);
    }

    #[test]
    fn test_vorbis_is_refused() {
        let dir = TempDir::new().unwrap();
        let path = write_wav(&dir, "tone.wav", 10, 16);
        let backend = opened();
        let err = backend.load_pcm(&path, AudioFormat::Vorbis).unwrap_err();
        assert_eq!(err.error_code(), "UNSUPPORTED_FORMAT");
    }

    #[test]
    fn test_stream_decodes_in_chunks_then_rewinds() {
        let dir = TempDir::new().unwrap();
        let path = write_wav(&dir, "stream.wav", 250, 16);
        let backend = opened();
        let (stream, format) = backend.open_stream(&path, AudioFormat::Wav).unwrap();
        assert_eq!(format.frame_size(), 4);

        let mut total = 0;
        while let Decoded::Data(bytes) = backend.decode_chunk(stream, 400).unwrap() {
            assert!(bytes.len() <= 400);
            total += bytes.len();
        }
        assert_eq!(total, 1000);

        backend.rewind_stream(stream).unwrap();
        assert!(matches!(backend.decode_chunk(stream, 400).unwrap(), Decoded::Data(_)));

        backend.close_stream(stream);
        assert!(backend.decode_chunk(stream, 400).is_err());
    }

    #[test]
    fn test_consume_until_underrun() {
        let backend = opened();
        let source = backend.create_source().unwrap();
        let format = PcmFormat::new(22050, 16, 2);
        for _ in 0..3 {
            backend.submit_chunk(source, format, vec![0; 8]).unwrap();
        }
        backend.transport(source, Transport::Play).unwrap();

        assert_eq!(backend.consume(source, 2), 2);
        assert_eq!(backend.native_playback_state(source), NativeState::Playing);
        assert_eq!(backend.queue_status(source).processed, 2);

        assert_eq!(backend.consume(source, 5), 1);
        assert_eq!(backend.native_playback_state(source), NativeState::Stopped);
    }

    #[test]
    fn test_stop_marks_queue_processed() {
        let backend = opened();
        let source = backend.create_source().unwrap();
        backend
            .submit_chunk(source, PcmFormat::new(8000, 8, 1), vec![0; 4])
            .unwrap();
        backend.transport(source, Transport::Stop).unwrap();
        assert_eq!(
            backend.queue_status(source),
            QueueStatus {
                queued: 1,
                processed: 1
            }
        );
        assert!(backend.unqueue_processed(source).unwrap());
        assert!(!backend.unqueue_processed(source).unwrap());
    }

    #[test]
    fn test_finish_respects_looping() {
        let backend = opened();
        let source = backend.create_source().unwrap();
        backend.bind_pcm(source, Some(Arc::new(Pcm::default()))).unwrap();
        backend.apply_scalar(source, AttributeId::Looping, 1.0).unwrap();
        backend.transport(source, Transport::Play).unwrap();
        backend.finish(source);
        assert_eq!(backend.native_playback_state(source), NativeState::Playing);

        backend.apply_scalar(source, AttributeId::Looping, 0.0).unwrap();
        backend.finish(source);
        assert_eq!(backend.native_playback_state(source), NativeState::Stopped);
    }

    #[test]
    fn test_destroyed_source_is_unknown() {
        let backend = opened();
        let source = backend.create_source().unwrap();
        backend.destroy_source(source);

        let format = PcmFormat::new(8000, 8, 1);
        let failures = [
            ("bind_pcm", backend.bind_pcm(source, None).unwrap_err()),
            ("transport", backend.transport(source, Transport::Play).unwrap_err()),
            ("unqueue_processed", backend.unqueue_processed(source).unwrap_err()),
            ("clear_queue", backend.clear_queue(source).unwrap_err()),
            ("submit_chunk", backend.submit_chunk(source, format, vec![0; 4]).unwrap_err()),
            ("route_send", backend.route_send(source, 0, None).unwrap_err()),
        ];
        for (expected, err) in failures {
            assert!(
                matches!(&err, AudioError::Backend { operation, .. } if *operation == expected),
                "{}: {}",
                expected,
                err
            );
        }
    }

    #[test]
    fn test_route_send_beyond_grant() {
        let backend = opened();
        let source = backend.create_source().unwrap();
        let slot = backend.create_effect_slot().unwrap();
        backend.route_send(source, 3, Some(slot)).unwrap();
        assert_eq!(backend.routed_send(source, 3), Some(slot));
        assert!(backend.route_send(source, 4, Some(slot)).is_err());

        backend.destroy_effect_slot(slot);
        assert_eq!(backend.routed_send(source, 3), None);
    }

    #[test]
    fn test_close_device_releases_everything() {
        let backend = opened();
        backend.create_source().unwrap();
        backend.create_reverb().unwrap();
        assert_eq!(backend.live_objects(), 2);
        backend.close_device();
        assert_eq!(backend.live_objects(), 0);
        assert!(backend.create_source().is_err());
    }
}
