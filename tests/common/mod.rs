//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use resonar::engine::SoftwareBackend;
use resonar::{Engine, EngineConfig};

/// Smallest chunk size; keeps fixture files small
pub const CHUNK: usize = 9216;

/// Write a 16-bit WAV of `frames` frames of a sawtooth
pub fn write_wav(dir: &Path, name: &str, sample_rate: u32, channels: u16, frames: usize) -> PathBuf {
    let path = dir.join(name);
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    for frame in 0..frames {
        for _ in 0..channels {
            writer.write_sample(((frame % 128) as i16 - 64) * 256).unwrap();
        }
    }
    writer.finalize().unwrap();
    path
}

/// A 16-bit mono WAV holding exactly `chunks` chunks of [`CHUNK`] bytes
pub fn write_chunks(dir: &Path, name: &str, chunks: usize) -> PathBuf {
    write_wav(dir, name, 22050, 1, chunks * CHUNK / 2)
}

/// Engine on an inspectable software backend using [`CHUNK`]-sized chunks.
///
/// The refill interval is long enough that background workers never race
/// the test unless it waits for them.
pub fn engine() -> (Engine, Arc<SoftwareBackend>) {
    engine_with(EngineConfig {
        default_chunk_size: CHUNK,
        refill_interval_ms: 60_000,
        ..EngineConfig::default()
    })
}

pub fn engine_with(config: EngineConfig) -> (Engine, Arc<SoftwareBackend>) {
    let backend = Arc::new(SoftwareBackend::new());
    let engine = Engine::startup_with(backend.clone(), config).unwrap();
    (engine, backend)
}

/// Poll `condition` until it holds or `timeout` passes
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    condition()
}
