//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::config::EngineConfig;
use crate::effects::{EffectSlot, Reverb, ReverbPreset};
use crate::engine::{version, Buffer, Engine, SoftwareBackend, Source, SourceState, StreamSession};
use crate::error::Result;

/// Read the configuration file if given, then apply a device override.
pub fn load_config(path: Option<&Path>, device: Option<String>) -> Result<EngineConfig> {
    let mut config = match path {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if device.is_some() {
        config.device = device;
    }
    Ok(config)
}

/// Show version, devices and engine limits.
pub fn show_info(config: EngineConfig) -> Result<()> {
    let backend = Arc::new(SoftwareBackend::new());
    let engine = Engine::startup_with(backend, config)?;

    println!("Resonar v{}", version());
    println!("{:-<60}", "");
    println!("Devices:");
    for device in engine.devices() {
        let marker = if device == engine.device_name() { "* " } else { "  " };
        println!("{}{}", marker, device);
    }
    println!("{:-<60}", "");
    println!("Effect slots per source: {}", engine.per_source_effect_limit()?);
    println!("Default queue size:      {}", engine.config().default_queue_size);
    println!("Default chunk size:      {} bytes", engine.config().default_chunk_size);
    println!("Refill interval:         {} ms", engine.config().refill_interval_ms);

    engine.cleanup();
    Ok(())
}

/// List the built-in reverb presets.
pub fn list_presets(json: bool, category: Option<&str>) -> Result<()> {
    let presets: Vec<ReverbPreset> = ReverbPreset::ALL
        .iter()
        .copied()
        .filter(|preset| {
            category.map_or(true, |c| preset.category().to_string().eq_ignore_ascii_case(c))
        })
        .collect();

    if json {
        let listing: Vec<_> = presets
            .iter()
            .map(|preset| {
                serde_json::json!({
                    "id": preset.id(),
                    "name": preset.name(),
                    "category": preset.category(),
                    "properties": preset.properties(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    for preset in presets {
        let properties = preset.properties();
        println!(
            "{:>3}  {:<28} {:<9} decay {:>5.2}s",
            preset.id(),
            preset.name(),
            preset.category().to_string(),
            properties.decay_time
        );
    }
    Ok(())
}

/// Options for [`play`].
#[derive(Debug, Clone)]
pub struct PlayOptions {
    pub file: PathBuf,
    pub stream: bool,
    pub looping: bool,
    pub gain: f32,
    pub reverb: Option<String>,
    pub max_chunks: usize,
}

/// What a simulated playback went through.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayReport {
    /// Chunks the mixer played; zero for static playback
    pub chunks: usize,
    /// Bytes of audio data behind the source
    pub bytes: usize,
    pub final_state: SourceState,
}

/// Play a file through the software mixer.
///
/// Static files are played to their end at once. Streams are played a chunk
/// at a time, refilling the queue between chunks, until the data runs out or
/// `max_chunks` is reached.
pub fn play(config: EngineConfig, options: &PlayOptions) -> Result<PlayReport> {
    let backend = Arc::new(SoftwareBackend::new());
    let engine = Engine::startup_with(backend.clone(), config)?;
    info!(file = %options.file.display(), stream = options.stream, "playing");

    let source = Source::new(&engine)?;
    source.set_gain(options.gain)?;
    source.set_looping(&options.looping)?;

    let _effect = match &options.reverb {
        Some(name) => {
            let preset: ReverbPreset = name.parse()?;
            let reverb = Reverb::from_preset(&engine, preset)?;
            let slot = EffectSlot::with_effect(&engine, &reverb)?;
            source.feed(&slot, 0)?;
            println!("Reverb: {} ({})", preset, preset.category());
            Some((reverb, slot))
        }
        None => None,
    };

    let handle = source.native_handle();
    let report = if options.stream {
        let stream = StreamSession::open(&engine, &options.file, None)?;
        println!(
            "Streaming {} Hz, {}-bit, {} channel(s)",
            stream.frequency(),
            stream.bit_depth(),
            stream.channel_count()
        );

        // Refill by hand between chunks so the run is deterministic.
        source.set_auto(&false)?;
        source.set_stream(Some(&stream))?;
        source.play()?;

        let mut chunks = 0;
        while source.state() == SourceState::Playing && chunks < options.max_chunks {
            let bytes_before = backend.queued_bytes(handle);
            let consumed = backend.consume(handle, 1);
            if consumed == 0 && bytes_before == 0 {
                backend.finish(handle);
            }
            chunks += consumed;
            source.update()?;
        }
        if source.state() == SourceState::Playing {
            source.stop()?;
        }

        PlayReport {
            chunks,
            bytes: chunks * source.chunk_size(),
            final_state: source.state(),
        }
    } else {
        let buffer = Buffer::from_file(&engine, &options.file, None)?;
        println!(
            "Loaded {} bytes at {} Hz, {}-bit, {} channel(s)",
            buffer.size(),
            buffer.frequency(),
            buffer.bit_depth(),
            buffer.channel_count()
        );

        source.set_buffer(Some(&buffer))?;
        source.play()?;
        backend.finish(handle);
        if source.state() == SourceState::Playing {
            // looping; one pass is enough
            source.stop()?;
        }

        PlayReport {
            chunks: 0,
            bytes: buffer.size(),
            final_state: source.state(),
        }
    };

    println!("Finished in state {} ({} chunk(s))", report.final_state, report.chunks);
    drop(source);
    engine.cleanup();
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_tone(dir: &TempDir, frames: u32) -> PathBuf {
        let path = dir.path().join("tone.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for i in 0..frames {
            writer.write_sample(((i % 64) as i16 - 32) * 500).unwrap();
        }
        writer.finalize().unwrap();
        path
    }

    fn options(file: PathBuf) -> PlayOptions {
        PlayOptions {
            file,
            stream: false,
            looping: false,
            gain: 1.0,
            reverb: None,
            max_chunks: 64,
        }
    }

    #[test]
    fn test_load_config_device_override() {
        let config = load_config(None, Some("Speakers".to_string())).unwrap();
        assert_eq!(config.device.as_deref(), Some("Speakers"));
        assert_eq!(config.default_queue_size, 3);
    }

    #[test]
    fn test_play_static_file() {
        let dir = TempDir::new().unwrap();
        let file = write_tone(&dir, 4000);
        let report = play(EngineConfig::default(), &options(file)).unwrap();
        assert_eq!(report.bytes, 8000);
        assert_eq!(report.final_state, SourceState::Stopped);
    }

    #[test]
    fn test_play_stream_until_end() {
        let dir = TempDir::new().unwrap();
        // 5 full chunks of 9216 bytes, 16-bit mono
        let file = write_tone(&dir, 5 * 9216 / 2);
        let mut config = EngineConfig::default();
        config.default_chunk_size = 9216;
        let mut opts = options(file);
        opts.stream = true;
        opts.reverb = Some("castle-hall".to_string());

        let report = play(config, &opts).unwrap();
        assert_eq!(report.chunks, 5);
        assert_eq!(report.final_state, SourceState::Stopped);
    }

    #[test]
    fn test_looping_stream_hits_chunk_limit() {
        let dir = TempDir::new().unwrap();
        let file = write_tone(&dir, 2000);
        let mut opts = options(file);
        opts.stream = true;
        opts.looping = true;
        opts.max_chunks = 10;

        let report = play(EngineConfig::default(), &opts).unwrap();
        assert_eq!(report.chunks, 10);
        assert_eq!(report.final_state, SourceState::Stopped);
    }

    #[test]
    fn test_unknown_reverb_preset() {
        let dir = TempDir::new().unwrap();
        let file = write_tone(&dir, 100);
        let mut opts = options(file);
        opts.reverb = Some("cathedral".to_string());
        assert!(play(EngineConfig::default(), &opts).unwrap_err().is_validation());
    }
}
