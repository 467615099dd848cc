//! Resonar - Control-Plane Audio Engine
//!
//! Resonar manages the objects of a positional audio engine and drives a
//! mixing backend through them:
//! 1. Static buffers and chunked streaming sessions as audio data
//! 2. Sources with a playback state machine, fed from either kind of data
//! 3. Reverb effects and effect slots that sources route into
//!
//! # Architecture
//!
//! Everything hangs off an [`Engine`] context:
//! - [`Source`], [`Buffer`], [`StreamSession`]: audio objects
//! - [`Listener`]: the single point of audition
//! - [`Reverb`], [`EffectSlot`]: environmental effects
//! - [`engine::Backend`]: the seam to the mixer ([`engine::SoftwareBackend`] built in)
//!
//! # Example
//! ```
//! use resonar::{EffectSlot, Engine, Reverb, ReverbPreset, Source};
//!
//! let engine = Engine::startup(None).unwrap();
//! let reverb = Reverb::from_preset(&engine, ReverbPreset::CastleHall).unwrap();
//! let slot = EffectSlot::with_effect(&engine, &reverb).unwrap();
//! let source = Source::new(&engine).unwrap();
//! source.feed(&slot, 0).unwrap();
//! engine.cleanup();
//! ```

pub mod cli;
pub mod config;
pub mod effects;
pub mod engine;
pub mod error;

pub use config::EngineConfig;
pub use effects::{EffectSlot, Reverb, ReverbCategory, ReverbPreset, ReverbProperties};
pub use engine::{
    version, AudioFormat, Buffer, Engine, Listener, PcmFormat, Source, SourceState, SourceType,
    StreamSession,
};
pub use error::{AudioError, ErrorKind, Result};
