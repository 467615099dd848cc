//! Auxiliary effects
//!
//! - Reverb parameter containers and named presets
//! - Effect slots that sources feed through auxiliary sends

pub mod presets;
pub mod reverb;
pub mod slot;

pub use presets::{ReverbCategory, ReverbPreset};
pub use reverb::{Reverb, ReverbProperties};
pub use slot::EffectSlot;
