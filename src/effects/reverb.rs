//! Reverb effect parameters.
//!
//! A [`Reverb`] is a backend effect object plus a validated copy of its
//! parameters. It does nothing on its own; load it into an
//! [`EffectSlot`](super::EffectSlot) and feed that slot from sources.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::presets::ReverbPreset;
use crate::engine::attribute::{coerce_boolean, Bounds, Truthy};
use crate::engine::backend::{flag, AttributeId, Backend, NativeHandle};
use crate::engine::Engine;
use crate::error::Result;

// ============================================================================
// Parameter Bounds
// ============================================================================

const UNIT: Bounds = Bounds::closed(0.0, 1.0);
const DECAY_TIME: Bounds = Bounds::closed(0.1, 20.0);
const HFDECAY_RATIO: Bounds = Bounds::closed(0.1, 2.0);
const AIR_ABSORBTION_HFGAIN: Bounds = Bounds::closed(0.892, 1.0);
const LATE_DELAY: Bounds = Bounds::closed(0.0, 0.1);
const LATE_GAIN: Bounds = Bounds::closed(0.0, 10.0);
const REFLECTIONS_DELAY: Bounds = Bounds::closed(0.0, 0.3);
const REFLECTIONS_GAIN: Bounds = Bounds::closed(0.0, 3.16);
const ROOM_ROLLOFF_FACTOR: Bounds = Bounds::closed(0.0, 10.0);

// ============================================================================
// Parameter Struct
// ============================================================================

/// The full parameter set of a reverb
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReverbProperties {
    /// Modal density of the late reverberation, [0, 1]
    pub density: f32,
    /// Echo density of the late reverberation, [0, 1]
    pub diffusion: f32,
    /// Master level of reflected sound, [0, 1]
    pub gain: f32,
    /// High frequency attenuation, [0, 1]
    pub hfgain: f32,
    /// Reverberation decay time in seconds, [0.1, 20]
    pub decay_time: f32,
    /// Ratio of high frequency to mid frequency decay time, [0.1, 2]
    pub hfdecay_ratio: f32,
    /// Level of early reflections, [0, 3.16]
    pub reflections_gain: f32,
    /// Delay of the first reflection in seconds, [0, 0.3]
    pub reflections_delay: f32,
    /// Level of late reverberation, [0, 10]
    pub late_gain: f32,
    /// Delay of late reverberation after the first reflection, [0, 0.1]
    pub late_delay: f32,
    /// High frequency air absorption per meter, [0.892, 1]
    pub air_absorbtion_hfgain: f32,
    /// Distance attenuation of reflected sound, [0, 10]
    pub room_rolloff_factor: f32,
    /// Limit high frequency decay by air absorption
    pub hfdecay_limited: bool,
}

impl Default for ReverbProperties {
    fn default() -> Self {
        ReverbPreset::Generic.properties()
    }
}

impl ReverbProperties {
    fn bounded(&self) -> [(&'static str, AttributeId, f32, Bounds); 12] {
        [
            ("density", AttributeId::Density, self.density, UNIT),
            ("diffusion", AttributeId::Diffusion, self.diffusion, UNIT),
            ("gain", AttributeId::ReverbGain, self.gain, UNIT),
            ("hfgain", AttributeId::HfGain, self.hfgain, UNIT),
            ("decay_time", AttributeId::DecayTime, self.decay_time, DECAY_TIME),
            ("hfdecay_ratio", AttributeId::HfDecayRatio, self.hfdecay_ratio, HFDECAY_RATIO),
            ("reflections_gain", AttributeId::ReflectionsGain, self.reflections_gain, REFLECTIONS_GAIN),
            ("reflections_delay", AttributeId::ReflectionsDelay, self.reflections_delay, REFLECTIONS_DELAY),
            ("late_gain", AttributeId::LateGain, self.late_gain, LATE_GAIN),
            ("late_delay", AttributeId::LateDelay, self.late_delay, LATE_DELAY),
            (
                "air_absorbtion_hfgain",
                AttributeId::AirAbsorptionHfGain,
                self.air_absorbtion_hfgain,
                AIR_ABSORBTION_HFGAIN,
            ),
            (
                "room_rolloff_factor",
                AttributeId::RoomRolloffFactor,
                self.room_rolloff_factor,
                ROOM_ROLLOFF_FACTOR,
            ),
        ]
    }

    /// Check every parameter against its bounds
    pub fn validate(&self) -> Result<()> {
        for (name, _, value, bounds) in self.bounded() {
            bounds.validate(name, value)?;
        }
        Ok(())
    }

    fn apply(&self, backend: &dyn Backend, handle: NativeHandle) -> Result<()> {
        for (_, attribute, value, _) in self.bounded() {
            backend.apply_scalar(handle, attribute, value)?;
        }
        backend.apply_scalar(handle, AttributeId::HfDecayLimited, flag(self.hfdecay_limited))
    }
}

// ============================================================================
// Reverb
// ============================================================================

struct ReverbShared {
    engine: Engine,
    handle: NativeHandle,
    properties: Mutex<ReverbProperties>,
}

impl Drop for ReverbShared {
    fn drop(&mut self) {
        if let Ok(backend) = self.engine.active_backend() {
            backend.destroy_reverb(self.handle);
        }
    }
}

/// A reverb effect object
///
/// Clones share the same backend effect.
#[derive(Clone)]
pub struct Reverb {
    shared: Arc<ReverbShared>,
}

impl std::fmt::Debug for Reverb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reverb")
            .field("handle", &self.shared.handle)
            .field("properties", &*self.shared.properties.lock())
            .finish()
    }
}

macro_rules! reverb_parameter {
    ($(#[$doc:meta])* $field:ident, $setter:ident, $attribute:ident, $bounds:expr) => {
        $(#[$doc])*
        pub fn $field(&self) -> f32 {
            self.shared.properties.lock().$field
        }

        pub fn $setter(&self, value: f32) -> Result<()> {
            let backend = self.shared.engine.active_backend()?;
            let value = $bounds.validate(stringify!($field), value)?;
            let mut properties = self.shared.properties.lock();
            backend.apply_scalar(self.shared.handle, AttributeId::$attribute, value)?;
            properties.$field = value;
            Ok(())
        }
    };
}

impl Reverb {
    /// Create a reverb initialized to the generic preset
    ///
    /// # Example
    /// ```
    /// use resonar::{Engine, Reverb};
    /// let engine = Engine::startup(None).unwrap();
    /// let reverb = Reverb::new(&engine).unwrap();
    /// assert_eq!(reverb.decay_time(), 1.49);
    /// ```
    pub fn new(engine: &Engine) -> Result<Self> {
        Self::with_properties(engine, ReverbProperties::default())
    }

    /// Create a reverb initialized to a preset
    pub fn from_preset(engine: &Engine, preset: ReverbPreset) -> Result<Self> {
        Self::with_properties(engine, preset.properties())
    }

    /// Create a reverb from a JSON parameter object; missing fields take
    /// the generic preset's values
    pub fn from_json(engine: &Engine, json: &str) -> Result<Self> {
        let properties: ReverbProperties = serde_json::from_str(json)?;
        Self::with_properties(engine, properties)
    }

    fn with_properties(engine: &Engine, properties: ReverbProperties) -> Result<Self> {
        properties.validate()?;
        let backend = engine.active_backend()?;
        let handle = backend.create_reverb()?;
        if let Err(err) = properties.apply(backend, handle) {
            backend.destroy_reverb(handle);
            return Err(err);
        }
        tracing::debug!(reverb = %handle, "reverb created");

        Ok(Self {
            shared: Arc::new(ReverbShared {
                engine: engine.clone(),
                handle,
                properties: Mutex::new(properties),
            }),
        })
    }

    /// Bulk-apply a preset's values
    pub fn load(&self, preset: ReverbPreset) -> Result<()> {
        self.set_properties(preset.properties())?;
        tracing::debug!(reverb = %self.shared.handle, preset = %preset, "reverb preset loaded");
        Ok(())
    }

    /// Replace every parameter at once; nothing changes if any value is out
    /// of bounds
    pub fn set_properties(&self, properties: ReverbProperties) -> Result<()> {
        let backend = self.shared.engine.active_backend()?;
        properties.validate()?;
        let mut current = self.shared.properties.lock();
        properties.apply(backend, self.shared.handle)?;
        *current = properties;
        Ok(())
    }

    /// Snapshot of the current parameters
    pub fn properties(&self) -> ReverbProperties {
        *self.shared.properties.lock()
    }

    /// Serialize the current parameters
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.properties())?)
    }

    reverb_parameter!(density, set_density, Density, UNIT);
    reverb_parameter!(diffusion, set_diffusion, Diffusion, UNIT);
    reverb_parameter!(gain, set_gain, ReverbGain, UNIT);
    reverb_parameter!(hfgain, set_hfgain, HfGain, UNIT);
    reverb_parameter!(
        /// Seconds
        decay_time, set_decay_time, DecayTime, DECAY_TIME
    );
    reverb_parameter!(hfdecay_ratio, set_hfdecay_ratio, HfDecayRatio, HFDECAY_RATIO);
    reverb_parameter!(reflections_gain, set_reflections_gain, ReflectionsGain, REFLECTIONS_GAIN);
    reverb_parameter!(
        /// Seconds
        reflections_delay, set_reflections_delay, ReflectionsDelay, REFLECTIONS_DELAY
    );
    reverb_parameter!(late_gain, set_late_gain, LateGain, LATE_GAIN);
    reverb_parameter!(
        /// Seconds
        late_delay, set_late_delay, LateDelay, LATE_DELAY
    );
    reverb_parameter!(
        air_absorbtion_hfgain,
        set_air_absorbtion_hfgain,
        AirAbsorptionHfGain,
        AIR_ABSORBTION_HFGAIN
    );
    reverb_parameter!(
        room_rolloff_factor,
        set_room_rolloff_factor,
        RoomRolloffFactor,
        ROOM_ROLLOFF_FACTOR
    );

    pub fn is_hfdecay_limited(&self) -> bool {
        self.shared.properties.lock().hfdecay_limited
    }

    pub fn set_hfdecay_limited<T: Truthy + ?Sized>(&self, value: &T) -> Result<()> {
        let backend = self.shared.engine.active_backend()?;
        let value = coerce_boolean(value);
        let mut properties = self.shared.properties.lock();
        backend.apply_scalar(self.shared.handle, AttributeId::HfDecayLimited, flag(value))?;
        properties.hfdecay_limited = value;
        Ok(())
    }

    /// Backend handle of this effect
    pub fn native_handle(&self) -> NativeHandle {
        self.shared.handle
    }

    /// Whether two handles refer to the same reverb
    pub fn ptr_eq(&self, other: &Reverb) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AudioError;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_is_generic() {
        assert_eq!(ReverbProperties::default(), ReverbPreset::Generic.properties());
    }

    #[test]
    fn test_validate_reports_first_bad_field() {
        let props = ReverbProperties {
            late_delay: 0.2,
            ..ReverbProperties::default()
        };
        match props.validate() {
            Err(AudioError::InvalidParameter { attribute, .. }) => assert_eq!(attribute, "late_delay"),
            other => panic!("expected InvalidParameter, got {:?}", other),
        }
    }

    #[test]
    fn test_json_fills_missing_fields() {
        let props: ReverbProperties = serde_json::from_str(r#"{"decay_time": 3.0}"#).unwrap();
        assert_eq!(props.decay_time, 3.0);
        assert_eq!(props.density, 1.0);
        assert!(props.hfdecay_limited);
    }
}
