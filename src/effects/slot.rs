//! Auxiliary effect slots.
//!
//! A slot holds at most one effect and is what sources route their
//! auxiliary sends into. The per-source send limit lives on the source side.

use std::sync::Arc;

use parking_lot::Mutex;

use super::reverb::Reverb;
use crate::engine::attribute::{coerce_boolean, Bounds, Truthy};
use crate::engine::backend::{flag, AttributeId, NativeHandle};
use crate::engine::Engine;
use crate::error::Result;

const SLOT_GAIN: Bounds = Bounds::closed(0.0, 1.0);

struct SlotState {
    effect: Option<Reverb>,
    gain: f32,
    auto: bool,
}

struct SlotShared {
    engine: Engine,
    handle: NativeHandle,
    state: Mutex<SlotState>,
}

impl Drop for SlotShared {
    fn drop(&mut self) {
        if let Ok(backend) = self.engine.active_backend() {
            backend.destroy_effect_slot(self.handle);
        }
    }
}

/// A container that applies its effect to every source feeding it
///
/// Clones share the same backend slot.
#[derive(Clone)]
pub struct EffectSlot {
    shared: Arc<SlotShared>,
}

impl std::fmt::Debug for EffectSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("EffectSlot")
            .field("handle", &self.shared.handle)
            .field("effect", &state.effect.as_ref().map(Reverb::native_handle))
            .field("gain", &state.gain)
            .field("auto", &state.auto)
            .finish()
    }
}

impl EffectSlot {
    /// Create an empty slot (gain 1, auto on)
    pub fn new(engine: &Engine) -> Result<Self> {
        let backend = engine.active_backend()?;
        let handle = backend.create_effect_slot()?;
        tracing::debug!(slot = %handle, "effect slot created");

        Ok(Self {
            shared: Arc::new(SlotShared {
                engine: engine.clone(),
                handle,
                state: Mutex::new(SlotState {
                    effect: None,
                    gain: 1.0,
                    auto: true,
                }),
            }),
        })
    }

    /// Create a slot already holding an effect
    ///
    /// # Example
    /// ```
    /// use resonar::{EffectSlot, Engine, Reverb};
    /// let engine = Engine::startup(None).unwrap();
    /// let reverb = Reverb::new(&engine).unwrap();
    /// let slot = EffectSlot::with_effect(&engine, &reverb).unwrap();
    /// assert!(slot.effect().unwrap().ptr_eq(&reverb));
    /// ```
    pub fn with_effect(engine: &Engine, reverb: &Reverb) -> Result<Self> {
        let slot = Self::new(engine)?;
        slot.set_effect(Some(reverb))?;
        Ok(slot)
    }

    /// Load an effect into the slot, or empty it with `None`
    pub fn set_effect(&self, reverb: Option<&Reverb>) -> Result<()> {
        let backend = self.shared.engine.active_backend()?;
        let mut state = self.shared.state.lock();
        backend.bind_effect(self.shared.handle, reverb.map(Reverb::native_handle))?;
        state.effect = reverb.cloned();
        Ok(())
    }

    pub fn effect(&self) -> Option<Reverb> {
        self.shared.state.lock().effect.clone()
    }

    pub fn gain(&self) -> f32 {
        self.shared.state.lock().gain
    }

    /// Output level of the slot, in [0, 1]
    pub fn set_gain(&self, gain: f32) -> Result<()> {
        let backend = self.shared.engine.active_backend()?;
        let gain = SLOT_GAIN.validate("gain", gain)?;
        let mut state = self.shared.state.lock();
        backend.apply_scalar(self.shared.handle, AttributeId::SlotGain, gain)?;
        state.gain = gain;
        Ok(())
    }

    pub fn is_auto(&self) -> bool {
        self.shared.state.lock().auto
    }

    /// Whether the backend adjusts the effect for source distance
    pub fn set_auto<T: Truthy + ?Sized>(&self, auto: &T) -> Result<()> {
        let backend = self.shared.engine.active_backend()?;
        let auto = coerce_boolean(auto);
        let mut state = self.shared.state.lock();
        backend.apply_scalar(self.shared.handle, AttributeId::SlotAuto, flag(auto))?;
        state.auto = auto;
        Ok(())
    }

    pub fn native_handle(&self) -> NativeHandle {
        self.shared.handle
    }

    /// Whether two handles refer to the same slot
    pub fn ptr_eq(&self, other: &EffectSlot) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}
