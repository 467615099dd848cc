//! The listener.
//!
//! Exactly one listener exists per engine context. Its state lives in the
//! context; [`Listener`] values are handles onto it and can only be obtained
//! through [`Engine::listener`].

use crate::engine::attribute::{validate_vec3, Bounds, Vec3};
use crate::engine::backend::{AttributeId, Backend, NativeHandle};
use crate::engine::Engine;
use crate::error::Result;

const LISTENER_GAIN: Bounds = Bounds::at_least(0.0);

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ListenerState {
    position: Vec3,
    velocity: Vec3,
    at: Vec3,
    up: Vec3,
    gain: f32,
}

impl Default for ListenerState {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            velocity: [0.0; 3],
            at: [0.0, 0.0, -1.0],
            up: [0.0, 1.0, 0.0],
            gain: 1.0,
        }
    }
}

impl ListenerState {
    /// Push every attribute to the backend
    pub(crate) fn apply(&self, backend: &dyn Backend) -> Result<()> {
        let handle = NativeHandle::LISTENER;
        backend.apply_vector3(handle, AttributeId::Position, self.position)?;
        backend.apply_vector3(handle, AttributeId::Velocity, self.velocity)?;
        backend.apply_vector3(handle, AttributeId::OrientationAt, self.at)?;
        backend.apply_vector3(handle, AttributeId::OrientationUp, self.up)?;
        backend.apply_scalar(handle, AttributeId::Gain, self.gain)
    }
}

/// Handle onto the context's listener
#[derive(Debug, Clone)]
pub struct Listener {
    engine: Engine,
}

impl Listener {
    pub(crate) fn new(engine: Engine) -> Self {
        Self { engine }
    }

    fn state(&self) -> ListenerState {
        *self.engine.listener_state().lock()
    }

    fn set_vector(&self, attribute: AttributeId, name: &'static str, value: Vec3) -> Result<()> {
        let backend = self.engine.active_backend()?;
        let value = validate_vec3(name, value)?;
        let mut state = self.engine.listener_state().lock();
        backend.apply_vector3(NativeHandle::LISTENER, attribute, value)?;
        match attribute {
            AttributeId::Position => state.position = value,
            _ => state.velocity = value,
        }
        Ok(())
    }

    pub fn position(&self) -> Vec3 {
        self.state().position
    }

    pub fn set_position(&self, position: Vec3) -> Result<()> {
        self.set_vector(AttributeId::Position, "position", position)
    }

    pub fn velocity(&self) -> Vec3 {
        self.state().velocity
    }

    pub fn set_velocity(&self, velocity: Vec3) -> Result<()> {
        self.set_vector(AttributeId::Velocity, "velocity", velocity)
    }

    /// The "at" and "up" vectors
    pub fn orientation(&self) -> (Vec3, Vec3) {
        let state = self.state();
        (state.at, state.up)
    }

    pub fn set_orientation(&self, at: Vec3, up: Vec3) -> Result<()> {
        let backend = self.engine.active_backend()?;
        let at = validate_vec3("orientation", at)?;
        let up = validate_vec3("orientation", up)?;
        let mut state = self.engine.listener_state().lock();
        backend.apply_vector3(NativeHandle::LISTENER, AttributeId::OrientationAt, at)?;
        backend.apply_vector3(NativeHandle::LISTENER, AttributeId::OrientationUp, up)?;
        state.at = at;
        state.up = up;
        Ok(())
    }

    pub fn gain(&self) -> f32 {
        self.state().gain
    }

    /// Master gain, in [0, +inf)
    pub fn set_gain(&self, gain: f32) -> Result<()> {
        let backend = self.engine.active_backend()?;
        let gain = LISTENER_GAIN.validate("gain", gain)?;
        let mut state = self.engine.listener_state().lock();
        backend.apply_scalar(NativeHandle::LISTENER, AttributeId::Gain, gain)?;
        state.gain = gain;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let engine = Engine::startup(None).unwrap();
        let listener = engine.listener().unwrap();
        assert_eq!(listener.position(), [0.0, 0.0, 0.0]);
        assert_eq!(listener.velocity(), [0.0, 0.0, 0.0]);
        assert_eq!(listener.orientation(), ([0.0, 0.0, -1.0], [0.0, 1.0, 0.0]));
        assert_eq!(listener.gain(), 1.0);
    }

    #[test]
    fn test_handles_share_one_listener() {
        let engine = Engine::startup(None).unwrap();
        let first = engine.listener().unwrap();
        let second = engine.listener().unwrap();
        first.set_position([3.0, -2.0, 1.0]).unwrap();
        assert_eq!(second.position(), [3.0, -2.0, 1.0]);
    }

    #[test]
    fn test_negative_gain_is_rejected() {
        let engine = Engine::startup(None).unwrap();
        let listener = engine.listener().unwrap();
        listener.set_gain(2.5).unwrap();
        assert!(listener.set_gain(-0.1).is_err());
        assert_eq!(listener.gain(), 2.5);
    }
}
