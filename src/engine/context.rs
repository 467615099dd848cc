//! Engine context lifecycle.
//!
//! An [`Engine`] owns the opened device and everything created on it. Every
//! audio object keeps a handle to its engine; once the engine is cleaned up
//! those objects refuse further backend work.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::config::EngineConfig;
use crate::engine::backend::{Backend, DeviceInfo};
use crate::engine::listener::{Listener, ListenerState};
use crate::engine::software::SoftwareBackend;
use crate::engine::source::SourceShared;
use crate::error::{AudioError, Result};

/// Library version, semantic-version shaped
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub(crate) struct EngineShared {
    backend: Arc<dyn Backend>,
    config: EngineConfig,
    device: DeviceInfo,
    released: AtomicBool,
    listener: Mutex<ListenerState>,
    sources: Mutex<Vec<Weak<SourceShared>>>,
}

impl Drop for EngineShared {
    fn drop(&mut self) {
        if !self.released.swap(true, Ordering::SeqCst) {
            self.backend.close_device();
            tracing::info!(device = %self.device.name, "audio context released on drop");
        }
    }
}

/// An initialized audio context
///
/// Cloning is cheap; all clones refer to the same context.
#[derive(Clone)]
pub struct Engine {
    shared: Arc<EngineShared>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("device", &self.shared.device.name)
            .field("active", &self.is_active())
            .finish()
    }
}

impl Engine {
    /// Start the built-in software backend on a device (the default for `None`)
    ///
    /// # Example
    /// ```
    /// use resonar::Engine;
    /// let engine = Engine::startup(None).unwrap();
    /// assert!(engine.per_source_effect_limit().unwrap() > 0);
    /// assert!(Engine::startup(Some("no such device")).is_err());
    /// ```
    pub fn startup(device: Option<&str>) -> Result<Self> {
        let config = EngineConfig {
            device: device.map(str::to_string),
            ..EngineConfig::default()
        };
        Self::startup_with(Arc::new(SoftwareBackend::new()), config)
    }

    /// Start an engine on any backend with explicit configuration
    pub fn startup_with(backend: Arc<dyn Backend>, mut config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let device = backend.open_device(config.device.as_deref(), config.auxiliary_sends)?;

        let listener = ListenerState::default();
        if let Err(err) = listener.apply(backend.as_ref()) {
            backend.close_device();
            return Err(err);
        }

        tracing::info!(
            device = %device.name,
            auxiliary_sends = device.max_auxiliary_sends,
            "audio context started"
        );

        Ok(Self {
            shared: Arc::new(EngineShared {
                backend,
                config,
                device,
                released: AtomicBool::new(false),
                listener: Mutex::new(listener),
                sources: Mutex::new(Vec::new()),
            }),
        })
    }

    /// Release the device and stop every background worker.
    ///
    /// Idempotent. Objects created on this engine fail with
    /// "context has been cleaned up" afterwards.
    pub fn cleanup(&self) {
        if self.shared.released.swap(true, Ordering::SeqCst) {
            return;
        }

        let sources: Vec<_> = self
            .shared
            .sources
            .lock()
            .drain(..)
            .filter_map(|weak| weak.upgrade())
            .collect();
        for source in &sources {
            source.halt_refill();
        }

        self.shared.backend.close_device();
        tracing::info!(device = %self.shared.device.name, "audio context cleaned up");
    }

    pub fn is_active(&self) -> bool {
        !self.shared.released.load(Ordering::SeqCst)
    }

    /// The one listener of this context
    pub fn listener(&self) -> Result<Listener> {
        self.ensure_active()?;
        Ok(Listener::new(self.clone()))
    }

    /// Maximum number of effect slots a single source can feed
    pub fn per_source_effect_limit(&self) -> Result<usize> {
        self.ensure_active()?;
        Ok(self.shared.device.max_auxiliary_sends)
    }

    /// Devices offered by the backend
    pub fn devices(&self) -> Vec<String> {
        self.shared.backend.devices()
    }

    /// Name of the opened device
    pub fn device_name(&self) -> &str {
        &self.shared.device.name
    }

    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    // ------------------------------------------------------------------
    // Crate-internal access
    // ------------------------------------------------------------------

    pub(crate) fn ensure_active(&self) -> Result<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(AudioError::ContextReleased)
        }
    }

    /// The backend, provided the context is still alive
    pub(crate) fn active_backend(&self) -> Result<&dyn Backend> {
        self.ensure_active()?;
        Ok(self.shared.backend.as_ref())
    }

    pub(crate) fn listener_state(&self) -> &Mutex<ListenerState> {
        &self.shared.listener
    }

    pub(crate) fn register_source(&self, source: Weak<SourceShared>) {
        let mut sources = self.shared.sources.lock();
        sources.retain(|weak| weak.strong_count() > 0);
        sources.push(source);
    }
}
