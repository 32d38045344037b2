//! Headless DOM for script-driven tests.
//!
//! [`Domify`] pairs a [`ScriptHost`] with a [`BoaDomProvider`] under a
//! [`DomLifecycleManager`]: `create` mirrors a fresh window onto the script
//! global object, `clear` swaps the document tree, `destroy` puts the global
//! object back the way it was.

use std::ops::Deref;
use std::ops::DerefMut;

use boa_engine::JsValue;
use df_lifecycle::DomLifecycleManager;

pub use df_core::DomifyError;
pub use df_core::DomifyResult;
pub use df_js::BoaDomInstance;
pub use df_js::BoaDomProvider;
pub use df_js::DocumentHandle;
pub use df_js::ProviderConfig;
pub use df_js::ScriptHost;
pub use df_js::ScriptHostConfig;
pub use df_lifecycle::ClearPolicy;
pub use df_lifecycle::LifecycleConfig;
pub use df_lifecycle::LifecycleStatus;

/// Aggregated configuration for a [`Domify`] environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomifyConfig {
    pub lifecycle: LifecycleConfig,
    pub provider: ProviderConfig,
    pub script: ScriptHostConfig,
}

/// DOM lifecycle bound to its own script host.
#[derive(Debug)]
pub struct Domify {
    manager: DomLifecycleManager<ScriptHost, BoaDomProvider>,
}

impl Domify {
    pub fn new() -> Self {
        Self::with_config(DomifyConfig::default())
    }

    pub fn with_config(config: DomifyConfig) -> Self {
        let DomifyConfig {
            lifecycle,
            provider,
            script,
        } = config;
        Self {
            manager: DomLifecycleManager::with_config(
                ScriptHost::new(script),
                BoaDomProvider::new(provider),
                lifecycle,
            ),
        }
    }

    /// Builds a DOM from `seed` and exposes its window as globals.
    pub fn create(&mut self, seed: Option<&str>) -> DomifyResult<()> {
        self.manager.create(seed)
    }

    pub fn clear(&mut self, seed: Option<&str>) -> DomifyResult<()> {
        self.manager.clear(seed)
    }

    pub fn destroy(&mut self) {
        self.manager.destroy();
    }

    pub fn get_document(&self) -> DomifyResult<DocumentHandle> {
        self.manager.get_document()
    }

    pub fn status(&self) -> LifecycleStatus {
        self.manager.status()
    }

    pub fn is_active(&self) -> bool {
        self.manager.is_active()
    }

    /// Evaluates `source` against the global object. Works in either state;
    /// DOM globals are only there while a DOM is active.
    pub fn eval(&mut self, origin: &str, source: &str) -> DomifyResult<JsValue> {
        self.manager.namespace_mut().eval(origin, source)
    }

    pub fn eval_string(&mut self, origin: &str, source: &str) -> DomifyResult<String> {
        self.manager.namespace_mut().eval_string(origin, source)
    }

    /// Runs up to `limit` queued timer callbacks of the active DOM.
    pub fn flush_timers(&mut self, limit: u32) -> DomifyResult<u32> {
        self.manager
            .with_active("flush_timers", |host, instance| instance.flush_timers(host, limit))
    }

    pub fn pending_timers(&mut self) -> DomifyResult<u32> {
        self.manager
            .with_active("pending_timers", |host, instance| instance.pending_timers(host))
    }

    pub fn host(&self) -> &ScriptHost {
        self.manager.namespace()
    }

    pub fn host_mut(&mut self) -> &mut ScriptHost {
        self.manager.namespace_mut()
    }

    pub fn manager(&self) -> &DomLifecycleManager<ScriptHost, BoaDomProvider> {
        &self.manager
    }

    /// Creates a DOM that is destroyed when the returned guard drops.
    pub fn session(&mut self, seed: Option<&str>) -> DomifyResult<DomSession<'_>> {
        self.create(seed)?;
        Ok(DomSession { domify: self })
    }
}

impl Default for Domify {
    fn default() -> Self {
        Self::new()
    }
}

/// Scoped DOM; destroys on drop.
#[derive(Debug)]
pub struct DomSession<'a> {
    domify: &'a mut Domify,
}

impl Deref for DomSession<'_> {
    type Target = Domify;

    fn deref(&self) -> &Domify {
        self.domify
    }
}

impl DerefMut for DomSession<'_> {
    fn deref_mut(&mut self) -> &mut Domify {
        self.domify
    }
}

impl Drop for DomSession<'_> {
    fn drop(&mut self) {
        tracing::trace!("dom session closing");
        self.domify.destroy();
    }
}

include!("tests.rs");
