//! Lifecycle of a DOM instance mirrored onto a global namespace.
//!
//! [`DomLifecycleManager`] owns the namespace it injects into, the provider
//! that builds DOM instances, and the [`GlobalBindingSet`] used to undo the
//! injection. It moves between two states:
//!
//! - `Uninitialized`: no instance, no injected globals.
//! - `Active`: one instance whose window properties are mirrored as globals.
//!
//! `clear` swaps the document tree of the active instance and leaves every
//! binding alone; `destroy` restores the namespace and releases the instance.

mod bindings;

use std::fmt;

use df_core::DomifyError;
use df_core::DomifyResult;

pub use bindings::GlobalBindingSet;
pub use bindings::PriorBinding;

/// Mutable key/value namespace that DOM globals are mirrored onto.
pub trait GlobalNamespace {
    type Value: Clone;

    /// Current own value of `key`, or `None` when the key is absent.
    fn lookup(&mut self, key: &str) -> DomifyResult<Option<Self::Value>>;

    fn assign(&mut self, key: &str, value: Self::Value) -> DomifyResult<()>;

    fn remove(&mut self, key: &str) -> DomifyResult<()>;

    /// Fails when [`assign`](Self::assign) would refuse `key`. Changes nothing.
    fn ensure_assignable(&mut self, key: &str) -> DomifyResult<()>;
}

/// Builds DOM instances seeded with markup.
pub trait DomProvider<N: GlobalNamespace> {
    type Instance: DomInstance<N>;

    fn instantiate(&mut self, namespace: &mut N, markup: &str) -> DomifyResult<Self::Instance>;
}

/// A live DOM built by a [`DomProvider`].
pub trait DomInstance<N: GlobalNamespace> {
    type Document: Clone;

    /// Enumerable own properties of the window, in enumeration order.
    fn window_properties(&self, namespace: &mut N) -> DomifyResult<Vec<(String, N::Value)>>;

    fn document(&self) -> Self::Document;

    /// Replaces the document tree in place; the window and the document
    /// object keep their identity.
    fn reset_document(&mut self, namespace: &mut N, markup: &str) -> DomifyResult<()>;

    /// Releases the instance. Handles still held elsewhere become detached.
    fn close(self, namespace: &mut N);
}

/// Document handle type produced by provider `P` over namespace `N`.
pub type DocumentOf<N, P> = <<P as DomProvider<N>>::Instance as DomInstance<N>>::Document;

/// What `clear(None)` rebuilds the document from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClearPolicy {
    /// Reparse the markup the instance was created with.
    #[default]
    RestoreSeed,
    /// Start from an empty document.
    Blank,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LifecycleConfig {
    pub clear_policy: ClearPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleStatus {
    Uninitialized,
    Active,
}

struct ActiveDom<I, V> {
    instance: I,
    bindings: GlobalBindingSet<V>,
    seed: String,
}

enum LifecycleState<I, V> {
    Uninitialized,
    Active(ActiveDom<I, V>),
}

/// Creates, clears and destroys the DOM instance mirrored onto `N`.
pub struct DomLifecycleManager<N, P>
where
    N: GlobalNamespace,
    P: DomProvider<N>,
{
    namespace: N,
    provider: P,
    config: LifecycleConfig,
    state: LifecycleState<P::Instance, N::Value>,
}

impl<N, P> DomLifecycleManager<N, P>
where
    N: GlobalNamespace,
    P: DomProvider<N>,
{
    pub fn new(namespace: N, provider: P) -> Self {
        Self::with_config(namespace, provider, LifecycleConfig::default())
    }

    pub fn with_config(namespace: N, provider: P, config: LifecycleConfig) -> Self {
        Self {
            namespace,
            provider,
            config,
            state: LifecycleState::Uninitialized,
        }
    }

    /// Builds a DOM seeded with `seed` and mirrors its window onto the
    /// namespace. An active instance is destroyed first, but only once the
    /// new one has been built and every window key checked against the
    /// namespace, so a failure up to that point leaves the manager as it was.
    ///
    /// Every failure surfaces as `ProviderInitialization`.
    pub fn create(&mut self, seed: Option<&str>) -> DomifyResult<()> {
        let markup = seed.unwrap_or_default();
        let instance = self
            .provider
            .instantiate(&mut self.namespace, markup)
            .map_err(DomifyError::into_provider_initialization)?;
        let properties = match instance.window_properties(&mut self.namespace) {
            Ok(properties) => properties,
            Err(error) => {
                instance.close(&mut self.namespace);
                return Err(error.into_provider_initialization());
            }
        };
        if let Some(error) = properties
            .iter()
            .find_map(|(key, _)| self.namespace.ensure_assignable(key).err())
        {
            instance.close(&mut self.namespace);
            tracing::debug!(%error, "dom instance rejected by namespace");
            return Err(error.into_provider_initialization());
        }

        self.destroy();

        let mut bindings = GlobalBindingSet::default();
        for (key, value) in properties {
            if let Err(error) = bind(&mut self.namespace, &mut bindings, key, value) {
                let failed = bindings.restore(&mut self.namespace);
                instance.close(&mut self.namespace);
                tracing::debug!(
                    %error,
                    unrestored = failed.len(),
                    "dom instance creation rolled back"
                );
                return Err(error.into_provider_initialization());
            }
        }

        tracing::debug!(
            bindings = bindings.len(),
            seed_bytes = markup.len(),
            "dom instance created"
        );
        self.state = LifecycleState::Active(ActiveDom {
            instance,
            bindings,
            seed: markup.to_owned(),
        });
        Ok(())
    }

    /// Rebuilds the document tree of the active instance from `seed`, or from
    /// what the configured [`ClearPolicy`] selects when `seed` is `None`.
    pub fn clear(&mut self, seed: Option<&str>) -> DomifyResult<()> {
        let LifecycleState::Active(active) = &mut self.state else {
            return Err(DomifyError::not_initialized("clear"));
        };

        let markup = match (seed, self.config.clear_policy) {
            (Some(markup), _) => markup,
            (None, ClearPolicy::RestoreSeed) => active.seed.as_str(),
            (None, ClearPolicy::Blank) => "",
        };
        active.instance.reset_document(&mut self.namespace, markup)?;
        tracing::debug!(seed_bytes = markup.len(), "dom document cleared");
        Ok(())
    }

    /// Restores every injected global and releases the instance. No-op when
    /// nothing is active.
    pub fn destroy(&mut self) {
        let LifecycleState::Active(mut active) =
            std::mem::replace(&mut self.state, LifecycleState::Uninitialized)
        else {
            tracing::trace!("destroy without an active dom instance");
            return;
        };

        let recorded = active.bindings.len();
        let failed = active.bindings.restore(&mut self.namespace);
        active.instance.close(&mut self.namespace);
        tracing::debug!(recorded, unrestored = failed.len(), "dom instance destroyed");
    }

    pub fn get_document(&self) -> DomifyResult<DocumentOf<N, P>> {
        match &self.state {
            LifecycleState::Active(active) => Ok(active.instance.document()),
            LifecycleState::Uninitialized => Err(DomifyError::not_initialized("get_document")),
        }
    }

    /// Runs `operation` against the namespace and the active instance.
    pub fn with_active<R>(
        &mut self,
        operation: &'static str,
        f: impl FnOnce(&mut N, &mut P::Instance) -> DomifyResult<R>,
    ) -> DomifyResult<R> {
        let LifecycleState::Active(active) = &mut self.state else {
            return Err(DomifyError::not_initialized(operation));
        };
        f(&mut self.namespace, &mut active.instance)
    }

    pub fn status(&self) -> LifecycleStatus {
        match self.state {
            LifecycleState::Uninitialized => LifecycleStatus::Uninitialized,
            LifecycleState::Active(_) => LifecycleStatus::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status() == LifecycleStatus::Active
    }

    pub fn bindings(&self) -> Option<&GlobalBindingSet<N::Value>> {
        match &self.state {
            LifecycleState::Active(active) => Some(&active.bindings),
            LifecycleState::Uninitialized => None,
        }
    }

    /// Markup the active instance was created with.
    pub fn seed(&self) -> Option<&str> {
        match &self.state {
            LifecycleState::Active(active) => Some(active.seed.as_str()),
            LifecycleState::Uninitialized => None,
        }
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    pub fn namespace(&self) -> &N {
        &self.namespace
    }

    pub fn namespace_mut(&mut self) -> &mut N {
        &mut self.namespace
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Destroys any active instance and hands back the collaborators.
    pub fn into_parts(mut self) -> (N, P) {
        self.destroy();
        let Self {
            namespace,
            provider,
            ..
        } = self;
        (namespace, provider)
    }
}

impl<N, P> fmt::Debug for DomLifecycleManager<N, P>
where
    N: GlobalNamespace,
    P: DomProvider<N>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomLifecycleManager")
            .field("status", &self.status())
            .field("bindings", &self.bindings().map_or(0, GlobalBindingSet::len))
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn bind<N: GlobalNamespace>(
    namespace: &mut N,
    bindings: &mut GlobalBindingSet<N::Value>,
    key: String,
    value: N::Value,
) -> DomifyResult<()> {
    if bindings.contains(&key) {
        return namespace.assign(&key, value);
    }
    let prior = match namespace.lookup(&key)? {
        Some(existing) => PriorBinding::Present(existing),
        None => PriorBinding::Absent,
    };
    namespace.assign(&key, value)?;
    bindings.record(key, prior);
    Ok(())
}
