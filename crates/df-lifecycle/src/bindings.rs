//! Record of globals injected by the lifecycle manager.

use df_core::DomifyResult;

use crate::GlobalNamespace;

/// What occupied a global key before the manager overwrote it.
#[derive(Debug, Clone, PartialEq)]
pub enum PriorBinding<V> {
    Absent,
    Present(V),
}

impl<V> PriorBinding<V> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

/// Injected key to prior value, in injection order.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalBindingSet<V> {
    entries: Vec<(String, PriorBinding<V>)>,
}

impl<V> Default for GlobalBindingSet<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<V> GlobalBindingSet<V> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.prior(key).is_some()
    }

    pub fn prior(&self, key: &str) -> Option<&PriorBinding<V>> {
        self.entries
            .iter()
            .find(|(candidate, _)| candidate == key)
            .map(|(_, prior)| prior)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    /// Records `prior` for `key`. A key already recorded keeps its first
    /// prior value, which is the one that predates the injection.
    pub(crate) fn record(&mut self, key: String, prior: PriorBinding<V>) {
        if !self.contains(&key) {
            self.entries.push((key, prior));
        }
    }
}

impl<V: Clone> GlobalBindingSet<V> {
    /// Puts every recorded key back, newest first, and reports the keys the
    /// namespace refused. The set is drained either way.
    pub(crate) fn restore<N>(&mut self, namespace: &mut N) -> Vec<String>
    where
        N: GlobalNamespace<Value = V>,
    {
        let mut failed = Vec::new();
        while let Some((key, prior)) = self.entries.pop() {
            let outcome: DomifyResult<()> = match prior {
                PriorBinding::Absent => namespace.remove(&key),
                PriorBinding::Present(value) => namespace.assign(&key, value),
            };
            if let Err(error) = outcome {
                tracing::warn!(key = %key, %error, "failed to restore global binding");
                failed.push(key);
            }
        }
        failed
    }
}
