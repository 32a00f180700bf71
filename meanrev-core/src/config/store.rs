//! Versioned parameter store for hot reload.
//!
//! Readers take an `Arc` snapshot and keep it for the whole bar evaluation;
//! a writer publishes a new validated snapshot with compare-and-swap on the
//! version. A published snapshot is never mutated.

use parking_lot::RwLock;
use std::sync::Arc;

use super::StrategyParameters;
use crate::error::ConfigError;

#[derive(Debug)]
pub struct ParameterStore {
    inner: RwLock<(u64, Arc<StrategyParameters>)>,
}

impl ParameterStore {
    /// Create a store at version 1. The initial snapshot is validated.
    pub fn new(params: StrategyParameters) -> Result<Self, ConfigError> {
        params.validate()?;
        Ok(Self {
            inner: RwLock::new((1, Arc::new(params))),
        })
    }

    /// Current version and snapshot.
    pub fn snapshot(&self) -> (u64, Arc<StrategyParameters>) {
        let guard = self.inner.read();
        (guard.0, Arc::clone(&guard.1))
    }

    pub fn version(&self) -> u64 {
        self.inner.read().0
    }

    /// Publish `params` if the store is still at `expected_version`.
    ///
    /// Returns the new version. Invalid parameters and version conflicts leave
    /// the current snapshot in place.
    pub fn compare_and_swap(
        &self,
        expected_version: u64,
        params: StrategyParameters,
    ) -> Result<u64, ConfigError> {
        params.validate()?;
        let mut guard = self.inner.write();
        if guard.0 != expected_version {
            return Err(ConfigError::VersionConflict {
                expected: expected_version,
                actual: guard.0,
            });
        }
        guard.0 += 1;
        guard.1 = Arc::new(params);
        Ok(guard.0)
    }

    /// Publish unconditionally on top of whatever is current.
    pub fn publish(&self, params: StrategyParameters) -> Result<u64, ConfigError> {
        params.validate()?;
        let mut guard = self.inner.write();
        guard.0 += 1;
        guard.1 = Arc::new(params);
        Ok(guard.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn swap_bumps_version_and_keeps_old_snapshot_alive() {
        let store = ParameterStore::new(StrategyParameters::default()).unwrap();
        let (v1, old) = store.snapshot();
        assert_eq!(v1, 1);

        let next = StrategyParameters {
            oversold: 25.0,
            ..StrategyParameters::default()
        };
        let v2 = store.compare_and_swap(v1, next).unwrap();
        assert_eq!(v2, 2);
        assert_eq!(old.oversold, 30.0);
        assert_eq!(store.snapshot().1.oversold, 25.0);
    }

    #[test]
    fn stale_version_conflicts() {
        let store = ParameterStore::new(StrategyParameters::default()).unwrap();
        store.publish(StrategyParameters::default()).unwrap();
        let err = store
            .compare_and_swap(1, StrategyParameters::default())
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::VersionConflict {
                expected: 1,
                actual: 2
            }
        );
    }

    #[test]
    fn invalid_params_keep_previous() {
        let store = ParameterStore::new(StrategyParameters::default()).unwrap();
        let bad = StrategyParameters {
            oversold: 80.0,
            ..StrategyParameters::default()
        };
        assert!(store.compare_and_swap(1, bad).is_err());
        assert_eq!(store.version(), 1);
        assert_eq!(store.snapshot().1.oversold, 30.0);
    }

    #[test]
    fn concurrent_publishers_each_get_a_version() {
        let store = Arc::new(ParameterStore::new(StrategyParameters::default()).unwrap());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let params = StrategyParameters {
                        momentum_threshold: 1.0 + i as f64,
                        ..StrategyParameters::default()
                    };
                    store.publish(params).unwrap()
                })
            })
            .collect();
        let mut versions: Vec<u64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        versions.sort_unstable();
        assert_eq!(versions, vec![2, 3, 4, 5]);
    }
}
