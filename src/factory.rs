//! Resources Factory
//!
//! A factory caches one registry per logical resource-set name, so every
//! caller asking for the same name shares the same instance. Factories are
//! plain values with controlled lifetimes (construct one at startup, hand
//! it to consumers, `release()` it at shutdown) rather than process-wide
//! singletons, so tests can run against independent instances.

use crate::db::DbResources;
use crate::property::PropertyResources;
use crate::resources::Resources;
use crate::Result;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Name → registry cache shared by the concrete factories.
struct FactoryCore<R> {
    created: Mutex<HashMap<String, Arc<R>>>,
    return_null: AtomicBool,
}

impl<R: Resources> FactoryCore<R> {
    fn new() -> Self {
        Self {
            created: Mutex::new(HashMap::new()),
            return_null: AtomicBool::new(true),
        }
    }

    /// Get-or-create under one lock: the registry for `name` is built at
    /// most once, initialized, and given the factory's return-null default.
    fn get_or_create(&self, name: &str, create: impl FnOnce() -> R) -> Result<Arc<R>> {
        let mut created = self.created.lock();
        if let Some(existing) = created.get(name) {
            return Ok(Arc::clone(existing));
        }

        let resources = create();
        resources.initialize()?;
        resources.set_return_null(self.return_null.load(Ordering::Relaxed));
        debug!(name = %name, "created resources registry");

        let resources = Arc::new(resources);
        created.insert(name.to_string(), Arc::clone(&resources));
        Ok(resources)
    }

    /// Destroy and drop every cached registry. Every entry is attempted
    /// even when one fails; the first failure is reported. The factory
    /// stays usable afterwards.
    fn release(&self) -> Result<()> {
        let mut created = self.created.lock();
        let mut failed = None;
        for (name, resources) in created.drain() {
            debug!(name = %name, "releasing resources registry");
            if let Err(err) = resources.destroy() {
                failed.get_or_insert(err);
            }
        }
        match failed {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn is_return_null(&self) -> bool {
        self.return_null.load(Ordering::Relaxed)
    }

    fn set_return_null(&self, return_null: bool) {
        self.return_null.store(return_null, Ordering::Relaxed);
    }
}

/// Factory for property-file-backed resource-sets.
pub struct PropertyResourcesFactory {
    core: FactoryCore<PropertyResources>,
}

impl PropertyResourcesFactory {
    /// Create an empty factory with the return-null policy enabled.
    pub fn new() -> Self {
        Self {
            core: FactoryCore::new(),
        }
    }

    /// The shared registry for `name`, created on first request over the
    /// property files at `config` (the base path without the
    /// `_<locale>.properties` suffix).
    pub fn get_resources(
        &self,
        name: &str,
        config: impl Into<PathBuf>,
    ) -> Result<Arc<PropertyResources>> {
        let config = config.into();
        self.core
            .get_or_create(name, || PropertyResources::new(name, config))
    }

    /// Destroy and drop every registry created so far; the factory remains
    /// usable and rebuilds on the next [`Self::get_resources`].
    pub fn release(&self) -> Result<()> {
        self.core.release()
    }

    /// The return-null default applied to registries created afterwards.
    pub fn is_return_null(&self) -> bool {
        self.core.is_return_null()
    }

    /// Change the return-null default; already-created registries keep
    /// their current policy.
    pub fn set_return_null(&self, return_null: bool) {
        self.core.set_return_null(return_null);
    }
}

impl Default for PropertyResourcesFactory {
    fn default() -> Self {
        Self::new()
    }
}

/// Factory for database-backed resource-sets.
pub struct DbResourcesFactory {
    core: FactoryCore<DbResources>,
}

impl DbResourcesFactory {
    /// Create an empty factory with the return-null policy enabled.
    pub fn new() -> Self {
        Self {
            core: FactoryCore::new(),
        }
    }

    /// The shared registry for `name`, created on first request over the
    /// database configured at `config` (the path without the `.properties`
    /// suffix).
    pub fn get_resources(
        &self,
        name: &str,
        config: impl Into<PathBuf>,
    ) -> Result<Arc<DbResources>> {
        let config = config.into();
        self.core
            .get_or_create(name, || DbResources::new(name, config))
    }

    /// Destroy and drop every registry created so far; the factory remains
    /// usable and rebuilds on the next [`Self::get_resources`].
    pub fn release(&self) -> Result<()> {
        self.core.release()
    }

    /// The return-null default applied to registries created afterwards.
    pub fn is_return_null(&self) -> bool {
        self.core.is_return_null()
    }

    /// Change the return-null default; already-created registries keep
    /// their current policy.
    pub fn set_return_null(&self, return_null: bool) {
        self.core.set_return_null(return_null);
    }
}

impl Default for DbResourcesFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn fixture_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("testresources_de_DE.properties"),
            "test.key = Testwert\n",
        )
        .unwrap();
        dir
    }

    #[test]
    fn test_same_name_returns_same_instance() {
        let dir = fixture_dir();
        let base = dir.path().join("testresources");
        let factory = PropertyResourcesFactory::new();

        let first = factory.get_resources("TestResources", &base).unwrap();
        let second = factory.get_resources("TestResources", &base).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let other = factory.get_resources("OtherResources", &base).unwrap();
        assert!(!Arc::ptr_eq(&first, &other));
    }

    #[test]
    fn test_release_rebuilds() {
        let dir = fixture_dir();
        let base = dir.path().join("testresources");
        let factory = PropertyResourcesFactory::new();

        let first = factory.get_resources("TestResources", &base).unwrap();
        factory.release().unwrap();

        let rebuilt = factory.get_resources("TestResources", &base).unwrap();
        assert!(!Arc::ptr_eq(&first, &rebuilt));
    }

    #[test]
    fn test_return_null_default_is_not_retroactive() {
        let dir = fixture_dir();
        let base = dir.path().join("testresources");
        let factory = PropertyResourcesFactory::new();
        assert!(factory.is_return_null());

        let before = factory.get_resources("Before", &base).unwrap();
        factory.set_return_null(false);
        let after = factory.get_resources("After", &base).unwrap();

        assert!(before.is_return_null());
        assert!(!after.is_return_null());
    }
}
