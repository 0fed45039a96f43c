//! Resources Registry
//!
//! A registry owns one named resource-set across every locale touched so
//! far. Bundles are created lazily on first lookup per locale and cached;
//! the cache lock is held across the whole check/construct/insert sequence
//! so at most one bundle per locale can ever exist.

use crate::bundle::ResourceBundle;
use crate::{ResourcesError, Result, SystemLocale};
use parking_lot::{Mutex, MutexGuard, RwLock};
use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

/// One named resource-set across all locales loaded so far.
///
/// Implemented by [`PropertyResources`](crate::PropertyResources) and
/// [`DbResources`](crate::DbResources). All methods take `&self`; a registry
/// is shared behind an [`Arc`](std::sync::Arc) by its factory.
pub trait Resources {
    /// Logical name of this resource-set.
    fn name(&self) -> &str;

    /// Look up `key` for `locale` (explicit, else the registry default,
    /// else the host locale), creating and caching the locale's bundle on
    /// first use. An empty result fails with
    /// [`ResourcesError::KeyNotFound`] when the return-null policy is off.
    fn find(&self, key: &str, locale: Option<&SystemLocale>, params: &[(&str, &str)])
        -> Result<String>;

    /// Upsert `key` in the resolved locale's bundle, creating the bundle if
    /// necessary.
    fn replace(&self, key: &str, locale: Option<&SystemLocale>, value: &str) -> Result<()>;

    /// Insert `key` into the resolved locale's bundle only when absent;
    /// returns `Ok(false)` when the key already exists.
    fn attach(&self, key: &str, locale: Option<&SystemLocale>, value: &str) -> Result<bool>;

    /// Union of keys across every bundle loaded this session.
    fn keys(&self) -> Result<BTreeSet<String>>;

    /// Reset the bundle cache to empty.
    fn initialize(&self) -> Result<()>;

    /// Destroy every cached bundle, then reset the cache. The registry
    /// stays usable; the next lookup reloads.
    fn destroy(&self) -> Result<()>;

    /// Persist every cached bundle without removing any.
    fn save(&self) -> Result<()>;

    /// Whether a missing key yields an empty value (true) or an error.
    fn is_return_null(&self) -> bool;

    /// Change the missing-key policy.
    fn set_return_null(&self, return_null: bool);

    /// The registry's default locale, if one has been set.
    fn default_locale(&self) -> Option<SystemLocale>;

    /// Set the registry's default locale.
    fn set_default_locale(&self, locale: SystemLocale);
}

/// Locale-token → bundle cache shared by both registry backends.
///
/// The mutex is held across check, construct and insert, so a locale's
/// bundle is constructed at most once and a failed construction leaves no
/// cache entry behind (the next lookup retries).
pub(crate) struct BundleCache<B> {
    bundles: Mutex<HashMap<String, B>>,
}

impl<B: ResourceBundle> BundleCache<B> {
    pub(crate) fn new() -> Self {
        Self {
            bundles: Mutex::new(HashMap::new()),
        }
    }

    /// Run `apply` against the bundle for `locale`, loading it first when
    /// it is not cached yet.
    pub(crate) fn with_bundle<T>(
        &self,
        locale: &SystemLocale,
        load: impl FnOnce() -> Result<B>,
        apply: impl FnOnce(&mut B) -> Result<T>,
    ) -> Result<T> {
        let mut bundles = self.bundles.lock();
        let bundle = match bundles.entry(locale.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(load()?),
        };
        apply(bundle)
    }

    /// Direct access to the underlying map, for operations that pivot
    /// across every loaded bundle (export).
    pub(crate) fn lock(&self) -> MutexGuard<'_, HashMap<String, B>> {
        self.bundles.lock()
    }

    /// Union of keys across all loaded bundles.
    pub(crate) fn keys(&self) -> Result<BTreeSet<String>> {
        let bundles = self.bundles.lock();
        let mut all = BTreeSet::new();
        for bundle in bundles.values() {
            all.extend(bundle.keys()?);
        }
        Ok(all)
    }

    /// Drop every bundle without destroying backend state.
    pub(crate) fn clear(&self) {
        self.bundles.lock().clear();
    }

    /// Destroy every bundle, then reset the cache. All bundles are
    /// attempted even when one fails; the first failure is reported.
    pub(crate) fn destroy_all(&self) -> Result<()> {
        let mut bundles = self.bundles.lock();
        let mut failed = None;
        for (_, mut bundle) in bundles.drain() {
            if let Err(err) = bundle.destroy() {
                failed.get_or_insert(err);
            }
        }
        match failed {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Persist every bundle, keeping all of them cached.
    pub(crate) fn save_all(&self) -> Result<()> {
        let mut bundles = self.bundles.lock();
        for bundle in bundles.values_mut() {
            bundle.save()?;
        }
        Ok(())
    }
}

/// State every registry backend shares: name, default locale, missing-key
/// policy and the bundle cache.
pub(crate) struct RegistryCore<B> {
    name: String,
    default_locale: RwLock<Option<SystemLocale>>,
    return_null: AtomicBool,
    pub(crate) cache: BundleCache<B>,
}

impl<B: ResourceBundle> RegistryCore<B> {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default_locale: RwLock::new(None),
            return_null: AtomicBool::new(true),
            cache: BundleCache::new(),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Explicit argument, else the registry default, else the host locale.
    pub(crate) fn resolve_locale(&self, explicit: Option<&SystemLocale>) -> Result<SystemLocale> {
        if let Some(locale) = explicit {
            return Ok(locale.clone());
        }
        if let Some(locale) = self.default_locale.read().as_ref() {
            return Ok(locale.clone());
        }
        SystemLocale::current()
    }

    /// Turn an empty value into [`ResourcesError::KeyNotFound`] when the
    /// return-null policy is off.
    pub(crate) fn apply_miss_policy(&self, key: &str, value: String) -> Result<String> {
        if value.is_empty() && !self.is_return_null() {
            return Err(ResourcesError::KeyNotFound(key.to_string()));
        }
        Ok(value)
    }

    pub(crate) fn is_return_null(&self) -> bool {
        self.return_null.load(Ordering::Relaxed)
    }

    pub(crate) fn set_return_null(&self, return_null: bool) {
        self.return_null.store(return_null, Ordering::Relaxed);
    }

    pub(crate) fn default_locale(&self) -> Option<SystemLocale> {
        self.default_locale.read().clone()
    }

    pub(crate) fn set_default_locale(&self, locale: SystemLocale) {
        *self.default_locale.write() = Some(locale);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    /// Counting in-memory bundle used to observe construction behavior.
    struct FakeBundle {
        locale: SystemLocale,
        entries: HashMap<String, String>,
        destroyed: bool,
    }

    impl FakeBundle {
        fn new(locale: SystemLocale) -> Self {
            Self {
                locale,
                entries: HashMap::new(),
                destroyed: false,
            }
        }
    }

    impl ResourceBundle for FakeBundle {
        fn locale(&self) -> &SystemLocale {
            &self.locale
        }

        fn find(&self, key: &str, params: &[(&str, &str)]) -> Result<String> {
            let raw = self.entries.get(key).cloned().unwrap_or_default();
            Ok(crate::bundle::substitute(&raw, params))
        }

        fn replace(&mut self, key: &str, value: &str) -> Result<()> {
            self.entries.insert(key.to_string(), value.to_string());
            Ok(())
        }

        fn attach(&mut self, key: &str, value: &str) -> Result<bool> {
            if self.entries.contains_key(key) {
                return Ok(false);
            }
            self.entries.insert(key.to_string(), value.to_string());
            Ok(true)
        }

        fn find_key_by_value(&self, value: &str) -> Result<Option<String>> {
            Ok(self
                .entries
                .iter()
                .find(|(_, candidate)| candidate.as_str() == value)
                .map(|(key, _)| key.clone()))
        }

        fn count(&self) -> Result<usize> {
            Ok(self.entries.len())
        }

        fn keys(&self) -> Result<BTreeSet<String>> {
            Ok(self.entries.keys().cloned().collect())
        }

        fn save(&mut self) -> Result<()> {
            Ok(())
        }

        fn destroy(&mut self) -> Result<()> {
            self.destroyed = true;
            self.entries.clear();
            Ok(())
        }
    }

    #[test]
    fn test_bundle_constructed_once_per_locale() {
        let cache: BundleCache<FakeBundle> = BundleCache::new();
        let constructions = AtomicUsize::new(0);
        let locale = SystemLocale::germany();

        for _ in 0..3 {
            cache
                .with_bundle(
                    &locale,
                    || {
                        constructions.fetch_add(1, Ordering::SeqCst);
                        Ok(FakeBundle::new(locale.clone()))
                    },
                    |bundle| bundle.find("any.key", &[]),
                )
                .unwrap();
        }

        assert_eq!(constructions.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_second_locale_constructs_second_bundle() {
        let cache: BundleCache<FakeBundle> = BundleCache::new();
        let constructions = AtomicUsize::new(0);

        for locale in [SystemLocale::germany(), SystemLocale::us(), SystemLocale::germany()] {
            cache
                .with_bundle(
                    &locale,
                    || {
                        constructions.fetch_add(1, Ordering::SeqCst);
                        Ok(FakeBundle::new(locale.clone()))
                    },
                    |bundle| bundle.find("any.key", &[]),
                )
                .unwrap();
        }

        assert_eq!(constructions.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_failed_construction_is_not_cached() {
        let cache: BundleCache<FakeBundle> = BundleCache::new();
        let locale = SystemLocale::us();

        let failed = cache.with_bundle(
            &locale,
            || Err(ResourcesError::General("backend down".to_string())),
            |bundle| bundle.find("any.key", &[]),
        );
        assert!(failed.is_err());

        // The next lookup retries construction and succeeds.
        cache
            .with_bundle(
                &locale,
                || Ok(FakeBundle::new(locale.clone())),
                |bundle| bundle.replace("k", "v"),
            )
            .unwrap();
        assert_eq!(cache.keys().unwrap().len(), 1);
    }

    #[test]
    fn test_keys_union_across_bundles() {
        let cache: BundleCache<FakeBundle> = BundleCache::new();
        for (locale, key) in [(SystemLocale::germany(), "a"), (SystemLocale::us(), "b")] {
            cache
                .with_bundle(
                    &locale,
                    || Ok(FakeBundle::new(locale.clone())),
                    |bundle| bundle.replace(key, "v"),
                )
                .unwrap();
        }
        let keys = cache.keys().unwrap();
        assert_eq!(keys, BTreeSet::from(["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn test_destroy_all_resets_cache() {
        let cache: BundleCache<FakeBundle> = BundleCache::new();
        let locale = SystemLocale::germany();
        cache
            .with_bundle(
                &locale,
                || Ok(FakeBundle::new(locale.clone())),
                |bundle| bundle.replace("k", "v"),
            )
            .unwrap();

        cache.destroy_all().unwrap();
        assert!(cache.keys().unwrap().is_empty());
    }

    #[test]
    fn test_miss_policy() {
        let core: RegistryCore<FakeBundle> = RegistryCore::new("TestResources");
        assert!(core.is_return_null());
        assert_eq!(core.apply_miss_policy("k", String::new()).unwrap(), "");

        core.set_return_null(false);
        assert!(matches!(
            core.apply_miss_policy("k", String::new()),
            Err(ResourcesError::KeyNotFound(_))
        ));
        assert_eq!(
            core.apply_miss_policy("k", "value".to_string()).unwrap(),
            "value"
        );
    }

    #[test]
    fn test_resolve_locale_prefers_explicit_then_default() {
        let core: RegistryCore<FakeBundle> = RegistryCore::new("TestResources");
        core.set_default_locale(SystemLocale::germany());

        let explicit = SystemLocale::us();
        assert_eq!(core.resolve_locale(Some(&explicit)).unwrap(), explicit);
        assert_eq!(core.resolve_locale(None).unwrap(), SystemLocale::germany());
    }
}
