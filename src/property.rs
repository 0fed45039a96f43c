//! Property-file backend
//!
//! Bundles backed by flat `key = value` files, one file per locale. The
//! concrete file for a bundle is `<base>_<locale>.properties`, so a base
//! path of `res` and the locale `de_DE` resolve to `res_de_DE.properties`.

use crate::bundle::{substitute, ResourceBundle};
use crate::properties::Properties;
use crate::resources::{RegistryCore, Resources};
use crate::{ResourcesError, Result, SystemLocale};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Resolve the property file for `base` and `locale`.
fn resource_file(base: &Path, locale: &SystemLocale) -> PathBuf {
    let mut file = base.as_os_str().to_os_string();
    file.push(format!("_{}.properties", locale));
    PathBuf::from(file)
}

/// A string table for one locale, loaded from a property file.
///
/// Edits stay in memory until [`save`](ResourceBundle::save) writes them
/// back to the same file.
#[derive(Debug)]
pub struct PropertyResourceBundle {
    locale: SystemLocale,
    path: PathBuf,
    properties: Option<Properties>,
}

impl PropertyResourceBundle {
    /// Load the bundle for `locale` from `<base>_<locale>.properties`.
    ///
    /// Fails with [`ResourcesError::BundleInit`] when the file does not
    /// exist or cannot be read.
    pub fn load(base: impl AsRef<Path>, locale: SystemLocale) -> Result<Self> {
        let path = resource_file(base.as_ref(), &locale);
        if !path.exists() {
            return Err(ResourcesError::BundleInit {
                locale: locale.to_string(),
                reason: format!("property file {} does not exist", path.display()),
            });
        }

        let properties = Properties::load(&path).map_err(|err| ResourcesError::BundleInit {
            locale: locale.to_string(),
            reason: err.to_string(),
        })?;

        debug!(path = %path.display(), locale = %locale, entries = properties.len(),
            "loaded property resource bundle");

        Ok(Self {
            locale,
            path,
            properties: Some(properties),
        })
    }

    /// The file this bundle was loaded from and saves to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn properties(&self) -> Result<&Properties> {
        self.properties.as_ref().ok_or_else(ResourcesError::destroyed)
    }

    fn properties_mut(&mut self) -> Result<&mut Properties> {
        self.properties.as_mut().ok_or_else(ResourcesError::destroyed)
    }
}

impl ResourceBundle for PropertyResourceBundle {
    fn locale(&self) -> &SystemLocale {
        &self.locale
    }

    fn find(&self, key: &str, params: &[(&str, &str)]) -> Result<String> {
        let raw = self.properties()?.get(key).unwrap_or("");
        Ok(substitute(raw, params))
    }

    fn replace(&mut self, key: &str, value: &str) -> Result<()> {
        self.properties_mut()?.set(key, value);
        Ok(())
    }

    fn attach(&mut self, key: &str, value: &str) -> Result<bool> {
        Ok(self.properties_mut()?.set_if_absent(key, value))
    }

    fn find_key_by_value(&self, value: &str) -> Result<Option<String>> {
        Ok(self
            .properties()?
            .key_for_value(value)
            .map(str::to_string))
    }

    fn count(&self) -> Result<usize> {
        Ok(self.properties()?.len())
    }

    fn keys(&self) -> Result<BTreeSet<String>> {
        Ok(self.properties()?.keys().cloned().collect())
    }

    fn save(&mut self) -> Result<()> {
        let path = self.path.clone();
        self.properties()?.store(&path)?;
        debug!(path = %path.display(), "saved property resource bundle");
        Ok(())
    }

    fn destroy(&mut self) -> Result<()> {
        self.properties = None;
        Ok(())
    }
}

/// Registry over property-file bundles for one resource-set.
///
/// The configured base path plus the locale token names the file each
/// bundle loads from; bundles are created lazily on first lookup per
/// locale. See [`Resources`] for the lookup contract and
/// [`PropertyResources::export`]/[`PropertyResources::import`] for the
/// tabular translation workflow.
pub struct PropertyResources {
    core: RegistryCore<PropertyResourceBundle>,
    config: PathBuf,
}

impl PropertyResources {
    /// Create a registry named `name` over the property files at `config`
    /// (the base path without the `_<locale>.properties` suffix).
    pub fn new(name: impl Into<String>, config: impl Into<PathBuf>) -> Self {
        Self {
            core: RegistryCore::new(name),
            config: config.into(),
        }
    }

    /// The configured base path.
    pub fn config(&self) -> &Path {
        &self.config
    }

    pub(crate) fn core(&self) -> &RegistryCore<PropertyResourceBundle> {
        &self.core
    }

    pub(crate) fn load_bundle(&self, locale: &SystemLocale) -> Result<PropertyResourceBundle> {
        PropertyResourceBundle::load(&self.config, locale.clone())
    }
}

impl Resources for PropertyResources {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn find(
        &self,
        key: &str,
        locale: Option<&SystemLocale>,
        params: &[(&str, &str)],
    ) -> Result<String> {
        let locale = self.core.resolve_locale(locale)?;
        let value = self.core.cache.with_bundle(
            &locale,
            || self.load_bundle(&locale),
            |bundle| bundle.find(key, params),
        )?;
        self.core.apply_miss_policy(key, value)
    }

    fn replace(&self, key: &str, locale: Option<&SystemLocale>, value: &str) -> Result<()> {
        let locale = self.core.resolve_locale(locale)?;
        self.core.cache.with_bundle(
            &locale,
            || self.load_bundle(&locale),
            |bundle| bundle.replace(key, value),
        )
    }

    fn attach(&self, key: &str, locale: Option<&SystemLocale>, value: &str) -> Result<bool> {
        let locale = self.core.resolve_locale(locale)?;
        self.core.cache.with_bundle(
            &locale,
            || self.load_bundle(&locale),
            |bundle| bundle.attach(key, value),
        )
    }

    fn keys(&self) -> Result<BTreeSet<String>> {
        self.core.cache.keys()
    }

    fn initialize(&self) -> Result<()> {
        self.core.cache.clear();
        Ok(())
    }

    fn destroy(&self) -> Result<()> {
        self.core.cache.destroy_all()
    }

    fn save(&self) -> Result<()> {
        self.core.cache.save_all()
    }

    fn is_return_null(&self) -> bool {
        self.core.is_return_null()
    }

    fn set_return_null(&self, return_null: bool) {
        self.core.set_return_null(return_null);
    }

    fn default_locale(&self) -> Option<SystemLocale> {
        self.core.default_locale()
    }

    fn set_default_locale(&self, locale: SystemLocale) {
        self.core.set_default_locale(locale);
    }
}
