//! Locale-Keyed Resource Bundles
//!
//! A registry for localized strings: ask for a logical resource-set and a
//! locale, get back a human-readable string with `{name}` placeholders
//! substituted. Strings live in per-locale bundles backed by either flat
//! `key = value` property files or a relational table; a factory keeps one
//! shared registry per resource-set name.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use resbundle::{PropertyResourcesFactory, Resources, SystemLocale};
//!
//! // One factory per process, one registry per resource-set name.
//! let factory = PropertyResourcesFactory::new();
//! let resources = factory.get_resources("app", "i18n/app")?;
//!
//! // Looks up i18n/app_de_DE.properties, loading the bundle on first use.
//! let locale = SystemLocale::parse("de_DE")?;
//! let greeting = resources.find("app.greeting", Some(&locale), &[("name", "Alice")])?;
//!
//! // Registries are cached: the same name returns the same instance.
//! let again = factory.get_resources("app", "i18n/app")?;
//!
//! factory.release()?;
//! ```
//!
//! # Backends
//!
//! - **Property files** ([`PropertyResources`]): one file per locale,
//!   `<base>_<locale>.properties`, edited in memory and persisted with
//!   `save`. Supports exporting/importing the whole resource-set as a
//!   delimited table for translators.
//! - **Database** ([`DbResources`]): one table with configurable key,
//!   locale and value columns, queried per lookup; writes are immediate.
//!
//! # Missing keys
//!
//! A key absent from a bundle reads as an empty string by default. Switch
//! a registry to strict mode with `set_return_null(false)` and the same
//! lookup fails with [`ResourcesError::KeyNotFound`] instead.

mod bundle;
mod db;
mod error;
mod export;
mod factory;
mod locale;
mod properties;
mod property;
mod resources;

pub use bundle::ResourceBundle;
pub use db::{DbConfig, DbResourceBundle, DbResources};
pub use error::ResourcesError;
pub use factory::{DbResourcesFactory, PropertyResourcesFactory};
pub use locale::SystemLocale;
pub use properties::Properties;
pub use property::{PropertyResourceBundle, PropertyResources};
pub use resources::Resources;

/// Result type for resource operations
pub type Result<T> = std::result::Result<T, ResourcesError>;

/// Prelude for common imports
pub mod prelude {
    pub use crate::{
        DbResources, DbResourcesFactory, PropertyResources, PropertyResourcesFactory,
        ResourceBundle, Resources, ResourcesError, Result, SystemLocale,
    };
}
