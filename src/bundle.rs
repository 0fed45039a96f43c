//! Resource Bundle contract
//!
//! A resource bundle owns the string table for exactly one locale. The two
//! backends (property file, database) both satisfy [`ResourceBundle`]; the
//! registry layer never cares which one it is talking to.

use crate::{Result, SystemLocale};
use std::collections::BTreeSet;

/// The string table for one (resource-set, locale) pair.
///
/// A bundle loads its backend data on construction and releases it on
/// [`destroy`](ResourceBundle::destroy); after `destroy` every operation
/// fails. A missing key is not an error at this layer:
/// [`find`](ResourceBundle::find) returns an empty string and the registry
/// decides whether that becomes an error.
pub trait ResourceBundle {
    /// The locale this bundle holds strings for.
    fn locale(&self) -> &SystemLocale;

    /// Raw string for `key`, or an empty string when absent. Each `{name}`
    /// placeholder is replaced by the matching value from `params`;
    /// unmatched placeholders stay verbatim.
    fn find(&self, key: &str, params: &[(&str, &str)]) -> Result<String>;

    /// Upsert; overwrites silently when the key exists.
    fn replace(&mut self, key: &str, value: &str) -> Result<()>;

    /// Insert only when the key is absent; returns `Ok(false)` and keeps
    /// the existing value otherwise.
    fn attach(&mut self, key: &str, value: &str) -> Result<bool>;

    /// First key holding exactly `value`.
    fn find_key_by_value(&self, value: &str) -> Result<Option<String>>;

    /// Number of distinct keys in this bundle's locale.
    fn count(&self) -> Result<usize>;

    /// All keys in this bundle's locale.
    fn keys(&self) -> Result<BTreeSet<String>>;

    /// Persist in-memory changes to durable storage.
    fn save(&mut self) -> Result<()>;

    /// Release the backend handle; the bundle is unusable afterwards.
    fn destroy(&mut self) -> Result<()>;
}

/// Replace `{name}` placeholders in `template` with the values from
/// `params`. Placeholders without a matching parameter are left verbatim.
pub(crate) fn substitute(template: &str, params: &[(&str, &str)]) -> String {
    if params.is_empty() {
        return template.to_string();
    }

    let mut resolved = template.to_string();
    for (name, value) in params {
        let placeholder = format!("{{{}}}", name);
        resolved = resolved.replace(&placeholder, value);
    }
    resolved
}
