//! Error types for resource lookup and bundle management

use thiserror::Error;

/// Errors that can occur while resolving locales or working with resource
/// bundles.
#[derive(Debug, Error)]
pub enum ResourcesError {
    /// Locale token could not be parsed
    #[error("invalid locale: {0}")]
    InvalidLocale(String),

    /// No host locale is configured (LC_ALL, LC_MESSAGES and LANG all unset)
    #[error("no system locale set")]
    NoSystemLocale,

    /// Locale is not present in the host's installed locale list
    #[error("system locale {0} is not installed")]
    LocaleNotInstalled(String),

    /// The host rejected the locale setting
    #[error("default locale cannot be set to {0}")]
    LocaleApply(String),

    /// Backend data for a bundle could not be loaded
    #[error("cannot initialize resource bundle for locale {locale}: {reason}")]
    BundleInit { locale: String, reason: String },

    /// Requested key has no value and the registry's return-null policy is off
    #[error("found no value for requested resource {0}")]
    KeyNotFound(String),

    /// Backend configuration is missing or malformed
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Database error
    #[error("database error: {0}")]
    Sql(#[from] rusqlite::Error),

    /// Unexpected backend failure (malformed import files and the like)
    #[error("{0}")]
    General(String),
}

impl ResourcesError {
    /// Error returned by every operation on a bundle after `destroy()`.
    pub(crate) fn destroyed() -> Self {
        ResourcesError::General("resource bundle has been destroyed".to_string())
    }
}
