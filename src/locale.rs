//! Locale Identity
//!
//! Provides the locale value type used to key resource bundles, plus access
//! to the locales installed on the host system.

use crate::{ResourcesError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::env;
use std::ffi::CString;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::process::Command;
use std::str::FromStr;
use tracing::warn;

/// A locale identifies a geographical, political or cultural region for
/// which localized resources exist.
///
/// The token form is `language[_COUNTRY[_VARIANT]]`: a lowercase two-letter
/// ISO-639 language code, an uppercase two-letter ISO-3166 country code and
/// a vendor-specific variant. The variant may itself contain underscores
/// (`es_ES_Traditional_WIN` has the variant `Traditional_WIN`).
///
/// Two locales are equal when their canonical tokens are equal, regardless
/// of how they were constructed.
///
/// # Examples
///
/// ```
/// use resbundle::SystemLocale;
/// use std::str::FromStr;
///
/// let de_de = SystemLocale::from_str("de_DE").unwrap();
/// assert_eq!(de_de.to_string(), "de_DE");
/// assert_eq!(de_de, SystemLocale::germany());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SystemLocale {
    language: String,
    country: String,
    variant: String,
}

impl SystemLocale {
    /// Create a locale from its parts. At least one of language/country must
    /// be non-empty.
    pub fn new(
        language: impl Into<String>,
        country: Option<impl Into<String>>,
        variant: Option<impl Into<String>>,
    ) -> Result<Self> {
        let language = language.into();
        let country = country.map(Into::into).unwrap_or_default();
        let variant = variant.map(Into::into).unwrap_or_default();

        if language.is_empty() && country.is_empty() {
            return Err(ResourcesError::InvalidLocale(
                "either language or country must have a value".to_string(),
            ));
        }

        Ok(Self {
            language,
            country,
            variant,
        })
    }

    /// Parse a `language[_COUNTRY[_VARIANT]]` token.
    ///
    /// The first underscore separates language from country, the second
    /// country from variant; anything after the second underscore belongs to
    /// the variant. An empty token is an error.
    pub fn parse(token: &str) -> Result<Self> {
        let token = token.trim();
        if token.is_empty() {
            return Err(ResourcesError::InvalidLocale(
                "empty locale token".to_string(),
            ));
        }

        let mut segments = token.splitn(3, '_');
        let language = segments.next().unwrap_or("");
        let country = segments.next();
        let variant = segments.next();
        Self::new(language, country, variant)
    }

    /// The lowercase ISO-639 language code; may be empty when the locale was
    /// constructed from a country alone.
    pub fn language(&self) -> &str {
        &self.language
    }

    /// The uppercase ISO-3166 country code; may be empty.
    pub fn country(&self) -> &str {
        &self.country
    }

    /// The vendor or browser specific variant; may be empty.
    pub fn variant(&self) -> &str {
        &self.variant
    }

    // Common locales

    /// United States (`en_US`)
    pub fn us() -> Self {
        Self {
            language: "en".to_string(),
            country: "US".to_string(),
            variant: String::new(),
        }
    }

    /// United Kingdom (`en_UK`)
    pub fn uk() -> Self {
        Self {
            language: "en".to_string(),
            country: "UK".to_string(),
            variant: String::new(),
        }
    }

    /// Germany (`de_DE`)
    pub fn germany() -> Self {
        Self {
            language: "de".to_string(),
            country: "DE".to_string(),
            variant: String::new(),
        }
    }

    /// Resolve the host's default locale from the environment.
    ///
    /// Checks `LC_ALL`, then `LC_MESSAGES`, then `LANG`; a `.codeset` or
    /// `@modifier` suffix is stripped before parsing.
    pub fn current() -> Result<Self> {
        for var in ["LC_ALL", "LC_MESSAGES", "LANG"] {
            match env::var(var) {
                Ok(raw) if !raw.trim().is_empty() => {
                    return Self::parse(strip_codeset(raw.trim()));
                }
                _ => continue,
            }
        }
        Err(ResourcesError::NoSystemLocale)
    }

    /// Enumerate the locales installed on the host via `locale -a`.
    ///
    /// Codeset suffixes are stripped and duplicates removed, so the listing
    /// compares cleanly against parsed tokens. Lines that do not parse are
    /// skipped with a warning.
    pub fn available() -> Result<Vec<Self>> {
        let output = Command::new("locale").arg("-a").output().map_err(|err| {
            ResourcesError::General(format!("cannot enumerate system locales: {err}"))
        })?;

        if !output.status.success() {
            return Err(ResourcesError::General(format!(
                "locale -a exited with {}",
                output.status
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut locales: Vec<Self> = Vec::new();
        for line in stdout.lines() {
            let token = strip_codeset(line.trim());
            if token.is_empty() {
                continue;
            }
            match Self::parse(token) {
                Ok(locale) => {
                    if !locales.contains(&locale) {
                        locales.push(locale);
                    }
                }
                Err(_) => warn!(line = %line, "skipping unparseable system locale"),
            }
        }

        Ok(locales)
    }

    /// Set the process default locale.
    ///
    /// Fails with [`ResourcesError::LocaleNotInstalled`] when the locale is
    /// absent from [`SystemLocale::available`], and with
    /// [`ResourcesError::LocaleApply`] when the host rejects the setting.
    pub fn set_default(new_locale: &Self) -> Result<()> {
        if !Self::available()?
            .iter()
            .any(|candidate| candidate == new_locale)
        {
            return Err(ResourcesError::LocaleNotInstalled(new_locale.to_string()));
        }

        let token = new_locale.to_string();
        let c_token = CString::new(token.clone())
            .map_err(|_| ResourcesError::InvalidLocale(token.clone()))?;

        // SAFETY: setlocale copies the string; the CString outlives the call.
        let applied = unsafe { libc::setlocale(libc::LC_ALL, c_token.as_ptr()) };
        if applied.is_null() {
            return Err(ResourcesError::LocaleApply(token));
        }

        // Keep the environment in sync so current() observes the change.
        // SAFETY: single mutation of the process environment; callers of
        // set_default are configuring process-wide state by intent.
        unsafe { env::set_var("LC_ALL", &token) };

        Ok(())
    }
}

/// Drops the `.codeset` / `@modifier` tail of tokens like `en_US.UTF-8`.
fn strip_codeset(raw: &str) -> &str {
    match raw.find(['.', '@']) {
        Some(idx) => &raw[..idx],
        None => raw,
    }
}

impl fmt::Display for SystemLocale {
    /// The canonical token: language, then `_country` and `_variant` when
    /// non-empty. Empty segments are omitted entirely.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.language.is_empty() {
            f.write_str(&self.language)?;
        }
        if !self.country.is_empty() {
            write!(f, "_{}", self.country)?;
        }
        if !self.variant.is_empty() {
            write!(f, "_{}", self.variant)?;
        }
        Ok(())
    }
}

impl FromStr for SystemLocale {
    type Err = ResourcesError;

    fn from_str(token: &str) -> Result<Self> {
        Self::parse(token)
    }
}

impl TryFrom<String> for SystemLocale {
    type Error = ResourcesError;

    fn try_from(token: String) -> Result<Self> {
        Self::parse(&token)
    }
}

impl From<SystemLocale> for String {
    fn from(locale: SystemLocale) -> Self {
        locale.to_string()
    }
}

// Locale identity is the canonical token, not the field structure, so
// Eq/Hash/Ord all go through Display.

impl PartialEq for SystemLocale {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

impl Eq for SystemLocale {}

impl Hash for SystemLocale {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_string().hash(state);
    }
}

impl PartialOrd for SystemLocale {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SystemLocale {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_string().cmp(&other.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_language_only() {
        let locale = SystemLocale::parse("en").unwrap();
        assert_eq!(locale.language(), "en");
        assert_eq!(locale.country(), "");
        assert_eq!(locale.variant(), "");
    }

    #[test]
    fn test_parse_language_and_country() {
        let locale = SystemLocale::parse("de_DE").unwrap();
        assert_eq!(locale.language(), "de");
        assert_eq!(locale.country(), "DE");
    }

    #[test]
    fn test_parse_full_token() {
        let locale = SystemLocale::parse("es_ES_Traditional").unwrap();
        assert_eq!(locale.language(), "es");
        assert_eq!(locale.country(), "ES");
        assert_eq!(locale.variant(), "Traditional");
    }

    #[test]
    fn test_variant_keeps_extra_underscores() {
        let locale = SystemLocale::parse("es_ES_Traditional_WIN").unwrap();
        assert_eq!(locale.variant(), "Traditional_WIN");
        assert_eq!(locale.to_string(), "es_ES_Traditional_WIN");
    }

    #[test]
    fn test_parse_empty_token_fails() {
        assert!(SystemLocale::parse("").is_err());
        assert!(SystemLocale::parse("   ").is_err());
    }

    #[test]
    fn test_round_trip() {
        for token in ["en", "en_US", "de_DE", "de_DE_Bavarian", "es_ES_Traditional_WIN"] {
            let locale = SystemLocale::parse(token).unwrap();
            assert_eq!(locale.to_string(), token);
        }
    }

    #[test]
    fn test_country_only() {
        let locale = SystemLocale::parse("_US").unwrap();
        assert_eq!(locale.language(), "");
        assert_eq!(locale.country(), "US");
        assert_eq!(locale.to_string(), "_US");
    }

    #[test]
    fn test_new_requires_language_or_country() {
        assert!(SystemLocale::new("", None::<&str>, None::<&str>).is_err());
        assert!(SystemLocale::new("", Some("US"), None::<&str>).is_ok());
    }

    #[test]
    fn test_equality_is_canonical() {
        let constructed = SystemLocale::new("en", Some("US"), None::<&str>).unwrap();
        let parsed = SystemLocale::parse("en_US").unwrap();
        assert_eq!(constructed, parsed);
        assert_eq!(constructed, SystemLocale::us());
    }

    #[test]
    fn test_ordering_by_token() {
        let mut locales = vec![
            SystemLocale::us(),
            SystemLocale::germany(),
            SystemLocale::parse("en").unwrap(),
        ];
        locales.sort();
        let tokens: Vec<String> = locales.iter().map(|l| l.to_string()).collect();
        assert_eq!(tokens, vec!["de_DE", "en", "en_US"]);
    }

    #[test]
    fn test_string_conversions() {
        let locale = SystemLocale::try_from("de_DE_Bavarian".to_string()).unwrap();
        assert_eq!(String::from(locale), "de_DE_Bavarian");
        assert!(SystemLocale::try_from(String::new()).is_err());
    }

    #[test]
    fn test_strip_codeset() {
        assert_eq!(strip_codeset("en_US.UTF-8"), "en_US");
        assert_eq!(strip_codeset("de_DE@euro"), "de_DE");
        assert_eq!(strip_codeset("fr_FR"), "fr_FR");
    }
}
