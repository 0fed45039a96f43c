//! Database backend
//!
//! Bundles backed by a relational table with configurable table and column
//! names. Every statement is scoped to the bundle's locale; writes hit the
//! database immediately, so `save` has nothing to do.
//!
//! The connection configuration is a flat property file:
//!
//! ```text
//! db.connect.dsn = sqlite:/tmp/my-database.sqlite
//! db.connect.user =
//! db.connect.password =
//! db.sql.table = resources
//! db.sql.locale.column = locale
//! db.sql.key.column = msg_key
//! db.sql.val.column = val
//! resource.cache = true
//! ```

use crate::bundle::{substitute, ResourceBundle};
use crate::properties::Properties;
use crate::resources::{RegistryCore, Resources};
use crate::{ResourcesError, Result, SystemLocale};
use parking_lot::Mutex;
use rusqlite::{params, Connection, ErrorCode};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Connection and schema settings for a database-backed resource-set.
#[derive(Debug, Clone)]
pub struct DbConfig {
    dsn: String,
    user: String,
    password: String,
    table: String,
    locale_column: String,
    key_column: String,
    value_column: String,
    cache_resources: bool,
}

impl DbConfig {
    /// Configuration key for the DSN used to connect to the database.
    pub const CONNECT_DSN: &'static str = "db.connect.dsn";
    /// Configuration key for the database user.
    pub const CONNECT_USER: &'static str = "db.connect.user";
    /// Configuration key for the database password.
    pub const CONNECT_PASSWORD: &'static str = "db.connect.password";
    /// Configuration key for the table holding the resources.
    pub const SQL_TABLE: &'static str = "db.sql.table";
    /// Configuration key for the column holding the locale token.
    pub const SQL_LOCALE_COLUMN: &'static str = "db.sql.locale.column";
    /// Configuration key for the column holding the resource key.
    pub const SQL_KEY_COLUMN: &'static str = "db.sql.key.column";
    /// Configuration key for the column holding the resource value.
    pub const SQL_VAL_COLUMN: &'static str = "db.sql.val.column";
    /// Configuration key for the value-memo flag.
    pub const RESOURCE_CACHE: &'static str = "resource.cache";

    /// Load the configuration from `<path>.properties`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let mut file = path.as_ref().as_os_str().to_os_string();
        file.push(".properties");
        let properties = Properties::load(&file).map_err(|err| {
            ResourcesError::Config(format!(
                "cannot read database configuration {}: {err}",
                Path::new(&file).display()
            ))
        })?;
        Self::from_properties(&properties)
    }

    /// Build the configuration from an already-parsed property map.
    pub fn from_properties(properties: &Properties) -> Result<Self> {
        let required = |key: &str| -> Result<String> {
            properties
                .get(key)
                .map(str::to_string)
                .ok_or_else(|| ResourcesError::Config(format!("missing configuration key {key}")))
        };
        let optional =
            |key: &str| properties.get(key).map(str::to_string).unwrap_or_default();

        Ok(Self {
            dsn: required(Self::CONNECT_DSN)?,
            user: optional(Self::CONNECT_USER),
            password: optional(Self::CONNECT_PASSWORD),
            table: required(Self::SQL_TABLE)?,
            locale_column: required(Self::SQL_LOCALE_COLUMN)?,
            key_column: required(Self::SQL_KEY_COLUMN)?,
            value_column: required(Self::SQL_VAL_COLUMN)?,
            cache_resources: properties
                .get(Self::RESOURCE_CACHE)
                .map(|raw| raw.eq_ignore_ascii_case("true") || raw == "1")
                .unwrap_or(false),
        })
    }

    /// The configured DSN.
    pub fn dsn(&self) -> &str {
        &self.dsn
    }

    /// The configured database user; ignored by the SQLite driver.
    pub fn user(&self) -> &str {
        &self.user
    }

    /// The configured database password; ignored by the SQLite driver.
    pub fn password(&self) -> &str {
        &self.password
    }

    /// The configured table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Whether values fetched by `find` are memoized in memory.
    pub fn cache_resources(&self) -> bool {
        self.cache_resources
    }

    /// Open a connection for this configuration.
    ///
    /// Supported DSNs are `sqlite:<path>` and `sqlite::memory:`. User and
    /// password are accepted for DSN compatibility; the SQLite driver has
    /// no use for them.
    fn open(&self) -> Result<Connection> {
        let Some(target) = self.dsn.strip_prefix("sqlite:") else {
            return Err(ResourcesError::Config(format!(
                "unsupported DSN {} (expected sqlite:<path>)",
                self.dsn
            )));
        };

        let conn = if target == ":memory:" {
            Connection::open_in_memory()?
        } else {
            Connection::open(target)?
        };

        if !self.user.is_empty() {
            debug!(user = %self.user, "ignoring credentials for sqlite DSN");
        }

        Ok(conn)
    }
}

/// A string table for one locale, stored in a relational table.
///
/// The bundle exclusively owns its connection; `destroy` closes it. When
/// `resource.cache` is set, values fetched by `find` are memoized and the
/// memo is kept coherent by `replace`/`attach`.
pub struct DbResourceBundle {
    locale: SystemLocale,
    config: DbConfig,
    conn: Option<Connection>,
    memo: Option<Mutex<HashMap<String, String>>>,
}

impl DbResourceBundle {
    /// Load the bundle for `locale` from the database configured at
    /// `<config>.properties`.
    ///
    /// Fails with [`ResourcesError::BundleInit`] when the configuration
    /// cannot be read or the database cannot be opened.
    pub fn load(config: impl AsRef<Path>, locale: SystemLocale) -> Result<Self> {
        let config = DbConfig::load(config.as_ref()).map_err(|err| ResourcesError::BundleInit {
            locale: locale.to_string(),
            reason: err.to_string(),
        })?;
        Self::with_config(config, locale)
    }

    /// Load the bundle for `locale` with an already-built configuration.
    pub fn with_config(config: DbConfig, locale: SystemLocale) -> Result<Self> {
        let conn = config.open().map_err(|err| ResourcesError::BundleInit {
            locale: locale.to_string(),
            reason: err.to_string(),
        })?;

        debug!(locale = %locale, table = %config.table, "opened database resource bundle");

        let memo = config.cache_resources.then(|| Mutex::new(HashMap::new()));
        Ok(Self {
            locale,
            config,
            conn: Some(conn),
            memo,
        })
    }

    /// The configuration this bundle was opened with.
    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    fn conn(&self) -> Result<&Connection> {
        self.conn.as_ref().ok_or_else(ResourcesError::destroyed)
    }

    fn memoize(&self, key: &str, value: &str) {
        if let Some(memo) = &self.memo {
            memo.lock().insert(key.to_string(), value.to_string());
        }
    }
}

impl ResourceBundle for DbResourceBundle {
    fn locale(&self) -> &SystemLocale {
        &self.locale
    }

    fn find(&self, key: &str, params: &[(&str, &str)]) -> Result<String> {
        if let Some(memo) = &self.memo {
            if let Some(hit) = memo.lock().get(key) {
                return Ok(substitute(hit, params));
            }
        }

        let conn = self.conn()?;
        let sql = format!(
            "SELECT \"{}\" FROM \"{}\" WHERE \"{}\" = ?1 AND \"{}\" = ?2",
            self.config.value_column, self.config.table, self.config.key_column,
            self.config.locale_column,
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params![key, self.locale.to_string()])?;

        let mut resource = String::new();
        while let Some(row) = rows.next()? {
            resource = row.get(0)?;
        }

        self.memoize(key, &resource);
        Ok(substitute(&resource, params))
    }

    fn replace(&mut self, key: &str, value: &str) -> Result<()> {
        let token = self.locale.to_string();
        let conn = self.conn()?;
        let update = format!(
            "UPDATE \"{}\" SET \"{}\" = ?1 WHERE \"{}\" = ?2 AND \"{}\" = ?3",
            self.config.table, self.config.value_column, self.config.key_column,
            self.config.locale_column,
        );
        let affected = conn.execute(&update, params![value, key, token])?;

        // Upsert: a key not present yet is inserted instead.
        if affected == 0 {
            let insert = format!(
                "INSERT INTO \"{}\" (\"{}\", \"{}\", \"{}\") VALUES (?1, ?2, ?3)",
                self.config.table, self.config.key_column, self.config.value_column,
                self.config.locale_column,
            );
            conn.execute(&insert, params![key, value, token])?;
        }

        self.memoize(key, value);
        Ok(())
    }

    fn attach(&mut self, key: &str, value: &str) -> Result<bool> {
        let token = self.locale.to_string();
        let conn = self.conn()?;
        let insert = format!(
            "INSERT INTO \"{}\" (\"{}\", \"{}\", \"{}\") VALUES (?1, ?2, ?3)",
            self.config.table, self.config.key_column, self.config.value_column,
            self.config.locale_column,
        );

        match conn.execute(&insert, params![key, value, token]) {
            Ok(_) => {
                self.memoize(key, value);
                Ok(true)
            }
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn find_key_by_value(&self, value: &str) -> Result<Option<String>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT \"{}\" FROM \"{}\" WHERE \"{}\" = ?1 AND \"{}\" = ?2",
            self.config.key_column, self.config.table, self.config.value_column,
            self.config.locale_column,
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params![value, self.locale.to_string()])?;

        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    fn count(&self) -> Result<usize> {
        let conn = self.conn()?;
        // Grouping by the key column keeps duplicate rows from
        // double-counting; the number of groups is the number of keys.
        let sql = format!(
            "SELECT COUNT(\"{}\") FROM \"{}\" WHERE \"{}\" = ?1 GROUP BY \"{}\"",
            self.config.key_column, self.config.table, self.config.locale_column,
            self.config.key_column,
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params![self.locale.to_string()])?;

        let mut distinct = 0;
        while rows.next()?.is_some() {
            distinct += 1;
        }
        Ok(distinct)
    }

    fn keys(&self) -> Result<BTreeSet<String>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT \"{}\" FROM \"{}\" WHERE \"{}\" = ?1 GROUP BY \"{}\"",
            self.config.key_column, self.config.table, self.config.locale_column,
            self.config.key_column,
        );
        let mut stmt = conn.prepare(&sql)?;
        let keys = stmt
            .query_map(params![self.locale.to_string()], |row| {
                row.get::<_, String>(0)
            })?
            .collect::<std::result::Result<BTreeSet<_>, _>>()?;
        Ok(keys)
    }

    fn save(&mut self) -> Result<()> {
        // Writes are immediate on replace/attach.
        Ok(())
    }

    fn destroy(&mut self) -> Result<()> {
        self.memo = None;
        if let Some(conn) = self.conn.take() {
            conn.close().map_err(|(_, err)| ResourcesError::from(err))?;
        }
        Ok(())
    }
}

/// Registry over database bundles for one resource-set.
///
/// Each locale's bundle opens its own exclusively-owned connection from
/// the configuration at `<config>.properties`.
pub struct DbResources {
    core: RegistryCore<DbResourceBundle>,
    config: PathBuf,
}

impl DbResources {
    /// Create a registry named `name` over the database configured at
    /// `config` (the path without the `.properties` suffix).
    pub fn new(name: impl Into<String>, config: impl Into<PathBuf>) -> Self {
        Self {
            core: RegistryCore::new(name),
            config: config.into(),
        }
    }

    /// The configured path (without the `.properties` suffix).
    pub fn config(&self) -> &Path {
        &self.config
    }

    fn load_bundle(&self, locale: &SystemLocale) -> Result<DbResourceBundle> {
        DbResourceBundle::load(&self.config, locale.clone())
    }
}

impl Resources for DbResources {
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
