//! Tabular export/import for property-backed registries
//!
//! Translators work on one delimited table per resource-set: a header row
//! of `keys` plus one column per locale, then one row per resource key.
//! Export pivots the bundles loaded this session into that table; import
//! replays every cell as a `replace` against the matching locale's bundle.

use crate::bundle::ResourceBundle;
use crate::property::PropertyResources;
use crate::{ResourcesError, Result, SystemLocale};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tracing::debug;

impl PropertyResources {
    /// Write the loaded bundles as a delimited table to `path`.
    ///
    /// Columns are the locales loaded this session, in token order; rows
    /// are the union of their keys. A bundle lacking a key contributes an
    /// empty cell.
    pub fn export(&self, path: impl AsRef<Path>) -> Result<()> {
        let bundles = self.core().cache.lock();

        let mut locales: Vec<&String> = bundles.keys().collect();
        locales.sort();

        let mut keys = BTreeSet::new();
        for bundle in bundles.values() {
            keys.extend(bundle.keys()?);
        }

        let mut out = String::new();
        let mut header = vec!["keys".to_string()];
        header.extend(locales.iter().map(|token| token.to_string()));
        encode_row(&mut out, &header);

        for key in &keys {
            let mut row = vec![key.clone()];
            for token in &locales {
                let cell = match bundles.get(token.as_str()) {
                    Some(bundle) => bundle.find(key, &[])?,
                    None => String::new(),
                };
                row.push(cell);
            }
            encode_row(&mut out, &row);
        }

        fs::write(&path, out)?;
        debug!(path = %path.as_ref().display(), keys = keys.len(), locales = locales.len(),
            "exported resource table");
        Ok(())
    }

    /// Read a delimited table from `path` and replay every cell as a
    /// `replace` against the matching locale's bundle.
    ///
    /// The header row names the locales (its first cell is ignored);
    /// bundles are created as locales are encountered, so every named
    /// locale must have a property file. A row with the wrong number of
    /// cells is a [`ResourcesError::General`].
    pub fn import(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = fs::read_to_string(&path)?;
        let mut rows = parse_rows(&content)?;
        if rows.is_empty() {
            return Err(ResourcesError::General(format!(
                "import file {} is empty",
                path.as_ref().display()
            )));
        }

        let header = rows.remove(0);
        if header.len() < 2 {
            return Err(ResourcesError::General(format!(
                "import file {} names no locales",
                path.as_ref().display()
            )));
        }

        let locales = header[1..]
            .iter()
            .map(|token| SystemLocale::parse(token))
            .collect::<Result<Vec<_>>>()?;

        for (idx, row) in rows.iter().enumerate() {
            if row.len() != header.len() {
                return Err(ResourcesError::General(format!(
                    "malformed import row {} (expected {} cells, found {})",
                    idx + 2,
                    header.len(),
                    row.len()
                )));
            }

            let key = &row[0];
            for (locale, cell) in locales.iter().zip(&row[1..]) {
                self.core().cache.with_bundle(
                    locale,
                    || self.load_bundle(locale),
                    |bundle| bundle.replace(key, cell),
                )?;
            }
        }

        debug!(path = %path.as_ref().display(), rows = rows.len(), "imported resource table");
        Ok(())
    }
}

/// Append `cells` to `out` as one comma-delimited line, quoting cells that
/// contain the delimiter, quotes or line breaks.
fn encode_row(out: &mut String, cells: &[String]) {
    for (idx, cell) in cells.iter().enumerate() {
        if idx > 0 {
            out.push(',');
        }
        if cell.contains([',', '"', '\n', '\r']) {
            out.push('"');
            out.push_str(&cell.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(cell);
        }
    }
    out.push('\n');
}

/// Split delimited content into rows of cells, honoring quoted cells with
/// embedded delimiters, quotes and line breaks.
fn parse_rows(content: &str) -> Result<Vec<Vec<String>>> {
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut cell = String::new();
    let mut in_quotes = false;

    let mut chars = content.chars().peekable();
    while let Some(ch) = chars.next() {
        if in_quotes {
            if ch == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    cell.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                cell.push(ch);
            }
            continue;
        }

        match ch {
            '"' if cell.is_empty() => in_quotes = true,
            ',' => row.push(std::mem::take(&mut cell)),
            '\r' => {}
            '\n' => {
                row.push(std::mem::take(&mut cell));
                // A bare newline produces one empty cell; skip such rows.
                if row.len() > 1 || !row[0].is_empty() {
                    rows.push(std::mem::take(&mut row));
                } else {
                    row.clear();
                }
            }
            _ => cell.push(ch),
        }
    }

    if in_quotes {
        return Err(ResourcesError::General(
            "unterminated quoted cell in import file".to_string(),
        ));
    }
    if !cell.is_empty() || !row.is_empty() {
        row.push(cell);
        rows.push(row);
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::Resources;
    use std::path::PathBuf;

    fn fixture_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("testresources_de_DE.properties"),
            "test.key = Testwert\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("testresources_en_US.properties"),
            "test.key = Testvalue\n",
        )
        .unwrap();
        dir
    }

    fn base(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().join("testresources")
    }

    #[test]
    fn test_row_encoding_round_trip() {
        let rows = vec![
            vec!["keys".to_string(), "de_DE".to_string()],
            vec!["plain".to_string(), "Wert, mit Komma".to_string()],
            vec!["quoted".to_string(), "er sagte \"hallo\"\nzweite Zeile".to_string()],
        ];

        let mut out = String::new();
        for row in &rows {
            encode_row(&mut out, row);
        }

        assert_eq!(parse_rows(&out).unwrap(), rows);
    }

    #[test]
    fn test_parse_rejects_unterminated_quote() {
        assert!(parse_rows("key,\"open value\n").is_err());
    }

    #[test]
    fn test_export_pivots_loaded_bundles() {
        let dir = fixture_dir();
        let resources = PropertyResources::new("TestResources", base(&dir));
        resources
            .find("test.key", Some(&SystemLocale::germany()), &[])
            .unwrap();
        resources
            .find("test.key", Some(&SystemLocale::us()), &[])
            .unwrap();

        let table = dir.path().join("table.csv");
        resources.export(&table).unwrap();

        let rows = parse_rows(&fs::read_to_string(&table).unwrap()).unwrap();
        assert_eq!(rows[0], vec!["keys", "de_DE", "en_US"]);
        assert_eq!(rows[1], vec!["test.key", "Testwert", "Testvalue"]);
    }

    #[test]
    fn test_import_replays_cells() {
        let dir = fixture_dir();
        let resources = PropertyResources::new("TestResources", base(&dir));

        let table = dir.path().join("table.csv");
        fs::write(
            &table,
            "keys,de_DE,en_US\ntest.key,Neuwert,Newvalue\ntest.added,Zusatz,Extra\n",
        )
        .unwrap();
        resources.import(&table).unwrap();

        let de = SystemLocale::germany();
        let us = SystemLocale::us();
        assert_eq!(resources.find("test.key", Some(&de), &[]).unwrap(), "Neuwert");
        assert_eq!(resources.find("test.added", Some(&us), &[]).unwrap(), "Extra");
    }

    #[test]
    fn test_import_rejects_ragged_rows() {
        let dir = fixture_dir();
        let resources = PropertyResources::new("TestResources", base(&dir));

        let table = dir.path().join("table.csv");
        fs::write(&table, "keys,de_DE\ntest.key,Wert,extra\n").unwrap();
        assert!(matches!(
            resources.import(&table),
            Err(ResourcesError::General(_))
        ));
    }

    #[test]
    fn test_export_import_round_trip() {
        let dir = fixture_dir();
        let resources = PropertyResources::new("TestResources", base(&dir));
        resources
            .find("test.key", Some(&SystemLocale::germany()), &[])
            .unwrap();
        resources
            .find("test.key", Some(&SystemLocale::us()), &[])
            .unwrap();

        let table = dir.path().join("table.csv");
        resources.export(&table).unwrap();

        // Re-importing the exported table leaves the values unchanged.
        resources.import(&table).unwrap();
        assert_eq!(
            resources
                .find("test.key", Some(&SystemLocale::germany()), &[])
                .unwrap(),
            "Testwert"
        );
    }
}
