//! Message catalog: every locale resource bundled into the binary, keyed by locale code.
//!
//! The catalog is built once in `main` and handed to each `Messages` resolver
//! behind an `Arc`. It is never mutated after construction.

use std::collections::BTreeMap;

use rust_embed::RustEmbed;
use tracing::{debug, warn};

/// Fluent resources compiled into the binary, one file per locale (`<code>.ftl`).
#[derive(RustEmbed)]
#[folder = "locales/"]
#[include = "*.ftl"]
struct LocaleFiles;

/// Locale code → raw Fluent resource text.
#[derive(Debug, Clone, Default)]
pub struct MessageCatalog {
    entries: BTreeMap<String, String>,
}

impl MessageCatalog {
    /// Builds the catalog from the resources embedded at build time.
    pub fn embedded() -> Self {
        let files = LocaleFiles::iter().filter_map(|path| {
            let file = LocaleFiles::get(&path)?;
            match String::from_utf8(file.data.into_owned()) {
                Ok(text) => Some((path.into_owned(), text)),
                Err(_) => {
                    warn!("Skipping locale file {path}: not valid UTF-8");
                    None
                }
            }
        });

        let catalog = Self::from_files(files);
        debug!(locales = ?catalog.locales().collect::<Vec<_>>(), "Message catalog loaded");
        catalog
    }

    /// Builds the catalog from an explicit `(path, text)` file set.
    /// Files whose name yields no locale code are ignored.
    pub fn from_files<I, P, T>(files: I) -> Self
    where
        I: IntoIterator<Item = (P, T)>,
        P: AsRef<str>,
        T: Into<String>,
    {
        let mut entries = BTreeMap::new();
        for (path, text) in files {
            match locale_code_from_path(path.as_ref()) {
                Some(code) => {
                    entries.insert(code.to_string(), text.into());
                }
                None => warn!("Ignoring locale file with no usable name: {}", path.as_ref()),
            }
        }
        Self { entries }
    }

    /// Raw resource text for a locale code.
    pub fn get(&self, locale: &str) -> Option<&str> {
        self.entries.get(locale).map(String::as_str)
    }

    /// Available locale codes, sorted.
    pub fn locales(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Derives the locale code from a resource path: directory and extension stripped.
///
/// `./locales/en-US.ftl` → `en-US`. Everything after the first `.` of the
/// file name is treated as extension.
pub fn locale_code_from_path(path: &str) -> Option<&str> {
    let file_name = path.rsplit(|c| c == '/' || c == '\\').next()?;
    let code = file_name.split('.').next()?;
    if code.is_empty() {
        None
    } else {
        Some(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locale_code_strips_directory_and_extension() {
        assert_eq!(locale_code_from_path("./locales/en.ftl"), Some("en"));
        assert_eq!(locale_code_from_path("locales/pt-BR.ftl"), Some("pt-BR"));
        assert_eq!(locale_code_from_path("fr.ftl"), Some("fr"));
        assert_eq!(locale_code_from_path("C:\\locales\\de.ftl"), Some("de"));
    }

    #[test]
    fn test_locale_code_uses_text_before_first_dot() {
        assert_eq!(locale_code_from_path("locales/en.main.ftl"), Some("en"));
    }

    #[test]
    fn test_locale_code_rejects_empty_names() {
        assert_eq!(locale_code_from_path("locales/.ftl"), None);
        assert_eq!(locale_code_from_path("locales/"), None);
    }

    #[test]
    fn test_from_files_indexes_by_locale_code() {
        let catalog = MessageCatalog::from_files([
            ("./locales/fr.ftl", "greeting = Bonjour"),
            ("./locales/en.ftl", "greeting = Hello"),
        ]);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get("en"), Some("greeting = Hello"));
        assert_eq!(catalog.get("fr"), Some("greeting = Bonjour"));
        assert_eq!(catalog.get("de"), None);
        // Sorted regardless of insertion order
        assert_eq!(catalog.locales().collect::<Vec<_>>(), vec!["en", "fr"]);
    }

    #[test]
    fn test_empty_catalog_is_legal() {
        let catalog = MessageCatalog::from_files(Vec::<(&str, &str)>::new());
        assert!(catalog.is_empty());
        assert_eq!(catalog.locales().count(), 0);
    }

    #[test]
    fn test_embedded_catalog_contains_bundled_locales() {
        let catalog = MessageCatalog::embedded();
        for code in ["de", "en", "es", "fr", "pt"] {
            assert!(catalog.get(code).is_some(), "missing bundled locale {code}");
        }
        assert!(catalog.get("en").unwrap_or_default().contains("present ="));
    }
}
