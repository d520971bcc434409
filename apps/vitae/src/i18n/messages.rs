//! Message resolver: negotiates a locale chain once per render and answers `t()` lookups.
//!
//! Lifecycle: `Messages::new` (uninitialized) → `load()` (ready) → any number
//! of `t()` calls. Lookups walk the negotiated bundles in order and the first
//! bundle with a value for the key wins.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::i18n::args::MessageArgs;
use crate::i18n::bundle::MessageBundle;
use crate::i18n::catalog::MessageCatalog;
use crate::i18n::negotiate::negotiate;

#[derive(Debug, Error)]
pub enum MessagesError {
    #[error("Messages::load has not been invoked or resolved yet")]
    InvalidState,

    #[error("Unknown or unsupported message key: {key}")]
    UnknownKey { key: String },

    #[error("Malformed message resource for locale '{locale}': {reason}")]
    MalformedResource { locale: String, reason: String },
}

#[derive(Debug)]
enum State {
    Uninitialized,
    Ready(Vec<MessageBundle>),
}

/// Localized message lookup for one render.
#[derive(Debug)]
pub struct Messages {
    catalog: Arc<MessageCatalog>,
    locale: String,
    default_locale: Option<String>,
    state: State,
}

impl Messages {
    pub fn new(
        catalog: Arc<MessageCatalog>,
        locale: impl Into<String>,
        default_locale: Option<&str>,
    ) -> Self {
        Self {
            catalog,
            locale: locale.into(),
            default_locale: default_locale.map(str::to_string),
            state: State::Uninitialized,
        }
    }

    /// Negotiates the locale chain and parses one bundle per negotiated locale, in order.
    ///
    /// Returns the same resolver, now ready for `t()`.
    pub fn load(mut self) -> Result<Self, MessagesError> {
        let negotiated = negotiate(
            &self.locale,
            self.catalog.locales(),
            self.default_locale.as_deref(),
        );

        let bundles = negotiated
            .iter()
            .filter_map(|code| self.catalog.get(code).map(|text| (code, text)))
            .map(|(code, text)| MessageBundle::parse(code, text))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            locale = %self.locale,
            bundles = bundles.len(),
            "Messages loaded"
        );

        self.state = State::Ready(bundles);
        Ok(self)
    }

    /// Formats message `key` with `args`, using the first negotiated bundle that defines it.
    pub fn t(&self, key: &str, args: &MessageArgs) -> Result<String, MessagesError> {
        let State::Ready(bundles) = &self.state else {
            return Err(MessagesError::InvalidState);
        };

        bundles
            .iter()
            .find_map(|bundle| bundle.format(key, args))
            .ok_or_else(|| MessagesError::UnknownKey {
                key: key.to_string(),
            })
    }

    /// The locale originally requested.
    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Negotiated locale codes in lookup order. Empty until loaded.
    pub fn locales(&self) -> Vec<&str> {
        match &self.state {
            State::Ready(bundles) => bundles.iter().map(MessageBundle::locale).collect(),
            State::Uninitialized => Vec::new(),
        }
    }}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(files: &[(&str, &str)]) -> Arc<MessageCatalog> {
        Arc::new(MessageCatalog::from_files(
            files
                .iter()
                .map(|(code, text)| (format!("./locales/{code}.ftl"), text.to_string())),
        ))
    }

    fn greetings() -> Arc<MessageCatalog> {
        catalog(&[
            ("en", "greeting = Hello, {name}!"),
            ("fr", "greeting = Bonjour, {name}!"),
        ])
    }

    #[test]
    fn test_requested_locale_wins_over_default() {
        let messages = Messages::new(greetings(), "fr", Some("en")).load().unwrap();
        let args = MessageArgs::from([("name", "Ana")]);
        assert_eq!(messages.t("greeting", &args).unwrap(), "Bonjour, Ana!");
        assert_eq!(messages.locales(), vec!["fr", "en"]);
    }

    #[test]
    fn test_unsupported_locale_falls_back_to_default() {
        let messages = Messages::new(catalog(&[("en", "greeting = Hi")]), "de", Some("en"))
            .load()
            .unwrap();
        assert_eq!(messages.locales(), vec!["en"]);
        assert_eq!(messages.t("greeting", &MessageArgs::new()).unwrap(), "Hi");
    }

    #[test]
    fn test_unsupported_locale_without_default_has_no_bundles() {
        let messages = Messages::new(catalog(&[("en", "greeting = Hi")]), "de", None)
            .load()
            .unwrap();
        assert!(messages.locales().is_empty());
        match messages.t("greeting", &MessageArgs::new()) {
            Err(MessagesError::UnknownKey { key }) => assert_eq!(key, "greeting"),
            other => panic!("expected UnknownKey, got {other:?}"),
        }
    }

    #[test]
    fn test_t_before_load_is_invalid_state() {
        let messages = Messages::new(greetings(), "en", Some("en"));
        assert!(messages.locales().is_empty());
        for key in ["greeting", "missing", ""] {
            assert!(matches!(
                messages.t(key, &MessageArgs::new()),
                Err(MessagesError::InvalidState)
            ));
        }
    }

    #[test]
    fn test_unknown_key_names_the_key() {
        let messages = Messages::new(greetings(), "en", Some("en")).load().unwrap();
        let err = messages.t("farewell", &MessageArgs::new()).unwrap_err();
        assert!(matches!(&err, MessagesError::UnknownKey { key } if key == "farewell"));
        assert!(err.to_string().contains("farewell"));
    }

    #[test]
    fn test_first_bundle_wins() {
        let cat = catalog(&[("en", "title = Resume"), ("fr", "title = CV")]);
        let messages = Messages::new(cat, "fr", Some("en")).load().unwrap();
        assert_eq!(messages.t("title", &MessageArgs::new()).unwrap(), "CV");
    }

    #[test]
    fn test_missing_key_falls_through_to_later_bundle() {
        let cat = catalog(&[
            ("en", "title = Resume\npresent = Present"),
            ("fr", "title = CV"),
        ]);
        let messages = Messages::new(cat, "fr", Some("en")).load().unwrap();
        assert_eq!(messages.t("present", &MessageArgs::new()).unwrap(), "Present");
    }

    #[test]
    fn test_value_less_message_falls_through() {
        let cat = catalog(&[
            ("en", "photo = Photo"),
            ("fr", "photo =\n    .alt = Portrait"),
        ]);
        let messages = Messages::new(cat, "fr", Some("en")).load().unwrap();
        assert_eq!(messages.t("photo", &MessageArgs::new()).unwrap(), "Photo");
    }

    #[test]
    fn test_lookup_is_idempotent() {
        let messages = Messages::new(greetings(), "fr", Some("en")).load().unwrap();
        let args = MessageArgs::from([("name", "Ana")]);
        let first = messages.t("greeting", &args).unwrap();
        let second = messages.t("greeting", &args).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_reload_is_harmless() {
        let messages = Messages::new(greetings(), "fr", Some("en"))
            .load()
            .and_then(Messages::load)
            .unwrap();
        assert_eq!(messages.locales(), vec!["fr", "en"]);
    }

    #[test]
    fn test_malformed_resource_fails_load() {
        let cat = catalog(&[("en", "greeting = Hi"), ("fr", "= oops {")]);
        let err = Messages::new(cat, "fr", Some("en")).load().unwrap_err();
        assert!(matches!(err, MessagesError::MalformedResource { ref locale, .. } if locale == "fr"));
    }

    #[test]
    fn test_malformed_resource_outside_chain_is_not_parsed() {
        let cat = catalog(&[("en", "greeting = Hi"), ("fr", "= oops {")]);
        let messages = Messages::new(cat, "en", Some("en")).load().unwrap();
        assert_eq!(messages.t("greeting", &MessageArgs::new()).unwrap(), "Hi");
    }

    #[test]
    fn test_bundled_locales_share_template_keys() {
        let cat = Arc::new(MessageCatalog::embedded());
        let english = Messages::new(cat.clone(), "en", None).load().unwrap();
        for code in ["de", "es", "fr", "pt"] {
            let localized = Messages::new(cat.clone(), code, None).load().unwrap();
            for key in ["present", "work", "education", "skills", "references"] {
                let value = localized.t(key, &MessageArgs::new()).unwrap();
                assert!(!value.is_empty(), "{code} has empty {key}");
                assert!(english.t(key, &MessageArgs::new()).is_ok());
            }
        }
    }
}
