//! Locale negotiation: picks and orders the catalog locales to try for one request.
//!
//! Uses BCP-47 filtering (fluent-langneg). Tie-break order for a single
//! requested locale:
//!
//! 1. exact match
//! 2. available locale is a broader range of the request (`en` for `en-US`)
//! 3. match after adding likely subtags to the request
//! 4. match ignoring variants
//! 5. match ignoring region (`en-GB` for `en-US`)
//! 6. the default locale, appended last when available and not yet listed
//!
//! Within a tier, candidates keep the order they are passed in (the catalog
//! passes them sorted), so the result is fully deterministic.

use fluent_langneg::{negotiate_languages, NegotiationStrategy};
use tracing::{debug, warn};
use unic_langid::LanguageIdentifier;

/// Returns the available locale codes to try, most preferred first.
///
/// Every returned code is one of `available`. The list is empty when nothing
/// matches and no available default was given.
pub fn negotiate<'a, I>(requested: &str, available: I, default_locale: Option<&str>) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let (codes, ids): (Vec<&str>, Vec<LanguageIdentifier>) = available
        .into_iter()
        .filter_map(|code| match code.parse::<LanguageIdentifier>() {
            Ok(id) => Some((code, id)),
            Err(e) => {
                warn!("Ignoring catalog locale '{code}': {e}");
                None
            }
        })
        .unzip();

    let requested_ids: Vec<LanguageIdentifier> = match requested.parse() {
        Ok(id) => vec![id],
        Err(e) => {
            warn!("Requested locale '{requested}' is not a valid language tag: {e}");
            vec![]
        }
    };

    // The default only takes part when the catalog actually has it.
    let default_id = default_locale
        .and_then(|d| d.parse::<LanguageIdentifier>().ok())
        .and_then(|d| ids.iter().find(|id| **id == d));

    let selected = negotiate_languages(
        &requested_ids,
        &ids,
        default_id,
        NegotiationStrategy::Filtering,
    );

    let negotiated: Vec<String> = selected
        .into_iter()
        .filter_map(|id| ids.iter().position(|candidate| candidate == id))
        .map(|idx| codes[idx].to_string())
        .fold(Vec::new(), |mut acc, code| {
            if !acc.contains(&code) {
                acc.push(code);
            }
            acc
        });

    debug!(requested, ?default_locale, ?negotiated, "Negotiated locales");
    negotiated
}

#[cfg(test)]
mod tests {
    use super::*;

    const AVAILABLE: &[&str] = &["de", "en", "en-GB", "es", "fr", "pt"];

    fn run(requested: &str, default_locale: Option<&str>) -> Vec<String> {
        negotiate(requested, AVAILABLE.iter().copied(), default_locale)
    }

    #[test]
    fn test_exact_match_comes_first() {
        let list = run("fr", Some("en"));
        assert_eq!(list, vec!["fr", "en"]);
    }

    #[test]
    fn test_exact_match_not_displaced_by_default() {
        let list = run("en-GB", Some("en"));
        assert_eq!(list.first().map(String::as_str), Some("en-GB"));
        assert!(list.contains(&"en".to_string()));
    }

    #[test]
    fn test_region_request_falls_back_to_language() {
        let list = run("pt-BR", Some("en"));
        assert_eq!(list, vec!["pt", "en"]);
    }

    #[test]
    fn test_region_request_prefers_range_over_sibling_region() {
        let list = run("en-US", None);
        assert_eq!(list.first().map(String::as_str), Some("en"));
        assert!(list.contains(&"en-GB".to_string()));
    }

    #[test]
    fn test_default_is_not_duplicated() {
        let list = run("en", Some("en"));
        assert_eq!(list.iter().filter(|l| l.as_str() == "en").count(), 1);
        assert_eq!(list.first().map(String::as_str), Some("en"));
    }

    #[test]
    fn test_unmatched_request_uses_default() {
        let list = negotiate("de", ["en"], Some("en"));
        assert_eq!(list, vec!["en"]);
    }

    #[test]
    fn test_unmatched_request_without_default_is_empty() {
        let list = negotiate("de", ["en"], None);
        assert!(list.is_empty());
    }

    #[test]
    fn test_unavailable_default_is_dropped() {
        let list = negotiate("de", ["en"], Some("fr"));
        assert!(list.is_empty());
    }

    #[test]
    fn test_empty_catalog_yields_empty_list() {
        let list = negotiate("en", std::iter::empty(), Some("en"));
        assert!(list.is_empty());
    }

    #[test]
    fn test_invalid_request_yields_default_only() {
        let list = run("not a locale!", Some("en"));
        assert_eq!(list, vec!["en"]);
    }

    #[test]
    fn test_negotiation_is_deterministic() {
        let first = run("en-US", Some("de"));
        for _ in 0..10 {
            assert_eq!(run("en-US", Some("de")), first);
        }
    }
}
