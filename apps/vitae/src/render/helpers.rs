//! Template helpers for the resume template.
//!
//! `t` and `date` close over one render's loaded `Messages` and are added to a
//! per-render clone of the compiled templates; the others are stateless and
//! registered once.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Utc};
use pulldown_cmark::{html, Options, Parser};
use tera::{escape_html, Filter, Function, Tera, Value};
use url::Url;

use crate::i18n::{MessageArgs, Messages};

/// Registers the helpers that do not depend on the render's locale.
pub fn register_static(tera: &mut Tera) {
    tera.register_filter("markdown", MarkdownFilter);
    tera.register_filter("link", LinkFilter);
    tera.register_filter("format_location", FormatLocationFilter);
}

/// Registers `t` and `date` for one render's loaded messages.
pub fn register_localized(tera: &mut Tera, messages: Arc<Messages>) {
    tera.register_function(
        "t",
        TranslateFunction {
            messages: messages.clone(),
        },
    );
    tera.register_filter("date", DateFilter { messages });
}

// ────────────────────────────────────────────────────────────────────────────
// t(key="…", name=value, …)
// ────────────────────────────────────────────────────────────────────────────

/// Looks up a localized message. Every argument besides `key` becomes a message attribute.
pub struct TranslateFunction {
    messages: Arc<Messages>,
}

impl Function for TranslateFunction {
    fn call(&self, args: &HashMap<String, Value>) -> tera::Result<Value> {
        let key = args
            .get("key")
            .and_then(Value::as_str)
            .ok_or_else(|| tera::Error::msg("t() requires a string `key` argument"))?;

        let attributes: MessageArgs = args
            .iter()
            .filter(|(name, _)| name.as_str() != "key")
            .filter_map(|(name, value)| value_to_text(value).map(|text| (name.clone(), text)))
            .collect();

        self.messages
            .t(key, &attributes)
            .map(Value::String)
            .map_err(|e| tera::Error::msg(e.to_string()))
    }
}

fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// date
// ────────────────────────────────────────────────────────────────────────────

/// Renders a resume date as a `<time>` element, or the localized "present" when empty.
pub struct DateFilter {
    messages: Arc<Messages>,
}

impl Filter for DateFilter {
    fn filter(&self, value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
        let body = value.as_str().unwrap_or_default().trim();
        if body.is_empty() {
            let present = self
                .messages
                .t("present", &MessageArgs::new())
                .map_err(|e| tera::Error::msg(e.to_string()))?;
            return Ok(Value::String(escape_html(&present)));
        }

        format_date(body, self.messages.locale())
            .map(Value::String)
            .ok_or_else(|| tera::Error::msg(format!("Invalid resume date '{body}'")))
    }

    fn is_safe(&self) -> bool {
        true
    }
}

/// Formats `YYYY`, `YYYY-MM` or `YYYY-MM-DD` as `<time datetime="…">label</time>`.
///
/// The label is the short month and year in `locale` when the input has a
/// month, otherwise the year alone. Its first character is upper-cased.
pub fn format_date(body: &str, locale: &str) -> Option<String> {
    let parts: Vec<&str> = body.split('-').collect();
    let (year, month, day) = match parts.as_slice() {
        [y] => (y.parse().ok()?, 1, 1),
        [y, m] => (y.parse().ok()?, m.parse().ok()?, 1),
        [y, m, d] => (y.parse().ok()?, m.parse().ok()?, d.parse().ok()?),
        _ => return None,
    };
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let datetime = Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?);

    let label = if parts.len() == 1 {
        datetime.format("%Y").to_string()
    } else {
        datetime
            .format_localized("%b %Y", chrono_locale(locale))
            .to_string()
    };

    Some(format!(
        r#"<time datetime="{}">{}</time>"#,
        datetime.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
        escape_html(&capitalize_first(&label))
    ))
}

/// Maps a BCP-47 tag to the closest locale chrono knows; POSIX when none fits.
fn chrono_locale(tag: &str) -> chrono::Locale {
    let mut subtags = tag.split(['-', '_']);
    let language = subtags.next().unwrap_or_default().to_ascii_lowercase();
    let region = subtags
        .find(|s| s.len() == 2 && s.chars().all(|c| c.is_ascii_alphabetic()))
        .map(str::to_ascii_uppercase);

    let mut candidates = Vec::new();
    if let Some(region) = &region {
        candidates.push(format!("{language}_{region}"));
    }
    match language.as_str() {
        "en" => candidates.push("en_US".to_string()),
        "pt" => candidates.push("pt_BR".to_string()),
        _ => {}
    }
    candidates.push(format!("{language}_{}", language.to_ascii_uppercase()));

    candidates
        .iter()
        .find_map(|name| chrono::Locale::try_from(name.as_str()).ok())
        .unwrap_or(chrono::Locale::POSIX)
}

fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// markdown / link / format_location
// ────────────────────────────────────────────────────────────────────────────

/// CommonMark to HTML.
pub struct MarkdownFilter;

impl Filter for MarkdownFilter {
    fn filter(&self, value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
        let body = value.as_str().unwrap_or_default();
        let options = Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TABLES;
        let parser = Parser::new_ext(body, options);
        let mut out = String::with_capacity(body.len() * 3 / 2);
        html::push_html(&mut out, parser);
        Ok(Value::String(out))
    }

    fn is_safe(&self) -> bool {
        true
    }
}

/// `https://www.example.com/x` → `<a href="https://www.example.com/x">example.com</a>`.
pub struct LinkFilter;

impl Filter for LinkFilter {
    fn filter(&self, value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
        let body = value.as_str().unwrap_or_default();
        let parsed =
            Url::parse(body).map_err(|e| tera::Error::msg(format!("Invalid URL '{body}': {e}")))?;

        let host = parsed.host_str().unwrap_or_default();
        let host = host.strip_prefix("www.").unwrap_or(host);
        let host = match parsed.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };

        Ok(Value::String(format!(
            r#"<a href="{}">{}</a>"#,
            escape_html(body),
            escape_html(&host)
        )))
    }

    fn is_safe(&self) -> bool {
        true
    }
}

/// Joins the non-empty location parts with `, `.
pub struct FormatLocationFilter;

const LOCATION_FIELDS: &[&str] = &["address", "postalCode", "city", "region", "countryCode"];

impl Filter for FormatLocationFilter {
    fn filter(&self, value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
        let Some(location) = value.as_object() else {
            return Ok(Value::String(String::new()));
        };

        let parts: Vec<&str> = LOCATION_FIELDS
            .iter()
            .filter_map(|field| location.get(*field).and_then(Value::as_str))
            .filter(|part| !part.is_empty())
            .collect();

        Ok(Value::String(parts.join(", ")))
    }
}
