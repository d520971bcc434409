// Resume rendering: localized messages + Tera template + image inlining + minification.
// One `Messages` resolver and one Tera instance per render; the catalog is shared.

pub mod helpers;
pub mod images;

use std::sync::Arc;

use serde::Serialize;
use tera::{Context, Tera};
use thiserror::Error;
use tracing::{debug, info};

use crate::i18n::{MessageCatalog, Messages, MessagesError};
use crate::models::resume::{Custom, Resume};

pub use images::{FilesystemImages, ImageResolver, LocalImages, NoLocalImages};

const TEMPLATE_NAME: &str = "resume.html";
const TEMPLATE: &str = include_str!("../../templates/resume.html.tera");
const STYLESHEET: &str = include_str!("../../assets/style.css");

#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Messages(#[from] MessagesError),

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("Rendered output is not valid UTF-8")]
    Encoding(#[from] std::string::FromUtf8Error),
}

impl RenderError {
    /// Full cause chain; Tera nests the helper error that failed a render.
    pub fn detail(&self) -> String {
        let mut detail = self.to_string();
        let mut source = match self {
            // The outer Tera message is already part of our own Display.
            RenderError::Template(e) => std::error::Error::source(e),
            other => std::error::Error::source(other),
        };
        while let Some(cause) = source {
            detail.push_str(": ");
            detail.push_str(&cause.to_string());
            source = cause.source();
        }
        detail
    }
}

#[derive(Serialize)]
struct TemplateData<'a> {
    lang: &'a str,
    css: &'a str,
    resume: &'a Resume,
}

/// Renders resumes into single self-contained HTML pages.
#[derive(Clone)]
pub struct Renderer {
    catalog: Arc<MessageCatalog>,
    images: ImageResolver,
    /// Compiled template plus the locale-independent helpers.
    templates: Tera,
    fallback_language: String,
    default_locale: String,
}

impl Renderer {
    pub fn new(
        catalog: Arc<MessageCatalog>,
        images: ImageResolver,
        fallback_language: impl Into<String>,
        default_locale: impl Into<String>,
    ) -> Result<Self, RenderError> {
        let mut templates = Tera::default();
        templates.add_raw_template(TEMPLATE_NAME, TEMPLATE)?;
        helpers::register_static(&mut templates);

        Ok(Self {
            catalog,
            images,
            templates,
            fallback_language: fallback_language.into(),
            default_locale: default_locale.into(),
        })
    }

    pub fn images(&self) -> &ImageResolver {
        &self.images
    }

    /// Renders `resume` to minified HTML.
    pub async fn render(&self, mut resume: Resume) -> Result<String, RenderError> {
        let locale = resume
            .meta
            .as_ref()
            .and_then(|m| m.language.as_deref())
            .filter(|l| !l.is_empty())
            .unwrap_or(self.fallback_language.as_str())
            .to_string();

        let messages = Messages::new(
            self.catalog.clone(),
            locale.as_str(),
            Some(self.default_locale.as_str()),
        )
        .load()?;
        debug!(%locale, negotiated = ?messages.locales(), "Rendering resume");

        self.prepare(&mut resume).await;

        let mut tera = self.templates.clone();
        helpers::register_localized(&mut tera, Arc::new(messages));

        let context = Context::from_serialize(TemplateData {
            lang: &locale,
            css: STYLESHEET,
            resume: &resume,
        })?;
        let html = tera.render(TEMPLATE_NAME, &context)?;
        let minified = minify(&html)?;

        info!(
            %locale,
            raw_bytes = html.len(),
            minified_bytes = minified.len(),
            "Resume rendered"
        );
        Ok(minified)
    }

    /// Inlines images, records the Open Graph image and marks references with contact details.
    async fn prepare(&self, resume: &mut Resume) {
        let self_contained = resume
            .meta
            .as_ref()
            .is_some_and(|m| m.self_contained_images);

        if let Some(basics) = resume.basics.as_mut() {
            if let Some(image) = basics.image.clone().filter(|i| !i.is_empty()) {
                if images::is_web_url(&image) {
                    resume
                        .custom
                        .get_or_insert_with(Custom::default)
                        .og_image = Some(image.clone());
                }
                basics.image = Some(self.images.resolve(&image, self_contained).await);
            }
        }

        if let Some(meta) = resume.meta.as_mut() {
            if let Some(logo) = meta.logo.clone().filter(|l| !l.is_empty()) {
                meta.logo = Some(self.images.resolve(&logo, self_contained).await);
            }
        }

        for reference in &mut resume.references {
            reference.has_footer = reference.has_contact();
        }
    }
}

/// Collapses whitespace, drops comments and minifies inline CSS.
pub fn minify(html: &str) -> Result<String, RenderError> {
    let mut cfg = minify_html::Cfg::new();
    cfg.minify_css = true;
    cfg.keep_comments = false;
    let bytes = minify_html::minify(html.as_bytes(), &cfg);
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::resume::{Basics, Meta, Reference};
    use serde_json::json;
    use std::time::Duration;

    fn renderer() -> Renderer {
        let images = ImageResolver::new(Arc::new(NoLocalImages), Duration::from_secs(5)).unwrap();
        Renderer::new(Arc::new(MessageCatalog::embedded()), images, "en-US", "en").unwrap()
    }

    fn sample() -> Resume {
        serde_json::from_value(json!({
            "basics": {
                "name": "Ana Lima",
                "label": "Systems Engineer",
                "email": "ana@example.com",
                "url": "https://www.analima.dev",
                "summary": "Builds **reliable** things.",
                "location": { "city": "Lisbon", "countryCode": "PT" },
                "profiles": [{ "network": "GitHub", "username": "ana", "url": "https://github.com/ana" }]
            },
            "work": [{
                "name": "Acme",
                "position": "Engineer",
                "startDate": "2020-03",
                "highlights": ["Cut p99 latency by 40%"]
            }],
            "education": [{
                "institution": "IST",
                "area": "Computer Science",
                "studyType": "MSc",
                "startDate": "2014",
                "endDate": "2016"
            }],
            "skills": [{ "name": "Rust", "keywords": ["tokio", "serde"] }],
            "references": [
                { "name": "Bob", "reference": "Great colleague", "email": "bob@example.com" },
                { "name": "Eve", "reference": "Solid work" }
            ]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_render_english_resume() {
        let html = renderer().render(sample()).await.unwrap();
        assert!(html.contains("Ana Lima"));
        assert!(html.contains("Mar 2020"));
        assert!(html.contains("Present"));
        assert!(html.contains("<strong>reliable</strong>"));
        assert!(html.contains(">analima.dev<"));
        assert!(html.contains("Lisbon, PT"));
        assert!(!html.contains("<!--"));
    }

    #[tokio::test]
    async fn test_render_uses_resume_language() {
        let mut resume = sample();
        resume.meta = Some(Meta {
            language: Some("fr".into()),
            ..Meta::default()
        });
        let html = renderer().render(resume).await.unwrap();
        assert!(html.contains("Expérience professionnelle"));
        assert!(html.contains("Mars 2020"));
    }

    #[tokio::test]
    async fn test_one_renderer_serves_several_locales() {
        let r = renderer();
        let with_language = |language: &str| {
            let mut resume = sample();
            resume.meta = Some(Meta {
                language: Some(language.into()),
                ..Meta::default()
            });
            resume
        };

        let french = r.render(with_language("fr")).await.unwrap();
        let german = r.render(with_language("de")).await.unwrap();
        let english = r.render(sample()).await.unwrap();

        assert!(french.contains("Expérience professionnelle"));
        assert!(german.contains("Berufserfahrung"));
        assert!(!german.contains("Expérience professionnelle"));
        assert!(english.contains("Work experience"));
        assert!(english.contains("Present"));
    }

    #[tokio::test]
    async fn test_unknown_language_falls_back_to_default() {
        let mut resume = sample();
        resume.meta = Some(Meta {
            language: Some("ja".into()),
            ..Meta::default()
        });
        let html = renderer().render(resume).await.unwrap();
        assert!(html.contains("Work experience"));
    }

    #[tokio::test]
    async fn test_web_image_becomes_og_image() {
        let r = renderer();
        let mut resume = sample();
        resume.basics = Some(Basics {
            name: Some("Ana".into()),
            image: Some("https://example.invalid/ana.jpg".into()),
            ..Basics::default()
        });
        r.prepare(&mut resume).await;
        assert_eq!(
            resume.custom.and_then(|c| c.og_image).as_deref(),
            Some("https://example.invalid/ana.jpg")
        );
        // Not self-contained: the URL is kept.
        assert_eq!(
            resume.basics.and_then(|b| b.image).as_deref(),
            Some("https://example.invalid/ana.jpg")
        );
    }

    #[tokio::test]
    async fn test_local_image_does_not_set_og_image() {
        let r = renderer();
        let mut resume = sample();
        resume.basics = Some(Basics {
            image: Some("ana.jpg".into()),
            ..Basics::default()
        });
        r.prepare(&mut resume).await;
        assert!(resume.custom.is_none());
    }

    #[tokio::test]
    async fn test_references_get_footer_flag() {
        let r = renderer();
        let mut resume = sample();
        resume.references.push(Reference {
            name: Some("Mo".into()),
            url: Some("https://mo.example".into()),
            ..Reference::default()
        });
        r.prepare(&mut resume).await;
        let flags: Vec<bool> = resume.references.iter().map(|r| r.has_footer).collect();
        assert_eq!(flags, vec![true, false, true]);
    }

    #[tokio::test]
    async fn test_invalid_date_fails_render() {
        let mut resume = sample();
        resume.work[0].start_date = Some("sometime".into());
        let err = renderer().render(resume).await.unwrap_err();
        assert!(matches!(err, RenderError::Template(_)));
        assert!(err.detail().contains("sometime"));
    }

    #[tokio::test]
    async fn test_empty_resume_renders() {
        let html = renderer().render(Resume::default()).await.unwrap();
        assert!(html.to_lowercase().contains("<html"));
    }

    #[test]
    fn test_minify_strips_comments_and_whitespace() {
        let html = "<html>\n  <body>\n    <!-- note -->\n    <p>Hi</p>\n  </body>\n</html>\n";
        let out = minify(html).unwrap();
        assert!(!out.contains("note"));
        assert!(out.len() < html.len());
        assert!(out.contains("Hi"));
    }
}
