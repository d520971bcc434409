use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::Config;
use crate::i18n::MessageCatalog;
use crate::render::{FilesystemImages, ImageResolver, LocalImages, NoLocalImages, Renderer};

/// Who submits the resumes being rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Untrusted HTTP clients: image access follows `VITAE_LOCAL_IMAGES` / `VITAE_REMOTE_IMAGES`.
    Api,
    /// The local `render` command: the operator's own files and network.
    Local,
}

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Built once at startup; every render negotiates against it.
    pub catalog: Arc<MessageCatalog>,
    pub renderer: Renderer,
}

impl AppState {
    pub fn build(config: Config, access: Access) -> Result<Self> {
        let catalog = Arc::new(MessageCatalog::embedded());
        anyhow::ensure!(!catalog.is_empty(), "No message resources are bundled");
        info!(
            "Message catalog loaded: {} locales ({})",
            catalog.len(),
            catalog.locales().collect::<Vec<_>>().join(", ")
        );

        let (local_images, remote_images) = match access {
            Access::Api => (config.local_images, config.remote_images),
            Access::Local => (true, true),
        };

        let local: Arc<dyn LocalImages> = if local_images {
            Arc::new(FilesystemImages::new(config.image_root.clone()))
        } else {
            Arc::new(NoLocalImages)
        };
        let images = ImageResolver::new(local, config.fetch_timeout)
            .context("Failed to build image HTTP client")?
            .with_remote_fetch(remote_images);
        info!(
            "Image resolver initialized (local images: {}, remote fetch: {})",
            images.local_backend(),
            images.remote_fetch()
        );

        let renderer = Renderer::new(
            catalog.clone(),
            images,
            config.fallback_language.clone(),
            config.default_locale.clone(),
        )
        .context("Failed to compile resume template")?;

        Ok(AppState {
            config,
            catalog,
            renderer,
        })
    }
}
