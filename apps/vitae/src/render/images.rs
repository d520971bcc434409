//! Image inlining: turns image references into `data:` URIs where possible.
//!
//! Local file access is a strategy chosen once at startup: `FilesystemImages`
//! when the process may read local files, `NoLocalImages` otherwise. Remote
//! downloads are off unless the resolver is built with `with_remote_fetch(true)`.
//! A failed fetch or read never fails the render; the original reference is kept.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, warn};

const FALLBACK_REMOTE_MIME: &str = "image/jpeg";

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Remote image returned status {0}")]
    Status(u16),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image path escapes the image root: {0}")]
    OutsideRoot(String),
}

/// Raw image bytes plus their MIME type.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl ImageData {
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }
}

/// Access to images referenced by local path.
///
/// Held by `ImageResolver` as `Arc<dyn LocalImages>`.
#[async_trait]
pub trait LocalImages: Send + Sync {
    /// Reads the image at `reference`. `Ok(None)` means the file does not exist.
    async fn read(&self, reference: &str) -> Result<Option<ImageData>, ImageError>;

    fn backend_name(&self) -> &'static str;
}

/// Reads local images relative to a root directory.
///
/// References must be relative and must stay inside the root once symlinks
/// and `..` are resolved.
#[derive(Debug, Clone)]
pub struct FilesystemImages {
    root: PathBuf,
}

impl FilesystemImages {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl LocalImages for FilesystemImages {
    async fn read(&self, reference: &str) -> Result<Option<ImageData>, ImageError> {
        let relative = Path::new(reference);
        let anchored = relative
            .components()
            .any(|c| matches!(c, Component::Prefix(_) | Component::RootDir));
        if anchored {
            return Err(ImageError::OutsideRoot(reference.to_string()));
        }

        let root = tokio::fs::canonicalize(&self.root).await?;
        let path = match tokio::fs::canonicalize(root.join(relative)).await {
            Ok(path) => path,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Local image not found: {}", root.join(relative).display());
                return Ok(None);
            }
            Err(e) => return Err(ImageError::Io(e)),
        };
        if !path.starts_with(&root) {
            return Err(ImageError::OutsideRoot(reference.to_string()));
        }

        let bytes = tokio::fs::read(&path).await?;
        let mime = mime_guess::from_path(&path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Ok(Some(ImageData { mime, bytes }))
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }
}

/// Used when the process has no local file access; local references pass through.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocalImages;

#[async_trait]
impl LocalImages for NoLocalImages {
    async fn read(&self, _reference: &str) -> Result<Option<ImageData>, ImageError> {
        Ok(None)
    }

    fn backend_name(&self) -> &'static str {
        "none"
    }
}

/// Resolves image references (data URIs, web URLs, local paths).
#[derive(Clone)]
pub struct ImageResolver {
    http: Client,
    local: Arc<dyn LocalImages>,
    remote_fetch: bool,
}

impl ImageResolver {
    /// Builds a resolver that never downloads remote images.
    pub fn new(local: Arc<dyn LocalImages>, fetch_timeout: Duration) -> Result<Self, ImageError> {
        let http = Client::builder().timeout(fetch_timeout).build()?;
        Ok(Self {
            http,
            local,
            remote_fetch: false,
        })
    }

    /// Allows web URLs to be downloaded for resumes that ask for self-contained images.
    pub fn with_remote_fetch(mut self, enabled: bool) -> Self {
        self.remote_fetch = enabled;
        self
    }

    pub fn remote_fetch(&self) -> bool {
        self.remote_fetch
    }

    pub fn local_backend(&self) -> &'static str {
        self.local.backend_name()
    }

    /// Returns a `data:` URI for the image when it can be inlined, otherwise `image` unchanged.
    ///
    /// Web URLs are only downloaded when `self_contained` is set and remote
    /// fetching is enabled on this resolver.
    pub async fn resolve(&self, image: &str, self_contained: bool) -> String {
        if image.starts_with("data:") {
            return image.to_string();
        }

        if is_web_url(image) {
            if self_contained && !self.remote_fetch {
                debug!(image, "Remote image fetching is disabled; keeping URL");
            } else if self_contained {
                match self.fetch(image).await {
                    Ok(data) => return data.to_data_uri(),
                    Err(e) => warn!("Failed to download image for self-contained build: {e}"),
                }
            }
            return image.to_string();
        }

        match self.local.read(image).await {
            Ok(Some(data)) => {
                debug!(image, mime = %data.mime, "Inlined local image");
                data.to_data_uri()
            }
            Ok(None) => image.to_string(),
            Err(e) => {
                warn!("Could not load local image {image}: {e}");
                image.to_string()
            }
        }
    }

    async fn fetch(&self, url: &str) -> Result<ImageData, ImageError> {
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ImageError::Status(status.as_u16()));
        }

        let mime = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .unwrap_or(FALLBACK_REMOTE_MIME)
            .to_string();
        let bytes = response.bytes().await?.to_vec();

        debug!(url, %mime, size = bytes.len(), "Downloaded remote image");
        Ok(ImageData { mime, bytes })
    }
}

/// `http://` or `https://` reference.
pub fn is_web_url(reference: &str) -> bool {
    reference.starts_with("http://") || reference.starts_with("https://")
}
