//! Download visibility and access URLs.
//!
//! A download's `public` flag and `href` are never stored independently of
//! its state: they are recomputed from the state every time an image is
//! returned, because the stored copy may be missing or stale.

use imagery_core::{DownloadState, ImageId};
use imagery_store::{Download, Image};
use serde::Deserialize;

/// Returns true if a download in this state is served from the public host.
///
/// Only `completed` is public; `published` downloads are still on their way
/// to the public host.
#[must_use]
pub const fn is_public(state: DownloadState) -> bool {
    matches!(state, DownloadState::Completed)
}

/// URL templates for download links.
///
/// Templates may contain the placeholders `{id}`, `{variant}` and `{filename}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UrlTemplates {
    /// Template used for public downloads (static files host).
    #[serde(default = "UrlTemplates::default_public")]
    pub public: String,
    /// Template used for every other download (download gateway).
    #[serde(default = "UrlTemplates::default_private")]
    pub private: String,
}

impl UrlTemplates {
    fn default_public() -> String {
        "http://localhost:9000/images/{id}/{variant}/{filename}".to_string()
    }

    fn default_private() -> String {
        "http://localhost:23600/images/{id}/{variant}/{filename}".to_string()
    }

    /// Render the link for a download.
    #[must_use]
    pub fn href(&self, public: bool, image_id: &ImageId, variant: &str, filename: &str) -> String {
        let template = if public { &self.public } else { &self.private };
        template
            .replace("{id}", image_id.as_str())
            .replace("{variant}", variant)
            .replace("{filename}", filename)
    }
}

impl Default for UrlTemplates {
    fn default() -> Self {
        Self {
            public: Self::default_public(),
            private: Self::default_private(),
        }
    }
}

/// Path of a download within the public static files bucket.
#[must_use]
pub fn public_path(image_id: &ImageId, variant: &str, filename: &str) -> String {
    format!("images/{image_id}/{variant}/{filename}")
}

/// Recompute visibility and link for one download.
///
/// An empty or unparseable state is treated as not public.
pub fn refresh_download(
    download: &mut Download,
    templates: &UrlTemplates,
    image_id: &ImageId,
    variant: &str,
    filename: &str,
) {
    let public = download
        .state
        .parse::<DownloadState>()
        .is_ok_and(is_public);
    download.public = public;
    download.href = Some(templates.href(public, image_id, variant, filename));
}

/// Recompute visibility and link for every download of an image.
pub fn refresh(image: &mut Image, templates: &UrlTemplates) {
    for (variant, download) in &mut image.downloads {
        refresh_download(download, templates, &image.id, variant, &image.filename);
    }
}

/// Recompute visibility and links for a batch of images.
pub fn refresh_all(images: &mut [Image], templates: &UrlTemplates) {
    for image in images {
        refresh(image, templates);
    }
}
