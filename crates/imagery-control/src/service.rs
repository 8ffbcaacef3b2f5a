//! Image service implementation.
//!
//! `ImageService` is the request layer: every state-changing call goes
//! through the [`lifecycle`] checks before the store is written or a message
//! is emitted, and every image handed back is refreshed by [`links`].

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use chrono::Utc;
use imagery_core::{CollectionId, DownloadState, ImageId, ImageState, ValidationError};
use imagery_store::{Download, Image, Store};
use parking_lot::{Mutex, MutexGuard};

use crate::error::{ControlError, Result};
use crate::events::{self, EventProducer, ImagePublished, ImageUploaded};
use crate::lifecycle;
use crate::links;
use crate::types::{ControlConfig, DownloadUpdate, ImageUpdate, NewDownload, NewImage};

/// Number of stripes image write locks are spread across.
const WRITE_LOCK_STRIPES: u64 = 64;

/// Locks held from the read of an image document to its write-back.
///
/// Images hash onto a fixed set of stripes.
struct WriteLocks {
    stripes: Vec<Mutex<()>>,
}

impl WriteLocks {
    fn new() -> Self {
        Self {
            stripes: (0..WRITE_LOCK_STRIPES).map(|_| Mutex::new(())).collect(),
        }
    }

    fn lock(&self, image_id: &ImageId) -> MutexGuard<'_, ()> {
        let mut hasher = DefaultHasher::new();
        image_id.hash(&mut hasher);
        let index = usize::try_from(hasher.finish() % WRITE_LOCK_STRIPES).unwrap_or_default();
        self.stripes[index].lock()
    }
}

/// The image request service.
///
/// Producers are only present on publishing instances; without them no
/// messages are emitted. Every read-modify-write of an image document runs
/// under that image's write lock, so concurrent updates to different
/// variants of one image are applied one after the other.
pub struct ImageService<S: Store + ?Sized, P: EventProducer + ?Sized> {
    store: Arc<S>,
    uploaded: Option<Arc<P>>,
    published: Option<Arc<P>>,
    config: ControlConfig,
    locks: WriteLocks,
}

impl<S: Store + ?Sized, P: EventProducer + ?Sized> ImageService<S, P> {
    /// Create a new image service.
    #[must_use]
    pub fn new(
        store: Arc<S>,
        uploaded: Option<Arc<P>>,
        published: Option<Arc<P>>,
        config: ControlConfig,
    ) -> Self {
        Self {
            store,
            uploaded,
            published,
            config,
            locks: WriteLocks::new(),
        }
    }

    /// Get a reference to the store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &ControlConfig {
        &self.config
    }

    /// Release the service. Holds no buffered state, so this only logs.
    ///
    /// # Errors
    ///
    /// Currently infallible; the signature leaves room for buffered writes.
    #[allow(clippy::unused_async)]
    pub async fn close(&self) -> Result<()> {
        tracing::info!("Image service closed");
        Ok(())
    }

    // =========================================================================
    // Images
    // =========================================================================

    /// List images, optionally restricted to one collection.
    ///
    /// Web instances only list published images.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::Store` if the store fails.
    pub fn list_images(&self, collection_id: Option<&CollectionId>) -> Result<Vec<Image>> {
        let mut images = match collection_id {
            Some(collection_id) => self.store.list_images_by_collection(collection_id)?,
            None => self.store.list_images()?,
        };

        if !self.config.publishing {
            images.retain(|image| image.state == ImageState::Published.as_str());
        }

        links::refresh_all(&mut images, &self.config.url_templates);
        Ok(images)
    }

    /// Get an image by ID.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::ImageNotFound` if the image doesn't exist, or on
    /// web instances if it is not published.
    pub fn get_image(&self, image_id: &ImageId) -> Result<Image> {
        let mut image = self.fetch(image_id)?;

        if !self.config.publishing && image.state != ImageState::Published.as_str() {
            return Err(ControlError::ImageNotFound(image_id.clone()));
        }

        links::refresh(&mut image, &self.config.url_templates);
        Ok(image)
    }

    /// Create a new image in the `created` state.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::Validation` if the request is malformed.
    pub fn create_image(&self, request: NewImage) -> Result<Image> {
        if request.collection_id.as_str().is_empty() {
            return Err(ValidationError::MissingField("collection_id").into());
        }

        let mut image = Image::new(ImageId::generate(), request.collection_id);
        image.filename = request.filename;
        image.image_type = request.image_type;
        image.license = request.license;
        image.state = ImageState::Created.as_str().to_string();
        image.last_updated = Some(Utc::now());

        lifecycle::validate_image(&image)?;
        self.store.put_image(&image)?;

        tracing::info!(image_id = %image.id, collection_id = %image.collection_id, "Created image");

        links::refresh(&mut image, &self.config.url_templates);
        Ok(image)
    }

    /// Apply a partial update to an image.
    ///
    /// Moving into `uploaded` requires an upload path and emits an
    /// [`ImageUploaded`] message once the update is stored.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::Validation` for malformed input,
    /// `ControlError::ImageTransitionDenied` if the target state is not
    /// reachable, and `ControlError::ImageNotFound` if the image doesn't exist.
    /// Returns `ControlError::Producer` if the message cannot be sent; the
    /// image is then already stored as `uploaded` and the upload has to be
    /// triggered again by the uploader.
    pub async fn update_image(&self, image_id: &ImageId, update: ImageUpdate) -> Result<Image> {
        let (mut image, message) = self.apply_image_update(image_id, update)?;

        if let Some(message) = message {
            if let Err(e) = Self::emit(self.uploaded.as_deref(), &message).await {
                tracing::error!(
                    image_id = %image_id,
                    path = %message.path,
                    error = %e,
                    "Image stored as uploaded but the uploaded message was not sent"
                );
                return Err(e);
            }
        }

        links::refresh(&mut image, &self.config.url_templates);
        Ok(image)
    }

    fn apply_image_update(
        &self,
        image_id: &ImageId,
        update: ImageUpdate,
    ) -> Result<(Image, Option<ImageUploaded>)> {
        let _guard = self.locks.lock(image_id);
        let mut image = self.fetch(image_id)?;
        let from = lifecycle::current_image_state(&image);

        let target = update
            .state
            .as_deref()
            .map(str::parse::<ImageState>)
            .transpose()?;
        if let Some(to) = target {
            if !lifecycle::image_transition_allowed(from, to) {
                return Err(ControlError::ImageTransitionDenied {
                    image_id: image_id.clone(),
                    from,
                    to,
                });
            }
        }

        if let Some(collection_id) = update.collection_id {
            image.collection_id = collection_id;
        }
        if let Some(filename) = update.filename {
            image.filename = filename;
        }
        if let Some(image_type) = update.image_type {
            image.image_type = image_type;
        }
        if let Some(license) = update.license {
            image.license = Some(license);
        }
        if let Some(upload) = update.upload {
            image.upload = Some(upload);
        }
        if let Some(to) = target {
            image.state = to.as_str().to_string();
        }

        lifecycle::validate_image(&image)?;

        let uploaded_now = target == Some(ImageState::Uploaded) && from != ImageState::Uploaded;
        let message = if uploaded_now {
            let path = image
                .upload
                .as_ref()
                .map(|upload| upload.path.clone())
                .filter(|path| !path.is_empty())
                .ok_or(ValidationError::MissingField("upload.path"))?;
            Some(ImageUploaded {
                image_id: image_id.to_string(),
                path,
            })
        } else {
            None
        };

        image.last_updated = Some(Utc::now());
        self.store.put_image(&image)?;

        tracing::info!(image_id = %image_id, from = %from, state = %image.state, "Updated image");

        Ok((image, message))
    }

    /// Start publishing an image.
    ///
    /// Moves the image to `publishing` and emits one [`ImagePublished`]
    /// message per `imported` download, stamping its publish start time.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::ImageTransitionDenied` if the image cannot be
    /// published from its current state.
    pub async fn publish_image(&self, image_id: &ImageId) -> Result<Image> {
        let (mut image, messages) = self.start_publishing(image_id)?;

        for message in &messages {
            Self::emit(self.published.as_deref(), message).await?;
        }

        links::refresh(&mut image, &self.config.url_templates);
        Ok(image)
    }

    fn start_publishing(&self, image_id: &ImageId) -> Result<(Image, Vec<ImagePublished>)> {
        let _guard = self.locks.lock(image_id);
        let mut image = self.fetch(image_id)?;
        let from = lifecycle::current_image_state(&image);
        let to = ImageState::Publishing;

        if !lifecycle::image_transition_allowed(from, to) {
            return Err(ControlError::ImageTransitionDenied {
                image_id: image_id.clone(),
                from,
                to,
            });
        }

        let now = Utc::now();
        let mut messages = Vec::new();
        for (variant, download) in &mut image.downloads {
            if lifecycle::current_download_state(download) != DownloadState::Imported {
                continue;
            }
            download.publish_started = Some(now);
            messages.push(ImagePublished {
                image_id: image.id.to_string(),
                image_variant: variant.clone(),
                src_path: download.private.clone().unwrap_or_default(),
                dst_path: links::public_path(&image.id, variant, &image.filename),
            });
        }

        image.state = to.as_str().to_string();
        image.last_updated = Some(now);
        self.store.put_image(&image)?;

        tracing::info!(
            image_id = %image_id,
            downloads = messages.len(),
            "Publishing image"
        );

        Ok((image, messages))
    }

    // =========================================================================
    // Downloads
    // =========================================================================

    /// List the downloads of an image.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::ImageNotFound` if the image doesn't exist.
    pub fn list_downloads(&self, image_id: &ImageId) -> Result<BTreeMap<String, Download>> {
        Ok(self.get_image(image_id)?.downloads)
    }

    /// Get a single download.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::DownloadNotFound` if the variant doesn't exist.
    pub fn get_download(&self, image_id: &ImageId, variant: &str) -> Result<Download> {
        self.get_image(image_id)?
            .downloads
            .remove(variant)
            .ok_or_else(|| ControlError::DownloadNotFound {
                image_id: image_id.clone(),
                variant: variant.to_string(),
            })
    }

    /// Register a new download variant in the `pending` state.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::DownloadAlreadyExists` if the variant is taken.
    pub fn create_download(
        &self,
        image_id: &ImageId,
        variant: &str,
        request: NewDownload,
    ) -> Result<Download> {
        if variant.is_empty() {
            return Err(ValidationError::MissingField("variant").into());
        }

        let _guard = self.locks.lock(image_id);
        let mut image = self.fetch(image_id)?;
        if image.downloads.contains_key(variant) {
            return Err(ControlError::DownloadAlreadyExists {
                image_id: image_id.clone(),
                variant: variant.to_string(),
            });
        }

        let download = Download {
            size: request.size,
            download_type: request.download_type,
            width: request.width,
            height: request.height,
            private: request.private,
            state: DownloadState::initial().as_str().to_string(),
            ..Download::default()
        };
        image.downloads.insert(variant.to_string(), download);
        image.last_updated = Some(Utc::now());

        lifecycle::validate_image(&image)?;
        self.store.put_image(&image)?;

        tracing::info!(image_id = %image_id, variant = %variant, "Registered download");

        self.refreshed_download(image, variant)
    }

    /// Apply a partial update to a download.
    ///
    /// State changes stamp the matching timestamp. Once every download of a
    /// publishing image is `completed`, the image itself becomes `published`.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::Validation` for malformed input (including a
    /// move to `failed` without an error message) and
    /// `ControlError::DownloadTransitionDenied` if the target is not reachable.
    pub fn update_download(
        &self,
        image_id: &ImageId,
        variant: &str,
        update: DownloadUpdate,
    ) -> Result<Download> {
        let _guard = self.locks.lock(image_id);
        let mut image = self.fetch(image_id)?;
        let Some(download) = image.downloads.get_mut(variant) else {
            return Err(ControlError::DownloadNotFound {
                image_id: image_id.clone(),
                variant: variant.to_string(),
            });
        };
        let from = lifecycle::current_download_state(download);

        let target = update
            .state
            .as_deref()
            .map(str::parse::<DownloadState>)
            .transpose()?;
        if let Some(to) = target {
            if !lifecycle::download_transition_allowed(from, to) {
                return Err(ControlError::DownloadTransitionDenied {
                    image_id: image_id.clone(),
                    variant: variant.to_string(),
                    from,
                    to,
                });
            }
            if to == DownloadState::Failed && update.error.as_deref().map_or(true, str::is_empty)
            {
                return Err(ValidationError::MissingField("error").into());
            }
        }

        if let Some(size) = update.size {
            download.size = Some(size);
        }
        if let Some(download_type) = update.download_type {
            download.download_type = Some(download_type);
        }
        if let Some(width) = update.width {
            download.width = Some(width);
        }
        if let Some(height) = update.height {
            download.height = Some(height);
        }
        if let Some(private) = update.private {
            download.private = Some(private);
        }

        let now = Utc::now();
        if let Some(to) = target.filter(|to| *to != from) {
            download.state = to.as_str().to_string();
            match to {
                DownloadState::Importing => download.import_started = Some(now),
                DownloadState::Imported => download.import_completed = Some(now),
                DownloadState::Published => {
                    download.publish_started.get_or_insert(now);
                }
                DownloadState::Completed => download.publish_completed = Some(now),
                DownloadState::Failed => download.error = update.error,
                DownloadState::Pending => {}
            }
        }

        if target == Some(DownloadState::Completed) {
            Self::complete_if_all_downloads_done(&mut image);
        }

        lifecycle::validate_image(&image)?;
        image.last_updated = Some(now);
        self.store.put_image(&image)?;

        tracing::info!(
            image_id = %image_id,
            variant = %variant,
            from = %from,
            image_state = %image.state,
            "Updated download"
        );

        self.refreshed_download(image, variant)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn fetch(&self, image_id: &ImageId) -> Result<Image> {
        self.store
            .get_image(image_id)?
            .ok_or_else(|| ControlError::ImageNotFound(image_id.clone()))
    }

    fn refreshed_download(&self, mut image: Image, variant: &str) -> Result<Download> {
        links::refresh(&mut image, &self.config.url_templates);
        image
            .downloads
            .remove(variant)
            .ok_or_else(|| ControlError::DownloadNotFound {
                image_id: image.id.clone(),
                variant: variant.to_string(),
            })
    }

    /// Move a publishing image to `published` once every download is completed.
    fn complete_if_all_downloads_done(image: &mut Image) {
        let all_completed = image
            .downloads
            .values()
            .all(|d| lifecycle::current_download_state(d) == DownloadState::Completed);
        let from = lifecycle::current_image_state(image);

        if all_completed
            && from == ImageState::Publishing
            && lifecycle::image_transition_allowed(from, ImageState::Published)
        {
            image.state = ImageState::Published.as_str().to_string();
            tracing::info!(image_id = %image.id, "All downloads completed, image published");
        }
    }

    async fn emit<T: serde::Serialize + Sync>(producer: Option<&P>, message: &T) -> Result<()> {
        let Some(producer) = producer else {
            tracing::debug!("No producer configured, message not sent");
            return Ok(());
        };
        let payload = events::encode(message)?;
        producer.send(payload).await
    }
}
