use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::{info, warn};

use contactbook_types::models::{Contact, ContactPatch, NewContact};

use crate::error::Result;
use crate::photos::{PhotoAttachment, PhotoUpload};
use crate::store::{ContactStore, check_id};

pub type AppState = Arc<AddressBook>;

/// What happens to a photo file once no contact points at it any more.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PhotoRetention {
    /// Remove replaced photos and photos of deleted contacts.
    #[default]
    Prune,
    /// Never remove photo files.
    Keep,
}

impl FromStr for PhotoRetention {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "prune" => Ok(Self::Prune),
            "keep" => Ok(Self::Keep),
            other => Err(anyhow::anyhow!(
                "Unknown photo retention '{}', expected 'prune' or 'keep'",
                other
            )),
        }
    }
}

impl fmt::Display for PhotoRetention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Prune => f.write_str("prune"),
            Self::Keep => f.write_str("keep"),
        }
    }
}

/// Request-level operations. Sequences record changes and photo files so a
/// failed step never leaves a record pointing at a missing file.
pub struct AddressBook {
    store: ContactStore,
    photos: PhotoAttachment,
    retention: PhotoRetention,
}

impl AddressBook {
    pub fn new(store: ContactStore, photos: PhotoAttachment, retention: PhotoRetention) -> Self {
        Self {
            store,
            photos,
            retention,
        }
    }

    pub fn photos(&self) -> &PhotoAttachment {
        &self.photos
    }

    pub async fn list(&self, skip: i64, take: i64) -> Result<Vec<Contact>> {
        let store = self.store.clone();
        blocking(move || store.list(skip, take)).await
    }

    pub async fn get(&self, id: i64) -> Result<Contact> {
        let store = self.store.clone();
        blocking(move || store.get(id)).await
    }

    pub async fn create(&self, mut new: NewContact, photo: Option<PhotoUpload>) -> Result<Contact> {
        PhotoAttachment::check(photo.as_ref())?;

        let photo_url = self.photos.store(photo.as_ref()).await?;
        new.photo_url = photo_url.clone();

        let store = self.store.clone();
        match blocking(move || store.create(new)).await {
            Ok(contact) => {
                info!("Contact {} created ({})", contact.id, contact.full_name);
                Ok(contact)
            }
            Err(e) => {
                if let Some(url) = &photo_url {
                    self.discard(url).await;
                }
                Err(e)
            }
        }
    }

    pub async fn update(
        &self,
        id: i64,
        mut patch: ContactPatch,
        photo: Option<PhotoUpload>,
    ) -> Result<Contact> {
        check_id(id)?;
        PhotoAttachment::check(photo.as_ref())?;

        // Fail with NotFound before any file is written.
        let existing = self.get(id).await?;

        let photo_url = self.photos.store(photo.as_ref()).await?;
        patch.photo_url = photo_url.clone();

        if patch.is_empty() {
            return Ok(existing);
        }

        let store = self.store.clone();
        let revision = match blocking(move || store.update(id, &patch)).await {
            Ok(revision) => revision,
            Err(e) => {
                if let Some(url) = &photo_url {
                    self.discard(url).await;
                }
                return Err(e);
            }
        };

        if photo_url.is_some() && self.retention == PhotoRetention::Prune {
            if let Some(old) = &revision.previous.photo_url {
                if revision.current.photo_url.as_ref() != Some(old) {
                    self.discard(old).await;
                }
            }
        }

        info!("Contact {} updated", id);
        Ok(revision.current)
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let store = self.store.clone();
        let removed = blocking(move || store.delete(id)).await?;

        if self.retention == PhotoRetention::Prune {
            if let Some(url) = &removed.photo_url {
                self.discard(url).await;
            }
        }

        info!("Contact {} deleted", id);
        Ok(())
    }

    /// Best-effort file removal after the record side is settled.
    async fn discard(&self, reference: &str) {
        if let Err(e) = self.photos.remove(reference).await {
            warn!("Failed to remove photo {}: {}", reference, e);
        }
    }
}

/// Run a synchronous store call off the async runtime.
async fn blocking<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}
