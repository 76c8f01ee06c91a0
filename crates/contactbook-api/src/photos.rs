use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::bail;
use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{ContactError, Result};

/// URL prefix stored photos are served under.
pub const PHOTO_ROUTE: &str = "/photos";

const ACCEPTED_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png"];
const INVALID_FORMAT: &str = "Invalid photo format. Supports: .jpg, .jpeg, .png";

/// An uploaded file as received from the client.
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub file_name: String,
    pub bytes: Bytes,
}

impl PhotoUpload {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Flat blob storage addressed by generated file name.
#[async_trait]
pub trait PhotoStorage: Send + Sync {
    /// Write a new file. Must fail rather than overwrite an existing name.
    async fn write(&self, name: &str, data: &[u8]) -> anyhow::Result<()>;

    async fn read(&self, name: &str) -> anyhow::Result<Vec<u8>>;

    /// Delete a file. A file that is already gone is not an error.
    async fn delete(&self, name: &str) -> anyhow::Result<()>;
}

/// Stores each photo as `{dir}/{name}`.
pub struct DiskPhotoStorage {
    dir: PathBuf,
}

impl DiskPhotoStorage {
    pub async fn new(dir: PathBuf) -> anyhow::Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Photo storage directory: {}", dir.display());
        Ok(Self { dir })
    }

    pub fn file_path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

#[async_trait]
impl PhotoStorage for DiskPhotoStorage {
    async fn write(&self, name: &str, data: &[u8]) -> anyhow::Result<()> {
        let path = self.file_path(name);
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        Ok(())
    }

    async fn read(&self, name: &str) -> anyhow::Result<Vec<u8>> {
        Ok(fs::read(self.file_path(name)).await?)
    }

    async fn delete(&self, name: &str) -> anyhow::Result<()> {
        let path = self.file_path(name);
        match fs::remove_file(&path).await {
            Ok(()) => {
                info!("Deleted photo {}", name);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Photo {} already gone", name);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory photo storage for tests.
#[derive(Default)]
pub struct MemoryPhotoStorage {
    files: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryPhotoStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_files(&self) -> anyhow::Result<std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>>> {
        self.files
            .lock()
            .map_err(|e| anyhow::anyhow!("Photo store lock poisoned: {}", e))
    }

    pub fn len(&self) -> anyhow::Result<usize> {
        Ok(self.lock_files()?.len())
    }

    pub fn is_empty(&self) -> anyhow::Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn contains(&self, name: &str) -> anyhow::Result<bool> {
        Ok(self.lock_files()?.contains_key(name))
    }
}

#[async_trait]
impl PhotoStorage for MemoryPhotoStorage {
    async fn write(&self, name: &str, data: &[u8]) -> anyhow::Result<()> {
        let mut files = self.lock_files()?;
        if files.contains_key(name) {
            bail!("Photo {} already exists", name);
        }
        files.insert(name.to_string(), data.to_vec());
        Ok(())
    }

    async fn read(&self, name: &str) -> anyhow::Result<Vec<u8>> {
        self.lock_files()?
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Photo {} not found", name))
    }

    async fn delete(&self, name: &str) -> anyhow::Result<()> {
        self.lock_files()?.remove(name);
        Ok(())
    }
}

/// Validates uploads and turns them into stored files plus a public
/// reference (`/photos/<uuid><ext>`).
#[derive(Clone)]
pub struct PhotoAttachment {
    storage: Arc<dyn PhotoStorage>,
}

impl PhotoAttachment {
    pub fn new(storage: Arc<dyn PhotoStorage>) -> Self {
        Self { storage }
    }

    /// Accepts `.jpg`, `.jpeg` and `.png` in any letter case.
    pub fn is_photo_file(file_name: &str) -> bool {
        photo_extension(file_name)
            .is_some_and(|ext| ACCEPTED_EXTENSIONS.contains(&ext.as_str()))
    }

    /// Format check only, no I/O. Absent or empty uploads pass.
    pub fn check(upload: Option<&PhotoUpload>) -> Result<()> {
        match upload {
            Some(photo) if !photo.is_empty() && !Self::is_photo_file(&photo.file_name) => {
                Err(ContactError::InvalidFormat(INVALID_FORMAT.to_string()))
            }
            _ => Ok(()),
        }
    }

    /// Store an upload under a fresh unique name. Returns `None` when there
    /// is nothing to store.
    pub async fn store(&self, upload: Option<&PhotoUpload>) -> Result<Option<String>> {
        let Some(photo) = upload.filter(|p| !p.is_empty()) else {
            return Ok(None);
        };
        Self::check(Some(photo))?;

        let extension = photo_extension(&photo.file_name).unwrap_or_default();
        let name = format!("{}{}", Uuid::new_v4(), extension);

        self.storage.write(&name, &photo.bytes).await?;
        info!("Stored photo {} ({} bytes)", name, photo.bytes.len());

        Ok(Some(format!("{}/{}", PHOTO_ROUTE, name)))
    }

    pub async fn read(&self, reference: &str) -> anyhow::Result<Vec<u8>> {
        let Some(name) = stored_name(reference) else {
            bail!("Not a photo reference: {}", reference);
        };
        self.storage.read(name).await
    }

    /// Delete the file behind a reference returned by [`store`](Self::store).
    /// Foreign references are skipped.
    pub async fn remove(&self, reference: &str) -> anyhow::Result<()> {
        match stored_name(reference) {
            Some(name) => self.storage.delete(name).await,
            None => {
                warn!("Refusing to remove foreign photo reference '{}'", reference);
                Ok(())
            }
        }
    }
}

/// Lowercased extension including the leading dot. A bare `.png` counts as
/// a `.png` extension.
fn photo_extension(file_name: &str) -> Option<String> {
    let name = Path::new(file_name).file_name()?.to_str()?;
    let (_, ext) = name.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(format!(".{}", ext.to_ascii_lowercase()))
}

/// Generated file name behind a `/photos/<name>` reference.
fn stored_name(reference: &str) -> Option<&str> {
    let name = reference.strip_prefix(PHOTO_ROUTE)?.strip_prefix('/')?;
    if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
        return None;
    }
    Some(name)
}
