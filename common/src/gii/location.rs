// On-disk store of raw law data, one directory per GII slug

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

use super::archive::{data_uri, is_xml, LawArchive};
use super::parsing::read_source_timestamp;
use crate::errors::StorageError;
use crate::models::NewAttachment;

/// Storage for downloaded law archives
#[async_trait]
pub trait LawDataLocation: Send + Sync {
    /// GII slug → `builddate` of every stored law
    async fn list_slugs_with_timestamps(&self) -> Result<BTreeMap<String, String>, StorageError>;

    /// Store a law, dropping whatever was stored under the slug before
    async fn create_or_replace_law(&self, gii_slug: &str, archive: &LawArchive) -> Result<(), StorageError>;

    async fn remove_law(&self, gii_slug: &str) -> Result<(), StorageError>;

    /// The law's XML document
    async fn xml_for(&self, gii_slug: &str) -> Result<String, StorageError>;

    /// Sorted attachment file names
    async fn attachment_names(&self, gii_slug: &str) -> Result<Vec<String>, StorageError>;

    /// Attachments encoded as data URIs, sorted by name
    async fn attachments(&self, gii_slug: &str) -> Result<Vec<NewAttachment>, StorageError>;
}

/// [`LawDataLocation`] backed by a local directory
#[derive(Debug, Clone)]
pub struct LocalDirectory {
    base_path: PathBuf,
}

impl LocalDirectory {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn law_dir(&self, gii_slug: &str) -> Result<PathBuf, StorageError> {
        // Dot-prefixed names are reserved for staging directories
        let valid = !gii_slug.is_empty() && !gii_slug.starts_with('.') && !gii_slug.contains(['/', '\\']);
        if !valid {
            return Err(StorageError::InvalidLawData {
                slug: gii_slug.to_string(),
                reason: "slug is not a plain directory name".to_string(),
            });
        }
        Ok(self.base_path.join(gii_slug))
    }

    fn staging_dir(&self, gii_slug: &str) -> PathBuf {
        self.base_path.join(format!(".{}.tmp", gii_slug))
    }

    async fn write_law_files(dir: &Path, archive: &LawArchive) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(dir).await?;
        tokio::fs::write(dir.join(&archive.xml_name), archive.xml.as_bytes()).await?;
        for (name, data) in &archive.attachments {
            tokio::fs::write(dir.join(name), data).await?;
        }
        Ok(())
    }

    /// File names in a law directory, split into (xml, attachments), sorted
    async fn list_files(&self, gii_slug: &str) -> Result<(Vec<String>, Vec<String>), StorageError> {
        let dir = self.law_dir(gii_slug)?;
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::LawNotFound(gii_slug.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let mut xml_files = Vec::new();
        let mut attachments = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_xml(&name) {
                xml_files.push(name);
            } else {
                attachments.push(name);
            }
        }
        xml_files.sort();
        attachments.sort();
        Ok((xml_files, attachments))
    }
}

#[async_trait]
impl LawDataLocation for LocalDirectory {
    #[instrument(skip(self), fields(base_path = %self.base_path.display()))]
    async fn list_slugs_with_timestamps(&self) -> Result<BTreeMap<String, String>, StorageError> {
        let mut laws = BTreeMap::new();

        let mut entries = match tokio::fs::read_dir(&self.base_path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Data location does not exist yet");
                return Ok(laws);
            }
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let slug = entry.file_name().to_string_lossy().into_owned();
            if slug.starts_with('.') {
                continue;
            }
            let timestamp = match self.xml_for(&slug).await {
                Ok(xml) => read_source_timestamp(&xml).map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };
            match timestamp {
                Ok(timestamp) => {
                    laws.insert(slug, timestamp);
                }
                // Unreadable entries are treated as missing and get downloaded again
                Err(reason) => warn!(gii_slug = %slug, reason = %reason, "Ignoring unreadable law directory"),
            }
        }

        Ok(laws)
    }

    #[instrument(skip(self, archive), fields(attachments = archive.attachments.len()))]
    async fn create_or_replace_law(&self, gii_slug: &str, archive: &LawArchive) -> Result<(), StorageError> {
        let dir = self.law_dir(gii_slug)?;
        let staging = self.staging_dir(gii_slug);

        // Leftover from an interrupted run
        if tokio::fs::try_exists(&staging).await? {
            tokio::fs::remove_dir_all(&staging).await?;
        }

        // The stored law stays untouched until the new one is complete
        if let Err(e) = Self::write_law_files(&staging, archive).await {
            if let Err(cleanup) = tokio::fs::remove_dir_all(&staging).await {
                warn!(path = %staging.display(), error = %cleanup, "Failed to remove staging directory");
            }
            return Err(e);
        }

        if tokio::fs::try_exists(&dir).await? {
            tokio::fs::remove_dir_all(&dir).await?;
        }
        tokio::fs::rename(&staging, &dir).await?;

        debug!(path = %dir.display(), "Stored law");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove_law(&self, gii_slug: &str) -> Result<(), StorageError> {
        let dir = self.law_dir(gii_slug)?;
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => {
                info!(gii_slug = gii_slug, "Removed law data");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn xml_for(&self, gii_slug: &str) -> Result<String, StorageError> {
        let (xml_files, _) = self.list_files(gii_slug).await?;
        let name = match xml_files.as_slice() {
            [name] => name,
            [] => return Err(StorageError::LawNotFound(gii_slug.to_string())),
            _ => {
                return Err(StorageError::InvalidLawData {
                    slug: gii_slug.to_string(),
                    reason: format!("{} XML files", xml_files.len()),
                })
            }
        };
        let path = self.law_dir(gii_slug)?.join(name);
        Ok(tokio::fs::read_to_string(path).await?)
    }

    async fn attachment_names(&self, gii_slug: &str) -> Result<Vec<String>, StorageError> {
        let (_, attachments) = self.list_files(gii_slug).await?;
        Ok(attachments)
    }

    async fn attachments(&self, gii_slug: &str) -> Result<Vec<NewAttachment>, StorageError> {
        let dir = self.law_dir(gii_slug)?;
        let mut attachments = Vec::new();
        for name in self.attachment_names(gii_slug).await? {
            let data = tokio::fs::read(dir.join(&name)).await?;
            attachments.push(NewAttachment {
                data_uri: data_uri(&name, &data),
                name,
            });
        }
        Ok(attachments)
    }
}
