// In-memory fakes of the sync pipeline seams, shared by the test binaries
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;

use common::db::repositories::LawStore;
use common::errors::{DatabaseError, DownloadError, StorageError};
use common::gii::{LawArchive, LawDataLocation, LawSource};
use common::models::{LawSlugRecord, NewAttachment, NewLaw};

pub fn law_xml(abbreviation: &str, builddate: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<dokumente builddate="{builddate}" doknr="BJNR{abbreviation}">
  <norm builddate="{builddate}" doknr="BJNR{abbreviation}">
    <metadaten>
      <jurabk>{abbreviation}</jurabk>
      <ausfertigung-datum>2000-01-01</ausfertigung-datum>
      <langue>Gesetz {abbreviation}</langue>
    </metadaten>
  </norm>
  <norm doknr="BJNE0001{abbreviation}">
    <metadaten><jurabk>{abbreviation}</jurabk><enbez>§ 1</enbez></metadaten>
    <textdaten><text format="XML"><Content><P>Text</P></Content></text></textdaten>
  </norm>
</dokumente>"#
    )
}

pub fn archive(abbreviation: &str, builddate: &str) -> LawArchive {
    LawArchive {
        xml_name: format!("{}.xml", abbreviation.to_lowercase()),
        xml: law_xml(abbreviation, builddate),
        attachments: vec![],
    }
}

#[derive(Default)]
pub struct MemoryLocation {
    pub laws: Mutex<BTreeMap<String, LawArchive>>,
}

impl MemoryLocation {
    pub fn with(laws: &[(&str, LawArchive)]) -> Self {
        let location = Self::default();
        {
            let mut stored = location.laws.lock().unwrap();
            for (slug, archive) in laws {
                stored.insert(slug.to_string(), archive.clone());
            }
        }
        location
    }

    pub fn slugs(&self) -> Vec<String> {
        self.laws.lock().unwrap().keys().cloned().collect()
    }

    fn get(&self, gii_slug: &str) -> Result<LawArchive, StorageError> {
        self.laws
            .lock()
            .unwrap()
            .get(gii_slug)
            .cloned()
            .ok_or_else(|| StorageError::LawNotFound(gii_slug.to_string()))
    }
}

#[async_trait]
impl LawDataLocation for MemoryLocation {
    async fn list_slugs_with_timestamps(&self) -> Result<BTreeMap<String, String>, StorageError> {
        let laws = self.laws.lock().unwrap();
        Ok(laws
            .iter()
            .map(|(slug, archive)| {
                let timestamp = common::gii::parsing::read_source_timestamp(&archive.xml).unwrap();
                (slug.clone(), timestamp)
            })
            .collect())
    }

    async fn create_or_replace_law(&self, gii_slug: &str, archive: &LawArchive) -> Result<(), StorageError> {
        self.laws
            .lock()
            .unwrap()
            .insert(gii_slug.to_string(), archive.clone());
        Ok(())
    }

    async fn remove_law(&self, gii_slug: &str) -> Result<(), StorageError> {
        self.laws.lock().unwrap().remove(gii_slug);
        Ok(())
    }

    async fn xml_for(&self, gii_slug: &str) -> Result<String, StorageError> {
        Ok(self.get(gii_slug)?.xml)
    }

    async fn attachment_names(&self, gii_slug: &str) -> Result<Vec<String>, StorageError> {
        Ok(self.get(gii_slug)?.attachments.into_iter().map(|(name, _)| name).collect())
    }

    async fn attachments(&self, gii_slug: &str) -> Result<Vec<NewAttachment>, StorageError> {
        Ok(self
            .get(gii_slug)?
            .attachments
            .into_iter()
            .map(|(name, data)| NewAttachment {
                data_uri: common::gii::archive::data_uri(&name, &data),
                name,
            })
            .collect())
    }
}

pub struct StaticSource {
    toc: BTreeMap<String, String>,
    archives: BTreeMap<String, LawArchive>,
    pub downloads: Mutex<Vec<String>>,
}

impl StaticSource {
    pub fn new(laws: &[(&str, LawArchive)]) -> Self {
        Self {
            toc: laws
                .iter()
                .map(|(slug, _)| (slug.to_string(), format!("https://gii.test/{}/xml.zip", slug)))
                .collect(),
            archives: laws
                .iter()
                .map(|(slug, archive)| (format!("https://gii.test/{}/xml.zip", slug), archive.clone()))
                .collect(),
            downloads: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl LawSource for StaticSource {
    async fn fetch_toc(&self) -> Result<BTreeMap<String, String>, DownloadError> {
        Ok(self.toc.clone())
    }

    async fn download_law(&self, url: &str) -> Result<LawArchive, DownloadError> {
        self.downloads.lock().unwrap().push(url.to_string());
        self.archives
            .get(url)
            .cloned()
            .ok_or_else(|| DownloadError::UnexpectedStatus {
                url: url.to_string(),
                status: 404,
            })
    }
}

#[derive(Default)]
pub struct MemoryStore {
    laws: Mutex<Vec<(i32, NewLaw)>>,
}

impl MemoryStore {
    pub fn slugs(&self) -> BTreeMap<String, String> {
        self.laws
            .lock()
            .unwrap()
            .iter()
            .map(|(_, law)| (law.gii_slug.clone(), law.slug.clone()))
            .collect()
    }
}

#[async_trait]
impl LawStore for MemoryStore {
    async fn gii_slugs_with_timestamps(&self) -> Result<BTreeMap<String, String>, DatabaseError> {
        Ok(self
            .laws
            .lock()
            .unwrap()
            .iter()
            .map(|(_, law)| (law.gii_slug.clone(), law.source_timestamp.clone()))
            .collect())
    }

    async fn replace_law(&self, law: &NewLaw) -> Result<i32, DatabaseError> {
        let mut laws = self.laws.lock().unwrap();
        laws.retain(|(_, stored)| stored.doknr != law.doknr);
        let id = laws.iter().map(|(id, _)| *id).max().unwrap_or(0) + 1;
        laws.push((id, law.clone()));
        Ok(id)
    }

    async fn duplicate_slug_groups(&self) -> Result<Vec<Vec<LawSlugRecord>>, DatabaseError> {
        let laws = self.laws.lock().unwrap();
        let mut by_slug: BTreeMap<String, Vec<LawSlugRecord>> = BTreeMap::new();
        for (id, law) in laws.iter() {
            by_slug.entry(law.slug.clone()).or_default().push(LawSlugRecord {
                id: *id,
                slug: law.slug.clone(),
                gii_slug: law.gii_slug.clone(),
            });
        }
        Ok(by_slug
            .into_values()
            .filter(|group| group.len() > 1)
            .map(|mut group| {
                group.sort_by(|a, b| a.gii_slug.cmp(&b.gii_slug));
                group
            })
            .collect())
    }

    async fn update_slug(&self, id: i32, slug: &str) -> Result<(), DatabaseError> {
        let mut laws = self.laws.lock().unwrap();
        let (_, law) = laws
            .iter_mut()
            .find(|(law_id, _)| *law_id == id)
            .ok_or_else(|| DatabaseError::NotFound(format!("Law {} not found", id)))?;
        law.slug = slug.to_string();
        Ok(())
    }

    async fn delete_laws_by_gii_slug(&self, gii_slugs: &[String]) -> Result<u64, DatabaseError> {
        let mut laws = self.laws.lock().unwrap();
        let before = laws.len();
        laws.retain(|(_, law)| !gii_slugs.contains(&law.gii_slug));
        Ok((before - laws.len()) as u64)
    }
}
