// Response schemas shared by the API and the bulk export

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::db::repositories::LawRepository;
use crate::errors::DatabaseError;
use crate::models::{ContentItem, ItemType, Law, PublicationInfo, StatusInfo};

/// Single-object response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataResponse<T> {
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

pub const DEFAULT_PAGE_LIMIT: i64 = 100;
pub const MAX_PAGE_LIMIT: i64 = 1000;

/// `?limit=&offset=` query parameters
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PageQuery {
    /// Effective `(limit, offset)`; limit is clamped to `1..=MAX_PAGE_LIMIT`
    pub fn resolve(&self) -> (i64, i64) {
        let limit = self.limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT);
        let offset = self.offset.unwrap_or(0).max(0);
        (limit, offset)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub limit: i64,
    pub offset: i64,
    pub total: i64,
}

/// Paginated list envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

/// Law metadata without notes or contents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LawBasicFields {
    pub doknr: String,
    pub slug: String,
    pub gii_slug: String,
    pub abbreviation: String,
    pub extra_abbreviations: Vec<String>,
    pub first_published: String,
    pub source_timestamp: String,
    pub title_long: String,
    pub title_short: Option<String>,
    pub publication_info: Vec<PublicationInfo>,
    pub status_info: Vec<StatusInfo>,
}

impl From<&Law> for LawBasicFields {
    fn from(law: &Law) -> Self {
        Self {
            doknr: law.doknr.clone(),
            slug: law.slug.clone(),
            gii_slug: law.gii_slug.clone(),
            abbreviation: law.abbreviation.clone(),
            extra_abbreviations: law.extra_abbreviations.clone(),
            first_published: law.first_published.clone(),
            source_timestamp: law.source_timestamp.clone(),
            title_long: law.title_long.clone(),
            title_short: law.title_short.clone(),
            publication_info: law.publication_info.clone(),
            status_info: law.status_info.clone(),
        }
    }
}

/// Reference from a content item to its enclosing heading
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentReference {
    pub doknr: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItemFields {
    pub doknr: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub name: String,
    pub title: Option<String>,
    pub body: Option<String>,
    pub footnotes: Option<String>,
    pub documentary_footnotes: Option<String>,
    pub parent: Option<ParentReference>,
}

impl ContentItemFields {
    /// Convert stored items, resolving parent ids to references
    pub fn from_items(items: &[ContentItem]) -> Vec<Self> {
        let by_id: HashMap<i32, &ContentItem> = items.iter().map(|item| (item.id, item)).collect();

        items
            .iter()
            .map(|item| Self {
                doknr: item.doknr.clone(),
                item_type: item.item_type,
                name: item.name.clone(),
                title: item.title.clone(),
                body: item.body.clone(),
                footnotes: item.footnotes.clone(),
                documentary_footnotes: item.documentary_footnotes.clone(),
                parent: item
                    .parent_id
                    .and_then(|id| by_id.get(&id))
                    .map(|parent| ParentReference {
                        doknr: parent.doknr.clone(),
                        item_type: parent.item_type,
                    }),
            })
            .collect()
    }
}

/// Complete law with notes, attachment names and contents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LawAllFields {
    #[serde(flatten)]
    pub basic: LawBasicFields,
    pub notes_body: Option<String>,
    pub notes_footnotes: Option<String>,
    pub notes_documentary_footnotes: Option<String>,
    pub attachment_names: Vec<String>,
    pub contents: Vec<ContentItemFields>,
}

impl LawAllFields {
    pub fn from_models(law: &Law, contents: &[ContentItem], attachment_names: Vec<String>) -> Self {
        Self {
            basic: LawBasicFields::from(law),
            notes_body: law.notes_body.clone(),
            notes_footnotes: law.notes_footnotes.clone(),
            notes_documentary_footnotes: law.notes_documentary_footnotes.clone(),
            attachment_names,
            contents: ContentItemFields::from_items(contents),
        }
    }

    /// Load contents and attachment names for `law`
    pub async fn load(repository: &LawRepository, law: &Law) -> Result<Self, DatabaseError> {
        let contents = repository.find_contents(law.id).await?;
        let attachment_names = repository.find_attachment_names(law.id).await?;
        Ok(Self::from_models(law, &contents, attachment_names))
    }

    pub fn slug(&self) -> &str {
        &self.basic.slug
    }
}

/// Load every law with its contents, ordered by slug
pub async fn load_all_laws(repository: &LawRepository) -> Result<Vec<LawAllFields>, DatabaseError> {
    let laws = repository.find_all().await?;
    let mut result = Vec::with_capacity(laws.len());
    for law in &laws {
        result.push(LawAllFields::load(repository, law).await?);
    }
    Ok(result)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn law(slug: &str) -> Law {
        Law {
            id: 1,
            doknr: format!("BJNR{}", slug.to_uppercase()),
            slug: slug.to_string(),
            gii_slug: slug.to_string(),
            abbreviation: slug.to_uppercase(),
            extra_abbreviations: vec![],
            first_published: "1990-01-01".to_string(),
            source_timestamp: "20200101000000".to_string(),
            title_long: format!("Gesetz {}", slug),
            title_short: None,
            publication_info: vec![PublicationInfo {
                periodical: "BGBl I".to_string(),
                reference: "1990, 1".to_string(),
            }],
            status_info: vec![],
            notes_body: None,
            notes_footnotes: None,
            notes_documentary_footnotes: None,
        }
    }

    pub fn item(id: i32, doknr: &str, item_type: ItemType, parent_id: Option<i32>) -> ContentItem {
        ContentItem {
            id,
            doknr: doknr.to_string(),
            item_type,
            name: format!("§ {}", id),
            title: None,
            body: Some("<P>Text</P>".to_string()),
            footnotes: None,
            documentary_footnotes: None,
            law_id: 1,
            parent_id,
            order: id,
        }
    }
}
