use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

use crate::gii::parsing::{ParsedContentItem, ParsedLaw};
use crate::slug::slugify;

// ============================================================================
// Law Models
// ============================================================================

/// Law is one federal act or ordinance as stored in the `laws` table
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Law {
    pub id: i32,
    pub doknr: String,
    pub slug: String,
    pub gii_slug: String,
    pub abbreviation: String,
    pub extra_abbreviations: Vec<String>,
    pub first_published: String,
    pub source_timestamp: String,
    pub title_long: String,
    pub title_short: Option<String>,
    #[sqlx(json)]
    pub publication_info: Vec<PublicationInfo>,
    #[sqlx(json)]
    pub status_info: Vec<StatusInfo>,
    pub notes_body: Option<String>,
    pub notes_footnotes: Option<String>,
    pub notes_documentary_footnotes: Option<String>,
}

/// Where a law was promulgated, e.g. `BGBl I` at `1994, 2378`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationInfo {
    pub periodical: String,
    pub reference: String,
}

/// Amendment status note, e.g. category `Stand` with a free-text comment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusInfo {
    pub category: String,
    pub comment: String,
}

/// ItemType classifies a content item within a law's structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Article,
    Heading,
    /// A heading that carries its own body text
    HeadingArticle,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Article => "article",
            ItemType::Heading => "heading",
            ItemType::HeadingArticle => "heading_article",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "article" => Ok(ItemType::Article),
            "heading" => Ok(ItemType::Heading),
            "heading_article" => Ok(ItemType::HeadingArticle),
            other => Err(format!("Unknown item type: {}", other)),
        }
    }
}

impl TryFrom<String> for ItemType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// ContentItem is a heading or article row in the `content_items` table
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ContentItem {
    pub id: i32,
    pub doknr: String,
    #[sqlx(try_from = "String")]
    pub item_type: ItemType,
    pub name: String,
    pub title: Option<String>,
    pub body: Option<String>,
    pub footnotes: Option<String>,
    pub documentary_footnotes: Option<String>,
    pub law_id: i32,
    pub parent_id: Option<i32>,
    pub order: i32,
}

/// Attachment is an embedded file (image, PDF) referenced from law text
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Attachment {
    pub id: i32,
    pub name: String,
    pub data_uri: String,
    pub law_id: i32,
}

/// Minimal projection used when resolving duplicate slugs
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct LawSlugRecord {
    pub id: i32,
    pub slug: String,
    pub gii_slug: String,
}

// ============================================================================
// Insert Models
// ============================================================================

/// NewAttachment is an attachment read from the data location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAttachment {
    pub name: String,
    pub data_uri: String,
}

/// NewLaw is a parsed law ready to be written to the database
#[derive(Debug, Clone)]
pub struct NewLaw {
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
    pub notes_body: Option<String>,
    pub notes_footnotes: Option<String>,
    pub notes_documentary_footnotes: Option<String>,
    /// Content items in document order; position is the stored `order`
    pub contents: Vec<ParsedContentItem>,
    pub attachments: Vec<NewAttachment>,
}

impl NewLaw {
    /// Build an insertable law; the slug is derived from the primary abbreviation
    pub fn from_parsed(
        parsed: ParsedLaw,
        gii_slug: impl Into<String>,
        mut attachments: Vec<NewAttachment>,
    ) -> Self {
        attachments.sort_by(|a, b| a.name.cmp(&b.name));

        Self {
            slug: slugify(&parsed.abbreviation),
            gii_slug: gii_slug.into(),
            doknr: parsed.doknr,
            abbreviation: parsed.abbreviation,
            extra_abbreviations: parsed.extra_abbreviations,
            first_published: parsed.first_published,
            source_timestamp: parsed.source_timestamp,
            title_long: parsed.title_long,
            title_short: parsed.title_short,
            publication_info: parsed.publication_info,
            status_info: parsed.status_info,
            notes_body: parsed.notes_body,
            notes_footnotes: parsed.notes_footnotes,
            notes_documentary_footnotes: parsed.notes_documentary_footnotes,
            contents: parsed.contents,
            attachments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_type_round_trips_through_str() {
        for item_type in [ItemType::Article, ItemType::Heading, ItemType::HeadingArticle] {
            assert_eq!(item_type.as_str().parse::<ItemType>(), Ok(item_type));
        }
        assert!("paragraph".parse::<ItemType>().is_err());
    }

    #[test]
    fn test_item_type_serializes_snake_case() {
        let json = serde_json::to_string(&ItemType::HeadingArticle).unwrap();
        assert_eq!(json, "\"heading_article\"");
    }

    #[test]
    fn test_new_law_slug_comes_from_abbreviation() {
        let parsed = ParsedLaw {
            doknr: "BJNR001950896".to_string(),
            abbreviation: "AÜG".to_string(),
            extra_abbreviations: vec!["AÜG 1972".to_string()],
            first_published: "1972-08-07".to_string(),
            source_timestamp: "20210811214048".to_string(),
            title_long: "Gesetz zur Regelung der Arbeitnehmerüberlassung".to_string(),
            title_short: Some("Arbeitnehmerüberlassungsgesetz".to_string()),
            publication_info: vec![],
            status_info: vec![],
            notes_body: None,
            notes_footnotes: None,
            notes_documentary_footnotes: None,
            contents: vec![],
        };
        let attachments = vec![
            NewAttachment {
                name: "b.png".to_string(),
                data_uri: "data:image/png;base64,".to_string(),
            },
            NewAttachment {
                name: "a.png".to_string(),
                data_uri: "data:image/png;base64,".to_string(),
            },
        ];

        let law = NewLaw::from_parsed(parsed, "a_g", attachments);

        assert_eq!(law.slug, "aueg");
        assert_eq!(law.gii_slug, "a_g");
        assert_eq!(law.attachments[0].name, "a.png");
    }
}
