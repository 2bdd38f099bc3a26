// Table of contents of all laws (gii-toc.xml)

use reqwest::Url;
use std::collections::BTreeMap;

use super::xml::{find_all, find_first, parse_document, plain_text};
use crate::errors::DownloadError;

const ARCHIVE_FILE_NAME: &str = "xml.zip";

/// Map every listed law's GII slug to its archive download URL
///
/// ```text
/// <items>
///   <item><title>…</title><link>http://www.gesetze-im-internet.de/aeg/xml.zip</link></item>
/// </items>
/// ```
pub fn parse_toc(input: &str) -> Result<BTreeMap<String, String>, DownloadError> {
    let doc = parse_document(input).map_err(|e| DownloadError::InvalidToc(e.to_string()))?;
    let root = doc.root_element();
    if !root.has_tag_name("items") {
        return Err(DownloadError::InvalidToc(format!(
            "unexpected root element <{}>",
            root.tag_name().name()
        )));
    }

    let mut laws = BTreeMap::new();
    for item in find_all(root, "item") {
        let Some(link) = find_first(item, "link").map(plain_text) else {
            tracing::warn!("Skipping TOC item without link");
            continue;
        };
        match slug_from_link(&link) {
            Some(slug) => {
                laws.insert(slug, link);
            }
            None => tracing::warn!(link = %link, "Skipping TOC item with unexpected link"),
        }
    }

    Ok(laws)
}

/// `http://www.gesetze-im-internet.de/aeg/xml.zip` → `aeg`
pub fn slug_from_link(link: &str) -> Option<String> {
    let url = Url::parse(link.trim()).ok()?;
    let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        [.., slug, file] if *file == ARCHIVE_FILE_NAME => Some((*slug).to_string()),
        _ => None,
    }
}
