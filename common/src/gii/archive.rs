// Law zip archives as published per law on gesetze-im-internet.de

use base64::Engine;
use std::io::{Cursor, Read};
use std::path::Path;

use crate::errors::DownloadError;

/// Contents of one `xml.zip`: the law document plus embedded files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LawArchive {
    pub xml_name: String,
    pub xml: String,
    pub attachments: Vec<(String, Vec<u8>)>,
}

/// Unpack a law archive; directory structure inside the zip is flattened
///
/// When two entries flatten to the same file name, the first one wins.
pub fn read_law_zip(bytes: &[u8]) -> Result<LawArchive, DownloadError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| DownloadError::InvalidArchive(e.to_string()))?;

    let mut xml: Option<(String, String)> = None;
    let mut attachments = Vec::new();

    for index in 0..archive.len() {
        let mut file = archive
            .by_index(index)
            .map_err(|e| DownloadError::InvalidArchive(e.to_string()))?;
        if file.is_dir() {
            continue;
        }

        let Some(name) = file
            .enclosed_name()
            .and_then(|path| path.file_name().map(|n| n.to_string_lossy().into_owned()))
        else {
            tracing::warn!(entry = file.name(), "Skipping archive entry with unsafe path");
            continue;
        };

        let mut data = Vec::new();
        file.read_to_end(&mut data)
            .map_err(|e| DownloadError::InvalidArchive(e.to_string()))?;

        if is_xml(&name) {
            if xml.is_some() {
                return Err(DownloadError::InvalidArchive(
                    "archive contains more than one XML document".to_string(),
                ));
            }
            let text = String::from_utf8(data)
                .map_err(|e| DownloadError::InvalidArchive(format!("{}: {}", name, e)))?;
            xml = Some((name, text));
        } else if attachments.iter().any(|(existing, _)| *existing == name) {
            tracing::warn!(entry = %name, "Skipping attachment with duplicate file name");
        } else {
            attachments.push((name, data));
        }
    }

    let (xml_name, xml) =
        xml.ok_or_else(|| DownloadError::InvalidArchive("archive contains no XML document".to_string()))?;
    attachments.sort_by(|a, b| a.0.cmp(&b.0));

    Ok(LawArchive {
        xml_name,
        xml,
        attachments,
    })
}

pub fn is_xml(file_name: &str) -> bool {
    file_name.to_ascii_lowercase().ends_with(".xml")
}

/// MIME type guessed from the file extension
pub fn mime_type(file_name: &str) -> &'static str {
    let extension = Path::new(file_name)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "pdf" => "application/pdf",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

/// Encode a file as `data:<mime>;base64,<payload>`
pub fn data_uri(file_name: &str, data: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        mime_type(file_name),
        base64::engine::general_purpose::STANDARD.encode(data)
    )
}

/// Split a data URI back into MIME type and decoded bytes
pub fn decode_data_uri(uri: &str) -> Option<(String, Vec<u8>)> {
    let rest = uri.strip_prefix("data:")?;
    let (mime, payload) = rest.split_once(";base64,")?;
    let data = base64::engine::general_purpose::STANDARD.decode(payload).ok()?;
    Some((mime.to_string(), data))
}
