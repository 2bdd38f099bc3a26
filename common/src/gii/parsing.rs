// Law XML parsing for documents published on gesetze-im-internet.de
//
// A document is a flat list of <norm> elements. The first one describes the
// law itself, every following one is a heading (doknr contains "NG") or an
// article (doknr contains "NE"). Nesting is reconstructed from the
// hierarchical section codes in <gliederungskennzahl>.

use roxmltree::Node;
use std::collections::{HashMap, HashSet};

use super::xml::{
    content_text, find_all, find_first, markup_text, parse_document, plain_text,
};
use crate::errors::ParseError;
use crate::models::{ItemType, PublicationInfo, StatusInfo};

const ARTICLE_MARKER: &str = "NE";
const HEADING_MARKER: &str = "NG";
const SECTION_CODE_CHUNK: usize = 3;

/// Law attributes and content extracted from one XML document
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLaw {
    pub doknr: String,
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
    pub contents: Vec<ParsedContentItem>,
}

/// One heading or article, in document order
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedContentItem {
    pub doknr: String,
    pub item_type: ItemType,
    pub name: String,
    pub title: Option<String>,
    pub body: Option<String>,
    pub footnotes: Option<String>,
    pub documentary_footnotes: Option<String>,
    pub parent_doknr: Option<String>,
}

/// Parse raw bytes of a law XML document
pub fn parse_law_bytes(bytes: &[u8]) -> Result<ParsedLaw, ParseError> {
    let input = std::str::from_utf8(bytes).map_err(|e| ParseError::Xml(e.to_string()))?;
    parse_law(input)
}

/// Parse a law XML document
pub fn parse_law(input: &str) -> Result<ParsedLaw, ParseError> {
    let doc = parse_document(input)?;
    let norms: Vec<Node> = doc
        .root_element()
        .children()
        .filter(|n| n.has_tag_name("norm"))
        .collect();

    let (header, body) = norms.split_first().ok_or(ParseError::NoNorms)?;

    let mut law = extract_law_attrs(*header, input)?;
    law.contents = extract_contents(body, input)?;
    Ok(law)
}

/// Read only the header norm's `builddate`, the source timestamp of a law
pub fn read_source_timestamp(input: &str) -> Result<String, ParseError> {
    let doc = parse_document(input)?;
    let header = doc
        .root_element()
        .children()
        .find(|n| n.has_tag_name("norm"))
        .ok_or(ParseError::NoNorms)?;
    required_attribute(header, "builddate", "<header>")
}

fn required_attribute(norm: Node, name: &str, doknr: &str) -> Result<String, ParseError> {
    norm.attribute(name)
        .map(str::to_string)
        .ok_or_else(|| ParseError::MissingField {
            doknr: doknr.to_string(),
            field: format!("@{}", name),
        })
}

fn required_plain_text(norm: Node, path: &str, doknr: &str) -> Result<String, ParseError> {
    find_first(norm, path)
        .map(plain_text)
        .ok_or_else(|| ParseError::MissingField {
            doknr: doknr.to_string(),
            field: path.to_string(),
        })
}

/// At most one element at `path`
fn single<'a, 'input>(
    norm: Node<'a, 'input>,
    path: &str,
    doknr: &str,
) -> Result<Option<Node<'a, 'input>>, ParseError> {
    let mut found = find_all(norm, path);
    if found.len() > 1 {
        return Err(ParseError::MultipleValues {
            doknr: doknr.to_string(),
            path: path.to_string(),
        });
    }
    Ok(found.pop())
}

fn single_markup(norm: Node, path: &str, doknr: &str, input: &str) -> Result<Option<String>, ParseError> {
    Ok(single(norm, path, doknr)?.and_then(|n| markup_text(n, input)))
}

fn single_content(norm: Node, path: &str, doknr: &str, input: &str) -> Result<Option<String>, ParseError> {
    Ok(single(norm, path, doknr)?.and_then(|n| content_text(n, input)))
}

// ============================================================================
// Header norm
// ============================================================================

fn extract_law_attrs(header: Node, input: &str) -> Result<ParsedLaw, ParseError> {
    let doknr = required_attribute(header, "doknr", "<header>")?;
    let source_timestamp = required_attribute(header, "builddate", &doknr)?;

    // Official abbreviations first, then the juris ones; first occurrence wins
    let mut abbreviations: Vec<String> = Vec::new();
    for node in find_all(header, "metadaten/amtabk")
        .into_iter()
        .chain(find_all(header, "metadaten/jurabk"))
    {
        let abbreviation = plain_text(node);
        if !abbreviation.is_empty() && !abbreviations.contains(&abbreviation) {
            abbreviations.push(abbreviation);
        }
    }
    if abbreviations.is_empty() {
        return Err(ParseError::NoAbbreviation);
    }
    let abbreviation = abbreviations.remove(0);

    let first_published = required_plain_text(header, "metadaten/ausfertigung-datum", &doknr)?;

    let title_long = find_first(header, "metadaten/langue")
        .and_then(|n| markup_text(n, input))
        .unwrap_or_default();
    let title_short = find_first(header, "metadaten/kurzue").and_then(|n| markup_text(n, input));

    let publication_info = find_all(header, "metadaten/fundstelle")
        .into_iter()
        .map(|fundstelle| -> Result<PublicationInfo, ParseError> {
            Ok(PublicationInfo {
                periodical: required_plain_text(fundstelle, "periodikum", &doknr)?,
                reference: required_plain_text(fundstelle, "zitstelle", &doknr)?,
            })
        })
        .collect::<Result<Vec<_>, ParseError>>()?;

    let status_info = find_all(header, "metadaten/standangabe")
        .into_iter()
        .map(|standangabe| -> Result<StatusInfo, ParseError> {
            Ok(StatusInfo {
                category: required_plain_text(standangabe, "standtyp", &doknr)?,
                comment: find_first(standangabe, "standkommentar")
                    .and_then(|n| markup_text(n, input))
                    .unwrap_or_default(),
            })
        })
        .collect::<Result<Vec<_>, ParseError>>()?;

    let text = find_first(header, "textdaten/text");
    let notes_content = text
        .and_then(|t| find_first(t, "Content"))
        .and_then(|n| content_text(n, input));
    let notes_toc = text
        .and_then(|t| find_first(t, "TOC"))
        .and_then(|n| markup_text(n, input));
    let notes_footnotes = text
        .and_then(|t| find_first(t, "Footnotes"))
        .and_then(|n| markup_text(n, input));

    let notes_documentary_footnotes =
        find_first(header, "textdaten/fussnoten/Content").and_then(|n| content_text(n, input));

    Ok(ParsedLaw {
        doknr,
        abbreviation,
        extra_abbreviations: abbreviations,
        first_published,
        source_timestamp,
        title_long,
        title_short,
        publication_info,
        status_info,
        notes_body: notes_content.or(notes_toc),
        notes_footnotes,
        notes_documentary_footnotes,
        contents: Vec::new(),
    })
}

// ============================================================================
// Body norms
// ============================================================================

#[derive(Debug, Default)]
struct NormText {
    body: Option<String>,
    footnotes: Option<String>,
}

fn parse_norm_text(norm: Node, doknr: &str, input: &str) -> Result<NormText, ParseError> {
    let Some(text) = single(norm, "textdaten/text", doknr)? else {
        return Ok(NormText::default());
    };

    match text.attribute("format") {
        Some("decorated") => {
            if markup_text(text, input).is_some() {
                return Err(ParseError::UnexpectedDecoratedContent(doknr.to_string()));
            }
            Ok(NormText::default())
        }
        Some("XML") => {
            let content = single_content(text, "Content", doknr, input)?;
            let toc = single_markup(text, "TOC", doknr, input)?;
            if content.is_some() && toc.is_some() {
                return Err(ParseError::BothTocAndContent(doknr.to_string()));
            }
            Ok(NormText {
                body: content.or(toc),
                footnotes: single_markup(text, "Footnotes", doknr, input)?,
            })
        }
        other => Err(ParseError::UnknownTextFormat {
            doknr: doknr.to_string(),
            format: other.unwrap_or_default().to_string(),
        }),
    }
}

/// `<gliederungseinheit>` of a norm
#[derive(Debug)]
struct SectionInfo {
    code: Option<String>,
    name: Option<String>,
    title: Option<String>,
}

fn parse_section_info(norm: Node, doknr: &str, input: &str) -> Result<Option<SectionInfo>, ParseError> {
    let Some(unit) = single(norm, "metadaten/gliederungseinheit", doknr)? else {
        return Ok(None);
    };

    Ok(Some(SectionInfo {
        code: single_markup(unit, "gliederungskennzahl", doknr, input)?,
        name: single_markup(unit, "gliederungsbez", doknr, input)?,
        title: single_markup(unit, "gliederungstitel", doknr, input)?,
    }))
}

/// Closest registered heading whose code is a 3-character-chunk prefix of `code`
///
/// The full code itself is tried first, then ever shorter prefixes.
pub fn find_parent<'a>(sections_by_code: &'a HashMap<String, String>, code: &str) -> Option<&'a str> {
    let chars: Vec<char> = code.chars().collect();
    let chunks: Vec<String> = chars
        .chunks(SECTION_CODE_CHUNK)
        .map(|chunk| chunk.iter().collect())
        .collect();

    (1..=chunks.len())
        .rev()
        .find_map(|len| sections_by_code.get(&chunks[..len].concat()))
        .map(String::as_str)
}

#[derive(Debug, Default)]
struct StructureState {
    current_parent: Option<String>,
    sections_by_code: HashMap<String, String>,
    items_with_children: HashSet<String>,
}

fn extract_contents(body_norms: &[Node], input: &str) -> Result<Vec<ParsedContentItem>, ParseError> {
    let mut state = StructureState::default();
    let mut items = Vec::with_capacity(body_norms.len());

    for norm in body_norms {
        let doknr = required_attribute(*norm, "doknr", "<body>")?;
        let text = parse_norm_text(*norm, &doknr, input)?;
        let documentary_footnotes = single_content(*norm, "textdaten/fussnoten/Content", &doknr, input)?;
        let section = parse_section_info(*norm, &doknr, input)?;
        let code = section.as_ref().and_then(|s| s.code.clone());

        let (item_type, name, title, parent_doknr) = if doknr.contains(ARTICLE_MARKER) {
            let name = single_markup(*norm, "metadaten/enbez", &doknr, input)?.unwrap_or_default();
            let title = single_markup(*norm, "metadaten/titel", &doknr, input)?;
            let parent = match &code {
                Some(code) => find_parent(&state.sections_by_code, code).map(str::to_string),
                None => state.current_parent.clone(),
            };
            (ItemType::Article, name, title, parent)
        } else if doknr.contains(HEADING_MARKER) {
            let section = section.ok_or_else(|| ParseError::MissingField {
                doknr: doknr.clone(),
                field: "metadaten/gliederungseinheit".to_string(),
            })?;
            let item_type = if text.body.is_some() {
                ItemType::HeadingArticle
            } else {
                ItemType::Heading
            };
            let parent = code
                .as_deref()
                .and_then(|code| find_parent(&state.sections_by_code, code))
                .map(str::to_string);
            if let Some(code) = &code {
                state.sections_by_code.insert(code.clone(), doknr.clone());
            }
            state.current_parent = Some(doknr.clone());
            (item_type, section.name.unwrap_or_default(), section.title, parent)
        } else {
            return Err(ParseError::UnknownNormStructure(doknr));
        };

        if let Some(parent) = &parent_doknr {
            state.items_with_children.insert(parent.clone());
        }

        items.push(ParsedContentItem {
            doknr,
            item_type,
            name,
            title,
            body: text.body,
            footnotes: text.footnotes,
            documentary_footnotes,
            parent_doknr,
        });
    }

    // Heading articles without children are plain articles
    for item in &mut items {
        if item.item_type == ItemType::HeadingArticle && !state.items_with_children.contains(&item.doknr) {
            item.item_type = ItemType::Article;
        }
    }

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = r#"<norm builddate="20210811214048" doknr="BJNR000010949">
    <metadaten>
      <jurabk>ExG</jurabk>
      <amtabk>ExG</amtabk>
      <jurabk>ExG 1949</jurabk>
      <ausfertigung-datum manuell="ja">1949-05-23</ausfertigung-datum>
      <fundstelle typ="amtlich">
        <periodikum>BGBl</periodikum>
        <zitstelle>1949, 1</zitstelle>
      </fundstelle>
      <kurzue>Beispielgesetz</kurzue>
      <langue>Gesetz über <B>Beispiele</B></langue>
      <standangabe checked="ja">
        <standtyp>Stand</standtyp>
        <standkommentar>Zuletzt geändert durch Art. 1 G v. 1.1.2020 I 1</standkommentar>
      </standangabe>
    </metadaten>
    <textdaten>
      <text format="XML"><Content><P/></Content><Footnotes><P>Fußnote</P></Footnotes></text>
      <fussnoten><Content><P>(+++ Textnachweis ab: 1.1.2020 +++)</P></Content></fussnoten>
    </textdaten>
  </norm>"#;

    fn doc(body: &str) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!DOCTYPE dokumente SYSTEM \"http://www.gesetze-im-internet.de/dtd/1.01/gii-norm.dtd\">\n<dokumente builddate=\"20210811214048\" doknr=\"BJNR000010949\">{}{}</dokumente>",
            HEADER, body
        )
    }

    fn heading(doknr: &str, code: &str, name: &str, body: Option<&str>) -> String {
        let text = body
            .map(|b| format!(r#"<textdaten><text format="XML"><Content>{}</Content></text></textdaten>"#, b))
            .unwrap_or_default();
        format!(
            r#"<norm doknr="{doknr}"><metadaten><jurabk>ExG</jurabk><gliederungseinheit><gliederungskennzahl>{code}</gliederungskennzahl><gliederungsbez>{name}</gliederungsbez><gliederungstitel>Titel {name}</gliederungstitel></gliederungseinheit></metadaten>{text}</norm>"#
        )
    }

    fn article(doknr: &str, enbez: &str) -> String {
        format!(
            r#"<norm doknr="{doknr}"><metadaten><jurabk>ExG</jurabk><enbez>{enbez}</enbez><titel format="parat">Titel</titel></metadaten><textdaten><text format="XML"><Content><P>Text von {enbez}</P></Content></text></textdaten></norm>"#
        )
    }

    #[test]
    fn test_header_attributes() {
        let law = parse_law(&doc("")).unwrap();

        assert_eq!(law.doknr, "BJNR000010949");
        assert_eq!(law.source_timestamp, "20210811214048");
        assert_eq!(law.abbreviation, "ExG");
        assert_eq!(law.extra_abbreviations, vec!["ExG 1949"]);
        assert_eq!(law.first_published, "1949-05-23");
        assert_eq!(law.title_long, "Gesetz über <B>Beispiele</B>");
        assert_eq!(law.title_short.as_deref(), Some("Beispielgesetz"));
        assert_eq!(
            law.publication_info,
            vec![PublicationInfo {
                periodical: "BGBl".to_string(),
                reference: "1949, 1".to_string()
            }]
        );
        assert_eq!(law.status_info[0].category, "Stand");
        assert_eq!(law.notes_body, None);
        assert_eq!(law.notes_footnotes.as_deref(), Some("<P>Fußnote</P>"));
        assert_eq!(
            law.notes_documentary_footnotes.as_deref(),
            Some("<P>(+++ Textnachweis ab: 1.1.2020 +++)</P>")
        );
        assert!(law.contents.is_empty());
    }

    #[test]
    fn test_structure_is_rebuilt_from_section_codes() {
        let body = [
            heading("BJNG000100000", "010", "Teil 1", None),
            heading("BJNG000200000", "010010", "Abschnitt 1", None),
            article("BJNE000100000", "§ 1"),
            heading("BJNG000300000", "020", "Teil 2", None),
            article("BJNE000200000", "§ 2"),
        ]
        .concat();

        let law = parse_law(&doc(&body)).unwrap();
        let parents: Vec<(&str, Option<&str>)> = law
            .contents
            .iter()
            .map(|i| (i.doknr.as_str(), i.parent_doknr.as_deref()))
            .collect();

        assert_eq!(
            parents,
            vec![
                ("BJNG000100000", None),
                ("BJNG000200000", Some("BJNG000100000")),
                ("BJNE000100000", Some("BJNG000200000")),
                ("BJNG000300000", None),
                ("BJNE000200000", Some("BJNG000300000")),
            ]
        );
        assert_eq!(law.contents[2].item_type, ItemType::Article);
        assert_eq!(law.contents[2].name, "§ 1");
        assert_eq!(law.contents[2].body.as_deref(), Some("<P>Text von § 1</P>"));
        assert_eq!(law.contents[1].name, "Abschnitt 1");
        assert_eq!(law.contents[1].title.as_deref(), Some("Titel Abschnitt 1"));
    }

    #[test]
    fn test_heading_article_without_children_becomes_article() {
        let body = [
            heading("BJNG000100000", "010", "Präambel", Some("<P>Text</P>")),
            heading("BJNG000200000", "020", "Teil 1", Some("<P>Einleitung</P>")),
            heading("BJNG000300000", "020010", "Abschnitt 1", None),
        ]
        .concat();

        let law = parse_law(&doc(&body)).unwrap();

        assert_eq!(law.contents[0].item_type, ItemType::Article);
        assert_eq!(law.contents[1].item_type, ItemType::HeadingArticle);
        assert_eq!(law.contents[2].item_type, ItemType::Heading);
    }

    #[test]
    fn test_unknown_norm_structure_is_rejected() {
        let body = r#"<norm doknr="BJNX000100000"><metadaten/></norm>"#;
        assert_eq!(
            parse_law(&doc(body)),
            Err(ParseError::UnknownNormStructure("BJNX000100000".to_string()))
        );
    }

    #[test]
    fn test_toc_and_content_together_are_rejected() {
        let body = r#"<norm doknr="BJNE000100000"><metadaten><enbez>§ 1</enbez></metadaten><textdaten><text format="XML"><TOC><P>a</P></TOC><Content><P>b</P></Content></text></textdaten></norm>"#;
        assert_eq!(
            parse_law(&doc(body)),
            Err(ParseError::BothTocAndContent("BJNE000100000".to_string()))
        );
    }

    #[test]
    fn test_decorated_text_is_empty() {
        let body = r#"<norm doknr="BJNE000100000"><metadaten><enbez>Anlage</enbez></metadaten><textdaten><text format="decorated"/></textdaten></norm>"#;
        let law = parse_law(&doc(body)).unwrap();
        assert_eq!(law.contents[0].body, None);

        let body = r#"<norm doknr="BJNE000100000"><metadaten/><textdaten><text format="decorated">x</text></textdaten></norm>"#;
        assert!(matches!(
            parse_law(&doc(body)),
            Err(ParseError::UnexpectedDecoratedContent(_))
        ));
    }

    #[test]
    fn test_unknown_text_format_is_rejected() {
        let body = r#"<norm doknr="BJNE000100000"><metadaten/><textdaten><text format="PDF"/></textdaten></norm>"#;
        assert!(matches!(
            parse_law(&doc(body)),
            Err(ParseError::UnknownTextFormat { .. })
        ));
    }

    #[test]
    fn test_document_without_norms_is_rejected() {
        assert_eq!(parse_law("<dokumente/>"), Err(ParseError::NoNorms));
    }

    #[test]
    fn test_read_source_timestamp() {
        assert_eq!(read_source_timestamp(&doc("")).unwrap(), "20210811214048");
    }

    #[test]
    fn test_find_parent_prefers_longest_prefix() {
        let mut sections = HashMap::new();
        sections.insert("010".to_string(), "A".to_string());
        sections.insert("010020".to_string(), "B".to_string());

        assert_eq!(find_parent(&sections, "010020030"), Some("B"));
        assert_eq!(find_parent(&sections, "010030"), Some("A"));
        assert_eq!(find_parent(&sections, "010020"), Some("B"));
        assert_eq!(find_parent(&sections, "020"), None);
        assert_eq!(find_parent(&sections, ""), None);
    }
}
