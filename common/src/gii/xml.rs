// Small helpers over roxmltree for path lookups and markup-preserving text

use roxmltree::{Document, Node, ParsingOptions};

use crate::errors::ParseError;

/// Body fragments that GII uses to mean "no content"
pub const EMPTY_CONTENT_PATTERNS: [&str; 4] = ["<P/>", "<P />", "<P></P>", "<P>-</P>"];

/// Parse a document, accepting the DOCTYPE declaration GII files carry
pub fn parse_document(input: &str) -> Result<Document<'_>, ParseError> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    Document::parse_with_options(input, options).map_err(|e| ParseError::Xml(e.to_string()))
}

/// All elements reached by following `path` (child tag names) from `node`
pub fn find_all<'a, 'input>(node: Node<'a, 'input>, path: &str) -> Vec<Node<'a, 'input>> {
    let mut current = vec![node];
    for segment in path.split('/') {
        current = current
            .into_iter()
            .flat_map(|n| n.children().filter(move |c| c.has_tag_name(segment)))
            .collect();
    }
    current
}

/// First element reached by `path`
pub fn find_first<'a, 'input>(node: Node<'a, 'input>, path: &str) -> Option<Node<'a, 'input>> {
    find_all(node, path).into_iter().next()
}

/// Plain (unescaped) text directly inside an element, trimmed
pub fn plain_text(node: Node) -> String {
    node.text().map(|t| t.trim().to_string()).unwrap_or_default()
}

/// Element content with nested markup preserved verbatim
///
/// Leading text is unescaped; from the first child element onwards the
/// source markup is copied as-is, including text between and after children.
pub fn inner_markup(node: Node, input: &str) -> String {
    let mut out = String::new();
    let mut children = node.children().peekable();

    while let Some(child) = children.peek() {
        if child.is_element() {
            break;
        }
        if child.is_text() {
            if let Some(text) = child.text() {
                out.push_str(text);
            }
        }
        children.next();
    }

    let rest: Vec<Node> = children.collect();
    if let (Some(first), Some(last)) = (rest.first(), rest.last()) {
        if let Some(markup) = input.get(first.range().start..last.range().end) {
            out.push_str(markup);
        }
    }

    out
}

/// Trimmed inner markup, or `None` when empty
pub fn markup_text(node: Node, input: &str) -> Option<String> {
    let text = inner_markup(node, input);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Like [`markup_text`] but also treats GII's empty-paragraph markers as absent
pub fn content_text(node: Node, input: &str) -> Option<String> {
    markup_text(node, input).filter(|text| !EMPTY_CONTENT_PATTERNS.contains(&text.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inner_markup_keeps_child_tags() {
        let input = "<Content><P>Satz <B>eins</B>.</P>\n<P>Zwei</P></Content>";
        let doc = parse_document(input).unwrap();
        assert_eq!(
            inner_markup(doc.root_element(), input),
            "<P>Satz <B>eins</B>.</P>\n<P>Zwei</P>"
        );
    }

    #[test]
    fn test_inner_markup_unescapes_leading_text_only() {
        let input = "<langue>A &amp; B<BR/>C &amp; D</langue>";
        let doc = parse_document(input).unwrap();
        assert_eq!(inner_markup(doc.root_element(), input), "A & B<BR/>C &amp; D");
    }

    #[test]
    fn test_content_text_treats_empty_paragraphs_as_absent() {
        for input in [
            "<Content><P/></Content>",
            "<Content> <P /> </Content>",
            "<Content><P>-</P></Content>",
            "<Content>   </Content>",
        ] {
            let doc = parse_document(input).unwrap();
            assert_eq!(content_text(doc.root_element(), input), None, "{}", input);
        }
    }

    #[test]
    fn test_find_all_follows_path() {
        let input = "<norm><metadaten><jurabk>A</jurabk><jurabk>B</jurabk></metadaten></norm>";
        let doc = parse_document(input).unwrap();
        let found: Vec<String> = find_all(doc.root_element(), "metadaten/jurabk")
            .into_iter()
            .map(plain_text)
            .collect();
        assert_eq!(found, vec!["A", "B"]);
        assert!(find_first(doc.root_element(), "metadaten/amtabk").is_none());
    }

    #[test]
    fn test_doctype_is_accepted() {
        let input = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!DOCTYPE dokumente SYSTEM \"http://www.gesetze-im-internet.de/dtd/1.01/gii-norm.dtd\">\n<dokumente/>";
        assert!(parse_document(input).is_ok());
    }
}
