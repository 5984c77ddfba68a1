use std::sync::LazyLock;

use scraper::{ElementRef, Html, Node, Selector};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Missing required field: {0}")]
    MissingField(String),
    #[error("Failed to parse date: {0}")]
    InvalidDate(String),
    #[error("Failed to parse update id: {0}")]
    InvalidId(String),
    #[error("Invalid KB number: {0}")]
    InvalidKbNumber(String),
    #[error("Malformed script literal: {0}")]
    MalformedLiteral(String),
    #[error("Failed to decode JSON: {0}")]
    Json(#[from] serde_json::Error),
}

static CANONICAL_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"link[rel="canonical"]"#).expect("invalid selector: canonical")
});

static ANCHOR_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("invalid selector: anchor"));

pub fn elem_text(element: ElementRef) -> String {
    element.text().collect::<String>()
}

pub fn find_by_id<'a>(document: &'a Html, id: &str) -> Option<ElementRef<'a>> {
    document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().id() == Some(id))
}

pub fn text_by_id(document: &Html, id: &str) -> Option<String> {
    find_by_id(document, id).map(elem_text)
}

/// Text of every node after `element` under the same parent, in order: the
/// content of text nodes, or all descendant text of elements. Comments and
/// the like yield an empty string.
pub fn sibling_texts<'a>(element: ElementRef<'a>) -> impl Iterator<Item = String> + 'a {
    element.next_siblings().map(|node| match node.value() {
        Node::Text(text) => text.text.to_string(),
        Node::Element(_) => ElementRef::wrap(node).map(elem_text).unwrap_or_default(),
        _ => String::new(),
    })
}

/// The node directly after `element`, whatever its kind, as text.
pub fn next_sibling_text(element: ElementRef) -> Option<String> {
    sibling_texts(element).next()
}

pub fn next_element_sibling<'a>(element: ElementRef<'a>) -> Option<ElementRef<'a>> {
    element.next_siblings().find_map(ElementRef::wrap)
}

pub fn next_sibling_tagged<'a>(element: ElementRef<'a>, tag: &str) -> Option<ElementRef<'a>> {
    element
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == tag)
}

pub fn canonical_link(document: &Html) -> Option<String> {
    document
        .select(&CANONICAL_SEL)
        .next()
        .and_then(|e| e.value().attr("href"))
        .map(str::to_string)
}

pub fn anchor_hrefs(document: &Html) -> Vec<String> {
    document
        .select(&ANCHOR_SEL)
        .filter_map(|e| e.value().attr("href"))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head><link rel="canonical" href="https://example.test/page"></head>
<body><div id="wrap"><span id="label">Label:</span> value text <div>first</div><p>para</p></div>
<a href="/one">1</a><a>no href</a><a href="/two">2</a></body></html>"#;

    #[test]
    fn test_find_by_id_and_siblings() {
        let document = Html::parse_document(PAGE);
        let label = find_by_id(&document, "label").expect("label present");

        assert_eq!(elem_text(label), "Label:");
        assert_eq!(next_sibling_text(label).as_deref().map(str::trim), Some("value text"));
        assert_eq!(next_element_sibling(label).map(elem_text).as_deref(), Some("first"));
        assert_eq!(next_sibling_tagged(label, "p").map(elem_text).as_deref(), Some("para"));
        assert_eq!(
            sibling_texts(label).collect::<Vec<_>>(),
            vec![" value text ", "first", "para"]
        );
        assert!(find_by_id(&document, "missing").is_none());
    }

    #[test]
    fn test_canonical_and_anchors() {
        let document = Html::parse_document(PAGE);

        assert_eq!(
            canonical_link(&document).as_deref(),
            Some("https://example.test/page")
        );
        assert_eq!(anchor_hrefs(&document), vec!["/one", "/two"]);
    }
}
