//! Read-only CSS query facade over fetched markup.
//!
//! Wraps `scraper` so resolvers deal in trimmed text and attribute lookups
//! instead of raw DOM nodes. Invalid selectors log a warning and match
//! nothing; extraction never fails the caller on its own.
//!
//! # Example
//!
//! ```rust
//! use cinefetch::extract::{Document, DocumentKind};
//!
//! let doc = Document::parse(
//!     r#"<ul><li><a href="/a">A</a></li><li><a href="/b"> B </a></li></ul>"#,
//!     DocumentKind::Html,
//! );
//! let titles: Vec<String> = doc.select("li a").iter().map(|n| n.text()).collect();
//! assert_eq!(titles, ["A", "B"]);
//! ```

use scraper::{ElementRef, Html, Selector};
use serde_json::Value;

/// How the raw text should be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// A full HTML page.
    Html,
    /// An HTML snippet, typically lifted out of a JSON response.
    Fragment,
}

/// A parsed document.
pub struct Document {
    html: Html,
}

impl Document {
    pub fn parse(text: &str, kind: DocumentKind) -> Self {
        let html = match kind {
            DocumentKind::Html => Html::parse_document(text),
            DocumentKind::Fragment => Html::parse_fragment(text),
        };
        Self { html }
    }

    /// Parse the HTML snippet stored under `field` of a JSON object.
    ///
    /// Returns `None` if the text is not JSON or the field is not a string.
    pub fn from_json_field(json: &str, field: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(json).ok()?;
        let snippet = value.get(field)?.as_str()?;
        Some(Self::parse(snippet, DocumentKind::Fragment))
    }

    /// Every node matching `css`, in document order.
    pub fn select(&self, css: &str) -> Vec<Node<'_>> {
        match selector(css) {
            Some(sel) => self.html.select(&sel).map(Node).collect(),
            None => Vec::new(),
        }
    }

    /// The first node matching `css`.
    pub fn select_first(&self, css: &str) -> Option<Node<'_>> {
        let sel = selector(css)?;
        self.html.select(&sel).next().map(Node)
    }

    /// Trimmed text of the first match, if non-empty.
    pub fn text_of(&self, css: &str) -> Option<String> {
        self.select_first(css)
            .map(|n| n.text())
            .filter(|t| !t.is_empty())
    }

    /// `attr` of the first match.
    pub fn attr_of(&self, css: &str, attr: &str) -> Option<String> {
        self.select_first(css)
            .and_then(|n| n.attr(attr).map(str::to_string))
    }

    /// First non-empty `attr` across several selectors, in order.
    pub fn first_attr(&self, candidates: &[&str], attr: &str) -> Option<String> {
        candidates
            .iter()
            .filter_map(|css| self.attr_of(css, attr))
            .find(|v| !v.trim().is_empty())
    }
}

/// A matched element.
#[derive(Clone, Copy)]
pub struct Node<'a>(ElementRef<'a>);

impl<'a> Node<'a> {
    /// Concatenated descendant text, trimmed.
    pub fn text(&self) -> String {
        self.0.text().collect::<String>().trim().to_string()
    }

    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.0.value().attr(name)
    }

    /// First non-empty attribute among `names`.
    pub fn first_attr(&self, names: &[&str]) -> Option<&'a str> {
        names
            .iter()
            .filter_map(|n| self.attr(n))
            .find(|v| !v.trim().is_empty())
    }

    /// Matches of `css` scoped to this node's descendants.
    pub fn select(&self, css: &str) -> Vec<Node<'a>> {
        match selector(css) {
            Some(sel) => self.0.select(&sel).map(Node).collect(),
            None => Vec::new(),
        }
    }

    pub fn select_first(&self, css: &str) -> Option<Node<'a>> {
        let sel = selector(css)?;
        self.0.select(&sel).next().map(Node)
    }

    /// Trimmed text of the first descendant match, if non-empty.
    pub fn text_of(&self, css: &str) -> Option<String> {
        self.select_first(css)
            .map(|n| n.text())
            .filter(|t| !t.is_empty())
    }

    /// Nearest element ancestor.
    pub fn parent(&self) -> Option<Node<'a>> {
        self.0.parent().and_then(ElementRef::wrap).map(Node)
    }

    /// Element tag name, lowercase.
    pub fn tag(&self) -> &'a str {
        self.0.value().name()
    }
}

fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(sel) => Some(sel),
        Err(e) => {
            tracing::warn!("invalid selector {css:?}: {e:?}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <div class="info">
            <h1> Spirited Away </h1>
            <div class="poster"><img data-src="" src="/p.jpg"></div>
            <div class="meta">
              <div>Genre: <a>Fantasy</a>, <a>Adventure</a></div>
              <div>Country: <a>Japan</a></div>
            </div>
          </div>
          <ul class="eps">
            <li><a href="/ep-1" data-kname="1-1">Ep 1</a></li>
            <li><a href="/ep-2" data-kname="1-2">Ep 2</a></li>
          </ul>
        </body></html>"#;

    #[test]
    fn selects_repeated_items() {
        let doc = Document::parse(PAGE, DocumentKind::Html);
        let hrefs: Vec<_> = doc
            .select("ul.eps li a")
            .iter()
            .filter_map(|n| n.attr("href"))
            .collect();
        assert_eq!(hrefs, ["/ep-1", "/ep-2"]);
    }

    #[test]
    fn optional_single_node() {
        let doc = Document::parse(PAGE, DocumentKind::Html);
        assert_eq!(doc.text_of("div.info h1").as_deref(), Some("Spirited Away"));
        assert!(doc.select_first("div#watch").is_none());
        assert!(doc.text_of("div#watch").is_none());
    }

    #[test]
    fn first_matching_attribute_wins() {
        let doc = Document::parse(PAGE, DocumentKind::Html);
        let img = doc.select_first(".poster img").unwrap();
        // empty data-src is skipped
        assert_eq!(img.first_attr(&["data-src", "src"]), Some("/p.jpg"));
        assert_eq!(
            doc.first_attr(&["img.poster", ".info .poster img"], "src").as_deref(),
            Some("/p.jpg")
        );
    }

    #[test]
    fn scoped_sub_queries() {
        let doc = Document::parse(PAGE, DocumentKind::Html);
        let genres: Vec<String> = doc
            .select("div.info .meta div")
            .into_iter()
            .find(|n| n.text().contains("Genre"))
            .map(|n| n.select("a").iter().map(Node::text).collect())
            .unwrap_or_default();
        assert_eq!(genres, ["Fantasy", "Adventure"]);
    }

    #[test]
    fn parent_walks_up() {
        let doc = Document::parse(PAGE, DocumentKind::Html);
        let a = doc.select_first(r#"a[href="/ep-2"]"#).unwrap();
        assert_eq!(a.parent().unwrap().tag(), "li");
    }

    #[test]
    fn fragment_from_json_field() {
        let json = r#"{"html":"<div class=\"episode\"><a href=\"/x\">X</a></div>"}"#;
        let doc = Document::from_json_field(json, "html").unwrap();
        assert_eq!(doc.attr_of("div.episode a", "href").as_deref(), Some("/x"));
        assert!(Document::from_json_field(json, "missing").is_none());
        assert!(Document::from_json_field("not json", "html").is_none());
    }

    #[test]
    fn invalid_selector_matches_nothing() {
        let doc = Document::parse(PAGE, DocumentKind::Html);
        assert!(doc.select("div[[").is_empty());
        assert!(doc.select_first("div[[").is_none());
    }
}
