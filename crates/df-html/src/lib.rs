//! HTML tokenization and tree construction.

mod entities;
mod tokenizer;

use df_dom::Document;
use df_dom::DomError;
use df_dom::NodeId;
use df_dom::is_void_element;

use crate::entities::decode_entities;
use crate::tokenizer::ParsedTag;
use crate::tokenizer::find_byte;
use crate::tokenizer::parse_tag;
use crate::tokenizer::read_comment;
use crate::tokenizer::read_raw_text_until_end_tag;
use crate::tokenizer::skip_processing_instruction;
use crate::tokenizer::skip_to_gt;
use crate::tokenizer::starts_with;

const HEAD_ELEMENTS: &[&str] = &["base", "link", "meta", "script", "style", "title"];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

/// Opening one of these closes an open `p`.
const CLOSES_PARAGRAPH: &[&str] = &[
    "address",
    "article",
    "aside",
    "blockquote",
    "div",
    "dl",
    "fieldset",
    "footer",
    "form",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "header",
    "hr",
    "main",
    "nav",
    "ol",
    "p",
    "pre",
    "section",
    "table",
    "ul",
];

/// Resource limits applied while parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserConfig {
    pub max_input_bytes: usize,
    /// Elements allowed to nest inside the insertion point (`body` for
    /// documents, the root for fragments).
    pub max_depth: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_input_bytes: 8 * 1024 * 1024,
            max_depth: 512,
        }
    }
}

/// Markup that cannot be turned into a tree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("markup is {len} bytes, limit is {limit}")]
    InputTooLarge { len: usize, limit: usize },
    #[error("element nesting exceeds depth limit {limit}")]
    NestingTooDeep { limit: usize },
    #[error(transparent)]
    Tree(#[from] DomError),
}

/// Parses raw HTML into a DOM document.
#[derive(Debug, Clone, Default)]
pub struct HtmlParser {
    config: ParserConfig,
}

impl HtmlParser {
    pub fn new(config: ParserConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parses a full document; the result always has `html`, `head` and
    /// `body` elements.
    pub fn parse_document(&self, input: &str) -> Result<Document, ParseError> {
        self.check_size(input)?;

        let mut document = Document::new();
        let html = document.create_element("html");
        let head = document.create_element("head");
        let body = document.create_element("body");
        document.append_child(document.root(), html)?;
        document.append_child(html, head)?;
        document.append_child(html, body)?;

        let mut builder = TreeBuilder {
            document,
            stack: vec![body],
            skeleton: Some(Skeleton { html, head, body }),
            body_started: false,
            max_depth: self.config.max_depth,
        };
        builder.run(input)?;
        tracing::trace!(
            nodes = builder.document.node_count(),
            bytes = input.len(),
            "parsed document"
        );
        Ok(builder.document)
    }

    /// Parses a fragment; top-level nodes become children of the root.
    pub fn parse_fragment(&self, input: &str) -> Result<Document, ParseError> {
        self.check_size(input)?;

        let document = Document::new();
        let root = document.root();
        let mut builder = TreeBuilder {
            document,
            stack: vec![root],
            skeleton: None,
            body_started: true,
            max_depth: self.config.max_depth,
        };
        builder.run(input)?;
        Ok(builder.document)
    }

    fn check_size(&self, input: &str) -> Result<(), ParseError> {
        if input.len() > self.config.max_input_bytes {
            return Err(ParseError::InputTooLarge {
                len: input.len(),
                limit: self.config.max_input_bytes,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct Skeleton {
    html: NodeId,
    head: NodeId,
    body: NodeId,
}

struct TreeBuilder {
    document: Document,
    /// Open elements; index 0 is the insertion base and is never popped.
    stack: Vec<NodeId>,
    skeleton: Option<Skeleton>,
    body_started: bool,
    max_depth: usize,
}

impl TreeBuilder {
    fn run(&mut self, input: &str) -> Result<(), ParseError> {
        let bytes = input.as_bytes();
        let mut idx = 0_usize;

        while idx < bytes.len() {
            if bytes[idx] != b'<' {
                let next = find_byte(bytes, idx.saturating_add(1), b'<').unwrap_or(bytes.len());
                self.text(&decode_entities(&input[idx..next]))?;
                idx = next;
                continue;
            }

            if starts_with(bytes, idx, b"<!--") {
                let (data, next) = read_comment(input, idx);
                self.comment(data)?;
                idx = next;
                continue;
            }

            if starts_with(bytes, idx, b"<!") {
                idx = skip_to_gt(bytes, idx.saturating_add(2));
                continue;
            }

            if starts_with(bytes, idx, b"<?") {
                idx = skip_processing_instruction(bytes, idx);
                continue;
            }

            let Some((tag, next_idx)) = parse_tag(input, idx) else {
                self.text("<")?;
                idx = idx.saturating_add(1);
                continue;
            };

            if tag.is_end {
                self.end_tag(&tag.name);
                idx = next_idx;
                continue;
            }

            if !tag.self_closing && RAW_TEXT_ELEMENTS.contains(&tag.name.as_str()) {
                let (raw, after_raw) = read_raw_text_until_end_tag(input, next_idx, &tag.name);
                let element = self.insert_element(&tag)?;
                let text = if tag.name == "script" || tag.name == "style" {
                    raw.to_owned()
                } else {
                    decode_entities(raw)
                };
                if !text.is_empty() {
                    self.document.append_text(element, &text)?;
                }
                idx = after_raw;
                continue;
            }

            self.start_tag(&tag)?;
            idx = next_idx;
        }

        Ok(())
    }

    fn current(&self) -> NodeId {
        // stack is never empty
        self.stack[self.stack.len() - 1]
    }

    fn text(&mut self, text: &str) -> Result<(), ParseError> {
        if text.is_empty() {
            return Ok(());
        }
        if !self.body_started {
            if text.chars().all(char::is_whitespace) {
                return Ok(());
            }
            self.body_started = true;
        }
        let parent = self.current();
        self.document.append_text(parent, text)?;
        Ok(())
    }

    fn comment(&mut self, data: &str) -> Result<(), ParseError> {
        let parent = match self.skeleton {
            Some(skeleton) if !self.body_started => skeleton.head,
            _ => self.current(),
        };
        let node = self.document.create_comment(data);
        self.document.append_child(parent, node)?;
        Ok(())
    }

    fn start_tag(&mut self, tag: &ParsedTag) -> Result<(), ParseError> {
        if let Some(skeleton) = self.skeleton {
            match tag.name.as_str() {
                "html" => return self.merge_attributes(skeleton.html, tag),
                "head" => return Ok(()),
                "body" => {
                    self.body_started = true;
                    return self.merge_attributes(skeleton.body, tag);
                }
                _ => {}
            }
        }

        let element = self.insert_element(tag)?;
        if !tag.self_closing && !is_void_element(&tag.name) && !self.routes_to_head(&tag.name) {
            self.stack.push(element);
            // the insertion base at index 0 does not count
            if self.stack.len() - 1 > self.max_depth {
                return Err(ParseError::NestingTooDeep {
                    limit: self.max_depth,
                });
            }
        }
        Ok(())
    }

    /// Creates the element for `tag` and attaches it at the insertion point
    /// without pushing it onto the open-element stack.
    fn insert_element(&mut self, tag: &ParsedTag) -> Result<NodeId, ParseError> {
        let parent = match self.skeleton {
            Some(skeleton) if self.routes_to_head(&tag.name) => skeleton.head,
            _ => {
                self.body_started = true;
                self.close_implied(&tag.name);
                self.current()
            }
        };

        let element = self.document.create_element(&tag.name);
        for (name, value) in &tag.attributes {
            self.document.set_attribute(element, name, value)?;
        }
        self.document.append_child(parent, element)?;
        Ok(element)
    }

    fn routes_to_head(&self, tag_name: &str) -> bool {
        self.skeleton.is_some() && !self.body_started && HEAD_ELEMENTS.contains(&tag_name)
    }

    fn close_implied(&mut self, tag_name: &str) {
        if self.stack.len() < 2 {
            return;
        }
        let current = self.document.tag_name(self.current());
        let closes = match current {
            Some("p") => CLOSES_PARAGRAPH.contains(&tag_name),
            Some("li") => tag_name == "li",
            _ => false,
        };
        if closes {
            self.stack.pop();
        }
    }

    fn end_tag(&mut self, tag_name: &str) {
        if self.skeleton.is_some() && matches!(tag_name, "html" | "head" | "body") {
            return;
        }
        let position = self
            .stack
            .iter()
            .enumerate()
            .skip(1)
            .rev()
            .find(|(_, node)| self.document.tag_name(**node) == Some(tag_name))
            .map(|(index, _)| index);
        if let Some(index) = position {
            self.stack.truncate(index);
        }
    }

    fn merge_attributes(&mut self, target: NodeId, tag: &ParsedTag) -> Result<(), ParseError> {
        for (name, value) in &tag.attributes {
            if self.document.attribute(target, name).is_none() {
                self.document.set_attribute(target, name, value)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::HtmlParser;
    use super::ParseError;
    use super::ParserConfig;
    use rstest::rstest;

    fn body_html(input: &str) -> String {
        let doc = HtmlParser::default()
            .parse_document(input)
            .expect("document parses");
        doc.inner_html(doc.body().expect("body"))
    }

    #[test]
    fn parses_title_and_root() {
        let doc = HtmlParser::default()
            .parse_document("<html><head><title> Pixel Dust </title></head><body>Hi</body></html>")
            .expect("document parses");
        assert_eq!(doc.title(), "Pixel Dust");
        assert!(doc.document_element().is_some());
        assert_eq!(doc.text_content(doc.body().expect("body")), "Hi");
    }

    #[test]
    fn empty_markup_yields_bare_skeleton() {
        let doc = HtmlParser::default()
            .parse_document("")
            .expect("document parses");
        assert_eq!(
            doc.inner_html(doc.root()),
            "<html><head></head><body></body></html>"
        );
    }

    #[test]
    fn places_seed_paragraphs_in_body() {
        let doc = HtmlParser::default()
            .parse_document("<p>par1</p><p>par2</p>")
            .expect("document parses");
        assert_eq!(doc.elements_by_tag_name(doc.root(), "p").len(), 2);
        assert_eq!(doc.inner_html(doc.body().expect("body")), "<p>par1</p><p>par2</p>");
    }

    #[test]
    fn skips_script_and_style_raw_text_from_markup_parsing() {
        let html = body_html(
            "<body>Hello<script>var x = '<p>';</script><style>body{color:red}</style>World</body>",
        );
        assert_eq!(
            html,
            "Hello<script>var x = '<p>';</script><style>body{color:red}</style>World"
        );
    }

    #[test]
    fn parses_case_insensitive_title_with_attributes() {
        let doc = HtmlParser::default()
            .parse_document("<TiTlE data-a='1'>   Hello    domify </tItLe>")
            .expect("document parses");
        assert_eq!(doc.title(), "Hello domify");
    }

    #[test]
    fn merges_body_attributes_into_skeleton() {
        let doc = HtmlParser::default()
            .parse_document("<html lang=en><body class=app><div id=root></div></body></html>")
            .expect("document parses");
        let body = doc.body().expect("body");
        assert_eq!(doc.attribute(body, "class"), Some("app"));
        let html = doc.document_element().expect("html");
        assert_eq!(doc.attribute(html, "lang"), Some("en"));
        assert!(doc.element_by_id("root").is_some());
    }

    #[rstest]
    #[case("<p>one<p>two", "<p>one</p><p>two</p>")]
    #[case("<ul><li>a<li>b</ul>", "<ul><li>a</li><li>b</li></ul>")]
    #[case("<p>text<div>block</div>", "<p>text</p><div>block</div>")]
    #[case("<div>a</span>b</div>", "<div>ab</div>")]
    #[case("<br/><img src=x.png><hr>", "<br><img src=\"x.png\"><hr>")]
    #[case("<div/>after", "<div></div>after")]
    #[case("a < b &amp; c", "a &lt; b &amp; c")]
    #[case("<!doctype html><!-- c --><p>x</p>", "<p>x</p>")]
    #[case("<b><i>x</b>y", "<b><i>x</i></b>y")]
    fn builds_recovered_trees(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(body_html(input), expected);
    }

    #[test]
    fn leading_comments_land_in_head() {
        let doc = HtmlParser::default()
            .parse_document("<!-- banner --><p>x</p><!-- tail -->")
            .expect("document parses");
        assert_eq!(
            doc.inner_html(doc.head().expect("head")),
            "<!-- banner -->"
        );
        assert_eq!(
            doc.inner_html(doc.body().expect("body")),
            "<p>x</p><!-- tail -->"
        );
    }

    #[test]
    fn fragments_attach_to_root_without_skeleton() {
        let fragment = HtmlParser::default()
            .parse_fragment("<li>one</li>two<title>t</title>")
            .expect("fragment parses");
        assert_eq!(
            fragment.inner_html(fragment.root()),
            "<li>one</li>two<title>t</title>"
        );
        assert!(fragment.body().is_none());
    }

    #[test]
    fn rejects_markup_over_size_limit() {
        let parser = HtmlParser::new(ParserConfig {
            max_input_bytes: 8,
            ..ParserConfig::default()
        });
        assert_eq!(
            parser.parse_document("<p>123456</p>"),
            Err(ParseError::InputTooLarge { len: 13, limit: 8 })
        );
    }

    #[test]
    fn rejects_nesting_beyond_depth_limit() {
        let parser = HtmlParser::new(ParserConfig {
            max_depth: 4,
            ..ParserConfig::default()
        });
        let markup = "<div>".repeat(8);
        assert_eq!(
            parser.parse_document(&markup),
            Err(ParseError::NestingTooDeep { limit: 4 })
        );
        assert!(parser.parse_document("<div><div></div></div>").is_ok());
    }

    #[rstest]
    #[case::document(false)]
    #[case::fragment(true)]
    fn depth_limit_counts_nested_elements_exactly(#[case] fragment: bool) {
        let parser = HtmlParser::new(ParserConfig {
            max_depth: 4,
            ..ParserConfig::default()
        });
        let parse = |markup: &str| {
            if fragment {
                parser.parse_fragment(markup)
            } else {
                parser.parse_document(markup)
            }
        };

        let document = parse(&"<div>".repeat(4)).expect("exactly at the limit");
        assert_eq!(document.elements_by_tag_name(document.root(), "div").len(), 4);
        assert_eq!(
            parse(&"<div>".repeat(5)).map(|_| ()),
            Err(ParseError::NestingTooDeep { limit: 4 })
        );
        assert!(parse(&"<div></div>".repeat(50)).is_ok());
    }
}
