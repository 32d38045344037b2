//! DOM tree data structures.

mod serialize;
mod snapshot;

pub use serialize::escape_attribute;
pub use serialize::escape_text;
pub use serialize::is_raw_text_element;
pub use serialize::is_void_element;
pub use snapshot::NodeSnapshot;

/// ID used to address nodes in the DOM arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Element payload: lowercase tag name plus attributes in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    pub tag_name: String,
    pub attributes: Vec<(String, String)>,
}

impl ElementData {
    pub fn new(tag_name: &str) -> Self {
        Self {
            tag_name: tag_name.to_ascii_lowercase(),
            attributes: Vec::new(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attribute("class")
            .is_some_and(|classes| classes.split_ascii_whitespace().any(|item| item == class))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Element(ElementData),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

/// Tree mutation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    #[error("node {0:?} does not belong to this document")]
    UnknownNode(NodeId),
    #[error("hierarchy request rejected: {0}")]
    HierarchyRequest(&'static str),
    #[error("node {child:?} is not a child of {parent:?}")]
    NotAChild { parent: NodeId, child: NodeId },
    #[error("node {0:?} is not an element")]
    NotAnElement(NodeId),
}

/// Arena-backed document. Node 0 is always the document node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                kind: NodeKind::Document,
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Total nodes allocated, attached or not.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn kind(&self, node: NodeId) -> Option<&NodeKind> {
        self.nodes.get(node.0).map(|entry| &entry.kind)
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.0).and_then(|entry| entry.parent)
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes
            .get(node.0)
            .map(|entry| entry.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn element(&self, node: NodeId) -> Option<&ElementData> {
        match self.kind(node) {
            Some(NodeKind::Element(element)) => Some(element),
            _ => None,
        }
    }

    pub fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(|element| element.tag_name.as_str())
    }

    pub fn create_element(&mut self, tag_name: &str) -> NodeId {
        self.push_node(NodeKind::Element(ElementData::new(tag_name)))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push_node(NodeKind::Text(text.into()))
    }

    pub fn create_comment(&mut self, data: impl Into<String>) -> NodeId {
        self.push_node(NodeKind::Comment(data.into()))
    }

    /// Appends `child` to `parent`, detaching it from any previous parent.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.ensure_known(parent)?;
        self.ensure_known(child)?;
        match self.kind(parent) {
            Some(NodeKind::Document | NodeKind::Element(_)) => {}
            _ => return Err(DomError::HierarchyRequest("parent cannot hold children")),
        }
        if matches!(self.kind(child), Some(NodeKind::Document)) {
            return Err(DomError::HierarchyRequest("a document cannot be a child"));
        }
        if self.is_inclusive_ancestor(child, parent) {
            return Err(DomError::HierarchyRequest("child contains the parent"));
        }

        self.detach(child);
        self.nodes[parent.0].children.push(child);
        self.nodes[child.0].parent = Some(parent);
        Ok(())
    }

    /// Appends text to `parent`, merging into a trailing text node.
    pub fn append_text(&mut self, parent: NodeId, text: &str) -> Result<NodeId, DomError> {
        self.ensure_known(parent)?;
        if let Some(&last) = self.nodes[parent.0].children.last() {
            if let NodeKind::Text(existing) = &mut self.nodes[last.0].kind {
                existing.push_str(text);
                return Ok(last);
            }
        }
        let node = self.create_text(text);
        self.append_child(parent, node)?;
        Ok(node)
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.ensure_known(parent)?;
        self.ensure_known(child)?;
        if self.parent(child) != Some(parent) {
            return Err(DomError::NotAChild { parent, child });
        }
        self.detach(child);
        Ok(())
    }

    /// Sets or replaces an attribute; names are stored lowercase.
    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        self.ensure_known(node)?;
        let NodeKind::Element(element) = &mut self.nodes[node.0].kind else {
            return Err(DomError::NotAnElement(node));
        };
        let name = name.to_ascii_lowercase();
        match element
            .attributes
            .iter_mut()
            .find(|(candidate, _)| *candidate == name)
        {
            Some((_, existing)) => value.clone_into(existing),
            None => element.attributes.push((name, value.to_owned())),
        }
        Ok(())
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node).and_then(|element| element.attribute(name))
    }

    pub fn document_element(&self) -> Option<NodeId> {
        self.children(self.root())
            .iter()
            .copied()
            .find(|child| self.element(*child).is_some())
    }

    pub fn head(&self) -> Option<NodeId> {
        self.document_element()
            .and_then(|html| self.child_element_by_tag(html, "head"))
    }

    pub fn body(&self) -> Option<NodeId> {
        self.document_element()
            .and_then(|html| self.child_element_by_tag(html, "body"))
    }

    /// Whitespace-collapsed text of the first `title` in `head`.
    pub fn title(&self) -> String {
        let Some(head) = self.head() else {
            return String::new();
        };
        self.elements_by_tag_name(head, "title")
            .first()
            .map(|title| {
                self.text_content(*title)
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default()
    }

    /// Descendants of `scope` in tree order, excluding `scope` itself.
    pub fn descendants(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(scope).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    /// Elements below `scope` whose tag matches; `*` matches every element.
    pub fn elements_by_tag_name(&self, scope: NodeId, tag_name: &str) -> Vec<NodeId> {
        let wanted = tag_name.to_ascii_lowercase();
        self.descendants(scope)
            .into_iter()
            .filter(|node| {
                self.tag_name(*node)
                    .is_some_and(|tag| wanted == "*" || tag == wanted)
            })
            .collect()
    }

    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .find(|node| self.attribute(*node, "id") == Some(id))
    }

    pub fn text_content(&self, node: NodeId) -> String {
        match self.kind(node) {
            Some(NodeKind::Text(text)) | Some(NodeKind::Comment(text)) => text.clone(),
            Some(NodeKind::Document | NodeKind::Element(_)) => self
                .descendants(node)
                .into_iter()
                .filter_map(|child| match self.kind(child) {
                    Some(NodeKind::Text(text)) => Some(text.as_str()),
                    _ => None,
                })
                .collect(),
            None => String::new(),
        }
    }

    fn child_element_by_tag(&self, parent: NodeId, tag_name: &str) -> Option<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|child| self.tag_name(*child) == Some(tag_name))
    }

    fn push_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            kind,
        });
        id
    }

    fn ensure_known(&self, node: NodeId) -> Result<(), DomError> {
        if node.0 < self.nodes.len() {
            Ok(())
        } else {
            Err(DomError::UnknownNode(node))
        }
    }

    fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.0].parent.take() {
            self.nodes[parent.0].children.retain(|child| *child != node);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::DomError;
    use super::Document;
    use super::NodeKind;

    fn skeleton() -> (Document, super::NodeId) {
        let mut doc = Document::new();
        let html = doc.create_element("HTML");
        let head = doc.create_element("head");
        let body = doc.create_element("body");
        doc.append_child(doc.root(), html).expect("html attaches");
        doc.append_child(html, head).expect("head attaches");
        doc.append_child(html, body).expect("body attaches");
        (doc, body)
    }

    #[test]
    fn empty_document_has_no_document_element() {
        let doc = Document::new();
        assert!(doc.document_element().is_none());
        assert!(doc.body().is_none());
        assert_eq!(doc.node_count(), 1);
    }

    #[test]
    fn locates_skeleton_sections() {
        let (doc, body) = skeleton();
        assert_eq!(doc.body(), Some(body));
        assert_eq!(doc.tag_name(doc.document_element().expect("html")), Some("html"));
        assert!(doc.head().is_some());
    }

    #[test]
    fn moving_a_node_detaches_it_from_previous_parent() {
        let (mut doc, body) = skeleton();
        let first = doc.create_element("div");
        let second = doc.create_element("div");
        let paragraph = doc.create_element("p");
        doc.append_child(body, first).expect("attach");
        doc.append_child(body, second).expect("attach");
        doc.append_child(first, paragraph).expect("attach");
        doc.append_child(second, paragraph).expect("move");

        assert!(doc.children(first).is_empty());
        assert_eq!(doc.children(second), &[paragraph]);
        assert_eq!(doc.parent(paragraph), Some(second));
    }

    #[test]
    fn rejects_cycles_and_text_parents() {
        let (mut doc, body) = skeleton();
        let outer = doc.create_element("div");
        let inner = doc.create_element("span");
        doc.append_child(body, outer).expect("attach");
        doc.append_child(outer, inner).expect("attach");
        assert!(matches!(
            doc.append_child(inner, outer),
            Err(DomError::HierarchyRequest(_))
        ));

        let text = doc.create_text("leaf");
        let orphan = doc.create_element("b");
        assert!(matches!(
            doc.append_child(text, orphan),
            Err(DomError::HierarchyRequest(_))
        ));
    }

    #[test]
    fn append_text_merges_adjacent_runs() {
        let (mut doc, body) = skeleton();
        let first = doc.append_text(body, "par").expect("text");
        let second = doc.append_text(body, "1").expect("text");
        assert_eq!(first, second);
        assert_eq!(doc.kind(first), Some(&NodeKind::Text("par1".to_owned())));
    }

    #[test]
    fn remove_child_requires_direct_parent() {
        let (mut doc, body) = skeleton();
        let paragraph = doc.create_element("p");
        let head = doc.head().expect("head");
        doc.append_child(body, paragraph).expect("attach");
        assert!(matches!(
            doc.remove_child(head, paragraph),
            Err(DomError::NotAChild { .. })
        ));
        doc.remove_child(body, paragraph).expect("remove");
        assert!(doc.children(body).is_empty());
        assert_eq!(doc.parent(paragraph), None);
    }

    #[test]
    fn queries_by_tag_and_id_in_tree_order() {
        let (mut doc, body) = skeleton();
        for label in ["par1", "par2"] {
            let paragraph = doc.create_element("P");
            doc.set_attribute(paragraph, "ID", label).expect("attribute");
            doc.append_text(paragraph, label).expect("text");
            doc.append_child(body, paragraph).expect("attach");
        }

        let paragraphs = doc.elements_by_tag_name(doc.root(), "p");
        assert_eq!(paragraphs.len(), 2);
        assert_eq!(doc.element_by_id("par2"), Some(paragraphs[1]));
        assert_eq!(doc.text_content(body), "par1par2");
        assert_eq!(doc.elements_by_tag_name(body, "*").len(), 2);
    }

    #[test]
    fn set_attribute_replaces_existing_value() {
        let (mut doc, body) = skeleton();
        doc.set_attribute(body, "class", "a").expect("attribute");
        doc.set_attribute(body, "CLASS", "a b").expect("attribute");
        let element = doc.element(body).expect("element");
        assert_eq!(element.attributes.len(), 1);
        assert!(element.has_class("b"));

        let text = doc.create_text("x");
        assert_eq!(
            doc.set_attribute(text, "id", "nope"),
            Err(DomError::NotAnElement(text))
        );
    }

    #[test]
    fn reads_collapsed_title_from_head() {
        let (mut doc, _) = skeleton();
        let head = doc.head().expect("head");
        let title = doc.create_element("title");
        doc.append_text(title, "  Hello \n  domify ").expect("text");
        doc.append_child(head, title).expect("attach");
        assert_eq!(doc.title(), "Hello domify");
    }
}
