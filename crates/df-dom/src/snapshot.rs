//! Owned, serializable copies of document subtrees.

use serde::Deserialize;
use serde::Serialize;

use crate::Document;
use crate::NodeId;
use crate::NodeKind;

/// One node of a detached subtree, used to move parsed trees across the
/// script boundary as JSON.
///
/// A subtree travels as a flat list in preorder. `parent` is the index of
/// the entry's parent within that list, or `None` for top-level nodes, so a
/// parent always precedes its children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NodeSnapshot {
    Element {
        parent: Option<usize>,
        tag: String,
        attributes: Vec<(String, String)>,
    },
    Text {
        parent: Option<usize>,
        data: String,
    },
    Comment {
        parent: Option<usize>,
        data: String,
    },
}

impl NodeSnapshot {
    pub fn parent(&self) -> Option<usize> {
        match self {
            Self::Element { parent, .. }
            | Self::Text { parent, .. }
            | Self::Comment { parent, .. } => *parent,
        }
    }
}

impl Document {
    /// Flat preorder snapshot of the descendants of `node`. Children of
    /// `node` itself carry no parent.
    pub fn snapshot_children(&self, node: NodeId) -> Vec<NodeSnapshot> {
        let mut out = Vec::new();
        let mut stack: Vec<(NodeId, Option<usize>)> = self
            .children(node)
            .iter()
            .rev()
            .map(|child| (*child, None))
            .collect();

        while let Some((current, parent)) = stack.pop() {
            let entry = match self.kind(current) {
                Some(NodeKind::Element(element)) => NodeSnapshot::Element {
                    parent,
                    tag: element.tag_name.clone(),
                    attributes: element.attributes.clone(),
                },
                Some(NodeKind::Text(data)) => NodeSnapshot::Text {
                    parent,
                    data: data.clone(),
                },
                Some(NodeKind::Comment(data)) => NodeSnapshot::Comment {
                    parent,
                    data: data.clone(),
                },
                Some(NodeKind::Document) | None => continue,
            };
            let index = out.len();
            out.push(entry);
            stack.extend(
                self.children(current)
                    .iter()
                    .rev()
                    .map(|child| (*child, Some(index))),
            );
        }
        out
    }
}
