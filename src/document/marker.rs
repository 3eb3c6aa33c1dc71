//! Sentinel marker lookup

use crate::error::Result;
use crate::xml::{NamespaceMap, NodePath, XmlElement, XmlPath, W};

/// Where a marker was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerMatch {
    /// Paragraph enclosing the first text node that holds the marker
    pub paragraph: NodePath,
    /// Text nodes holding the marker, including the one used
    pub occurrences: usize,
}

/// Find the paragraph holding `sentinel` below `root`.
///
/// Text nodes (`w:t`) are scanned in document order; the first one whose
/// content contains `sentinel` wins and the nearest enclosing `w:p` is
/// returned. Later occurrences are only counted.
pub fn find_marker(
    root: &XmlElement,
    namespaces: &NamespaceMap,
    sentinel: &str,
) -> Result<Option<MarkerMatch>> {
    let text_nodes = XmlPath::parse(".//w:t", namespaces)?.select(root);

    let hits = text_nodes.iter().filter(|path| {
        root.at(path)
            .map(|t| t.text().contains(sentinel))
            .unwrap_or(false)
    });

    let mut paragraph = None;
    let mut occurrences = 0;
    for hit in hits {
        occurrences += 1;
        if paragraph.is_none() {
            paragraph = enclosing_paragraph(root, hit);
        }
    }

    Ok(paragraph.map(|paragraph| MarkerMatch {
        paragraph,
        occurrences,
    }))
}

fn enclosing_paragraph(root: &XmlElement, path: &NodePath) -> Option<NodePath> {
    let mut current = path.parent();
    while let Some(candidate) = current {
        if root.at(&candidate).is_some_and(|e| e.is(W, "p")) {
            return Some(candidate);
        }
        current = candidate.parent();
    }
    None
}
