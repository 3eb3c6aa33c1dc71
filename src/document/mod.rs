//! The main document part (`word/document.xml`) as an editable tree

mod marker;

pub use marker::{find_marker, MarkerMatch};

use crate::error::{Error, Result};
use crate::opc::{Package, PartUri};
use crate::xml::{NamespaceMap, NodePath, XmlDocument, XmlElement, XmlNode, XmlPath, R, W};
use log::debug;

/// Parsed main document part
#[derive(Debug, Clone)]
pub struct DocumentPart {
    uri: PartUri,
    xml: XmlDocument,
    namespaces: NamespaceMap,
}

impl DocumentPart {
    /// Load the main document part of a package
    pub fn from_package(package: &Package) -> Result<Self> {
        let uri = package
            .main_document_uri()
            .ok_or_else(|| Error::MissingPart("main document relationship".into()))?;
        let part = package
            .part(&uri)
            .ok_or_else(|| Error::MissingPart(uri.to_string()))?;

        Self::parse(uri, part.data())
    }

    /// Parse document bytes that belong to `uri`
    pub fn parse(uri: PartUri, bytes: &[u8]) -> Result<Self> {
        let xml = XmlDocument::parse(bytes).map_err(|e| Error::malformed(uri.as_str(), e))?;
        if !xml.root.is(W, "document") {
            return Err(Error::malformed(
                uri.as_str(),
                format!("unexpected root element <{}>", xml.root.name),
            ));
        }
        let namespaces = NamespaceMap::from_root(&xml.root);

        Ok(Self {
            uri,
            xml,
            namespaces,
        })
    }

    pub fn uri(&self) -> &PartUri {
        &self.uri
    }

    pub fn namespaces(&self) -> &NamespaceMap {
        &self.namespaces
    }

    /// The `w:document` element
    pub fn root(&self) -> &XmlElement {
        &self.xml.root
    }

    /// The `w:body` element
    pub fn body(&self) -> Result<&XmlElement> {
        self.xml
            .root
            .child(W, "body")
            .ok_or_else(|| Error::malformed(self.uri.as_str(), "missing w:body"))
    }

    fn body_mut(&mut self) -> Result<&mut XmlElement> {
        let uri = self.uri.as_str();
        self.xml
            .root
            .child_mut(W, "body")
            .ok_or_else(|| Error::malformed(uri, "missing w:body"))
    }

    /// First `w:sectPr` in document order, used as the seed for new sections
    pub fn base_section_template(&self) -> Result<Option<&XmlElement>> {
        let path = XmlPath::parse(".//w:sectPr", &self.namespaces)?;
        Ok(path
            .select_first(&self.xml.root)
            .and_then(|p| self.xml.root.at(&p)))
    }

    /// Paragraph holding `sentinel`, see [`find_marker`]
    pub fn find_marker(&self, sentinel: &str) -> Result<Option<MarkerMatch>> {
        find_marker(&self.xml.root, &self.namespaces, sentinel)
    }

    /// Replace the element at `path` (relative to the root) with `element`
    pub fn replace_element(&mut self, path: &NodePath, element: XmlElement) -> Result<()> {
        let (parent, index) = self.split_path(path)?;
        let parent = self
            .xml
            .root
            .at_mut(&parent)
            .ok_or_else(|| Error::InvalidDocument(format!("no element at {:?}", path)))?;
        match parent.children.get_mut(index) {
            Some(slot @ XmlNode::Element(_)) => {
                *slot = XmlNode::Element(element);
                Ok(())
            }
            _ => Err(Error::InvalidDocument(format!("no element at {:?}", path))),
        }
    }

    /// Remove the element at `path`
    pub fn remove_element(&mut self, path: &NodePath) -> Result<XmlNode> {
        let (parent, index) = self.split_path(path)?;
        self.xml
            .root
            .at_mut(&parent)
            .and_then(|p| p.remove_child(index))
            .ok_or_else(|| Error::InvalidDocument(format!("no element at {:?}", path)))
    }

    /// Put `sect` as the body's own trailing `w:sectPr`, replacing the
    /// existing one or appending it as the last child of `w:body`
    pub fn set_body_section(&mut self, sect: XmlElement) -> Result<()> {
        let body = self.body_mut()?;
        let trailing = body
            .indexed_elements()
            .last()
            .filter(|(_, e)| e.is(W, "sectPr"))
            .map(|(i, _)| i);

        match trailing {
            Some(index) => {
                body.children[index] = XmlNode::Element(sect);
            }
            None => {
                debug!("document body had no trailing w:sectPr, appending one");
                body.append_child(XmlNode::Element(sect));
            }
        }
        Ok(())
    }

    /// Declare the relationship namespace on the root if it is not declared
    pub fn ensure_relationship_namespace(&mut self) {
        let prefix = self.namespaces.prefix_for(R).unwrap_or("r").to_string();
        if self.xml.root.declare_namespace(&prefix, R) {
            debug!("declared xmlns:{} on {}", prefix, self.uri);
        }
        self.namespaces.register(&prefix, R);
    }

    /// Serialize the document part
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.xml.to_bytes()
    }

    /// Stage the serialized document back into `package`
    pub fn write_into(&self, package: &mut Package) -> Result<()> {
        package.write_part(&self.uri, self.to_bytes()?);
        Ok(())
    }

    fn split_path(&self, path: &NodePath) -> Result<(NodePath, usize)> {
        match (path.parent(), path.index()) {
            (Some(parent), Some(index)) => Ok((parent, index)),
            _ => Err(Error::InvalidDocument("cannot replace the document root".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DOC: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body><w:p><w:r><w:t>[[SECTION_BREAK:a]]</w:t></w:r></w:p><w:p><w:r><w:t>after</w:t></w:r></w:p></w:body></w:document>"#;

    fn part() -> DocumentPart {
        DocumentPart::parse(PartUri::new("/word/document.xml").unwrap(), DOC.as_bytes()).unwrap()
    }

    fn element(ns: &NamespaceMap, local: &str) -> XmlElement {
        XmlElement::new(&ns.name(W, local).unwrap())
    }

    #[test]
    fn test_rejects_non_document_root() {
        let result = DocumentPart::parse(
            PartUri::new("/word/document.xml").unwrap(),
            br#"<w:ftr xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"/>"#,
        );
        assert!(matches!(result, Err(Error::MalformedPart { .. })));
    }

    #[test]
    fn test_rejects_broken_xml() {
        let result = DocumentPart::parse(
            PartUri::new("/word/document.xml").unwrap(),
            b"<w:document><w:body>",
        );
        match result {
            Err(Error::MalformedPart { part, .. }) => assert_eq!(part, "/word/document.xml"),
            other => panic!("expected MalformedPart, got {:?}", other),
        }
    }

    #[test]
    fn test_no_template_in_plain_document() {
        let doc = part();
        assert!(doc.base_section_template().unwrap().is_none());
    }

    #[test]
    fn test_set_body_section_appends_then_replaces() {
        let mut doc = part();
        let ns = doc.namespaces().clone();

        doc.set_body_section(element(&ns, "sectPr")).unwrap();
        let mut second = element(&ns, "sectPr");
        second.append_child(XmlNode::Element(element(&ns, "pgSz")));
        doc.set_body_section(second).unwrap();

        let body = doc.body().unwrap();
        let names: Vec<_> = body.elements().map(|e| e.local_name()).collect();
        assert_eq!(names, ["p", "p", "sectPr"]);
        assert!(body.child(W, "sectPr").unwrap().child(W, "pgSz").is_some());
        assert!(doc.base_section_template().unwrap().is_some());
    }

    #[test]
    fn test_replace_and_remove() {
        let mut doc = part();
        let ns = doc.namespaces().clone();
        let found = doc.find_marker("[[SECTION_BREAK:a]]").unwrap().unwrap();

        doc.replace_element(&found.paragraph, element(&ns, "p")).unwrap();
        assert_eq!(doc.body().unwrap().text(), "after");

        doc.remove_element(&found.paragraph).unwrap();
        assert_eq!(doc.body().unwrap().elements().count(), 1);
        assert!(doc.replace_element(&NodePath::root(), element(&ns, "p")).is_err());
    }

    #[test]
    fn test_relationship_namespace_declared_once() {
        let mut doc = part();
        doc.ensure_relationship_namespace();
        doc.ensure_relationship_namespace();

        let declarations = doc
            .root()
            .attributes
            .iter()
            .filter(|a| a.name == "xmlns:r")
            .count();
        assert_eq!(declarations, 1);

        let text = String::from_utf8(doc.to_bytes().unwrap()).unwrap();
        assert!(text.contains(r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships""#));
    }
}
