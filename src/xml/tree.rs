//! Owned XML tree with namespace-resolved names
//!
//! Nodes keep the names exactly as written (prefix included) so the tree
//! serializes back to equivalent markup, and additionally carry the resolved
//! namespace URI so lookups never depend on which prefix a producer chose.

use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event};
use quick_xml::name::ResolveResult;
use quick_xml::{NsReader, Writer};
use std::io::Write;

use crate::error::{Error, Result};
use crate::xml::QualifiedName;

/// A node in the tree
#[derive(Clone, Debug, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction(String),
}

/// An attribute with its resolved namespace
#[derive(Clone, Debug, PartialEq)]
pub struct XmlAttribute {
    /// Name as written, e.g. `w:val` or `xmlns:r`
    pub name: String,
    /// Namespace URI of a prefixed attribute
    pub namespace: Option<String>,
    /// Unescaped value
    pub value: String,
}

impl XmlAttribute {
    /// Name without prefix
    pub fn local_name(&self) -> &str {
        local_part(&self.name)
    }
}

/// An element with attributes and children
#[derive(Clone, Debug, PartialEq)]
pub struct XmlElement {
    /// Name as written, e.g. `w:sectPr`
    pub name: String,
    /// Resolved namespace URI
    pub namespace: Option<String>,
    pub attributes: Vec<XmlAttribute>,
    pub children: Vec<XmlNode>,
    /// Written as `<x/>` when it has no children
    pub self_closing: bool,
}

/// Position of an element relative to some root, as child indices
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct NodePath(Vec<usize>);

impl NodePath {
    /// Path of the root itself
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Path of the `index`-th child node of this path
    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }

    /// Path of the enclosing element, `None` for the root
    pub fn parent(&self) -> Option<Self> {
        let (_, head) = self.0.split_last()?;
        Some(Self(head.to_vec()))
    }

    /// Index within the parent's children
    pub fn index(&self) -> Option<usize> {
        self.0.last().copied()
    }

    /// Number of steps from the root
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }
}

impl XmlElement {
    /// Create an empty element
    pub fn new(name: &QualifiedName) -> Self {
        Self {
            name: name.qualified(),
            namespace: name.namespace.clone(),
            attributes: Vec::new(),
            children: Vec::new(),
            self_closing: true,
        }
    }

    /// Name without prefix
    pub fn local_name(&self) -> &str {
        local_part(&self.name)
    }

    /// Whether this element is `local` in namespace `namespace`
    pub fn is(&self, namespace: &str, local: &str) -> bool {
        self.namespace.as_deref() == Some(namespace) && self.local_name() == local
    }

    /// Whether this element matches a resolved name
    pub fn matches(&self, name: &QualifiedName) -> bool {
        self.namespace == name.namespace && self.local_name() == name.local
    }

    /// Namespace-qualified attribute lookup
    pub fn attribute(&self, namespace: Option<&str>, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.namespace.as_deref() == namespace && a.local_name() == local)
            .map(|a| a.value.as_str())
    }

    /// Set an attribute, replacing a same-named one in place
    pub fn set_attribute(&mut self, name: &QualifiedName, value: impl Into<String>) {
        let value = value.into();
        let existing = self.attributes.iter_mut().find(|a| {
            a.namespace == name.namespace && a.local_name() == name.local
        });
        match existing {
            Some(attr) => attr.value = value,
            None => self.attributes.push(XmlAttribute {
                name: name.qualified(),
                namespace: name.namespace.clone(),
                value,
            }),
        }
    }

    /// Add an `xmlns:<prefix>` declaration unless the prefix is already declared
    pub fn declare_namespace(&mut self, prefix: &str, uri: &str) -> bool {
        let name = format!("xmlns:{}", prefix);
        if self.attributes.iter().any(|a| a.name == name) {
            return false;
        }
        self.attributes.push(XmlAttribute {
            name,
            namespace: None,
            value: uri.to_string(),
        });
        true
    }

    /// Builder form of [`set_attribute`](Self::set_attribute)
    pub fn with_attr(mut self, name: &QualifiedName, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Add a child element
    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.append_child(XmlNode::Element(child));
        self
    }

    /// Add a text child
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.append_child(XmlNode::Text(text.into()));
        self
    }

    pub fn append_child(&mut self, node: XmlNode) {
        self.children.push(node);
    }

    /// Insert a node before the child at `index` (appends when past the end)
    pub fn insert_before(&mut self, index: usize, node: XmlNode) {
        let index = index.min(self.children.len());
        self.children.insert(index, node);
    }

    /// Remove and return the child node at `index`
    pub fn remove_child(&mut self, index: usize) -> Option<XmlNode> {
        (index < self.children.len()).then(|| self.children.remove(index))
    }

    /// Remove every child element named `local` in `namespace`; returns how many
    pub fn remove_children(&mut self, namespace: &str, local: &str) -> usize {
        let before = self.children.len();
        self.children
            .retain(|node| !matches!(node, XmlNode::Element(e) if e.is(namespace, local)));
        before - self.children.len()
    }

    /// Child elements in order
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(e) => Some(e),
            _ => None,
        })
    }

    /// Child elements with their indices in `children`
    pub fn indexed_elements(&self) -> impl Iterator<Item = (usize, &XmlElement)> {
        self.children
            .iter()
            .enumerate()
            .filter_map(|(i, node)| match node {
                XmlNode::Element(e) => Some((i, e)),
                _ => None,
            })
    }

    /// First child element named `local` in `namespace`
    pub fn child(&self, namespace: &str, local: &str) -> Option<&XmlElement> {
        self.elements().find(|e| e.is(namespace, local))
    }

    /// Mutable variant of [`child`](Self::child)
    pub fn child_mut(&mut self, namespace: &str, local: &str) -> Option<&mut XmlElement> {
        self.children.iter_mut().find_map(|node| match node {
            XmlNode::Element(e) if e.is(namespace, local) => Some(e),
            _ => None,
        })
    }

    /// Concatenated text of all descendant text nodes
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for node in &self.children {
            match node {
                XmlNode::Text(t) | XmlNode::CData(t) => out.push_str(t),
                XmlNode::Element(e) => e.collect_text(out),
                _ => {}
            }
        }
    }

    /// Element at `path` below this one
    pub fn at(&self, path: &NodePath) -> Option<&XmlElement> {
        let mut current = self;
        for &index in path.indices() {
            current = match current.children.get(index)? {
                XmlNode::Element(e) => e,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Mutable element at `path` below this one
    pub fn at_mut(&mut self, path: &NodePath) -> Option<&mut XmlElement> {
        let mut current = self;
        for &index in path.indices() {
            current = match current.children.get_mut(index)? {
                XmlNode::Element(e) => e,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Write element to XML writer
    pub fn write_to<W: Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        let mut start = BytesStart::new(self.name.as_str());
        for attr in &self.attributes {
            start.push_attribute((attr.name.as_str(), attr.value.as_str()));
        }

        if self.children.is_empty() && self.self_closing {
            writer.write_event(Event::Empty(start))?;
        } else {
            writer.write_event(Event::Start(start))?;
            for child in &self.children {
                child.write_to(writer)?;
            }
            writer.write_event(Event::End(BytesEnd::new(self.name.as_str())))?;
        }

        Ok(())
    }

    fn from_start<R>(
        reader: &NsReader<R>,
        namespace: Option<String>,
        start: &BytesStart,
        self_closing: bool,
    ) -> Result<Self> {
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr?;
            let name = String::from_utf8_lossy(attr.key.as_ref()).to_string();
            let namespace = if name.contains(':') && !name.starts_with("xmlns:") {
                let (resolved, _) = reader.resolve_attribute(attr.key);
                bound_uri(resolved)
            } else {
                None
            };
            attributes.push(XmlAttribute {
                name,
                namespace,
                value: attr.unescape_value()?.into_owned(),
            });
        }

        Ok(Self {
            name: String::from_utf8_lossy(start.name().as_ref()).to_string(),
            namespace,
            attributes,
            children: Vec::new(),
            self_closing,
        })
    }
}

impl XmlNode {
    /// Write node to XML writer
    pub fn write_to<W: Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        match self {
            XmlNode::Element(e) => return e.write_to(writer),
            XmlNode::Text(t) => writer.write_event(Event::Text(BytesText::new(t)))?,
            XmlNode::CData(t) => writer.write_event(Event::CData(BytesCData::new(t.as_str())))?,
            XmlNode::Comment(c) => {
                writer.write_event(Event::Comment(BytesText::from_escaped(c.as_str())))?
            }
            XmlNode::ProcessingInstruction(p) => {
                writer.write_event(Event::PI(BytesPI::new(p.as_str())))?
            }
        }
        Ok(())
    }
}

/// A parsed XML part: prolog nodes and one root element
#[derive(Clone, Debug, PartialEq)]
pub struct XmlDocument {
    /// Comments and processing instructions before the root
    pub prolog: Vec<XmlNode>,
    pub root: XmlElement,
}

impl XmlDocument {
    /// Parse a part's bytes (UTF-8)
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        Self::parse_str(std::str::from_utf8(bytes)?)
    }

    /// Parse from a string
    pub fn parse_str(xml: &str) -> Result<Self> {
        let mut reader = NsReader::from_str(xml);

        let mut prolog = Vec::new();
        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            let (resolved, event) = reader.read_resolved_event()?;
            let namespace = bound_uri(resolved);

            match event {
                Event::Start(e) => {
                    stack.push(XmlElement::from_start(&reader, namespace, &e, false)?);
                }
                Event::Empty(e) => {
                    let element = XmlElement::from_start(&reader, namespace, &e, true)?;
                    attach(&mut stack, &mut root, &mut prolog, XmlNode::Element(element))?;
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| Error::InvalidDocument("unbalanced end tag".into()))?;
                    attach(&mut stack, &mut root, &mut prolog, XmlNode::Element(element))?;
                }
                Event::Text(t) => {
                    let text = t.unescape()?;
                    if let Some(parent) = stack.last_mut() {
                        if !text.is_empty() {
                            parent.append_child(XmlNode::Text(text.into_owned()));
                        }
                    }
                }
                Event::CData(c) => {
                    if let Some(parent) = stack.last_mut() {
                        let text = String::from_utf8_lossy(&c).to_string();
                        parent.append_child(XmlNode::CData(text));
                    }
                }
                Event::Comment(c) => {
                    let text = String::from_utf8_lossy(&c).to_string();
                    attach(&mut stack, &mut root, &mut prolog, XmlNode::Comment(text))?;
                }
                Event::PI(p) => {
                    let text = String::from_utf8_lossy(&p).to_string();
                    attach(
                        &mut stack,
                        &mut root,
                        &mut prolog,
                        XmlNode::ProcessingInstruction(text),
                    )?;
                }
                Event::Eof => break,
                // The declaration is regenerated on write
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(Error::InvalidDocument("unexpected end of input".into()));
        }

        let root = root.ok_or_else(|| Error::InvalidDocument("no root element".into()))?;
        Ok(Self { prolog, root })
    }

    /// Serialize with a standalone UTF-8 declaration
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new(Vec::new());
        writer.write_event(Event::Decl(BytesDecl::new(
            "1.0",
            Some("UTF-8"),
            Some("yes"),
        )))?;
        for node in &self.prolog {
            node.write_to(&mut writer)?;
        }
        self.root.write_to(&mut writer)?;
        Ok(writer.into_inner())
    }
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    prolog: &mut Vec<XmlNode>,
    node: XmlNode,
) -> Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.append_child(node);
        return Ok(());
    }

    match node {
        XmlNode::Element(element) => {
            if root.is_some() {
                return Err(Error::InvalidDocument("multiple root elements".into()));
            }
            *root = Some(element);
        }
        // Trailing comments after the root are dropped
        other if root.is_none() => prolog.push(other),
        _ => {}
    }
    Ok(())
}

fn bound_uri(resolved: ResolveResult) -> Option<String> {
    match resolved {
        ResolveResult::Bound(ns) => Some(String::from_utf8_lossy(ns.as_ref()).to_string()),
        _ => None,
    }
}

fn local_part(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::{NamespaceMap, W};
    use pretty_assertions::assert_eq;

    const DOC: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body><w:p><w:r><w:t xml:space="preserve">A &amp; B </w:t></w:r></w:p><w:sectPr><w:pgSz w:w="12240" w:h="15840"/></w:sectPr></w:body></w:document>"#;

    #[test]
    fn test_parse_resolves_namespaces() {
        let doc = XmlDocument::parse_str(DOC).unwrap();
        assert!(doc.root.is(W, "document"));

        let body = doc.root.child(W, "body").unwrap();
        let sect = body.child(W, "sectPr").unwrap();
        let pg_sz = sect.child(W, "pgSz").unwrap();
        assert_eq!(pg_sz.attribute(Some(W), "w"), Some("12240"));
        assert_eq!(pg_sz.attribute(None, "w"), None);
    }

    #[test]
    fn test_text_is_unescaped_and_whitespace_kept() {
        let doc = XmlDocument::parse_str(DOC).unwrap();
        assert_eq!(doc.root.text(), "A & B ");
    }

    #[test]
    fn test_serialize_roundtrip() {
        let doc = XmlDocument::parse_str(DOC).unwrap();
        let bytes = doc.to_bytes().unwrap();
        let reparsed = XmlDocument::parse(&bytes).unwrap();
        assert_eq!(doc, reparsed);

        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("A &amp; B "));
        assert!(text.contains(r#"<w:pgSz w:w="12240" w:h="15840"/>"#));
    }

    #[test]
    fn test_prefix_independent_lookup() {
        let xml = r#"<doc:document xmlns:doc="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><doc:body/></doc:document>"#;
        let doc = XmlDocument::parse_str(xml).unwrap();
        assert!(doc.root.child(W, "body").is_some());
    }

    #[test]
    fn test_malformed_input() {
        assert!(XmlDocument::parse_str("<w:document><w:body></w:document>").is_err());
        assert!(XmlDocument::parse_str("<a/><b/>").is_err());
        assert!(XmlDocument::parse_str("").is_err());
    }

    #[test]
    fn test_mutations() {
        let ns = NamespaceMap::wordprocessing();
        let mut sect = XmlElement::new(&ns.name(W, "sectPr").unwrap());
        let pg_mar = XmlElement::new(&ns.name(W, "pgMar").unwrap());
        let pg_sz = XmlElement::new(&ns.name(W, "pgSz").unwrap());

        sect.append_child(XmlNode::Element(pg_mar));
        sect.insert_before(0, XmlNode::Element(pg_sz));
        let names: Vec<_> = sect.elements().map(|e| e.local_name()).collect();
        assert_eq!(names, ["pgSz", "pgMar"]);

        let val = ns.name(W, "val").unwrap();
        let mut copy = sect.clone();
        copy.child_mut(W, "pgSz").unwrap().set_attribute(&val, "1");
        copy.child_mut(W, "pgSz").unwrap().set_attribute(&val, "2");
        assert_eq!(copy.child(W, "pgSz").unwrap().attributes.len(), 1);
        assert_eq!(copy.child(W, "pgSz").unwrap().attribute(Some(W), "val"), Some("2"));
        assert_eq!(sect.child(W, "pgSz").unwrap().attribute(Some(W), "val"), None);

        assert_eq!(copy.remove_children(W, "pgMar"), 1);
        assert!(copy.remove_child(5).is_none());
        assert!(matches!(copy.remove_child(0), Some(XmlNode::Element(_))));
        assert!(copy.children.is_empty());
    }

    #[test]
    fn test_node_paths() {
        let doc = XmlDocument::parse_str(DOC).unwrap();
        let path = NodePath::root().child(0).child(0);
        let para = doc.root.at(&path).unwrap();
        assert!(para.is(W, "p"));
        assert_eq!(path.parent().unwrap().depth(), 1);
        assert_eq!(path.index(), Some(0));
        assert!(doc.root.at(&NodePath::root().child(7)).is_none());
    }
}
