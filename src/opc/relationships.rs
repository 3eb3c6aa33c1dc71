//! Relationships handling for OPC packages
//!
//! Parses and generates `.rels` files

use crate::error::{Error, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::io::{BufRead, Write};

/// Ordered collection of relationships
///
/// Entries keep the order they were read in, new entries are appended.
/// Ids are unique within one collection.
#[derive(Clone, Debug, Default)]
pub struct Relationships {
    items: Vec<Relationship>,
}

/// A single relationship
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Relationship {
    /// Relationship ID (e.g., "rId1")
    pub id: String,
    /// Relationship type URI
    pub rel_type: String,
    /// Target path (relative or absolute)
    pub target: String,
    /// Target mode
    pub target_mode: TargetMode,
}

/// Target mode for relationships
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TargetMode {
    /// Internal target (part within the package)
    #[default]
    Internal,
    /// External target (hyperlink, etc.)
    External,
}

impl Relationships {
    /// Create empty relationships
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from XML string
    pub fn from_xml(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        Self::from_reader(&mut reader)
    }

    /// Parse from a reader
    pub fn from_reader<R: BufRead>(reader: &mut Reader<R>) -> Result<Self> {
        let mut rels = Self::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Empty(e) | Event::Start(e) => {
                    if e.name().local_name().as_ref() == b"Relationship" {
                        let rel = parse_relationship(&e)?;
                        // A repeated id keeps its first definition
                        if !rels.contains_id(&rel.id) {
                            rels.items.push(rel);
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(rels)
    }

    /// Serialize to XML string
    pub fn to_xml(&self) -> Result<String> {
        let mut buf = Vec::new();
        self.write_to(&mut buf)?;
        String::from_utf8(buf).map_err(|e| Error::InvalidDocument(e.to_string()))
    }

    /// Write to a writer
    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        let mut xml = Writer::new(writer);

        xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;

        let mut rels_elem = BytesStart::new("Relationships");
        rels_elem.push_attribute(("xmlns", NS_RELATIONSHIPS));
        xml.write_event(Event::Start(rels_elem))?;

        for rel in &self.items {
            let mut rel_elem = BytesStart::new("Relationship");
            rel_elem.push_attribute(("Id", rel.id.as_str()));
            rel_elem.push_attribute(("Type", rel.rel_type.as_str()));
            rel_elem.push_attribute(("Target", rel.target.as_str()));

            if rel.target_mode == TargetMode::External {
                rel_elem.push_attribute(("TargetMode", "External"));
            }

            xml.write_event(Event::Empty(rel_elem))?;
        }

        xml.write_event(Event::End(BytesEnd::new("Relationships")))?;

        Ok(())
    }

    /// Get a relationship by ID
    pub fn get(&self, id: &str) -> Option<&Relationship> {
        self.items.iter().find(|r| r.id == id)
    }

    /// Check whether an ID is taken
    pub fn contains_id(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Get a relationship by type (returns first match)
    pub fn by_type(&self, rel_type: &str) -> Option<&Relationship> {
        self.items.iter().find(|r| r.rel_type == rel_type)
    }

    /// Get all relationships of a given type
    pub fn all_by_type(&self, rel_type: &str) -> Vec<&Relationship> {
        self.items
            .iter()
            .filter(|r| r.rel_type == rel_type)
            .collect()
    }

    /// Add an internal relationship under a freshly allocated ID
    pub fn add(&mut self, rel_type: &str, target: &str) -> Result<String> {
        let id = self.next_free_id()?;
        self.add_with_id(&id, rel_type, target, TargetMode::Internal);
        Ok(id)
    }

    /// Add a relationship with a specific ID, replacing any entry with that ID
    pub fn add_with_id(&mut self, id: &str, rel_type: &str, target: &str, mode: TargetMode) {
        let rel = Relationship {
            id: id.to_string(),
            rel_type: rel_type.to_string(),
            target: target.to_string(),
            target_mode: mode,
        };
        match self.items.iter_mut().find(|r| r.id == id) {
            Some(existing) => *existing = rel,
            None => self.items.push(rel),
        }
    }

    /// Remove a relationship by ID
    pub fn remove(&mut self, id: &str) -> Option<Relationship> {
        let pos = self.items.iter().position(|r| r.id == id)?;
        Some(self.items.remove(pos))
    }

    /// Iterate over all relationships in document order
    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.items.iter()
    }

    /// Number of relationships
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Allocate the next unused `rId<N>`.
    ///
    /// Starts at one past the highest numeric `rId` suffix present and probes
    /// upward until the ID is free. Non-numeric IDs never collide with the
    /// result because they are checked during probing too.
    pub fn next_free_id(&self) -> Result<String> {
        let max_id = self
            .items
            .iter()
            .filter_map(|r| r.id.strip_prefix("rId"))
            .filter_map(|n| n.parse::<u32>().ok())
            .max()
            .unwrap_or(0);

        let mut candidate = max_id.checked_add(1);
        while let Some(n) = candidate {
            let id = format!("rId{}", n);
            if !self.contains_id(&id) {
                return Ok(id);
            }
            candidate = n.checked_add(1);
        }

        Err(Error::RelationshipIdsExhausted(format!(
            "relationship table with {} entries",
            self.items.len()
        )))
    }
}

/// Parse a single Relationship element
fn parse_relationship(element: &BytesStart) -> Result<Relationship> {
    let mut id = None;
    let mut rel_type = None;
    let mut target = None;
    let mut target_mode = TargetMode::Internal;

    for attr in element.attributes() {
        let attr = attr?;
        let key = attr.key.local_name();
        let value = attr.unescape_value()?.into_owned();

        match key.as_ref() {
            b"Id" => id = Some(value),
            b"Type" => rel_type = Some(value),
            b"Target" => target = Some(value),
            b"TargetMode" => {
                if value == "External" {
                    target_mode = TargetMode::External;
                }
            }
            _ => {}
        }
    }

    Ok(Relationship {
        id: id.ok_or_else(|| Error::MissingAttribute {
            element: "Relationship".into(),
            attr: "Id".into(),
        })?,
        rel_type: rel_type.ok_or_else(|| Error::MissingAttribute {
            element: "Relationship".into(),
            attr: "Type".into(),
        })?,
        target: target.ok_or_else(|| Error::MissingAttribute {
            element: "Relationship".into(),
            attr: "Target".into(),
        })?,
        target_mode,
    })
}

const NS_RELATIONSHIPS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

// Well-known relationship types
pub mod rel_types {
    pub const OFFICE_DOCUMENT: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
    pub const STYLES: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
    pub const FOOTER: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/footer";
}
