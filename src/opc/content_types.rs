//! Content Types handling for OPC packages
//!
//! Parses and generates `[Content_Types].xml`

use crate::error::{Error, Result};
use crate::opc::PartUri;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::io::{BufRead, Write};

/// Content types registry for an OPC package
///
/// Holds at most one override per part name.
#[derive(Clone, Debug, Default)]
pub struct ContentTypes {
    /// Default extension mappings (extension -> content type)
    defaults: Vec<(String, String)>,
    /// Override mappings (part URI -> content type)
    overrides: Vec<(PartUri, String)>,
}

impl ContentTypes {
    /// Create a new ContentTypes with standard defaults
    pub fn new() -> Self {
        let mut ct = Self::default();
        ct.add_default("rels", RELATIONSHIPS);
        ct.add_default("xml", XML);
        ct
    }

    /// Parse from XML string
    pub fn from_xml(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        Self::from_reader(&mut reader)
    }

    /// Parse from a reader
    pub fn from_reader<R: BufRead>(reader: &mut Reader<R>) -> Result<Self> {
        let mut ct = Self::default();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Empty(e) | Event::Start(e) => match e.name().local_name().as_ref() {
                    b"Default" => {
                        let ext = get_attr(&e, "Extension")?;
                        let content_type = get_attr(&e, "ContentType")?;
                        ct.add_default(&ext, &content_type);
                    }
                    b"Override" => {
                        let part_name = get_attr(&e, "PartName")?;
                        let content_type = get_attr(&e, "ContentType")?;
                        let uri = PartUri::new(&part_name)?;
                        ct.add_override(&uri, &content_type);
                    }
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(ct)
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

        xml.write_event(Event::Decl(BytesDecl::new(
            "1.0",
            Some("UTF-8"),
            Some("yes"),
        )))?;

        let mut types = BytesStart::new("Types");
        types.push_attribute(("xmlns", NS_CONTENT_TYPES));
        xml.write_event(Event::Start(types))?;

        for (ext, content_type) in &self.defaults {
            let mut default = BytesStart::new("Default");
            default.push_attribute(("Extension", ext.as_str()));
            default.push_attribute(("ContentType", content_type.as_str()));
            xml.write_event(Event::Empty(default))?;
        }

        for (uri, content_type) in &self.overrides {
            let mut override_elem = BytesStart::new("Override");
            override_elem.push_attribute(("PartName", uri.as_str()));
            override_elem.push_attribute(("ContentType", content_type.as_str()));
            xml.write_event(Event::Empty(override_elem))?;
        }

        xml.write_event(Event::End(BytesEnd::new("Types")))?;

        Ok(())
    }

    /// Add a default extension mapping, replacing an existing one
    pub fn add_default(&mut self, extension: &str, content_type: &str) {
        let extension = extension.to_lowercase();
        match self.defaults.iter_mut().find(|(ext, _)| *ext == extension) {
            Some(entry) => entry.1 = content_type.to_string(),
            None => self.defaults.push((extension, content_type.to_string())),
        }
    }

    /// Add an override for a specific part.
    ///
    /// Returns `false` and leaves the registry untouched if the part already
    /// has an override.
    pub fn add_override(&mut self, uri: &PartUri, content_type: &str) -> bool {
        if self.has_override(uri) {
            return false;
        }
        self.overrides.push((uri.clone(), content_type.to_string()));
        true
    }

    /// Check whether a part has an explicit override
    pub fn has_override(&self, uri: &PartUri) -> bool {
        self.overrides.iter().any(|(u, _)| u == uri)
    }

    /// Number of overrides
    pub fn override_count(&self) -> usize {
        self.overrides.len()
    }

    /// Get the content type for a part
    pub fn get(&self, uri: &PartUri) -> Option<&str> {
        if let Some((_, ct)) = self.overrides.iter().find(|(u, _)| u == uri) {
            return Some(ct);
        }

        let ext = uri.extension()?.to_lowercase();
        self.defaults
            .iter()
            .find(|(e, _)| *e == ext)
            .map(|(_, ct)| ct.as_str())
    }
}

/// Get an attribute value from an XML element
fn get_attr(element: &BytesStart, name: &str) -> Result<String> {
    for attr in element.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == name.as_bytes() {
            return Ok(attr.unescape_value()?.into_owned());
        }
    }
    Err(Error::MissingAttribute {
        element: String::from_utf8_lossy(element.name().as_ref()).to_string(),
        attr: name.to_string(),
    })
}

const NS_CONTENT_TYPES: &str = "http://schemas.openxmlformats.org/package/2006/content-types";

// Well-known content types
pub const RELATIONSHIPS: &str = "application/vnd.openxmlformats-package.relationships+xml";
pub const XML: &str = "application/xml";
pub const MAIN_DOCUMENT: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml";
pub const FOOTER: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.footer+xml";
