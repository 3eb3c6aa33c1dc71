//! Footer part synthesis and relationship wiring

use crate::error::{Error, Result};
use crate::opc::{rel_types, Package, PartUri, TargetMode, FOOTER};
use crate::section::{PageNumberFormat, SectionDescriptor};
use crate::xml::{NamespaceMap, XmlDocument, XmlElement, R, W, XML_NS};
use log::{debug, info};

/// A footer part created for one page-number format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFooter {
    pub format: PageNumberFormat,
    /// e.g. `/word/footer2.xml`
    pub part: PartUri,
    /// Id of the document relationship pointing at `part`
    pub relationship_id: String,
}

/// Footers by format, in allocation order
#[derive(Debug, Clone, Default)]
pub struct FooterMap {
    footers: Vec<GeneratedFooter>,
}

impl FooterMap {
    pub fn insert(&mut self, footer: GeneratedFooter) {
        self.footers.retain(|f| f.format != footer.format);
        self.footers.push(footer);
    }

    /// Relationship id of the footer serving `format`
    pub fn relationship_id(&self, format: PageNumberFormat) -> Option<&str> {
        self.footers
            .iter()
            .find(|f| f.format == format)
            .map(|f| f.relationship_id.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &GeneratedFooter> {
        self.footers.iter()
    }

    pub fn len(&self) -> usize {
        self.footers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.footers.is_empty()
    }
}

/// Creates one footer part per distinct page-number format and wires it to
/// the main document part.
#[derive(Debug, Clone)]
pub struct FooterAllocator {
    document: PartUri,
    alignment: String,
    max_probe: u32,
}

impl FooterAllocator {
    /// Allocator for footers referenced from `document`
    pub fn new(document: PartUri) -> Self {
        Self {
            document,
            alignment: "center".to_string(),
            max_probe: 10_000,
        }
    }

    /// Justification of the footer paragraph (`w:jc`)
    pub fn with_alignment(mut self, alignment: impl Into<String>) -> Self {
        self.alignment = alignment.into();
        self
    }

    /// Highest `footerN.xml` suffix tried before giving up
    pub fn with_max_probe(mut self, max_probe: u32) -> Self {
        self.max_probe = max_probe;
        self
    }

    /// Create footers for every distinct format in `descriptors`.
    ///
    /// Each footer is written as a new part, gets a relationship from the
    /// document part under a fresh id, and a content-type override.
    pub fn allocate(
        &self,
        package: &mut Package,
        descriptors: &[SectionDescriptor],
    ) -> Result<FooterMap> {
        let mut formats: Vec<PageNumberFormat> = Vec::new();
        for format in descriptors.iter().filter_map(|d| d.page_number_format) {
            if !formats.contains(&format) {
                formats.push(format);
            }
        }

        let mut footers = FooterMap::default();
        if formats.is_empty() {
            return Ok(footers);
        }

        let xml = footer_xml(&self.alignment)?;

        for format in formats {
            let part = self.next_footer_uri(package)?;
            let target = part
                .file_name()
                .ok_or_else(|| Error::InvalidPartUri(part.to_string()))?
                .to_string();

            if !package.content_types_mut().add_override(&part, FOOTER) {
                debug!("content type override for {} already present", part);
            }
            package.write_part(&part, xml.clone());

            let document = package
                .part_mut(&self.document)
                .ok_or_else(|| Error::MissingPart(self.document.to_string()))?;
            let rels = document
                .relationships_mut()
                .ok_or_else(|| Error::MissingPart(self.document.relationships_uri().to_string()))?;
            let relationship_id = rels.next_free_id()?;
            rels.add_with_id(&relationship_id, rel_types::FOOTER, &target, TargetMode::Internal);
            document.mark_modified();

            info!("allocated footer {} as {} for {} numbering", part, relationship_id, format);
            footers.insert(GeneratedFooter {
                format,
                part,
                relationship_id,
            });
        }

        Ok(footers)
    }

    /// First `footerN.xml` next to the document part that does not exist yet
    pub fn next_footer_uri(&self, package: &Package) -> Result<PartUri> {
        for n in 1..=self.max_probe {
            let candidate = self.document.sibling(&format!("footer{}.xml", n))?;
            if !package.has_part_ignore_case(&candidate) {
                return Ok(candidate);
            }
        }
        Err(Error::PartNamesExhausted(format!(
            "footer1..footer{}.xml",
            self.max_probe
        )))
    }
}

/// Footer part markup: one paragraph holding a live PAGE field
pub fn footer_xml(alignment: &str) -> Result<Vec<u8>> {
    let ns = NamespaceMap::wordprocessing();
    let w = |local: &str| ns.name(W, local);

    let field_char = |kind: &str| -> Result<XmlElement> {
        Ok(XmlElement::new(&w("r")?)
            .with_child(XmlElement::new(&w("fldChar")?).with_attr(&w("fldCharType")?, kind)))
    };

    let instruction = XmlElement::new(&w("r")?).with_child(
        XmlElement::new(&w("instrText")?)
            .with_attr(&ns.name(XML_NS, "space")?, "preserve")
            .with_text(" PAGE "),
    );

    let paragraph = XmlElement::new(&w("p")?)
        .with_child(
            XmlElement::new(&w("pPr")?)
                .with_child(XmlElement::new(&w("jc")?).with_attr(&w("val")?, alignment)),
        )
        .with_child(field_char("begin")?)
        .with_child(instruction)
        .with_child(field_char("end")?);

    let mut root = XmlElement::new(&w("ftr")?).with_child(paragraph);
    root.declare_namespace("w", W);
    root.declare_namespace("r", R);

    XmlDocument {
        prolog: Vec::new(),
        root,
    }
    .to_bytes()
}
