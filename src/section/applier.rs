//! Applying built section properties to the document body

use crate::document::DocumentPart;
use crate::error::Result;
use crate::section::{FooterMap, PageMargins, SectionDescriptor, SectionPropertiesBuilder};
use crate::xml::{NamespaceMap, XmlElement, XmlNode, W};
use log::{debug, warn};

/// How a descriptor is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    /// Marker paragraph becomes a paragraph that ends a section
    Interior,
    /// Properties go on the body's trailing `w:sectPr`
    Terminal,
}

/// Result of applying one descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied(SectionKind),
    /// The marker text is not in the document; nothing was changed
    MarkerNotFound,
}

/// Applies descriptors one by one, in the order given.
///
/// Exactly one terminal section is applied per run: the first descriptor
/// naming the terminal marker, or else the last descriptor of the list.
/// Any later terminal-marker descriptor is treated as an ordinary interior
/// marker.
#[derive(Debug)]
pub struct SectionApplier<'a> {
    document: &'a mut DocumentPart,
    namespaces: NamespaceMap,
    template: XmlElement,
    footers: &'a FooterMap,
    margins: PageMargins,
    terminal_applied: bool,
}

impl<'a> SectionApplier<'a> {
    pub fn new(
        document: &'a mut DocumentPart,
        template: XmlElement,
        footers: &'a FooterMap,
        margins: PageMargins,
    ) -> Self {
        let namespaces = document.namespaces().clone();
        Self {
            document,
            namespaces,
            template,
            footers,
            margins,
            terminal_applied: false,
        }
    }

    /// Whether the terminal section has been applied
    pub fn terminal_applied(&self) -> bool {
        self.terminal_applied
    }

    /// Kind the next application of `descriptor` would use; `last` marks
    /// the final descriptor of the list
    pub fn classify(&self, descriptor: &SectionDescriptor, last: bool) -> SectionKind {
        if !self.terminal_applied && (descriptor.is_terminal() || last) {
            SectionKind::Terminal
        } else {
            SectionKind::Interior
        }
    }

    pub fn apply(&mut self, descriptor: &SectionDescriptor, last: bool) -> Result<ApplyOutcome> {
        match self.classify(descriptor, last) {
            SectionKind::Interior => {
                if descriptor.is_terminal() {
                    warn!(
                        "terminal section already applied, treating '{}' as an interior marker",
                        descriptor.marker
                    );
                }
                self.apply_interior(descriptor)
            }
            SectionKind::Terminal => self.apply_terminal(descriptor),
        }
    }

    fn apply_interior(&mut self, descriptor: &SectionDescriptor) -> Result<ApplyOutcome> {
        let sentinel = descriptor.sentinel();
        let Some(found) = self.document.find_marker(&sentinel)? else {
            warn!("marker {} not found, skipping", sentinel);
            return Ok(ApplyOutcome::MarkerNotFound);
        };
        if found.occurrences > 1 {
            warn!(
                "marker {} occurs {} times, only the first is used",
                sentinel, found.occurrences
            );
        }

        let sect = self.build(descriptor, SectionKind::Interior)?;
        let paragraph = self.section_paragraph(sect)?;
        self.document.replace_element(&found.paragraph, paragraph)?;

        debug!("applied section break at {}", sentinel);
        Ok(ApplyOutcome::Applied(SectionKind::Interior))
    }

    fn apply_terminal(&mut self, descriptor: &SectionDescriptor) -> Result<ApplyOutcome> {
        let sect = self.build(descriptor, SectionKind::Terminal)?;

        // The closing marker's sentinel must not survive as visible text
        match self.document.find_marker(&descriptor.sentinel())? {
            Some(found) => {
                self.document.remove_element(&found.paragraph)?;
            }
            None if !descriptor.is_terminal() => {
                debug!(
                    "marker {} not in body, closing the document section anyway",
                    descriptor.marker
                );
            }
            None => {}
        }
        self.document.set_body_section(sect)?;
        self.terminal_applied = true;

        debug!("applied terminal section");
        Ok(ApplyOutcome::Applied(SectionKind::Terminal))
    }

    fn build(&self, descriptor: &SectionDescriptor, kind: SectionKind) -> Result<XmlElement> {
        SectionPropertiesBuilder::new(&self.namespaces, self.margins).build(
            &self.template,
            descriptor,
            self.footers,
            kind,
        )
    }

    /// `<w:p><w:pPr>sect</w:pPr></w:p>`
    fn section_paragraph(&self, sect: XmlElement) -> Result<XmlElement> {
        let mut properties = XmlElement::new(&self.namespaces.name(W, "pPr")?);
        properties.append_child(XmlNode::Element(sect));

        let mut paragraph = XmlElement::new(&self.namespaces.name(W, "p")?);
        paragraph.append_child(XmlNode::Element(properties));
        Ok(paragraph)
    }
}
