//! Section properties (`w:sectPr`) construction

use crate::error::{Error, Result};
use crate::section::{FooterMap, SectionDescriptor, SectionKind};
use crate::xml::{NamespaceMap, NodePath, XmlElement, XmlNode, R, W};

/// Child order of `w:sectPr` mandated by the WordprocessingML schema
/// (CT_SectPr). Every insertion goes through this table.
pub const SECT_PR_ORDER: &[&str] = &[
    "headerReference",
    "footerReference",
    "footnotePr",
    "endnotePr",
    "type",
    "pgSz",
    "pgMar",
    "paperSrc",
    "pgBorders",
    "lnNumType",
    "pgNumType",
    "cols",
    "formProt",
    "vAlign",
    "noEndnote",
    "titlePg",
    "textDirection",
    "bidi",
    "rtlGutter",
    "docGrid",
    "printerSettings",
    "sectPrChange",
];

/// Page margins in twips (1440 = 1 inch)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageMargins {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
    pub header: u32,
    pub footer: u32,
    pub gutter: u32,
}

impl PageMargins {
    /// One inch on every side, half an inch for header and footer, no gutter
    pub const fn standard() -> Self {
        Self {
            top: 1440,
            right: 1440,
            bottom: 1440,
            left: 1440,
            header: 720,
            footer: 720,
            gutter: 0,
        }
    }

    fn attributes(&self) -> [(&'static str, u32); 7] {
        [
            ("top", self.top),
            ("right", self.right),
            ("bottom", self.bottom),
            ("left", self.left),
            ("header", self.header),
            ("footer", self.footer),
            ("gutter", self.gutter),
        ]
    }
}

impl Default for PageMargins {
    fn default() -> Self {
        Self::standard()
    }
}

/// Builds `w:sectPr` nodes from the document's base template
#[derive(Debug)]
pub struct SectionPropertiesBuilder<'a> {
    namespaces: &'a NamespaceMap,
    margins: PageMargins,
}

impl<'a> SectionPropertiesBuilder<'a> {
    pub fn new(namespaces: &'a NamespaceMap, margins: PageMargins) -> Self {
        Self {
            namespaces,
            margins,
        }
    }

    /// Build the properties for one section.
    ///
    /// The template is cloned; numbering and footer references it carried
    /// are dropped, margins are overwritten, and the break type follows
    /// `kind`. A footer reference is only added when `footers` has a part
    /// for the descriptor's format.
    pub fn build(
        &self,
        template: &XmlElement,
        descriptor: &SectionDescriptor,
        footers: &FooterMap,
        kind: SectionKind,
    ) -> Result<XmlElement> {
        let mut sect = template.clone();
        sect.remove_children(W, "pgNumType");
        sect.remove_children(W, "footerReference");

        self.normalize_margins(&mut sect)?;

        match kind {
            SectionKind::Interior => {
                let break_type = self.ensure_child(&mut sect, "type")?;
                break_type.set_attribute(&self.namespaces.name(W, "val")?, "nextPage");
            }
            SectionKind::Terminal => {
                sect.remove_children(W, "type");
            }
        }

        if let Some(format) = descriptor.page_number_format {
            let pg_num = self.ensure_child(&mut sect, "pgNumType")?;
            pg_num.set_attribute(&self.namespaces.name(W, "fmt")?, format.as_str());
            if let Some(start) = descriptor.start {
                pg_num.set_attribute(&self.namespaces.name(W, "start")?, start.to_string());
            }

            if let Some(rel_id) = footers.relationship_id(format) {
                let footer_ref = self.ensure_child(&mut sect, "footerReference")?;
                footer_ref.set_attribute(&self.namespaces.name(W, "type")?, "default");
                footer_ref.set_attribute(&self.namespaces.name(R, "id")?, rel_id);
            }
        }

        Ok(sect)
    }

    /// A minimal US Letter template for documents that carry no `w:sectPr`
    pub fn fallback_template(&self) -> Result<XmlElement> {
        let mut sect = XmlElement::new(&self.namespaces.name(W, "sectPr")?);
        let pg_sz = self.ensure_child(&mut sect, "pgSz")?;
        pg_sz.set_attribute(&self.namespaces.name(W, "w")?, "12240");
        pg_sz.set_attribute(&self.namespaces.name(W, "h")?, "15840");
        Ok(sect)
    }

    fn normalize_margins(&self, sect: &mut XmlElement) -> Result<()> {
        let pg_mar = self.ensure_child(sect, "pgMar")?;
        for (local, value) in self.margins.attributes() {
            pg_mar.set_attribute(&self.namespaces.name(W, local)?, value.to_string());
        }
        Ok(())
    }

    /// Existing `w:<local>` child, or a new one inserted at its schema position
    fn ensure_child<'s>(&self, sect: &'s mut XmlElement, local: &str) -> Result<&'s mut XmlElement> {
        let existing = sect
            .indexed_elements()
            .find(|(_, e)| e.is(W, local))
            .map(|(i, _)| i);

        let index = match existing {
            Some(index) => index,
            None => {
                let child = XmlElement::new(&self.namespaces.name(W, local)?);
                insert_ordered(sect, child)
            }
        };

        sect.at_mut(&NodePath::root().child(index))
            .ok_or_else(|| Error::InvalidDocument(format!("lost w:{} while building w:sectPr", local)))
    }
}

fn schema_rank(element: &XmlElement) -> Option<usize> {
    if element.namespace.as_deref() != Some(W) {
        return None;
    }
    SECT_PR_ORDER.iter().position(|n| *n == element.local_name())
}

/// Insert before the first child that the schema orders after `child`.
/// Returns the index the child landed at.
fn insert_ordered(sect: &mut XmlElement, child: XmlElement) -> usize {
    let rank = schema_rank(&child).unwrap_or(SECT_PR_ORDER.len());
    let index = sect
        .indexed_elements()
        .find(|(_, e)| schema_rank(e).is_some_and(|r| r > rank))
        .map(|(i, _)| i)
        .unwrap_or(sect.children.len());
    sect.insert_before(index, XmlNode::Element(child));
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opc::PartUri;
    use crate::section::{GeneratedFooter, PageNumberFormat};
    use crate::xml::XmlDocument;
    use pretty_assertions::assert_eq;

    fn template(inner: &str) -> XmlElement {
        let xml = format!(
            r#"<w:sectPr xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">{}</w:sectPr>"#,
            inner
        );
        XmlDocument::parse_str(&xml).unwrap().root
    }

    fn child_names(sect: &XmlElement) -> Vec<&str> {
        sect.elements().map(|e| e.local_name()).collect()
    }

    fn footers_with(format: PageNumberFormat, id: &str) -> FooterMap {
        let mut map = FooterMap::default();
        map.insert(GeneratedFooter {
            format,
            part: PartUri::new("/word/footer1.xml").unwrap(),
            relationship_id: id.to_string(),
        });
        map
    }

    #[test]
    fn test_interior_section_is_schema_ordered() {
        let ns = NamespaceMap::wordprocessing();
        let builder = SectionPropertiesBuilder::new(&ns, PageMargins::standard());
        let base = template(
            r#"<w:pgSz w:w="12240" w:h="15840"/><w:pgMar w:top="720" w:right="720" w:bottom="720" w:left="720" w:header="360" w:footer="360" w:gutter="100"/><w:cols w:space="720"/><w:docGrid w:linePitch="360"/>"#,
        );
        let descriptor = SectionDescriptor::new("toc_end")
            .with_format(PageNumberFormat::LowerRoman)
            .with_start(1);

        let sect = builder
            .build(
                &base,
                &descriptor,
                &footers_with(PageNumberFormat::LowerRoman, "rId9"),
                SectionKind::Interior,
            )
            .unwrap();

        assert_eq!(
            child_names(&sect),
            ["footerReference", "type", "pgSz", "pgMar", "pgNumType", "cols", "docGrid"]
        );
        assert_eq!(sect.child(W, "type").unwrap().attribute(Some(W), "val"), Some("nextPage"));

        let pg_num = sect.child(W, "pgNumType").unwrap();
        assert_eq!(pg_num.attribute(Some(W), "fmt"), Some("lowerRoman"));
        assert_eq!(pg_num.attribute(Some(W), "start"), Some("1"));

        let footer = sect.child(W, "footerReference").unwrap();
        assert_eq!(footer.attribute(Some(W), "type"), Some("default"));
        assert_eq!(footer.attribute(Some(R), "id"), Some("rId9"));
    }

    #[test]
    fn test_margins_normalized_regardless_of_template() {
        let ns = NamespaceMap::wordprocessing();
        let builder = SectionPropertiesBuilder::new(&ns, PageMargins::standard());
        let base = template(r#"<w:pgMar w:top="2880" w:left="100" w:gutter="720"/>"#);

        let sect = builder
            .build(
                &base,
                &SectionDescriptor::terminal(),
                &FooterMap::default(),
                SectionKind::Terminal,
            )
            .unwrap();

        let pg_mar = sect.child(W, "pgMar").unwrap();
        for (attr, expected) in [
            ("top", "1440"),
            ("right", "1440"),
            ("bottom", "1440"),
            ("left", "1440"),
            ("header", "720"),
            ("footer", "720"),
            ("gutter", "0"),
        ] {
            assert_eq!(pg_mar.attribute(Some(W), attr), Some(expected), "{}", attr);
        }
    }

    #[test]
    fn test_missing_margins_are_created_in_order() {
        let ns = NamespaceMap::wordprocessing();
        let builder = SectionPropertiesBuilder::new(&ns, PageMargins::standard());
        let base = template(r#"<w:pgSz w:w="11906" w:h="16838"/><w:docGrid w:linePitch="360"/>"#);

        let sect = builder
            .build(&base, &SectionDescriptor::new("a"), &FooterMap::default(), SectionKind::Interior)
            .unwrap();

        assert_eq!(child_names(&sect), ["type", "pgSz", "pgMar", "docGrid"]);
        assert_eq!(sect.child(W, "pgSz").unwrap().attribute(Some(W), "w"), Some("11906"));
    }

    #[test]
    fn test_terminal_drops_break_type_and_stale_children() {
        let ns = NamespaceMap::wordprocessing();
        let builder = SectionPropertiesBuilder::new(&ns, PageMargins::standard());
        let base = template(
            r#"<w:headerReference w:type="default" r:id="rId1"/><w:footerReference w:type="default" r:id="rId2"/><w:type w:val="continuous"/><w:pgSz w:w="12240" w:h="15840"/><w:pgNumType w:fmt="upperRoman"/>"#,
        );

        let sect = builder
            .build(
                &base,
                &SectionDescriptor::terminal(),
                &FooterMap::default(),
                SectionKind::Terminal,
            )
            .unwrap();

        assert_eq!(child_names(&sect), ["headerReference", "pgSz", "pgMar"]);
    }

    #[test]
    fn test_rebuild_does_not_accumulate() {
        let ns = NamespaceMap::wordprocessing();
        let builder = SectionPropertiesBuilder::new(&ns, PageMargins::standard());
        let footers = footers_with(PageNumberFormat::Decimal, "rId4");
        let descriptor = SectionDescriptor::new("ch1").with_format(PageNumberFormat::Decimal);

        let once = builder
            .build(&template(""), &descriptor, &footers, SectionKind::Interior)
            .unwrap();
        let twice = builder
            .build(&once, &descriptor, &footers, SectionKind::Interior)
            .unwrap();

        assert_eq!(once, twice);
        assert_eq!(twice.child(W, "pgNumType").unwrap().attribute(Some(W), "start"), None);
    }

    #[test]
    fn test_format_without_footer_part() {
        let ns = NamespaceMap::wordprocessing();
        let builder = SectionPropertiesBuilder::new(&ns, PageMargins::standard());
        let descriptor = SectionDescriptor::new("x").with_format(PageNumberFormat::UpperLetter);

        let sect = builder
            .build(&template(""), &descriptor, &FooterMap::default(), SectionKind::Interior)
            .unwrap();

        assert!(sect.child(W, "pgNumType").is_some());
        assert!(sect.child(W, "footerReference").is_none());
    }

    #[test]
    fn test_fallback_template() {
        let ns = NamespaceMap::wordprocessing();
        let builder = SectionPropertiesBuilder::new(&ns, PageMargins::standard());
        let sect = builder.fallback_template().unwrap();

        assert!(sect.is(W, "sectPr"));
        assert_eq!(sect.child(W, "pgSz").unwrap().attribute(Some(W), "h"), Some("15840"));
    }
}
