//! End-to-end section transform over a DOCX package
//!
//! A transform runs against a staged copy of the package. The caller's
//! package (or file) is only replaced once every step has succeeded.

use crate::document::DocumentPart;
use crate::error::{Error, Result};
use crate::opc::Package;
use crate::section::{
    ApplyOutcome, FooterAllocator, GeneratedFooter, PageMargins, SectionApplier,
    SectionDescriptor, SectionPropertiesBuilder,
};
use log::{debug, info, warn};
use std::path::Path;

const DEFAULT_FOOTER_ALIGNMENT: &str = "center";
const DEFAULT_MAX_PROBE: u32 = 10_000;

/// Knobs for a [`SectionTransform`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOptions {
    /// Margins written into every section
    pub margins: PageMargins,
    /// `w:jc` value of the generated footer paragraph
    pub footer_alignment: String,
    /// Highest `footerN.xml` index tried before giving up
    pub max_probe: u32,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            margins: PageMargins::standard(),
            footer_alignment: DEFAULT_FOOTER_ALIGNMENT.to_string(),
            max_probe: DEFAULT_MAX_PROBE,
        }
    }
}

impl TransformOptions {
    pub fn with_margins(mut self, margins: PageMargins) -> Self {
        self.margins = margins;
        self
    }

    pub fn with_footer_alignment(mut self, alignment: impl Into<String>) -> Self {
        self.footer_alignment = alignment.into();
        self
    }

    pub fn with_max_probe(mut self, max_probe: u32) -> Self {
        self.max_probe = max_probe;
        self
    }
}

/// What a transform did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionReport {
    /// Markers that became section boundaries, in descriptor order
    pub applied: Vec<String>,
    /// Markers whose sentinel was not found
    pub skipped: Vec<String>,
    /// Footer parts created, one per distinct numbering format
    pub footers: Vec<GeneratedFooter>,
    /// Whether the document's trailing section was rewritten
    pub terminal_applied: bool,
}

impl SectionReport {
    /// True when no descriptor was skipped
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Applies a list of [`SectionDescriptor`]s to a document
#[derive(Debug, Clone, Default)]
pub struct SectionTransform {
    options: TransformOptions,
}

impl SectionTransform {
    pub fn new(options: TransformOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &TransformOptions {
        &self.options
    }

    /// Transform the DOCX at `path` in place.
    ///
    /// Nothing is written when any step fails.
    pub fn apply_to_file<P: AsRef<Path>>(
        &self,
        path: P,
        descriptors: &[SectionDescriptor],
    ) -> Result<SectionReport> {
        let path = path.as_ref();
        let mut package = Package::open(path)?;
        let report = self.apply_to_package(&mut package, descriptors)?;
        package.save(path)?;

        info!("rewrote {}", path.display());
        Ok(report)
    }

    /// Transform DOCX bytes, returning the new archive
    pub fn apply_to_bytes(
        &self,
        bytes: &[u8],
        descriptors: &[SectionDescriptor],
    ) -> Result<(Vec<u8>, SectionReport)> {
        let mut package = Package::from_bytes(bytes)?;
        let report = self.apply_to_package(&mut package, descriptors)?;
        Ok((package.to_bytes()?, report))
    }

    /// Transform an open package.
    ///
    /// On error `package` is left exactly as it was.
    pub fn apply_to_package(
        &self,
        package: &mut Package,
        descriptors: &[SectionDescriptor],
    ) -> Result<SectionReport> {
        let mut staged = package.clone();
        let report = self.run(&mut staged, descriptors)?;
        *package = staged;
        Ok(report)
    }

    fn run(&self, package: &mut Package, descriptors: &[SectionDescriptor]) -> Result<SectionReport> {
        let document_uri = package
            .main_document_uri()
            .ok_or_else(|| Error::MissingPart("main document relationship".into()))?;
        let has_rels = package
            .part(&document_uri)
            .ok_or_else(|| Error::MissingPart(document_uri.to_string()))?
            .relationships()
            .is_some();
        if !has_rels {
            return Err(Error::MissingPart(
                document_uri.relationships_uri().to_string(),
            ));
        }

        let mut document = DocumentPart::from_package(package)?;

        let template = match document.base_section_template()? {
            Some(sect) => sect.clone(),
            None => {
                info!("{} has no w:sectPr, using a US Letter template", document_uri);
                SectionPropertiesBuilder::new(document.namespaces(), self.options.margins)
                    .fallback_template()?
            }
        };

        let footers = FooterAllocator::new(document_uri.clone())
            .with_alignment(self.options.footer_alignment.as_str())
            .with_max_probe(self.options.max_probe)
            .allocate(package, descriptors)?;
        if !footers.is_empty() {
            document.ensure_relationship_namespace();
        }

        let mut report = SectionReport {
            footers: footers.iter().cloned().collect(),
            ..SectionReport::default()
        };

        {
            let mut applier =
                SectionApplier::new(&mut document, template, &footers, self.options.margins);
            let count = descriptors.len();
            for (index, descriptor) in descriptors.iter().enumerate() {
                match applier.apply(descriptor, index + 1 == count)? {
                    ApplyOutcome::Applied(kind) => {
                        debug!("{} applied as {:?}", descriptor.marker, kind);
                        report.applied.push(descriptor.marker.clone());
                    }
                    ApplyOutcome::MarkerNotFound => {
                        report.skipped.push(descriptor.marker.clone());
                    }
                }
            }
            report.terminal_applied = applier.terminal_applied();
        }

        document.write_into(package)?;

        if !report.is_complete() {
            warn!("{} marker(s) not found: {}", report.skipped.len(), report.skipped.join(", "));
        }
        info!(
            "applied {} section(s), {} footer(s), terminal section {}",
            report.applied.len(),
            report.footers.len(),
            if report.terminal_applied { "rewritten" } else { "untouched" }
        );
        Ok(report)
    }
}

/// Apply `descriptors` to the DOCX at `path` with default options
pub fn apply_sections<P: AsRef<Path>>(
    path: P,
    descriptors: &[SectionDescriptor],
) -> Result<SectionReport> {
    SectionTransform::default().apply_to_file(path, descriptors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opc::{rel_types, Part, PartUri, Relationships, MAIN_DOCUMENT};
    use crate::section::PageNumberFormat;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_options() {
        let options = TransformOptions::default();
        assert_eq!(options.margins, PageMargins::standard());
        assert_eq!(options.footer_alignment, "center");
        assert_eq!(options.max_probe, 10_000);

        let options = options.with_footer_alignment("right").with_max_probe(3);
        assert_eq!(options.footer_alignment, "right");
        assert_eq!(options.max_probe, 3);
    }

    #[test]
    fn test_report_completeness() {
        let mut report = SectionReport::default();
        assert!(report.is_complete());
        report.skipped.push("appendix".into());
        assert!(!report.is_complete());
    }

    fn package() -> Package {
        let uri = PartUri::new("/word/document.xml").unwrap();
        let xml = br#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body><w:p><w:r><w:t>[[SECTION_BREAK:a]]</w:t></w:r></w:p></w:body></w:document>"#;
        let mut document = Part::new(uri, MAIN_DOCUMENT, xml.to_vec());
        document.set_relationships(Relationships::new());

        let mut package = Package::new();
        package.add_part(document);
        package
            .relationships_mut()
            .add(rel_types::OFFICE_DOCUMENT, "word/document.xml")
            .unwrap();
        package
    }

    #[test]
    fn test_failed_transform_leaves_package_alone() {
        let mut package = package();
        let transform = SectionTransform::new(TransformOptions::default().with_max_probe(1));

        // The second format finds no free footer name after the first was taken
        let result = transform.apply_to_package(
            &mut package,
            &[
                SectionDescriptor::new("a").with_format(PageNumberFormat::LowerRoman),
                SectionDescriptor::terminal().with_format(PageNumberFormat::Decimal),
            ],
        );

        assert!(matches!(result, Err(Error::PartNamesExhausted(_))));
        assert!(!package.has_part(&PartUri::new("/word/footer1.xml").unwrap()));
        assert_eq!(package.content_types().override_count(), 1);
        let document = package.main_document_part().unwrap();
        assert!(document.relationships().unwrap().is_empty());
        assert!(!document.is_modified());
    }

    #[test]
    fn test_missing_document_relationships_is_fatal() {
        let mut package = package();
        if let Some(part) = package.main_document_part_mut() {
            *part = Part::new(part.uri().clone(), MAIN_DOCUMENT, part.data().to_vec());
        }

        let result = SectionTransform::default()
            .apply_to_package(&mut package, &[SectionDescriptor::new("a")]);
        match result {
            Err(Error::MissingPart(name)) => assert_eq!(name, "/word/_rels/document.xml.rels"),
            other => panic!("expected MissingPart, got {:?}", other),
        }
    }
}
