//! Section descriptors and the pieces that turn them into sections

mod applier;
mod footer;
mod properties;

pub use applier::{ApplyOutcome, SectionApplier, SectionKind};
pub use footer::{footer_xml, FooterAllocator, FooterMap, GeneratedFooter};
pub use properties::{PageMargins, SectionPropertiesBuilder, SECT_PR_ORDER};

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Marker name reserved for the document's trailing section
pub const TERMINAL_MARKER: &str = "document_end";

/// The text embedded in the body for a marker, e.g. `[[SECTION_BREAK:toc_end]]`
pub fn sentinel(marker: &str) -> String {
    format!("[[SECTION_BREAK:{}]]", marker)
}

/// Page number format for a section (`w:pgNumType/@w:fmt`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageNumberFormat {
    /// Decimal numbers (1, 2, 3, ...)
    Decimal,
    /// Uppercase Roman numerals (I, II, III, ...)
    UpperRoman,
    /// Lowercase Roman numerals (i, ii, iii, ...)
    LowerRoman,
    /// Uppercase letters (A, B, C, ...)
    UpperLetter,
    /// Lowercase letters (a, b, c, ...)
    LowerLetter,
}

impl PageNumberFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Decimal => "decimal",
            Self::UpperRoman => "upperRoman",
            Self::LowerRoman => "lowerRoman",
            Self::UpperLetter => "upperLetter",
            Self::LowerLetter => "lowerLetter",
        }
    }
}

impl fmt::Display for PageNumberFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PageNumberFormat {
    type Err = Error;

    /// Accepts the OOXML spelling (`lowerRoman`) and the kebab/snake forms
    /// (`lower-roman`, `lower_roman`)
    fn from_str(s: &str) -> Result<Self> {
        let folded: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();
        match folded.as_str() {
            "decimal" => Ok(Self::Decimal),
            "upperroman" => Ok(Self::UpperRoman),
            "lowerroman" => Ok(Self::LowerRoman),
            "upperletter" => Ok(Self::UpperLetter),
            "lowerletter" => Ok(Self::LowerLetter),
            _ => Err(Error::InvalidPageNumberFormat(s.to_string())),
        }
    }
}

/// One requested section boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionDescriptor {
    /// Marker name, or [`TERMINAL_MARKER`] for the end of the document
    pub marker: String,
    /// Numbering format; `None` leaves numbering untouched
    pub page_number_format: Option<PageNumberFormat>,
    /// First page number, only used together with a format
    pub start: Option<u32>,
}

impl SectionDescriptor {
    /// Section ending at `marker`, no numbering change
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
            page_number_format: None,
            start: None,
        }
    }

    /// The document's trailing section
    pub fn terminal() -> Self {
        Self::new(TERMINAL_MARKER)
    }

    pub fn with_format(mut self, format: PageNumberFormat) -> Self {
        self.page_number_format = Some(format);
        self
    }

    pub fn with_start(mut self, start: u32) -> Self {
        self.start = Some(start);
        self
    }

    /// Whether this descriptor names the document end
    pub fn is_terminal(&self) -> bool {
        self.marker == TERMINAL_MARKER
    }

    /// Text searched for in the body
    pub fn sentinel(&self) -> String {
        sentinel(&self.marker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel() {
        assert_eq!(sentinel("toc_end"), "[[SECTION_BREAK:toc_end]]");
        assert_eq!(
            SectionDescriptor::terminal().sentinel(),
            "[[SECTION_BREAK:document_end]]"
        );
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("decimal".parse::<PageNumberFormat>().unwrap(), PageNumberFormat::Decimal);
        assert_eq!(
            "lowerRoman".parse::<PageNumberFormat>().unwrap(),
            PageNumberFormat::LowerRoman
        );
        assert_eq!(
            "upper-roman".parse::<PageNumberFormat>().unwrap(),
            PageNumberFormat::UpperRoman
        );
        assert_eq!(
            "lower_letter".parse::<PageNumberFormat>().unwrap(),
            PageNumberFormat::LowerLetter
        );
        assert!(matches!(
            "hebrew".parse::<PageNumberFormat>(),
            Err(Error::InvalidPageNumberFormat(_))
        ));
    }

    #[test]
    fn test_descriptor_builder() {
        let d = SectionDescriptor::new("toc_end")
            .with_format(PageNumberFormat::LowerRoman)
            .with_start(1);
        assert_eq!(d.page_number_format, Some(PageNumberFormat::LowerRoman));
        assert_eq!(d.start, Some(1));
        assert!(!d.is_terminal());
        assert!(SectionDescriptor::terminal().is_terminal());
    }
}
