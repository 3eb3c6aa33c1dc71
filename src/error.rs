//! Error types for docx-sections

use thiserror::Error;

/// Main error type
///
/// Every variant is fatal for a transform: nothing is written back to the
/// package once one of these is returned. Markers that cannot be found are
/// not errors, they are reported through [`crate::SectionReport`].
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML encoding error: {0}")]
    XmlEncoding(#[from] quick_xml::encoding::EncodingError),

    #[error("XML attribute error: {0}")]
    XmlAttr(#[from] quick_xml::events::attributes::AttrError),

    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("Missing required part: {0}")]
    MissingPart(String),

    #[error("Malformed XML in part {part}: {message}")]
    MalformedPart { part: String, message: String },

    #[error("Invalid part URI: {0}")]
    InvalidPartUri(String),

    #[error("Missing attribute '{attr}' on element '{element}'")]
    MissingAttribute { element: String, attr: String },

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Unknown page number format: {0}")]
    InvalidPageNumberFormat(String),

    #[error("No free relationship id left in {0}")]
    RelationshipIdsExhausted(String),

    #[error("No free part name left for pattern {0}")]
    PartNamesExhausted(String),
}

impl Error {
    /// Wrap a parse failure with the name of the part it came from
    pub fn malformed(part: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Error::MalformedPart {
            part: part.into(),
            message: err.to_string(),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
