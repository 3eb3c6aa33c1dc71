//! # docx-sections
//!
//! Split a DOCX document into sections at text markers and give each
//! section its own page numbering.
//!
//! ## Features
//!
//! - Marker paragraphs (`[[SECTION_BREAK:name]]`) become section breaks
//! - Per-section page-number format and start value
//! - One footer with a live PAGE field per numbering format
//! - Unknown markup and unrelated package entries are kept intact
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use docx_sections::{apply_sections, PageNumberFormat, SectionDescriptor};
//!
//! let report = apply_sections(
//!     "thesis.docx",
//!     &[
//!         SectionDescriptor::new("toc_end")
//!             .with_format(PageNumberFormat::LowerRoman)
//!             .with_start(1),
//!         SectionDescriptor::new("chapter1_start")
//!             .with_format(PageNumberFormat::Decimal)
//!             .with_start(1),
//!         SectionDescriptor::terminal(),
//!     ],
//! )?;
//! assert!(report.is_complete());
//! ```

pub mod document;
pub mod error;
pub mod opc;
pub mod section;
pub mod transform;
pub mod xml;

pub use error::{Error, Result};
pub use opc::{Package, Part, PartUri};
pub use section::{PageMargins, PageNumberFormat, SectionDescriptor, TERMINAL_MARKER};
pub use transform::{apply_sections, SectionReport, SectionTransform, TransformOptions};
