//! Integration tests: transforming DOCX files on disk

use docx_sections::{apply_sections, Error, Package, PageNumberFormat, SectionDescriptor};
use std::fs;
use std::io::{Cursor, Write};
use std::path::PathBuf;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const DOCUMENT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"></Relationships>"#;

const DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><w:body><w:p><w:r><w:t>Abstract</w:t></w:r></w:p><w:p><w:r><w:t>[[SECTION_BREAK:front_end]]</w:t></w:r></w:p><w:p><w:r><w:t>Main text</w:t></w:r></w:p><w:sectPr><w:pgSz w:w="12240" w:h="15840"/></w:sectPr></w:body></w:document>"#;

/// Scratch file removed on drop
struct TempDocx(PathBuf);

impl TempDocx {
    fn new(name: &str, bytes: &[u8]) -> Self {
        let path = std::env::temp_dir().join(format!(
            "docx-sections-{}-{}.docx",
            std::process::id(),
            name
        ));
        fs::write(&path, bytes).expect("write scratch file");
        Self(path)
    }
}

impl Drop for TempDocx {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.0);
    }
}

fn docx() -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let mut zip = ZipWriter::new(Cursor::new(&mut buf));
        let options = SimpleFileOptions::default();
        for (name, data) in [
            ("[Content_Types].xml", CONTENT_TYPES),
            ("_rels/.rels", PACKAGE_RELS),
            ("word/document.xml", DOCUMENT),
            ("word/_rels/document.xml.rels", DOCUMENT_RELS),
        ] {
            zip.start_file(name, options).expect("start entry");
            zip.write_all(data.as_bytes()).expect("write entry");
        }
        zip.finish().expect("finish archive");
    }
    buf
}

#[test]
fn test_apply_sections_in_place() {
    let _ = env_logger::builder().is_test(true).try_init();
    let file = TempDocx::new("in-place", &docx());

    let report = apply_sections(
        &file.0,
        &[
            SectionDescriptor::new("front_end")
                .with_format(PageNumberFormat::UpperRoman)
                .with_start(1),
            SectionDescriptor::terminal().with_format(PageNumberFormat::Decimal),
        ],
    )
    .expect("transform succeeds");

    assert!(report.is_complete());
    assert!(report.terminal_applied);
    assert_eq!(report.footers.len(), 2);

    let package = Package::open(&file.0).expect("output reopens");
    for footer in &report.footers {
        assert!(package.has_part(&footer.part), "{} missing", footer.part);
    }
    let document = package
        .main_document_part()
        .and_then(|p| p.data_as_str().ok())
        .expect("document text");
    assert!(document.contains(r#"w:fmt="upperRoman""#));
    assert!(document.contains(r#"w:fmt="decimal""#));
    assert!(!document.contains("SECTION_BREAK"));
    // Declared once by the source document, never twice
    assert_eq!(document.matches("xmlns:r=").count(), 1);

    let mut staging = file.0.clone().into_os_string();
    staging.push(".partial");
    assert!(!PathBuf::from(staging).exists(), "staging file left behind");
}

#[test]
fn test_non_zip_file_is_left_unchanged() {
    let original = b"this is not a docx".to_vec();
    let file = TempDocx::new("not-zip", &original);

    let result = apply_sections(&file.0, &[SectionDescriptor::terminal()]);

    assert!(matches!(result, Err(Error::Zip(_))));
    assert_eq!(fs::read(&file.0).expect("file still there"), original);
}

#[test]
fn test_missing_file_is_io_error() {
    let path = std::env::temp_dir().join("docx-sections-does-not-exist.docx");
    let result = apply_sections(&path, &[SectionDescriptor::terminal()]);
    assert!(matches!(result, Err(Error::Io(_))));
}
