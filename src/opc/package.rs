//! OPC Package implementation
//!
//! Handles reading and writing DOCX files as ZIP packages. All parts are held
//! in memory; writes are staged on the in-memory parts and only reach disk
//! when the package is saved.

use crate::error::{Error, Result};
use crate::opc::relationships::rel_types;
use crate::opc::{ContentTypes, Part, PartUri, Relationships};
use log::debug;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, Cursor, Read, Seek, Write};
use std::path::{Path, PathBuf};
use zip::read::ZipArchive;
use zip::write::{SimpleFileOptions, ZipWriter};
use zip::CompressionMethod;

const CONTENT_TYPES_ENTRY: &str = "[Content_Types].xml";
const PACKAGE_RELS_ENTRY: &str = "_rels/.rels";

/// An OPC package (ZIP-based container for DOCX, XLSX, PPTX, etc.)
#[derive(Clone, Debug)]
pub struct Package {
    parts: HashMap<PartUri, Part>,
    /// Part URIs in archive order, new parts appended
    order: Vec<PartUri>,
    /// Package-level relationships (/_rels/.rels)
    relationships: Relationships,
    /// Content types ([Content_Types].xml)
    content_types: ContentTypes,
}

impl Package {
    /// Create a new empty package
    pub fn new() -> Self {
        Self {
            parts: HashMap::new(),
            order: Vec::new(),
            relationships: Relationships::new(),
            content_types: ContentTypes::new(),
        }
    }

    /// Open a package from a file path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let package = Self::from_reader(BufReader::new(file))?;
        debug!(
            "opened package {} ({} parts)",
            path.display(),
            package.parts.len()
        );
        Ok(package)
    }

    /// Open a package from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_reader(Cursor::new(bytes))
    }

    /// Open a package from a reader
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)?;
        let mut package = Self::new();

        package.content_types = Self::read_content_types(&mut archive)?;
        package.relationships = Self::read_package_rels(&mut archive)?;
        package.read_parts(&mut archive)?;
        package.read_part_relationships(&mut archive)?;

        Ok(package)
    }

    /// Save the package to a file.
    ///
    /// The archive is fully built in memory, written next to `path` and then
    /// renamed over it, so a failure never leaves a half-written package.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;

        let staging = staging_path(path);
        fs::write(&staging, &bytes)?;
        if let Err(err) = fs::rename(&staging, path) {
            let _ = fs::remove_file(&staging);
            return Err(err.into());
        }

        debug!("saved package {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }

    /// Save the package to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.write_to(Cursor::new(&mut buf))?;
        Ok(buf)
    }

    /// Write the package to a writer
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<()> {
        let mut zip = ZipWriter::new(writer);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        zip.start_file(CONTENT_TYPES_ENTRY, options)?;
        self.content_types.write_to(&mut zip)?;

        if !self.relationships.is_empty() {
            zip.start_file(PACKAGE_RELS_ENTRY, options)?;
            self.relationships.write_to(&mut zip)?;
        }

        for uri in &self.order {
            let Some(part) = self.parts.get(uri) else {
                continue;
            };
            zip.start_file(uri.zip_path(), options)?;
            zip.write_all(part.data())?;

            // An empty table is still a part the source package carried
            if let Some(rels) = part.relationships() {
                zip.start_file(uri.relationships_uri().zip_path(), options)?;
                rels.write_to(&mut zip)?;
            }
        }

        zip.finish()?;
        Ok(())
    }

    /// Check whether a part exists
    pub fn has_part(&self, uri: &PartUri) -> bool {
        self.parts.contains_key(uri)
    }

    /// Check whether a part exists, comparing names case-insensitively
    /// as OPC part names are
    pub fn has_part_ignore_case(&self, uri: &PartUri) -> bool {
        self.parts
            .keys()
            .any(|p| p.as_str().eq_ignore_ascii_case(uri.as_str()))
    }

    /// Read the raw bytes of a part by name (e.g. `word/document.xml`)
    pub fn read_part(&self, name: &str) -> Option<&[u8]> {
        let uri = PartUri::new(name).ok()?;
        self.parts.get(&uri).map(Part::data)
    }

    /// Stage new bytes for a part, creating it if it does not exist.
    ///
    /// New parts take their content type from the registry (override or
    /// extension default); registering an override is left to the caller.
    pub fn write_part(&mut self, uri: &PartUri, data: Vec<u8>) {
        if let Some(part) = self.parts.get_mut(uri) {
            part.set_data(data);
            return;
        }

        let content_type = self
            .content_types
            .get(uri)
            .unwrap_or("application/octet-stream")
            .to_string();
        let mut part = Part::new(uri.clone(), content_type, data);
        part.mark_modified();
        self.insert_part(part);
    }

    /// Get a part by URI
    pub fn part(&self, uri: &PartUri) -> Option<&Part> {
        self.parts.get(uri)
    }

    /// Get a mutable part by URI
    pub fn part_mut(&mut self, uri: &PartUri) -> Option<&mut Part> {
        self.parts.get_mut(uri)
    }

    /// Add a part to the package and register its content type override
    pub fn add_part(&mut self, part: Part) {
        self.content_types
            .add_override(part.uri(), part.content_type());
        self.insert_part(part);
    }

    /// Get all part URIs in archive order
    pub fn part_uris(&self) -> impl Iterator<Item = &PartUri> {
        self.order.iter()
    }

    /// Get package-level relationships
    pub fn relationships(&self) -> &Relationships {
        &self.relationships
    }

    /// Get mutable package-level relationships
    pub fn relationships_mut(&mut self) -> &mut Relationships {
        &mut self.relationships
    }

    /// Get content types
    pub fn content_types(&self) -> &ContentTypes {
        &self.content_types
    }

    /// Get mutable content types
    pub fn content_types_mut(&mut self) -> &mut ContentTypes {
        &mut self.content_types
    }

    /// URI of the main document part, from the package relationships
    pub fn main_document_uri(&self) -> Option<PartUri> {
        let rel = self.relationships.by_type(rel_types::OFFICE_DOCUMENT)?;
        PartUri::new(&rel.target).ok()
    }

    /// Get the main document part
    pub fn main_document_part(&self) -> Option<&Part> {
        self.parts.get(&self.main_document_uri()?)
    }

    /// Get the main document part mutably
    pub fn main_document_part_mut(&mut self) -> Option<&mut Part> {
        let uri = self.main_document_uri()?;
        self.parts.get_mut(&uri)
    }

    // === Private methods ===

    fn insert_part(&mut self, part: Part) {
        let uri = part.uri().clone();
        if self.parts.insert(uri.clone(), part).is_none() {
            self.order.push(uri);
        }
    }

    fn read_content_types<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<ContentTypes> {
        let mut file = archive
            .by_name(CONTENT_TYPES_ENTRY)
            .map_err(|_| Error::MissingPart(CONTENT_TYPES_ENTRY.into()))?;

        let mut content = String::new();
        file.read_to_string(&mut content)?;

        ContentTypes::from_xml(&content).map_err(|e| Error::malformed(CONTENT_TYPES_ENTRY, e))
    }

    fn read_package_rels<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<Relationships> {
        match archive.by_name(PACKAGE_RELS_ENTRY) {
            Ok(mut file) => {
                let mut content = String::new();
                file.read_to_string(&mut content)?;
                Relationships::from_xml(&content)
                    .map_err(|e| Error::malformed(PACKAGE_RELS_ENTRY, e))
            }
            Err(_) => Ok(Relationships::new()),
        }
    }

    fn read_parts<R: Read + Seek>(&mut self, archive: &mut ZipArchive<R>) -> Result<()> {
        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }

            let name = file.name().to_string();
            if name == CONTENT_TYPES_ENTRY {
                continue;
            }

            let uri = PartUri::new(&name)?;
            // Relationship parts are attached to their source part below
            if uri.is_relationships() {
                continue;
            }

            let content_type = self
                .content_types
                .get(&uri)
                .unwrap_or("application/octet-stream")
                .to_string();

            let mut data = Vec::new();
            file.read_to_end(&mut data)?;

            self.insert_part(Part::new(uri, content_type, data));
        }

        Ok(())
    }

    fn read_part_relationships<R: Read + Seek>(
        &mut self,
        archive: &mut ZipArchive<R>,
    ) -> Result<()> {
        for uri in &self.order {
            let rels_uri = uri.relationships_uri();

            if let Ok(mut file) = archive.by_name(rels_uri.zip_path()) {
                let mut content = String::new();
                file.read_to_string(&mut content)?;
                let rels = Relationships::from_xml(&content)
                    .map_err(|e| Error::malformed(rels_uri.as_str(), e))?;

                if let Some(part) = self.parts.get_mut(uri) {
                    part.set_relationships(rels);
                }
            }
        }

        Ok(())
    }
}

impl Default for Package {
    fn default() -> Self {
        Self::new()
    }
}

/// Sibling path the archive is staged at before replacing `path`
fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}
