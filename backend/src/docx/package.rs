//! In-memory view of a DOCX (zip) package.

use std::io::{Cursor, Read, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::error::PackageError;

pub const MAIN_DOCUMENT: &str = "word/document.xml";
pub const CONTENT_TYPES: &str = "[Content_Types].xml";

/// MIME type of a generated `.docx` file.
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

struct Entry {
    name: String,
    data: Vec<u8>,
}

/// All entries of a DOCX archive, kept in their original order.
pub struct DocxPackage {
    entries: Vec<Entry>,
}

impl DocxPackage {
    /// Reads every entry of the archive. Fails unless the archive contains
    /// the main document part.
    pub fn from_bytes(bytes: &[u8]) -> Result<DocxPackage, PackageError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut entries = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)?;
            entries.push(Entry {
                name: file.name().to_string(),
                data,
            });
        }

        let package = DocxPackage { entries };
        if package.part(MAIN_DOCUMENT).is_none() {
            return Err(PackageError::MissingPart(MAIN_DOCUMENT.to_string()));
        }
        Ok(package)
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.data.as_slice())
    }

    pub fn part_text(&self, name: &str) -> Result<Option<&str>, PackageError> {
        self.part(name)
            .map(|data| std::str::from_utf8(data).map_err(|_| PackageError::Encoding(name.to_string())))
            .transpose()
    }

    /// Replaces a part, or appends it when the package does not have it yet.
    pub fn set_part(&mut self, name: &str, data: Vec<u8>) {
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(entry) => entry.data = data,
            None => self.entries.push(Entry {
                name: name.to_string(),
                data,
            }),
        }
    }

    #[cfg(test)]
    pub fn has_part(&self, name: &str) -> bool {
        self.part(name).is_some()
    }

    /// Parts that may carry template tags: the main document, headers and
    /// footers.
    pub fn templated_parts(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| e.name.as_str())
            .filter(|name| {
                *name == MAIN_DOCUMENT
                    || (name.starts_with("word/header") || name.starts_with("word/footer"))
                        && name.ends_with(".xml")
            })
            .map(str::to_string)
            .collect()
    }

    /// Serializes the package as a deflate-compressed zip archive.
    pub fn to_bytes(&self) -> Result<Vec<u8>, PackageError> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for entry in &self.entries {
            writer.start_file(entry.name.as_str(), options)?;
            writer.write_all(&entry.data)?;
        }
        Ok(writer.finish()?.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::testing::docx_with_body;

    #[test]
    fn rejects_bytes_that_are_not_zip() {
        let err = DocxPackage::from_bytes(b"plain text").err().unwrap();
        assert!(matches!(err, PackageError::Zip(_)));
    }

    #[test]
    fn rejects_archive_without_main_document() {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("word/styles.xml", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"<w:styles/>").unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let err = DocxPackage::from_bytes(&bytes).err().unwrap();
        assert!(matches!(err, PackageError::MissingPart(ref p) if p == MAIN_DOCUMENT));
    }

    #[test]
    fn round_trips_parts() {
        let mut package = DocxPackage::from_bytes(&docx_with_body("<w:p/>")).unwrap();
        package.set_part("word/media/a.png", vec![1, 2, 3]);

        let reopened = DocxPackage::from_bytes(&package.to_bytes().unwrap()).unwrap();
        assert_eq!(reopened.part("word/media/a.png"), Some(&[1u8, 2, 3][..]));
        assert!(reopened.has_part(CONTENT_TYPES));
        assert_eq!(reopened.templated_parts(), vec![MAIN_DOCUMENT.to_string()]);
    }
}
