//! Read-only view over an EPUB's ZIP container.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader as XmlReader;

use crate::error::ArchiveError;
use crate::opf::attr_value;
use crate::security::{self, SecurityLimits};

pub const CONTAINER_PATH: &str = "META-INF/container.xml";

/// Named entries of an EPUB, listed in central-directory order.
pub struct EpubArchive<R> {
    zip: zip::ZipArchive<R>,
    names: Vec<String>,
    limits: SecurityLimits,
}

impl EpubArchive<BufReader<File>> {
    pub fn open(path: &Path, limits: &SecurityLimits) -> Result<Self, ArchiveError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file), limits)
    }
}

impl<R: Read + Seek> EpubArchive<R> {
    pub fn from_reader(reader: R, limits: &SecurityLimits) -> Result<Self, ArchiveError> {
        let mut zip = zip::ZipArchive::new(reader)?;
        security::check_file_count(zip.len() as u64, limits)?;

        let mut names = Vec::with_capacity(zip.len());
        for i in 0..zip.len() {
            // Raw access: only the header is needed, and encrypted entries stay listable.
            let entry = zip.by_index_raw(i)?;
            names.push(entry.name().to_string());
        }

        Ok(Self {
            zip,
            names,
            limits: limits.clone(),
        })
    }

    pub fn entry_names(&self) -> &[String] {
        &self.names
    }

    /// Case-sensitive existence check.
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn read(&mut self, name: &str) -> Result<Vec<u8>, ArchiveError> {
        security::check_path_traversal(name)?;

        let mut file = self.zip.by_name(name).map_err(|e| match e {
            zip::result::ZipError::FileNotFound => ArchiveError::MissingEntry(name.to_string()),
            other => ArchiveError::Zip(other),
        })?;
        security::check_resource_size(name, file.size(), &self.limits)?;

        let mut buf = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut buf)
            .map_err(|e| ArchiveError::Malformed {
                file: name.to_string(),
                detail: format!("Failed to read entry: {e}"),
            })?;
        Ok(buf)
    }

    /// Path of the package document, from the first `rootfile` in container.xml.
    pub fn package_path(&mut self) -> Result<String, ArchiveError> {
        let bytes = self.read(CONTAINER_PATH)?;
        let container = String::from_utf8(bytes).map_err(|e| ArchiveError::Malformed {
            file: CONTAINER_PATH.into(),
            detail: format!("Invalid UTF-8: {e}"),
        })?;

        let mut reader = XmlReader::from_str(&container);
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                    if e.local_name().as_ref() == b"rootfile" =>
                {
                    for attr in e.attributes().flatten() {
                        if attr.key.local_name().as_ref() == b"full-path" {
                            let path = attr_value(&attr);
                            if !path.is_empty() {
                                return Ok(path);
                            }
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(ArchiveError::Malformed {
                        file: CONTAINER_PATH.into(),
                        detail: e.to_string(),
                    });
                }
                _ => {}
            }
            buf.clear();
        }

        Err(ArchiveError::Malformed {
            file: CONTAINER_PATH.into(),
            detail: "No rootfile with a full-path found".into(),
        })
    }
}
