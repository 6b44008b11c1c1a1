//! OPF package document: manifest items and the EPUB2 cover declaration.

use percent_encoding::percent_decode_str;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::Event;
use quick_xml::Reader as XmlReader;

use crate::error::ArchiveError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestItem {
    pub id: String,
    /// Href as written in the package document.
    pub href: String,
    /// Archive entry name the href resolves to, if it stays inside the archive.
    pub path: Option<String>,
    pub media_type: String,
    pub properties: Option<String>,
}

impl ManifestItem {
    pub fn has_property(&self, token: &str) -> bool {
        self.properties
            .as_deref()
            .is_some_and(|p| p.split_ascii_whitespace().any(|t| t == token))
    }

    pub fn is_raster_image(&self) -> bool {
        is_raster_image_media_type(&self.media_type)
    }
}

/// Parsed manifest, items kept in document order.
#[derive(Debug, Clone, Default)]
pub struct OpfManifest {
    items: Vec<ManifestItem>,
    cover_ids: Vec<String>,
}

impl OpfManifest {
    /// Parse a package document located at `package_path` inside the archive.
    pub fn parse(content: &str, package_path: &str) -> Result<Self, ArchiveError> {
        let base_dir = package_path.rfind('/').map_or("", |i| &package_path[..i]);

        let mut reader = XmlReader::from_str(content);
        let mut buf = Vec::new();
        let mut manifest = OpfManifest::default();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                    match e.local_name().as_ref() {
                        b"meta" => {
                            let mut is_cover = false;
                            let mut content = None;
                            for attr in e.attributes().flatten() {
                                match attr.key.local_name().as_ref() {
                                    b"name" => is_cover = attr_value(&attr) == "cover",
                                    b"content" => content = Some(attr_value(&attr)),
                                    _ => {}
                                }
                            }
                            // <meta name="cover" content="cover-image-id"/>
                            if let (true, Some(id)) = (is_cover, content) {
                                if !id.is_empty() {
                                    manifest.cover_ids.push(id);
                                }
                            }
                        }
                        b"item" => {
                            let mut id = String::new();
                            let mut href = String::new();
                            let mut media_type = String::new();
                            let mut properties = None;
                            for attr in e.attributes().flatten() {
                                match attr.key.local_name().as_ref() {
                                    b"id" => id = attr_value(&attr),
                                    b"href" => href = attr_value(&attr),
                                    b"media-type" => media_type = attr_value(&attr),
                                    b"properties" => properties = Some(attr_value(&attr)),
                                    _ => {}
                                }
                            }
                            let path = resolve_href(base_dir, &href);
                            manifest.items.push(ManifestItem {
                                id,
                                href,
                                path,
                                media_type,
                                properties,
                            });
                        }
                        _ => {}
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(ArchiveError::Malformed {
                        file: package_path.to_string(),
                        detail: format!(
                            "XML error at byte {}: {e}",
                            reader.buffer_position()
                        ),
                    });
                }
                _ => {}
            }
            buf.clear();
        }

        Ok(manifest)
    }

    pub fn items(&self) -> &[ManifestItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// First item with the given id.
    pub fn item(&self, id: &str) -> Option<&ManifestItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Ids referenced by `<meta name="cover">`, in document order.
    pub fn cover_ids(&self) -> &[String] {
        &self.cover_ids
    }
}

/// Resolve a manifest href against the package document's directory.
///
/// Drops the fragment, percent-decodes, and normalises `.`/`..` segments.
/// Returns `None` for empty or remote hrefs and for hrefs that climb above
/// the archive root.
pub fn resolve_href(base_dir: &str, href: &str) -> Option<String> {
    let href = href.split('#').next().unwrap_or_default();
    if href.is_empty() || href.contains("://") || href.starts_with("data:") {
        return None;
    }

    let decoded = percent_decode_str(href)
        .decode_utf8()
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| href.to_string());
    let decoded = decoded.replace('\\', "/");

    let base = if decoded.starts_with('/') { "" } else { base_dir };

    let mut segments: Vec<&str> = Vec::new();
    for seg in base.split('/').chain(decoded.split('/')) {
        match seg {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            s => segments.push(s),
        }
    }

    if segments.is_empty() {
        None
    } else {
        Some(segments.join("/"))
    }
}

/// Image media types the decoder can handle; SVG is excluded.
pub fn is_raster_image_media_type(media_type: &str) -> bool {
    let essence = media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence.starts_with("image/") && essence != "image/svg+xml"
}

pub(crate) fn attr_value(attr: &Attribute<'_>) -> String {
    let raw = String::from_utf8_lossy(&attr.value);
    match quick_xml::escape::unescape(&raw) {
        Ok(value) => value.into_owned(),
        Err(_) => raw.to_string(),
    }
}
