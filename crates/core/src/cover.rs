//! Locate the cover image inside an EPUB.
//!
//! Strategies run in a fixed priority order, from explicit declarations in
//! the package document down to guesses based on conventional paths. The
//! first one that points at an existing entry wins.

use std::fmt;
use std::io::{Read, Seek};

use serde::Serialize;

use crate::archive::EpubArchive;
use crate::error::ArchiveError;
use crate::opf::{ManifestItem, OpfManifest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CoverStrategy {
    /// `<meta name="cover" content="ID">`
    OpfCoverMeta,
    /// Manifest item with `properties="cover-image"`.
    CoverImageProperty,
    /// Id or filename containing "cover".
    NameHeuristic,
    /// First raster image in the manifest.
    FirstImage,
    /// One of [`COMMON_COVER_PATHS`].
    CommonPath,
}

impl fmt::Display for CoverStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CoverStrategy::OpfCoverMeta => "opf-cover-meta",
            CoverStrategy::CoverImageProperty => "cover-image-property",
            CoverStrategy::NameHeuristic => "name-heuristic",
            CoverStrategy::FirstImage => "first-image",
            CoverStrategy::CommonPath => "common-path",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct CoverCandidate {
    /// Archive entry the bytes were read from.
    pub path: String,
    pub data: Vec<u8>,
    pub strategy: CoverStrategy,
}

/// Checked case-sensitively, in this order.
pub const COMMON_COVER_PATHS: &[&str] = &[
    "cover.jpg",
    "cover.jpeg",
    "cover.png",
    "images/cover.jpg",
    "images/cover.jpeg",
    "images/cover.png",
    "OEBPS/cover.jpg",
    "OEBPS/cover.jpeg",
    "OEBPS/cover.png",
    "OEBPS/images/cover.jpg",
    "OEBPS/images/cover.jpeg",
    "OEBPS/images/cover.png",
];

const RASTER_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".webp"];

struct Lookup<'a> {
    entries: &'a [String],
    manifest: Option<&'a OpfManifest>,
}

impl Lookup<'_> {
    fn exists(&self, path: &str) -> bool {
        self.entries.iter().any(|e| e == path)
    }

    /// Entry name for a manifest item, if that entry is present.
    fn existing(&self, item: &ManifestItem) -> Option<String> {
        match item.path.as_deref() {
            Some(path) if self.exists(path) => Some(path.to_string()),
            _ => {
                tracing::warn!(
                    id = %item.id,
                    href = %item.href,
                    "Manifest item points at a missing entry"
                );
                None
            }
        }
    }

    fn items(&self) -> &[ManifestItem] {
        self.manifest.map(|m| m.items()).unwrap_or(&[])
    }
}

type Strategy = fn(&Lookup<'_>) -> Option<String>;

const STRATEGIES: &[(CoverStrategy, Strategy)] = &[
    (CoverStrategy::OpfCoverMeta, by_cover_meta),
    (CoverStrategy::CoverImageProperty, by_cover_image_property),
    (CoverStrategy::NameHeuristic, by_name_heuristic),
    (CoverStrategy::FirstImage, by_first_image),
    (CoverStrategy::CommonPath, by_common_path),
    // Only reached without a usable manifest, after the conventional paths.
    (CoverStrategy::NameHeuristic, by_entry_name),
];

fn by_cover_meta(lookup: &Lookup<'_>) -> Option<String> {
    let manifest = lookup.manifest?;
    manifest.cover_ids().iter().find_map(|id| match manifest.item(id) {
        Some(item) => lookup.existing(item),
        None => {
            tracing::warn!(%id, "Cover meta references an unknown manifest id");
            None
        }
    })
}

fn by_cover_image_property(lookup: &Lookup<'_>) -> Option<String> {
    lookup
        .items()
        .iter()
        .filter(|item| item.has_property("cover-image"))
        .find_map(|item| lookup.existing(item))
}

fn by_name_heuristic(lookup: &Lookup<'_>) -> Option<String> {
    lookup
        .items()
        .iter()
        .filter(|item| {
            item.is_raster_image()
                && (item.id.to_lowercase().contains("cover")
                    || item.href.to_lowercase().contains("cover"))
        })
        .find_map(|item| lookup.existing(item))
}

fn by_first_image(lookup: &Lookup<'_>) -> Option<String> {
    lookup
        .items()
        .iter()
        .filter(|item| item.is_raster_image())
        .find_map(|item| lookup.existing(item))
}

fn by_common_path(lookup: &Lookup<'_>) -> Option<String> {
    COMMON_COVER_PATHS
        .iter()
        .find(|path| lookup.exists(path))
        .map(|path| path.to_string())
}

/// Archive entry whose name contains "cover" and has a raster extension.
fn by_entry_name(lookup: &Lookup<'_>) -> Option<String> {
    if !lookup.items().is_empty() {
        return None;
    }
    lookup
        .entries
        .iter()
        .find(|name| {
            let lower = name.to_lowercase();
            lower.contains("cover") && RASTER_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
        })
        .cloned()
}

/// Run the strategy chain over entry names and an optional manifest.
/// Pass `None` when the package document could not be parsed.
pub fn locate_cover(
    entries: &[String],
    manifest: Option<&OpfManifest>,
) -> Option<(CoverStrategy, String)> {
    let lookup = Lookup { entries, manifest };
    STRATEGIES.iter().find_map(|(strategy, find)| {
        tracing::debug!(%strategy, "Trying cover strategy");
        find(&lookup).map(|path| (*strategy, path))
    })
}

/// Locate the cover and read its bytes. `Ok(None)` means no strategy matched.
pub fn resolve_cover<R: Read + Seek>(
    archive: &mut EpubArchive<R>,
    manifest: Option<&OpfManifest>,
) -> Result<Option<CoverCandidate>, ArchiveError> {
    let Some((strategy, path)) = locate_cover(archive.entry_names(), manifest) else {
        return Ok(None);
    };
    tracing::info!(%strategy, entry = %path, "Cover image located");

    let data = archive.read(&path)?;
    Ok(Some(CoverCandidate {
        path,
        data,
        strategy,
    }))
}
