//! Thumbnail pipeline: open → locate package → resolve cover → write PNG.

use std::io::{Read, Seek};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::archive::EpubArchive;
use crate::cover::{resolve_cover, CoverStrategy};
use crate::error::{ArchiveError, ThumbError};
use crate::opf::OpfManifest;
use crate::security::SecurityLimits;
use crate::thumbnail::{render_thumbnail, thumbnail_path};

#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    pub security: SecurityLimits,
    /// Replace an existing thumbnail.
    pub overwrite: bool,
}

/// Outcome of one run, printed by the CLI with `--json`.
#[derive(Debug, Clone, Serialize)]
pub struct ThumbnailReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub source_entry: String,
    pub strategy: CoverStrategy,
    /// Dimensions of the written PNG; `None` when the write was skipped.
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// The thumbnail already existed and was left untouched.
    pub skipped: bool,
}

/// Locate and parse the package document.
///
/// A missing container, rootfile or package entry is an error. A package
/// document that is not well-formed XML yields `Ok(None)` so the resolver
/// can still fall back to scanning archive entries.
pub fn load_manifest<R: Read + Seek>(
    archive: &mut EpubArchive<R>,
) -> Result<Option<OpfManifest>, ArchiveError> {
    let package_path = archive.package_path()?;
    tracing::debug!(package = %package_path, "Found package document");

    let bytes = archive.read(&package_path)?;
    let content = String::from_utf8_lossy(&bytes);
    match OpfManifest::parse(&content, &package_path) {
        Ok(manifest) => {
            tracing::debug!(items = manifest.items().len(), "Parsed manifest");
            Ok(Some(manifest))
        }
        Err(e) => {
            tracing::warn!("Manifest unusable, falling back to archive entries: {e}");
            Ok(None)
        }
    }
}

/// Write `<dir>/thumb/<file name>.png` for the EPUB at `epub_path`.
pub fn extract_thumbnail(
    epub_path: &Path,
    opts: &ExtractOptions,
) -> Result<ThumbnailReport, ThumbError> {
    tracing::info!(path = %epub_path.display(), "Processing EPUB");
    let invalid = |e: ArchiveError| ThumbError::invalid_archive(epub_path, e);

    let mut archive = EpubArchive::open(epub_path, &opts.security).map_err(invalid)?;
    let manifest = load_manifest(&mut archive).map_err(invalid)?;
    let candidate = resolve_cover(&mut archive, manifest.as_ref())
        .map_err(invalid)?
        .ok_or_else(|| ThumbError::NotFound {
            path: epub_path.to_path_buf(),
        })?;
    drop(archive);

    // A broken cover fails even when a thumbnail is already on disk.
    let rendered = render_thumbnail(&candidate)?;

    let output = thumbnail_path(epub_path);
    let mut report = ThumbnailReport {
        input: epub_path.to_path_buf(),
        output: output.clone(),
        source_entry: candidate.path.clone(),
        strategy: candidate.strategy,
        width: None,
        height: None,
        skipped: false,
    };

    if !opts.overwrite && output.exists() {
        tracing::info!(path = %output.display(), "Thumbnail already exists, skipping");
        report.skipped = true;
        return Ok(report);
    }

    let thumb = rendered.write_to(&output)?;
    report.width = Some(thumb.width);
    report.height = Some(thumb.height);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{opf, png, png_rgba, EpubBuilder};
    use image::ColorType;
    use pretty_assertions::assert_eq;
    use std::fs;

    fn write_book(dir: &Path, name: &str, bytes: Vec<u8>) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn cover_image_property_book_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let xml = opf(
            "",
            r#"<item id="cover-image" href="images/cover.jpg" media-type="image/jpeg" properties="cover-image"/>
               <item id="other" href="images/other.png" media-type="image/png"/>"#,
        );
        // The "jpg" is really a PNG; decoding sniffs the content.
        let book = EpubBuilder::new()
            .package("OEBPS/content.opf", xml)
            .entry("OEBPS/images/cover.jpg", png_rgba(6, 9))
            .entry("OEBPS/images/other.png", png(2, 2, [0, 0, 0]))
            .build();
        let epub = write_book(dir.path(), "foo.epub", book);

        let report = extract_thumbnail(&epub, &ExtractOptions::default()).unwrap();
        assert_eq!(report.output, dir.path().join("thumb").join("foo.epub.png"));
        assert_eq!(report.source_entry, "OEBPS/images/cover.jpg");
        assert_eq!(report.strategy, CoverStrategy::CoverImageProperty);
        assert_eq!((report.width, report.height), (Some(6), Some(9)));
        assert!(!report.skipped);

        let img = image::open(&report.output).unwrap();
        assert_eq!(img.color(), ColorType::Rgb8);
    }

    #[test]
    fn existing_thumbnail_is_kept_unless_overwriting() {
        let dir = tempfile::tempdir().unwrap();
        let book = EpubBuilder::new()
            .package("content.opf", opf("", r#"<item id="c" href="c.png" media-type="image/png"/>"#))
            .entry("c.png", png(2, 2, [1, 2, 3]))
            .build();
        let epub = write_book(dir.path(), "bar.epub", book);
        let out = thumbnail_path(&epub);
        fs::create_dir_all(out.parent().unwrap()).unwrap();
        fs::write(&out, b"placeholder").unwrap();

        let report = extract_thumbnail(&epub, &ExtractOptions::default()).unwrap();
        assert!(report.skipped);
        assert_eq!(report.width, None);
        assert_eq!(fs::read(&out).unwrap(), b"placeholder");

        let opts = ExtractOptions {
            overwrite: true,
            ..ExtractOptions::default()
        };
        let report = extract_thumbnail(&epub, &opts).unwrap();
        assert!(!report.skipped);
        assert_eq!(image::open(&out).unwrap().color(), ColorType::Rgb8);
    }

    #[test]
    fn malformed_zip_is_invalid_archive() {
        let dir = tempfile::tempdir().unwrap();
        let epub = write_book(dir.path(), "broken.epub", b"PK\x03\x04garbage".to_vec());
        let err = extract_thumbnail(&epub, &ExtractOptions::default()).unwrap_err();
        assert_eq!(err.kind(), "InvalidArchiveError");
        assert!(!dir.path().join("thumb").exists());
    }

    #[test]
    fn missing_file_is_invalid_archive() {
        let dir = tempfile::tempdir().unwrap();
        let err = extract_thumbnail(&dir.path().join("nope.epub"), &ExtractOptions::default())
            .unwrap_err();
        assert_eq!(err.kind(), "InvalidArchiveError");
    }

    #[test]
    fn missing_package_document_is_invalid_archive() {
        let dir = tempfile::tempdir().unwrap();
        let book = EpubBuilder::new()
            .container("OEBPS/content.opf")
            .entry("OEBPS/cover.jpg", png(1, 1, [0, 0, 0]))
            .build();
        let epub = write_book(dir.path(), "nopkg.epub", book);
        let err = extract_thumbnail(&epub, &ExtractOptions::default()).unwrap_err();
        assert_eq!(err.kind(), "InvalidArchiveError");
        assert!(err.to_string().contains("OEBPS/content.opf"));
    }

    #[test]
    fn no_cover_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let book = EpubBuilder::new()
            .package("content.opf", opf("", ""))
            .entry("chapter.xhtml", "<html/>")
            .build();
        let epub = write_book(dir.path(), "plain.epub", book);
        let err = extract_thumbnail(&epub, &ExtractOptions::default()).unwrap_err();
        assert_eq!(err.kind(), "NotFoundError");
        assert!(!dir.path().join("thumb").exists());
    }

    #[test]
    fn undecodable_cover_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let book = EpubBuilder::new()
            .package(
                "content.opf",
                opf(
                    r#"<meta name="cover" content="c"/>"#,
                    r#"<item id="c" href="cover.jpg" media-type="image/jpeg"/>"#,
                ),
            )
            .entry("cover.jpg", b"\xff\xd8 truncated")
            .build();
        let epub = write_book(dir.path(), "bad-cover.epub", book);
        let err = extract_thumbnail(&epub, &ExtractOptions::default()).unwrap_err();
        assert_eq!(err.kind(), "DecodeError");
        assert!(!thumbnail_path(&epub).exists());
    }

    #[test]
    fn undecodable_cover_fails_even_with_existing_thumbnail() {
        let dir = tempfile::tempdir().unwrap();
        let book = EpubBuilder::new()
            .package(
                "content.opf",
                opf("", r#"<item id="c" href="cover.png" media-type="image/png"/>"#),
            )
            .entry("cover.png", b"not a png at all")
            .build();
        let epub = write_book(dir.path(), "stale.epub", book);
        let out = thumbnail_path(&epub);
        fs::create_dir_all(out.parent().unwrap()).unwrap();
        fs::write(&out, b"previous").unwrap();

        let err = extract_thumbnail(&epub, &ExtractOptions::default()).unwrap_err();
        assert_eq!(err.kind(), "DecodeError");
        assert_eq!(fs::read(&out).unwrap(), b"previous");
    }

    #[test]
    fn oversized_cover_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let book = EpubBuilder::new()
            .package("content.opf", opf("", ""))
            .entry("cover.png", vec![0u8; 2 * 1024 * 1024])
            .build();
        let epub = write_book(dir.path(), "huge.epub", book);
        let opts = ExtractOptions {
            security: SecurityLimits {
                max_resource_size_bytes: 1024 * 1024,
                ..SecurityLimits::default()
            },
            ..ExtractOptions::default()
        };
        let err = extract_thumbnail(&epub, &opts).unwrap_err();
        assert_eq!(err.kind(), "InvalidArchiveError");
    }
}
