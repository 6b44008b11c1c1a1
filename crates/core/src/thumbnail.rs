//! Decode a cover candidate, flatten it to RGB and write it as PNG.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat};

use crate::cover::CoverCandidate;
use crate::error::ThumbError;

/// Directory, next to the EPUB, that receives thumbnails.
pub const THUMB_DIR: &str = "thumb";

#[derive(Debug, Clone)]
pub struct Thumbnail {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// `<dir>/thumb/<file name>.png`, keeping the EPUB's own extension
/// (`book.epub` → `thumb/book.epub.png`).
pub fn thumbnail_path(epub_path: &Path) -> PathBuf {
    let dir = epub_path.parent().unwrap_or(Path::new(""));
    let mut name = epub_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "cover".into());
    name.push(".png");
    dir.join(THUMB_DIR).join(name)
}

/// A cover decoded and re-encoded as PNG, not yet on disk.
#[derive(Debug, Clone)]
pub struct RenderedThumbnail {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Decode the candidate and encode it as an 8-bit RGB PNG. Palette,
/// grayscale, alpha and 16-bit sources all come out as plain RGB.
pub fn render_thumbnail(candidate: &CoverCandidate) -> Result<RenderedThumbnail, ThumbError> {
    let entry = candidate.path.as_str();
    let img = image::load_from_memory(&candidate.data).map_err(|source| ThumbError::Decode {
        entry: entry.to_string(),
        source,
    })?;
    tracing::debug!(
        entry,
        color = ?img.color(),
        width = img.width(),
        height = img.height(),
        "Decoded cover image"
    );

    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut png = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|source| ThumbError::Encode {
            entry: entry.to_string(),
            source,
        })?;
    Ok(RenderedThumbnail {
        png,
        width: rgb.width(),
        height: rgb.height(),
    })
}

impl RenderedThumbnail {
    /// Write the PNG to `out_path`, creating the parent directory.
    /// Nothing is left at `out_path` if the write fails.
    pub fn write_to(&self, out_path: &Path) -> Result<Thumbnail, ThumbError> {
        let io_err = |source: std::io::Error| ThumbError::Io {
            path: out_path.to_path_buf(),
            source,
        };

        if let Some(dir) = out_path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(io_err)?;
        }

        if let Err(e) = fs::write(out_path, &self.png) {
            let _ = fs::remove_file(out_path);
            return Err(io_err(e));
        }

        tracing::info!(
            path = %out_path.display(),
            width = self.width,
            height = self.height,
            "Thumbnail written"
        );
        Ok(Thumbnail {
            path: out_path.to_path_buf(),
            width: self.width,
            height: self.height,
        })
    }
}
