//! Fixtures for tests: EPUBs assembled in memory and small encoded images.

use std::io::{Cursor, Write};

use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};

use crate::archive::CONTAINER_PATH;

pub struct EpubBuilder {
    entries: Vec<(String, Vec<u8>)>,
}

impl EpubBuilder {
    pub fn new() -> Self {
        Self {
            entries: vec![("mimetype".into(), b"application/epub+zip".to_vec())],
        }
    }

    pub fn entry(mut self, name: &str, data: impl AsRef<[u8]>) -> Self {
        self.entries.push((name.to_string(), data.as_ref().to_vec()));
        self
    }

    pub fn container(self, package_path: &str) -> Self {
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="{package_path}" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#
        );
        self.entry(CONTAINER_PATH, xml)
    }

    /// container.xml plus the package document itself.
    pub fn package(self, package_path: &str, xml: impl AsRef<[u8]>) -> Self {
        self.container(package_path).entry(package_path, xml)
    }

    pub fn build(self) -> Vec<u8> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let opts: zip::write::FileOptions<'_, ()> = zip::write::FileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        for (name, data) in &self.entries {
            zip.start_file(name.as_str(), opts).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }
}

/// An OPF 3 package document with the given metadata children and manifest items.
pub fn opf(metadata: &str, manifest: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="uid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>Fixture</dc:title>
    {metadata}
  </metadata>
  <manifest>
    {manifest}
  </manifest>
  <spine/>
</package>"#
    )
}

fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), format).unwrap();
    buf
}

/// Solid-colour RGB PNG.
pub fn png(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb(rgb));
    encode(DynamicImage::ImageRgb8(img), ImageFormat::Png)
}

/// Semi-transparent RGBA PNG.
pub fn png_rgba(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, 128]));
    encode(DynamicImage::ImageRgba8(img), ImageFormat::Png)
}

pub fn jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([200, 100, 50]));
    encode(DynamicImage::ImageRgb8(img), ImageFormat::Jpeg)
}

/// GIF is palette-based.
pub fn gif(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([0, 128, 255, 255]));
    encode(DynamicImage::ImageRgba8(img), ImageFormat::Gif)
}
