//! Raster image to single-page PDF.
//!
//! Pipeline: decode, bound width, flatten to RGB, JPEG encode with a
//! two-step quality ladder, embed as a `DCTDecode` image XObject on a page
//! the size of the image.
//!
//! Alpha is dropped, not composited: transparent pixels keep their stored
//! colour channels and show on the opaque page.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageEncoder, ImageReader, Limits, RgbImage};
use lopdf::{Dictionary, Object, Stream};
use tracing::debug;

use super::writer::PdfBuilder;
use crate::config::ImageConfig;
use crate::error::{Error, Result};

/// JPEG bytes ready to embed, with the dimensions and quality used.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub width: u32,
    pub height: u32,
    pub quality: u8,
    pub jpeg: Vec<u8>,
}

/// Converts raster images (any format the `image` crate decodes) to PDF.
#[derive(Debug, Clone)]
pub struct ImageConverter {
    config: ImageConfig,
}

impl ImageConverter {
    pub const fn new(config: ImageConfig) -> Self {
        Self { config }
    }

    pub fn convert(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        let prepared = self.prepare(bytes)?;
        wrap_jpeg(&prepared)
    }

    /// Run every step except the PDF wrapping.
    pub fn prepare(&self, bytes: &[u8]) -> Result<PreparedImage> {
        let image = self.decode(bytes)?;
        let image = self.fit_width(image);
        let rgb = flatten(image);

        let (jpeg, quality) = self.encode_with_ladder(&rgb)?;
        debug!(
            "Encoded {}x{} image at quality {} ({} bytes)",
            rgb.width(),
            rgb.height(),
            quality,
            jpeg.len()
        );

        Ok(PreparedImage {
            width: rgb.width(),
            height: rgb.height(),
            quality,
            jpeg,
        })
    }

    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage> {
        let (width, height) = reader(bytes)?
            .into_dimensions()
            .map_err(|e| Error::Decoding(format!("unreadable image header: {e}")))?;

        if u64::from(width) * u64::from(height) > self.config.max_pixels {
            return Err(Error::ImageTooLarge {
                width,
                height,
                max_pixels: self.config.max_pixels,
            });
        }

        let mut limits = Limits::default();
        limits.max_image_width = Some(width);
        limits.max_image_height = Some(height);

        let mut reader = reader(bytes)?;
        reader.limits(limits);
        reader
            .decode()
            .map_err(|e| Error::Decoding(format!("failed to decode image: {e}")))
    }

    fn fit_width(&self, image: DynamicImage) -> DynamicImage {
        let max_width = self.config.max_width;
        if image.width() <= max_width {
            return image;
        }

        let height = scaled_height(image.width(), image.height(), max_width);
        debug!(
            "Downscaling {}x{} to {}x{}",
            image.width(),
            image.height(),
            max_width,
            height
        );
        image.resize_exact(max_width, height, FilterType::Lanczos3)
    }

    /// High quality first; one fallback to low quality when the result is
    /// over the size threshold. The fallback is kept whatever its size.
    fn encode_with_ladder(&self, rgb: &RgbImage) -> Result<(Vec<u8>, u8)> {
        let high = encode_jpeg(rgb, self.config.high_quality)?;
        if high.len() <= self.config.size_threshold_bytes {
            return Ok((high, self.config.high_quality));
        }

        debug!(
            "Quality {} produced {} bytes, re-encoding at {}",
            self.config.high_quality,
            high.len(),
            self.config.low_quality
        );
        let low = encode_jpeg(rgb, self.config.low_quality)?;
        Ok((low, self.config.low_quality))
    }
}

fn reader(bytes: &[u8]) -> Result<ImageReader<Cursor<&[u8]>>> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| Error::Decoding(format!("failed to read image: {e}")))?;

    if reader.format().is_none() {
        return Err(Error::Decoding("unrecognized image format".to_string()));
    }
    Ok(reader)
}

/// `round(height * target_width / width)`, never zero.
pub fn scaled_height(width: u32, height: u32, target_width: u32) -> u32 {
    let width = u64::from(width.max(1));
    let scaled = (u64::from(height) * u64::from(target_width) * 2 + width) / (width * 2);
    u32::try_from(scaled).unwrap_or(u32::MAX).max(1)
}

fn flatten(image: DynamicImage) -> RgbImage {
    match image {
        DynamicImage::ImageRgb8(rgb) => rgb,
        other => other.to_rgb8(),
    }
}

pub fn encode_jpeg(rgb: &RgbImage, quality: u8) -> Result<Vec<u8>> {
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, quality)
        .write_image(
            rgb.as_raw(),
            rgb.width(),
            rgb.height(),
            image::ExtendedColorType::Rgb8,
        )
        .map_err(|e| Error::Conversion(format!("failed to encode JPEG: {e}")))?;
    Ok(jpeg)
}

/// Single page, 1 px = 1 pt, image drawn edge to edge.
fn wrap_jpeg(image: &PreparedImage) -> Result<Vec<u8>> {
    let mut builder = PdfBuilder::new();

    let mut xobject = Stream::new(
        Dictionary::from_iter([
            ("Type", Object::Name(b"XObject".to_vec())),
            ("Subtype", Object::Name(b"Image".to_vec())),
            ("Width", Object::Integer(i64::from(image.width))),
            ("Height", Object::Integer(i64::from(image.height))),
            ("ColorSpace", Object::Name(b"DeviceRGB".to_vec())),
            ("BitsPerComponent", Object::Integer(8)),
            ("Filter", Object::Name(b"DCTDecode".to_vec())),
        ]),
        image.jpeg.clone(),
    );
    // Already compressed
    xobject.allows_compression = false;
    let image_id = builder.add_object(xobject);

    let resources = Dictionary::from_iter([(
        "XObject",
        Object::Dictionary(Dictionary::from_iter([("Im0", Object::Reference(image_id))])),
    )]);
    let content = format!(
        "q\n{w} 0 0 {h} 0 0 cm\n/Im0 Do\nQ\n",
        w = image.width,
        h = image.height
    );

    #[allow(clippy::cast_precision_loss)]
    builder.add_page(
        image.width as f32,
        image.height as f32,
        resources,
        content.into_bytes(),
    );

    builder
        .finish(false)
        .map_err(|e| Error::Conversion(format!("failed to write PDF: {e}")))
}
