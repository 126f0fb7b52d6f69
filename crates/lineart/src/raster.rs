use std::path::Path;

use image::{imageops::FilterType, DynamicImage, ImageFormat, Rgba, RgbaImage};

use crate::error::{LineArtError, Result};

/// Longest side, in pixels, of a buffer prepared for display and processing.
pub const MAX_DISPLAY_DIMENSION: u32 = 500;

/// Bytes per pixel (red, green, blue, alpha).
pub const CHANNELS: usize = 4;

/// An RGBA pixel grid with `data.len() == width * height * 4`.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterBuffer {
    image: RgbaImage,
}

impl RasterBuffer {
    /// Build from a flat RGBA byte sequence.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * CHANNELS;
        if data.len() != expected {
            return Err(LineArtError::InvalidInput(format!(
                "expected {expected} bytes for a {width}x{height} RGBA buffer, got {}",
                data.len()
            )));
        }
        RgbaImage::from_raw(width, height, data)
            .map(Self::from_rgba)
            .ok_or_else(|| LineArtError::InvalidInput("malformed RGBA buffer".to_string()))
    }

    /// A transparent canvas.
    pub fn blank(width: u32, height: u32) -> Self {
        Self::from_rgba(RgbaImage::new(width, height))
    }

    pub fn filled(width: u32, height: u32, color: Rgba<u8>) -> Self {
        Self::from_rgba(RgbaImage::from_pixel(width, height, color))
    }

    pub fn from_rgba(image: RgbaImage) -> Self {
        Self { image }
    }

    pub fn from_dynamic(image: &DynamicImage) -> Self {
        Self::from_rgba(image.to_rgba8())
    }

    /// Decode an encoded image. When `mime` is given it must be `image/*`;
    /// otherwise the format is sniffed from the bytes.
    pub fn decode(bytes: &[u8], mime: Option<&str>) -> Result<Self> {
        let format = match mime {
            Some(mime) => {
                check_image_mime(mime)?;
                ImageFormat::from_mime_type(mime)
            }
            None => None,
        };
        let format = match format {
            Some(format) => format,
            None => image::guess_format(bytes)
                .map_err(|_| LineArtError::InvalidInput("unrecognised image data".to_string()))?,
        };
        let decoded = image::load_from_memory_with_format(bytes, format)?;
        Ok(Self::from_dynamic(&decoded))
    }

    /// Decode an image file, rejecting files that are not images.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let format = ImageFormat::from_path(path)
            .ok()
            .or_else(|| image::guess_format(&bytes).ok())
            .ok_or_else(|| LineArtError::InvalidInput(format!("{} is not an image", path.display())))?;
        let decoded = image::load_from_memory_with_format(&bytes, format)?;
        Ok(Self::from_dynamic(&decoded))
    }

    /// [`open`](Self::open) followed by [`fit_within`](Self::fit_within) the display cap.
    pub fn open_for_display<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::open(path)?.fit_within(MAX_DISPLAY_DIMENSION))
    }

    /// Scale down so the longest side is at most `max`, keeping the aspect
    /// ratio. The scaled side is truncated to whole pixels. Never upscales.
    pub fn fit_within(&self, max: u32) -> Self {
        let (width, height) = fitted_dimensions(self.width(), self.height(), max);
        if (width, height) == (self.width(), self.height()) {
            return self.clone();
        }
        Self::from_rgba(image::imageops::resize(
            &self.image,
            width,
            height,
            FilterType::Triangle,
        ))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Flat RGBA bytes in row-major order.
    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn as_rgba(&self) -> &RgbaImage {
        &self.image
    }

    pub fn as_rgba_mut(&mut self) -> &mut RgbaImage {
        &mut self.image
    }

    pub fn into_rgba(self) -> RgbaImage {
        self.image
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba<u8>> {
        (x < self.width() && y < self.height()).then(|| *self.image.get_pixel(x, y))
    }
}

/// Accept only `image/*` MIME types.
pub fn check_image_mime(mime: &str) -> Result<()> {
    let essence = mime.split(';').next().unwrap_or_default().trim();
    match essence.split_once('/') {
        Some((top, sub)) if top.eq_ignore_ascii_case("image") && !sub.is_empty() => Ok(()),
        _ => Err(LineArtError::InvalidInput(format!("{mime} is not an image type"))),
    }
}

fn fitted_dimensions(width: u32, height: u32, max: u32) -> (u32, u32) {
    let (mut w, mut h) = (f64::from(width), f64::from(height));
    let max = f64::from(max);
    if w > h {
        if w > max {
            h *= max / w;
            w = max;
        }
    } else if h > max {
        w *= max / h;
        h = max;
    }
    ((w as u32).max(1), (h as u32).max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn from_raw_checks_length() {
        assert!(RasterBuffer::from_raw(2, 2, vec![0; 16]).is_ok());
        let err = RasterBuffer::from_raw(2, 2, vec![0; 15]).unwrap_err();
        assert!(matches!(err, LineArtError::InvalidInput(_)));
    }

    #[test]
    fn mime_check_accepts_only_images() {
        assert!(check_image_mime("image/png").is_ok());
        assert!(check_image_mime("IMAGE/jpeg; charset=binary").is_ok());
        assert!(check_image_mime("text/plain").is_err());
        assert!(check_image_mime("image/").is_err());
        assert!(check_image_mime("application/octet-stream").is_err());
    }

    #[test]
    fn fit_keeps_aspect_ratio_and_truncates() {
        assert_eq!(fitted_dimensions(1000, 600, 500), (500, 300));
        assert_eq!(fitted_dimensions(600, 1000, 500), (300, 500));
        assert_eq!(fitted_dimensions(1500, 1000, 500), (500, 333));
        assert_eq!(fitted_dimensions(800, 800, 500), (500, 500));
    }

    #[test]
    fn fit_never_upscales() {
        let small = RasterBuffer::blank(120, 80);
        assert_eq!(small.fit_within(MAX_DISPLAY_DIMENSION).dimensions(), (120, 80));
        let large = RasterBuffer::blank(1000, 250);
        assert_eq!(large.fit_within(MAX_DISPLAY_DIMENSION).dimensions(), (500, 125));
    }

    #[test]
    fn decode_rejects_non_image_mime() {
        let err = RasterBuffer::decode(b"hello", Some("text/plain")).unwrap_err();
        assert!(matches!(err, LineArtError::InvalidInput(_)));
    }

    #[test]
    fn decode_sniffs_png_without_mime() {
        let source = RgbaImage::from_pixel(3, 2, Rgba([10, 20, 30, 255]));
        let mut bytes = Cursor::new(Vec::new());
        source
            .write_to(&mut bytes, ImageFormat::Png)
            .expect("encode png");

        let decoded = RasterBuffer::decode(bytes.get_ref(), None).expect("decode png");
        assert_eq!(decoded.dimensions(), (3, 2));
        assert_eq!(decoded.pixel(2, 1), Some(Rgba([10, 20, 30, 255])));
        assert_eq!(decoded.pixel(3, 0), None);
    }
}
