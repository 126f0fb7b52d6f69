use std::{io::Cursor, path::Path};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::ImageFormat;

use crate::{error::Result, raster::RasterBuffer};

/// File name offered for raster downloads.
pub const DEFAULT_PNG_NAME: &str = "traced-image.png";

impl RasterBuffer {
    /// Encode as PNG.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::new());
        self.as_rgba().write_to(&mut cursor, ImageFormat::Png)?;
        Ok(cursor.into_inner())
    }

    /// Encode as a `data:image/png;base64,...` URL.
    pub fn to_png_data_url(&self) -> Result<String> {
        let bytes = self.to_png_bytes()?;
        Ok(format!("data:image/png;base64,{}", STANDARD.encode(bytes)))
    }

    /// Save PNG to file
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_png_bytes()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn png_bytes_decode_back_to_the_same_pixels() {
        let mut buffer = RasterBuffer::filled(4, 3, Rgba([255, 255, 255, 255]));
        buffer.as_rgba_mut().put_pixel(1, 2, Rgba([0, 0, 0, 255]));

        let bytes = buffer.to_png_bytes().expect("encode");
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
        let decoded = RasterBuffer::decode(&bytes, Some("image/png")).expect("decode");
        assert_eq!(decoded, buffer);
    }

    #[test]
    fn data_url_has_png_prefix() {
        let url = RasterBuffer::blank(2, 2).to_png_data_url().expect("data url");
        assert!(url.starts_with("data:image/png;base64,iVBORw0KGgo"));
    }

    #[test]
    fn save_png_writes_a_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(DEFAULT_PNG_NAME);
        RasterBuffer::blank(3, 3).save_png(&path).expect("save");
        let reopened = RasterBuffer::open(&path).expect("reopen");
        assert_eq!(reopened.dimensions(), (3, 3));
    }
}
