//! Image encoding: file on disk → RGB → JPEG → base64.
//!
//! Vision APIs accept images as base64 data URIs embedded in the JSON
//! request body. Photos and scans are re-encoded as JPEG to keep payloads
//! small; JPEG only stores 8-bit RGB (or gray), so every other color layout
//! (palette, alpha, 16-bit, gray) is converted to RGB first. Alpha is dropped.

use crate::error::ImageError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{ColorType, DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// MIME type of every encoded image.
pub const JPEG_MIME: &str = "image/jpeg";

/// A JPEG image as base64 text, ready to embed in a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    /// Standard-alphabet, padded base64 of the JPEG bytes.
    pub base64: String,
    pub width: u32,
    pub height: u32,
}

impl EncodedImage {
    /// `data:image/jpeg;base64,...` form used in `image_url` parts.
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", JPEG_MIME, self.base64)
    }

    /// Decode back into raw JPEG bytes.
    pub fn jpeg_bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(&self.base64)
    }
}

/// Open, normalise, and encode the image at `path`.
///
/// The source file is only read. The format is sniffed from the content, so
/// a JPEG saved with a `.png` extension still decodes.
pub fn encode_file(path: &Path) -> Result<EncodedImage, ImageError> {
    let read_err = |detail: String| ImageError::ImageRead {
        path: path.to_path_buf(),
        detail,
    };

    let img = ImageReader::open(path)
        .map_err(|e| read_err(e.to_string()))?
        .with_guessed_format()
        .map_err(|e| read_err(e.to_string()))?
        .decode()
        .map_err(|e| read_err(e.to_string()))?;

    encode_image(img).map_err(|e| read_err(format!("JPEG encoding failed: {e}")))
}

/// Encode an in-memory image as base64 JPEG.
pub fn encode_image(img: DynamicImage) -> Result<EncodedImage, image::ImageError> {
    let rgb = to_rgb(img);
    let (width, height) = (rgb.width(), rgb.height());

    let mut buf = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)?;

    let base64 = STANDARD.encode(&buf);
    debug!("Encoded {}x{} image → {} bytes base64", width, height, base64.len());

    Ok(EncodedImage {
        base64,
        width,
        height,
    })
}

fn to_rgb(img: DynamicImage) -> DynamicImage {
    if img.color() == ColorType::Rgb8 {
        img
    } else {
        DynamicImage::ImageRgb8(img.to_rgb8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};

    fn decode(encoded: &EncodedImage) -> DynamicImage {
        let bytes = encoded.jpeg_bytes().expect("valid base64");
        image::load_from_memory_with_format(&bytes, ImageFormat::Jpeg).expect("valid JPEG")
    }

    #[test]
    fn rgba_is_flattened_to_rgb() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 6, Rgba([200, 10, 10, 128])));
        let encoded = encode_image(img).expect("encode should succeed");
        assert_eq!((encoded.width, encoded.height), (8, 6));
        let back = decode(&encoded);
        assert_eq!(back.color(), ColorType::Rgb8);
    }

    #[test]
    fn grayscale_is_encoded() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(4, 4, Luma([90])));
        let encoded = encode_image(img).unwrap();
        let px = decode(&encoded).to_rgb8().get_pixel(1, 1).0;
        for c in px {
            assert!((c as i32 - 90).abs() <= 4, "got {px:?}");
        }
    }

    #[test]
    fn round_trip_is_pixel_equivalent() {
        let img = RgbImage::from_fn(32, 32, |x, _| {
            if x < 16 {
                Rgb([220, 40, 40])
            } else {
                Rgb([30, 60, 200])
            }
        });
        let encoded = encode_image(DynamicImage::ImageRgb8(img.clone())).unwrap();
        let back = decode(&encoded).to_rgb8();
        assert_eq!(back.dimensions(), img.dimensions());

        // Compare away from the colour edge, where JPEG ringing lives.
        for (x, y) in [(2, 2), (5, 20), (26, 4), (29, 29)] {
            let a = img.get_pixel(x, y).0;
            let b = back.get_pixel(x, y).0;
            for i in 0..3 {
                assert!(
                    (a[i] as i32 - b[i] as i32).abs() <= 12,
                    "pixel ({x},{y}): {a:?} vs {b:?}"
                );
            }
        }
    }

    #[test]
    fn data_uri_prefix() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, Rgb([0, 0, 0])));
        let encoded = encode_image(img).unwrap();
        assert!(encoded.data_uri().starts_with("data:image/jpeg;base64,/9j/"));
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = encode_file(Path::new("/definitely/not/here.png")).unwrap_err();
        assert!(matches!(err, ImageError::ImageRead { .. }));
    }

    #[test]
    fn garbage_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.jpg");
        std::fs::write(&path, b"this is not an image").unwrap();
        let err = encode_file(&path).unwrap_err();
        assert!(matches!(err, ImageError::ImageRead { .. }), "{err}");
    }

    #[test]
    fn png_file_is_encoded_without_touching_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("card.png");
        RgbaImage::from_pixel(5, 3, Rgba([1, 2, 3, 4])).save(&path).unwrap();
        let before = std::fs::read(&path).unwrap();

        let encoded = encode_file(&path).unwrap();
        assert_eq!((encoded.width, encoded.height), (5, 3));
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }
}
