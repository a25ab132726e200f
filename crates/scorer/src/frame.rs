//! Decoded frame type and wire-format decoding

use crate::ScorerError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// Upper bound on decoded base64 payloads (bytes)
const MAX_FRAME_BYTES: usize = 8 * 1024 * 1024;

/// Maximum accepted frame dimension (pixels)
const MAX_FRAME_DIMENSION: u32 = 4096;

/// Decoded RGB webcam frame
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    /// RGB pixel data (width * height * 3)
    pub data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
}

impl DecodedFrame {
    /// Create a frame from raw RGB data
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Result<Self, ScorerError> {
        if data.len() != (width as usize) * (height as usize) * 3 {
            return Err(ScorerError::InvalidFrame(format!(
                "RGB buffer length {} does not match {}x{}",
                data.len(),
                width,
                height
            )));
        }
        Ok(Self { data, width, height })
    }

    /// Decode an encoded image (JPEG, PNG, ...) into an RGB frame
    pub fn from_image_bytes(bytes: &[u8]) -> Result<Self, ScorerError> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| ScorerError::InvalidFrame(e.to_string()))?
            .to_rgb8();

        let (width, height) = (img.width(), img.height());
        if width == 0 || height == 0 || width > MAX_FRAME_DIMENSION || height > MAX_FRAME_DIMENSION
        {
            return Err(ScorerError::InvalidFrame(format!(
                "Unsupported frame dimensions {}x{}",
                width, height
            )));
        }

        Ok(Self {
            data: img.into_raw(),
            width,
            height,
        })
    }

    /// Decode a base64 string, with or without a `data:image/...;base64,`
    /// prefix, into an RGB frame
    pub fn from_base64(encoded: &str) -> Result<Self, ScorerError> {
        let payload = match encoded.strip_prefix("data:image") {
            Some(rest) => rest
                .split_once(',')
                .map(|(_, body)| body)
                .ok_or_else(|| {
                    ScorerError::InvalidFrame("Malformed data URI".to_string())
                })?,
            None => encoded,
        };

        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|e| ScorerError::InvalidFrame(e.to_string()))?;
        if bytes.len() > MAX_FRAME_BYTES {
            return Err(ScorerError::InvalidFrame(format!(
                "Frame payload of {} bytes exceeds limit",
                bytes.len()
            )));
        }

        Self::from_image_bytes(&bytes)
    }

    /// Luminance of the pixel at (x, y), BT.601 weights
    pub fn luma(&self, x: u32, y: u32) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y * self.width + x) * 3) as usize;
        let r = self.data[idx] as f32;
        let g = self.data[idx + 1] as f32;
        let b = self.data[idx + 2] as f32;
        Some((0.299 * r + 0.587 * g + 0.114 * b) / 255.0)
    }

    /// Mean luminance over the whole frame
    pub fn mean_luma(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        let sum: f32 = self
            .data
            .chunks_exact(3)
            .map(|px| 0.299 * px[0] as f32 + 0.587 * px[1] as f32 + 0.114 * px[2] as f32)
            .sum();
        sum / (255.0 * (self.data.len() / 3) as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn png_bytes(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb(rgb));
        let mut out = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut out, image::ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn test_decode_image_bytes() {
        let bytes = png_bytes(4, 2, [10, 20, 30]);
        let frame = DecodedFrame::from_image_bytes(&bytes).unwrap();
        assert_eq!(frame.width, 4);
        assert_eq!(frame.height, 2);
        assert_eq!(frame.data.len(), 4 * 2 * 3);
    }

    #[test]
    fn test_decode_data_uri() {
        let bytes = png_bytes(2, 2, [255, 255, 255]);
        let encoded = format!("data:image/png;base64,{}", STANDARD.encode(&bytes));
        let frame = DecodedFrame::from_base64(&encoded).unwrap();
        assert_eq!(frame.width, 2);
        assert!((frame.mean_luma() - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_decode_bare_base64() {
        let bytes = png_bytes(2, 2, [0, 0, 0]);
        let frame = DecodedFrame::from_base64(&STANDARD.encode(&bytes)).unwrap();
        assert!(frame.mean_luma() < 1e-3);
    }

    #[test]
    fn test_invalid_payloads_rejected() {
        assert!(DecodedFrame::from_base64("not-base64!!!").is_err());
        assert!(DecodedFrame::from_base64("data:image/png;base64").is_err());
        assert!(DecodedFrame::from_image_bytes(b"garbage").is_err());
        assert!(DecodedFrame::new(vec![0; 5], 2, 2).is_err());
    }

    #[test]
    fn test_luma_bounds() {
        let frame = DecodedFrame::new(vec![255; 12], 2, 2).unwrap();
        assert!((frame.luma(1, 1).unwrap() - 1.0).abs() < 1e-3);
        assert!(frame.luma(2, 0).is_none());
    }

    proptest! {
        /// Per-pixel and mean luminance stay inside [0, 1] for any RGB
        /// content, and in-bounds access never returns `None`.
        #[test]
        fn prop_luma_stays_in_unit_range(
            (width, height, data) in (1u32..=8, 1u32..=8).prop_flat_map(|(w, h)| {
                proptest::collection::vec(
                    proptest::num::u8::ANY,
                    (w * h * 3) as usize,
                )
                .prop_map(move |data| (w, h, data))
            })
        ) {
            let frame = DecodedFrame::new(data, width, height).unwrap();

            let mean = frame.mean_luma();
            prop_assert!((0.0..=1.0).contains(&mean));

            for y in 0..height {
                for x in 0..width {
                    let luma = frame.luma(x, y).unwrap();
                    prop_assert!((0.0..=1.0).contains(&luma));
                }
            }
            prop_assert!(frame.luma(width, 0).is_none());
        }
    }
}
