//! Raw RGBA image loading
//!
//! Binary layout: u32 width, u32 height (native endianness), then
//! width * height * 4 bytes of RGBA8 pixel data.

use crate::render::{RenderError, RenderResult};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Decoded RGBA8 image.
#[derive(Debug)]
pub struct Image {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Image {
    /// Wrap already-decoded pixel data.
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<u8>) -> RenderResult<Self> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidImage(format!(
                "zero dimension ({width}x{height})"
            )));
        }
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(RenderError::InvalidImage(format!(
                "expected {expected} pixel bytes, got {}",
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Decode from any reader.
    pub fn from_reader(reader: &mut impl Read) -> RenderResult<Self> {
        let mut header = [0u8; 8];
        reader.read_exact(&mut header).map_err(|source| {
            if source.kind() == std::io::ErrorKind::UnexpectedEof {
                RenderError::InvalidImage("truncated header".into())
            } else {
                RenderError::Io {
                    path: "<reader>".into(),
                    source,
                }
            }
        })?;
        let width = u32::from_ne_bytes(header[0..4].try_into().expect("4 byte slice"));
        let height = u32::from_ne_bytes(header[4..8].try_into().expect("4 byte slice"));

        if width == 0 || height == 0 {
            return Err(RenderError::InvalidImage(format!(
                "zero dimension ({width}x{height})"
            )));
        }

        let expected = width as usize * height as usize * 4;
        let mut pixels = vec![0u8; expected];
        reader.read_exact(&mut pixels).map_err(|_| {
            RenderError::InvalidImage(format!(
                "truncated payload, expected {expected} pixel bytes"
            ))
        })?;

        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Decode from a file on disk.
    pub fn from_file(path: impl AsRef<Path>) -> RenderResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| RenderError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_reader(&mut BufReader::new(file))
    }

    /// A 1x1 opaque white image, the default albedo.
    pub fn white() -> Self {
        Self {
            width: 1,
            height: 1,
            pixels: vec![0xFF; 4],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Payload size in bytes.
    pub fn byte_len(&self) -> usize {
        self.pixels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn encode(width: u32, height: u32, pixels: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&width.to_ne_bytes());
        bytes.extend_from_slice(&height.to_ne_bytes());
        bytes.extend_from_slice(pixels);
        bytes
    }

    #[test]
    fn decodes_a_2x1_image() {
        let data = encode(2, 1, &[1, 2, 3, 4, 5, 6, 7, 8]);
        let image = Image::from_reader(&mut Cursor::new(data)).unwrap();

        assert_eq!(image.width(), 2);
        assert_eq!(image.height(), 1);
        assert_eq!(image.pixels(), &[1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn zero_dimension_is_rejected() {
        let data = encode(0, 4, &[]);
        let err = Image::from_reader(&mut Cursor::new(data)).unwrap_err();
        assert!(matches!(err, RenderError::InvalidImage(_)));
    }

    #[test]
    fn truncated_payload_is_rejected() {
        // Claims 2x2 but carries a single pixel.
        let data = encode(2, 2, &[0xFF; 4]);
        let err = Image::from_reader(&mut Cursor::new(data)).unwrap_err();
        assert!(matches!(err, RenderError::InvalidImage(_)));
    }

    #[test]
    fn from_pixels_validates_length() {
        assert!(Image::from_pixels(1, 1, vec![0; 4]).is_ok());
        assert!(Image::from_pixels(1, 1, vec![0; 3]).is_err());
        assert!(Image::from_pixels(0, 1, vec![]).is_err());
    }

    #[test]
    fn default_white_is_a_single_opaque_pixel() {
        let image = Image::white();
        assert_eq!((image.width(), image.height()), (1, 1));
        assert_eq!(image.pixels(), &[0xFF, 0xFF, 0xFF, 0xFF]);
    }
}
