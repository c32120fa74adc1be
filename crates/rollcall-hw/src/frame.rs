//! Frame types and image processing — YUYV/GREY to RGB conversion, JPEG encoding.

use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;

/// A raw camera frame in RGB24.
#[derive(Clone)]
pub struct Frame {
    /// RGB pixel data (width * height * 3 bytes).
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub timestamp: std::time::Instant,
    pub sequence: u32,
}

/// A single JPEG-encoded still, sampled from one live frame.
///
/// Immutable once produced; the encoded bytes are exactly what gets
/// submitted to the backend.
#[derive(Clone, Debug)]
pub struct CapturedImage {
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("invalid buffer length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("JPEG encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// Convert packed YUYV (4:2:2) to RGB24 using the BT.601 full-swing matrix.
///
/// YUYV packs two pixels per 4 bytes: [Y0, U, Y1, V]. Both pixels of a
/// pair share the U/V chroma samples.
pub fn yuyv_to_rgb(yuyv: &[u8], width: u32, height: u32) -> Result<Vec<u8>, FrameError> {
    let expected = (width * height * 2) as usize;
    if yuyv.len() < expected {
        return Err(FrameError::InvalidLength {
            expected,
            actual: yuyv.len(),
        });
    }

    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    for quad in yuyv[..expected].chunks_exact(4) {
        let u = quad[1] as i32 - 128;
        let v = quad[3] as i32 - 128;
        for &y in &[quad[0], quad[2]] {
            let c = (y as i32 - 16) * 298;
            rgb.push(clamp_u8((c + 409 * v + 128) >> 8));
            rgb.push(clamp_u8((c - 100 * u - 208 * v + 128) >> 8));
            rgb.push(clamp_u8((c + 516 * u + 128) >> 8));
        }
    }
    Ok(rgb)
}

/// Expand 8-bit grayscale (GREY, common for IR cameras) to RGB24 by
/// replicating the luma channel.
pub fn grey_to_rgb(grey: &[u8], width: u32, height: u32) -> Result<Vec<u8>, FrameError> {
    let expected = (width * height) as usize;
    if grey.len() < expected {
        return Err(FrameError::InvalidLength {
            expected,
            actual: grey.len(),
        });
    }
    let mut rgb = Vec::with_capacity(expected * 3);
    for &g in &grey[..expected] {
        rgb.extend_from_slice(&[g, g, g]);
    }
    Ok(rgb)
}

/// Encode an RGB frame as JPEG at the given quality (1-100).
pub fn encode_jpeg(frame: &Frame, quality: u8) -> Result<CapturedImage, FrameError> {
    let expected = (frame.width * frame.height * 3) as usize;
    if frame.data.len() < expected {
        return Err(FrameError::InvalidLength {
            expected,
            actual: frame.data.len(),
        });
    }

    let mut jpeg = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut jpeg, quality);
    encoder.encode(
        &frame.data[..expected],
        frame.width,
        frame.height,
        ExtendedColorType::Rgb8,
    )?;

    Ok(CapturedImage {
        jpeg,
        width: frame.width,
        height: frame.height,
    })
}

fn clamp_u8(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgb_frame(width: u32, height: u32, fill: u8) -> Frame {
        Frame {
            data: vec![fill; (width * height * 3) as usize],
            width,
            height,
            timestamp: std::time::Instant::now(),
            sequence: 0,
        }
    }

    #[test]
    fn test_yuyv_neutral_chroma_is_grayscale() {
        // 2x1 image: [Y0=82, U=128, Y1=186, V=128] — neutral chroma, so
        // R == G == B for each pixel and brightness tracks Y.
        let yuyv = vec![82, 128, 186, 128];
        let rgb = yuyv_to_rgb(&yuyv, 2, 1).unwrap();
        assert_eq!(rgb.len(), 6);
        assert_eq!(rgb[0], rgb[1]);
        assert_eq!(rgb[1], rgb[2]);
        assert!(rgb[3] > rgb[0], "brighter Y should give brighter RGB");
    }

    #[test]
    fn test_yuyv_white_saturates() {
        // Y=235 U=V=128 is reference white in BT.601 studio swing.
        let yuyv = vec![235, 128, 235, 128];
        let rgb = yuyv_to_rgb(&yuyv, 2, 1).unwrap();
        assert_eq!(rgb, vec![255, 255, 255, 255, 255, 255]);
    }

    #[test]
    fn test_yuyv_invalid_length() {
        let yuyv = vec![100, 128]; // too short for 2x1
        assert!(yuyv_to_rgb(&yuyv, 2, 1).is_err());
    }

    #[test]
    fn test_grey_replicates_channels() {
        let grey = vec![7, 200];
        let rgb = grey_to_rgb(&grey, 2, 1).unwrap();
        assert_eq!(rgb, vec![7, 7, 7, 200, 200, 200]);
    }

    #[test]
    fn test_grey_invalid_length() {
        assert!(grey_to_rgb(&[1, 2, 3], 2, 2).is_err());
    }

    #[test]
    fn test_encode_jpeg_roundtrips_dimensions() {
        let frame = rgb_frame(16, 8, 128);
        let image = encode_jpeg(&frame, 85).unwrap();
        assert!(!image.jpeg.is_empty());
        assert_eq!(image.width, 16);
        assert_eq!(image.height, 8);

        use image::GenericImageView;
        let decoded = image::load_from_memory(&image.jpeg).unwrap();
        assert_eq!(decoded.dimensions(), (16, 8));
    }

    #[test]
    fn test_encode_jpeg_short_buffer() {
        let mut frame = rgb_frame(16, 8, 0);
        frame.data.truncate(10);
        assert!(encode_jpeg(&frame, 85).is_err());
    }
}
