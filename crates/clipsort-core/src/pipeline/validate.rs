//! Input validation before decoding.

use std::path::Path;

use image::ImageFormat;

use crate::config::LimitsConfig;
use crate::error::PipelineError;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Validates files before decode: size limit and magic bytes.
#[derive(Debug, Clone)]
pub struct Validator {
    limits: LimitsConfig,
}

impl Validator {
    /// Create a new validator with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Reject files larger than `limits.max_file_size_mb`.
    pub fn check_size(&self, len: u64, path: &Path) -> Result<(), PipelineError> {
        if len > self.limits.max_file_size_mb * BYTES_PER_MB {
            return Err(PipelineError::FileTooLarge {
                path: path.to_path_buf(),
                size_mb: len / BYTES_PER_MB,
                max_mb: self.limits.max_file_size_mb,
            });
        }
        Ok(())
    }

    /// Check the leading bytes against supported image signatures.
    pub fn check_header(&self, bytes: &[u8], path: &Path) -> Result<ImageFormat, PipelineError> {
        if bytes.len() < 4 {
            return Err(PipelineError::Decode {
                path: path.to_path_buf(),
                message: "File too small to be a valid image".to_string(),
            });
        }

        sniff_format(bytes).ok_or_else(|| PipelineError::Decode {
            path: path.to_path_buf(),
            message: "Unrecognized image format (invalid magic bytes)".to_string(),
        })
    }
}

/// Identify JPEG, PNG, GIF, WebP, BMP or TIFF by signature.
pub fn sniff_format(header: &[u8]) -> Option<ImageFormat> {
    match header {
        [0xFF, 0xD8, 0xFF, ..] => Some(ImageFormat::Jpeg),
        [0x89, b'P', b'N', b'G', ..] => Some(ImageFormat::Png),
        [b'G', b'I', b'F', b'8', ..] => Some(ImageFormat::Gif),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some(ImageFormat::WebP),
        [b'B', b'M', ..] => Some(ImageFormat::Bmp),
        [b'I', b'I', 0x2A, 0x00, ..] | [b'M', b'M', 0x00, 0x2A, ..] => Some(ImageFormat::Tiff),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> Validator {
        Validator::new(LimitsConfig::default())
    }

    #[test]
    fn test_magic_bytes_jpeg() {
        let header = [0xFF, 0xD8, 0xFF, 0xE0, 0, 0, 0, 0, 0, 0, 0, 0];
        assert_eq!(sniff_format(&header), Some(ImageFormat::Jpeg));
    }

    #[test]
    fn test_magic_bytes_png() {
        let header = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        assert_eq!(sniff_format(&header), Some(ImageFormat::Png));
    }

    #[test]
    fn test_magic_bytes_gif_and_bmp() {
        assert_eq!(sniff_format(b"GIF89a"), Some(ImageFormat::Gif));
        assert_eq!(sniff_format(b"BM\0\0\0\0"), Some(ImageFormat::Bmp));
    }

    #[test]
    fn test_magic_bytes_webp() {
        let header = [b'R', b'I', b'F', b'F', 0, 0, 0, 0, b'W', b'E', b'B', b'P'];
        assert_eq!(sniff_format(&header), Some(ImageFormat::WebP));
    }

    #[test]
    fn test_riff_without_webp_rejected() {
        let wav = [b'R', b'I', b'F', b'F', 0, 0, 0, 0, b'W', b'A', b'V', b'E'];
        assert_eq!(sniff_format(&wav), None);
        assert_eq!(sniff_format(b"RIFF"), None);
    }

    #[test]
    fn test_magic_bytes_tiff() {
        assert_eq!(sniff_format(&[b'I', b'I', 0x2A, 0x00]), Some(ImageFormat::Tiff));
        assert_eq!(sniff_format(&[b'M', b'M', 0x00, 0x2A]), Some(ImageFormat::Tiff));
        // Bare byte-order marks without the version are not TIFF.
        assert_eq!(sniff_format(&[b'I', b'I', 0x00, 0x00]), None);
        assert_eq!(sniff_format(&[b'M', b'M', 0x00, 0x00]), None);
    }

    #[test]
    fn test_heic_not_supported() {
        let heic = [0, 0, 0, 0x18, b'f', b't', b'y', b'p', b'h', b'e', b'i', b'c'];
        assert_eq!(sniff_format(&heic), None);
    }

    #[test]
    fn test_check_header_errors() {
        let v = validator();
        let path = Path::new("a.jpg");
        assert!(matches!(
            v.check_header(b"\xFF\xD8", path),
            Err(PipelineError::Decode { .. })
        ));
        let err = v.check_header(b"hello world", path).unwrap_err();
        assert!(err.to_string().contains("magic bytes"));
    }

    #[test]
    fn test_check_size() {
        let v = Validator::new(LimitsConfig {
            max_file_size_mb: 1,
            ..LimitsConfig::default()
        });
        let path = Path::new("big.png");
        assert!(v.check_size(BYTES_PER_MB, path).is_ok());
        let err = v.check_size(3 * BYTES_PER_MB, path).unwrap_err();
        match err {
            PipelineError::FileTooLarge { size_mb, max_mb, .. } => {
                assert_eq!(size_mb, 3);
                assert_eq!(max_mb, 1);
            }
            other => panic!("expected FileTooLarge, got {other:?}"),
        }
    }
}
