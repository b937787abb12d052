//! 待分析的图片载荷
//!
//! 每张上传图片只编码一次 base64，各个远程调用共享同一份载荷。

use base64::{engine::general_purpose::STANDARD, Engine};
use image::ImageFormat;

use crate::error::DecodeError;

/// 图片载荷（不可变）
#[derive(Debug, Clone)]
pub struct ImagePayload {
    bytes: Vec<u8>,
    base64: String,
    mime_type: &'static str,
}

impl ImagePayload {
    /// 创建载荷，空字节直接返回 `DecodeError::Empty`
    pub fn new(bytes: Vec<u8>) -> Result<Self, DecodeError> {
        if bytes.is_empty() {
            return Err(DecodeError::Empty);
        }

        let mime_type = match image::guess_format(&bytes) {
            Ok(ImageFormat::Png) => "image/png",
            Ok(ImageFormat::Gif) => "image/gif",
            Ok(ImageFormat::WebP) => "image/webp",
            // 无法识别时沿用 JPEG
            _ => "image/jpeg",
        };
        let base64 = STANDARD.encode(&bytes);

        Ok(Self {
            bytes,
            base64,
            mime_type,
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn base64(&self) -> &str {
        &self.base64
    }

    pub fn mime_type(&self) -> &'static str {
        self.mime_type
    }

    /// `data:<mime>;base64,...` 形式的 URL
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_bytes_rejected() {
        assert_eq!(ImagePayload::new(Vec::new()).unwrap_err(), DecodeError::Empty);
    }

    #[test]
    fn test_png_mime_and_data_url() {
        let png_magic = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];
        let payload = ImagePayload::new(png_magic).unwrap();
        assert_eq!(payload.mime_type(), "image/png");
        assert!(payload.data_url().starts_with("data:image/png;base64,iVBORw0KGgo"));
    }

    #[test]
    fn test_unknown_format_falls_back_to_jpeg() {
        let payload = ImagePayload::new(b"not an image".to_vec()).unwrap();
        assert_eq!(payload.mime_type(), "image/jpeg");
        assert_eq!(payload.base64(), "bm90IGFuIGltYWdl");
    }
}
