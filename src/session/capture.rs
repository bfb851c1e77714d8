use crate::errors::CameraError;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use image::DynamicImage;

/// A decoded still image together with the encoded buffer it came from
#[derive(Debug, Clone)]
pub struct CapturedImage {
    encoded: Bytes,
    image: DynamicImage,
    captured_at: DateTime<Utc>,
}

impl CapturedImage {
    /// Decode the buffer delivered by the still-image output
    pub fn decode(encoded: Bytes) -> Result<Self, CameraError> {
        if encoded.is_empty() {
            return Err(CameraError::DecodeFailed("empty capture buffer".to_string()));
        }
        let image = image::load_from_memory(&encoded)
            .map_err(|e| CameraError::DecodeFailed(e.to_string()))?;
        if image.width() == 0 || image.height() == 0 {
            return Err(CameraError::DecodeFailed("image has no pixels".to_string()));
        }
        Ok(Self {
            encoded,
            image,
            captured_at: Utc::now(),
        })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Encoded bytes as produced by the platform (JPEG)
    pub fn encoded(&self) -> &Bytes {
        &self.encoded
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn into_encoded(self) -> Bytes {
        self.encoded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::synthetic_jpeg;

    #[test]
    fn test_decode_jpeg() {
        let image = CapturedImage::decode(synthetic_jpeg(0, 64, 48)).unwrap();
        assert_eq!(image.width(), 64);
        assert_eq!(image.height(), 48);
        assert!(!image.encoded().is_empty());
    }

    #[test]
    fn test_decode_rejects_empty_and_garbage() {
        assert!(matches!(
            CapturedImage::decode(Bytes::new()),
            Err(CameraError::DecodeFailed(_))
        ));
        assert!(matches!(
            CapturedImage::decode(Bytes::from_static(b"not an image")),
            Err(CameraError::DecodeFailed(_))
        ));
    }
}
