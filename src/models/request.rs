use base64::Engine;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Aspect ratios the video model accepts.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, EnumString, Display, PartialEq, Eq)]
pub enum AspectRatio {
    #[default]
    #[strum(serialize = "16:9")]
    #[serde(rename = "16:9")]
    Landscape,
    #[strum(serialize = "9:16")]
    #[serde(rename = "9:16")]
    Portrait,
}

impl AspectRatio {
    /// Map a free-form ratio onto a supported one. Unsupported ratios such as
    /// `1:1` or `4:3` fall back to landscape.
    pub fn normalize(raw: &str) -> Self {
        raw.trim().parse().unwrap_or_default()
    }
}

/// Optional still image the video is seeded from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeedImage {
    pub mime_type: String,
    pub data_base64: String,
}

impl SeedImage {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RequestError> {
        let format = image::guess_format(bytes).map_err(|_| RequestError::UnsupportedImage)?;
        Ok(Self {
            mime_type: format.to_mime_type().to_string(),
            data_base64: base64::engine::general_purpose::STANDARD.encode(bytes),
        })
    }

    /// Accept either a `data:<mime>;base64,<payload>` URL or bare base64.
    pub fn from_data_url(raw: &str) -> Result<Self, RequestError> {
        let payload = match raw.strip_prefix("data:") {
            Some(rest) => rest
                .split_once(";base64,")
                .map(|(_, data)| data)
                .ok_or(RequestError::MalformedDataUrl)?,
            None => raw,
        };

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|_| RequestError::MalformedDataUrl)?;
        Self::from_bytes(&bytes)
    }
}

/// Caller-defined description of the artifact to generate.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GenerationRequest {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_image: Option<SeedImage>,
    /// Extra model parameters passed through untouched.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_seed_image(mut self, seed: SeedImage) -> Self {
        self.seed_image = Some(seed);
        self
    }
}

pub const DEFAULT_RESOLUTION: &str = "720p";

/// Output format options for a submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmitOptions {
    pub model: String,
    pub aspect_ratio: AspectRatio,
    pub resolution: String,
    pub output_count: u32,
}

impl SubmitOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            aspect_ratio: AspectRatio::default(),
            resolution: DEFAULT_RESOLUTION.to_string(),
            output_count: 1,
        }
    }

    pub fn aspect_ratio(mut self, raw: Option<&str>) -> Self {
        self.aspect_ratio = raw.map(AspectRatio::normalize).unwrap_or_default();
        self
    }

    pub fn resolution(mut self, raw: Option<&str>) -> Self {
        self.resolution = raw
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_RESOLUTION)
            .to_string();
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("Seed image is not a supported image format")]
    UnsupportedImage,

    #[error("Seed image is not a valid base64 data URL")]
    MalformedDataUrl,
}

#[cfg(test)]
mod tests {
    use super::*;

    // Smallest valid PNG signature + IHDR chunk header is enough for format sniffing.
    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];

    #[test]
    fn test_aspect_ratio_normalization() {
        assert_eq!(AspectRatio::normalize("9:16"), AspectRatio::Portrait);
        assert_eq!(AspectRatio::normalize(" 16:9 "), AspectRatio::Landscape);
        assert_eq!(AspectRatio::normalize("1:1"), AspectRatio::Landscape);
        assert_eq!(AspectRatio::normalize("4:3"), AspectRatio::Landscape);
        assert_eq!(AspectRatio::Portrait.to_string(), "9:16");
    }

    #[test]
    fn test_submit_option_defaults() {
        let options = SubmitOptions::new("video-model")
            .aspect_ratio(None)
            .resolution(Some("  "));
        assert_eq!(options.aspect_ratio, AspectRatio::Landscape);
        assert_eq!(options.resolution, "720p");
        assert_eq!(options.output_count, 1);
    }

    #[test]
    fn test_seed_image_from_data_url() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(PNG_HEADER);
        let seed = SeedImage::from_data_url(&format!("data:image/png;base64,{encoded}")).unwrap();
        assert_eq!(seed.mime_type, "image/png");
        assert_eq!(seed.data_base64, encoded);

        let bare = SeedImage::from_data_url(&encoded).unwrap();
        assert_eq!(bare, seed);
    }

    #[test]
    fn test_seed_image_rejects_garbage() {
        assert!(matches!(
            SeedImage::from_data_url("data:image/png,notbase64"),
            Err(RequestError::MalformedDataUrl)
        ));
        let text = base64::engine::general_purpose::STANDARD.encode(b"plain text");
        assert!(matches!(
            SeedImage::from_data_url(&text),
            Err(RequestError::UnsupportedImage)
        ));
    }
}
