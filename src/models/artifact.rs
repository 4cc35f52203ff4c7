use serde::Serialize;

/// Bytes produced by a successful job.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Artifact {
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

impl Artifact {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Content type to serve the bytes with.
    pub fn content_type_or_default(&self) -> &str {
        self.content_type.as_deref().unwrap_or("application/octet-stream")
    }
}
