use crate::models::job::ErrorDetail;

/// Message fragments that mark a permission or not-found failure.
///
/// Substring matching on remote error text is a fallback. Structured codes are
/// checked first.
pub const DEFAULT_FATAL_SIGNATURES: &[&str] = &[
    "Requested entity was not found",
    "404",
    "PERMISSION_DENIED",
    "permission denied",
    "API key not valid",
];

/// Remote codes that always mean the caller must pick another credential.
const PERMISSION_CODES: &[&str] = &[
    "PERMISSION_DENIED",
    "NOT_FOUND",
    "UNAUTHENTICATED",
    "401",
    "403",
    "404",
];

/// Decides whether a remote failure is a permission issue.
#[derive(Debug, Clone)]
pub struct ErrorClassifier {
    signatures: Vec<String>,
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_FATAL_SIGNATURES.iter().map(|s| s.to_string()))
    }
}

impl ErrorClassifier {
    pub fn new<I, S>(signatures: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let signatures = signatures
            .into_iter()
            .map(|s| s.into().trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        Self { signatures }
    }

    pub fn is_permission_issue(&self, detail: &ErrorDetail) -> bool {
        if let Some(code) = detail.code.as_deref() {
            if PERMISSION_CODES
                .iter()
                .any(|known| known.eq_ignore_ascii_case(code.trim()))
            {
                return true;
            }
        }

        self.matches_message(&detail.message)
    }

    pub fn matches_message(&self, message: &str) -> bool {
        let message = message.to_lowercase();
        self.signatures.iter().any(|sig| message.contains(sig.as_str()))
    }
}
