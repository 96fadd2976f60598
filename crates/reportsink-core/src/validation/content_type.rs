//! Classification of the `content_type` field

/// How the `content` of a report should be treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// Opaque base64 payload, not validated further
    Base64,
    /// JSON payload validated against its content schema
    Json,
    /// Any other MIME type
    Other,
}

impl ContentKind {
    pub fn classify(content_type: &str) -> Self {
        if content_type.to_ascii_lowercase().contains("base64") {
            ContentKind::Base64
        } else if is_json_mime_type(content_type) {
            ContentKind::Json
        } else {
            ContentKind::Other
        }
    }
}

/// `json` or `application/json`, ignoring case and any MIME parameters
pub fn is_json_mime_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "json" || essence == "application/json"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_types() {
        assert!(is_json_mime_type("json"));
        assert!(is_json_mime_type("application/json"));
        assert!(is_json_mime_type("Application/JSON; charset=utf-8"));
        assert!(!is_json_mime_type("application/xml"));
        assert!(!is_json_mime_type("application/json-patch+json"));
        assert!(!is_json_mime_type(""));
    }

    #[test]
    fn test_classify() {
        assert_eq!(ContentKind::classify("application/base64"), ContentKind::Base64);
        assert_eq!(ContentKind::classify("text/plain;BASE64"), ContentKind::Base64);
        assert_eq!(ContentKind::classify("json"), ContentKind::Json);
        assert_eq!(ContentKind::classify("text/csv"), ContentKind::Other);
    }
}
