use thiserror::Error;
use url::Url;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("URL is required.")]
    MissingUrl,

    #[error("Please enter a valid http or https URL.")]
    InvalidUrl,
}

/// Check a target URL before it is sent anywhere. Returns the trimmed URL.
pub fn validate_target_url(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingUrl);
    }

    match Url::parse(trimmed) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(trimmed.to_string()),
        _ => Err(ValidationError::InvalidUrl),
    }
}

/// Blank names are sent as absent.
pub fn normalize_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_http_and_https() {
        assert_eq!(
            validate_target_url("https://example.com"),
            Ok("https://example.com".to_string())
        );
        assert_eq!(
            validate_target_url("  http://example.com/health  "),
            Ok("http://example.com/health".to_string())
        );
    }

    #[test]
    fn test_rejects_relative_text() {
        assert_eq!(
            validate_target_url("not-a-url"),
            Err(ValidationError::InvalidUrl)
        );
    }

    #[test]
    fn test_rejects_other_schemes() {
        assert_eq!(
            validate_target_url("ftp://x.com"),
            Err(ValidationError::InvalidUrl)
        );
        assert_eq!(
            validate_target_url("mailto:ops@example.com"),
            Err(ValidationError::InvalidUrl)
        );
    }

    #[test]
    fn test_rejects_blank() {
        assert_eq!(validate_target_url("   "), Err(ValidationError::MissingUrl));
        assert_eq!(
            ValidationError::MissingUrl.to_string(),
            "URL is required."
        );
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  My site "), Some("My site".to_string()));
        assert_eq!(normalize_name("   "), None);
    }
}
