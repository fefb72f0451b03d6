use serde::{Deserialize, Serialize};

/// A URL being monitored, as returned by `GET /targets`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub id: i64,
    pub url: String,
    #[serde(default)]
    pub name: Option<String>,
    pub created_at: String,
}

/// A target joined with its latest check, as returned by `GET /targets/status`.
///
/// `is_up` stays `None` when the field is missing or null; it must never be
/// read as "down" in that case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetStatus {
    pub id: i64,
    pub url: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub is_up: Option<bool>,
    #[serde(default)]
    pub checked_at: Option<String>,
    #[serde(default)]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Body of `POST /targets`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewTarget {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Body of `POST /auth/login` and `POST /auth/register`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_without_is_up_is_unknown() {
        let status: TargetStatus =
            serde_json::from_str(r#"{"id":3,"url":"https://c.com"}"#).unwrap();
        assert_eq!(status.is_up, None);
        assert_eq!(status.checked_at, None);
    }

    #[test]
    fn test_status_with_null_is_up_is_unknown() {
        let status: TargetStatus =
            serde_json::from_str(r#"{"id":3,"url":"https://c.com","is_up":null}"#).unwrap();
        assert_eq!(status.is_up, None);
    }

    #[test]
    fn test_new_target_omits_missing_name() {
        let body = serde_json::to_value(NewTarget {
            url: "https://example.com".to_string(),
            name: None,
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"url": "https://example.com"}));
    }
}
