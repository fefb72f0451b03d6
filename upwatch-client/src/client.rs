use crate::config::ApiConfig;
use crate::error::{ApiError, Result};
use crate::model::{Credentials, NewTarget, Target, TargetStatus, User};
use crate::session::SessionStore;
use reqwest::cookie::Jar;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, SET_COOKIE};
use reqwest::{Client, Method, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

pub mod paths {
    pub const TARGETS: &str = "/targets";
    pub const TARGETS_STATUS: &str = "/targets/status";
    pub const AUTH_LOGIN: &str = "/auth/login";
    pub const AUTH_REGISTER: &str = "/auth/register";
    pub const AUTH_LOGOUT: &str = "/auth/logout";
    pub const AUTH_ME: &str = "/auth/me";

    pub fn target(id: i64) -> String {
        format!("{}/{}", TARGETS, id)
    }
}

/// Per-request overrides, merged over the client defaults.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    pub fn post() -> Self {
        Self::new(Method::POST)
    }

    pub fn delete() -> Self {
        Self::new(Method::DELETE)
    }

    pub fn with_json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        let value = serde_json::to_value(body).map_err(|e| ApiError::Decode(e.to_string()))?;
        self.body = Some(value);
        Ok(self)
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::get()
    }
}

/// Thin wrapper over the uptime API.
///
/// Every request carries the cookie jar and a JSON content type unless the
/// caller overrides it. Nothing is retried and no timeout is imposed beyond
/// whatever the transport does.
pub struct ApiClient {
    client: Client,
    config: ApiConfig,
    jar: Arc<Jar>,
    session: Option<SessionStore>,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Result<Self> {
        Self::build(config, None)
    }

    /// Like [`ApiClient::new`], but seeded from and saved back to a session file.
    pub fn with_session(config: ApiConfig, session: SessionStore) -> Result<Self> {
        Self::build(config, Some(session))
    }

    fn build(config: ApiConfig, session: Option<SessionStore>) -> Result<Self> {
        let jar = Arc::new(Jar::default());
        if let Some(ref store) = session
            && let Err(e) = store.load_into(&jar, config.base_url())
        {
            warn!("Ignoring unreadable session file {}: {}", store.path().display(), e);
        }

        let client = Client::builder()
            .user_agent(concat!("Upwatch/", env!("CARGO_PKG_VERSION")))
            .cookie_provider(jar.clone())
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self {
            client,
            config,
            jar,
            session,
        })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Send a request and hand back the response untouched, whatever its status.
    pub async fn raw_request(&self, path: &str, options: RequestOptions) -> Result<Response> {
        let url = self.config.resolve_path(path)?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.extend(options.headers);

        debug!("{} {}", options.method, url);
        let mut request = self.client.request(options.method, url.clone()).headers(headers);
        if let Some(body) = options.body {
            request = request.body(body.to_string());
        }

        let response = request.send().await?;
        debug!("{} -> {}", url, response.status());

        if response.headers().contains_key(SET_COOKIE) {
            self.persist_session();
        }

        Ok(response)
    }

    /// Send a request and decode a 2xx JSON body; anything else becomes [`ApiError::Status`].
    pub async fn json_request<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T> {
        let response = self.raw_request(path, options).await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = error_message(status, &body);
            debug!("{} failed with {}: {}", path, status, message);
            return Err(ApiError::Status { status, message });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Like [`json_request`](Self::json_request), but any 2xx counts as success.
    ///
    /// The body is decoded when it has the expected shape and ignored otherwise.
    pub async fn accepted_request<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<Option<T>> {
        let response = self.raw_request(path, options).await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = error_message(status, &body);
            debug!("{} failed with {}: {}", path, status, message);
            return Err(ApiError::Status { status, message });
        }

        let bytes = response.bytes().await?;
        match serde_json::from_slice(&bytes) {
            Ok(body) => Ok(Some(body)),
            Err(e) => {
                debug!("{} succeeded with an unexpected body: {}", path, e);
                Ok(None)
            }
        }
    }

    pub async fn targets_status(&self) -> Result<Vec<TargetStatus>> {
        self.json_request(paths::TARGETS_STATUS, RequestOptions::get())
            .await
    }

    pub async fn targets(&self) -> Result<Vec<Target>> {
        self.json_request(paths::TARGETS, RequestOptions::get()).await
    }

    /// `DELETE /targets/{id}`. Success usually comes back as an empty 204.
    pub async fn delete_target(&self, id: i64) -> Result<()> {
        let response = self
            .raw_request(&paths::target(id), RequestOptions::delete())
            .await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Status {
            status,
            message: error_message(status, &body),
        })
    }

    /// `POST /targets`. The created target comes back when the server echoes it.
    pub async fn create_target(&self, target: &NewTarget) -> Result<Option<Target>> {
        self.accepted_request(paths::TARGETS, RequestOptions::post().with_json(target)?)
            .await
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<Option<User>> {
        self.accepted_request(
            paths::AUTH_LOGIN,
            RequestOptions::post().with_json(credentials)?,
        )
        .await
    }

    pub async fn register(&self, credentials: &Credentials) -> Result<Option<User>> {
        self.accepted_request(
            paths::AUTH_REGISTER,
            RequestOptions::post().with_json(credentials)?,
        )
        .await
    }

    pub async fn logout(&self) -> Result<()> {
        self.accepted_request::<Value>(paths::AUTH_LOGOUT, RequestOptions::post())
            .await?;
        Ok(())
    }

    pub async fn me(&self) -> Result<User> {
        self.json_request(paths::AUTH_ME, RequestOptions::get()).await
    }

    fn persist_session(&self) {
        if let Some(ref store) = self.session
            && let Err(e) = store.save_from(&self.jar, self.config.base_url())
        {
            warn!("Failed to save session to {}: {}", store.path().display(), e);
        }
    }
}

/// The server's `detail` string when present, the whole JSON body when not,
/// and the status reason when the body isn't JSON at all.
pub fn error_message(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => match value.get("detail") {
            Some(Value::String(detail)) => detail.clone(),
            _ => value.to_string(),
        },
        Err(_) => status
            .canonical_reason()
            .map(str::to_string)
            .unwrap_or_else(|| status.as_str().to_string()),
    }
}

/// Best-effort `detail` string from an error response body.
pub async fn detail_of(response: Response) -> Option<String> {
    let body = response.text().await.ok()?;
    match serde_json::from_str::<Value>(&body).ok()?.get("detail")? {
        Value::String(detail) => Some(detail.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_json, header, method, path},
    };

    fn client_for(server: &MockServer) -> ApiClient {
        ApiClient::new(ApiConfig::new(&server.uri()).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_targets_status_decodes_missing_liveness() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/targets/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": 1, "url": "https://a.com", "is_up": true, "status_code": 200},
                {"id": 2, "url": "https://b.com"}
            ])))
            .mount(&mock_server)
            .await;

        let statuses = client_for(&mock_server).targets_status().await.unwrap();
        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses[0].is_up, Some(true));
        assert_eq!(statuses[1].is_up, None);
    }

    #[tokio::test]
    async fn test_targets_not_found_is_status_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/targets"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let err = client_for(&mock_server).targets().await.unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
    }

    #[tokio::test]
    async fn test_delete_target_accepts_empty_204() {
        let mock_server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/targets/9"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&mock_server)
            .await;

        client_for(&mock_server).delete_target(9).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_target_conflict_carries_detail() {
        let mock_server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/targets/9"))
            .respond_with(
                ResponseTemplate::new(409).set_body_json(serde_json::json!({"detail": "Target in use"})),
            )
            .mount(&mock_server)
            .await;

        let err = client_for(&mock_server).delete_target(9).await.unwrap_err();
        assert_eq!(err.to_string(), "Target in use");
        assert!(!err.is_unauthorized());
    }

    #[tokio::test]
    async fn test_raw_request_does_not_fail_on_error_status() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/targets/status"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let response = client
            .raw_request(paths::TARGETS_STATUS, RequestOptions::get())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_default_json_content_type_is_sent() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/targets"))
            .and(header("content-type", "application/json"))
            .and(body_json(serde_json::json!({"url": "https://a.com"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "id": 1,
                "url": "https://a.com",
                "name": null,
                "created_at": "2024-01-01T00:00:00Z"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let target = client
            .create_target(&NewTarget {
                url: "https://a.com".to_string(),
                name: None,
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(target.id, 1);
        assert_eq!(target.name, None);
    }

    #[tokio::test]
    async fn test_caller_header_overrides_default() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/me"))
            .and(header("content-type", "text/plain"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let options = RequestOptions::get()
            .with_header(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        let response = client.raw_request(paths::AUTH_ME, options).await.unwrap();
        assert!(response.status().is_success());
    }

    #[tokio::test]
    async fn test_json_request_uses_detail_message() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(serde_json::json!({"detail": "Invalid credentials"})),
            )
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let err = client
            .login(&Credentials {
                email: "a@b.com".to_string(),
                password: "wrong".to_string(),
            })
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Invalid credentials");
        assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn test_json_request_serializes_structured_detail() {
        let mock_server = MockServer::start().await;
        let body = serde_json::json!({"detail": [{"loc": ["body", "url"], "msg": "invalid"}]});
        Mock::given(method("POST"))
            .and(path("/targets"))
            .respond_with(ResponseTemplate::new(422).set_body_json(body.clone()))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let err = client
            .create_target(&NewTarget {
                url: "https://a.com".to_string(),
                name: None,
            })
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), body.to_string());
        assert!(!err.is_unauthorized());
    }

    #[tokio::test]
    async fn test_json_request_falls_back_to_reason_text() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/logout"))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let err = client.logout().await.unwrap_err();
        assert_eq!(err.to_string(), "Bad Gateway");
    }

    #[tokio::test]
    async fn test_json_request_rejects_malformed_success_body() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/me"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        assert!(matches!(client.me().await, Err(ApiError::Decode(_))));
    }

    #[tokio::test]
    async fn test_accepted_request_tolerates_other_success_shapes() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/targets"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let user = client
            .login(&Credentials {
                email: "a@b.com".to_string(),
                password: "hunter2".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(user, None);

        let target = client
            .create_target(&NewTarget {
                url: "https://a.com".to_string(),
                name: None,
            })
            .await
            .unwrap();
        assert_eq!(target, None);
    }

    #[tokio::test]
    async fn test_transport_failure_is_reported() {
        // Nothing listens on the discard port.
        let client = ApiClient::new(ApiConfig::new("http://127.0.0.1:9").unwrap()).unwrap();
        let err = client.me().await.unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_cookie_is_replayed_and_persisted() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("set-cookie", "session=tok123; Path=/; HttpOnly")
                    .set_body_json(serde_json::json!({"id": 7, "email": "a@b.com"})),
            )
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/auth/me"))
            .and(header("cookie", "session=tok123"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"id": 7, "email": "a@b.com"})),
            )
            .expect(2)
            .mount(&mock_server)
            .await;

        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path().join("session"));
        let config = ApiConfig::new(&mock_server.uri()).unwrap();

        let client = ApiClient::with_session(config.clone(), store.clone()).unwrap();
        let user = client
            .login(&Credentials {
                email: "a@b.com".to_string(),
                password: "hunter2".to_string(),
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.id, 7);
        client.me().await.unwrap();

        // A second process picks the session up from disk.
        let second = ApiClient::with_session(config, store).unwrap();
        assert_eq!(second.me().await.unwrap().email, "a@b.com");
    }

    #[test]
    fn test_error_message_variants() {
        assert_eq!(
            error_message(StatusCode::CONFLICT, r#"{"detail":"Target in use"}"#),
            "Target in use"
        );
        assert_eq!(
            error_message(StatusCode::BAD_REQUEST, r#"{"error":"nope"}"#),
            r#"{"error":"nope"}"#
        );
        assert_eq!(
            error_message(StatusCode::INTERNAL_SERVER_ERROR, ""),
            "Internal Server Error"
        );
    }

    #[test]
    fn test_target_path() {
        assert_eq!(paths::target(42), "/targets/42");
    }
}
