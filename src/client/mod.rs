//! Client layer: validates request state, builds payloads, and talks to the API.

use std::error::Error as StdError;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;

use crate::domain::{
    ApiKey, Endpoint, OperationError, Recipient, RecipientShape, RequestState, ValidationError,
    require_batch_recipients, require_no_per_recipient_overrides, require_scalar_recipient,
    require_single_recipient,
};
use crate::transport::{
    PayloadError, build_batch, build_from_recipient, build_from_recipients, build_single,
    encode_json,
};

/// Environment variable read by [`MailerClientBuilder::from_env`] for the API key.
pub const API_KEY_ENV: &str = "KANDMAILER_API_KEY";
/// Environment variable read by [`MailerClientBuilder::from_env`] for the endpoint.
pub const ENDPOINT_ENV: &str = "KANDMAILER_ENDPOINT";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const SEND_SINGLE_PATH: &str = "/send/single";
const SEND_LIST_PATH: &str = "/send/list";
const CONTACT_ADD_PATH: &str = "/contact/add";
const CONTACT_ADD_LIST_PATH: &str = "/contact/add/list";
const CONTACT_REMOVE_PATH: &str = "/contact/remove";

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, Clone)]
/// Request handed to an [`HttpTransport`].
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// First header value with this name, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }
}

/// Executes HTTP requests for [`MailerClient`].
///
/// Errors mean the call itself could not complete (DNS, TLS, timeout, ...);
/// any status code, including 4xx/5xx, is returned as an [`HttpResponse`].
pub trait HttpTransport: Send + Sync {
    fn request<'a>(
        &'a self,
        request: HttpRequest,
    ) -> BoxFuture<'a, Result<HttpResponse, Box<dyn StdError + Send + Sync>>>;
}

#[derive(Debug, Clone)]
/// [`HttpTransport`] backed by `reqwest`.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl HttpTransport for ReqwestTransport {
    fn request<'a>(
        &'a self,
        request: HttpRequest,
    ) -> BoxFuture<'a, Result<HttpResponse, Box<dyn StdError + Send + Sync>>> {
        Box::pin(async move {
            let mut builder = self.client.request(request.method, &request.url);
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            if let Some(body) = request.body {
                builder = builder.body(body);
            }
            let response = builder.send().await?;
            let status = response.status().as_u16();
            let body = response.text().await?;
            Ok(HttpResponse { status, body })
        })
    }
}

#[derive(Debug, thiserror::Error)]
/// Errors returned by [`MailerClient`].
///
/// Validation and misuse errors are raised before any network I/O. Nothing is
/// retried.
pub enum MailerError {
    /// An email or phone value failed its shape check.
    #[error("invalid recipient: {0}")]
    InvalidRecipient(#[from] ValidationError),

    /// The operation cannot be used with the given request state.
    #[error("invalid operation: {0}")]
    InvalidOperation(#[from] OperationError),

    /// The API key or endpoint is unusable.
    #[error("invalid configuration: {0}")]
    Config(#[source] ValidationError),

    /// The API answered with a non-2xx status; `body` is returned verbatim.
    #[error("API error, code {status}: {body}")]
    Api { status: u16, body: String },

    /// HTTP client / transport failure (DNS, TLS, timeouts, etc).
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn StdError + Send + Sync>),

    /// The payload could not be encoded as JSON.
    #[error(transparent)]
    Payload(#[from] PayloadError),
}

impl MailerError {
    /// HTTP status of an [`MailerError::Api`] failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Clone)]
/// Builder for [`MailerClient`].
///
/// Use this when you need a custom timeout, user-agent, or transport.
pub struct MailerClientBuilder {
    api_key: String,
    endpoint: String,
    timeout: Duration,
    user_agent: Option<String>,
    transport: Option<Arc<dyn HttpTransport>>,
}

impl MailerClientBuilder {
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: None,
            transport: None,
        }
    }

    /// Read the API key and endpoint from `KANDMAILER_API_KEY` and
    /// `KANDMAILER_ENDPOINT`.
    pub fn from_env() -> Result<Self, MailerError> {
        let read = |name: &'static str| {
            std::env::var(name)
                .map_err(|_| MailerError::Config(ValidationError::Empty { field: name }))
        };
        Ok(Self::new(read(API_KEY_ENV)?, read(ENDPOINT_ENV)?))
    }

    /// Timeout applied to each whole request by the default transport (10 s unless set).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the HTTP `User-Agent` header of the default transport.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Replace the default `reqwest` transport. Timeout and user-agent settings
    /// are then up to the supplied transport.
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Validate the configuration and build a [`MailerClient`].
    pub fn build(self) -> Result<MailerClient, MailerError> {
        let api_key = ApiKey::new(self.api_key).map_err(MailerError::Config)?;
        let endpoint = Endpoint::new(self.endpoint).map_err(MailerError::Config)?;

        let http: Arc<dyn HttpTransport> = match self.transport {
            Some(transport) => transport,
            None => {
                let mut builder = reqwest::Client::builder().timeout(self.timeout);
                if let Some(user_agent) = self.user_agent {
                    builder = builder.user_agent(user_agent);
                }
                let client = builder
                    .build()
                    .map_err(|err| MailerError::Transport(Box::new(err)))?;
                Arc::new(ReqwestTransport::new(client))
            }
        };

        Ok(MailerClient {
            api_key,
            endpoint,
            http,
        })
    }
}

impl fmt::Debug for MailerClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailerClientBuilder")
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .field("custom_transport", &self.transport.is_some())
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
/// High-level API client.
///
/// Each operation validates the [`RequestState`], builds the JSON payload, posts
/// it with `Authorization: Bearer <api key>`, and returns the raw response body
/// on a 2xx status. Decoding the body is left to the caller.
///
/// ```rust,no_run
/// use kandmailer::{MailerClient, Recipient, RequestState};
///
/// # async fn run() -> Result<(), kandmailer::MailerError> {
/// let client = MailerClient::new("api-key", "https://api.example.com")?;
/// let state = RequestState::new().template("welcome").option("lang", "fr");
/// let recipients = vec![
///     Recipient::builder().email("john@example.com").first_name("John").build()?,
///     Recipient::phone("+33612345678")?,
/// ];
/// let body = client.send_to_recipients(&state, &recipients).await?;
/// println!("{body}");
/// # Ok(())
/// # }
/// ```
pub struct MailerClient {
    api_key: ApiKey,
    endpoint: Endpoint,
    http: Arc<dyn HttpTransport>,
}

impl MailerClient {
    /// Create a client with the default transport.
    ///
    /// For more customization, use [`MailerClient::builder`].
    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Result<Self, MailerError> {
        Self::builder(api_key, endpoint).build()
    }

    pub fn builder(api_key: impl Into<String>, endpoint: impl Into<String>) -> MailerClientBuilder {
        MailerClientBuilder::new(api_key, endpoint)
    }

    pub fn api_key(&self) -> &ApiKey {
        &self.api_key
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Send to whatever the recipient fields describe: a batch when email or
    /// phone holds several values, a single send otherwise.
    pub async fn send(&self, state: &RequestState) -> Result<String, MailerError> {
        match state.recipient_fields().shape() {
            RecipientShape::ParallelArrays => self.send_batch(state).await,
            RecipientShape::Scalar | RecipientShape::Empty => self.send_single(state).await,
        }
    }

    /// `POST /send/single` built from the scalar recipient fields.
    ///
    /// Errors:
    /// - [`MailerError::InvalidOperation`] when per-recipient options are set or a
    ///   recipient field holds several values,
    /// - [`MailerError::Api`] for non-2xx responses.
    pub async fn send_single(&self, state: &RequestState) -> Result<String, MailerError> {
        const OPERATION: &str = "send_single";
        require_no_per_recipient_overrides(state, OPERATION)?;
        require_scalar_recipient(state, OPERATION)?;

        let payload = build_single(state);
        self.post(OPERATION, SEND_SINGLE_PATH, encode_json(&payload)?, 1)
            .await
    }

    /// `POST /send/list` with one payload per index of the parallel recipient
    /// arrays. Prefer [`MailerClient::send_to_recipients`] for new code.
    pub async fn send_batch(&self, state: &RequestState) -> Result<String, MailerError> {
        const OPERATION: &str = "send_batch";
        require_batch_recipients(state, OPERATION)?;

        let payloads = build_batch(state);
        self.post(OPERATION, SEND_LIST_PATH, encode_json(&payloads)?, payloads.len())
            .await
    }

    /// `POST /contact/add` for the single recipient of the state.
    pub async fn add_contact(&self, state: &RequestState) -> Result<String, MailerError> {
        const OPERATION: &str = "add";
        require_single_recipient(state, OPERATION)?;
        require_no_per_recipient_overrides(state, OPERATION)?;

        let payload = build_single(state);
        self.post(OPERATION, CONTACT_ADD_PATH, encode_json(&payload)?, 1)
            .await
    }

    /// `POST /contact/remove` for the single recipient of the state.
    pub async fn remove_contact(&self, state: &RequestState) -> Result<String, MailerError> {
        const OPERATION: &str = "remove";
        require_single_recipient(state, OPERATION)?;
        require_no_per_recipient_overrides(state, OPERATION)?;

        let payload = build_single(state);
        self.post(OPERATION, CONTACT_REMOVE_PATH, encode_json(&payload)?, 1)
            .await
    }

    /// `POST /send/single` for an explicit recipient; state recipient fields are ignored.
    pub async fn send_to_recipient(
        &self,
        state: &RequestState,
        recipient: &Recipient,
    ) -> Result<String, MailerError> {
        let payload = build_from_recipient(state, recipient);
        self.post("send_to_recipient", SEND_SINGLE_PATH, encode_json(&payload)?, 1)
            .await
    }

    /// `POST /send/list` with one payload per recipient, in order.
    pub async fn send_to_recipients(
        &self,
        state: &RequestState,
        recipients: &[Recipient],
    ) -> Result<String, MailerError> {
        const OPERATION: &str = "send_to_recipients";
        if recipients.is_empty() {
            return Err(OperationError::MissingRecipient {
                operation: OPERATION,
            }
            .into());
        }

        let payloads = build_from_recipients(state, recipients);
        self.post(OPERATION, SEND_LIST_PATH, encode_json(&payloads)?, payloads.len())
            .await
    }

    /// `POST /contact/add` for an explicit recipient.
    pub async fn add_recipient(
        &self,
        state: &RequestState,
        recipient: &Recipient,
    ) -> Result<String, MailerError> {
        let payload = build_from_recipient(state, recipient);
        self.post("add_recipient", CONTACT_ADD_PATH, encode_json(&payload)?, 1)
            .await
    }

    /// `POST /contact/add/list` with one contact per recipient, in order.
    pub async fn add_recipients(
        &self,
        state: &RequestState,
        recipients: &[Recipient],
    ) -> Result<String, MailerError> {
        const OPERATION: &str = "add_recipients";
        if recipients.is_empty() {
            return Err(OperationError::MissingRecipient {
                operation: OPERATION,
            }
            .into());
        }

        let payloads = build_from_recipients(state, recipients);
        self.post(
            OPERATION,
            CONTACT_ADD_LIST_PATH,
            encode_json(&payloads)?,
            payloads.len(),
        )
        .await
    }

    /// `POST /contact/remove` for an explicit recipient.
    pub async fn remove_recipient(
        &self,
        state: &RequestState,
        recipient: &Recipient,
    ) -> Result<String, MailerError> {
        let payload = build_from_recipient(state, recipient);
        self.post("remove_recipient", CONTACT_REMOVE_PATH, encode_json(&payload)?, 1)
            .await
    }

    async fn post(
        &self,
        operation: &'static str,
        path: &'static str,
        body: String,
        items: usize,
    ) -> Result<String, MailerError> {
        let url = self.endpoint.url(path);
        tracing::debug!(operation, url = %url, items, "dispatching request");

        let request = HttpRequest {
            method: Method::POST,
            url,
            headers: vec![
                (
                    "Authorization".to_owned(),
                    format!("Bearer {}", self.api_key.as_str()),
                ),
                ("Content-Type".to_owned(), "application/json".to_owned()),
            ],
            body: Some(body),
        };

        let response = self
            .http
            .request(request)
            .await
            .map_err(MailerError::Transport)?;

        if !response.is_success() {
            tracing::warn!(operation, status = response.status, "API rejected request");
            return Err(MailerError::Api {
                status: response.status,
                body: response.body,
            });
        }

        tracing::debug!(operation, status = response.status, "request succeeded");
        Ok(response.body)
    }
}

impl fmt::Debug for MailerClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailerClient")
            .field("api_key", &self.api_key)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::{Value, json};

    use crate::domain::Options;

    use super::*;

    #[derive(Debug, Clone)]
    struct FakeTransport {
        state: Arc<Mutex<FakeTransportState>>,
    }

    #[derive(Debug)]
    struct FakeTransportState {
        requests: Vec<HttpRequest>,
        response_status: u16,
        response_body: String,
        fail: bool,
    }

    impl FakeTransport {
        fn new(response_status: u16, response_body: impl Into<String>) -> Self {
            Self {
                state: Arc::new(Mutex::new(FakeTransportState {
                    requests: Vec::new(),
                    response_status,
                    response_body: response_body.into(),
                    fail: false,
                })),
            }
        }

        fn failing() -> Self {
            let transport = Self::new(200, "");
            transport.state.lock().unwrap().fail = true;
            transport
        }

        fn requests(&self) -> Vec<HttpRequest> {
            self.state.lock().unwrap().requests.clone()
        }

        fn last_request(&self) -> HttpRequest {
            self.requests().pop().expect("no request was sent")
        }

        fn last_payload(&self) -> Value {
            let body = self.last_request().body.expect("request has no body");
            serde_json::from_str(&body).unwrap()
        }
    }

    impl HttpTransport for FakeTransport {
        fn request<'a>(
            &'a self,
            request: HttpRequest,
        ) -> BoxFuture<'a, Result<HttpResponse, Box<dyn StdError + Send + Sync>>> {
            Box::pin(async move {
                let (status, body) = {
                    let mut state = self.state.lock().unwrap();
                    if state.fail {
                        let err: Box<dyn StdError + Send + Sync> = "connection refused".into();
                        return Err(err);
                    }
                    state.requests.push(request);
                    (state.response_status, state.response_body.clone())
                };
                Ok(HttpResponse { status, body })
            })
        }
    }

    fn make_client(transport: FakeTransport) -> MailerClient {
        MailerClient::builder("test-api-key", "https://api.example.com")
            .transport(Arc::new(transport))
            .build()
            .unwrap()
    }

    fn success() -> FakeTransport {
        FakeTransport::new(200, r#"{"status":"success"}"#)
    }

    #[test]
    fn builder_normalizes_endpoint_and_keeps_key() {
        let client = MailerClient::builder("key", "https://api.example.com/")
            .transport(Arc::new(success()))
            .build()
            .unwrap();
        assert_eq!(client.endpoint().as_str(), "https://api.example.com");
        assert_eq!(client.api_key().as_str(), "key");
    }

    #[test]
    fn builder_rejects_bad_configuration() {
        let err = MailerClient::new("  ", "https://api.example.com").unwrap_err();
        assert!(matches!(err, MailerError::Config(ValidationError::Empty { .. })));

        let err = MailerClient::new("key", "api.example.com").unwrap_err();
        assert!(matches!(
            err,
            MailerError::Config(ValidationError::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn debug_output_hides_api_key() {
        let client = make_client(success());
        let debug = format!("{client:?}");
        assert!(!debug.contains("test-api-key"));
        assert!(debug.contains("https://api.example.com"));
    }

    #[tokio::test]
    async fn send_single_posts_json_with_bearer_auth() {
        let transport = success();
        let client = make_client(transport.clone());
        let state = RequestState::new()
            .template("welcome")
            .to_email("john@example.com")
            .unwrap()
            .first_name("John")
            .last_name("Doe")
            .option("crm", "123456");

        let body = client.send_single(&state).await.unwrap();
        assert_eq!(body, r#"{"status":"success"}"#);

        let request = transport.last_request();
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.url, "https://api.example.com/send/single");
        assert_eq!(request.header("authorization"), Some("Bearer test-api-key"));
        assert_eq!(request.header("Content-Type"), Some("application/json"));
        assert_eq!(
            transport.last_payload(),
            json!({
                "template": "welcome",
                "email": "john@example.com",
                "firstName": "John",
                "lastName": "Doe",
                "options": {"crm": "123456"}
            })
        );
    }

    #[tokio::test]
    async fn send_routes_lists_to_batch_endpoint() {
        let transport = success();
        let client = make_client(transport.clone());

        let state = RequestState::new()
            .template("sms")
            .to_phone(["+33628361721", "+33628361722"])
            .unwrap();
        client.send(&state).await.unwrap();
        let request = transport.last_request();
        assert_eq!(request.url, "https://api.example.com/send/list");
        assert_eq!(
            transport.last_payload(),
            json!([
                {"template": "sms", "phone": "+33628361721"},
                {"template": "sms", "phone": "+33628361722"}
            ])
        );

        let state = RequestState::new()
            .template("sms")
            .to_phone("+33628361721")
            .unwrap();
        client.send(&state).await.unwrap();
        assert_eq!(
            transport.last_request().url,
            "https://api.example.com/send/single"
        );
    }

    #[tokio::test]
    async fn send_single_rejects_per_recipient_options_before_io() {
        let transport = success();
        let client = make_client(transport.clone());
        let state = RequestState::new()
            .to_email("john@example.com")
            .unwrap()
            .per_recipient_options(vec![Options::from_iter([("crm", "1")])]);

        let err = client.send_single(&state).await.unwrap_err();

        assert!(matches!(
            err,
            MailerError::InvalidOperation(OperationError::PerRecipientOptions { .. })
        ));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn send_single_rejects_lists() {
        let transport = success();
        let client = make_client(transport.clone());
        let state = RequestState::new()
            .to_email(["a@x.com", "b@x.com"])
            .unwrap();

        let err = client.send_single(&state).await.unwrap_err();

        assert!(matches!(
            err,
            MailerError::InvalidOperation(OperationError::MultipleRecipients { .. })
        ));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn send_batch_uses_per_recipient_options() {
        let transport = success();
        let client = make_client(transport.clone());
        let state = RequestState::new()
            .to_email(["a@x.com", "b@x.com"])
            .unwrap()
            .per_recipient_options(vec![
                Options::from_iter([("crm", "1")]),
                Options::from_iter([("crm", "2")]),
            ]);

        client.send_batch(&state).await.unwrap();

        let payload = transport.last_payload();
        assert_eq!(payload[0]["options"], json!({"crm": "1"}));
        assert_eq!(payload[1]["options"], json!({"crm": "2"}));
    }

    #[tokio::test]
    async fn send_batch_requires_recipients() {
        let transport = success();
        let client = make_client(transport.clone());

        let err = client
            .send_batch(&RequestState::new().template("welcome"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            MailerError::InvalidOperation(OperationError::MissingRecipient { .. })
        ));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn add_contact_posts_contact_fields() {
        let transport = FakeTransport::new(200, r#"{"status":"success","contact_id":"67890"}"#);
        let client = make_client(transport.clone());
        let state = RequestState::new()
            .scenario("welcome")
            .first_name("Jane")
            .last_name("Smith")
            .to_email("jane@example.com")
            .unwrap()
            .to_phone("+33612345678")
            .unwrap()
            .account_id("ACC-123")
            .remove_keys(["old_email", "temp_phone"])
            .exists_keys(["verified_email", "active_subscription"]);

        let body = client.add_contact(&state).await.unwrap();
        let body: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body["contact_id"], json!("67890"));

        assert_eq!(
            transport.last_request().url,
            "https://api.example.com/contact/add"
        );
        assert_eq!(
            transport.last_payload(),
            json!({
                "scenario": "welcome",
                "firstName": "Jane",
                "lastName": "Smith",
                "email": "jane@example.com",
                "phone": "+33612345678",
                "account_id": "ACC-123",
                "remove": ["old_email", "temp_phone"],
                "exists": ["verified_email", "active_subscription"]
            })
        );
    }

    #[tokio::test]
    async fn contact_operations_require_a_single_recipient() {
        let transport = success();
        let client = make_client(transport.clone());

        let multiple = RequestState::new()
            .scenario("newsletter")
            .to_email(["john@example.com", "jane@example.com"])
            .unwrap();
        let err = client.add_contact(&multiple).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid operation: add() can only be used with a single recipient; \
             set email or phone to a single value, not a list"
        );

        let err = client.remove_contact(&multiple).await.unwrap_err();
        assert!(matches!(
            err,
            MailerError::InvalidOperation(OperationError::MultipleRecipients { operation: "remove" })
        ));

        let nobody = RequestState::new().scenario("newsletter");
        let err = client.remove_contact(&nobody).await.unwrap_err();
        assert!(matches!(
            err,
            MailerError::InvalidOperation(OperationError::MissingRecipient { .. })
        ));

        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn remove_contact_posts_to_remove_endpoint() {
        let transport = success();
        let client = make_client(transport.clone());
        let state = RequestState::new()
            .scenario("newsletter")
            .to_phone("+33628361721")
            .unwrap();

        client.remove_contact(&state).await.unwrap();

        assert_eq!(
            transport.last_request().url,
            "https://api.example.com/contact/remove"
        );
        assert_eq!(
            transport.last_payload(),
            json!({"scenario": "newsletter", "phone": "+33628361721"})
        );
    }

    #[tokio::test]
    async fn send_to_recipients_merges_options_per_item() {
        let transport = success();
        let client = make_client(transport.clone());
        let recipients = vec![
            Recipient::builder()
                .email("a@x.com")
                .option("crm", "1")
                .build()
                .unwrap(),
            Recipient::phone("+33612345678").unwrap(),
        ];

        client
            .send_to_recipients(&RequestState::new(), &recipients)
            .await
            .unwrap();

        assert_eq!(
            transport.last_request().url,
            "https://api.example.com/send/list"
        );
        assert_eq!(
            transport.last_payload(),
            json!([
                {"email": "a@x.com", "options": {"crm": "1"}},
                {"phone": "+33612345678"}
            ])
        );
    }

    #[tokio::test]
    async fn recipient_operations_hit_their_endpoints() {
        let transport = success();
        let client = make_client(transport.clone());
        let state = RequestState::new().scenario("default_scenario");
        let recipient = Recipient::email("john@example.com").unwrap();

        client.send_to_recipient(&state, &recipient).await.unwrap();
        client.add_recipient(&state, &recipient).await.unwrap();
        client
            .add_recipients(&state, std::slice::from_ref(&recipient))
            .await
            .unwrap();
        client.remove_recipient(&state, &recipient).await.unwrap();

        let urls = transport
            .requests()
            .into_iter()
            .map(|request| request.url)
            .collect::<Vec<_>>();
        assert_eq!(
            urls,
            vec![
                "https://api.example.com/send/single",
                "https://api.example.com/contact/add",
                "https://api.example.com/contact/add/list",
                "https://api.example.com/contact/remove",
            ]
        );
        assert_eq!(
            transport.last_payload(),
            json!({"email": "john@example.com", "scenario": "default_scenario"})
        );
    }

    #[tokio::test]
    async fn empty_recipient_lists_are_rejected() {
        let transport = success();
        let client = make_client(transport.clone());
        let state = RequestState::new();

        assert!(matches!(
            client.send_to_recipients(&state, &[]).await,
            Err(MailerError::InvalidOperation(_))
        ));
        assert!(matches!(
            client.add_recipients(&state, &[]).await,
            Err(MailerError::InvalidOperation(_))
        ));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn non_success_status_maps_to_api_error_for_every_operation() {
        let body = r#"{"message":"The scenario field is required."}"#;
        let transport = FakeTransport::new(422, body);
        let client = make_client(transport);
        let state = RequestState::new().to_email("john@example.com").unwrap();
        let batch = RequestState::new().to_email(["a@x.com", "b@x.com"]).unwrap();
        let recipient = Recipient::email("john@example.com").unwrap();
        let recipients = vec![recipient.clone()];

        let results = vec![
            client.send(&state).await,
            client.send_single(&state).await,
            client.send_batch(&batch).await,
            client.add_contact(&state).await,
            client.remove_contact(&state).await,
            client.send_to_recipient(&state, &recipient).await,
            client.send_to_recipients(&state, &recipients).await,
            client.add_recipient(&state, &recipient).await,
            client.add_recipients(&state, &recipients).await,
            client.remove_recipient(&state, &recipient).await,
        ];

        for result in results {
            match result {
                Err(MailerError::Api { status, body: raw }) => {
                    assert_eq!(status, 422);
                    assert_eq!(raw, body);
                }
                other => panic!("unexpected result: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn api_error_message_includes_status_and_body() {
        let client = make_client(FakeTransport::new(500, "oops"));
        let state = RequestState::new().to_phone("12345678").unwrap();

        let err = client.send(&state).await.unwrap_err();

        assert_eq!(err.status(), Some(500));
        assert_eq!(err.to_string(), "API error, code 500: oops");
    }

    #[tokio::test]
    async fn transport_failure_is_surfaced() {
        let client = make_client(FakeTransport::failing());
        let state = RequestState::new().to_email("john@example.com").unwrap();

        let err = client.send(&state).await.unwrap_err();

        assert!(matches!(err, MailerError::Transport(_)));
        assert_eq!(err.to_string(), "transport error: connection refused");
        assert_eq!(err.status(), None);
    }

    #[test]
    fn http_response_success_range() {
        let ok = |status| HttpResponse {
            status,
            body: String::new(),
        };
        assert!(ok(200).is_success());
        assert!(ok(204).is_success());
        assert!(!ok(199).is_success());
        assert!(!ok(300).is_success());
        assert!(!ok(422).is_success());
    }
}
