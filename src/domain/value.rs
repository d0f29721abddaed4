use std::fmt;

use chrono::{DateTime, FixedOffset, SecondsFormat};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::validation::ValidationError;

/// Timestamp carried as `created_at`, always with an explicit UTC offset.
pub type Timestamp = DateTime<FixedOffset>;

/// Format a timestamp as RFC 3339 with whole seconds and a `+hh:mm` offset
/// (`2024-01-15T10:30:00+00:00`).
pub fn format_timestamp(value: &Timestamp) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// Parse an RFC 3339 timestamp, keeping its offset.
pub fn parse_timestamp(input: &str) -> Result<Timestamp, ValidationError> {
    DateTime::parse_from_rfc3339(input.trim()).map_err(|_| ValidationError::InvalidTimestamp {
        input: input.to_owned(),
    })
}

#[derive(Clone, PartialEq, Eq, Hash)]
/// Bearer token used to authenticate API calls.
///
/// Invariant: non-empty after trimming. `Debug` never prints the token.
pub struct ApiKey(String);

impl ApiKey {
    pub const FIELD: &'static str = "api_key";

    /// Create a validated [`ApiKey`].
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: Self::FIELD });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the validated token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Base URL of the API.
///
/// Invariant: an absolute `http`/`https` URL with every trailing `/` removed, so
/// request paths can be appended directly.
pub struct Endpoint(String);

impl Endpoint {
    pub const FIELD: &'static str = "endpoint";

    /// Validate and normalize an endpoint base URL.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let trimmed = value.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: Self::FIELD });
        }
        let parsed = url::Url::parse(trimmed).map_err(|_| ValidationError::InvalidEndpoint {
            input: value.clone(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(ValidationError::InvalidEndpoint { input: value });
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Full URL for an API path such as `/send/single`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.0, path)
    }
}

/// Free-form key/value options forwarded to the API as the `options` object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Options(Map<String, Value>);

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key`, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Shallow merge: keys from `overlay` win, keys found on only one side survive.
    pub fn merged_with(&self, overlay: &Options) -> Options {
        let mut merged = self.0.clone();
        for (key, value) in &overlay.0 {
            merged.insert(key.clone(), value.clone());
        }
        Self(merged)
    }
}

impl From<Map<String, Value>> for Options {
    fn from(value: Map<String, Value>) -> Self {
        Self(value)
    }
}

impl<K, V> FromIterator<(K, V)> for Options
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Reference to a file already uploaded to the API.
///
/// The API addresses it as `<public_id>/<secret_id>`.
pub struct FileRef {
    label: String,
    public_id: String,
    secret_id: String,
}

impl FileRef {
    pub fn new(
        label: impl Into<String>,
        public_id: impl Into<String>,
        secret_id: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            public_id: public_id.into(),
            secret_id: secret_id.into(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn public_id(&self) -> &str {
        &self.public_id
    }

    pub fn secret_id(&self) -> &str {
        &self.secret_id
    }

    pub fn id(&self) -> String {
        format!("{}/{}", self.public_id, self.secret_id)
    }
}
