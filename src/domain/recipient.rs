use chrono::SecondsFormat;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::domain::validation::{ValidationError, validate_email, validate_phone};
use crate::domain::value::{Options, Timestamp, parse_timestamp};

#[derive(Debug, Clone, PartialEq)]
/// One message target.
///
/// Invariant: at least one of email and phone is set, and each set one passes its
/// shape check. Fields cannot change after construction.
pub struct Recipient {
    email: Option<String>,
    phone: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    options: Options,
    scenario: Option<String>,
    account_id: Option<String>,
    created_at: Option<Timestamp>,
}

impl Recipient {
    pub fn builder() -> RecipientBuilder {
        RecipientBuilder::default()
    }

    /// Shorthand for a recipient identified only by email.
    pub fn email(email: impl Into<String>) -> Result<Self, ValidationError> {
        Self::builder().email(email).build()
    }

    /// Shorthand for a recipient identified only by phone.
    pub fn phone(phone: impl Into<String>) -> Result<Self, ValidationError> {
        Self::builder().phone(phone).build()
    }

    /// Build from a JSON object using the `email`, `phone`, `firstName`, `lastName`,
    /// `options`, `scenario`, `accountId` and `createdAt` keys. `null` means unset;
    /// other keys are ignored.
    pub fn from_map(map: Map<String, Value>) -> Result<Self, ValidationError> {
        let record: RecipientRecord =
            serde_json::from_value(Value::Object(map)).map_err(|err| ValidationError::Malformed {
                field: "recipient",
                reason: err.to_string(),
            })?;
        Self::try_from(record)
    }

    /// JSON object holding exactly the fields that are set, under the keys
    /// accepted by [`Recipient::from_map`]. `createdAt` keeps sub-second precision.
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        let text_fields = [
            ("email", self.email.as_deref()),
            ("phone", self.phone.as_deref()),
            ("firstName", self.first_name.as_deref()),
            ("lastName", self.last_name.as_deref()),
            ("scenario", self.scenario.as_deref()),
            ("accountId", self.account_id.as_deref()),
        ];
        for (key, value) in text_fields {
            if let Some(value) = value {
                map.insert(key.to_owned(), Value::from(value));
            }
        }
        if !self.options.is_empty() {
            map.insert("options".to_owned(), Value::Object(self.options.as_map().clone()));
        }
        if let Some(created_at) = &self.created_at {
            map.insert(
                "createdAt".to_owned(),
                Value::from(created_at.to_rfc3339_opts(SecondsFormat::AutoSi, false)),
            );
        }
        map
    }

    pub fn email_address(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn phone_number(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    pub fn first_name(&self) -> Option<&str> {
        self.first_name.as_deref()
    }

    pub fn last_name(&self) -> Option<&str> {
        self.last_name.as_deref()
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn scenario(&self) -> Option<&str> {
        self.scenario.as_deref()
    }

    pub fn account_id(&self) -> Option<&str> {
        self.account_id.as_deref()
    }

    pub fn created_at(&self) -> Option<&Timestamp> {
        self.created_at.as_ref()
    }

    fn validate(self) -> Result<Self, ValidationError> {
        if self.email.is_none() && self.phone.is_none() {
            return Err(ValidationError::MissingContact);
        }
        if let Some(email) = self.email.as_deref() {
            validate_email(email)?;
        }
        if let Some(phone) = self.phone.as_deref() {
            validate_phone(phone)?;
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, Default)]
/// Builder for [`Recipient`]; validation runs in [`RecipientBuilder::build`].
pub struct RecipientBuilder {
    email: Option<String>,
    phone: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    options: Options,
    scenario: Option<String>,
    account_id: Option<String>,
    created_at: Option<Timestamp>,
}

impl RecipientBuilder {
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn first_name(mut self, first_name: impl Into<String>) -> Self {
        self.first_name = Some(first_name.into());
        self
    }

    pub fn last_name(mut self, last_name: impl Into<String>) -> Self {
        self.last_name = Some(last_name.into());
        self
    }

    pub fn option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key, value);
        self
    }

    pub fn options(mut self, options: impl Into<Options>) -> Self {
        self.options = options.into();
        self
    }

    pub fn scenario(mut self, scenario: impl Into<String>) -> Self {
        self.scenario = Some(scenario.into());
        self
    }

    pub fn account_id(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    pub fn created_at(mut self, created_at: impl Into<Timestamp>) -> Self {
        self.created_at = Some(created_at.into());
        self
    }

    pub fn build(self) -> Result<Recipient, ValidationError> {
        Recipient {
            email: self.email,
            phone: self.phone,
            first_name: self.first_name,
            last_name: self.last_name,
            options: self.options,
            scenario: self.scenario,
            account_id: self.account_id,
            created_at: self.created_at,
        }
        .validate()
    }
}

/// Map form of a [`Recipient`], as read by [`Recipient::from_map`].
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecipientRecord {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    options: Option<Options>,
    #[serde(default)]
    scenario: Option<String>,
    #[serde(default)]
    account_id: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
}

impl TryFrom<RecipientRecord> for Recipient {
    type Error = ValidationError;

    fn try_from(record: RecipientRecord) -> Result<Self, Self::Error> {
        let created_at = record
            .created_at
            .as_deref()
            .map(parse_timestamp)
            .transpose()?;
        Recipient {
            email: record.email,
            phone: record.phone,
            first_name: record.first_name,
            last_name: record.last_name,
            options: record.options.unwrap_or_default(),
            scenario: record.scenario,
            account_id: record.account_id,
            created_at,
        }
        .validate()
    }
}
