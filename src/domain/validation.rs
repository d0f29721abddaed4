use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::domain::state::{FieldValue, RequestState};

/// Local part made of RFC 5322 `atext` atoms joined by single dots, followed by
/// a domain of at least two DNS labels.
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$",
    )
    .expect("email regex is valid")
});

const EMAIL_MAX_LEN: usize = 254;
const EMAIL_LOCAL_MAX_LEN: usize = 64;

/// Minimum number of digits a phone number must contain.
pub const PHONE_MIN_DIGITS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Empty { field: &'static str },
    InvalidEmail { input: String },
    InvalidPhoneNumber { input: String },
    MissingContact,
    InvalidTimestamp { input: String },
    Malformed { field: &'static str, reason: String },
    InvalidEndpoint { input: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty { field } => write!(f, "{field} must not be empty"),
            Self::InvalidEmail { input } => write!(f, "invalid email: {input}"),
            Self::InvalidPhoneNumber { input } => write!(f, "invalid phone number: {input}"),
            Self::MissingContact => {
                write!(f, "at least one of email or phone must be provided")
            }
            Self::InvalidTimestamp { input } => {
                write!(f, "invalid RFC 3339 timestamp: {input}")
            }
            Self::Malformed { field, reason } => write!(f, "malformed {field}: {reason}"),
            Self::InvalidEndpoint { input } => write!(f, "invalid endpoint URL: {input}"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Misuse of an operation given the current request state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationError {
    MissingRecipient { operation: &'static str },
    MultipleRecipients { operation: &'static str },
    PerRecipientOptions { operation: &'static str },
}

impl fmt::Display for OperationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingRecipient { operation } => {
                write!(f, "{operation}() requires an email and/or a phone")
            }
            Self::MultipleRecipients { operation } => write!(
                f,
                "{operation}() can only be used with a single recipient; \
                 set email or phone to a single value, not a list"
            ),
            Self::PerRecipientOptions { operation } => write!(
                f,
                "{operation}() cannot use per-recipient options; they only apply to batch sends"
            ),
        }
    }
}

impl std::error::Error for OperationError {}

/// Which recipient field a collection check applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipientKind {
    Email,
    Phone,
}

impl RecipientKind {
    pub fn field(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Phone => "phone",
        }
    }

    fn validate(self, value: &str) -> Result<(), ValidationError> {
        match self {
            Self::Email => validate_email(value),
            Self::Phone => validate_phone(value),
        }
    }
}

pub fn validate_email(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty { field: "email" });
    }
    let local_len = value.split_once('@').map_or(0, |(local, _)| local.len());
    if value.len() > EMAIL_MAX_LEN
        || local_len > EMAIL_LOCAL_MAX_LEN
        || !EMAIL_RE.is_match(value)
    {
        return Err(ValidationError::InvalidEmail {
            input: value.to_owned(),
        });
    }
    Ok(())
}

pub fn validate_phone(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty { field: "phone" });
    }
    let digits = value.chars().filter(char::is_ascii_digit).count();
    if digits < PHONE_MIN_DIGITS {
        return Err(ValidationError::InvalidPhoneNumber {
            input: value.to_owned(),
        });
    }
    Ok(())
}

/// Apply the check for `kind` to every element; holes in the sequence are rejected.
pub fn validate_recipient_collection(
    values: &FieldValue,
    kind: RecipientKind,
) -> Result<(), ValidationError> {
    for value in values.iter() {
        match value {
            Some(value) => kind.validate(value)?,
            None => return Err(ValidationError::Empty { field: kind.field() }),
        }
    }
    Ok(())
}

/// Contact operations address exactly one recipient given as scalar values.
pub fn require_single_recipient(
    state: &RequestState,
    operation: &'static str,
) -> Result<(), OperationError> {
    let fields = state.recipient_fields();
    let (email, phone) = (fields.email(), fields.phone());
    if email.is_none() && phone.is_none() {
        return Err(OperationError::MissingRecipient { operation });
    }
    if email.is_some_and(FieldValue::is_many) || phone.is_some_and(FieldValue::is_many) {
        return Err(OperationError::MultipleRecipients { operation });
    }
    Ok(())
}

pub fn require_no_per_recipient_overrides(
    state: &RequestState,
    operation: &'static str,
) -> Result<(), OperationError> {
    if state.option_overrides().is_empty() {
        Ok(())
    } else {
        Err(OperationError::PerRecipientOptions { operation })
    }
}

/// A single send accepts one-element sequences but not real lists.
pub fn require_scalar_recipient(
    state: &RequestState,
    operation: &'static str,
) -> Result<(), OperationError> {
    let fields = state.recipient_fields();
    let multi = [
        fields.email(),
        fields.phone(),
        fields.first_name(),
        fields.last_name(),
    ]
    .into_iter()
    .flatten()
    .any(|value| value.len() > 1);
    if multi {
        return Err(OperationError::MultipleRecipients { operation });
    }
    Ok(())
}

pub fn require_batch_recipients(
    state: &RequestState,
    operation: &'static str,
) -> Result<(), OperationError> {
    if state.recipient_fields().batch_len() == 0 {
        return Err(OperationError::MissingRecipient { operation });
    }
    Ok(())
}
