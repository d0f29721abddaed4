use serde::Serialize;

use crate::domain::{FieldValue, FileRef, Options, Recipient, RequestState, Timestamp, format_timestamp};

#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("failed to encode JSON payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// JSON body for one recipient.
///
/// Only resolved values are serialized; no key is ever written as `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Payload {
    #[serde(skip_serializing_if = "Option::is_none")]
    template: Option<String>,
    #[serde(rename = "firstName", skip_serializing_if = "Option::is_none")]
    first_name: Option<String>,
    #[serde(rename = "lastName", skip_serializing_if = "Option::is_none")]
    last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scenario: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    account_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    created_at: Option<String>,
    #[serde(skip_serializing_if = "Options::is_empty")]
    options: Options,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    files: Vec<FilePayload>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    remove: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    exists: Vec<String>,
}

impl Payload {
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    pub fn options(&self) -> &Options {
        &self.options
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct FilePayload {
    label: String,
    id: String,
}

impl From<&FileRef> for FilePayload {
    fn from(file: &FileRef) -> Self {
        Self {
            label: file.label().to_owned(),
            id: file.id(),
        }
    }
}

/// A value that counts as set when building a payload.
trait Present {
    fn is_present(&self) -> bool;
}

impl Present for str {
    fn is_present(&self) -> bool {
        !self.is_empty()
    }
}

impl Present for Timestamp {
    fn is_present(&self) -> bool {
        true
    }
}

/// First source holding a present value, in priority order.
fn first_present<'a, T: Present + ?Sized>(sources: &[Option<&'a T>]) -> Option<&'a T> {
    sources
        .iter()
        .flatten()
        .copied()
        .find(|value| value.is_present())
}

fn owned(value: Option<&str>) -> Option<String> {
    first_present(&[value]).map(str::to_owned)
}

fn scalar(field: Option<&FieldValue>) -> Option<&str> {
    field.and_then(FieldValue::as_scalar)
}

fn at(field: Option<&FieldValue>, index: usize) -> Option<&str> {
    field.and_then(|value| value.get(index))
}

fn timestamp(sources: &[Option<&Timestamp>]) -> Option<String> {
    first_present(sources).map(format_timestamp)
}

/// Fields that every payload takes from the state, whatever the recipient mode.
fn shared(state: &RequestState) -> Payload {
    let directives = state.directives();
    Payload {
        template: owned(state.template_name()),
        files: state.attachments().iter().map(FilePayload::from).collect(),
        remove: directives.remove().to_vec(),
        exists: directives.exists().to_vec(),
        ..Payload::default()
    }
}

/// Payload for a single send, read from the scalar view of the recipient fields.
pub fn build_single(state: &RequestState) -> Payload {
    let fields = state.recipient_fields();
    let metadata = state.metadata();
    Payload {
        first_name: owned(scalar(fields.first_name())),
        last_name: owned(scalar(fields.last_name())),
        email: owned(scalar(fields.email())),
        phone: owned(scalar(fields.phone())),
        scenario: owned(metadata.scenario()),
        account_id: owned(metadata.account_id()),
        created_at: timestamp(&[metadata.created_at()]),
        options: state.global_options().clone(),
        ..shared(state)
    }
}

/// One payload per index of the parallel recipient arrays.
///
/// The batch is as long as the longest array; shorter arrays contribute nothing
/// past their end. A non-empty per-recipient options entry replaces the global
/// options for its index.
pub fn build_batch(state: &RequestState) -> Vec<Payload> {
    let fields = state.recipient_fields();
    let metadata = state.metadata();
    let base = Payload {
        scenario: owned(metadata.scenario()),
        account_id: owned(metadata.account_id()),
        created_at: timestamp(&[metadata.created_at()]),
        ..shared(state)
    };

    (0..fields.batch_len())
        .map(|index| {
            let options = state
                .option_overrides()
                .get(index)
                .filter(|options| !options.is_empty())
                .unwrap_or(state.global_options());

            Payload {
                first_name: owned(at(fields.first_name(), index)),
                last_name: owned(at(fields.last_name(), index)),
                email: owned(at(fields.email(), index)),
                phone: owned(at(fields.phone(), index)),
                options: options.clone(),
                ..base.clone()
            }
        })
        .collect()
}

/// Payload for an explicit recipient. Scenario, account id and creation date fall
/// back to the state; options are the global ones overlaid by the recipient's.
pub fn build_from_recipient(state: &RequestState, recipient: &Recipient) -> Payload {
    let metadata = state.metadata();

    Payload {
        first_name: owned(recipient.first_name()),
        last_name: owned(recipient.last_name()),
        email: owned(recipient.email_address()),
        phone: owned(recipient.phone_number()),
        scenario: owned(first_present(&[recipient.scenario(), metadata.scenario()])),
        account_id: owned(first_present(&[
            recipient.account_id(),
            metadata.account_id(),
        ])),
        created_at: timestamp(&[recipient.created_at(), metadata.created_at()]),
        options: state.global_options().merged_with(recipient.options()),
        ..shared(state)
    }
}

pub fn build_from_recipients(state: &RequestState, recipients: &[Recipient]) -> Vec<Payload> {
    recipients
        .iter()
        .map(|recipient| build_from_recipient(state, recipient))
        .collect()
}

pub fn encode_json<T: Serialize + ?Sized>(payload: &T) -> Result<String, PayloadError> {
    Ok(serde_json::to_string(payload)?)
}
