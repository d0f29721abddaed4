use serde_json::Value;

use crate::domain::validation::{RecipientKind, ValidationError, validate_recipient_collection};
use crate::domain::value::{FileRef, Options, Timestamp};

/// A recipient field holding either one value or an ordered list of values.
///
/// In a list, `None` marks a hole: that index contributes no value when the list
/// is zipped with the other recipient fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Single(String),
    Many(Vec<Option<String>>),
}

impl FieldValue {
    pub fn is_many(&self) -> bool {
        matches!(self, Self::Many(_))
    }

    /// Number of entries, treating a single value as a one-element list.
    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Many(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value at `index` of the list view, or `None` past the end or at a hole.
    pub fn get(&self, index: usize) -> Option<&str> {
        match self {
            Self::Single(value) if index == 0 => Some(value),
            Self::Single(_) => None,
            Self::Many(values) => values.get(index).and_then(Option::as_deref),
        }
    }

    /// The value when this field describes exactly one recipient.
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Self::Single(value) => Some(value),
            Self::Many(values) if values.len() == 1 => values[0].as_deref(),
            Self::Many(_) => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<&str>> + '_ {
        let (single, many) = match self {
            Self::Single(value) => (Some(value.as_str()), &[][..]),
            Self::Many(values) => (None, values.as_slice()),
        };
        single
            .map(Some)
            .into_iter()
            .chain(many.iter().map(Option::as_deref))
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Single(value.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Single(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(values: Vec<String>) -> Self {
        Self::Many(values.into_iter().map(Some).collect())
    }
}

impl From<Vec<&str>> for FieldValue {
    fn from(values: Vec<&str>) -> Self {
        Self::Many(values.into_iter().map(|v| Some(v.to_owned())).collect())
    }
}

impl<const N: usize> From<[&str; N]> for FieldValue {
    fn from(values: [&str; N]) -> Self {
        Self::from(Vec::from(values))
    }
}

impl From<Vec<Option<String>>> for FieldValue {
    fn from(values: Vec<Option<String>>) -> Self {
        Self::Many(values)
    }
}

impl From<Vec<Option<&str>>> for FieldValue {
    fn from(values: Vec<Option<&str>>) -> Self {
        Self::Many(
            values
                .into_iter()
                .map(|v| v.map(str::to_owned))
                .collect(),
        )
    }
}

/// How the recipient fields of a [`RequestState`] describe their targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipientShape {
    /// Neither email nor phone is set.
    Empty,
    /// One recipient.
    Scalar,
    /// Email and/or phone hold several values, joined by index.
    ParallelArrays,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipientFields {
    email: Option<FieldValue>,
    phone: Option<FieldValue>,
    first_name: Option<FieldValue>,
    last_name: Option<FieldValue>,
}

impl RecipientFields {
    pub fn email(&self) -> Option<&FieldValue> {
        self.email.as_ref()
    }

    pub fn phone(&self) -> Option<&FieldValue> {
        self.phone.as_ref()
    }

    pub fn first_name(&self) -> Option<&FieldValue> {
        self.first_name.as_ref()
    }

    pub fn last_name(&self) -> Option<&FieldValue> {
        self.last_name.as_ref()
    }

    /// Number of batch items: the longest of the four fields.
    pub fn batch_len(&self) -> usize {
        [&self.email, &self.phone, &self.first_name, &self.last_name]
            .into_iter()
            .flatten()
            .map(FieldValue::len)
            .max()
            .unwrap_or(0)
    }

    pub fn shape(&self) -> RecipientShape {
        let len = |field: &Option<FieldValue>| field.as_ref().map_or(0, FieldValue::len);
        if self.email.is_none() && self.phone.is_none() {
            RecipientShape::Empty
        } else if len(&self.email) > 1 || len(&self.phone) > 1 {
            RecipientShape::ParallelArrays
        } else {
            RecipientShape::Scalar
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountMetadata {
    scenario: Option<String>,
    account_id: Option<String>,
    created_at: Option<Timestamp>,
}

impl AccountMetadata {
    pub fn scenario(&self) -> Option<&str> {
        self.scenario.as_deref()
    }

    pub fn account_id(&self) -> Option<&str> {
        self.account_id.as_deref()
    }

    pub fn created_at(&self) -> Option<&Timestamp> {
        self.created_at.as_ref()
    }
}

/// Contact keys to delete (`remove`) or whose presence to assert (`exists`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListDirectives {
    remove: Vec<String>,
    exists: Vec<String>,
}

impl ListDirectives {
    pub fn remove(&self) -> &[String] {
        &self.remove
    }

    pub fn exists(&self) -> &[String] {
        &self.exists
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
/// Everything a request carries apart from credentials.
///
/// Built fluently and passed by reference to the
/// [`MailerClient`](crate::MailerClient) operations:
///
/// ```rust
/// use kandmailer::RequestState;
///
/// let state = RequestState::new()
///     .template("welcome")
///     .to_email("john@example.com")?
///     .first_name("John")
///     .option("lang", "fr");
/// assert_eq!(state.template_name(), Some("welcome"));
/// # Ok::<(), kandmailer::ValidationError>(())
/// ```
///
/// Email and phone values are validated when set. Clone the state rather than
/// sharing one instance between concurrent sends that also mutate it.
pub struct RequestState {
    template: Option<String>,
    recipients: RecipientFields,
    metadata: AccountMetadata,
    options: Options,
    per_recipient_options: Vec<Options>,
    files: Vec<FileRef>,
    directives: ListDirectives,
}

impl RequestState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    /// Set one email or a list of emails (batch). Every value is validated.
    pub fn to_email(mut self, emails: impl Into<FieldValue>) -> Result<Self, ValidationError> {
        let emails = emails.into();
        validate_recipient_collection(&emails, RecipientKind::Email)?;
        self.recipients.email = Some(emails);
        Ok(self)
    }

    /// Set one phone or a list of phones (batch). Every value is validated.
    pub fn to_phone(mut self, phones: impl Into<FieldValue>) -> Result<Self, ValidationError> {
        let phones = phones.into();
        validate_recipient_collection(&phones, RecipientKind::Phone)?;
        self.recipients.phone = Some(phones);
        Ok(self)
    }

    pub fn first_name(mut self, first_name: impl Into<FieldValue>) -> Self {
        self.recipients.first_name = Some(first_name.into());
        self
    }

    pub fn last_name(mut self, last_name: impl Into<FieldValue>) -> Self {
        self.recipients.last_name = Some(last_name.into());
        self
    }

    pub fn scenario(mut self, scenario: impl Into<String>) -> Self {
        self.metadata.scenario = Some(scenario.into());
        self
    }

    pub fn account_id(mut self, account_id: impl Into<String>) -> Self {
        self.metadata.account_id = Some(account_id.into());
        self
    }

    pub fn created_at(mut self, created_at: impl Into<Timestamp>) -> Self {
        self.metadata.created_at = Some(created_at.into());
        self
    }

    /// Add one global option.
    pub fn option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key, value);
        self
    }

    /// Replace all global options.
    pub fn options(mut self, options: impl Into<Options>) -> Self {
        self.options = options.into();
        self
    }

    /// Options for each index of a batch described by parallel arrays. A non-empty
    /// entry replaces the global options for that item.
    pub fn per_recipient_options(mut self, options: Vec<Options>) -> Self {
        self.per_recipient_options = options;
        self
    }

    pub fn file(
        mut self,
        label: impl Into<String>,
        public_id: impl Into<String>,
        secret_id: impl Into<String>,
    ) -> Self {
        self.files.push(FileRef::new(label, public_id, secret_id));
        self
    }

    /// Append files to the ones already attached.
    pub fn files(mut self, files: impl IntoIterator<Item = FileRef>) -> Self {
        self.files.extend(files);
        self
    }

    pub fn remove_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.directives.remove = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn exists_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.directives.exists = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Clear every field so the state can describe a new request.
    pub fn reset(&mut self) -> &mut Self {
        *self = Self::default();
        self
    }

    pub fn template_name(&self) -> Option<&str> {
        self.template.as_deref()
    }

    pub fn recipient_fields(&self) -> &RecipientFields {
        &self.recipients
    }

    pub fn metadata(&self) -> &AccountMetadata {
        &self.metadata
    }

    pub fn global_options(&self) -> &Options {
        &self.options
    }

    pub fn option_value(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }

    pub fn option_overrides(&self) -> &[Options] {
        &self.per_recipient_options
    }

    pub fn attachments(&self) -> &[FileRef] {
        &self.files
    }

    pub fn directives(&self) -> &ListDirectives {
        &self.directives
    }
}
