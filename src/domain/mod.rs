//! Domain layer: strong types with validation and invariants (no I/O).

mod recipient;
mod state;
mod validation;
mod value;

pub use recipient::{Recipient, RecipientBuilder};
pub use state::{
    AccountMetadata, FieldValue, ListDirectives, RecipientFields, RecipientShape, RequestState,
};
pub use validation::{
    OperationError, PHONE_MIN_DIGITS, RecipientKind, ValidationError, require_batch_recipients,
    require_no_per_recipient_overrides, require_scalar_recipient, require_single_recipient,
    validate_email, validate_phone, validate_recipient_collection,
};
pub use value::{
    ApiKey, Endpoint, FileRef, Options, Timestamp, format_timestamp, parse_timestamp,
};
