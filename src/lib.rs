//! Typed Rust client for the KandMailer transactional messaging API.
//!
//! The crate has three layers: a domain layer of strong types (recipients,
//! request state, validation), a transport layer that turns them into JSON
//! payloads, and a small client layer posting those payloads over HTTP.
//!
//! ```rust,no_run
//! use kandmailer::{MailerClient, RequestState};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), kandmailer::MailerError> {
//!     let client = MailerClient::new("api-key", "https://api.example.com")?;
//!     let state = RequestState::new()
//!         .template("welcome")
//!         .to_email("john@example.com")?
//!         .first_name("John")
//!         .option("crm", "123456");
//!     let body = client.send(&state).await?;
//!     println!("{body}");
//!     Ok(())
//! }
//! ```
#![forbid(unsafe_code)]

pub mod client;
pub mod domain;
mod transport;

pub use client::{
    HttpRequest, HttpResponse, HttpTransport, MailerClient, MailerClientBuilder, MailerError,
    ReqwestTransport,
};
pub use domain::{
    ApiKey, Endpoint, FieldValue, FileRef, OperationError, Options, Recipient, RecipientBuilder,
    RequestState, Timestamp, ValidationError,
};
pub use transport::{
    Payload, PayloadError, build_batch, build_from_recipient, build_from_recipients, build_single,
    encode_json,
};
