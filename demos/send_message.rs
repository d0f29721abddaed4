use std::io;

use kandmailer::{MailerClientBuilder, Recipient, RequestState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let email = std::env::var("KANDMAILER_TO").map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            "KANDMAILER_TO environment variable is required",
        )
    })?;
    let template =
        std::env::var("KANDMAILER_TEMPLATE").unwrap_or_else(|_| "welcome".to_owned());

    // KANDMAILER_API_KEY and KANDMAILER_ENDPOINT
    let client = MailerClientBuilder::from_env()?.build()?;

    let state = RequestState::new()
        .template(template)
        .option("source", "kandmailer-demo");
    let recipient = Recipient::builder().email(email).first_name("Demo").build()?;

    let body = client.send_to_recipient(&state, &recipient).await?;
    println!("response: {body}");

    Ok(())
}
