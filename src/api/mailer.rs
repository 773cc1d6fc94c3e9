use anyhow::{Context, Result};
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::header::ContentType,
    transport::smtp::authentication::Credentials,
};

use crate::config::SmtpConfig;

/// Async SMTP relay for transactional mail (contact form submissions).
#[derive(Clone)]
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
    contact_recipient: String,
}

impl Mailer {
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let credentials = Credentials::new(config.username.clone(), config.password.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .context("Failed to build SMTP transport")?
            .port(config.port)
            .credentials(credentials)
            .build();

        Ok(Self {
            transport,
            from_address: config.from_address.clone(),
            contact_recipient: config.contact_recipient.clone(),
        })
    }

    /// Relay a contact-form submission to the configured recipient, with
    /// the visitor's address set as reply-to.
    pub async fn send_contact_message(
        &self,
        name: &str,
        reply_to: &str,
        message: &str,
    ) -> Result<()> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .context("Invalid MAIL_FROM address")?,
            )
            .reply_to(reply_to.parse().context("Invalid sender address")?)
            .to(self
                .contact_recipient
                .parse()
                .context("Invalid CONTACT_RECIPIENT address")?)
            .subject("New contact form submission")
            .header(ContentType::TEXT_PLAIN)
            .body(format!("From: {name} <{reply_to}>\n\n{message}"))
            .context("Failed to build contact email")?;

        self.transport
            .send(email)
            .await
            .context("Failed to send contact email")?;
        Ok(())
    }
}
