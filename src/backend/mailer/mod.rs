//! Outgoing mail
//!
//! `Mailer` wraps an SMTP transport and the configured sender identity.
//! Tests swap the SMTP transport for lettre's stub transport.

pub mod transport;

use lettre::address::AddressError;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::stub::AsyncStubTransport;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::shared::SmtpSettings;

pub use transport::new_transport;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Invalid email address: {0}")]
    InvalidAddress(#[from] AddressError),

    #[error("Failed to build email: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("Mail transport error: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailKind {
    #[default]
    Text,
    Html,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Mail {
    pub receiver: String,
    pub subject: String,
    pub body: String,
    #[serde(default, rename = "type")]
    pub kind: MailKind,
}

#[derive(Clone)]
enum Transport {
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    Stub(AsyncStubTransport),
}

#[derive(Clone)]
pub struct Mailer {
    transport: Transport,
    from: Mailbox,
}

impl Mailer {
    pub fn new(settings: &SmtpSettings) -> Result<Self, MailError> {
        let transport = Transport::Smtp(new_transport(settings)?);
        let mailer = Self {
            transport,
            from: sender(settings)?,
        };
        info!("=> Mail service started!");
        Ok(mailer)
    }

    /// Mailer that records messages instead of sending them
    pub fn stub(settings: &SmtpSettings, transport: AsyncStubTransport) -> Result<Self, MailError> {
        Ok(Self {
            transport: Transport::Stub(transport),
            from: sender(settings)?,
        })
    }

    pub async fn send_mail(&self, mail: Mail) -> Result<(), MailError> {
        let content_type = match mail.kind {
            MailKind::Text => ContentType::TEXT_PLAIN,
            MailKind::Html => ContentType::TEXT_HTML,
        };
        let message = Message::builder()
            .from(self.from.clone())
            .to(mail.receiver.parse::<Mailbox>()?)
            .subject(mail.subject)
            .header(content_type)
            .body(mail.body)?;

        match &self.transport {
            Transport::Smtp(smtp) => {
                let response = smtp.send(message).await?;
                debug!(code = %response.code(), "Mail sent");
            }
            Transport::Stub(stub) => {
                stub.send(message)
                    .await
                    .map_err(|e| MailError::Transport(e.to_string()))?;
            }
        }
        Ok(())
    }
}

fn sender(settings: &SmtpSettings) -> Result<Mailbox, MailError> {
    let address: Address = settings.email_from.parse()?;
    Ok(Mailbox::new(Some(settings.email_name.clone()), address))
}
