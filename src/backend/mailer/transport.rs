/**
 * SMTP Transport
 */

use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, Tokio1Executor};

use crate::backend::mailer::MailError;
use crate::shared::SmtpSettings;

const IMPLICIT_TLS_PORT: u16 = 465;

/// Build the SMTP transport: implicit TLS on 465, STARTTLS elsewhere
pub fn new_transport(settings: &SmtpSettings) -> Result<AsyncSmtpTransport<Tokio1Executor>, MailError> {
    let builder = if settings.port == IMPLICIT_TLS_PORT {
        AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)?
    } else {
        AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)?
    };
    let builder = builder.port(settings.port);

    let builder = if settings.user.is_empty() {
        builder
    } else {
        builder.credentials(Credentials::new(settings.user.clone(), settings.password.clone()))
    };
    Ok(builder.build())
}
