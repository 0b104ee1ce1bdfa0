//! Outbound email. Sends run on background tasks and never hold up a response.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::models::{Booking, Payment};

const SENDGRID_SEND_URL: &str = "https://api.sendgrid.com/v3/mail/send";

#[derive(Debug, Clone, PartialEq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("mail request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("mail provider rejected message ({status})")]
    Rejected { status: u16 },
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> Result<(), MailError>;
}

pub struct SendGridMailer {
    http: reqwest::Client,
    api_key: String,
    from: String,
}

impl SendGridMailer {
    pub fn new(api_key: String, from: String) -> Result<Self, MailError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self { http, api_key, from })
    }
}

#[async_trait]
impl Mailer for SendGridMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        let payload = json!({
            "personalizations": [{ "to": [{ "email": email.to }] }],
            "from": { "email": self.from },
            "subject": email.subject,
            "content": [{ "type": "text/html", "value": email.html }],
        });

        let resp = self
            .http
            .post(SENDGRID_SEND_URL)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(MailError::Rejected {
                status: resp.status().as_u16(),
            })
        }
    }
}

/// Writes mail to the log instead of sending it.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        tracing::info!(to = %email.to, subject = %email.subject, "email (not sent, mailer disabled)");
        Ok(())
    }
}

/// Fire-and-forget send. Failures are logged only.
pub fn dispatch(mailer: Arc<dyn Mailer>, email: Email) {
    tokio::spawn(async move {
        let to = email.to.clone();
        match mailer.send(email).await {
            Ok(()) => tracing::debug!(%to, "email sent"),
            Err(e) => tracing::warn!(%to, "email dispatch failed: {e}"),
        }
    });
}

/// Request fields end up inside HTML; every one goes through this.
fn esc(value: &str) -> String {
    html_escape::encode_safe(value).into_owned()
}

pub fn booking_confirmation(booking: &Booking) -> Email {
    let greeting = esc(booking.patient_name.as_deref().unwrap_or("there"));
    let (treatment, date, slot) = (esc(&booking.treatment), esc(&booking.date), esc(&booking.slot));
    Email {
        to: booking.patient_email.clone(),
        subject: format!(
            "Your appointment for {} is on {} at {} is confirmed",
            booking.treatment, booking.date, booking.slot
        ),
        html: format!(
            "<div>\
             <p>Hello {greeting},</p>\
             <h3>Your appointment for {treatment} is confirmed</h3>\
             <p>Looking forward to seeing you on {date} at {slot}.</p>\
             </div>"
        ),
    }
}

pub fn payment_received(booking: &Booking, payment: &Payment) -> Email {
    let greeting = esc(booking.patient_name.as_deref().unwrap_or("there"));
    let (treatment, date, slot) = (esc(&booking.treatment), esc(&booking.date), esc(&booking.slot));
    let transaction_id = esc(&payment.transaction_id);
    Email {
        to: booking.patient_email.clone(),
        subject: format!("We have received your payment for {}", booking.treatment),
        html: format!(
            "<div>\
             <p>Hello {greeting},</p>\
             <h3>Thank you for your payment.</h3>\
             <p>Your appointment for {treatment} on {date} at {slot} is paid.</p>\
             <p>Transaction id: {transaction_id}</p>\
             </div>"
        ),
    }
}
