//! Outgoing e-mail.
//!
//! Services talk to a [`Mailer`]. The default [`LogMailer`] writes each
//! message to the log and keeps a short in-memory outbox; with the
//! `smtp-mail` feature an [`SmtpMailer`] relays through an SMTP server.

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::info;

use crate::config::MailSettings;

const OUTBOX_CAPACITY: usize = 50;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("invalid address: {0}")]
    Address(String),
    #[error("failed to build message: {0}")]
    Build(String),
    #[error("delivery failed: {0}")]
    Transport(String),
}

/// A rendered plain-text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Data shown in a booking confirmation.
#[derive(Debug, Clone)]
pub struct BookingConfirmation {
    pub guest_name: String,
    pub homestay_name: String,
    pub booking_code: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub nights: i64,
    pub room_count: usize,
    pub total_amount: f64,
    /// Link to the guest's booking list.
    pub link: String,
    /// Year shown in the footer.
    pub year: i32,
}

impl BookingConfirmation {
    pub fn render(&self, to: &str) -> OutgoingMail {
        let body = format!(
            "Xin chào {guest},\n\n\
             Đặt phòng {code} tại {homestay} đã được xác nhận.\n\n\
             Nhận phòng: {check_in}\n\
             Trả phòng: {check_out}\n\
             Số đêm: {nights}\n\
             Số phòng: {rooms}\n\
             Tổng tiền: {total:.2}\n\n\
             Xem chi tiết: {link}\n\n\
             © {year} Homestay",
            guest = self.guest_name,
            code = self.booking_code,
            homestay = self.homestay_name,
            check_in = self.check_in.format("%d-%m-%Y"),
            check_out = self.check_out.format("%d-%m-%Y"),
            nights = self.nights,
            rooms = self.room_count,
            total = self.total_amount,
            link = self.link,
            year = self.year,
        );
        OutgoingMail {
            to: to.to_string(),
            subject: format!("Xác nhận đặt phòng {}", self.booking_code),
            body,
        }
    }
}

pub fn render_verification(to: &str, name: &str, link: &str) -> OutgoingMail {
    OutgoingMail {
        to: to.to_string(),
        subject: "Kích hoạt tài khoản Homestay".to_string(),
        body: format!(
            "Xin chào {},\n\nVui lòng kích hoạt tài khoản của bạn tại liên kết sau:\n{}\n\n\
             Liên kết có hiệu lực trong 24 giờ.",
            name, link
        ),
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError>;

    async fn send_verification(&self, to: &str, name: &str, link: &str) -> Result<(), MailError> {
        self.send(render_verification(to, name, link)).await
    }

    async fn send_booking_confirmation(
        &self,
        to: &str,
        data: &BookingConfirmation,
    ) -> Result<(), MailError> {
        self.send(data.render(to)).await
    }
}

/// Mailer that only logs. Recent messages stay readable through [`LogMailer::sent`].
#[derive(Debug, Clone, Default)]
pub struct LogMailer {
    outbox: Arc<Mutex<VecDeque<OutgoingMail>>>,
}

impl LogMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages sent so far, oldest first.
    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.outbox.lock().iter().cloned().collect()
    }

    pub fn last_to(&self, to: &str) -> Option<OutgoingMail> {
        self.outbox.lock().iter().rev().find(|m| m.to == to).cloned()
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        info!(to = %mail.to, subject = %mail.subject, "mail dispatched");
        let mut outbox = self.outbox.lock();
        if outbox.len() == OUTBOX_CAPACITY {
            outbox.pop_front();
        }
        outbox.push_back(mail);
        Ok(())
    }
}

#[cfg(feature = "smtp-mail")]
pub use smtp::SmtpMailer;

#[cfg(feature = "smtp-mail")]
mod smtp {
    use super::*;
    use lettre::message::header::ContentType;
    use lettre::transport::smtp::authentication::Credentials;
    use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

    /// Mailer backed by an SMTP relay using STARTTLS.
    #[derive(Clone)]
    pub struct SmtpMailer {
        transport: AsyncSmtpTransport<Tokio1Executor>,
        from: String,
    }

    impl SmtpMailer {
        pub fn new(settings: &MailSettings) -> Result<Self, MailError> {
            let mut builder =
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.smtp_host)
                    .map_err(|e| MailError::Transport(e.to_string()))?
                    .port(settings.smtp_port);
            if !settings.username.is_empty() {
                builder = builder.credentials(Credentials::new(
                    settings.username.clone(),
                    settings.password.clone(),
                ));
            }
            Ok(Self {
                transport: builder.build(),
                from: settings.from.clone(),
            })
        }
    }

    #[async_trait]
    impl Mailer for SmtpMailer {
        async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
            let message = Message::builder()
                .from(
                    self.from
                        .parse()
                        .map_err(|_| MailError::Address(self.from.clone()))?,
                )
                .to(mail
                    .to
                    .parse()
                    .map_err(|_| MailError::Address(mail.to.clone()))?)
                .subject(mail.subject.clone())
                .header(ContentType::TEXT_PLAIN)
                .body(mail.body.clone())
                .map_err(|e| MailError::Build(e.to_string()))?;

            self.transport
                .send(message)
                .await
                .map_err(|e| MailError::Transport(e.to_string()))?;
            info!(to = %mail.to, subject = %mail.subject, "mail delivered over smtp");
            Ok(())
        }
    }
}

/// Pick the mailer for the configured settings.
pub fn mailer_from_settings(settings: &MailSettings) -> Result<Arc<dyn Mailer>, MailError> {
    #[cfg(feature = "smtp-mail")]
    {
        if !settings.smtp_host.is_empty() {
            return Ok(Arc::new(SmtpMailer::new(settings)?));
        }
    }
    #[cfg(not(feature = "smtp-mail"))]
    {
        if !settings.smtp_host.is_empty() {
            tracing::warn!(
                host = %settings.smtp_host,
                "smtp host configured but smtp-mail feature is disabled; using log mailer"
            );
        }
    }
    Ok(Arc::new(LogMailer::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn confirmation() -> BookingConfirmation {
        BookingConfirmation {
            guest_name: "Lan".into(),
            homestay_name: "Hoi An Garden".into(),
            booking_code: "BK20260701120000AB12".into(),
            check_in: NaiveDate::from_ymd_opt(2026, 7, 1).unwrap(),
            check_out: NaiveDate::from_ymd_opt(2026, 7, 3).unwrap(),
            nights: 2,
            room_count: 1,
            total_amount: 1200000.0,
            link: "http://localhost:3000/bookings".into(),
            year: 2025,
        }
    }

    #[test]
    fn test_confirmation_formats_dates_and_total() {
        let mail = confirmation().render("lan@example.com");
        assert!(mail.body.contains("01-07-2026"));
        assert!(mail.body.contains("03-07-2026"));
        assert!(mail.body.contains("1200000.00"));
        assert!(mail.body.contains("http://localhost:3000/bookings"));
        assert!(mail.subject.contains("BK20260701120000AB12"));
        assert!(mail.body.ends_with("© 2025 Homestay"));
    }

    #[tokio::test]
    async fn test_log_mailer_keeps_bounded_outbox() {
        let mailer = LogMailer::new();
        for i in 0..(OUTBOX_CAPACITY + 5) {
            mailer
                .send_verification(&format!("user{}@example.com", i), "User", "http://x")
                .await
                .unwrap();
        }
        let sent = mailer.sent();
        assert_eq!(sent.len(), OUTBOX_CAPACITY);
        assert_eq!(sent[0].to, "user5@example.com");
        assert!(mailer.last_to("user54@example.com").is_some());
    }
}
