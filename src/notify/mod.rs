pub mod chat;
pub mod mail;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::booking::Booking;
use crate::models::driver::Driver;
use crate::models::vehicle::Vehicle;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("chat push failed: {0}")]
    Chat(String),

    #[error("mail delivery failed: {0}")]
    Mail(String),
}

#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn push(&self, channel_id: &str, text: &str) -> Result<(), NotifyError>;
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn deliver(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChannelOutcome {
    Delivered,
    Failed,
    Skipped,
}

#[derive(Debug)]
pub struct NotifyReport {
    pub chat: ChannelOutcome,
    pub mail: ChannelOutcome,
    pub warnings: Vec<String>,
}

pub struct Notifier {
    chat: Arc<dyn ChatTransport>,
    mail: Arc<dyn MailTransport>,
    admin_email: String,
}

impl Notifier {
    pub fn new(
        chat: Arc<dyn ChatTransport>,
        mail: Arc<dyn MailTransport>,
        admin_email: String,
    ) -> Self {
        Self {
            chat,
            mail,
            admin_email,
        }
    }

    pub async fn notify_driver_assignment(
        &self,
        driver: &Driver,
        booking: &Booking,
        vehicle: Option<&Vehicle>,
    ) -> NotifyReport {
        let chat_fut = async {
            match &driver.chat_channel_id {
                Some(channel) => Some(
                    self.chat
                        .push(channel, &assignment_message(driver, booking, vehicle))
                        .await,
                ),
                None => None,
            }
        };
        let (subject, body) = assignment_mail(driver, booking, vehicle);
        let mail_fut = self.mail.deliver(&self.admin_email, &subject, &body);

        let (chat_result, mail_result) = tokio::join!(chat_fut, mail_fut);

        let mut warnings = Vec::new();
        let chat = match chat_result {
            Some(Ok(())) => ChannelOutcome::Delivered,
            Some(Err(err)) => {
                warn!(
                    booking_id = %booking.id,
                    driver_id = %driver.id,
                    error = %err,
                    "chat notification failed"
                );
                warnings.push(err.to_string());
                ChannelOutcome::Failed
            }
            None => {
                debug!(driver_id = %driver.id, "driver has no chat channel, push skipped");
                ChannelOutcome::Skipped
            }
        };
        let mail = match mail_result {
            Ok(()) => ChannelOutcome::Delivered,
            Err(err) => {
                warn!(booking_id = %booking.id, error = %err, "admin mail notification failed");
                warnings.push(err.to_string());
                ChannelOutcome::Failed
            }
        };

        NotifyReport {
            chat,
            mail,
            warnings,
        }
    }

    pub async fn send_driver_message(&self, driver: &Driver, text: &str) {
        let Some(channel) = &driver.chat_channel_id else {
            debug!(driver_id = %driver.id, "driver has no chat channel, message skipped");
            return;
        };
        if let Err(err) = self.chat.push(channel, text).await {
            warn!(driver_id = %driver.id, error = %err, "driver message failed");
        }
    }
}

fn assignment_message(driver: &Driver, booking: &Booking, vehicle: Option<&Vehicle>) -> String {
    let vehicle_line = vehicle
        .map(|v| format!("\nVehicle: {} ({})", v.name, v.plate_no))
        .unwrap_or_default();
    format!(
        "New trip for you, {name}.\n\
         Purpose: {purpose}\n\
         Destination: {destination}\n\
         Departs: {departs}{vehicle_line}\n\
         Reply with ACCEPT {id} to take the job.",
        name = driver.full_name,
        purpose = booking.purpose,
        destination = booking.destination,
        departs = booking.depart_at.format("%Y-%m-%d %H:%M"),
        id = booking.id,
    )
}

fn assignment_mail(driver: &Driver, booking: &Booking, vehicle: Option<&Vehicle>) -> (String, String) {
    let subject = format!("Booking {} assigned to {}", booking.id, driver.full_name);
    let vehicle_line = vehicle
        .map(|v| format!("Vehicle: {} ({})\n", v.name, v.plate_no))
        .unwrap_or_default();
    let channel_line = if driver.chat_channel_id.is_some() {
        "Driver was pushed on chat."
    } else {
        "Driver has no chat channel; contact them directly."
    };
    let body = format!(
        "Booking {id} ({purpose}) to {destination} was assigned to {name}.\n\
         Departs: {departs}\n\
         Requested by: {requested_by}\n\
         {vehicle_line}{channel_line}\n",
        id = booking.id,
        purpose = booking.purpose,
        destination = booking.destination,
        name = driver.full_name,
        departs = booking.depart_at.format("%Y-%m-%d %H:%M"),
        requested_by = booking.requested_by,
    );
    (subject, body)
}


#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use super::testing::{RecordingChat, RecordingMail};
    use super::{assignment_mail, assignment_message, ChannelOutcome, Notifier};
    use crate::models::booking::{Booking, BookingStatus};
    use crate::models::driver::{Driver, DriverStatus};
    use crate::models::vehicle::Vehicle;

    fn driver(channel: Option<&str>) -> Driver {
        Driver {
            id: Uuid::from_u128(1),
            full_name: "Alex Moreau".to_string(),
            active: true,
            status: DriverStatus::Available,
            queue_order: 1,
            chat_channel_id: channel.map(str::to_string),
            updated_at: Utc::now(),
        }
    }

    fn booking() -> Booking {
        Booking {
            id: Uuid::from_u128(42),
            purpose: "committee transport".to_string(),
            destination: "city hall".to_string(),
            requested_by: "front desk".to_string(),
            depart_at: Utc::now() + Duration::hours(3),
            return_at: None,
            vehicle_id: None,
            status: BookingStatus::Assigned,
            driver_id: Some(Uuid::from_u128(1)),
            assigned_at: Some(Utc::now()),
            driver_accepted_at: None,
            notified: false,
            mileage_km: None,
            created_at: Utc::now(),
        }
    }

    fn notifier(chat: RecordingChat, mail: RecordingMail) -> (Notifier, Arc<RecordingChat>, Arc<RecordingMail>) {
        let chat = Arc::new(chat);
        let mail = Arc::new(mail);
        (
            Notifier::new(chat.clone(), mail.clone(), "fleet-admin@example.gov".to_string()),
            chat,
            mail,
        )
    }

    #[tokio::test]
    async fn both_channels_deliver() {
        let (notifier, chat, mail) = notifier(RecordingChat::default(), RecordingMail::default());

        let report = notifier
            .notify_driver_assignment(&driver(Some("chan-1")), &booking(), None)
            .await;

        assert_eq!(report.chat, ChannelOutcome::Delivered);
        assert_eq!(report.mail, ChannelOutcome::Delivered);
        assert!(report.warnings.is_empty());
        assert_eq!(chat.sent_count(), 1);
        assert_eq!(mail.sent.lock().unwrap()[0].0, "fleet-admin@example.gov");
    }

    #[tokio::test]
    async fn missing_channel_skips_chat_but_mails_admin() {
        let (notifier, chat, mail) = notifier(RecordingChat::default(), RecordingMail::default());

        let report = notifier
            .notify_driver_assignment(&driver(None), &booking(), None)
            .await;

        assert_eq!(report.chat, ChannelOutcome::Skipped);
        assert_eq!(report.mail, ChannelOutcome::Delivered);
        assert!(report.warnings.is_empty());
        assert_eq!(chat.sent_count(), 0);
        assert_eq!(mail.sent_count(), 1);
    }

    #[tokio::test]
    async fn chat_failure_becomes_warning_and_mail_still_goes() {
        let (notifier, _chat, mail) = notifier(RecordingChat::failing(), RecordingMail::default());

        let report = notifier
            .notify_driver_assignment(&driver(Some("chan-1")), &booking(), None)
            .await;

        assert_eq!(report.chat, ChannelOutcome::Failed);
        assert_eq!(report.mail, ChannelOutcome::Delivered);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(mail.sent_count(), 1);
    }

    #[tokio::test]
    async fn both_failures_collect_two_warnings() {
        let (notifier, _chat, _mail) = notifier(RecordingChat::failing(), RecordingMail::failing());

        let report = notifier
            .notify_driver_assignment(&driver(Some("chan-1")), &booking(), None)
            .await;

        assert_eq!(report.chat, ChannelOutcome::Failed);
        assert_eq!(report.mail, ChannelOutcome::Failed);
        assert_eq!(report.warnings.len(), 2);
    }

    #[test]
    fn assignment_message_names_the_trip() {
        let vehicle = Vehicle {
            id: Uuid::from_u128(9),
            name: "Van 3".to_string(),
            plate_no: "GV-4821".to_string(),
        };

        let text = assignment_message(&driver(Some("chan-1")), &booking(), Some(&vehicle));

        assert!(text.contains("city hall"));
        assert!(text.contains("committee transport"));
        assert!(text.contains("Van 3 (GV-4821)"));
        assert!(text.contains(&Uuid::from_u128(42).to_string()));
    }

    #[test]
    fn assignment_mail_flags_missing_chat_channel() {
        let (_, body) = assignment_mail(&driver(None), &booking(), None);
        assert!(body.contains("no chat channel"));

        let (_, body) = assignment_mail(&driver(Some("chan-1")), &booking(), None);
        assert!(body.contains("pushed on chat"));
    }
}
